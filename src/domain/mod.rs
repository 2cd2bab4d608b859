pub mod document;
pub mod error;
pub mod llm_config;
pub mod saved_analysis;
pub mod session;
pub mod team;
