pub mod analysis;
pub mod chat_engine;
pub mod comparison;
pub mod document_filter;
pub mod engine_task;
pub mod persistence;
pub mod picklist;
pub mod prompts;
pub mod session_registry;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;
