pub mod use_cases;

pub use use_cases::analysis::AnalysisUseCase;
pub use use_cases::chat_engine::SummaryChatEngine;
pub use use_cases::comparison::ComparisonUseCase;
pub use use_cases::persistence::PersistenceUseCase;
pub use use_cases::picklist::PicklistUseCase;
pub use use_cases::session_registry::{SessionRegistry, SharedSession};
pub use use_cases::upload::UploadUseCase;
