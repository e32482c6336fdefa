pub mod artifact_store;
pub mod failure_journal;
pub mod response_extractor;

pub use artifact_store::ArtifactStore;
pub use failure_journal::FailureJournal;
pub use response_extractor::{strip_code_fences, Extracted, ResponseExtractor};
