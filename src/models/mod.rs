pub mod batch;
pub mod corpus;
pub mod document;
pub mod extraction;
pub mod loaders;
pub mod request;

pub use batch::{Batch, BatchArtifact, BatchOutcome, BatchStatus, DispatchReport, FailurePolicy};
pub use corpus::CorpusItem;
pub use document::{ConsolidatedDocument, Section};
pub use extraction::{FanOutReport, ItemOutcome};
pub use loaders::{discover_sources, load_corpus};
pub use request::{FlowRequest, IoType};
