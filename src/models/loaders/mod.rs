pub mod corpus_loader;

pub use corpus_loader::{discover_sources, load_corpus, load_record, LoadedCorpus};
