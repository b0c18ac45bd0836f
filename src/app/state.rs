use std::sync::Arc;

use crate::catalog::ingest::Ingestor;
use crate::llm::TextGenerator;
use crate::store::{CatalogStore, RecordsStore};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub records: Arc<dyn RecordsStore>,
    pub ingestor: Arc<Ingestor>,
    pub summarizer: Arc<dyn TextGenerator>,
}
