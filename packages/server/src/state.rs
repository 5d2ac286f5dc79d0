use std::sync::Arc;

use common::storage::BlobStore;

use crate::config::AppConfig;
use crate::files::FileService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub files: Arc<FileService>,
    pub blob_store: Arc<dyn BlobStore>,
}
