use std::sync::Arc;

use garage_db::Database;

use crate::storage::ImageStorage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: ImageStorage,
    pub jwt_secret: String,
    /// Per-image upload size cap in bytes.
    pub max_upload_bytes: usize,
}
