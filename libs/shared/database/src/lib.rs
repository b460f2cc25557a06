pub mod errors;
pub mod pool;

use std::sync::Arc;

use shared_config::AppConfig;

pub use errors::{classify, ConstraintViolation};
pub use pool::Database;

/// Router state shared by every cell: configuration plus the connection pool.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            db,
        })
    }
}
