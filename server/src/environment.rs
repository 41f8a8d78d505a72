use std::sync::Arc;

use log::Logger;

use crate::db::Db;
use crate::urls::Urls;

/// The shared dependencies handed to every request handler. There is no
/// process-wide state; everything flows through this struct.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
    pub urls: Arc<Urls>,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db + Send + Sync>, urls: Arc<Urls>) -> Self {
        Self { logger, db, urls }
    }
}
