//! Application state shared by HTTP handlers

use std::sync::Arc;

use crate::domain::storage::RecordStore;
use crate::infrastructure::cache::CacheStore;
use crate::infrastructure::services::{ServiceContext, Services};

#[derive(Debug, Clone)]
pub struct AppState {
    pub services: Services,
    pub cache: CacheStore,
    /// Raw store, used for readiness probing only
    pub store: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, ctx: ServiceContext) -> Self {
        Self {
            cache: ctx.cache().clone(),
            services: Services::new(ctx),
            store,
        }
    }
}
