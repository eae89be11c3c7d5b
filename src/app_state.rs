//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::IndexService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Index service holding every listing engine.
    pub index: Arc<IndexService>,
    /// Page size used when a request gives no `count`.
    pub default_page_size: u32,
    /// Largest `|count|` honoured; larger requests are clamped.
    pub max_page_size: u32,
}

impl AppState {
    /// Bundles the service with page-size limits.
    #[must_use]
    pub fn new(index: Arc<IndexService>, default_page_size: u32, max_page_size: u32) -> Self {
        Self {
            index,
            default_page_size,
            max_page_size,
        }
    }
}
