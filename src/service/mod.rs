//! Service layer: the explicitly constructed index context.
//!
//! [`IndexService`] owns one [`ListEngine`] per record kind and the
//! [`EventReconciler`]. It is built once at startup from the configured
//! backend and handed to the HTTP layer; nothing in the crate reaches for
//! global state.

pub mod index_service;

pub use index_service::IndexService;
