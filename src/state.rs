//! Shared application state for all routes.

use crate::resource::Catalog;
use crate::store::DocumentStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub catalog: Arc<Catalog>,
    /// Bearer token required on resource routes; None disables the gate.
    pub api_token: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, catalog: Catalog, api_token: Option<String>) -> Self {
        AppState {
            store,
            catalog: Arc::new(catalog),
            api_token,
        }
    }
}
