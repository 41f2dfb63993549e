//! Stockroom: configuration-driven inventory REST backend library.
//!
//! Every resource (suppliers, products, customers, warehouses, orders,
//! purchases, users, and the inventory family) is a catalog entry served by
//! one generic stack: validation -> service -> document store, with
//! sequential human-readable domain ids allocated on create.

pub mod allocator;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod resource;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod transform;
pub mod validate;

pub use error::{ApiError, ConfigError};
pub use resource::{Catalog, ResourceSpec};
pub use routes::app;
pub use service::{ListParams, ResourceService};
pub use state::AppState;
pub use store::{ensure_collections, DocumentStore, MemoryStore, PgStore};
pub use transform::transform;
