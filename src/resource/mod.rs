//! Resource model: declarative specs and the built-in catalog.

pub mod catalog;
pub mod spec;

pub use catalog::{Catalog, INTERNAL_ID_PATTERN};
pub use spec::{CrossRule, FieldRule, FilterKind, ResourceSpec};
