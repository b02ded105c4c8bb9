//! Catalog and cart domain: aggregates, identifiers and query construction.
pub mod aggregates;
pub mod query;
pub mod value_objects;
