//! Repository layer: persistence contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the parcel data access contract.
//! - Keep SQL details out of service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidState`)
//!   distinct from SQLite transport errors.

pub mod parcel_repo;
