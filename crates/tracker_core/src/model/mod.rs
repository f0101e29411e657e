//! Domain model for tracked parcels.
//!
//! # Responsibility
//! - Define the canonical parcel record shared by storage and services.
//!
//! # Invariants
//! - Every parcel is identified by a store-assigned `ParcelNumber`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod parcel;
