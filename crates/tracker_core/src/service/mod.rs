//! Use-case services over repository contracts.

pub mod parcel_service;
