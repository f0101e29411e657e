//! Parcel use-case service.
//!
//! # Responsibility
//! - Provide registration and lifecycle entry points for core callers.
//! - Delegate all persistence to a `ParcelRepository`.
//!
//! # Invariants
//! - Service APIs never bypass repository validation or status guards.
//! - Service layer remains storage-agnostic.

use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
use crate::repo::parcel_repo::{ParcelRepository, RepoError, RepoResult};

/// Use-case wrapper for parcel operations.
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new parcel for `client`, stamped with the current time.
    ///
    /// Returns the stored parcel with its assigned number.
    pub fn register(&self, client: ClientId, address: impl Into<String>) -> RepoResult<Parcel> {
        let mut parcel = Parcel::new(client, address);
        parcel.number = self.repo.add(&parcel)?;
        Ok(parcel)
    }

    pub fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        self.repo.get(number)
    }

    pub fn client_parcels(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.repo.get_by_client(client)
    }

    /// Moves a parcel one step along `registered -> sent -> delivered`.
    ///
    /// The write only applies if the status is still the one read, so a
    /// concurrent advance is never overwritten with an older step.
    ///
    /// # Errors
    /// - `InvalidState` for an already delivered parcel, or when another
    ///   caller changed the status first; nothing is written then.
    pub fn next_status(&self, number: ParcelNumber) -> RepoResult<ParcelStatus> {
        let parcel = self.repo.get(number)?;
        let next = parcel.status.next().ok_or(RepoError::InvalidState {
            number,
            status: parcel.status,
        })?;
        self.repo.advance_status(number, parcel.status, next)?;
        Ok(next)
    }

    /// Changes the delivery address of a registered parcel.
    pub fn change_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        self.repo.set_address(number, address)
    }

    /// Deletes a registered parcel.
    pub fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        self.repo.delete(number)
    }
}
