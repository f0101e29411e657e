//! Parcel domain model.
//!
//! # Responsibility
//! - Define the parcel record and its lifecycle status.
//! - Validate caller-provided and persisted parcel values.
//!
//! # Invariants
//! - `number` is assigned by storage and never reused for another parcel.
//! - `created_at` is an RFC3339 timestamp written once at creation.
//! - `address` may only change while `status == Registered`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Store-assigned parcel identifier.
pub type ParcelNumber = i64;

/// Identifier of the client owning a parcel.
pub type ClientId = i64;

/// Parcel lifecycle stage.
///
/// Progression is `Registered -> Sent -> Delivered`. Storage does not
/// enforce ordering; see `ParcelService::next_status` for the forward walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    /// Accepted for shipping, not yet handed to a carrier.
    Registered,
    /// In transit.
    Sent,
    /// Terminal state.
    Delivered,
}

impl ParcelStatus {
    /// Returns the stored text form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
        }
    }

    /// Returns the following lifecycle stage, or `None` once delivered.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Registered => Some(Self::Sent),
            Self::Sent => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }

    /// Whether address changes and deletion are still allowed.
    pub fn is_mutable(self) -> bool {
        self == Self::Registered
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParcelStatus {
    type Err = ParcelValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "registered" => Ok(Self::Registered),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            other => Err(ParcelValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Validation failures for parcel values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelValidationError {
    /// `created_at` is not an RFC3339 timestamp.
    InvalidCreatedAt(String),
    /// Status text does not name a known lifecycle stage.
    UnknownStatus(String),
}

impl Display for ParcelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCreatedAt(value) => {
                write!(f, "created_at `{value}` is not an RFC3339 timestamp")
            }
            Self::UnknownStatus(value) => write!(f, "unknown parcel status `{value}`"),
        }
    }
}

impl Error for ParcelValidationError {}

/// One tracked shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Zero until the store assigns one on insert.
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: ParcelStatus,
    /// Free-form delivery address.
    pub address: String,
    /// RFC3339 UTC timestamp, kept byte-identical through storage.
    pub created_at: String,
}

impl Parcel {
    /// Creates a registered parcel stamped with the current UTC time.
    ///
    /// # Invariants
    /// - `number` is `0`; storage assigns the real one.
    /// - `created_at` uses second precision with a `Z` suffix.
    pub fn new(client: ClientId, address: impl Into<String>) -> Self {
        Self {
            number: 0,
            client,
            status: ParcelStatus::Registered,
            address: address.into(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Checks value-level invariants that storage relies on.
    ///
    /// # Errors
    /// - `InvalidCreatedAt` when `created_at` does not parse as RFC3339.
    pub fn validate(&self) -> Result<(), ParcelValidationError> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|_| ParcelValidationError::InvalidCreatedAt(self.created_at.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Parcel, ParcelStatus, ParcelValidationError};

    #[test]
    fn new_parcel_is_registered_and_valid() {
        let parcel = Parcel::new(1000, "test");
        assert_eq!(parcel.number, 0);
        assert_eq!(parcel.status, ParcelStatus::Registered);
        assert!(parcel.created_at.ends_with('Z'));
        parcel.validate().expect("fresh parcel should validate");
    }

    #[test]
    fn validate_rejects_non_rfc3339_created_at() {
        let mut parcel = Parcel::new(1, "addr");
        parcel.created_at = "yesterday".to_string();
        assert_eq!(
            parcel.validate(),
            Err(ParcelValidationError::InvalidCreatedAt("yesterday".to_string()))
        );
    }

    #[test]
    fn status_walks_forward_and_stops_at_delivered() {
        assert_eq!(ParcelStatus::Registered.next(), Some(ParcelStatus::Sent));
        assert_eq!(ParcelStatus::Sent.next(), Some(ParcelStatus::Delivered));
        assert_eq!(ParcelStatus::Delivered.next(), None);
    }

    #[test]
    fn status_text_roundtrips_and_rejects_unknown() {
        for status in [
            ParcelStatus::Registered,
            ParcelStatus::Sent,
            ParcelStatus::Delivered,
        ] {
            assert_eq!(status.as_str().parse::<ParcelStatus>(), Ok(status));
        }
        assert!(matches!(
            "lost".parse::<ParcelStatus>(),
            Err(ParcelValidationError::UnknownStatus(value)) if value == "lost"
        ));
    }
}
