//! Access to the `services`, `barbers` and `reservations` collections.
//!
//! The hosted record-query service is the system of record. Nothing here
//! caches: every call is a fresh round trip, and callers re-fetch after a
//! mutation instead of trusting the mutation response.

pub mod rest;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Barber, NewReservation, Reservation, ReservationStatus, Service};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    /// Rejected by the collaborator; `message` is its own wording.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("{0}")]
    Sql(#[from] sqlx::Error),
    #[error("{0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("malformed row: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("malformed row: {0}")]
    Malformed(String),
    #[error("reservation {0} not found")]
    NotFound(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All services ordered by name.
    async fn list_services(&self) -> Result<Vec<Service>, StoreError>;

    /// All barbers ordered by name.
    async fn list_barbers(&self) -> Result<Vec<Barber>, StoreError>;

    /// Reservations newest date first, then latest time first.
    async fn list_reservations(
        &self,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// Pending and confirmed reservations of `barber_id` on `date`.
    async fn active_reservations(
        &self,
        barber_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError>;

    async fn find_reservation(&self, id: &str) -> Result<Option<Reservation>, StoreError>;

    async fn insert_reservation(&self, new: &NewReservation) -> Result<Reservation, StoreError>;

    /// Unconditional write; any status may replace any other.
    async fn update_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> Result<(), StoreError>;

    async fn delete_reservation(&self, id: &str) -> Result<(), StoreError>;
}
