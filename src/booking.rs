use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    availability::{self, CivilNow, SlotAvailability, SlotQuery, CLOSING_MINUTES},
    models::{NewReservation, Reservation, ReservationStatus, Service},
    store::{RecordStore, StoreError},
};

/// What the wizard does when the barber's reservations cannot be fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchFailurePolicy {
    /// Evaluate as if the barber had no reservations.
    Open,
    /// Treat every slot as taken.
    Closed,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Please complete all steps")]
    Incomplete,
    #[error("{0} is required.")]
    MissingField(&'static str),
    #[error("This service is too long to start at this time. Please choose an earlier time.")]
    PastClosing,
    #[error("This time slot is no longer available. Please select another time.")]
    SlotUnavailable,
    #[error("Error creating reservation: {0}")]
    Store(#[from] StoreError),
}

/// Everything the wizard collected, as submitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BookingRequest {
    pub service_ids: Vec<String>,
    pub barber_id: String,
    pub date: Option<NaiveDate>,
    pub time: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub notes: String,
}

/// Availability of every slot for one barber on one date.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotBoard {
    pub duration: u32,
    pub slots: Vec<SlotAvailability>,
    /// Set when the reservation fetch failed and the policy decided the outcome.
    pub degraded: bool,
}

impl SlotBoard {
    pub fn is_available(&self, time: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.time == time && slot.available)
    }
}

pub async fn slot_board(
    store: &dyn RecordStore,
    policy: FetchFailurePolicy,
    catalog: &[Service],
    barber_id: &str,
    date: NaiveDate,
    selected: &[String],
    now: CivilNow,
) -> SlotBoard {
    let fetched = store.active_reservations(barber_id, date).await;
    let (existing, degraded) = match fetched {
        Ok(rows) => {
            log::debug!(
                "Fetched {} active reservations for {date}, barber {barber_id}",
                rows.len()
            );
            (Some(rows), false)
        }
        Err(err) => {
            log::error!("Error fetching reservations for {date}, barber {barber_id}: {err}");
            match policy {
                FetchFailurePolicy::Open => (Some(Vec::new()), true),
                FetchFailurePolicy::Closed => (None, true),
            }
        }
    };

    evaluate_board(catalog, date, selected, existing.as_deref(), now, degraded)
}

fn evaluate_board(
    catalog: &[Service],
    date: NaiveDate,
    selected: &[String],
    existing: Option<&[Reservation]>,
    now: CivilNow,
    degraded: bool,
) -> SlotBoard {
    let query = SlotQuery {
        date,
        selected_services: selected,
        catalog,
        existing: existing.unwrap_or_default(),
        now,
    };
    let mut slots = query.evaluate();
    if existing.is_none() {
        for slot in &mut slots {
            slot.available = false;
        }
    }
    SlotBoard {
        duration: query.selected_duration(),
        slots,
        degraded,
    }
}

/// Validates the request against fresh data and inserts a pending reservation.
///
/// The check and the insert are separate round trips; two visitors racing for
/// the same slot can both succeed.
pub async fn submit(
    store: &dyn RecordStore,
    policy: FetchFailurePolicy,
    request: BookingRequest,
    now: CivilNow,
) -> Result<Reservation, BookingError> {
    let date = match request.date {
        Some(date)
            if !request.time.trim().is_empty()
                && !request.service_ids.is_empty()
                && !request.barber_id.trim().is_empty() =>
        {
            date
        }
        _ => return Err(BookingError::Incomplete),
    };
    if request.customer_name.trim().is_empty() {
        return Err(BookingError::MissingField("Full name"));
    }
    if request.customer_email.trim().is_empty() {
        return Err(BookingError::MissingField("Email"));
    }
    if request.customer_phone.trim().is_empty() {
        return Err(BookingError::MissingField("Phone"));
    }

    if !availability::is_slot_time(&request.time)
        || !availability::bookable_dates(now.date).contains(&date)
    {
        return Err(BookingError::SlotUnavailable);
    }

    let catalog = store.list_services().await?;
    let duration = availability::total_duration(&catalog, &request.service_ids);
    if availability::minutes_of_day(&request.time) + duration > CLOSING_MINUTES {
        return Err(BookingError::PastClosing);
    }

    let board = slot_board(
        store,
        policy,
        &catalog,
        &request.barber_id,
        date,
        &request.service_ids,
        now,
    )
    .await;
    if !board.is_available(&request.time) {
        return Err(BookingError::SlotUnavailable);
    }

    let reservation = store
        .insert_reservation(&NewReservation {
            customer_name: request.customer_name.trim().to_string(),
            customer_email: request.customer_email.trim().to_string(),
            customer_phone: request.customer_phone.trim().to_string(),
            barber_id: request.barber_id,
            service_ids: request.service_ids,
            reservation_date: date,
            reservation_time: request.time,
            status: ReservationStatus::Pending,
            notes: request.notes,
        })
        .await?;

    log::info!(
        "Reservation {} created for {} at {}",
        reservation.id,
        reservation.reservation_date,
        reservation.reservation_time
    );
    Ok(reservation)
}
