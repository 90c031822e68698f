//! Slot availability for the booking wizard.
//!
//! Everything here is pure: callers supply the catalog, the barber's active
//! reservations for the chosen date and the current instant, and get back a
//! yes/no per fixed half-hour slot. Shop hours are evaluated in a fixed UTC+7
//! civil time zone no matter where the server or the visitor runs.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::models::{Reservation, Service};

pub const SLOT_TIMES: [&str; 20] = [
    "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "12:00", "12:30", "13:00", "13:30",
    "14:00", "14:30", "15:00", "15:30", "16:00", "16:30", "17:00", "17:30", "18:00", "18:30",
];

/// Latest minute-of-day a booking may end at (19:00).
pub const CLOSING_MINUTES: u32 = 19 * 60;

pub const BOOKING_WINDOW_DAYS: u64 = 30;

const SHOP_UTC_OFFSET_SECS: i32 = 7 * 60 * 60;

pub fn shop_offset() -> FixedOffset {
    FixedOffset::east_opt(SHOP_UTC_OFFSET_SECS).expect("UTC+7 is a valid offset")
}

/// Wall-clock "now" in the shop's civil time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilNow {
    pub date: NaiveDate,
    pub minutes: u32,
}

impl CivilNow {
    pub fn at(instant: DateTime<Utc>) -> Self {
        let local = instant.with_timezone(&shop_offset());
        Self {
            date: local.date_naive(),
            minutes: local.hour() * 60 + local.minute(),
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }
}

/// Normalizes `9:0`, `09:00` and `09:00:00` to `09:00`.
///
/// Strings without a `:` are returned trimmed, matching how stored times are
/// displayed elsewhere.
pub fn normalize_time(value: &str) -> String {
    let trimmed = value.trim();
    let mut parts = trimmed.split(':');
    match (parts.next(), parts.next()) {
        (Some(hours), Some(minutes)) => {
            let hours = leading_number(hours);
            let minutes = leading_number(minutes);
            format!("{hours:02}:{minutes:02}")
        }
        _ => trimmed.to_string(),
    }
}

/// Minutes since midnight of a wall-clock string; empty or unparsable input is 0.
pub fn minutes_of_day(value: &str) -> u32 {
    let normalized = normalize_time(value);
    let mut parts = normalized.split(':');
    match (parts.next(), parts.next()) {
        (Some(hours), Some(minutes)) => leading_number(hours)
            .saturating_mul(60)
            .saturating_add(leading_number(minutes)),
        _ => 0,
    }
}

fn leading_number(part: &str) -> u32 {
    let digits: String = part
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

pub fn is_slot_time(value: &str) -> bool {
    SLOT_TIMES.iter().any(|slot| *slot == value)
}

/// Sum of catalog durations for `ids`; ids missing from the catalog add nothing.
pub fn total_duration(catalog: &[Service], ids: &[String]) -> u32 {
    ids.iter()
        .filter_map(|id| catalog.iter().find(|service| &service.id == id))
        .fold(0u32, |total, service| total.saturating_add(service.duration))
}

/// The `BOOKING_WINDOW_DAYS` calendar days starting at `today`.
pub fn bookable_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (0..BOOKING_WINDOW_DAYS)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlotAvailability {
    pub time: &'static str,
    pub available: bool,
}

/// One evaluation snapshot for a barber on a date.
#[derive(Debug, Clone, Copy)]
pub struct SlotQuery<'a> {
    pub date: NaiveDate,
    pub selected_services: &'a [String],
    pub catalog: &'a [Service],
    /// Active reservations of the selected barber on `date`.
    pub existing: &'a [Reservation],
    pub now: CivilNow,
}

impl<'a> SlotQuery<'a> {
    pub fn selected_duration(&self) -> u32 {
        total_duration(self.catalog, self.selected_services)
    }

    pub fn is_available(&self, slot: &str) -> bool {
        let duration = self.selected_duration();
        if duration == 0 {
            return false;
        }

        let start = minutes_of_day(slot);
        let end = start.saturating_add(duration);
        if end > CLOSING_MINUTES {
            return false;
        }

        if self.date == self.now.date && start <= self.now.minutes {
            return false;
        }

        !self.existing.iter().any(|reservation| {
            if !reservation.status.is_active() || reservation.reservation_time.trim().is_empty() {
                return false;
            }
            let booked = total_duration(self.catalog, &reservation.service_ids);
            if booked == 0 {
                return false;
            }
            let booked_start = minutes_of_day(&reservation.reservation_time);
            let booked_end = booked_start.saturating_add(booked);
            start < booked_end && end > booked_start
        })
    }

    pub fn evaluate(&self) -> Vec<SlotAvailability> {
        SLOT_TIMES
            .iter()
            .map(|&time| SlotAvailability {
                time,
                available: self.is_available(time),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::ReservationStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn service(id: &str, duration: u32) -> Service {
        Service {
            id: id.to_string(),
            name: format!("service {id}"),
            description: String::new(),
            duration,
            price: 35.0,
            image_url: None,
            created_at: String::new(),
        }
    }

    fn booked(time: &str, service_ids: &[&str]) -> Reservation {
        Reservation {
            id: format!("r-{time}"),
            customer_name: "Ann".to_string(),
            customer_email: "ann@example.com".to_string(),
            customer_phone: "555".to_string(),
            barber_id: "gaven".to_string(),
            service_ids: service_ids.iter().map(|s| s.to_string()).collect(),
            reservation_date: date(2024, 6, 1),
            reservation_time: time.to_string(),
            status: ReservationStatus::Pending,
            notes: None,
            created_at: String::new(),
        }
    }

    /// A "now" on a different day so the past-time rule never applies.
    fn yesterday() -> CivilNow {
        CivilNow {
            date: date(2024, 5, 31),
            minutes: 23 * 60,
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classic_cut_scenario() {
        let catalog = vec![service("classic", 30), service("quarter", 15)];
        let existing = vec![booked("10:00", &["classic"])];
        let selected = ids(&["classic"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &existing,
            now: yesterday(),
        };

        assert!(query.is_available("09:30"));
        assert!(!query.is_available("10:00"));
        assert!(!query.is_available("09:45"));
        assert!(query.is_available("10:30"));
    }

    #[test]
    fn touching_intervals_do_not_conflict() {
        let catalog = vec![service("long", 60)];
        let existing = vec![booked("11:00", &["long"])];
        let selected = ids(&["long"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &existing,
            now: yesterday(),
        };

        assert!(query.is_available("10:00"));
        assert!(!query.is_available("10:30"));
        assert!(!query.is_available("11:30"));
        assert!(query.is_available("12:00"));
    }

    #[test]
    fn no_selected_services_blocks_every_slot() {
        let catalog = vec![service("classic", 30)];
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &[],
            catalog: &catalog,
            existing: &[],
            now: yesterday(),
        };

        assert!(query.evaluate().iter().all(|slot| !slot.available));
    }

    #[test]
    fn unknown_selected_services_count_as_nothing_selected() {
        let catalog = vec![service("classic", 30)];
        let selected = ids(&["missing"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &[],
            now: yesterday(),
        };

        assert!(!query.is_available("09:00"));
    }

    #[test]
    fn bookings_must_end_by_closing() {
        let catalog = vec![service("full", 75), service("classic", 30)];
        let full = ids(&["full"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &full,
            catalog: &catalog,
            existing: &[],
            now: yesterday(),
        };
        assert!(query.is_available("17:30"));
        assert!(!query.is_available("18:00"));
        assert!(!query.is_available("18:30"));

        let classic = ids(&["classic"]);
        let query = SlotQuery {
            selected_services: &classic,
            ..query
        };
        assert!(query.is_available("18:30"));
    }

    #[test]
    fn every_slot_past_closing_is_rejected() {
        let catalog = vec![service("a", 45), service("b", 50)];
        let selected = ids(&["a", "b"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &[],
            now: yesterday(),
        };
        for slot in query.evaluate() {
            let past_closing = minutes_of_day(slot.time) + 95 > CLOSING_MINUTES;
            assert_eq!(slot.available, !past_closing, "slot {}", slot.time);
        }
    }

    #[test]
    fn slots_at_or_before_now_are_rejected_today() {
        let catalog = vec![service("classic", 30)];
        let selected = ids(&["classic"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &[],
            now: CivilNow {
                date: date(2024, 6, 1),
                minutes: 10 * 60,
            },
        };

        assert!(!query.is_available("09:30"));
        assert!(!query.is_available("10:00"));
        assert!(query.is_available("10:30"));
    }

    #[test]
    fn one_minute_past_a_slot_start_closes_it() {
        let catalog = vec![service("classic", 30)];
        let selected = ids(&["classic"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &[],
            now: CivilNow {
                date: date(2024, 6, 1),
                minutes: 10 * 60 + 31,
            },
        };

        assert!(!query.is_available("10:30"));
        assert!(query.is_available("11:00"));
    }

    #[test]
    fn past_time_rule_only_applies_to_today() {
        let catalog = vec![service("classic", 30)];
        let selected = ids(&["classic"]);
        let query = SlotQuery {
            date: date(2024, 6, 2),
            selected_services: &selected,
            catalog: &catalog,
            existing: &[],
            now: CivilNow {
                date: date(2024, 6, 1),
                minutes: 18 * 60,
            },
        };

        assert!(query.is_available("09:00"));
    }

    #[test]
    fn civil_now_uses_utc_plus_seven() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 31, 20, 15, 0).unwrap();
        let now = CivilNow::at(instant);
        assert_eq!(now.date, date(2024, 6, 1));
        assert_eq!(now.minutes, 3 * 60 + 15);
    }

    #[test]
    fn reservations_with_unknown_services_do_not_conflict() {
        let catalog = vec![service("classic", 30)];
        let existing = vec![booked("10:00", &["not-loaded"]), booked("", &["classic"])];
        let selected = ids(&["classic"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &existing,
            now: yesterday(),
        };

        assert!(query.is_available("10:00"));
        assert!(query.is_available("09:00"));
    }

    #[test]
    fn finished_and_cancelled_bookings_free_their_slot() {
        let catalog = vec![service("classic", 30)];
        let mut completed = booked("10:00", &["classic"]);
        completed.status = ReservationStatus::Completed;
        let mut cancelled = booked("11:00", &["classic"]);
        cancelled.status = ReservationStatus::Cancelled;
        let mut confirmed = booked("12:00", &["classic"]);
        confirmed.status = ReservationStatus::Confirmed;
        let existing = vec![completed, cancelled, confirmed];
        let selected = ids(&["classic"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &existing,
            now: yesterday(),
        };

        assert!(query.is_available("10:00"));
        assert!(query.is_available("11:00"));
        assert!(!query.is_available("12:00"));
    }

    #[test]
    fn absurd_stored_times_do_not_overflow() {
        assert_eq!(minutes_of_day("4000000000:00"), u32::MAX);

        let catalog = vec![service("classic", 30), service("huge", u32::MAX)];
        let existing = vec![
            booked("4000000000:00", &["classic"]),
            booked("12:00", &["huge"]),
        ];
        let selected = ids(&["classic"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &existing,
            now: yesterday(),
        };

        assert!(query.is_available("09:00"));
        assert!(!query.is_available("12:00"));
        assert_eq!(total_duration(&catalog, &ids(&["classic", "huge"])), u32::MAX);
    }

    #[test]
    fn stored_times_with_seconds_are_honored() {
        let catalog = vec![service("classic", 30)];
        let existing = vec![booked("10:00:00", &["classic"]), booked("9:0", &["classic"])];
        let selected = ids(&["classic"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &existing,
            now: yesterday(),
        };

        assert!(!query.is_available("09:00"));
        assert!(query.is_available("09:30"));
        assert!(!query.is_available("10:00"));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let catalog = vec![service("classic", 30), service("beard", 20)];
        let existing = vec![booked("12:00", &["classic", "beard"])];
        let selected = ids(&["beard"]);
        let query = SlotQuery {
            date: date(2024, 6, 1),
            selected_services: &selected,
            catalog: &catalog,
            existing: &existing,
            now: yesterday(),
        };

        assert_eq!(query.evaluate(), query.evaluate());
    }

    #[test]
    fn time_normalization() {
        assert_eq!(normalize_time("9:0"), "09:00");
        assert_eq!(normalize_time(" 14:30:00 "), "14:30");
        assert_eq!(normalize_time(""), "");
        assert_eq!(minutes_of_day("18:30"), 1110);
        assert_eq!(minutes_of_day(""), 0);
    }

    #[test]
    fn booking_window_starts_today() {
        let dates = bookable_dates(date(2024, 6, 1));
        assert_eq!(dates.len(), 30);
        assert_eq!(dates[0], date(2024, 6, 1));
        assert_eq!(dates[29], date(2024, 6, 30));
    }
}
