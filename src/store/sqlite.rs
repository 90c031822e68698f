use std::{fs, path::Path, str::FromStr};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::models::{
    default_barbers, default_services, Barber, NewReservation, Reservation, ReservationStatus,
    Service,
};

const RESERVATION_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, barber_id, \
     service_ids, reservation_date, reservation_time, status, notes, created_at";

/// Local stand-in for the hosted database, used for development and tests.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: String,
    name: String,
    description: String,
    duration: i64,
    price: f64,
    image_url: Option<String>,
    created_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct BarberRow {
    id: String,
    name: String,
    bio: String,
    image_url: Option<String>,
    specialties: Option<String>,
    created_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    barber_id: String,
    service_ids: String,
    reservation_date: String,
    reservation_time: String,
    status: String,
    notes: Option<String>,
    created_at: String,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            name: row.name,
            description: row.description,
            duration: u32::try_from(row.duration).unwrap_or(0),
            price: row.price,
            image_url: row.image_url,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<BarberRow> for Barber {
    type Error = StoreError;

    fn try_from(row: BarberRow) -> Result<Self, Self::Error> {
        let specialties = match row.specialties {
            Some(raw) if !raw.trim().is_empty() => Some(serde_json::from_str(&raw)?),
            _ => None,
        };
        Ok(Barber {
            id: row.id,
            name: row.name,
            bio: row.bio,
            image_url: row.image_url,
            specialties,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let reservation_date = NaiveDate::parse_from_str(&row.reservation_date, "%Y-%m-%d")
            .map_err(|err| {
                StoreError::Malformed(format!(
                    "reservation {} has date '{}': {err}",
                    row.id, row.reservation_date
                ))
            })?;
        let status = row
            .status
            .parse::<ReservationStatus>()
            .map_err(|err| StoreError::Malformed(format!("reservation {}: {err}", row.id)))?;
        Ok(Reservation {
            service_ids: serde_json::from_str(&row.service_ids)?,
            id: row.id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            barber_id: row.barber_id,
            reservation_date,
            reservation_time: row.reservation_time,
            status,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        ensure_sqlite_dir(database_url).map_err(|err| {
            StoreError::Malformed(format!("cannot create database directory: {err}"))
        })?;
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::prepare(pool).await
    }

    /// A private database that lives as long as the store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::prepare(pool).await
    }

    async fn prepare(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        let store = Self { pool };
        store.seed_defaults().await?;
        Ok(store)
    }

    /// Fills empty catalogs with the shop's default services and team.
    async fn seed_defaults(&self) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();

        let services: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services")
            .fetch_one(&self.pool)
            .await?;
        if services == 0 {
            for service in default_services() {
                sqlx::query(
                    r#"INSERT INTO services (id, name, description, duration, price, image_url, created_at)
                       VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&service.name)
                .bind(&service.description)
                .bind(i64::from(service.duration))
                .bind(service.price)
                .bind(&service.image_url)
                .bind(&now)
                .execute(&self.pool)
                .await?;
            }
            log::info!("Seeded default services");
        }

        let barbers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM barbers")
            .fetch_one(&self.pool)
            .await?;
        if barbers == 0 {
            for barber in default_barbers() {
                let specialties = barber
                    .specialties
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                sqlx::query(
                    r#"INSERT INTO barbers (id, name, bio, image_url, specialties, created_at)
                       VALUES (?, ?, ?, ?, ?, ?)"#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&barber.name)
                .bind(&barber.bio)
                .bind(&barber.image_url)
                .bind(specialties)
                .bind(&now)
                .execute(&self.pool)
                .await?;
            }
            log::info!("Seeded default barbers");
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            "SELECT id, name, description, duration, price, image_url, created_at FROM services ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Service::from).collect())
    }

    async fn list_barbers(&self) -> Result<Vec<Barber>, StoreError> {
        let rows = sqlx::query_as::<_, BarberRow>(
            "SELECT id, name, bio, image_url, specialties, created_at FROM barbers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Barber::try_from).collect()
    }

    async fn list_reservations(
        &self,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, ReservationRow>(&format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE status = ? \
                     ORDER BY reservation_date DESC, reservation_time DESC"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ReservationRow>(&format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations \
                     ORDER BY reservation_date DESC, reservation_time DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn active_reservations(
        &self,
        barber_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        let [first, second] = ReservationStatus::ACTIVE;
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE barber_id = ? AND reservation_date = ? AND status IN (?, ?)"
        ))
        .bind(barber_id)
        .bind(date.format("%Y-%m-%d").to_string())
        .bind(first.as_str())
        .bind(second.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn find_reservation(&self, id: &str) -> Result<Option<Reservation>, StoreError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ? LIMIT 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Reservation::try_from).transpose()
    }

    async fn insert_reservation(&self, new: &NewReservation) -> Result<Reservation, StoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();
        sqlx::query(&format!(
            "INSERT INTO reservations ({RESERVATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&id)
        .bind(&new.customer_name)
        .bind(&new.customer_email)
        .bind(&new.customer_phone)
        .bind(&new.barber_id)
        .bind(serde_json::to_string(&new.service_ids)?)
        .bind(new.reservation_date.format("%Y-%m-%d").to_string())
        .bind(&new.reservation_time)
        .bind(new.status.as_str())
        .bind(&new.notes)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        self.find_reservation(&id)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE reservations SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            log::warn!("Status update of reservation {id} matched no rows");
        }
        Ok(())
    }

    async fn delete_reservation(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            log::warn!("Delete of reservation {id} matched no rows");
        }
        Ok(())
    }
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else {
        db_url.strip_prefix("sqlite:")
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_reservation(barber: &str, date: NaiveDate, time: &str) -> NewReservation {
        NewReservation {
            customer_name: "Ann".to_string(),
            customer_email: "ann@example.com".to_string(),
            customer_phone: "555".to_string(),
            barber_id: barber.to_string(),
            service_ids: vec!["s1".to_string()],
            reservation_date: date,
            reservation_time: time.to_string(),
            status: ReservationStatus::Pending,
            notes: String::new(),
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).expect("valid date")
    }

    #[actix_web::test]
    async fn seeds_default_catalog_in_name_order() {
        let store = SqliteStore::in_memory().await.expect("store");

        let services = store.list_services().await.expect("services");
        let names: Vec<_> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["Beard Trim", "Classic Cut", "Fade & Style", "Full Service", "Hot Towel Shave"]
        );

        let barbers = store.list_barbers().await.expect("barbers");
        let names: Vec<_> = barbers.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Gaven", "Jake", "Marcus"]);
        assert_eq!(
            barbers[0].specialties.as_deref(),
            Some(&["Classic Cuts".to_string(), "Fades".to_string(), "Beard Styling".to_string()][..])
        );
    }

    #[actix_web::test]
    async fn active_reservations_filter_by_barber_date_and_status() {
        let store = SqliteStore::in_memory().await.expect("store");
        let kept = store
            .insert_reservation(&new_reservation("b1", date(1), "10:00"))
            .await
            .expect("insert");
        let cancelled = store
            .insert_reservation(&new_reservation("b1", date(1), "11:00"))
            .await
            .expect("insert");
        store
            .update_reservation_status(&cancelled.id, ReservationStatus::Cancelled)
            .await
            .expect("cancel");
        store
            .insert_reservation(&new_reservation("b2", date(1), "10:00"))
            .await
            .expect("insert");
        store
            .insert_reservation(&new_reservation("b1", date(2), "10:00"))
            .await
            .expect("insert");

        let active = store.active_reservations("b1", date(1)).await.expect("active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, kept.id);
        assert_eq!(active[0].service_ids, vec!["s1".to_string()]);
    }

    #[actix_web::test]
    async fn reservations_list_newest_first_and_filters_by_status() {
        let store = SqliteStore::in_memory().await.expect("store");
        for (day, time) in [(1, "09:00"), (2, "09:00"), (2, "14:30")] {
            store
                .insert_reservation(&new_reservation("b1", date(day), time))
                .await
                .expect("insert");
        }

        let all = store.list_reservations(None).await.expect("list");
        let order: Vec<_> = all
            .iter()
            .map(|r| (r.reservation_date, r.reservation_time.as_str()))
            .collect();
        assert_eq!(order, [(date(2), "14:30"), (date(2), "09:00"), (date(1), "09:00")]);

        store
            .update_reservation_status(&all[0].id, ReservationStatus::Completed)
            .await
            .expect("update");
        let completed = store
            .list_reservations(Some(ReservationStatus::Completed))
            .await
            .expect("list");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, all[0].id);
    }

    #[actix_web::test]
    async fn status_changes_are_unconditional_and_delete_is_final() {
        let store = SqliteStore::in_memory().await.expect("store");
        let created = store
            .insert_reservation(&new_reservation("b1", date(1), "10:00"))
            .await
            .expect("insert");

        for status in [
            ReservationStatus::Completed,
            ReservationStatus::Pending,
            ReservationStatus::Cancelled,
            ReservationStatus::Confirmed,
        ] {
            store
                .update_reservation_status(&created.id, status)
                .await
                .expect("update");
            let found = store
                .find_reservation(&created.id)
                .await
                .expect("find")
                .expect("present");
            assert_eq!(found.status, status);
        }

        store.delete_reservation(&created.id).await.expect("delete");
        assert!(store.find_reservation(&created.id).await.expect("find").is_none());
        // Nothing left to match; the caller re-fetches and sees it gone.
        store
            .delete_reservation(&created.id)
            .await
            .expect("second delete");
    }

    #[test]
    fn memory_urls_need_no_directory() {
        assert!(ensure_sqlite_dir("sqlite::memory:").is_ok());
        assert!(ensure_sqlite_dir("postgres://localhost/db").is_ok());
    }
}
