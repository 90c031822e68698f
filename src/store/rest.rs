//! PostgREST-style client for the hosted database.
//!
//! Collections live under `<base>/rest/v1/<collection>`. Filters use the
//! `column=op.value` query syntax and every request carries the anon key both
//! as `apikey` and as a bearer token.

use std::{fmt::Display, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{RecordStore, StoreError};
use crate::models::{Barber, NewReservation, Reservation, ReservationStatus, Service};

const SERVICES: &str = "services";
const BARBERS: &str = "barbers";
const RESERVATIONS: &str = "reservations";

#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Query-string filters for one request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filters(Vec<(String, String)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.0.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn any_of<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let list = values
            .into_iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.0.push((column.to_string(), format!("in.({list})")));
        self
    }

    /// `columns` as `(name, descending)` pairs, most significant first.
    pub fn order(mut self, columns: &[(&str, bool)]) -> Self {
        let spec = columns
            .iter()
            .map(|(name, descending)| {
                format!("{name}.{}", if *descending { "desc" } else { "asc" })
            })
            .collect::<Vec<_>>()
            .join(",");
        self.0.push(("order".to_string(), spec));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.0.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

#[derive(Serialize)]
struct StatusPatch {
    status: ReservationStatus,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, collection: &str, filters: &Filters) -> RequestBuilder {
        let url = format!("{}/rest/v1/{collection}", self.base_url);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(filters.pairs())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: Filters,
    ) -> Result<Vec<T>, StoreError> {
        let filters = Filters(
            std::iter::once(("select".to_string(), "*".to_string()))
                .chain(filters.0)
                .collect(),
        );
        let response = self
            .request(Method::GET, collection, &filters)
            .send()
            .await?;
        decode(response).await
    }

    /// Sends a write and returns the affected rows.
    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        collection: &str,
        filters: Filters,
        body: Option<&B>,
    ) -> Result<Vec<T>, StoreError> {
        let mut request = self
            .request(method, collection, &filters)
            .header("Prefer", "return=representation");
        if let Some(body) = body {
            request = request.json(body);
        }
        decode(request.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, StoreError> {
    let status = response.status();
    if status.is_success() {
        let body = response.bytes().await?;
        return Ok(serde_json::from_slice(&body)?);
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("json"));
    let text = response.text().await.unwrap_or_default();
    let message = if is_json {
        serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or(text)
    } else {
        text
    };
    let message = if message.trim().is_empty() {
        status.to_string()
    } else {
        message
    };

    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RecordStore for RestStore {
    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        self.select(SERVICES, Filters::new().order(&[("name", false)]))
            .await
    }

    async fn list_barbers(&self) -> Result<Vec<Barber>, StoreError> {
        self.select(BARBERS, Filters::new().order(&[("name", false)]))
            .await
    }

    async fn list_reservations(
        &self,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, StoreError> {
        let mut filters = Filters::new();
        if let Some(status) = status {
            filters = filters.eq("status", status);
        }
        let filters = filters.order(&[("reservation_date", true), ("reservation_time", true)]);
        self.select(RESERVATIONS, filters).await
    }

    async fn active_reservations(
        &self,
        barber_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        let filters = Filters::new()
            .eq("barber_id", barber_id)
            .eq("reservation_date", date.format("%Y-%m-%d"))
            .any_of("status", ReservationStatus::ACTIVE);
        self.select(RESERVATIONS, filters).await
    }

    async fn find_reservation(&self, id: &str) -> Result<Option<Reservation>, StoreError> {
        let rows = self
            .select(RESERVATIONS, Filters::new().eq("id", id).limit(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_reservation(&self, new: &NewReservation) -> Result<Reservation, StoreError> {
        let rows: Vec<Reservation> = self
            .write(Method::POST, RESERVATIONS, Filters::new(), Some(new))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no row".to_string()))
    }

    async fn update_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> Result<(), StoreError> {
        let rows: Vec<serde_json::Value> = self
            .write(
                Method::PATCH,
                RESERVATIONS,
                Filters::new().eq("id", id),
                Some(&StatusPatch { status }),
            )
            .await?;
        if rows.is_empty() {
            log::warn!("Status update of reservation {id} matched no rows");
        }
        Ok(())
    }

    async fn delete_reservation(&self, id: &str) -> Result<(), StoreError> {
        let rows: Vec<serde_json::Value> = self
            .write::<(), _>(Method::DELETE, RESERVATIONS, Filters::new().eq("id", id), None)
            .await?;
        if rows.is_empty() {
            log::warn!("Delete of reservation {id} matched no rows");
        }
        Ok(())
    }
}
