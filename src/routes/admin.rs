use actix_web::{http::header, middleware::from_fn, web, HttpResponse, Result};
use actix_web_httpauth::middleware::HttpAuthentication;
use askama::Template;
use serde::Deserialize;

use crate::{
    auth::{admin_validator, logout_guard, AuthUser},
    availability,
    display,
    models::{Barber, Reservation, ReservationStatus, Service},
    state::AppState,
    templates::render,
};

#[derive(Clone, Debug)]
struct ReservationView {
    id: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    date_label: String,
    time: String,
    service_count: usize,
    service_names: String,
    barber_name: String,
    status: &'static str,
    notes: String,
    has_notes: bool,
    statuses: Vec<StatusOption>,
}

#[derive(Clone, Debug)]
struct StatusOption {
    value: &'static str,
    selected: bool,
}

#[derive(Template)]
#[template(path = "admin_reservations.html")]
struct AdminReservationsTemplate {
    admin_name: String,
    reservations: Vec<ReservationView>,
    filters: Vec<StatusOption>,
    status_filter: String,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin_delete.html")]
struct AdminDeleteTemplate {
    reservation: ReservationView,
}

#[derive(Deserialize)]
struct ReservationFilter {
    status: Option<String>,
}

#[derive(Deserialize)]
struct StatusForm {
    status: String,
}

#[derive(Deserialize)]
struct DeleteForm {
    confirm: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(HttpAuthentication::basic(admin_validator))
            .wrap(from_fn(logout_guard))
            .service(web::resource("").route(web::get().to(index)))
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/reservations").route(web::get().to(list_reservations)))
            .service(
                web::resource("/reservations/{id}/status").route(web::post().to(update_status)),
            )
            .service(
                web::resource("/reservations/{id}/delete")
                    .route(web::get().to(confirm_delete))
                    .route(web::post().to(delete_reservation)),
            ),
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/admin/reservations"))
        .finish()
}

fn back_to_list() -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/admin/reservations"))
        .finish()
}

async fn list_reservations(
    state: web::Data<AppState>,
    query: web::Query<ReservationFilter>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let status = query
        .status
        .as_deref()
        .and_then(|value| value.parse::<ReservationStatus>().ok());
    Ok(reservations_page(&state, &auth, status, Vec::new()).await)
}

/// Fetches everything fresh and renders the list, with `errors` shown on top.
async fn reservations_page(
    state: &AppState,
    auth: &AuthUser,
    status: Option<ReservationStatus>,
    mut errors: Vec<String>,
) -> HttpResponse {
    let (reservations, services, barbers) = tokio::join!(
        state.store.list_reservations(status),
        state.store.list_services(),
        state.store.list_barbers(),
    );
    let reservations = reservations.unwrap_or_else(|err| {
        log::error!("Error fetching reservations: {err}");
        errors.push(format!("Error fetching reservations: {err}"));
        Vec::new()
    });
    let services = services.unwrap_or_else(|err| {
        log::error!("Error fetching services: {err}");
        Vec::new()
    });
    let barbers = barbers.unwrap_or_else(|err| {
        log::error!("Error fetching barbers: {err}");
        Vec::new()
    });

    render(AdminReservationsTemplate {
        admin_name: auth.username.clone(),
        reservations: reservations
            .into_iter()
            .map(|reservation| to_view(reservation, &services, &barbers))
            .collect(),
        filters: status_options(status),
        status_filter: status.map(|s| s.as_str().to_string()).unwrap_or_default(),
        errors,
    })
}

async fn update_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<StatusForm>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let reservation_id = path.into_inner();
    let status = match form.status.parse::<ReservationStatus>() {
        Ok(status) => status,
        Err(err) => {
            let message = format!("Error updating reservation: {err}");
            return Ok(reservations_page(&state, &auth, None, vec![message]).await);
        }
    };

    if let Err(err) = state
        .store
        .update_reservation_status(&reservation_id, status)
        .await
    {
        log::error!("Updating reservation {reservation_id} failed: {err}");
        let message = format!("Error updating reservation: {err}");
        return Ok(reservations_page(&state, &auth, None, vec![message]).await);
    }

    log::info!(
        "{} set reservation {reservation_id} to {status}",
        auth.username
    );
    Ok(back_to_list())
}

async fn confirm_delete(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let reservation_id = path.into_inner();
    let (reservation, services, barbers) = tokio::join!(
        state.store.find_reservation(&reservation_id),
        state.store.list_services(),
        state.store.list_barbers(),
    );
    let reservation = reservation.map_err(actix_web::error::ErrorBadGateway)?;
    let services = services.unwrap_or_default();
    let barbers = barbers.unwrap_or_default();

    match reservation {
        Some(reservation) => Ok(render(AdminDeleteTemplate {
            reservation: to_view(reservation, &services, &barbers),
        })),
        None => Ok(HttpResponse::NotFound().body("Reservation not found")),
    }
}

async fn delete_reservation(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<DeleteForm>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let reservation_id = path.into_inner();
    if form.confirm.as_deref() != Some("yes") {
        log::info!("Delete of reservation {reservation_id} was not confirmed");
        return Ok(back_to_list());
    }

    if let Err(err) = state.store.delete_reservation(&reservation_id).await {
        log::error!("Deleting reservation {reservation_id} failed: {err}");
        let message = format!("Error deleting reservation: {err}");
        return Ok(reservations_page(&state, &auth, None, vec![message]).await);
    }

    log::info!("{} deleted reservation {reservation_id}", auth.username);
    Ok(back_to_list())
}

fn status_options(current: Option<ReservationStatus>) -> Vec<StatusOption> {
    ReservationStatus::ALL
        .iter()
        .map(|status| StatusOption {
            value: status.as_str(),
            selected: current == Some(*status),
        })
        .collect()
}

fn to_view(row: Reservation, services: &[Service], barbers: &[Barber]) -> ReservationView {
    let notes = row.notes.unwrap_or_default();
    let service_names = row
        .service_ids
        .iter()
        .filter_map(|id| services.iter().find(|service| &service.id == id))
        .map(|service| service.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let barber_name = barbers
        .iter()
        .find(|barber| barber.id == row.barber_id)
        .map(|barber| barber.name.clone())
        .unwrap_or_else(|| "N/A".to_string());
    ReservationView {
        id: row.id,
        customer_name: row.customer_name,
        customer_email: row.customer_email,
        customer_phone: row.customer_phone,
        date_label: display::long_date(row.reservation_date),
        time: availability::normalize_time(&row.reservation_time),
        service_count: row.service_ids.len(),
        service_names,
        barber_name,
        status: row.status.as_str(),
        has_notes: !notes.trim().is_empty(),
        notes,
        statuses: status_options(Some(row.status)),
    }
}
