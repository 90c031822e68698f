use actix_web::{http::header, web, HttpRequest, HttpResponse, Result};
use actix_web::http::header::Header;
use actix_web_httpauth::headers::authorization::{Authorization, Basic};
use askama::Template;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{authenticate_credentials, AdminSession, AUTH_REALM},
    availability::{self, CivilNow, SlotAvailability},
    booking::{self, BookingError, BookingRequest},
    display,
    models::{self, Barber, Reservation, Service, GALLERY},
    state::AppState,
    templates::render,
};

const STEP_LABELS: [&str; 4] = ["Services", "Barber", "Date & Time", "Details"];

#[derive(Clone, Debug)]
struct ServiceCard {
    id: String,
    name: String,
    description: String,
    duration: u32,
    price: String,
    icon: &'static str,
    selected: bool,
}

#[derive(Clone, Debug)]
struct TeamCard {
    name: String,
    bio: String,
    image_url: String,
    image_position: &'static str,
    specialties: Vec<String>,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    services: Vec<ServiceCard>,
    team: Vec<TeamCard>,
    gallery: Vec<models::GalleryImage>,
}

#[derive(Clone, Debug)]
struct StepView {
    number: u8,
    label: &'static str,
    reached: bool,
}

#[derive(Clone, Debug)]
struct BarberCard {
    id: String,
    name: String,
    bio: String,
    selected: bool,
}

#[derive(Clone, Debug)]
struct DateCard {
    value: String,
    weekday: String,
    day: String,
    selected: bool,
}

#[derive(Clone, Debug)]
struct SlotView {
    time: &'static str,
    available: bool,
    selected: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct ContactView {
    name: String,
    email: String,
    phone: String,
    notes: String,
}

#[derive(Template)]
#[template(path = "book.html")]
struct BookingTemplate {
    step: u8,
    steps: Vec<StepView>,
    services: Vec<ServiceCard>,
    selected_services: Vec<ServiceCard>,
    service_ids: Vec<String>,
    total_price: String,
    total_duration: u32,
    barbers: Vec<BarberCard>,
    barber_id: String,
    barber_name: String,
    dates: Vec<DateCard>,
    date_value: String,
    date_label: String,
    slots: Vec<SlotView>,
    slots_notice: String,
    time: String,
    form: ContactView,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "book_success.html")]
struct BookingSuccessTemplate {
    customer_name: String,
    barber_name: String,
    date_label: String,
    time: String,
    services: String,
}

/// Wizard state carried between steps in the query string or form body.
#[derive(Clone, Debug, Default, PartialEq)]
struct Selection {
    step: u8,
    service_ids: Vec<String>,
    barber_id: String,
    date: Option<NaiveDate>,
    time: String,
    contact: ContactView,
}

impl Selection {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut selection = Selection {
            step: 1,
            ..Selection::default()
        };
        for (key, value) in pairs {
            match key.as_str() {
                "step" => selection.step = value.trim().parse().unwrap_or(1).clamp(1, 4),
                "service" => {
                    let value = value.trim().to_string();
                    if !value.is_empty() && !selection.service_ids.contains(&value) {
                        selection.service_ids.push(value);
                    }
                }
                "barber" => selection.barber_id = value.trim().to_string(),
                "date" => selection.date = display::parse_iso_date(&value),
                "time" => selection.time = value.trim().to_string(),
                "name" => selection.contact.name = value,
                "email" => selection.contact.email = value,
                "phone" => selection.contact.phone = value,
                "notes" => selection.contact.notes = value,
                _ => {}
            }
        }
        selection
    }

    fn into_request(self) -> BookingRequest {
        BookingRequest {
            service_ids: self.service_ids,
            barber_id: self.barber_id,
            date: self.date,
            time: self.time,
            customer_name: self.contact.name,
            customer_email: self.contact.email,
            customer_phone: self.contact.phone,
            notes: self.contact.notes,
        }
    }
}

#[derive(Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

#[derive(Deserialize)]
struct AvailabilityQuery {
    #[serde(default)]
    barber: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    services: String,
}

#[derive(Serialize)]
struct AvailabilityResponse {
    barber_id: String,
    date: String,
    duration_minutes: u32,
    degraded: bool,
    slots: Vec<SlotAvailability>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(
            web::resource("/book")
                .route(web::get().to(show_booking))
                .route(web::post().to(create_booking)),
        )
        .service(web::resource("/api/availability").route(web::get().to(slot_availability)))
        .service(web::resource("/login").route(web::get().to(login)))
        .service(web::resource("/logout").route(web::get().to(logout)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn logout(req: HttpRequest) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/"))
        .cookie(AdminSession::Closed.cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<LoginQuery>,
) -> HttpResponse {
    let auth = match Authorization::<Basic>::parse(&req) {
        Ok(auth) => auth,
        Err(_) => return auth_challenge(),
    };
    let credentials = auth.into_scheme();
    let username = credentials.user_id();
    let password = credentials.password().unwrap_or_default();

    if authenticate_credentials(&state, username, password).is_none() {
        return auth_challenge();
    }

    let requested = query.next.as_deref().unwrap_or("");
    let redirect = if requested.starts_with("/admin") {
        requested
    } else {
        "/admin/reservations"
    };

    HttpResponse::SeeOther()
        .append_header((header::LOCATION, redirect))
        .cookie(AdminSession::Reopened.cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

fn auth_challenge() -> HttpResponse {
    HttpResponse::Unauthorized()
        .insert_header((header::WWW_AUTHENTICATE, format!("Basic realm=\"{}\"", AUTH_REALM)))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

async fn home(state: web::Data<AppState>) -> Result<HttpResponse> {
    let (services, barbers) = tokio::join!(state.store.list_services(), state.store.list_barbers());

    let services = match services {
        Ok(rows) if !rows.is_empty() => rows,
        Ok(_) => models::default_services(),
        Err(err) => {
            log::error!("Error fetching services: {err}");
            models::default_services()
        }
    };
    let barbers = match barbers {
        Ok(rows) if !rows.is_empty() => rows,
        Ok(_) => models::default_barbers(),
        Err(err) => {
            log::error!("Error fetching barbers: {err}");
            models::default_barbers()
        }
    };

    Ok(render(HomeTemplate {
        services: services.iter().map(|s| service_card(s, false)).collect(),
        team: barbers.into_iter().map(team_card).collect(),
        gallery: GALLERY.to_vec(),
    }))
}

async fn show_booking(
    state: web::Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
) -> Result<HttpResponse> {
    let selection = Selection::from_pairs(query.into_inner());
    Ok(wizard_page(&state, selection, Vec::new()).await)
}

async fn create_booking(
    state: web::Data<AppState>,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse> {
    let selection = Selection::from_pairs(form.into_inner());
    let request = selection.clone().into_request();

    match booking::submit(
        state.store.as_ref(),
        state.fetch_failure,
        request,
        CivilNow::now(),
    )
    .await
    {
        Ok(reservation) => Ok(success_page(&state, reservation).await),
        Err(err) => {
            if let BookingError::Store(store_err) = &err {
                log::error!("Booking submission failed: {store_err}");
            }
            let mut selection = selection;
            selection.step = 4;
            if matches!(err, BookingError::SlotUnavailable | BookingError::PastClosing) {
                selection.step = 3;
                selection.time.clear();
            }
            Ok(wizard_page(&state, selection, vec![err.to_string()]).await)
        }
    }
}

async fn success_page(state: &AppState, reservation: Reservation) -> HttpResponse {
    let (services, barbers) = tokio::join!(state.store.list_services(), state.store.list_barbers());
    let services = services.unwrap_or_default();
    let barbers = barbers.unwrap_or_default();

    let service_names = reservation
        .service_ids
        .iter()
        .filter_map(|id| services.iter().find(|service| &service.id == id))
        .map(|service| service.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    render(BookingSuccessTemplate {
        customer_name: reservation.customer_name.clone(),
        barber_name: barber_name(&barbers, &reservation.barber_id),
        date_label: display::long_date(reservation.reservation_date),
        time: availability::normalize_time(&reservation.reservation_time),
        services: service_names,
    })
}

async fn wizard_page(state: &AppState, selection: Selection, errors: Vec<String>) -> HttpResponse {
    let (services, barbers) = tokio::join!(state.store.list_services(), state.store.list_barbers());
    let catalog = services.unwrap_or_else(|err| {
        log::error!("Error fetching services: {err}");
        Vec::new()
    });
    let barbers = barbers.unwrap_or_else(|err| {
        log::error!("Error fetching barbers: {err}");
        Vec::new()
    });

    let now = CivilNow::now();
    let service_ids: Vec<String> = selection
        .service_ids
        .iter()
        .filter(|id| catalog.iter().any(|service| &service.id == *id))
        .cloned()
        .collect();
    let barber_id = if barbers.iter().any(|barber| barber.id == selection.barber_id) {
        selection.barber_id.clone()
    } else {
        String::new()
    };
    let dates = availability::bookable_dates(now.date);
    let date = selection.date.filter(|date| dates.contains(date));
    let mut time = selection.time.clone();

    let step = if service_ids.is_empty() {
        1
    } else if barber_id.is_empty() {
        selection.step.min(2)
    } else if date.is_none() || time.is_empty() {
        selection.step.min(3)
    } else {
        selection.step
    };

    let mut slots = Vec::new();
    let mut slots_notice = String::new();
    if let Some(date) = date.filter(|_| step >= 3) {
        let board = booking::slot_board(
            state.store.as_ref(),
            state.fetch_failure,
            &catalog,
            &barber_id,
            date,
            &service_ids,
            now,
        )
        .await;
        if !board.is_available(&time) {
            time.clear();
        }
        if board.degraded {
            slots_notice = "Existing bookings could not be loaded.".to_string();
        }
        slots = board
            .slots
            .into_iter()
            .map(|slot| SlotView {
                time: slot.time,
                available: slot.available,
                selected: slot.time == time,
            })
            .collect();
    }
    // Dropping an unavailable time can push the visitor back to step 3.
    let step = if step == 4 && time.is_empty() { 3 } else { step };

    let service_cards: Vec<ServiceCard> = catalog
        .iter()
        .map(|service| service_card(service, service_ids.contains(&service.id)))
        .collect();
    let selected_services: Vec<ServiceCard> = service_cards
        .iter()
        .filter(|card| card.selected)
        .cloned()
        .collect();
    let selected_catalog: Vec<&Service> = catalog
        .iter()
        .filter(|service| service_ids.contains(&service.id))
        .collect();
    let total_price: f64 = selected_catalog.iter().map(|service| service.price).sum();
    let total_duration = availability::total_duration(&catalog, &service_ids);

    render(BookingTemplate {
        step,
        steps: STEP_LABELS
            .iter()
            .zip(1u8..)
            .map(|(&label, number)| StepView {
                number,
                label,
                reached: step >= number,
            })
            .collect(),
        services: service_cards,
        selected_services,
        total_price: display::price(total_price),
        total_duration,
        barber_name: barber_name(&barbers, &barber_id),
        barbers: barbers
            .iter()
            .map(|barber| BarberCard {
                id: barber.id.clone(),
                name: barber.name.clone(),
                bio: barber.bio.clone(),
                selected: barber.id == barber_id,
            })
            .collect(),
        barber_id,
        dates: dates
            .iter()
            .map(|candidate| DateCard {
                value: display::iso_date(*candidate),
                weekday: candidate.format("%a").to_string(),
                day: candidate.format("%-d").to_string(),
                selected: Some(*candidate) == date,
            })
            .collect(),
        date_value: date.map(display::iso_date).unwrap_or_default(),
        date_label: date.map(display::long_date).unwrap_or_else(|| "N/A".to_string()),
        slots,
        slots_notice,
        time,
        service_ids,
        form: selection.contact,
        errors,
    })
}

async fn slot_availability(
    state: web::Data<AppState>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let Some(date) = display::parse_iso_date(&query.date) else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "date must be YYYY-MM-DD"
        })));
    };
    if query.barber.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "barber is required"
        })));
    }
    let selected: Vec<String> = query
        .services
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    let catalog = state.store.list_services().await.map_err(|err| {
        log::error!("Error fetching services: {err}");
        actix_web::error::ErrorBadGateway(err.to_string())
    })?;
    let board = booking::slot_board(
        state.store.as_ref(),
        state.fetch_failure,
        &catalog,
        query.barber.trim(),
        date,
        &selected,
        CivilNow::now(),
    )
    .await;

    Ok(HttpResponse::Ok().json(AvailabilityResponse {
        barber_id: query.barber.trim().to_string(),
        date: display::iso_date(date),
        duration_minutes: board.duration,
        degraded: board.degraded,
        slots: board.slots,
    }))
}

fn service_card(service: &Service, selected: bool) -> ServiceCard {
    ServiceCard {
        id: service.id.clone(),
        name: service.name.clone(),
        description: service.description.clone(),
        duration: service.duration,
        price: display::price(service.price),
        icon: display::service_icon(&service.name),
        selected,
    }
}

fn team_card(barber: Barber) -> TeamCard {
    let image_url = barber
        .image_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| models::default_barber_image(&barber.name).to_string());
    let image_position = if barber.name.eq_ignore_ascii_case("marcus") {
        "center 30%"
    } else {
        "center center"
    };
    TeamCard {
        name: barber.name,
        bio: barber.bio,
        image_url,
        image_position,
        specialties: barber.specialties.unwrap_or_default(),
    }
}

fn barber_name(barbers: &[Barber], id: &str) -> String {
    barbers
        .iter()
        .find(|barber| barber.id == id)
        .map(|barber| barber.name.clone())
        .unwrap_or_else(|| "N/A".to_string())
}
