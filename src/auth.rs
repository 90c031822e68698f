use actix_web::{
    body::{BoxBody, MessageBody},
    cookie::{time::Duration, Cookie, SameSite},
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorUnauthorized,
    http::{
        header::{self, HeaderValue},
        StatusCode,
    },
    middleware::Next,
    web, Error, HttpMessage, HttpRequest,
};
use actix_web_httpauth::extractors::basic::BasicAuth;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use askama::Template;
use rand_core::OsRng;

use crate::{config::AdminSecret, state::AppState, templates::render};

pub const AUTH_REALM: &str = "Gaven's Barber Shop";
const LOGOUT_COOKIE: &str = "gbs_logged_out";

/// The single admin account, verified on every admin request.
#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub username: String,
    pub password_hash: String,
}

impl AdminAccount {
    pub fn from_secret(username: &str, secret: &AdminSecret) -> Result<Self, password_hash::Error> {
        let password_hash = match secret {
            AdminSecret::Hash(hash) => {
                PasswordHash::new(hash)?;
                hash.clone()
            }
            AdminSecret::Plain(password) => hash_password(password)?,
        };
        Ok(Self {
            username: username.to_string(),
            password_hash,
        })
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username
            && PasswordHash::new(&self.password_hash)
                .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
                .is_ok()
    }
}

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub username: String,
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn authenticate_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> Option<AuthUser> {
    if !state.admin.verify(username, password) {
        log::warn!("Rejected admin login for '{username}'");
        return None;
    }
    Some(AuthUser {
        username: username.to_string(),
    })
}

pub async fn admin_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let user = req.app_data::<web::Data<AppState>>().and_then(|state| {
        authenticate_credentials(
            state,
            credentials.user_id(),
            credentials.password().unwrap_or_default(),
        )
    });
    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
            Ok(req)
        }
        None => Err((ErrorUnauthorized("Admin access required"), req)),
    }
}

/// Where the admin session stands as far as the browser is concerned.
///
/// Browsers keep resending Basic credentials after a logout, so a closed
/// session is remembered in a cookie until the next `/login`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminSession {
    Closed,
    Reopened,
}

impl AdminSession {
    pub fn cookie(self, req: &HttpRequest) -> Cookie<'static> {
        let (value, max_age) = match self {
            AdminSession::Closed => ("1", Duration::days(365)),
            AdminSession::Reopened => ("", Duration::ZERO),
        };
        Cookie::build(LOGOUT_COOKIE, value)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(req.connection_info().scheme() == "https")
            .max_age(max_age)
            .finish()
    }

    pub fn of(req: &HttpRequest) -> Self {
        if req.cookie(LOGOUT_COOKIE).is_some() {
            AdminSession::Closed
        } else {
            AdminSession::Reopened
        }
    }
}

#[derive(Template)]
#[template(path = "logged_out.html")]
struct LoggedOutTemplate;

pub async fn logout_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    if AdminSession::of(req.request()) == AdminSession::Closed {
        let mut response = render(LoggedOutTemplate);
        *response.status_mut() = StatusCode::UNAUTHORIZED;
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        return Ok(req.into_response(response));
    }

    Ok(next.call(req).await?.map_into_boxed_body())
}
