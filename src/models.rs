use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 4] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Completed,
        ReservationStatus::Cancelled,
    ];

    /// Statuses that block a slot for other bookings.
    pub const ACTIVE: [ReservationStatus; 2] =
        [ReservationStatus::Pending, ReservationStatus::Confirmed];

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => STATUS_PENDING,
            ReservationStatus::Confirmed => STATUS_CONFIRMED,
            ReservationStatus::Completed => STATUS_COMPLETED,
            ReservationStatus::Cancelled => STATUS_CANCELLED,
        }
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reservation status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for ReservationStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            STATUS_PENDING => Ok(ReservationStatus::Pending),
            STATUS_CONFIRMED => Ok(ReservationStatus::Confirmed),
            STATUS_COMPLETED => Ok(ReservationStatus::Completed),
            STATUS_CANCELLED => Ok(ReservationStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Minutes.
    pub duration: u32,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barber {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bio: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub specialties: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub barber_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service_ids: Vec<String>,
    pub reservation_date: NaiveDate,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reservation_time: String,
    pub status: ReservationStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
}

/// Older rows carry `null` where newer ones hold an empty value; only that
/// row loses the field, the rest of the result set still decodes.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Insert payload for the `reservations` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReservation {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub barber_id: String,
    pub service_ids: Vec<String>,
    pub reservation_date: NaiveDate,
    pub reservation_time: String,
    pub status: ReservationStatus,
    pub notes: String,
}

#[derive(Debug, Clone, Copy)]
pub struct GalleryImage {
    pub url: &'static str,
    pub alt: &'static str,
}

pub const GALLERY: [GalleryImage; 6] = [
    GalleryImage { url: "/static/pic1.jpg", alt: "Barber at work" },
    GalleryImage { url: "/static/pic2.jpg", alt: "Haircut in progress" },
    GalleryImage { url: "/static/pic3.jpg", alt: "Beard styling" },
    GalleryImage { url: "/static/pic4.jpg", alt: "Barber tools" },
    GalleryImage { url: "/static/pic5.jpg", alt: "Barber shop interior" },
    GalleryImage { url: "/static/pic6.jpg", alt: "Classic barber chair" },
];

/// Shown on the home page when the services collection is empty or unreachable.
pub fn default_services() -> Vec<Service> {
    let entries = [
        ("1", "Classic Cut", "Traditional barber cut with modern precision", 30, 35.0),
        ("2", "Fade & Style", "Premium fade with styling and finish", 45, 50.0),
        ("3", "Beard Trim", "Professional beard shaping and trimming", 20, 25.0),
        ("4", "Hot Towel Shave", "Luxurious traditional hot towel shave", 30, 40.0),
        ("5", "Full Service", "Cut, beard trim, and hot towel shave", 75, 90.0),
    ];
    entries
        .into_iter()
        .map(|(id, name, description, duration, price)| Service {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            duration,
            price,
            image_url: None,
            created_at: String::new(),
        })
        .collect()
}

/// Shown on the home page when the barbers collection is empty or unreachable.
pub fn default_barbers() -> Vec<Barber> {
    let entries = [
        (
            "1",
            "Gaven",
            "Master barber with 15 years of experience. Specializes in classic cuts and fades.",
            ["Classic Cuts", "Fades", "Beard Styling"],
        ),
        (
            "2",
            "Marcus",
            "Expert in modern styles and precision cuts. Known for attention to detail.",
            ["Modern Styles", "Precision Cuts", "Hair Design"],
        ),
        (
            "3",
            "Jake",
            "Traditional barber specializing in hot towel shaves and classic grooming.",
            ["Hot Towel Shaves", "Traditional Cuts", "Beard Trims"],
        ),
    ];
    entries
        .into_iter()
        .map(|(id, name, bio, specialties)| Barber {
            id: id.to_string(),
            name: name.to_string(),
            bio: bio.to_string(),
            image_url: Some(default_barber_image(name).to_string()),
            specialties: Some(specialties.iter().map(|s| s.to_string()).collect()),
            created_at: String::new(),
        })
        .collect()
}

pub fn default_barber_image(name: &str) -> &'static str {
    match name.trim().to_lowercase().as_str() {
        "marcus" => "/static/marcus.jpg",
        "jake" => "/static/jake.jpg",
        _ => "/static/gaven.jpg",
    }
}
