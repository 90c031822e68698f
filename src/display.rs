//! Formatting shared by the public and admin pages.

use chrono::{Datelike, NaiveDate};

use crate::availability::CivilNow;

/// `35` for whole amounts, `35.50` otherwise.
pub fn price(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

/// `Jun 1, 2024`.
pub fn long_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Year of the shop's local calendar, for the footer.
pub fn current_year() -> i32 {
    CivilNow::now().date.year()
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Icon class for a service card, picked from keywords in its name.
pub fn service_icon(name: &str) -> &'static str {
    let name = name.to_lowercase();
    if name.contains("cut") || name.contains("fade") {
        "scissors"
    } else if name.contains("beard") {
        "beard"
    } else if name.contains("shave") {
        "waves"
    } else if name.contains("full") || name.contains("service") {
        "package"
    } else {
        "sparkle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_drop_zero_cents() {
        assert_eq!(price(35.0), "35");
        assert_eq!(price(35.5), "35.50");
    }

    #[test]
    fn dates_render_like_the_site() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(long_date(date), "Jun 1, 2024");
        assert_eq!(iso_date(date), "2024-06-01");
        assert_eq!(parse_iso_date(" 2024-06-01 "), Some(date));
        assert_eq!(parse_iso_date("06/01/2024"), None);
    }

    #[test]
    fn icons_follow_service_names() {
        assert_eq!(service_icon("Fade & Style"), "scissors");
        assert_eq!(service_icon("Beard Trim"), "beard");
        assert_eq!(service_icon("Hot Towel Shave"), "waves");
        assert_eq!(service_icon("Full Service"), "package");
        assert_eq!(service_icon("Scalp Massage"), "sparkle");
    }
}
