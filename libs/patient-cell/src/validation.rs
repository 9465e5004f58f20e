//! Field-level checks for patient records. These run before any store
//! round-trip so malformed input never reaches the row store.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use shared_utils::time::age_on;

static NATIONAL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{7,8}$").expect("valid regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s\-\(\)]{8,15}$").expect("valid regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// National identity number: 7 or 8 digits once separators are stripped,
/// so "12.345.678" and "12345678" both pass.
pub fn is_valid_national_id(national_id: &str) -> bool {
    let digits: String = national_id.chars().filter(|c| c.is_ascii_digit()).collect();
    NATIONAL_ID_RE.is_match(&digits)
}

/// Phone numbers keep their formatting characters; an optional leading `+`
/// followed by 8 to 15 characters.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// A birth date is plausible when it is not in the future and implies an age
/// of at most 120 years.
pub fn is_valid_birth_date(birth_date: NaiveDate, today: NaiveDate) -> bool {
    birth_date <= today && age_on(birth_date, today) <= 120
}
