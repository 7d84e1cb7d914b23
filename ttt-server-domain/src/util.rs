use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

use crate::{ServiceError, ServiceResult};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MIN_GAME_NAME_LENGTH: usize = 3;

#[derive(Validate)]
struct EmailValidator {
    #[validate(email)]
    email: String,
}

/// Trims and lower-cases the address before checking its syntax.
pub fn validate_email(email: &str) -> ServiceResult<String> {
    let validator = EmailValidator {
        email: email.trim().to_lowercase(),
    };
    if let Err(e) = validator.validate() {
        return ServiceError::invalid_input("email", format!("invalid email address: {}", e));
    }
    Ok(validator.email)
}

fn validate_length(field: &str, value: &str, min: usize, max: usize) -> ServiceResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return ServiceError::invalid_input(
            field,
            format!("must be between {} and {} characters", min, max),
        );
    }
    Ok(trimmed.to_string())
}

pub fn validate_player_name(name: &str) -> ServiceResult<String> {
    validate_length("name", name, 1, MAX_NAME_LENGTH)
}

pub fn validate_game_name(name: &str) -> ServiceResult<String> {
    validate_length("name", name, MIN_GAME_NAME_LENGTH, MAX_NAME_LENGTH)
}

/// Accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date, read as midnight UTC.
pub fn parse_date(field: &str, value: &str) -> ServiceResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let parsed = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0));
    match parsed {
        Some(naive) => Ok(naive.and_utc()),
        None => ServiceError::invalid_input(field, format!("not a valid date: {}", value)),
    }
}
