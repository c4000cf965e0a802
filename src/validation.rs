//! Field checks shared by registration, treatment and admin forms.
//!
//! Every check runs before the store is touched, so a rejected form never
//! leaves a partial write behind.

use thiserror::Error;
use time::macros::format_description;
use time::Date;

/// A form field failed its check. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type Validated<T> = Result<T, ValidationError>;

/// Trims `value` and rejects it if empty or longer than `max` characters.
pub fn required(field: &str, value: &str, max: usize) -> Validated<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::new(format!("{field} is required.")));
    }
    within(field, value, max)?;
    Ok(value.to_string())
}

/// Trims `value`, mapping empty input to `None`.
pub fn optional(field: &str, value: &str, max: usize) -> Validated<Option<String>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    within(field, value, max)?;
    Ok(Some(value.to_string()))
}

fn within(field: &str, value: &str, max: usize) -> Validated<()> {
    if value.chars().count() > max {
        return Err(ValidationError::new(format!(
            "{field} cannot exceed {max} characters."
        )));
    }
    Ok(())
}

/// Longest address SMTP allows.
const EMAIL_MAX: usize = 254;

/// bcrypt reads at most this many bytes of a password.
pub const PASSWORD_MAX_BYTES: usize = 72;

/// Loose address check: one `@`, non-empty local part, dotted domain.
pub fn email(value: &str) -> Validated<String> {
    let value = required("Email", value, EMAIL_MAX)?;
    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');
    if local.is_empty() || !domain_ok || value.contains(char::is_whitespace) {
        return Err(ValidationError::new("Email address is not valid."));
    }
    Ok(value.to_lowercase())
}

pub fn password(value: &str, confirmation: &str) -> Validated<()> {
    if value.chars().count() < 6 {
        return Err(ValidationError::new(
            "Password must be at least 6 characters long.",
        ));
    }
    if value.len() > PASSWORD_MAX_BYTES {
        return Err(ValidationError::new(format!(
            "Password cannot exceed {PASSWORD_MAX_BYTES} bytes."
        )));
    }
    if value != confirmation {
        return Err(ValidationError::new(
            "The password and confirmation password do not match.",
        ));
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` date.
pub fn date(field: &str, value: &str) -> Validated<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::new(format!("{field} must be a date like 1990-04-23.")))
}

/// Parses a number and checks it against an inclusive range.
pub fn amount(field: &str, value: &str, min: f64, max: f64) -> Validated<f64> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0.0);
    }
    let parsed: f64 = value
        .parse()
        .map_err(|_| ValidationError::new(format!("{field} must be a number.")))?;
    if !parsed.is_finite() || parsed < min || parsed > max {
        return Err(ValidationError::new(format!(
            "{field} must be between {min} and {max}."
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn required_trims_and_bounds() {
        assert_eq!(required("Name", "  Ada  ", 30).unwrap(), "Ada");
        assert!(required("Name", "   ", 30).is_err());
        assert!(required("Name", &"x".repeat(31), 30).is_err());
    }

    #[test]
    fn optional_maps_blank_to_none() {
        assert_eq!(optional("Phone", " ", 11).unwrap(), None);
        assert_eq!(
            optional("Phone", "0123", 11).unwrap(),
            Some("0123".to_string())
        );
    }

    #[test]
    fn email_shapes() {
        assert_eq!(email("Ada@Example.org").unwrap(), "ada@example.org");
        assert!(email("ada@example").is_err());
        assert!(email("@example.org").is_err());
        assert!(email("ada example@x.org").is_err());

        let long_local = format!("{}@example.org", "a".repeat(40));
        assert!(email(&long_local).is_ok());
        let oversized = format!("{}@example.org", "a".repeat(250));
        assert!(email(&oversized).is_err());
    }

    #[test]
    fn password_rules() {
        assert!(password("secret1", "secret1").is_ok());
        assert!(password("short", "short").is_err());
        assert!(password("secret1", "secret2").is_err());

        let longest = "a".repeat(PASSWORD_MAX_BYTES);
        assert!(password(&longest, &longest).is_ok());
        let too_long = "a".repeat(PASSWORD_MAX_BYTES + 1);
        assert!(password(&too_long, &too_long).is_err());
        // 25 three-byte characters pass a character count but not the byte limit.
        let wide = "€".repeat(25);
        assert!(password(&wide, &wide).is_err());
    }

    #[test]
    fn dates_and_amounts() {
        assert_eq!(date("Birth date", "1990-04-23").unwrap(), date!(1990 - 04 - 23));
        assert!(date("Birth date", "23/04/1990").is_err());
        assert_eq!(amount("Bill", "", 0.0, 10_000.0).unwrap(), 0.0);
        assert_eq!(amount("Bill", "250.5", 0.0, 10_000.0).unwrap(), 250.5);
        assert!(amount("Bill", "10001", 0.0, 10_000.0).is_err());
        assert!(amount("Bill", "-1", 0.0, 10_000.0).is_err());
        assert!(amount("Bill", "abc", 0.0, 10_000.0).is_err());
    }
}
