//! Input validation utilities

use chrono::NaiveDate;
use rand::{Rng, seq::SliceRandom};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{ErsError, ErsResult};
use crate::repositories::UserStore;

/// Minimum password length when nothing else is configured
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 7;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"1234567890";
const SPECIALS: &[u8] = b"!@#$";

/// Validate a first and last name
///
/// Each must be one or more alphanumeric runs separated by single spaces.
pub fn validate_name(first_name: &str, last_name: &str) -> ErsResult<()> {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[\p{L}\p{N}]+(?: [\p{L}\p{N}]+)*$").expect("Failed to compile name regex")
    });

    for (label, name) in [("First", first_name), ("Last", last_name)] {
        if name.is_empty() {
            return Err(ErsError::InvalidName(format!("{} name is required", label)));
        }

        if !regex.is_match(name) {
            return Err(ErsError::InvalidName(format!(
                "{} name may only contain letters and numbers separated by single spaces",
                label
            )));
        }
    }

    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str, min_length: usize) -> ErsResult<()> {
    if password.chars().count() < min_length {
        return Err(ErsError::WeakPassword(format!(
            "Password must be at least {} characters long",
            min_length
        )));
    }

    if !password.chars().any(char::is_alphabetic) {
        return Err(ErsError::WeakPassword(
            "Password must contain at least one letter".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ErsError::WeakPassword(
            "Password must contain at least one digit".to_string(),
        ));
    }

    Ok(())
}

/// Validate an optional date of birth against `today`
pub fn validate_date_of_birth(date_of_birth: Option<NaiveDate>, today: NaiveDate) -> ErsResult<()> {
    match date_of_birth {
        Some(dob) if dob > today => Err(ErsError::InvalidDate(
            "Date of birth cannot be in the future".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Fail when the store reports `email` as already assigned
pub async fn validate_email_available<S>(store: &S, email: &str) -> ErsResult<()>
where
    S: UserStore + ?Sized,
{
    if store.email_is_available(email).await? {
        Ok(())
    } else {
        Err(ErsError::EmailUnavailable(format!(
            "The email address {} is not available",
            email
        )))
    }
}

/// Email equality as the store sees it: full Unicode lowercasing, like SQL `LOWER`
pub fn emails_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Generate a temporary password
///
/// Holds at least one letter, one digit and one of `!@#$`; the rest is
/// drawn from all three sets and the result is shuffled.
pub fn generate_temporary_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let all: Vec<u8> = [LETTERS, DIGITS, SPECIALS].concat();

    let mut chars = vec![
        LETTERS[rng.gen_range(0..LETTERS.len())],
        DIGITS[rng.gen_range(0..DIGITS.len())],
        SPECIALS[rng.gen_range(0..SPECIALS.len())],
    ];
    while chars.len() < length {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    debug!("Generated a temporary password");
    chars.into_iter().map(char::from).collect()
}
