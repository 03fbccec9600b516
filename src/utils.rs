use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Datelike, Utc};
use rand_core::OsRng;

use crate::errors::AppError;

const MIN_PASSWORD_LENGTH: usize = 8;
const MIN_PROJECT_YEAR: i32 = 2000;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::internal(format!("failed to hash password: {err}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|err| AppError::internal(format!("invalid password hash: {err}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Project years are bounded to [2000, current year + 1]; next year is
/// allowed so work can be registered ahead of the school year.
pub fn validate_project_year(year: i32) -> Result<(), AppError> {
    let max_year = utc_now().year() + 1;
    if year < MIN_PROJECT_YEAR || year > max_year {
        return Err(AppError::bad_request(format!(
            "year must be between {} and {}",
            MIN_PROJECT_YEAR, max_year
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_bounds_follow_current_year() {
        let next_year = utc_now().year() + 1;
        assert!(validate_project_year(2000).is_ok());
        assert!(validate_project_year(next_year).is_ok());
        assert!(validate_project_year(1999).is_err());
        assert!(validate_project_year(next_year + 1).is_err());
    }
}
