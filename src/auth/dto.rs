use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{auth::errors::AuthError, users::PublicUser};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_email(email: &str) -> Result<(), AuthError> {
    if !is_valid_email(email) {
        return Err(AuthError::Validation("email must be a valid address".into()));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Request body for user creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub address: String,
    pub password: String,
}

/// Registration takes the same fields as creation.
pub type RegisterRequest = CreateUserRequest;

impl CreateUserRequest {
    /// Checks only; accepted values are stored exactly as sent.
    pub fn validate(&self) -> Result<(), AuthError> {
        check_email(&self.email)?;
        require("name", &self.name)?;
        require("address", &self.address)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// Request body for login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }
        Ok(())
    }
}

/// Response returned after login, register or token check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: PublicUser,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.into(),
            name: " A ".into(),
            address: "addr".into(),
            password: password.into(),
        }
    }

    #[test]
    fn validate_leaves_values_untouched() {
        let req = create("Alice@X.com", "secret1");
        req.validate().unwrap();
        assert_eq!(req.email, "Alice@X.com");
        assert_eq!(req.name, " A ");
    }

    #[test]
    fn rejects_bad_email() {
        for email in ["", "plain", "a@b", "a b@x.com", " a@x.com", "a@x.com "] {
            let err = create(email, "secret1").validate().unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)), "{email}");
        }
    }

    #[test]
    fn password_minimum_is_six() {
        assert!(matches!(
            create("a@x.com", "12345").validate(),
            Err(AuthError::Validation(_))
        ));
        assert!(create("a@x.com", "123456").validate().is_ok());
    }

    #[test]
    fn blank_name_or_address_is_rejected() {
        let mut req = create("a@x.com", "secret1");
        req.address = "   ".into();
        let err = req.validate().unwrap_err();
        assert_eq!(err.to_string(), "validation failed: address is required");
    }

    #[test]
    fn missing_field_fails_deserialization() {
        let res = serde_json::from_str::<CreateUserRequest>(
            r#"{"email":"a@x.com","name":"A","password":"secret1"}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn login_requires_password() {
        let req = LoginRequest {
            email: "a@x.com".into(),
            password: String::new(),
        };
        assert!(matches!(req.validate(), Err(AuthError::Validation(_))));
    }
}
