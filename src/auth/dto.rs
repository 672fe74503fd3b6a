use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::services::is_valid_email;

/// Request body shared by sign-up and sign-in.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl CredentialsRequest {
    /// Trims the email and checks both fields are usable.
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.email = self.email.trim().to_string();
        if self.email.is_empty() {
            return Err(AppError::validation("email should not be empty"));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("email must be an email"));
        }
        if self.password.is_empty() {
            return Err(AppError::validation("password should not be empty"));
        }
        Ok(self)
    }
}

/// Response returned after sign-in.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(email: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn trims_email() {
        let ok = req("  john.doe@example.com ", "secret").validate().unwrap();
        assert_eq!(ok.email, "john.doe@example.com");
    }

    #[test]
    fn email_case_is_preserved() {
        let ok = req("John.Doe@Example.com", "secret").validate().unwrap();
        assert_eq!(ok.email, "John.Doe@Example.com");
    }

    #[test]
    fn rejects_bad_email_and_empty_password() {
        assert!(matches!(
            req("not-an-email", "secret").validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            req("", "secret").validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            req("john.doe@example.com", "").validate(),
            Err(AppError::Validation(_))
        ));
    }
}
