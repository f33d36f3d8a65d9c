use crate::error::RegistryError;
use crate::model::{ClientUpdate, NewClient, Page};
use regex::Regex;
use std::sync::LazyLock;
use validator::Validate;

static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z][0-9A-Za-z -]{1,9}$").expect("postal code pattern compiles")
});

/// Largest page a listing may ask for
pub const MAX_PAGE_SIZE: usize = 100;

/// Request validation utilities
pub struct RequestValidator;

impl RequestValidator {
    /// Validates the body of a client creation request
    pub fn validate_new_client(client: &NewClient) -> Result<(), RegistryError> {
        client.validate()?;
        Self::validate_postal_code(&client.postal_code)
    }

    /// Validates a partial update
    pub fn validate_update(changes: &ClientUpdate) -> Result<(), RegistryError> {
        if changes.is_empty() {
            return Err(RegistryError::Validation(
                "Update must change at least one field".to_string(),
            ));
        }

        changes.validate()?;

        match &changes.postal_code {
            Some(postal_code) => Self::validate_postal_code(postal_code),
            None => Ok(()),
        }
    }

    /// Validates listing parameters
    pub fn validate_page(page: &Page) -> Result<(), RegistryError> {
        if page.limit == 0 || page.limit > MAX_PAGE_SIZE {
            return Err(RegistryError::Validation(format!(
                "Limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }

    fn validate_postal_code(postal_code: &str) -> Result<(), RegistryError> {
        if !POSTAL_CODE.is_match(postal_code) {
            return Err(RegistryError::Validation(format!(
                "Invalid postal code '{}'",
                postal_code
            )));
        }
        Ok(())
    }
}
