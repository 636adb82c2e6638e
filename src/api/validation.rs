use super::ApiError;
use crate::domain::AccountId;

pub const MAX_PAGE_SIZE: u64 = 100;

pub fn validate_account_id(id: i32) -> Result<AccountId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid account ID: {id}. ID must be a positive integer"
        ))
        .with_field("id"));
    }
    Ok(AccountId::new(id))
}

pub fn validate_page(page: Option<u64>) -> Result<u64, ApiError> {
    match page {
        None => Ok(1),
        Some(0) => Err(ApiError::validation("Page numbers start at 1").with_field("page")),
        Some(page) => Ok(page),
    }
}

/// `None` selects the service default.
pub fn validate_page_size(page_size: Option<u64>) -> Result<u64, ApiError> {
    match page_size {
        None => Ok(0),
        Some(size) if (1..=MAX_PAGE_SIZE).contains(&size) => Ok(size),
        Some(size) => Err(ApiError::validation(format!(
            "Invalid page size: {size}. Page size must be between 1 and {MAX_PAGE_SIZE}"
        ))
        .with_field("page_size")),
    }
}

pub fn validate_identifier_query(identifier: &str) -> Result<&str, ApiError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(
            ApiError::validation("Login identifier cannot be empty").with_field("login_identifier")
        );
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_account_id() {
        assert!(validate_account_id(1).is_ok());
        assert!(validate_account_id(12345).is_ok());
        assert!(validate_account_id(0).is_err());
        assert!(validate_account_id(-1).is_err());
    }

    #[test]
    fn test_validate_page_size() {
        assert_eq!(validate_page_size(None).unwrap(), 0);
        assert_eq!(validate_page_size(Some(1)).unwrap(), 1);
        assert_eq!(validate_page_size(Some(100)).unwrap(), 100);
        assert!(validate_page_size(Some(0)).is_err());
        assert!(validate_page_size(Some(101)).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(None).unwrap(), 1);
        assert_eq!(validate_page(Some(3)).unwrap(), 3);
        assert!(validate_page(Some(0)).is_err());
    }

    #[test]
    fn test_validate_identifier_query() {
        assert_eq!(validate_identifier_query(" 5000 ").unwrap(), "5000");
        assert!(validate_identifier_query("   ").is_err());
    }
}
