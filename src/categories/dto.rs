use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub id: Uuid,
    pub name: String,
}

/// `GET /categories?id=` narrows the fetch to one category.
#[derive(Debug, Deserialize)]
pub struct GetParams {
    pub id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: u64,
}

pub(crate) fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("Category name must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("Work").is_ok());
    }
}
