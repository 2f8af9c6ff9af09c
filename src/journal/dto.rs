use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub entry: String,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntryRequest {
    pub id: Uuid,
    pub entry: Option<String>,
    pub category_id: Option<Uuid>,
}

/// `GET /journal-entries?id=` narrows the fetch to one entry.
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

pub(crate) fn validate_entry(entry: &str) -> Result<(), ApiError> {
    if entry.trim().is_empty() {
        return Err(ApiError::validation("Journal entry must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_entries_are_rejected() {
        assert!(validate_entry("").is_err());
        assert!(validate_entry("  \n").is_err());
        assert!(validate_entry("hello").is_ok());
    }

    #[test]
    fn update_request_fields_are_optional() {
        let req: UpdateEntryRequest = serde_json::from_value(serde_json::json!({
            "id": "4be2a5a5-7bb9-4f20-9c4f-0f4778b00d2e"
        }))
        .unwrap();
        assert!(req.entry.is_none());
        assert!(req.category_id.is_none());
    }
}
