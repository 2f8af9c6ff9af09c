use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    categories::repo::Category,
    envelope::{ApiError, Envelope},
    journal::{
        dto::{validate_entry, CreateEntryRequest, DeleteParams, Deleted, GetParams,
              UpdateEntryRequest},
        repo::JournalEntry,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/journal-entries", post(create_entry))
        .route("/journal-entries", patch(update_entry))
        .route("/journal-entries", get(get_entries))
        .route("/journal-entries", delete(delete_entry))
}

/// Tenant isolation covers associations too: an entry may only reference a
/// category owned by the same user.
async fn ensure_owned_category(
    db: &PgPool,
    user_id: Uuid,
    category_id: Uuid,
) -> Result<(), ApiError> {
    Category::get_one(db, user_id, category_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| {
            warn!(%user_id, %category_id, "entry references a category the user does not own");
            ApiError::not_found("Category not found")
        })
}

#[instrument(skip(state, payload))]
pub async fn create_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<Envelope<JournalEntry>>), ApiError> {
    validate_entry(&payload.entry)?;
    if let Some(category_id) = payload.category_id {
        ensure_owned_category(&state.db, user_id, category_id).await?;
    }

    let entry =
        JournalEntry::create(&state.db, user_id, &payload.entry, payload.category_id).await?;

    info!(%user_id, entry_id = %entry.id, "journal entry added");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_data("journal entry added successfully", entry)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateEntryRequest>,
) -> Result<(StatusCode, Json<Envelope<JournalEntry>>), ApiError> {
    if let Some(entry) = &payload.entry {
        validate_entry(entry)?;
    }
    if let Some(category_id) = payload.category_id {
        ensure_owned_category(&state.db, user_id, category_id).await?;
    }

    let entry = JournalEntry::update(
        &state.db,
        user_id,
        payload.id,
        payload.entry.as_deref(),
        payload.category_id,
    )
    .await?
    .ok_or_else(|| {
        warn!(%user_id, entry_id = %payload.id, "update missed");
        ApiError::not_found("Journal entry not found")
    })?;

    info!(%user_id, entry_id = %entry.id, "journal entry updated");
    Ok((
        StatusCode::OK,
        Json(Envelope::with_data(
            "journal entry updated successfully",
            entry,
        )),
    ))
}

#[instrument(skip(state))]
pub async fn get_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<GetParams>,
) -> Result<(StatusCode, Json<Envelope<Vec<JournalEntry>>>), ApiError> {
    let entries = match params.id {
        Some(id) => {
            let entry = JournalEntry::get_one(&state.db, user_id, id)
                .await?
                .ok_or_else(|| ApiError::not_found("Journal entry not found"))?;
            vec![entry]
        }
        None => JournalEntry::get_many(&state.db, user_id).await?,
    };

    Ok((
        StatusCode::OK,
        Json(Envelope::with_data("Request successful", entries)),
    ))
}

#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<DeleteParams>,
) -> Result<(StatusCode, Json<Envelope<Deleted>>), ApiError> {
    let deleted = JournalEntry::delete(&state.db, user_id, params.id).await?;
    if deleted == 0 {
        warn!(%user_id, entry_id = %params.id, "delete missed");
        return Err(ApiError::not_found("Journal entry not found"));
    }

    info!(%user_id, entry_id = %params.id, "journal entry deleted");
    Ok((
        StatusCode::OK,
        Json(Envelope::with_data(
            "journal entry deleted successfully",
            Deleted { deleted },
        )),
    ))
}
