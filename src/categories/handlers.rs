use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    categories::{
        dto::{validate_name, CreateCategoryRequest, DeleteParams, Deleted, GetParams,
              UpdateCategoryRequest},
        repo::Category,
    },
    envelope::{ApiError, Envelope},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", post(create_category))
        .route("/categories", patch(update_category))
        .route("/categories", get(get_categories))
        .route("/categories", delete(delete_category))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Envelope<Category>>), ApiError> {
    validate_name(&payload.name)?;

    let category = Category::create(&state.db, user_id, payload.name.trim()).await?;

    info!(%user_id, category_id = %category.id, "category added");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_data("category added successfully", category)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<(StatusCode, Json<Envelope<Category>>), ApiError> {
    validate_name(&payload.name)?;

    let category = Category::update(&state.db, user_id, payload.id, payload.name.trim())
        .await?
        .ok_or_else(|| {
            warn!(%user_id, category_id = %payload.id, "update missed");
            ApiError::not_found("Category not found")
        })?;

    info!(%user_id, category_id = %category.id, "category updated");
    Ok((
        StatusCode::OK,
        Json(Envelope::with_data("category updated successfully", category)),
    ))
}

#[instrument(skip(state))]
pub async fn get_categories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<GetParams>,
) -> Result<(StatusCode, Json<Envelope<Vec<Category>>>), ApiError> {
    let categories = match params.id {
        Some(id) => {
            let category = Category::get_one(&state.db, user_id, id)
                .await?
                .ok_or_else(|| ApiError::not_found("Category not found"))?;
            vec![category]
        }
        None => Category::get_many(&state.db, user_id).await?,
    };

    Ok((
        StatusCode::OK,
        Json(Envelope::with_data("Request successful", categories)),
    ))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<DeleteParams>,
) -> Result<(StatusCode, Json<Envelope<Deleted>>), ApiError> {
    let deleted = Category::delete(&state.db, user_id, params.id).await?;
    if deleted == 0 {
        warn!(%user_id, category_id = %params.id, "delete missed");
        return Err(ApiError::not_found("Category not found"));
    }

    info!(%user_id, category_id = %params.id, "category deleted");
    Ok((
        StatusCode::OK,
        Json(Envelope::with_data(
            "category deleted successfully",
            Deleted { deleted },
        )),
    ))
}
