use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo::User,
    },
    envelope::{ApiError, Envelope},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify/:token", post(verify))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|d| d.is_unique_violation())
        .unwrap_or(false)
}

fn verification_email(username: &str, verify_url: &str) -> (String, String) {
    let text = format!(
        "Hello {username},\n\n\
         Welcome to your journal. Confirm your email address by opening the \
         link below within the next few minutes:\n\n{verify_url}\n\n\
         If you did not create this account you can ignore this message.\n"
    );
    let html = format!(
        "<p>Hello {username},</p>\
         <p>Welcome to your journal. Confirm your email address by clicking \
         the link below within the next few minutes:</p>\
         <p><a href=\"{verify_url}\">Verify my account</a></p>\
         <p>If you did not create this account you can ignore this message.</p>"
    );
    (text, html)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<()>>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();
    payload.validate()?;

    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already registered");
        return Err(ApiError::validation("username is already in use"));
    }
    if User::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::validation("email address is already in use"));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash)
        .await
        .map_err(|e| {
            // a concurrent registration can still hit the unique constraint
            if is_unique_violation(&e) {
                ApiError::validation("username or email is already in use")
            } else {
                ApiError::Internal(e)
            }
        })?;

    let keys = JwtKeys::from_ref(&state);
    match keys.sign_verify(user.id) {
        Ok(token) => {
            let verify_url = format!(
                "{}/auth/verify/{}",
                state.config.server_base_url.trim_end_matches('/'),
                token
            );
            let (text, html) = verification_email(&user.username, &verify_url);
            state
                .mailer
                .send("Verify your journal account", vec![user.email.clone()], text, html);
        }
        // registration already committed; the user can request a fresh link
        Err(e) => error!(error = %e, user_id = %user.id, "verification token issue failed"),
    }

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::msg("user registration successful")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<Envelope<TokenPair>>), ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation(
            "Bad request. Username and Password required",
        ));
    }

    let user = User::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login unknown username");
            ApiError::not_found("User not registered")
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(username = %payload.username, user_id = %user.id, "login wrong password");
        return Err(ApiError::unauthorized("Wrong password"));
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = keys.sign_pair(user.id)?;

    User::touch_last_login(&state.db, user.id).await?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((
        StatusCode::OK,
        Json(Envelope::with_data(
            "login successful",
            TokenPair {
                access_token,
                refresh_token,
            },
        )),
    ))
}

#[instrument(skip(state, token))]
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<(StatusCode, Json<Envelope<()>>), ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_short(&token).map_err(|e| {
        warn!(error = %e, "verification token rejected");
        ApiError::validation("Invalid or expired verification token")
    })?;

    let user = User::activate(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("User not registered"))?;

    info!(user_id = %user.id, username = %user.username, "account verified");
    Ok((StatusCode::OK, Json(Envelope::msg("verification successful"))))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<(StatusCode, Json<Envelope<TokenPair>>), ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("User not registered"))?;

    let (access_token, refresh_token) = keys.sign_pair(user.id)?;
    Ok((
        StatusCode::OK,
        Json(Envelope::with_data(
            "token refresh successful",
            TokenPair {
                access_token,
                refresh_token,
            },
        )),
    ))
}

/// Acknowledgment only: without a revocation list the presented token stays
/// valid until it expires.
#[instrument(skip_all)]
pub async fn logout(
    AuthUser(user_id): AuthUser,
) -> Result<(StatusCode, Json<Envelope<()>>), ApiError> {
    info!(%user_id, "logout acknowledged; token remains valid until expiry");
    Ok((StatusCode::OK, Json(Envelope::msg("logout successful"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_embeds_link_in_both_bodies() {
        let (text, html) = verification_email("alice01", "http://localhost:8080/auth/verify/tok");
        assert!(text.contains("http://localhost:8080/auth/verify/tok"));
        assert!(html.contains("href=\"http://localhost:8080/auth/verify/tok\""));
        assert!(text.contains("alice01"));
    }

    #[test]
    fn token_pair_serializes_both_tokens() {
        let json = serde_json::to_value(TokenPair {
            access_token: "a.b.c".into(),
            refresh_token: "d.e.f".into(),
        })
        .unwrap();
        assert_eq!(json["access_token"], "a.b.c");
        assert_eq!(json["refresh_token"], "d.e.f");
    }

    mod db {
        use super::super::*;
        use crate::auth::repo::UserStatus;
        use crate::config::{AppConfig, JwtConfig};
        use crate::mailer::Mailer;
        use sqlx::postgres::PgPoolOptions;
        use std::sync::Arc;
        use uuid::Uuid;

        async fn db_state() -> AppState {
            let url = std::env::var("DATABASE_URL")
                .expect("DATABASE_URL must point at a migrated database");
            let db = PgPoolOptions::new()
                .max_connections(2)
                .connect(&url)
                .await
                .expect("connect to test database");
            AppState {
                db,
                config: Arc::new(AppConfig {
                    database_url: url,
                    server_base_url: "http://localhost:8080".into(),
                    jwt: JwtConfig {
                        secret: "test-secret".into(),
                        issuer: "test-issuer".into(),
                        audience: "test-aud".into(),
                        access_ttl_hours: 24,
                        refresh_ttl_hours: 72,
                        verify_ttl_seconds: 300,
                    },
                    smtp: None,
                }),
                mailer: Mailer::start(None),
            }
        }

        fn unique(prefix: &str) -> String {
            format!("{prefix}{}", &Uuid::new_v4().simple().to_string()[..10])
        }

        fn registration(username: &str, email: &str) -> RegisterRequest {
            RegisterRequest {
                username: username.into(),
                email: email.into(),
                password: "secret123".into(),
            }
        }

        #[tokio::test]
        #[ignore = "requires a migrated database via DATABASE_URL"]
        async fn duplicate_registration_persists_no_second_row() {
            let state = db_state().await;
            let username = unique("u");
            let email = format!("{}@test.io", unique("m"));

            let (status, _) = register(
                State(state.clone()),
                Json(registration(&username, &email)),
            )
            .await
            .expect("first registration succeeds");
            assert_eq!(status, StatusCode::CREATED);

            let registered = User::find_by_username(&state.db, &username)
                .await
                .unwrap()
                .expect("row persisted");
            assert_eq!(registered.status, UserStatus::Inactive);

            // same username, fresh email
            let err = register(
                State(state.clone()),
                Json(registration(
                    &username,
                    &format!("{}@test.io", unique("m")),
                )),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));

            // same email, fresh username
            let err = register(
                State(state.clone()),
                Json(registration(&unique("u"), &email)),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));

            let count: i64 = sqlx::query_scalar(
                "SELECT count(*) FROM users WHERE username = $1 OR email = $2",
            )
            .bind(&username)
            .bind(&email)
            .fetch_one(&state.db)
            .await
            .unwrap();
            assert_eq!(count, 1);
        }
    }
}
