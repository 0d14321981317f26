use crate::db;
use crate::domain::user::{Email, NewUser, User};
use crate::state::SharedState;
use crate::web::{api_error, internal, invalid, not_found, ApiError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(create).get(list))
        .route("/:id", get(fetch).put(update).delete(deactivate))
        .route("/:id/reactivate", post(reactivate))
        .with_state(state)
}

#[derive(Serialize)]
struct UserResponse {
    #[serde(flatten)]
    user: User,
    age: i32,
    corporate_email: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            age: user.age_on(Utc::now().date_naive()),
            corporate_email: user.email.is_corporate(),
            user,
        }
    }
}

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    page: Option<i64>,
    page_size: Option<i64>,
    #[serde(default)]
    include_inactive: bool,
}

impl ListParams {
    /// Out-of-range values are clamped rather than rejected.
    fn paging(&self) -> (i64, i64) {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = match self.page_size {
            Some(size) if size > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
            Some(size) if size >= 1 => size,
            _ => DEFAULT_PAGE_SIZE,
        };
        (page, page_size)
    }
}

#[derive(Serialize)]
struct UserPage {
    items: Vec<UserResponse>,
    page: i64,
    page_size: i64,
    total: i64,
    total_pages: i64,
}

fn total_pages(total: i64, page_size: i64) -> i64 {
    (total + page_size - 1) / page_size
}

#[derive(Deserialize)]
struct UpdateUserPayload {
    name: Option<String>,
    /// Blank clears the field.
    phone: Option<String>,
    gender: Option<String>,
}

async fn create(
    State(state): State<SharedState>,
    Json(payload): Json<NewUser>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = Email::parse(&payload.email).map_err(invalid)?;
    if db::email_taken(&state.pool, &email).await.map_err(internal)? {
        return Err(email_taken(&email));
    }

    let user = User::register(payload, Utc::now()).map_err(invalid)?;
    db::insert_user(&state.pool, &state.crypto, &user)
        .await
        .map_err(|e| registration_error(&user.email, e))?;

    tracing::info!(
        "Registered user {} ({} mail domain)",
        user.id,
        if user.email.is_corporate() { "corporate" } else { "free" }
    );
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn list(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<UserPage>, ApiError> {
    let (page, page_size) = params.paging();
    let users = db::list_users(
        &state.pool,
        &state.crypto,
        params.include_inactive,
        page_size,
        (page - 1) * page_size,
    )
    .await
    .map_err(internal)?;
    let total = db::count_users(&state.pool, params.include_inactive)
        .await
        .map_err(internal)?;

    Ok(Json(UserPage {
        items: users.into_iter().map(UserResponse::from).collect(),
        page,
        page_size,
        total,
        total_pages: total_pages(total, page_size),
    }))
}

fn email_taken(email: &Email) -> ApiError {
    api_error(
        StatusCode::CONFLICT,
        "email_taken",
        format!("{email} is already registered"),
    )
}

/// The pre-check can lose a race with a concurrent registration; the UNIQUE
/// index still has the final word.
fn registration_error(email: &Email, err: anyhow::Error) -> ApiError {
    if db::is_unique_violation(&err) {
        tracing::warn!("Concurrent registration for {} rejected", email.domain());
        email_taken(email)
    } else {
        internal(err)
    }
}

async fn load(state: &SharedState, id: Uuid) -> Result<User, ApiError> {
    db::find_user_by_id(&state.pool, &state.crypto, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("user"))
}

async fn fetch(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(load(&state, id).await?.into()))
}

async fn update(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut user = load(&state, id).await?;
    if let Some(name) = payload.name {
        user = user.with_name(&name).map_err(invalid)?;
    }
    if let Some(phone) = payload.phone {
        user = user.with_phone(Some(phone));
    }
    if let Some(gender) = payload.gender {
        user = user.with_gender(Some(gender));
    }

    db::update_user(&state.pool, &state.crypto, &user)
        .await
        .map_err(internal)?;
    Ok(Json(user.into()))
}

/// Soft delete: the user and their history stay, flagged inactive.
async fn deactivate(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user = load(&state, id).await?.deactivated().map_err(invalid)?;
    db::update_user(&state.pool, &state.crypto, &user)
        .await
        .map_err(internal)?;
    tracing::info!("Deactivated user {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn reactivate(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load(&state, id).await?.reactivated().map_err(invalid)?;
    db::update_user(&state.pool, &state.crypto, &user)
        .await
        .map_err(internal)?;
    tracing::info!("Reactivated user {}", id);
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, page_size: Option<i64>) -> ListParams {
        ListParams {
            page,
            page_size,
            ..ListParams::default()
        }
    }

    #[test]
    fn test_paging_defaults_and_clamps() {
        assert_eq!(params(None, None).paging(), (1, 10));
        assert_eq!(params(Some(3), Some(25)).paging(), (3, 25));
        assert_eq!(params(Some(0), Some(0)).paging(), (1, 10));
        assert_eq!(params(Some(-4), Some(-1)).paging(), (1, 10));
        assert_eq!(params(Some(2), Some(500)).paging(), (2, 100));
        assert_eq!(params(None, Some(100)).paging(), (1, 100));
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn test_registration_error_mapping() {
        let email = Email::parse("ana@acme.com").unwrap();

        let duplicate: anyhow::Error =
            sqlx::Error::Database(Box::new(crate::db::tests::PgCodeError("23505"))).into();
        let (status, Json(body)) = registration_error(&email, duplicate);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "email_taken");
        assert!(body.message.contains("ana@acme.com"));

        let (status, Json(body)) = registration_error(&email, anyhow::anyhow!("pool closed"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "internal_error");
    }
}
