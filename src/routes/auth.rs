use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::auth::{login_user, logout_user};
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::models::User;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    invite_code: String,
}

#[derive(Serialize)]
struct UserView {
    id: String,
    name: String,
    email: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login_submit))
        .route("/logout", post(logout))
}

async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    JsonBody(form): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE invite_code = ?")
        .bind(form.invite_code.trim())
        .fetch_optional(&state.db)
        .await?;

    let Some(user) = user else {
        return Err(AppError::invalid("invite_code", "Invalid invite code"));
    };

    let view = UserView {
        id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
    };
    login_user(&session, user).await?;
    Ok(Json(view))
}

async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    logout_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
