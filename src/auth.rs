use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::warn;

use crate::error::AppError;
use crate::models::User;
use crate::AppState;

const USER_KEY: &str = "user";

/// The signed-in user; rejects with 401 when there is none.
pub struct AuthUser(pub User);

/// The signed-in user, if any. Anonymous requests still succeed.
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.id.as_str())
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Ok(session) = Session::from_request_parts(parts, state).await else {
            return Ok(MaybeUser(None));
        };

        let Some(stored) = session.get::<User>(USER_KEY).await.ok().flatten() else {
            return Ok(MaybeUser(None));
        };

        // The session copy can outlive the account it was made for
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&stored.id)
            .fetch_optional(&state.db)
            .await?;

        if user.is_none() {
            warn!(user_id = %stored.id, "Session user no longer exists, signing out");
            logout_user(&session).await?;
        }

        Ok(MaybeUser(user))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.map(AuthUser).ok_or(AppError::Unauthenticated)
    }
}

pub async fn login_user(session: &Session, user: User) -> Result<(), tower_sessions::session::Error> {
    session.insert(USER_KEY, user).await
}

pub async fn logout_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
