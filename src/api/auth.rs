//! Sign-in endpoints

use crate::api::ExtractToken;
use crate::api::auth::schemas::{LoginRequest, LoginResponse, SessionSnapshot};
use crate::core::traits::SessionService;
use crate::error::{AppError, Result};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(current_session))
}

async fn login(
    Inject(session_service): Inject<dyn SessionService>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (token, session) = session_service
        .sign_in(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token: token.as_str().to_owned(),
        session: SessionSnapshot::from(&session),
    }))
}

async fn logout(
    Inject(session_service): Inject<dyn SessionService>,
    ExtractToken(token): ExtractToken,
) -> Result<StatusCode> {
    session_service.sign_out(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_session(
    Inject(session_service): Inject<dyn SessionService>,
    ExtractToken(token): ExtractToken,
) -> Result<Json<SessionSnapshot>> {
    let session = session_service.resolve(&token).await?;
    if !session.is_signed_in() {
        return Err(AppError::Unauthorized("session expired or unknown".into()));
    }
    Ok(Json(SessionSnapshot::from(&session)))
}

pub mod schemas {
    use crate::api::users::schemas::User;
    use crate::core::session::Session;
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    #[derive(Serialize, Debug)]
    pub struct LoginResponse {
        /// Sent back as `Authorization: Bearer <token>`.
        pub token: String,
        pub session: SessionSnapshot,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct SessionSnapshot {
        pub signed_in: bool,
        pub user: Option<User>,
        pub is_admin: bool,
        pub is_agent: bool,
        pub is_end_user: bool,
    }

    impl From<&Session> for SessionSnapshot {
        fn from(session: &Session) -> Self {
            SessionSnapshot {
                signed_in: session.is_signed_in(),
                user: session.user().cloned().map(User::from),
                is_admin: session.is_admin(),
                is_agent: session.is_agent(),
                is_end_user: session.is_end_user(),
            }
        }
    }
}
