//! User administration and own-profile endpoints

use crate::api::ExtractToken;
use crate::api::users::schemas::{CreateUser, UpdateProfile, UpdateUser, User, UserList};
use crate::core::traits::{SessionService, UserService};
use crate::error::Result;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(profile).patch(update_profile))
        .route("/:id", patch(update_user).delete(delete_user))
}

async fn list_users(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(user_service): Inject<dyn UserService>,
    ExtractToken(token): ExtractToken,
) -> Result<Json<UserList>> {
    let session = session_service.resolve(&token).await?;
    let users = user_service.list_users(&session).await?;
    Ok(Json(UserList::from(users)))
}

async fn create_user(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(user_service): Inject<dyn UserService>,
    ExtractToken(token): ExtractToken,
    Json(user): Json<CreateUser>,
) -> Result<(StatusCode, Json<UserList>)> {
    let session = session_service.resolve(&token).await?;
    let users = user_service.create_user(&session, user.into()).await?;
    Ok((StatusCode::CREATED, Json(UserList::from(users))))
}

async fn update_user(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(user_service): Inject<dyn UserService>,
    ExtractToken(token): ExtractToken,
    Path(user_id): Path<Uuid>,
    Json(patch): Json<UpdateUser>,
) -> Result<Json<UserList>> {
    let session = session_service.resolve(&token).await?;
    let users = user_service
        .update_user(&session, user_id, patch.into())
        .await?;
    Ok(Json(UserList::from(users)))
}

async fn delete_user(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(user_service): Inject<dyn UserService>,
    ExtractToken(token): ExtractToken,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserList>> {
    let session = session_service.resolve(&token).await?;
    let users = user_service.delete_user(&session, user_id).await?;
    Ok(Json(UserList::from(users)))
}

async fn profile(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(user_service): Inject<dyn UserService>,
    ExtractToken(token): ExtractToken,
) -> Result<Json<User>> {
    let session = session_service.resolve(&token).await?;
    let user = user_service.profile(&session).await?;
    Ok(Json(user.into()))
}

async fn update_profile(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(user_service): Inject<dyn UserService>,
    ExtractToken(token): ExtractToken,
    Json(update): Json<UpdateProfile>,
) -> Result<Json<User>> {
    let session = session_service.resolve(&token).await?;
    let user = user_service
        .update_profile(&session, update.name, update.avatar)
        .await?;
    Ok(Json(user.into()))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use crate::infrastructure::entities::Role;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Serialize, Debug, Clone)]
    pub struct User {
        pub id: Uuid,
        pub name: String,
        pub email: String,
        pub avatar: String,
        pub role: Role,
    }

    impl From<entities::User> for User {
        fn from(user: entities::User) -> Self {
            User {
                id: user.id,
                name: user.name,
                email: user.email,
                avatar: user.avatar,
                role: user.role,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct UserList {
        pub users: Vec<User>,
    }

    impl From<Vec<entities::User>> for UserList {
        fn from(users: Vec<entities::User>) -> Self {
            UserList {
                users: users.into_iter().map(User::from).collect(),
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct CreateUser {
        pub name: String,
        pub email: String,
        #[serde(default)]
        pub avatar: String,
        pub role: Role,
    }

    impl From<CreateUser> for entities::NewUser {
        fn from(user: CreateUser) -> Self {
            entities::NewUser {
                name: user.name,
                email: user.email,
                avatar: user.avatar,
                role: user.role,
            }
        }
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct UpdateUser {
        pub name: Option<String>,
        pub email: Option<String>,
        pub avatar: Option<String>,
        pub role: Option<Role>,
    }

    impl From<UpdateUser> for entities::UserPatch {
        fn from(patch: UpdateUser) -> Self {
            entities::UserPatch {
                name: patch.name,
                email: patch.email,
                avatar: patch.avatar,
                role: patch.role,
            }
        }
    }

    /// Own-profile changes. There is no role field.
    #[derive(Deserialize, Debug, Default)]
    pub struct UpdateProfile {
        pub name: Option<String>,
        pub avatar: Option<String>,
    }
}
