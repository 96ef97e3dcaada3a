//! Category endpoints

use crate::api::ExtractToken;
use crate::api::categories::schemas::{CategoryList, CategoryName};
use crate::core::traits::{CategoryService, SessionService};
use crate::error::Result;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", patch(rename_category).delete(delete_category))
}

async fn list_categories(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(category_service): Inject<dyn CategoryService>,
    ExtractToken(token): ExtractToken,
) -> Result<Json<CategoryList>> {
    let session = session_service.resolve(&token).await?;
    let categories = category_service.list_categories(&session).await?;
    Ok(Json(CategoryList::from(categories)))
}

async fn create_category(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(category_service): Inject<dyn CategoryService>,
    ExtractToken(token): ExtractToken,
    Json(category): Json<CategoryName>,
) -> Result<(StatusCode, Json<CategoryList>)> {
    let session = session_service.resolve(&token).await?;
    let categories = category_service
        .create_category(&session, category.name)
        .await?;
    Ok((StatusCode::CREATED, Json(CategoryList::from(categories))))
}

async fn rename_category(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(category_service): Inject<dyn CategoryService>,
    ExtractToken(token): ExtractToken,
    Path(category_id): Path<Uuid>,
    Json(category): Json<CategoryName>,
) -> Result<Json<CategoryList>> {
    let session = session_service.resolve(&token).await?;
    let categories = category_service
        .rename_category(&session, category_id, category.name)
        .await?;
    Ok(Json(CategoryList::from(categories)))
}

async fn delete_category(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(category_service): Inject<dyn CategoryService>,
    ExtractToken(token): ExtractToken,
    Path(category_id): Path<Uuid>,
) -> Result<Json<CategoryList>> {
    let session = session_service.resolve(&token).await?;
    let categories = category_service
        .delete_category(&session, category_id)
        .await?;
    Ok(Json(CategoryList::from(categories)))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Serialize, Debug, Clone)]
    pub struct Category {
        pub id: Uuid,
        pub name: String,
    }

    impl From<entities::Category> for Category {
        fn from(category: entities::Category) -> Self {
            Category {
                id: category.id,
                name: category.name,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct CategoryList {
        pub categories: Vec<Category>,
    }

    impl From<Vec<entities::Category>> for CategoryList {
        fn from(categories: Vec<entities::Category>) -> Self {
            CategoryList {
                categories: categories.into_iter().map(Category::from).collect(),
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct CategoryName {
        pub name: String,
    }
}
