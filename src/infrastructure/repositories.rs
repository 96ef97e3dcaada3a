//! DB Repository abstractions
//!
//! Every method performs a single round trip to the store (ticket writes that touch
//! two tables run in one transaction).

use crate::error::{AppError, Result};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Category, CategoryPatch, Comment, NewComment, NewTicket, NewUser, Ticket, TicketDocument,
    TicketPatch, TicketStatus, User, UserPatch, Vote,
};
use crate::infrastructure::traits::{CategoryRepository, TicketRepository, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::error;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use uuid::Uuid;

fn db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::BadRequest("a record with the same unique value already exists".into());
        }
    }
    error!("{e}");
    AppError::Database(e)
}

/// Builds `<prefix> (?, ?, ...)` for an `IN` clause.
fn in_clause<'args>(prefix: &str, ids: &'args [Uuid]) -> QueryBuilder<'args, Sqlite> {
    let mut builder = QueryBuilder::new(prefix);
    builder.push(" (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    builder
}

#[injectable(UserRepository)]
pub struct DbUserRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbUserRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> DbUserRepository {
        DbUserRepository { connection }
    }
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn list_users(&self) -> Result<Vec<User>> {
        sqlx::query_as("SELECT * FROM users ORDER BY name ASC")
            .fetch_all(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as("SELECT * FROM users WHERE email = ? LIMIT 1")
            .bind(email)
            .fetch_optional(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = in_clause("SELECT * FROM users WHERE id IN", user_ids);
        query
            .build_query_as::<User>()
            .fetch_all(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        sqlx::query_as(
            "INSERT INTO users (id, name, email, avatar, role) VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.avatar)
        .bind(user.role)
        .fetch_one(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET name = COALESCE(?, name), email = COALESCE(?, email), avatar = COALESCE(?, avatar), role = COALESCE(?, role) WHERE id = ?",
        )
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.avatar)
        .bind(patch.role)
        .bind(user_id)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&**self.connection)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

#[injectable(CategoryRepository)]
pub struct DbCategoryRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbCategoryRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> DbCategoryRepository {
        DbCategoryRepository { connection }
    }
}

#[async_trait]
impl CategoryRepository for DbCategoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        sqlx::query_as("SELECT * FROM categories ORDER BY name ASC")
            .fetch_all(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>> {
        sqlx::query_as("SELECT * FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        sqlx::query_as("SELECT * FROM categories WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn get_categories_by_ids(&self, category_ids: &[Uuid]) -> Result<Vec<Category>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = in_clause("SELECT * FROM categories WHERE id IN", category_ids);
        query
            .build_query_as::<Category>()
            .fetch_all(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn create_category(&self, name: String) -> Result<Category> {
        sqlx::query_as("INSERT INTO categories (id, name) VALUES (?, ?) RETURNING *")
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn update_category(&self, category_id: Uuid, patch: CategoryPatch) -> Result<()> {
        let result = sqlx::query("UPDATE categories SET name = COALESCE(?, name) WHERE id = ?")
            .bind(patch.name)
            .bind(category_id)
            .execute(&**self.connection)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("category".into()));
        }
        Ok(())
    }

    async fn delete_category(&self, category_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(category_id)
            .execute(&**self.connection)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

#[injectable(TicketRepository)]
pub struct DbTicketRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbTicketRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> DbTicketRepository {
        DbTicketRepository { connection }
    }

    async fn comments_for(&self, ticket_id: Uuid) -> Result<Vec<Comment>> {
        sqlx::query_as(
            "SELECT * FROM comments WHERE ticket_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(ticket_id)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }
}

#[async_trait]
impl TicketRepository for DbTicketRepository {
    async fn list_tickets(&self) -> Result<Vec<TicketDocument>> {
        let tickets: Vec<Ticket> = sqlx::query_as("SELECT * FROM tickets ORDER BY created_at ASC")
            .fetch_all(&**self.connection)
            .await
            .map_err(db_error)?;

        let comments: Vec<Comment> =
            sqlx::query_as("SELECT * FROM comments ORDER BY created_at ASC, rowid ASC")
                .fetch_all(&**self.connection)
                .await
                .map_err(db_error)?;

        let mut comments_by_ticket: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for comment in comments {
            comments_by_ticket
                .entry(comment.ticket_id)
                .or_default()
                .push(comment);
        }

        Ok(tickets
            .into_iter()
            .map(|ticket| {
                let comments = comments_by_ticket.remove(&ticket.id).unwrap_or_default();
                TicketDocument { ticket, comments }
            })
            .collect())
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<TicketDocument>> {
        let ticket: Option<Ticket> = sqlx::query_as("SELECT * FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(&**self.connection)
            .await
            .map_err(db_error)?;

        match ticket {
            Some(ticket) => {
                let comments = self.comments_for(ticket.id).await?;
                Ok(Some(TicketDocument { ticket, comments }))
            }
            None => Ok(None),
        }
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<TicketDocument> {
        let now = Utc::now();
        let ticket: Ticket = sqlx::query_as(
            "INSERT INTO tickets (id, subject, description, status, category_id, requester_id, assignee_id, created_at, updated_at, upvotes, downvotes) VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?, 0, 0) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(ticket.subject)
        .bind(ticket.description)
        .bind(TicketStatus::Open)
        .bind(ticket.category_id)
        .bind(ticket.requester_id)
        .bind(now)
        .bind(now)
        .fetch_one(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(TicketDocument {
            ticket,
            comments: Vec::new(),
        })
    }

    async fn update_ticket(&self, ticket_id: Uuid, patch: TicketPatch) -> Result<()> {
        let (set_assignee, assignee_id) = match patch.assignee {
            Some(assignee_id) => (true, assignee_id),
            None => (false, None),
        };

        let result = sqlx::query(
            "UPDATE tickets SET subject = COALESCE(?, subject), description = COALESCE(?, description), status = COALESCE(?, status), category_id = COALESCE(?, category_id), assignee_id = CASE WHEN ? THEN ? ELSE assignee_id END, updated_at = MAX(updated_at, ?) WHERE id = ?",
        )
        .bind(patch.subject)
        .bind(patch.description)
        .bind(patch.status)
        .bind(patch.category_id)
        .bind(set_assignee)
        .bind(assignee_id)
        .bind(Utc::now())
        .bind(ticket_id)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("ticket".into()));
        }
        Ok(())
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .execute(&**self.connection)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn append_comment(&self, ticket_id: Uuid, comment: NewComment) -> Result<Comment> {
        let now = Utc::now();
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        let touched = sqlx::query("UPDATE tickets SET updated_at = MAX(updated_at, ?) WHERE id = ?")
            .bind(now)
            .bind(ticket_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        if touched.rows_affected() == 0 {
            return Err(AppError::NotFound("ticket".into()));
        }

        let comment = sqlx::query_as(
            "INSERT INTO comments (id, ticket_id, author_id, content, created_at, is_agent) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(ticket_id)
        .bind(comment.author_id)
        .bind(comment.content)
        .bind(now)
        .bind(comment.is_agent)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(comment)
    }

    async fn record_vote(&self, ticket_id: Uuid, vote: Vote) -> Result<()> {
        let (up, down) = match vote {
            Vote::Up => (1, 0),
            Vote::Down => (0, 1),
        };

        let result = sqlx::query(
            "UPDATE tickets SET upvotes = upvotes + ?, downvotes = downvotes + ?, updated_at = MAX(updated_at, ?) WHERE id = ?",
        )
        .bind(up)
        .bind(down)
        .bind(Utc::now())
        .bind(ticket_id)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("ticket".into()));
        }
        Ok(())
    }

    async fn delete_all_tickets(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tickets")
            .execute(&**self.connection)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }
}
