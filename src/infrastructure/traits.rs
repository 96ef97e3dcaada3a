//! Infrastructure traits, used for DI on higher levels

use crate::error::Result;
use crate::infrastructure::entities;
use crate::infrastructure::entities::Vote;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<entities::User>>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<entities::User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<entities::User>>;

    /// Fetches every user whose id is in `user_ids`. Unknown ids are skipped.
    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<entities::User>>;

    async fn create_user(&self, user: entities::NewUser) -> Result<entities::User>;

    async fn update_user(&self, user_id: Uuid, patch: entities::UserPatch) -> Result<()>;
    async fn delete_user(&self, user_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<entities::Category>>;
    async fn get_category(&self, category_id: Uuid) -> Result<Option<entities::Category>>;
    async fn get_category_by_name(&self, name: &str) -> Result<Option<entities::Category>>;
    async fn get_categories_by_ids(
        &self,
        category_ids: &[Uuid],
    ) -> Result<Vec<entities::Category>>;
    async fn create_category(&self, name: String) -> Result<entities::Category>;
    async fn update_category(
        &self,
        category_id: Uuid,
        patch: entities::CategoryPatch,
    ) -> Result<()>;
    async fn delete_category(&self, category_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Lists every ticket with its comments attached.
    async fn list_tickets(&self) -> Result<Vec<entities::TicketDocument>>;

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<entities::TicketDocument>>;

    async fn create_ticket(&self, ticket: entities::NewTicket) -> Result<entities::TicketDocument>;

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Returns `NotFound` if the ticket does not exist.
    async fn update_ticket(&self, ticket_id: Uuid, patch: entities::TicketPatch) -> Result<()>;

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<()>;

    /// Appends a comment to the end of the ticket's conversation and bumps `updated_at`.
    async fn append_comment(
        &self,
        ticket_id: Uuid,
        comment: entities::NewComment,
    ) -> Result<entities::Comment>;

    async fn record_vote(&self, ticket_id: Uuid, vote: Vote) -> Result<()>;

    /// Removes every ticket. Only used by the seeding tool.
    async fn delete_all_tickets(&self) -> Result<u64>;
}

/// External identity provider. QuickDesk never stores credentials itself.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies an email/password pair with the provider.
    ///
    /// Returns `Identity` errors for rejected credentials.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<crate::infrastructure::identity::AuthIdentity>;
}
