//! DI "Interfaces"

use crate::core::assistant::{SuggestReplyInput, SuggestReplyOutput};
use crate::core::dashboard::DashboardSummary;
use crate::core::enrichment::EnrichedTicket;
use crate::core::queries::TicketQuery;
use crate::core::session::{Session, SessionToken};
use crate::error::Result;
use crate::infrastructure::entities;
use crate::infrastructure::entities::Vote;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait SessionService: Send + Sync {
    /// Session held under `token`, with the profile re-read from the store.
    ///
    /// An unknown token yields [`Session::SignedOut`].
    async fn resolve(&self, token: &SessionToken) -> Result<Session>;

    /// Signs in with the identity provider, loads the matching profile and
    /// registers a new session for it.
    ///
    /// Returns `Unauthorized` if the identity has no profile.
    async fn sign_in(&self, email: &str, password: &str) -> Result<(SessionToken, Session)>;

    /// Ends the session held under `token`. Unknown tokens are ignored.
    async fn sign_out(&self, token: &SessionToken) -> Result<()>;
}

#[async_trait]
pub trait TicketService: Send + Sync {
    /// Lists tickets visible to the caller. End users only see tickets they raised.
    async fn list_tickets(&self, session: &Session, query: TicketQuery)
    -> Result<Vec<EnrichedTicket>>;

    /// Somebody else's ticket is reported to an end user as missing.
    async fn get_ticket(&self, session: &Session, ticket_id: Uuid)
    -> Result<Option<EnrichedTicket>>;

    async fn create_ticket(
        &self,
        session: &Session,
        subject: String,
        description: String,
        category_id: Uuid,
    ) -> Result<EnrichedTicket>;

    async fn update_ticket(
        &self,
        session: &Session,
        ticket_id: Uuid,
        patch: entities::TicketPatch,
    ) -> Result<EnrichedTicket>;

    /// Appends a comment by the caller. The agent flag is taken from the caller's
    /// current role and stays as written.
    async fn add_comment(
        &self,
        session: &Session,
        ticket_id: Uuid,
        content: String,
    ) -> Result<EnrichedTicket>;

    async fn vote(&self, session: &Session, ticket_id: Uuid, vote: Vote) -> Result<EnrichedTicket>;

    async fn dashboard(&self, session: &Session) -> Result<DashboardSummary>;

    /// Asks the assistant for a reply to the ticket's latest customer message.
    async fn suggest_reply(&self, session: &Session, ticket_id: Uuid)
    -> Result<SuggestReplyOutput>;
}

#[async_trait]
pub trait CategoryService: Send + Sync {
    async fn list_categories(&self, session: &Session) -> Result<Vec<entities::Category>>;

    /// The mutating operations return the refreshed category list.
    async fn create_category(
        &self,
        session: &Session,
        name: String,
    ) -> Result<Vec<entities::Category>>;

    async fn rename_category(
        &self,
        session: &Session,
        category_id: Uuid,
        name: String,
    ) -> Result<Vec<entities::Category>>;

    /// Tickets that reference the category are left as they are.
    async fn delete_category(
        &self,
        session: &Session,
        category_id: Uuid,
    ) -> Result<Vec<entities::Category>>;
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn list_users(&self, session: &Session) -> Result<Vec<entities::User>>;

    /// The mutating operations return the refreshed user list.
    async fn create_user(
        &self,
        session: &Session,
        user: entities::NewUser,
    ) -> Result<Vec<entities::User>>;

    async fn update_user(
        &self,
        session: &Session,
        user_id: Uuid,
        patch: entities::UserPatch,
    ) -> Result<Vec<entities::User>>;

    async fn delete_user(&self, session: &Session, user_id: Uuid)
    -> Result<Vec<entities::User>>;

    async fn profile(&self, session: &Session) -> Result<entities::User>;

    /// Updates the caller's own name and avatar. The role cannot be changed here.
    async fn update_profile(
        &self,
        session: &Session,
        name: Option<String>,
        avatar: Option<String>,
    ) -> Result<entities::User>;
}

/// Opaque text generation: ticket context in, one suggested reply out.
#[async_trait]
pub trait ReplySuggester: Send + Sync {
    async fn suggest_reply(&self, input: SuggestReplyInput) -> Result<SuggestReplyOutput>;
}
