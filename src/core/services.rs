//! Implementations for the service the app needs.
//!

use crate::SUGGESTION_SENDER;
use crate::core::assistant::{SuggestReplyInput, SuggestReplyOutput, SuggestionTask};
use crate::core::authorization::{Action, authorize};
use crate::core::dashboard::{DashboardSummary, summarize};
use crate::core::enrichment::{EnrichedTicket, enrich_ticket_document, enrich_tickets};
use crate::core::queries::TicketQuery;
use crate::core::session::{AuthEvent, Session, SessionManager, SessionRegistry, SessionToken};
use crate::core::traits::{
    CategoryService, ReplySuggester, SessionService, TicketService, UserService,
};
use crate::error::{AppError, Result};
use crate::infrastructure::entities::{
    Category, CategoryPatch, NewComment, NewTicket, NewUser, TicketDocument, TicketPatch,
    User, UserPatch, Vote,
};
use crate::infrastructure::traits::{
    CategoryRepository, IdentityProvider, TicketRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, inject, injectable};
use log::{debug, info};
use uuid::Uuid;

fn required(field: &str, value: String) -> Result<String> {
    let value = value.trim().to_owned();
    if value.is_empty() {
        Err(AppError::BadRequest(format!("{field} must not be empty")))
    } else {
        Ok(value)
    }
}

fn optional(field: &str, value: Option<String>) -> Result<Option<String>> {
    value.map(|value| required(field, value)).transpose()
}

#[injectable(SessionService)]
pub struct MySessionService {
    users: Ref<dyn UserRepository>,
    identity: Ref<dyn IdentityProvider>,
    sessions: Ref<SessionRegistry>,
}

#[async_trait]
impl SessionService for MySessionService {
    async fn resolve(&self, token: &SessionToken) -> Result<Session> {
        let Some(manager) = self.sessions.get(token).await else {
            debug!("unknown session token");
            return Ok(Session::SignedOut);
        };

        let session = manager.refresh().await?;
        if !session.is_signed_in() {
            self.sessions.remove(token).await;
        }
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(SessionToken, Session)> {
        let identity = self
            .identity
            .sign_in_with_password(email.trim(), password)
            .await?;

        let manager = SessionManager::new(self.users.clone());
        let session = manager.handle(AuthEvent::SignedIn(identity)).await;
        match session {
            Session::SignedOut => Err(AppError::Unauthorized(
                "No user profile found for that account.".into(),
            )),
            session => Ok((self.sessions.insert(manager).await, session)),
        }
    }

    async fn sign_out(&self, token: &SessionToken) -> Result<()> {
        if let Some(manager) = self.sessions.remove(token).await {
            manager.handle(AuthEvent::SignedOut).await;
        }
        Ok(())
    }
}

#[injectable(TicketService)]
pub struct MyTicketService {
    tickets: Ref<dyn TicketRepository>,
    users: Ref<dyn UserRepository>,
    categories: Ref<dyn CategoryRepository>,
    suggester: Ref<dyn ReplySuggester>,
}

impl MyTicketService {
    async fn enrich(&self, document: TicketDocument) -> Result<EnrichedTicket> {
        enrich_ticket_document(document, &*self.users, &*self.categories).await
    }

    async fn load(&self, ticket_id: Uuid) -> Result<TicketDocument> {
        self.tickets
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound("ticket".into()))
    }

    async fn reload(&self, ticket_id: Uuid) -> Result<EnrichedTicket> {
        let document = self.load(ticket_id).await?;
        self.enrich(document).await
    }

    /// Loads a ticket the caller may act on. End users get `NotFound` for a ticket
    /// raised by someone else, the same answer as for an id that does not exist.
    async fn load_visible<'s>(
        &self,
        session: &'s Session,
        ticket_id: Uuid,
        action: fn(Uuid) -> Action,
    ) -> Result<(&'s User, TicketDocument)> {
        authorize(session, Action::ListTickets)?;
        let document = self.load(ticket_id).await?;

        match authorize(session, action(document.ticket.requester_id)) {
            Ok(user) => Ok((user, document)),
            Err(AppError::Forbidden(_)) => Err(AppError::NotFound("ticket".into())),
            Err(e) => Err(e),
        }
    }

    async fn ensure_category(&self, category_id: Uuid) -> Result<()> {
        match self.categories.get_category(category_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::BadRequest("unknown category".into())),
        }
    }

    async fn ensure_assignable(&self, user_id: Uuid) -> Result<()> {
        match self.users.get_user(user_id).await? {
            Some(user) if user.role.is_staff() => Ok(()),
            Some(_) => Err(AppError::BadRequest(
                "tickets can only be assigned to agents or admins".into(),
            )),
            None => Err(AppError::BadRequest("unknown assignee".into())),
        }
    }
}

#[async_trait]
impl TicketService for MyTicketService {
    async fn list_tickets(
        &self,
        session: &Session,
        query: TicketQuery,
    ) -> Result<Vec<EnrichedTicket>> {
        let user = authorize(session, Action::ListTickets)?;
        let sees_all = user.role.permits(user.id, Action::ViewAllTickets);

        let documents: Vec<TicketDocument> = self
            .tickets
            .list_tickets()
            .await?
            .into_iter()
            .filter(|d| sees_all || d.ticket.requester_id == user.id)
            .collect();

        let tickets = enrich_tickets(documents, &*self.users, &*self.categories).await?;
        Ok(query.apply(tickets))
    }

    async fn get_ticket(
        &self,
        session: &Session,
        ticket_id: Uuid,
    ) -> Result<Option<EnrichedTicket>> {
        let document = match self
            .load_visible(session, ticket_id, |requester_id| Action::ViewTicket {
                requester_id,
            })
            .await
        {
            Ok((_, document)) => document,
            Err(AppError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(Some(self.enrich(document).await?))
    }

    async fn create_ticket(
        &self,
        session: &Session,
        subject: String,
        description: String,
        category_id: Uuid,
    ) -> Result<EnrichedTicket> {
        let user = authorize(session, Action::CreateTicket)?;
        let subject = required("subject", subject)?;
        let description = required("description", description)?;
        self.ensure_category(category_id).await?;

        let document = self
            .tickets
            .create_ticket(NewTicket {
                subject,
                description,
                category_id,
                requester_id: user.id,
            })
            .await?;

        info!("{} raised ticket {}", user.email, document.ticket.id);
        self.enrich(document).await
    }

    async fn update_ticket(
        &self,
        session: &Session,
        ticket_id: Uuid,
        patch: TicketPatch,
    ) -> Result<EnrichedTicket> {
        let user = authorize(session, Action::ManageTicket)?;

        let patch = TicketPatch {
            subject: optional("subject", patch.subject)?,
            description: optional("description", patch.description)?,
            ..patch
        };

        if patch.is_empty() {
            return self.reload(ticket_id).await;
        }
        if let Some(category_id) = patch.category_id {
            self.ensure_category(category_id).await?;
        }
        if let Some(Some(assignee_id)) = patch.assignee {
            self.ensure_assignable(assignee_id).await?;
        }

        self.tickets.update_ticket(ticket_id, patch).await?;
        info!("{} updated ticket {ticket_id}", user.email);
        self.reload(ticket_id).await
    }

    async fn add_comment(
        &self,
        session: &Session,
        ticket_id: Uuid,
        content: String,
    ) -> Result<EnrichedTicket> {
        let (user, _) = self
            .load_visible(session, ticket_id, |requester_id| {
                Action::CommentOnTicket { requester_id }
            })
            .await?;
        let content = required("content", content)?;

        self.tickets
            .append_comment(
                ticket_id,
                NewComment {
                    author_id: user.id,
                    content,
                    is_agent: user.role.is_staff(),
                },
            )
            .await?;

        self.reload(ticket_id).await
    }

    async fn vote(&self, session: &Session, ticket_id: Uuid, vote: Vote) -> Result<EnrichedTicket> {
        self.load_visible(session, ticket_id, |requester_id| Action::Vote {
            requester_id,
        })
        .await?;

        self.tickets.record_vote(ticket_id, vote).await?;
        self.reload(ticket_id).await
    }

    async fn dashboard(&self, session: &Session) -> Result<DashboardSummary> {
        authorize(session, Action::ViewDashboard)?;

        let tickets = enrich_tickets(
            self.tickets.list_tickets().await?,
            &*self.users,
            &*self.categories,
        )
        .await?;

        Ok(summarize(tickets, Utc::now()))
    }

    async fn suggest_reply(
        &self,
        session: &Session,
        ticket_id: Uuid,
    ) -> Result<SuggestReplyOutput> {
        authorize(session, Action::SuggestReply)?;

        let ticket = self.reload(ticket_id).await?;
        self.suggester
            .suggest_reply(SuggestReplyInput::from_ticket(&ticket))
            .await
    }
}

#[injectable(CategoryService)]
pub struct MyCategoryService {
    categories: Ref<dyn CategoryRepository>,
}

#[async_trait]
impl CategoryService for MyCategoryService {
    async fn list_categories(&self, session: &Session) -> Result<Vec<Category>> {
        authorize(session, Action::ListCategories)?;
        self.categories.list_categories().await
    }

    async fn create_category(&self, session: &Session, name: String) -> Result<Vec<Category>> {
        let user = authorize(session, Action::ManageCategories)?;
        let category = self
            .categories
            .create_category(required("name", name)?)
            .await?;

        info!("{} added category {}", user.email, category.name);
        self.categories.list_categories().await
    }

    async fn rename_category(
        &self,
        session: &Session,
        category_id: Uuid,
        name: String,
    ) -> Result<Vec<Category>> {
        authorize(session, Action::ManageCategories)?;
        self.categories
            .update_category(
                category_id,
                CategoryPatch {
                    name: Some(required("name", name)?),
                },
            )
            .await?;

        self.categories.list_categories().await
    }

    async fn delete_category(&self, session: &Session, category_id: Uuid) -> Result<Vec<Category>> {
        let user = authorize(session, Action::ManageCategories)?;
        self.categories.delete_category(category_id).await?;

        info!("{} deleted category {category_id}", user.email);
        self.categories.list_categories().await
    }
}

#[injectable(UserService)]
pub struct MyUserService {
    users: Ref<dyn UserRepository>,
}

#[async_trait]
impl UserService for MyUserService {
    async fn list_users(&self, session: &Session) -> Result<Vec<User>> {
        authorize(session, Action::ManageUsers)?;
        self.users.list_users().await
    }

    async fn create_user(&self, session: &Session, user: NewUser) -> Result<Vec<User>> {
        let admin = authorize(session, Action::ManageUsers)?;
        let user = NewUser {
            name: required("name", user.name)?,
            email: required("email", user.email)?.to_lowercase(),
            ..user
        };

        let created = self.users.create_user(user).await?;
        info!("{} added {} as {}", admin.email, created.email, created.role);
        self.users.list_users().await
    }

    async fn update_user(
        &self,
        session: &Session,
        user_id: Uuid,
        patch: UserPatch,
    ) -> Result<Vec<User>> {
        authorize(session, Action::ManageUsers)?;
        let patch = UserPatch {
            name: optional("name", patch.name)?,
            email: optional("email", patch.email)?.map(|email| email.to_lowercase()),
            ..patch
        };

        self.users.update_user(user_id, patch).await?;
        self.users.list_users().await
    }

    async fn delete_user(&self, session: &Session, user_id: Uuid) -> Result<Vec<User>> {
        let admin = authorize(session, Action::ManageUsers)?;
        if admin.id == user_id {
            return Err(AppError::BadRequest("you cannot delete your own account".into()));
        }

        self.users.delete_user(user_id).await?;
        info!("{} deleted user {user_id}", admin.email);
        self.users.list_users().await
    }

    async fn profile(&self, session: &Session) -> Result<User> {
        Ok(authorize(session, Action::EditOwnProfile)?.clone())
    }

    async fn update_profile(
        &self,
        session: &Session,
        name: Option<String>,
        avatar: Option<String>,
    ) -> Result<User> {
        let user = authorize(session, Action::EditOwnProfile)?;

        self.users
            .update_user(
                user.id,
                UserPatch {
                    name: optional("name", name)?,
                    avatar: avatar.map(|avatar| avatar.trim().to_owned()),
                    ..UserPatch::default()
                },
            )
            .await?;

        self.users
            .get_user(user.id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".into()))
    }
}

/// Hands suggestion requests to the assistant worker started in `main`.
pub struct QueuedReplySuggester;

#[injectable(ReplySuggester)]
impl QueuedReplySuggester {
    #[inject]
    pub fn create() -> QueuedReplySuggester {
        QueuedReplySuggester
    }
}

#[async_trait]
impl ReplySuggester for QueuedReplySuggester {
    async fn suggest_reply(&self, input: SuggestReplyInput) -> Result<SuggestReplyOutput> {
        let sender = SUGGESTION_SENDER
            .get()
            .ok_or_else(|| AppError::Suggestion("assistant is not running".into()))?;

        let (task, receiver) = SuggestionTask::new(input);
        sender
            .send(task)
            .await
            .map_err(|_| AppError::Suggestion("assistant queue closed".into()))?;

        let suggested_reply = receiver
            .await
            .map_err(|_| AppError::Suggestion("assistant dropped the request".into()))??;

        Ok(SuggestReplyOutput { suggested_reply })
    }
}
