//! Ticket endpoints

use crate::api::ExtractToken;
use crate::api::tickets::schemas::{
    CastVote, CreateComment, CreateTicket, Dashboard, Ticket, TicketList, UpdateTicket,
};
use crate::core::assistant::SuggestReplyOutput;
use crate::core::queries::TicketQuery;
use crate::core::traits::{SessionService, TicketService};
use crate::error::{AppError, Result};
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/dashboard", get(dashboard))
        .route("/:id", get(get_ticket).patch(update_ticket))
        .route("/:id/comments", post(add_comment))
        .route("/:id/votes", post(vote))
        .route("/:id/suggestion", post(suggest_reply))
}

async fn list_tickets(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(ticket_service): Inject<dyn TicketService>,
    ExtractToken(token): ExtractToken,
    Query(query): Query<TicketQuery>,
) -> Result<Json<TicketList>> {
    let session = session_service.resolve(&token).await?;
    let tickets = ticket_service.list_tickets(&session, query).await?;

    Ok(Json(TicketList {
        tickets: tickets.into_iter().map(Ticket::from).collect(),
    }))
}

async fn create_ticket(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(ticket_service): Inject<dyn TicketService>,
    ExtractToken(token): ExtractToken,
    Json(ticket): Json<CreateTicket>,
) -> Result<(StatusCode, Json<Ticket>)> {
    let session = session_service.resolve(&token).await?;
    let ticket = ticket_service
        .create_ticket(
            &session,
            ticket.subject,
            ticket.description,
            ticket.category_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ticket.into())))
}

async fn get_ticket(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(ticket_service): Inject<dyn TicketService>,
    ExtractToken(token): ExtractToken,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Ticket>> {
    let session = session_service.resolve(&token).await?;

    match ticket_service.get_ticket(&session, ticket_id).await? {
        Some(ticket) => Ok(Json(ticket.into())),
        None => Err(AppError::NotFound("ticket".into())),
    }
}

async fn update_ticket(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(ticket_service): Inject<dyn TicketService>,
    ExtractToken(token): ExtractToken,
    Path(ticket_id): Path<Uuid>,
    Json(patch): Json<UpdateTicket>,
) -> Result<Json<Ticket>> {
    let session = session_service.resolve(&token).await?;
    let ticket = ticket_service
        .update_ticket(&session, ticket_id, patch.into())
        .await?;

    Ok(Json(ticket.into()))
}

async fn add_comment(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(ticket_service): Inject<dyn TicketService>,
    ExtractToken(token): ExtractToken,
    Path(ticket_id): Path<Uuid>,
    Json(comment): Json<CreateComment>,
) -> Result<(StatusCode, Json<Ticket>)> {
    let session = session_service.resolve(&token).await?;
    let ticket = ticket_service
        .add_comment(&session, ticket_id, comment.content)
        .await?;

    Ok((StatusCode::CREATED, Json(ticket.into())))
}

async fn vote(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(ticket_service): Inject<dyn TicketService>,
    ExtractToken(token): ExtractToken,
    Path(ticket_id): Path<Uuid>,
    Json(vote): Json<CastVote>,
) -> Result<Json<Ticket>> {
    let session = session_service.resolve(&token).await?;
    let ticket = ticket_service.vote(&session, ticket_id, vote.vote).await?;

    Ok(Json(ticket.into()))
}

async fn dashboard(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(ticket_service): Inject<dyn TicketService>,
    ExtractToken(token): ExtractToken,
) -> Result<Json<Dashboard>> {
    let session = session_service.resolve(&token).await?;
    let summary = ticket_service.dashboard(&session).await?;

    Ok(Json(summary.into()))
}

async fn suggest_reply(
    Inject(session_service): Inject<dyn SessionService>,
    Inject(ticket_service): Inject<dyn TicketService>,
    ExtractToken(token): ExtractToken,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<SuggestReplyOutput>> {
    let session = session_service.resolve(&token).await?;
    let suggestion = ticket_service.suggest_reply(&session, ticket_id).await?;

    Ok(Json(suggestion))
}

pub mod schemas {
    use crate::api::categories::schemas::Category;
    use crate::api::users::schemas::User;
    use crate::core::dashboard::DashboardSummary;
    use crate::core::enrichment::{EnrichedComment, EnrichedTicket};
    use crate::infrastructure::entities;
    use crate::infrastructure::entities::{TicketStatus, Vote};
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer, Serialize};
    use uuid::Uuid;

    /// Tells an explicit `null` apart from a missing field.
    fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateTicket {
        pub subject: String,
        pub description: String,
        pub category_id: Uuid,
    }

    /// Triage changes. `"assigneeId": null` unassigns, leaving it out keeps the assignee.
    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct UpdateTicket {
        pub subject: Option<String>,
        pub description: Option<String>,
        pub status: Option<TicketStatus>,
        pub category_id: Option<Uuid>,
        #[serde(default, deserialize_with = "explicit_null")]
        pub assignee_id: Option<Option<Uuid>>,
    }

    impl From<UpdateTicket> for entities::TicketPatch {
        fn from(patch: UpdateTicket) -> Self {
            entities::TicketPatch {
                subject: patch.subject,
                description: patch.description,
                status: patch.status,
                category_id: patch.category_id,
                assignee: patch.assignee_id,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct CreateComment {
        pub content: String,
    }

    #[derive(Deserialize, Debug)]
    pub struct CastVote {
        pub vote: Vote,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Comment {
        pub id: Uuid,
        pub author_id: Uuid,
        pub author: Option<User>,
        pub content: String,
        pub created_at: DateTime<Utc>,
        pub is_agent: bool,
    }

    impl From<EnrichedComment> for Comment {
        fn from(comment: EnrichedComment) -> Self {
            Comment {
                id: comment.id,
                author_id: comment.author_id,
                author: comment.author.map(User::from),
                content: comment.content,
                created_at: comment.created_at,
                is_agent: comment.is_agent,
            }
        }
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Ticket {
        pub id: Uuid,
        pub subject: String,
        pub description: String,
        pub status: TicketStatus,
        pub category_id: Uuid,
        pub category: Option<Category>,
        pub requester_id: Uuid,
        pub requester: Option<User>,
        pub assignee_id: Option<Uuid>,
        pub assignee: Option<User>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub upvotes: i64,
        pub downvotes: i64,
        pub comments: Vec<Comment>,
    }

    impl From<EnrichedTicket> for Ticket {
        fn from(ticket: EnrichedTicket) -> Self {
            Ticket {
                id: ticket.id,
                subject: ticket.subject,
                description: ticket.description,
                status: ticket.status,
                category_id: ticket.category_id,
                category: ticket.category.map(Category::from),
                requester_id: ticket.requester_id,
                requester: ticket.requester.map(User::from),
                assignee_id: ticket.assignee_id,
                assignee: ticket.assignee.map(User::from),
                created_at: ticket.created_at,
                updated_at: ticket.updated_at,
                upvotes: ticket.upvotes,
                downvotes: ticket.downvotes,
                comments: ticket.comments.into_iter().map(Comment::from).collect(),
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct TicketList {
        pub tickets: Vec<Ticket>,
    }

    #[derive(Serialize, Debug)]
    pub struct StatusCount {
        pub status: TicketStatus,
        pub count: usize,
    }

    #[derive(Serialize, Debug)]
    pub struct DailyCount {
        pub date: NaiveDate,
        pub count: usize,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Dashboard {
        pub total: usize,
        pub by_status: Vec<StatusCount>,
        pub created_per_day: Vec<DailyCount>,
        pub recent: Vec<Ticket>,
    }

    impl From<DashboardSummary> for Dashboard {
        fn from(summary: DashboardSummary) -> Self {
            Dashboard {
                total: summary.total,
                by_status: summary
                    .by_status
                    .into_iter()
                    .map(|c| StatusCount {
                        status: c.status,
                        count: c.count,
                    })
                    .collect(),
                created_per_day: summary
                    .created_per_day
                    .into_iter()
                    .map(|c| DailyCount {
                        date: c.date,
                        count: c.count,
                    })
                    .collect(),
                recent: summary.recent.into_iter().map(Ticket::from).collect(),
            }
        }
    }
}
