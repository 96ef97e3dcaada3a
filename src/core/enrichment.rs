//! Resolves ticket foreign keys into the referenced users and categories.
//!
//! Referenced ids are collected across all tickets, fetched with one multi-get per
//! collection and joined in memory. A reference to a deleted document resolves to
//! `None` instead of failing the ticket.

use crate::error::{AppError, Result};
use crate::infrastructure::entities::{Category, Comment, Ticket, TicketDocument, TicketStatus, User};
use crate::infrastructure::traits::{CategoryRepository, UserRepository};
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedComment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author: Option<User>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_agent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTicket {
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
    pub comments: Vec<EnrichedComment>,
}

/// Distinct user ids and category ids referenced by `tickets`.
pub fn referenced_ids(tickets: &[TicketDocument]) -> (Vec<Uuid>, Vec<Uuid>) {
    let mut user_ids = BTreeSet::new();
    let mut category_ids = BTreeSet::new();

    for document in tickets {
        user_ids.insert(document.ticket.requester_id);
        user_ids.extend(document.ticket.assignee_id);
        user_ids.extend(document.comments.iter().map(|c| c.author_id));
        category_ids.insert(document.ticket.category_id);
    }

    (
        user_ids.into_iter().collect(),
        category_ids.into_iter().collect(),
    )
}

fn enrich_comment(comment: Comment, users: &HashMap<Uuid, User>) -> EnrichedComment {
    EnrichedComment {
        id: comment.id,
        author_id: comment.author_id,
        author: users.get(&comment.author_id).cloned(),
        content: comment.content,
        created_at: comment.created_at,
        is_agent: comment.is_agent,
    }
}

fn enrich_ticket(
    document: TicketDocument,
    users: &HashMap<Uuid, User>,
    categories: &HashMap<Uuid, Category>,
) -> EnrichedTicket {
    let TicketDocument { ticket, comments } = document;
    let Ticket {
        id,
        subject,
        description,
        status,
        category_id,
        requester_id,
        assignee_id,
        created_at,
        updated_at,
        upvotes,
        downvotes,
    } = ticket;

    EnrichedTicket {
        id,
        subject,
        description,
        status,
        category_id,
        category: categories.get(&category_id).cloned(),
        requester_id,
        requester: users.get(&requester_id).cloned(),
        assignee_id,
        assignee: assignee_id.and_then(|id| users.get(&id).cloned()),
        created_at,
        updated_at,
        upvotes,
        downvotes,
        comments: comments
            .into_iter()
            .map(|comment| enrich_comment(comment, users))
            .collect(),
    }
}

/// Joins already fetched users and categories into `tickets`, keeping input order.
pub fn join_references(
    tickets: Vec<TicketDocument>,
    users: &HashMap<Uuid, User>,
    categories: &HashMap<Uuid, Category>,
) -> Vec<EnrichedTicket> {
    tickets
        .into_iter()
        .map(|document| enrich_ticket(document, users, categories))
        .collect()
}

/// Fetches everything `tickets` reference and returns the enriched tickets.
///
/// Read only. Fails only if the store itself fails.
pub async fn enrich_tickets(
    tickets: Vec<TicketDocument>,
    users: &dyn UserRepository,
    categories: &dyn CategoryRepository,
) -> Result<Vec<EnrichedTicket>> {
    if tickets.is_empty() {
        return Ok(Vec::new());
    }

    let (user_ids, category_ids) = referenced_ids(&tickets);
    debug!(
        "enriching {} tickets ({} users, {} categories)",
        tickets.len(),
        user_ids.len(),
        category_ids.len()
    );

    let (users, categories) = tokio::try_join!(
        users.get_users_by_ids(&user_ids),
        categories.get_categories_by_ids(&category_ids)
    )?;

    let users: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();
    let categories: HashMap<Uuid, Category> =
        categories.into_iter().map(|c| (c.id, c)).collect();

    Ok(join_references(tickets, &users, &categories))
}

/// Enriches a single ticket.
pub async fn enrich_ticket_document(
    document: TicketDocument,
    users: &dyn UserRepository,
    categories: &dyn CategoryRepository,
) -> Result<EnrichedTicket> {
    enrich_tickets(vec![document], users, categories)
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("enrichment dropped a ticket".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::entities::Role;

    fn user(name: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            avatar: String::new(),
            role,
        }
    }

    fn document(requester: Uuid, category: Uuid, assignee: Option<Uuid>) -> TicketDocument {
        let now = Utc::now();
        TicketDocument {
            ticket: Ticket {
                id: Uuid::new_v4(),
                subject: "Cannot login".into(),
                description: "Invalid password".into(),
                status: TicketStatus::Open,
                category_id: category,
                requester_id: requester,
                assignee_id: assignee,
                created_at: now,
                updated_at: now,
                upvotes: 0,
                downvotes: 0,
            },
            comments: Vec::new(),
        }
    }

    #[test]
    fn test_join_resolves_requester_and_category() {
        let alice = user("Alice", Role::EndUser);
        let category = Category {
            id: Uuid::new_v4(),
            name: "Account Access".into(),
        };
        let users = HashMap::from([(alice.id, alice.clone())]);
        let categories = HashMap::from([(category.id, category.clone())]);

        let enriched = join_references(vec![document(alice.id, category.id, None)], &users, &categories);

        assert_eq!(enriched[0].requester.as_ref().unwrap().name, "Alice");
        assert_eq!(enriched[0].category.as_ref().unwrap().id, category.id);
        assert!(enriched[0].assignee.is_none());
    }

    #[test]
    fn test_dangling_references_resolve_to_none() {
        let agent = user("Charlie", Role::SupportAgent);
        let mut doc = document(Uuid::new_v4(), Uuid::new_v4(), Some(agent.id));
        doc.comments.push(Comment {
            id: Uuid::new_v4(),
            ticket_id: doc.ticket.id,
            author_id: Uuid::new_v4(),
            content: "hello".into(),
            created_at: Utc::now(),
            is_agent: false,
        });
        let users = HashMap::from([(agent.id, agent.clone())]);

        let enriched = join_references(vec![doc], &users, &HashMap::new());

        assert!(enriched[0].requester.is_none());
        assert!(enriched[0].category.is_none());
        assert_eq!(enriched[0].assignee.as_ref().unwrap().id, agent.id);
        assert!(enriched[0].comments[0].author.is_none());
    }

    #[test]
    fn test_referenced_ids_are_distinct() {
        let requester = Uuid::new_v4();
        let category = Uuid::new_v4();
        let tickets = vec![
            document(requester, category, None),
            document(requester, category, Some(requester)),
        ];

        let (user_ids, category_ids) = referenced_ids(&tickets);

        assert_eq!(user_ids, vec![requester]);
        assert_eq!(category_ids, vec![category]);
    }

    #[test]
    fn test_join_keeps_input_order() {
        let tickets: Vec<_> = (0..5)
            .map(|_| document(Uuid::new_v4(), Uuid::new_v4(), None))
            .collect();
        let ids: Vec<_> = tickets.iter().map(|t| t.ticket.id).collect();

        let enriched = join_references(tickets, &HashMap::new(), &HashMap::new());

        assert_eq!(enriched.iter().map(|t| t.id).collect::<Vec<_>>(), ids);
    }
}
