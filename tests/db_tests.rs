//! Database and repository tests
//!
//! Tests SQLite migrations, the repositories, enrichment against the store and seeding

use di::Ref;
use quickdesk::core::enrichment::{enrich_ticket_document, enrich_tickets};
use quickdesk::core::seed;
use quickdesk::error::AppError;
use quickdesk::infrastructure::database::DatabaseConnection;
use quickdesk::infrastructure::entities::{
    CategoryPatch, NewComment, NewTicket, NewUser, Role, TicketPatch, TicketStatus, UserPatch,
    Vote,
};
use quickdesk::infrastructure::repositories::{
    DbCategoryRepository, DbTicketRepository, DbUserRepository,
};
use quickdesk::infrastructure::traits::{CategoryRepository, TicketRepository, UserRepository};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

struct Store {
    pool: SqlitePool,
    users: DbUserRepository,
    categories: DbCategoryRepository,
    tickets: DbTicketRepository,
}

/// Setup test database with migrations
/// A single connection keeps every query on the same in-memory database
async fn setup_test_db() -> Store {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();

    let connection = Ref::new(DatabaseConnection::from_pool(pool.clone()));
    Store {
        pool,
        users: DbUserRepository::new(connection.clone()),
        categories: DbCategoryRepository::new(connection.clone()),
        tickets: DbTicketRepository::new(connection),
    }
}

fn new_user(name: &str, role: Role) -> NewUser {
    NewUser {
        name: name.into(),
        email: format!("{}@example.com", name.to_lowercase()),
        avatar: String::new(),
        role,
    }
}

fn new_ticket(subject: &str, requester_id: Uuid, category_id: Uuid) -> NewTicket {
    NewTicket {
        subject: subject.into(),
        description: "I keep getting an invalid password error".into(),
        category_id,
        requester_id,
    }
}

#[tokio::test]
async fn test_database_migrations_work() {
    let store = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
    )
    .fetch_all(&store.pool)
    .await
    .unwrap();

    let tables: Vec<_> = tables.into_iter().map(|(name,)| name).collect();
    assert_eq!(tables, ["categories", "comments", "tickets", "users"]);
}

#[tokio::test]
async fn test_user_crud() {
    let store = setup_test_db().await;

    let alice = assert_ok!(store.users.create_user(new_user("Alice", Role::EndUser)).await);
    assert_eq!(alice.role, Role::EndUser);

    let by_email = store.users.get_user_by_email("alice@example.com").await.unwrap();
    assert_eq!(by_email, Some(alice.clone()));

    store
        .users
        .update_user(
            alice.id,
            UserPatch {
                role: Some(Role::SupportAgent),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap();

    let updated = store.users.get_user(alice.id).await.unwrap().unwrap();
    assert_eq!(updated.role, Role::SupportAgent);
    assert_eq!(updated.name, "Alice");

    store.users.delete_user(alice.id).await.unwrap();
    assert!(store.users.get_user(alice.id).await.unwrap().is_none());

    // deleting again is not an error
    assert_ok!(store.users.delete_user(alice.id).await);
}

#[tokio::test]
async fn test_update_missing_user_is_not_found() {
    let store = setup_test_db().await;

    let error = assert_err!(
        store
            .users
            .update_user(Uuid::new_v4(), UserPatch::default())
            .await
    );
    assert!(matches!(error, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let store = setup_test_db().await;

    store.users.create_user(new_user("Bob", Role::EndUser)).await.unwrap();
    let error = assert_err!(store.users.create_user(new_user("Bob", Role::Admin)).await);

    assert!(matches!(error, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_multi_get_skips_unknown_ids() {
    let store = setup_test_db().await;

    let alice = store.users.create_user(new_user("Alice", Role::EndUser)).await.unwrap();
    let billing = store.categories.create_category("Billing".into()).await.unwrap();

    assert!(store.users.get_users_by_ids(&[]).await.unwrap().is_empty());

    let users = store
        .users
        .get_users_by_ids(&[alice.id, Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(users, vec![alice]);

    let categories = store
        .categories
        .get_categories_by_ids(&[Uuid::new_v4(), billing.id])
        .await
        .unwrap();
    assert_eq!(categories, vec![billing]);
}

#[tokio::test]
async fn test_category_rename() {
    let store = setup_test_db().await;

    let category = store.categories.create_category("Biling".into()).await.unwrap();
    store
        .categories
        .update_category(
            category.id,
            CategoryPatch {
                name: Some("Billing".into()),
            },
        )
        .await
        .unwrap();

    let renamed = store.categories.get_category_by_name("Billing").await.unwrap();
    assert_eq!(renamed.map(|c| c.id), Some(category.id));
    assert!(
        store
            .categories
            .get_category_by_name("Biling")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_new_ticket_defaults() {
    let store = setup_test_db().await;

    let document = store
        .tickets
        .create_ticket(new_ticket("Cannot login", Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap();

    let ticket = &document.ticket;
    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.assignee_id, None);
    assert_eq!(ticket.upvotes, 0);
    assert_eq!(ticket.downvotes, 0);
    assert_eq!(ticket.created_at, ticket.updated_at);
    assert!(document.comments.is_empty());

    let stored = store.tickets.get_ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored, document);
}

#[tokio::test]
async fn test_comment_bumps_updated_at_and_keeps_created_at() {
    let store = setup_test_db().await;

    let created = store
        .tickets
        .create_ticket(new_ticket("Cannot login", Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap()
        .ticket;

    let author_id = Uuid::new_v4();
    for content in ["first", "second"] {
        store
            .tickets
            .append_comment(
                created.id,
                NewComment {
                    author_id,
                    content: content.into(),
                    is_agent: false,
                },
            )
            .await
            .unwrap();
    }

    let document = store.tickets.get_ticket(created.id).await.unwrap().unwrap();
    assert_eq!(document.ticket.created_at, created.created_at);
    assert!(document.ticket.updated_at >= created.updated_at);

    let contents: Vec<_> = document.comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, ["first", "second"]);
}

#[tokio::test]
async fn test_comment_on_missing_ticket_is_not_found() {
    let store = setup_test_db().await;

    let error = assert_err!(
        store
            .tickets
            .append_comment(
                Uuid::new_v4(),
                NewComment {
                    author_id: Uuid::new_v4(),
                    content: "hello?".into(),
                    is_agent: false,
                },
            )
            .await
    );
    assert!(matches!(error, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_vote_increments_one_counter() {
    let store = setup_test_db().await;

    let ticket = store
        .tickets
        .create_ticket(new_ticket("Dark mode", Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap()
        .ticket;

    store.tickets.record_vote(ticket.id, Vote::Up).await.unwrap();
    store.tickets.record_vote(ticket.id, Vote::Up).await.unwrap();
    store.tickets.record_vote(ticket.id, Vote::Down).await.unwrap();

    let voted = store.tickets.get_ticket(ticket.id).await.unwrap().unwrap().ticket;
    assert_eq!(voted.upvotes, 2);
    assert_eq!(voted.downvotes, 1);
    assert!(voted.updated_at >= ticket.updated_at);
}

#[tokio::test]
async fn test_ticket_patch_sets_and_clears_assignee() {
    let store = setup_test_db().await;

    let ticket = store
        .tickets
        .create_ticket(new_ticket("Refund", Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap()
        .ticket;
    let agent_id = Uuid::new_v4();

    store
        .tickets
        .update_ticket(
            ticket.id,
            TicketPatch {
                status: Some(TicketStatus::InProgress),
                assignee: Some(Some(agent_id)),
                ..TicketPatch::default()
            },
        )
        .await
        .unwrap();

    let patched = store.tickets.get_ticket(ticket.id).await.unwrap().unwrap().ticket;
    assert_eq!(patched.status, TicketStatus::InProgress);
    assert_eq!(patched.assignee_id, Some(agent_id));
    assert_eq!(patched.subject, "Refund");

    // status only, assignee untouched
    store
        .tickets
        .update_ticket(
            ticket.id,
            TicketPatch {
                status: Some(TicketStatus::Resolved),
                ..TicketPatch::default()
            },
        )
        .await
        .unwrap();
    let resolved = store.tickets.get_ticket(ticket.id).await.unwrap().unwrap().ticket;
    assert_eq!(resolved.assignee_id, Some(agent_id));

    store
        .tickets
        .update_ticket(
            ticket.id,
            TicketPatch {
                assignee: Some(None),
                ..TicketPatch::default()
            },
        )
        .await
        .unwrap();
    let cleared = store.tickets.get_ticket(ticket.id).await.unwrap().unwrap().ticket;
    assert_eq!(cleared.assignee_id, None);
    assert_eq!(cleared.status, TicketStatus::Resolved);
}

#[tokio::test]
async fn test_ticket_delete_cascades_to_comments() {
    let store = setup_test_db().await;

    let ticket = store
        .tickets
        .create_ticket(new_ticket("Broken link", Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap()
        .ticket;
    store
        .tickets
        .append_comment(
            ticket.id,
            NewComment {
                author_id: Uuid::new_v4(),
                content: "on the pricing page".into(),
                is_agent: false,
            },
        )
        .await
        .unwrap();

    store.tickets.delete_ticket(ticket.id).await.unwrap();

    let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
        .fetch_one(&store.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_enrichment_resolves_requester_and_category() {
    let store = setup_test_db().await;

    let alice = store.users.create_user(new_user("Alice", Role::EndUser)).await.unwrap();
    let account_access = store
        .categories
        .create_category("Account Access".into())
        .await
        .unwrap();
    let document = store
        .tickets
        .create_ticket(new_ticket("Cannot login", alice.id, account_access.id))
        .await
        .unwrap();

    let ticket = enrich_ticket_document(document, &store.users, &store.categories)
        .await
        .unwrap();

    assert_eq!(ticket.requester.map(|u| u.name).as_deref(), Some("Alice"));
    assert_eq!(
        ticket.category.map(|c| c.name).as_deref(),
        Some("Account Access")
    );
    assert!(ticket.assignee.is_none());
}

#[tokio::test]
async fn test_deleted_category_leaves_ticket_intact() {
    let store = setup_test_db().await;

    let alice = store.users.create_user(new_user("Alice", Role::EndUser)).await.unwrap();
    let billing = store.categories.create_category("Billing".into()).await.unwrap();
    let created = store
        .tickets
        .create_ticket(new_ticket("Double charge", alice.id, billing.id))
        .await
        .unwrap();

    store.categories.delete_category(billing.id).await.unwrap();

    let documents = store.tickets.list_tickets().await.unwrap();
    assert_eq!(documents, vec![created.clone()]);

    let tickets = enrich_tickets(documents, &store.users, &store.categories)
        .await
        .unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].category_id, billing.id);
    assert!(tickets[0].category.is_none());
    assert_eq!(tickets[0].requester.as_ref(), Some(&alice));
}

#[tokio::test]
async fn test_category_sync_is_idempotent() {
    let store = setup_test_db().await;

    store.categories.create_category("Legacy".into()).await.unwrap();
    store.categories.create_category("Billing".into()).await.unwrap();
    store.categories.create_category("Billing".into()).await.unwrap();

    let first = seed::sync_categories(&store.categories, &seed::DEFAULT_CATEGORIES)
        .await
        .unwrap();
    assert_eq!(first.deleted, ["Billing", "Legacy"]);
    assert_eq!(first.skipped, ["Billing"]);
    assert_eq!(first.added.len(), seed::DEFAULT_CATEGORIES.len() - 1);

    let second = seed::sync_categories(&store.categories, &seed::DEFAULT_CATEGORIES)
        .await
        .unwrap();
    assert!(second.added.is_empty());
    assert!(second.deleted.is_empty());

    let mut names: Vec<_> = store
        .categories
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    names.sort();
    let mut expected = seed::DEFAULT_CATEGORIES.to_vec();
    expected.sort();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_seed_users_and_clear_tickets() {
    let store = setup_test_db().await;

    assert_eq!(seed::seed_users(&store.users, &seed::DEMO_USERS).await.unwrap(), 1);
    assert_eq!(seed::seed_users(&store.users, &seed::DEMO_USERS).await.unwrap(), 0);

    let admin = store
        .users
        .get_user_by_email("admin@quickdesk.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.role, Role::Admin);

    for subject in ["one", "two"] {
        store
            .tickets
            .create_ticket(new_ticket(subject, admin.id, Uuid::new_v4()))
            .await
            .unwrap();
    }
    assert_eq!(seed::clear_tickets(&store.tickets).await.unwrap(), 2);
    assert!(store.tickets.list_tickets().await.unwrap().is_empty());
}
