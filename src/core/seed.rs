//! Bootstrap data for a fresh QuickDesk store.
//!
//! Every step can be re-run; existing data is matched by category name or user email.

use crate::error::Result;
use crate::infrastructure::entities::{NewUser, Role};
use crate::infrastructure::traits::{CategoryRepository, TicketRepository, UserRepository};
use log::{info, warn};
use std::collections::HashSet;

pub const DEFAULT_CATEGORIES: [&str; 5] = [
    "Billing",
    "Technical Support",
    "General Inquiry",
    "Feature Request",
    "Account Access",
];

#[derive(Debug, Clone, Copy)]
pub struct SeedUser {
    pub name: &'static str,
    pub email: &'static str,
    pub role: Role,
    pub avatar: &'static str,
}

impl From<SeedUser> for NewUser {
    fn from(user: SeedUser) -> Self {
        NewUser {
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            avatar: user.avatar.to_owned(),
            role: user.role,
        }
    }
}

pub const DEMO_USERS: [SeedUser; 1] = [SeedUser {
    name: "Admin User",
    email: "admin@quickdesk.com",
    role: Role::Admin,
    avatar: "https://placehold.co/150x150/7F56D9/FFFFFF/png",
}];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    pub skipped: Vec<String>,
}

/// Makes the stored categories match `names` exactly.
///
/// Categories not in `names` are deleted, missing ones are added and existing
/// ones are left untouched. Duplicate stored names collapse to one document.
pub async fn sync_categories(
    categories: &dyn CategoryRepository,
    names: &[&str],
) -> Result<SyncReport> {
    let wanted: HashSet<&str> = names.iter().copied().collect();
    let mut report = SyncReport::default();
    let mut present = HashSet::new();

    for category in categories.list_categories().await? {
        if wanted.contains(category.name.as_str()) && present.insert(category.name.clone()) {
            continue;
        }
        categories.delete_category(category.id).await?;
        info!("  - Deleted category: {:?}", category.name);
        report.deleted.push(category.name);
    }

    for name in names {
        if present.contains(*name) {
            info!("  = Skipped (already exists): {name:?}");
            report.skipped.push((*name).to_owned());
        } else if present.insert((*name).to_owned()) {
            categories.create_category((*name).to_owned()).await?;
            info!("  + Added category: {name:?}");
            report.added.push((*name).to_owned());
        }
    }

    Ok(report)
}

/// Inserts every user whose email has no profile yet. Returns how many were added.
pub async fn seed_users(users: &dyn UserRepository, seed: &[SeedUser]) -> Result<usize> {
    let mut added = 0;

    for user in seed {
        if let Some(existing) = users.get_user_by_email(user.email).await? {
            if existing.role != user.role {
                warn!(
                    "{} already exists as {}, leaving role unchanged",
                    user.email, existing.role
                );
            }
            continue;
        }

        users.create_user((*user).into()).await?;
        info!("  + Added user: {} ({})", user.email, user.role);
        added += 1;
    }

    Ok(added)
}

pub async fn clear_tickets(tickets: &dyn TicketRepository) -> Result<u64> {
    let removed = tickets.delete_all_tickets().await?;
    info!("Removed {removed} tickets");
    Ok(removed)
}
