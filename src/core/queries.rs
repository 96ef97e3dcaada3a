//! Ticket list filtering.

use crate::core::enrichment::EnrichedTicket;
use crate::infrastructure::entities::TicketStatus;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    /// Case-insensitive substring of the subject.
    pub search: Option<String>,
}

impl TicketQuery {
    pub fn matches(&self, ticket: &EnrichedTicket) -> bool {
        if let Some(status) = self.status {
            if ticket.status != status {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => ticket
                .subject
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        }
    }

    /// Keeps matching tickets, most recently updated first.
    pub fn apply(&self, tickets: Vec<EnrichedTicket>) -> Vec<EnrichedTicket> {
        let mut tickets: Vec<_> = tickets.into_iter().filter(|t| self.matches(t)).collect();
        tickets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        tickets
    }
}
