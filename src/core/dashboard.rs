//! Queue overview for agents and admins.

use crate::core::enrichment::EnrichedTicket;
use crate::infrastructure::entities::TicketStatus;
use chrono::{DateTime, Duration, NaiveDate, Utc};

pub const RECENT_TICKETS: usize = 5;
pub const WEEKLY_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusCount {
    pub status: TicketStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub total: usize,
    /// One entry per status, zero counts included.
    pub by_status: Vec<StatusCount>,
    /// Tickets created on each of the last seven days, oldest first.
    pub created_per_day: Vec<DailyCount>,
    pub recent: Vec<EnrichedTicket>,
}

pub fn summarize(mut tickets: Vec<EnrichedTicket>, now: DateTime<Utc>) -> DashboardSummary {
    let by_status = TicketStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: tickets.iter().filter(|t| t.status == status).count(),
        })
        .collect();

    let today = now.date_naive();
    let created_per_day = (0..WEEKLY_DAYS)
        .rev()
        .map(|days_ago| {
            let date = today - Duration::days(days_ago);
            DailyCount {
                date,
                count: tickets
                    .iter()
                    .filter(|t| t.created_at.date_naive() == date)
                    .count(),
            }
        })
        .collect();

    let total = tickets.len();
    tickets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    tickets.truncate(RECENT_TICKETS);

    DashboardSummary {
        total,
        by_status,
        created_per_day,
        recent: tickets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ticket(status: TicketStatus, created_days_ago: i64, now: DateTime<Utc>) -> EnrichedTicket {
        let created_at = now - Duration::days(created_days_ago);
        EnrichedTicket {
            id: Uuid::new_v4(),
            subject: "subject".into(),
            description: String::new(),
            status,
            category_id: Uuid::new_v4(),
            category: None,
            requester_id: Uuid::new_v4(),
            requester: None,
            assignee_id: None,
            assignee: None,
            created_at,
            updated_at: created_at,
            upvotes: 0,
            downvotes: 0,
            comments: Vec::new(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let now = Utc::now();
        let tickets = vec![
            ticket(TicketStatus::Open, 0, now),
            ticket(TicketStatus::Open, 1, now),
            ticket(TicketStatus::Resolved, 3, now),
            ticket(TicketStatus::Closed, 30, now),
        ];

        let summary = summarize(tickets, now);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.by_status.len(), 4);
        assert_eq!(summary.by_status[0].count, 2);
        assert_eq!(summary.by_status[1].count, 0);
        assert_eq!(summary.created_per_day.len(), 7);
        assert_eq!(summary.created_per_day.last().unwrap().date, now.date_naive());
        assert_eq!(summary.created_per_day.last().unwrap().count, 1);
        assert_eq!(
            summary.created_per_day.iter().map(|d| d.count).sum::<usize>(),
            3
        );
    }

    #[test]
    fn test_recent_keeps_five_newest() {
        let now = Utc::now();
        let tickets: Vec<_> = (0..8).map(|i| ticket(TicketStatus::Open, i, now)).collect();

        let summary = summarize(tickets, now);

        assert_eq!(summary.recent.len(), RECENT_TICKETS);
        assert!(summary.recent.windows(2).all(|w| w[0].updated_at >= w[1].updated_at));
    }
}
