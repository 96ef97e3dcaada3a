//! Role based access checks.
//!
//! Every protected operation names an [`Action`] and goes through [`authorize`].

use crate::core::session::Session;
use crate::error::{AppError, Result};
use crate::infrastructure::entities::{Role, User};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateTicket,
    /// List tickets; end users get only their own.
    ListTickets,
    ListCategories,
    EditOwnProfile,
    /// View a single ticket raised by `requester_id`.
    ViewTicket { requester_id: Uuid },
    /// Reply on a ticket raised by `requester_id`.
    CommentOnTicket { requester_id: Uuid },
    /// Up or down vote a ticket raised by `requester_id`.
    Vote { requester_id: Uuid },
    ViewAllTickets,
    ManageTicket,
    SuggestReply,
    ViewDashboard,
    ManageCategories,
    ManageUsers,
}

impl Role {
    /// Agents and admins work the queue; end users only raise tickets.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::SupportAgent | Role::Admin)
    }

    pub fn permits(&self, user_id: Uuid, action: Action) -> bool {
        match action {
            Action::CreateTicket
            | Action::ListTickets
            | Action::ListCategories
            | Action::EditOwnProfile => true,
            Action::ViewTicket { requester_id }
            | Action::CommentOnTicket { requester_id }
            | Action::Vote { requester_id } => self.is_staff() || requester_id == user_id,
            Action::ViewAllTickets
            | Action::ManageTicket
            | Action::SuggestReply
            | Action::ViewDashboard => self.is_staff(),
            Action::ManageCategories | Action::ManageUsers => *self == Role::Admin,
        }
    }
}

/// Returns the signed-in user if they may perform `action`.
pub fn authorize(session: &Session, action: Action) -> Result<&User> {
    let user = session
        .user()
        .ok_or_else(|| AppError::Unauthorized("sign in required".into()))?;

    if user.role.permits(user.id, action) {
        Ok(user)
    } else {
        Err(AppError::Forbidden(format!(
            "{} may not perform {action:?}",
            user.role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session::SignedIn(User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            avatar: String::new(),
            role,
        })
    }

    #[test]
    fn test_signed_out_is_unauthorized() {
        let result = authorize(&Session::SignedOut, Action::ListCategories);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_end_user_only_sees_own_tickets() {
        let session = session(Role::EndUser);
        let own_id = session.user().unwrap().id;

        assert!(authorize(&session, Action::ViewTicket { requester_id: own_id }).is_ok());
        assert!(matches!(
            authorize(
                &session,
                Action::ViewTicket {
                    requester_id: Uuid::new_v4()
                }
            ),
            Err(AppError::Forbidden(_))
        ));
        assert!(authorize(&session, Action::ViewAllTickets).is_err());
        assert!(authorize(&session, Action::SuggestReply).is_err());
    }

    #[test]
    fn test_agent_cannot_administer() {
        let session = session(Role::SupportAgent);

        assert!(authorize(&session, Action::ManageTicket).is_ok());
        assert!(authorize(&session, Action::SuggestReply).is_ok());
        assert!(
            authorize(
                &session,
                Action::CommentOnTicket {
                    requester_id: Uuid::new_v4()
                }
            )
            .is_ok()
        );
        assert!(authorize(&session, Action::ManageCategories).is_err());
        assert!(authorize(&session, Action::ManageUsers).is_err());
    }

    #[test]
    fn test_admin_may_do_everything() {
        let session = session(Role::Admin);
        for action in [
            Action::CreateTicket,
            Action::ViewAllTickets,
            Action::ManageTicket,
            Action::SuggestReply,
            Action::ViewDashboard,
            Action::ManageCategories,
            Action::ManageUsers,
        ] {
            assert!(authorize(&session, action).is_ok(), "{action:?}");
        }
    }
}
