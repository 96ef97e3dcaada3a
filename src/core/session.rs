//! Signed-in state and the manager that follows identity provider notifications.

use crate::error::Result;
use crate::infrastructure::entities::{Role, User};
use crate::infrastructure::identity::AuthIdentity;
use crate::infrastructure::traits::UserRepository;
use di::{Ref, inject, injectable};
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::{RwLock, watch};

/// Immutable snapshot of who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    SignedOut,
    SignedIn(User),
}

impl Session {
    /// Session for a profile lookup result. No profile means signed out.
    pub fn from_profile(profile: Option<User>) -> Session {
        match profile {
            Some(user) => Session::SignedIn(user),
            None => Session::SignedOut,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::SignedIn(user) => Some(user),
            Session::SignedOut => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|user| user.role)
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, Session::SignedIn(_))
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn is_agent(&self) -> bool {
        self.role() == Some(Role::SupportAgent)
    }

    pub fn is_end_user(&self) -> bool {
        self.role() == Some(Role::EndUser)
    }
}

/// Notification from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthIdentity),
    SignedOut,
}

/// Opaque bearer token naming one server-held session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// 32 random bytes, hex encoded.
    pub fn generate() -> SessionToken {
        let bytes: [u8; 32] = rand::rng().random();
        SessionToken(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        SessionToken(value)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        SessionToken(value.to_owned())
    }
}

/// Follows sign-in / sign-out notifications and publishes the resulting [`Session`].
///
/// Consumers call [`SessionManager::subscribe`] and drop the receiver to unsubscribe.
pub struct SessionManager {
    users: Ref<dyn UserRepository>,
    state: watch::Sender<Session>,
}

impl SessionManager {
    pub fn new(users: Ref<dyn UserRepository>) -> SessionManager {
        let (state, _) = watch::channel(Session::SignedOut);
        SessionManager { users, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Applies one notification and returns the new session.
    pub async fn handle(&self, event: AuthEvent) -> Session {
        let session = match event {
            AuthEvent::SignedIn(identity) => {
                match self.users.get_user_by_email(&identity.email).await {
                    Ok(Some(user)) => {
                        info!("{} signed in as {}", user.email, user.role);
                        Session::SignedIn(user)
                    }
                    Ok(None) => {
                        warn!(
                            "identity {} ({}) has no profile, forcing sign-out",
                            identity.uid, identity.email
                        );
                        Session::SignedOut
                    }
                    Err(e) => {
                        warn!("failed to load profile for {}: {e}", identity.email);
                        Session::SignedOut
                    }
                }
            }
            AuthEvent::SignedOut => Session::SignedOut,
        };

        self.state.send_replace(session.clone());
        session
    }

    /// Re-reads the signed-in profile so role and name changes apply at once.
    /// A profile that no longer exists signs the session out.
    pub async fn refresh(&self) -> Result<Session> {
        let Some(user_id) = self.snapshot().user().map(|user| user.id) else {
            return Ok(Session::SignedOut);
        };

        let session = match self.users.get_user(user_id).await? {
            Some(user) => Session::SignedIn(user),
            None => {
                warn!("profile {user_id} was deleted, forcing sign-out");
                Session::SignedOut
            }
        };

        self.state.send_replace(session.clone());
        Ok(session)
    }

    /// Processes notifications one at a time until the event source ends.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = AuthEvent> + Send,
    {
        futures_util::pin_mut!(events);
        while let Some(event) = events.next().await {
            self.handle(event).await;
        }
        info!("auth event source closed");
    }
}

/// Live sessions keyed by bearer token. One [`SessionManager`] per signed-in client.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionToken, Ref<SessionManager>>>,
}

#[injectable]
impl SessionRegistry {
    #[inject]
    pub fn create() -> SessionRegistry {
        SessionRegistry::default()
    }
}

impl SessionRegistry {
    /// Stores a signed-in manager under a fresh token.
    pub async fn insert(&self, manager: SessionManager) -> SessionToken {
        let token = SessionToken::generate();
        self.sessions
            .write()
            .await
            .insert(token.clone(), Ref::new(manager));
        debug!("{} live sessions", self.sessions.read().await.len());
        token
    }

    pub async fn get(&self, token: &SessionToken) -> Option<Ref<SessionManager>> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn remove(&self, token: &SessionToken) -> Option<Ref<SessionManager>> {
        self.sessions.write().await.remove(token)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Eve Adams".into(),
            email: "eve@quickdesk.com".into(),
            avatar: String::new(),
            role,
        }
    }

    #[test]
    fn test_signed_out_has_no_flags() {
        let session = Session::SignedOut;
        assert!(!session.is_admin());
        assert!(!session.is_agent());
        assert!(!session.is_end_user());
    }

    #[test]
    fn test_exactly_one_flag_per_role() {
        for role in [Role::EndUser, Role::SupportAgent, Role::Admin] {
            let session = Session::SignedIn(user(role));
            let flags = [session.is_admin(), session.is_agent(), session.is_end_user()];
            assert_eq!(flags.iter().filter(|flag| **flag).count(), 1, "{role}");
        }
    }

    #[test]
    fn test_from_profile() {
        assert_eq!(Session::from_profile(None), Session::SignedOut);
        assert!(Session::from_profile(Some(user(Role::Admin))).is_admin());
    }

    #[test]
    fn test_tokens_are_random_hex() {
        let first = SessionToken::generate();
        let second = SessionToken::generate();
        assert_eq!(first.as_str().len(), 64);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
