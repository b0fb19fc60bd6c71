//! Session context and access control
//!
//! [`SessionContext`] is the authenticated user as an explicit value. It is
//! built once from the restored [`SessionManager`] and handed to every
//! service that needs to know who is acting; nothing reads the session from
//! global state.

use std::sync::Arc;

use lms_client::session::{Session, SessionManager, UserProfile};
use lms_client::{EntityId, Role};
use serde::{Deserialize, Serialize};

/// Access control failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// Nobody is logged in
    #[error("User not authenticated")]
    NotAuthenticated,

    /// The user is logged in with the wrong role
    #[error("Role {actual} cannot access a {required} view")]
    Forbidden {
        /// Role the view needs
        required: Role,
        /// Role of the current user
        actual: Role,
    },
}

/// Result type for access checks
pub type Result<T> = std::result::Result<T, AccessError>;

/// Where a user lands after signing in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LandingView {
    /// Sign-in form
    SignIn,
    /// Staff dashboard
    Dashboard,
    /// Student borrowing panel
    StudentPanel,
}

/// The current user, passed explicitly to services
///
/// Cloning is cheap; clones share the session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    session: Option<Arc<Session>>,
}

impl SessionContext {
    /// Context with nobody logged in
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for an authenticated session
    pub fn new(session: Session) -> Self {
        Self { session: Some(Arc::new(session)) }
    }

    /// Snapshot the manager's current session
    pub fn from_manager(manager: &SessionManager) -> Self {
        match manager.current() {
            Some(session) => Self::new(session.clone()),
            None => Self::anonymous(),
        }
    }

    /// The session, if any
    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    /// The logged-in user's profile
    pub fn user(&self) -> Option<&UserProfile> {
        self.session().map(|s| &s.user)
    }

    /// The logged-in user's id
    pub fn user_id(&self) -> Option<EntityId> {
        self.user().map(|u| u.id)
    }

    /// The logged-in user's role
    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }

    /// Whether someone is logged in
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the user is an administrator or librarian
    pub fn is_staff(&self) -> bool {
        self.role().is_some_and(|r| r.is_staff())
    }

    /// The profile of the logged-in user, or [`AccessError::NotAuthenticated`]
    pub fn require_authenticated(&self) -> Result<&UserProfile> {
        self.user().ok_or(AccessError::NotAuthenticated)
    }

    /// The profile of the logged-in user if their role is exactly `role`
    pub fn require_role(&self, role: Role) -> Result<&UserProfile> {
        let user = self.require_authenticated()?;
        if user.role == role {
            Ok(user)
        } else {
            tracing::debug!(required = %role, actual = %user.role, "role check refused");
            Err(AccessError::Forbidden { required: role, actual: user.role })
        }
    }

    /// The profile of the logged-in user if they are staff
    pub fn require_staff(&self) -> Result<&UserProfile> {
        let user = self.require_authenticated()?;
        if user.role.is_staff() {
            Ok(user)
        } else {
            Err(AccessError::Forbidden { required: Role::Librarian, actual: user.role })
        }
    }

    /// Post-login navigation target
    pub fn landing_view(&self) -> LandingView {
        match self.role() {
            None => LandingView::SignIn,
            Some(role) if role.is_staff() => LandingView::Dashboard,
            Some(_) => LandingView::StudentPanel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: Role) -> SessionContext {
        SessionContext::new(Session {
            token: "tok".to_string(),
            user: UserProfile {
                id: 5,
                username: "ada".to_string(),
                email: None,
                first_name: None,
                last_name: None,
                role,
            },
        })
    }

    #[test]
    fn test_anonymous_context() {
        let ctx = SessionContext::anonymous();
        assert!(!ctx.is_authenticated());
        assert!(!ctx.is_staff());
        assert_eq!(ctx.require_authenticated(), Err(AccessError::NotAuthenticated));
        assert_eq!(ctx.require_role(Role::Student), Err(AccessError::NotAuthenticated));
        assert_eq!(ctx.landing_view(), LandingView::SignIn);
    }

    #[test]
    fn test_landing_view_by_role() {
        assert_eq!(context(Role::Admin).landing_view(), LandingView::Dashboard);
        assert_eq!(context(Role::Librarian).landing_view(), LandingView::Dashboard);
        assert_eq!(context(Role::Student).landing_view(), LandingView::StudentPanel);
    }

    #[test]
    fn test_require_role_is_exact() {
        let ctx = context(Role::Librarian);
        assert_eq!(ctx.require_role(Role::Librarian).unwrap().id, 5);
        assert_eq!(
            ctx.require_role(Role::Admin),
            Err(AccessError::Forbidden { required: Role::Admin, actual: Role::Librarian })
        );
        assert!(ctx.require_staff().is_ok());
        assert!(context(Role::Student).require_staff().is_err());
    }

    #[test]
    fn test_clones_share_session() {
        let ctx = context(Role::Student);
        let clone = ctx.clone();
        assert_eq!(clone.user_id(), Some(5));
        assert_eq!(clone.role(), Some(Role::Student));
    }
}
