//! Login session management
//!
//! This module implements the persisted login session:
//! - The cached user profile with its normalized role
//! - JWT claim inspection (role, expiry) without signature checks
//! - The [`SessionManager`] that reads the session store at startup and
//!   writes it on login and logout
//!
//! # Example
//!
//! ```rust
//! use lms_client::session::{Session, UserProfile};
//! use lms_client::Role;
//!
//! let session = Session {
//!     token: "header.payload.signature".to_string(),
//!     user: UserProfile {
//!         id: 12,
//!         username: "ada".to_string(),
//!         email: Some("ada@example.edu".to_string()),
//!         first_name: None,
//!         last_name: None,
//!         role: Role::Librarian,
//!     },
//! };
//!
//! assert!(session.user.role.is_staff());
//! ```

mod manager;

pub use manager::{SessionManager, SessionManagerError, TOKEN_KEY, USER_KEY};

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{EntityId, Role, User};

/// Errors that can occur while inspecting a token
#[derive(Debug, Error)]
pub enum SessionError {
    /// JWT decoding error
    #[error("JWT parsing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// The cached profile of the logged-in user
///
/// Stored as JSON under the `userData` key. The role is always stored in
/// lower case and defaults to `student` when the backend does not send one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Account identifier
    pub id: EntityId,
    /// Login name
    pub username: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Normalized role
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Student
}

impl UserProfile {
    /// Build the cached profile from the account returned at login
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone().unwrap_or_default(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.unwrap_or(Role::Student),
        }
    }

    /// "First Last" when both names are known, otherwise the username
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{} {}", first, last)
            }
            _ => self.username.clone(),
        }
    }
}

/// An authenticated session: the bearer token and who it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token
    pub token: String,
    /// Cached profile
    pub user: UserProfile,
}

/// JWT claims issued by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (username)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Role claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Issued at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl JwtClaims {
    /// Role claim parsed case-insensitively
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }
}

/// Parse JWT claims without validation
///
/// The client never holds the signing key; claims are informational only.
pub fn parse_jwt_claims(token: &str) -> Result<JwtClaims> {
    let header = decode_header(token)?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<JwtClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;

    Ok(token_data.claims)
}

/// Get the expiration time from a JWT token
///
/// Returns None if the token has no expiry claim or cannot be parsed.
pub fn token_expiration(token: &str) -> Option<DateTime<Utc>> {
    let claims = parse_jwt_claims(token).ok()?;
    claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
}

/// Whether a token is past its expiry at `now`
///
/// Tokens without a readable expiry are treated as not expired; the backend
/// remains the authority and will reject them.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    token_expiration(token).is_some_and(|exp| exp <= now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    fn make_token(role: &str, exp: DateTime<Utc>) -> String {
        let claims = JwtClaims {
            sub: Some("ada".to_string()),
            role: Some(role.to_string()),
            iat: Some(Utc::now().timestamp()),
            exp: Some(exp.timestamp()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(b"server_secret"))
            .unwrap()
    }

    #[test]
    fn test_parse_jwt_claims() {
        let token = make_token("LIBRARIAN", Utc::now() + Duration::hours(1));
        let claims = parse_jwt_claims(&token).unwrap();

        assert_eq!(claims.sub.as_deref(), Some("ada"));
        assert_eq!(claims.role(), Some(Role::Librarian));
    }

    #[test]
    fn test_parse_invalid_token() {
        assert!(parse_jwt_claims("not-a-jwt").is_err());
        assert!(token_expiration("not-a-jwt").is_none());
        assert!(!is_token_expired("not-a-jwt", Utc::now()));
    }

    #[test]
    fn test_token_expiry() {
        let now = Utc::now();
        let expired = make_token("STUDENT", now - Duration::minutes(5));
        let fresh = make_token("STUDENT", now + Duration::minutes(5));

        assert!(is_token_expired(&expired, now));
        assert!(!is_token_expired(&fresh, now));
    }

    #[test]
    fn test_profile_from_user_defaults_role() {
        let user = User { id: 4, username: Some("bo".to_string()), ..Default::default() };
        let profile = UserProfile::from_user(&user);
        assert_eq!(profile.role, Role::Student);
        assert_eq!(profile.display_name(), "bo");
    }

    #[test]
    fn test_profile_serializes_lowercase_role() {
        let user = User {
            id: 4,
            username: Some("bo".to_string()),
            first_name: Some("Bo".to_string()),
            last_name: Some("Lee".to_string()),
            role: Some(Role::Admin),
            ..Default::default()
        };
        let profile = UserProfile::from_user(&user);
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["role"], "admin");
        assert_eq!(json["firstName"], "Bo");
        assert_eq!(profile.display_name(), "Bo Lee");
    }
}
