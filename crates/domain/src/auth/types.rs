//! Session and credential types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cached identity of the signed-in user, as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Server-side user id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Contact address, if the account has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Any further profile fields the server sends.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl UserRecord {
    /// Creates a user record with no extra profile fields.
    #[must_use]
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Credentials held by the client for the current session.
///
/// The user record is only present while an access credential is; any
/// constructor or mutation that would break that pairing normalises the
/// session to empty instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<UserRecord>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            user: None,
        }
    }

    /// Creates a session from freshly issued credentials.
    #[must_use]
    pub fn new(access_token: String, refresh_token: Option<String>, user: Option<UserRecord>) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token,
            user,
        }
        .normalized()
    }

    /// Returns a copy that satisfies the session invariant.
    ///
    /// A blank access token counts as absent. Without an access token
    /// nothing else is kept.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self.access_token {
            Some(ref token) if !token.trim().is_empty() => self,
            _ => Self::empty(),
        }
    }

    /// Current access credential.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Current refresh credential.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Cached user identity.
    #[must_use]
    pub const fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    /// Returns true when an access credential is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Returns true when nothing is held.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }

    /// Replaces the access credential (and the refresh credential if the
    /// server rotated it), keeping the cached user.
    pub fn rotate(&mut self, access_token: String, refresh_token: Option<String>) {
        self.access_token = Some(access_token);
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        *self = std::mem::take(self).normalized();
    }

    /// Attaches the user identity. Ignored while unauthenticated.
    pub fn set_user(&mut self, user: UserRecord) {
        if self.is_authenticated() {
            self.user = Some(user);
        }
    }
}

/// Credentials returned by the login and register endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthTokens {
    /// Access credential.
    pub access: String,
    /// Refresh credential.
    #[serde(default)]
    pub refresh: Option<String>,
    /// User identity (register responses include it).
    #[serde(default)]
    pub user: Option<UserRecord>,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    /// The stored refresh credential.
    pub refresh: &'a str,
}

/// Response of `POST /auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshGrant {
    /// New access credential.
    pub access: String,
    /// Rotated refresh credential, when the server rotates them.
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Desired login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Password.
    pub password: String,
}

/// Shortens a credential for logs: first 8 chars followed by `...`.
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.len() > 12 {
        let cut = token
            .char_indices()
            .nth(8)
            .map_or(token.len(), |(index, _)| index);
        format!("{}...", &token[..cut])
    } else {
        token.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blank_access_token_normalizes_to_empty() {
        let session = Session::new("  ".to_string(), Some("r".to_string()), None);
        assert!(session.is_empty());
    }

    #[test]
    fn test_user_is_dropped_without_access_token() {
        let json = r#"{"access_token": null, "refresh_token": "r", "user": {"id": 1, "username": "ann"}}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert!(session.normalized().is_empty());
    }

    #[test]
    fn test_rotate_keeps_refresh_when_not_rotated() {
        let mut session = Session::new("a1".to_string(), Some("r1".to_string()), None);
        session.set_user(UserRecord::new(7, "ann"));
        session.rotate("a2".to_string(), None);

        assert_eq!(session.access_token(), Some("a2"));
        assert_eq!(session.refresh_token(), Some("r1"));
        assert_eq!(session.user().map(|u| u.id), Some(7));
    }

    #[test]
    fn test_set_user_ignored_when_signed_out() {
        let mut session = Session::empty();
        session.set_user(UserRecord::new(1, "ann"));
        assert!(session.user().is_none());
    }

    #[test]
    fn test_user_record_keeps_unknown_fields() {
        let json = r#"{"id": 3, "username": "bo", "first_name": "Bo"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.extra.get("first_name"), Some(&serde_json::json!("Bo")));
    }

    #[test]
    fn test_token_preview() {
        assert_eq!(token_preview("abcdefghijklmnop"), "abcdefgh...");
        assert_eq!(token_preview("short"), "short");
    }
}
