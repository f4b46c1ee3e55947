//! Local login stub.
//!
//! A single hardcoded administrator and a 24-hour session. This gates the
//! operator shell; it is not a security boundary.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_ADMIN_NAME, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_ROLE, DEFAULT_ADMIN_USERNAME,
    SESSION_TTL_HOURS,
};

/// The signed-in user as shown in the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
    pub role: String,
}

/// A persisted login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: UserProfile,
    pub logged_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: UserProfile, now: DateTime<Utc>) -> Self {
        Session {
            user,
            logged_in_at: now,
        }
    }

    /// True while less than [`SESSION_TTL_HOURS`] have passed since login.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now - self.logged_in_at < Duration::hours(SESSION_TTL_HOURS)
    }
}

/// Checks credentials against the built-in administrator.
///
/// Usernames compare case-insensitively after trimming; passwords exactly.
///
/// ```rust
/// use baht_core::auth::authenticate_local;
///
/// assert!(authenticate_local(" Admin ", "admin123").is_some());
/// assert!(authenticate_local("admin", "ADMIN123").is_none());
/// ```
pub fn authenticate_local(username: &str, password: &str) -> Option<UserProfile> {
    let username = username.trim();
    if username.eq_ignore_ascii_case(DEFAULT_ADMIN_USERNAME) && password == DEFAULT_ADMIN_PASSWORD
    {
        Some(UserProfile {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            name: DEFAULT_ADMIN_NAME.to_string(),
            role: DEFAULT_ADMIN_ROLE.to_string(),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_login() {
        let user = authenticate_local("ADMIN", "admin123").unwrap();
        assert_eq!(user.name, "ผู้ดูแลระบบ");
        assert_eq!(user.role, "admin");
        assert!(authenticate_local("admin", "wrong").is_none());
        assert!(authenticate_local("", "admin123").is_none());
    }

    #[test]
    fn test_session_expires_after_a_day() {
        let start = Utc::now();
        let user = authenticate_local("admin", "admin123").unwrap();
        let session = Session::new(user, start);

        assert!(session.is_valid(start + Duration::hours(23)));
        assert!(!session.is_valid(start + Duration::hours(24)));
    }
}
