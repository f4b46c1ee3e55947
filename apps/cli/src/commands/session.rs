//! # Session Commands

use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn login(
    state: &AppState,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let session = state.sync.login(username, password, now).await?;
    Ok(format!(
        "Logged in as {} ({}, {})",
        session.user.username, session.user.name, session.user.role
    ))
}

pub async fn logout(state: &AppState) -> Result<String, ApiError> {
    state.sync.logout().await?;
    Ok("Logged out".to_string())
}

pub async fn whoami(state: &AppState, now: DateTime<Utc>) -> Result<String, ApiError> {
    Ok(match state.sync.current_session(now).await? {
        Some(session) => format!(
            "{} ({}) since {}",
            session.user.username,
            session.user.role,
            session.logged_in_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => "Not logged in".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{local_state, state_with_remote};
    use crate::error::ErrorCode;
    use baht_sync::RemoteUser;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 14, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_local_admin_login() {
        let state = local_state().await;
        let notice = login(&state, "admin", "admin123", now()).await.unwrap();
        assert!(notice.starts_with("Logged in as admin"));

        let me = whoami(&state, now() + Duration::hours(1)).await.unwrap();
        assert!(me.starts_with("admin ("));

        logout(&state).await.unwrap();
        assert_eq!(whoami(&state, now()).await.unwrap(), "Not logged in");
    }

    #[tokio::test]
    async fn test_bad_password_without_remote() {
        let state = local_state().await;
        let err = login(&state, "admin", "wrong", now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthError);
    }

    #[tokio::test]
    async fn test_remote_user_login() {
        let (state, remote) = state_with_remote().await;
        remote
            .add_user(RemoteUser::active("somchai", "pass1234", "สมชาย", "staff"))
            .await;

        let notice = login(&state, "somchai", "pass1234", now()).await.unwrap();
        assert_eq!(notice, "Logged in as somchai (สมชาย, staff)");
    }

    #[tokio::test]
    async fn test_session_expires() {
        let state = local_state().await;
        login(&state, "admin", "admin123", now()).await.unwrap();
        let later = now() + Duration::days(30);
        assert_eq!(whoami(&state, later).await.unwrap(), "Not logged in");
    }
}
