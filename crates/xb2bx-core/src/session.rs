// Login session: the bearer token and signed-in user, persisted through a
// `KeyValueStore` so a restart resumes where the user left off.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::User;
use crate::store::KeyValueStore;

/// Storage key holding the raw bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the JSON-serialized [`User`].
pub const USER_KEY: &str = "user";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("refusing to store a session with an empty token")]
    EmptyToken,

    #[error("failed to serialize user: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("session storage failed: {0:#}")]
    Storage(anyhow::Error),
}

/// In-memory view of the login session.
///
/// `user.is_some()` implies `token` is non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: Option<User>,
}

impl Session {
    pub fn logged_out() -> Self {
        Self::default()
    }
}

/// Owns the session and keeps it in sync with durable storage.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    session: Session,
}

impl SessionStore {
    /// Hydrate the session from storage.
    ///
    /// Never fails: a missing token, an empty token, a missing or malformed
    /// user record, or a storage error all produce a logged-out session.
    pub fn bootstrap(store: Arc<dyn KeyValueStore>) -> Self {
        let session = read_session(store.as_ref());
        match &session.user {
            Some(user) => info!("Restored session for {} ({})", user.email, user.role),
            None => info!("No stored session, starting logged out"),
        }
        Self { store, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.user.as_ref()
    }

    /// Bearer token, or `None` when logged out.
    pub fn token(&self) -> Option<&str> {
        if self.session.token.is_empty() {
            None
        } else {
            Some(&self.session.token)
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.user.is_some()
    }

    /// Persist `token` and `user` in a single write, then adopt them as the
    /// current session. Nothing changes if the write fails.
    pub fn login(&mut self, token: &str, user: User) -> Result<(), SessionError> {
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        let user_json = serde_json::to_string(&user)?;
        self.store
            .set(&[(TOKEN_KEY, token), (USER_KEY, &user_json)])
            .map_err(SessionError::Storage)?;

        info!("Logged in as {} ({})", user.email, user.role);
        self.session = Session {
            token: token.to_string(),
            user: Some(user),
        };
        Ok(())
    }

    /// Drop the in-memory session, then remove both persisted keys.
    ///
    /// The in-memory session is cleared even when storage fails, so the
    /// caller always ends up logged out.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.session = Session::logged_out();
        info!("Logged out");
        self.store
            .clear(&[TOKEN_KEY, USER_KEY])
            .map_err(SessionError::Storage)
    }
}

fn read_session(store: &dyn KeyValueStore) -> Session {
    let token = match store.get(TOKEN_KEY) {
        Ok(Some(token)) if !token.is_empty() => token,
        Ok(_) => return Session::logged_out(),
        Err(e) => {
            warn!("Failed to read stored token: {e:#}");
            return Session::logged_out();
        }
    };

    let raw_user = match store.get(USER_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Session::logged_out(),
        Err(e) => {
            warn!("Failed to read stored user: {e:#}");
            return Session::logged_out();
        }
    };

    match serde_json::from_str::<User>(&raw_user) {
        Ok(user) => Session {
            token,
            user: Some(user),
        },
        Err(e) => {
            debug!("Ignoring malformed stored user: {e}");
            Session::logged_out()
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::store::{MemoryStore, SqliteStore};

    fn buyer() -> User {
        User {
            id: 1,
            name: "Bea Buyer".into(),
            email: "bea@example.com".into(),
            role: Role::Buyer,
            is_verified: Some(true),
        }
    }

    fn memory() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    /// Store whose reads and writes always fail.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk on fire")
        }
        fn set(&self, _entries: &[(&str, &str)]) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }
        fn clear(&self, _keys: &[&str]) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }
    }

    #[test]
    fn bootstrap_empty_store_is_logged_out() {
        let sessions = SessionStore::bootstrap(memory());
        assert_eq!(sessions.session(), &Session::logged_out());
        assert!(!sessions.is_authenticated());
        assert_eq!(sessions.token(), None);
    }

    #[test]
    fn bootstrap_treats_malformed_data_as_logged_out() {
        let cases: &[&[(&str, &str)]] = &[
            &[(TOKEN_KEY, "abc")],
            &[(USER_KEY, r#"{"id":1,"name":"a","email":"b","role":"buyer"}"#)],
            &[(TOKEN_KEY, ""), (USER_KEY, r#"{"id":1,"name":"a","email":"b","role":"buyer"}"#)],
            &[(TOKEN_KEY, "abc"), (USER_KEY, "{not json")],
            &[(TOKEN_KEY, "abc"), (USER_KEY, "null")],
            &[(TOKEN_KEY, "abc"), (USER_KEY, "[]")],
            &[(TOKEN_KEY, "abc"), (USER_KEY, r#"{"id":"one"}"#)],
            &[(TOKEN_KEY, "abc"), (USER_KEY, r#"{"id":1,"name":"a","email":"b","role":"pirate"}"#)],
        ];
        for entries in cases {
            let store = memory();
            store.set(entries).unwrap();
            let sessions = SessionStore::bootstrap(store);
            assert!(
                sessions.current_user().is_none(),
                "expected logged out for {entries:?}"
            );
            assert_eq!(sessions.token(), None);
        }
    }

    #[test]
    fn bootstrap_survives_storage_errors() {
        let sessions = SessionStore::bootstrap(Arc::new(BrokenStore));
        assert!(!sessions.is_authenticated());
    }

    #[test]
    fn corrupt_database_file_starts_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");
        std::fs::write(&path, b"\x00\x01garbage, not sqlite").unwrap();

        let store = SqliteStore::open_or_recover(path.to_str().unwrap());
        let mut sessions = SessionStore::bootstrap(Arc::clone(&store));
        assert_eq!(sessions.current_user(), None);
        assert!(!sessions.is_authenticated());

        // The recovered store is usable for the next login.
        sessions.login("abc", buyer()).unwrap();
        assert_eq!(SessionStore::bootstrap(store).token(), Some("abc"));
    }

    #[test]
    fn login_then_bootstrap_restores_exact_session() {
        let store = memory();
        let mut sessions = SessionStore::bootstrap(Arc::clone(&store));
        sessions.login("abc", buyer()).unwrap();

        let reloaded = SessionStore::bootstrap(store);
        assert_eq!(
            reloaded.session(),
            &Session {
                token: "abc".into(),
                user: Some(buyer()),
            }
        );
    }

    #[test]
    fn login_survives_sqlite_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");
        let path = path.to_str().unwrap();

        let mut sessions = SessionStore::bootstrap(Arc::new(SqliteStore::open(path).unwrap()));
        sessions.login("tok-123", buyer()).unwrap();
        drop(sessions);

        let reloaded = SessionStore::bootstrap(Arc::new(SqliteStore::open(path).unwrap()));
        assert_eq!(reloaded.token(), Some("tok-123"));
        assert_eq!(reloaded.current_user(), Some(&buyer()));
    }

    #[test]
    fn login_rejects_empty_token_and_writes_nothing() {
        let store = memory();
        let mut sessions = SessionStore::bootstrap(Arc::clone(&store));
        let err = sessions.login("", buyer()).unwrap_err();
        assert!(matches!(err, SessionError::EmptyToken));
        assert!(!sessions.is_authenticated());
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn failed_login_write_keeps_previous_session() {
        let mut sessions = SessionStore::bootstrap(Arc::new(BrokenStore));
        assert!(sessions.login("abc", buyer()).is_err());
        assert!(!sessions.is_authenticated());
    }

    #[test]
    fn logout_clears_storage_and_memory() {
        let store = memory();
        let mut sessions = SessionStore::bootstrap(Arc::clone(&store));
        sessions.login("abc", buyer()).unwrap();
        sessions.logout().unwrap();

        assert!(!sessions.is_authenticated());
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn logout_clears_memory_even_when_storage_fails() {
        let mut sessions = SessionStore {
            store: Arc::new(BrokenStore),
            session: Session {
                token: "abc".into(),
                user: Some(buyer()),
            },
        };
        assert!(sessions.logout().is_err());
        assert!(!sessions.is_authenticated());
        assert_eq!(sessions.token(), None);
    }
}
