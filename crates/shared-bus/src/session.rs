//! # Sessions
//!
//! A session is a connected peer. Its role and metadata are set by the
//! authentication collaborator before any of its messages reach the gate and
//! are read-only from then on.

use shared_types::{Dict, SessionId};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Trust classification of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionRole {
    /// A single end user. Untrusted.
    User,
    /// A client acting for several users (e.g. a chat bot frontend).
    MultiUser,
    /// A backend service. Trusted infrastructure.
    Api,
}

impl SessionRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionRole::User => "user",
            SessionRole::MultiUser => "multi-user",
            SessionRole::Api => "api",
        }
    }
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown session role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for SessionRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(SessionRole::User),
            "multi-user" => Ok(SessionRole::MultiUser),
            "api" => Ok(SessionRole::Api),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    id: SessionId,
    role: SessionRole,
    details: Dict,
    closed: watch::Receiver<bool>,
}

/// Cheaply cloneable view of a connected session.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

/// Owner side of a session. Dropping or closing it signals disconnection to
/// everything still working on the session's behalf.
#[derive(Debug)]
pub struct SessionHandle {
    closed: watch::Sender<bool>,
}

impl SessionHandle {
    /// Mark the session as disconnected.
    pub fn close(&self) {
        let _ = self.closed.send(true);
    }
}

impl Session {
    /// Create a session together with its owner handle.
    #[must_use]
    pub fn open(id: SessionId, role: SessionRole, details: Dict) -> (Self, SessionHandle) {
        let (tx, rx) = watch::channel(false);
        let session = Self {
            inner: Arc::new(SessionInner {
                id,
                role,
                details,
                closed: rx,
            }),
        };
        (session, SessionHandle { closed: tx })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    #[must_use]
    pub fn role(&self) -> SessionRole {
        self.inner.role
    }

    #[must_use]
    pub fn has_role(&self, role: SessionRole) -> bool {
        self.inner.role == role
    }

    /// Session metadata populated by authentication.
    #[must_use]
    pub fn details(&self) -> &Dict {
        &self.inner.details
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow() || self.inner.closed.has_changed().is_err()
    }

    /// Resolves once the session has disconnected.
    pub async fn closed(&self) {
        let mut rx = self.inner.closed.clone();
        // A dropped handle counts as a disconnect.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_role_parse() {
        assert_eq!("user".parse::<SessionRole>().unwrap(), SessionRole::User);
        assert_eq!(
            "multi-user".parse::<SessionRole>().unwrap(),
            SessionRole::MultiUser
        );
        assert_eq!("api".parse::<SessionRole>().unwrap(), SessionRole::Api);
        assert!("admin".parse::<SessionRole>().is_err());
    }

    #[tokio::test]
    async fn test_close_wakes_waiters() {
        let (session, handle) = Session::open(SessionId(1), SessionRole::User, Dict::new());
        assert!(!session.is_closed());

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.closed().await })
        };
        handle.close();

        timeout(Duration::from_millis(100), waiter)
            .await
            .expect("timeout")
            .expect("join");
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_dropped_handle_counts_as_closed() {
        let (session, handle) = Session::open(SessionId(2), SessionRole::Api, Dict::new());
        drop(handle);
        timeout(Duration::from_millis(100), session.closed())
            .await
            .expect("timeout");
    }
}
