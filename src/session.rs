use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Lifecycle tag shared by every capability client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

enum Slot<H> {
    Uninitialized,
    Ready(H),
    Closed,
}

/// Owns the handle of one external resource and enforces
/// `uninitialized -> ready -> closed`.
pub struct Session<H> {
    capability: &'static str,
    slot: Slot<H>,
}

impl<H> Session<H> {
    pub fn new(capability: &'static str) -> Self {
        Self {
            capability,
            slot: Slot::Uninitialized,
        }
    }

    pub fn capability(&self) -> &'static str {
        self.capability
    }

    pub fn state(&self) -> SessionState {
        match self.slot {
            Slot::Uninitialized => SessionState::Uninitialized,
            Slot::Ready(_) => SessionState::Ready,
            Slot::Closed => SessionState::Closed,
        }
    }

    /// Acquire the handle. On failure the session stays uninitialized and the
    /// error is returned unchanged; nothing is retried.
    pub fn open<F>(&mut self, acquire: F) -> Result<()>
    where
        F: FnOnce() -> Result<H>,
    {
        match self.slot {
            Slot::Ready(_) => Ok(()),
            Slot::Closed => Err(Error::SessionClosed {
                capability: self.capability,
            }),
            Slot::Uninitialized => {
                let handle = acquire()?;
                self.slot = Slot::Ready(handle);
                tracing::debug!(capability = self.capability, "session ready");
                Ok(())
            }
        }
    }

    pub fn handle(&self) -> Result<&H> {
        match &self.slot {
            Slot::Ready(handle) => Ok(handle),
            _ => Err(Error::NotReady {
                capability: self.capability,
            }),
        }
    }

    /// Release the handle. Returns `true` only for the call that actually
    /// released it.
    pub fn close<F>(&mut self, release: F) -> bool
    where
        F: FnOnce(H),
    {
        match std::mem::replace(&mut self.slot, Slot::Closed) {
            Slot::Ready(handle) => {
                release(handle);
                tracing::debug!(capability = self.capability, "session closed");
                true
            }
            _ => false,
        }
    }
}

/// Lifecycle operations every capability client exposes.
pub trait Capability {
    fn name(&self) -> &'static str;
    fn initialize(&mut self) -> Result<()>;
    fn close(&mut self);
    fn state(&self) -> SessionState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_then_close() {
        let mut session: Session<u32> = Session::new("test");
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(matches!(session.handle(), Err(Error::NotReady { .. })));

        session.open(|| Ok(7)).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(*session.handle().unwrap(), 7);

        let mut released = Vec::new();
        assert!(session.close(|h| released.push(h)));
        assert!(!session.close(|h| released.push(h)));
        assert_eq!(released, vec![7]);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_failed_open_stays_uninitialized() {
        let mut session: Session<u32> = Session::new("test");
        let err = session
            .open(|| {
                Err(Error::Initialization {
                    capability: "test",
                    message: "boom".to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, Error::Initialization { .. }));
        assert_eq!(session.state(), SessionState::Uninitialized);

        // A later attempt may still succeed.
        session.open(|| Ok(1)).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_open_is_noop_when_ready() {
        let mut session: Session<u32> = Session::new("test");
        session.open(|| Ok(1)).unwrap();
        session.open(|| Ok(2)).unwrap();
        assert_eq!(*session.handle().unwrap(), 1);
    }

    #[test]
    fn test_closed_session_cannot_reopen() {
        let mut session: Session<u32> = Session::new("test");
        assert!(!session.close(|_| {}));
        let err = session.open(|| Ok(1)).unwrap_err();
        assert!(matches!(err, Error::SessionClosed { .. }));
        assert!(matches!(session.handle(), Err(Error::NotReady { .. })));
    }
}
