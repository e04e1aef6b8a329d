use crate::session::{FileKvStore, Session, SessionResult};

/// Key under which the cookie array is stored
const COOKIES_KEY: &str = "cookies";

/// Saves and restores the authenticated session between runs
///
/// Nothing here is fatal to a crawl: an unreadable or missing session only
/// means the portal will ask for a login again.
#[derive(Debug)]
pub struct SessionStore {
    kv: FileKvStore,
}

impl SessionStore {
    pub fn new(kv: FileKvStore) -> Self {
        Self { kv }
    }

    /// Returns the previously saved session, if there is a usable one
    pub fn restore(&self) -> Option<Session> {
        match self.kv.get::<Session>(COOKIES_KEY) {
            Ok(Some(session)) if !session.is_empty() => {
                tracing::info!(
                    "Restored {} cookies from {}",
                    session.len(),
                    self.kv.dir().display()
                );
                Some(session)
            }
            Ok(_) => {
                tracing::info!("No saved session found, login will be required");
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable saved session: {}", e);
                None
            }
        }
    }

    /// Replaces the saved session
    pub fn save(&self, session: &Session) -> SessionResult<()> {
        self.kv.set(COOKIES_KEY, session)?;
        tracing::info!(
            "Saved {} cookies to {}",
            session.len(),
            self.kv.dir().display()
        );
        Ok(())
    }

    /// Forgets the saved session; returns whether one existed
    pub fn clear(&self) -> SessionResult<bool> {
        self.kv.remove(COOKIES_KEY)
    }

    /// Closes the underlying store
    pub fn close(self) {
        self.kv.close();
    }
}
