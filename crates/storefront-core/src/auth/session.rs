use anyhow::{Context, Result};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub use crate::models::Identity;

use super::storage::SessionStorage;

/// Storage key holding the serialized identity
const USER_KEY: &str = "user";

/// Storage key holding the access credential
const ACCESS_KEY: &str = "access";

/// Storage key holding the refresh credential
const REFRESH_KEY: &str = "refresh";

const ALL_KEYS: [&str; 3] = [USER_KEY, ACCESS_KEY, REFRESH_KEY];

/// Buffer size for the session event channel.
/// Events are rare (sign-in, renewal, sign-out); 16 leaves plenty of slack
/// for a subscriber that polls between commands.
const EVENT_BUFFER_SIZE: usize = 16;

/// A signed-in identity together with both credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub identity: Identity,
    pub access: String,
    pub refresh: String,
}

/// Lifecycle notifications published by the `SessionStore`.
///
/// The store never navigates; the presentation layer subscribes and decides
/// what to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Identity),
    Renewed,
    SignedOut,
    /// Renewal failed and the session was dropped
    Invalidated,
}

pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    data: RwLock<Option<SessionData>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Create a store over `storage` and load whatever session it holds
    pub fn open(storage: impl SessionStorage + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        let store = Self {
            storage: Box::new(storage),
            data: RwLock::new(None),
            events,
        };
        store.load();
        store
    }

    /// Re-read the persisted session.
    ///
    /// Anything short of a complete, well-formed session is treated as
    /// anonymous, and leftover partial keys are purged. A storage that cannot
    /// be read also yields anonymous, but its contents are left alone so a
    /// later load can still pick them up.
    pub fn load(&self) -> bool {
        let loaded = match self.read_persisted() {
            Ok(Some(data)) => Some(data),
            Ok(None) => {
                self.purge();
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session, treating as anonymous");
                None
            }
        };

        let present = loaded.is_some();
        debug!(present, "Session loaded");
        *self.data.write() = loaded;
        present
    }

    fn read_persisted(&self) -> Result<Option<SessionData>> {
        let user = self.storage.read(USER_KEY)?;
        let access = self.storage.read(ACCESS_KEY)?;
        let refresh = self.storage.read(REFRESH_KEY)?;

        let (Some(user), Some(access), Some(refresh)) = (user, access, refresh) else {
            return Ok(None);
        };

        match serde_json::from_str::<Identity>(&user) {
            Ok(identity) => Ok(Some(SessionData {
                identity,
                access,
                refresh,
            })),
            Err(e) => {
                warn!(error = %e, "Persisted identity is malformed");
                Ok(None)
            }
        }
    }

    /// Set and persist a new session. All three keys are written or none are.
    ///
    /// A failed write has already overwritten part of any earlier session, so
    /// that session is dropped from memory as well and `SignedOut` is
    /// published for it.
    pub fn establish(&self, identity: Identity, access: String, refresh: String) -> Result<()> {
        let user = serde_json::to_string(&identity).context("Failed to serialize identity")?;

        let written = self
            .storage
            .write(USER_KEY, &user)
            .and_then(|_| self.storage.write(ACCESS_KEY, &access))
            .and_then(|_| self.storage.write(REFRESH_KEY, &refresh));

        if let Err(e) = written {
            let previous = self.data.write().take();
            self.purge();
            if previous.is_some() {
                warn!("Earlier session dropped after failed sign-in write");
                let _ = self.events.send(SessionEvent::SignedOut);
            }
            return Err(e).context("Failed to persist session");
        }

        info!(username = %identity.username, admin = identity.is_admin, "Session established");
        *self.data.write() = Some(SessionData {
            identity: identity.clone(),
            access,
            refresh,
        });
        let _ = self.events.send(SessionEvent::SignedIn(identity));
        Ok(())
    }

    /// Swap in renewed credentials. Returns false if nobody is signed in.
    ///
    /// The in-memory session always takes the new values; a failure to persist
    /// them only means the next run starts from the previous credential.
    pub fn replace_credentials(&self, access: String, refresh: Option<String>) -> bool {
        let mut guard = self.data.write();
        let Some(data) = guard.as_mut() else {
            return false;
        };

        if let Err(e) = self.storage.write(ACCESS_KEY, &access) {
            warn!(error = %e, "Failed to persist renewed access credential");
        }
        if let Some(ref refresh) = refresh {
            if let Err(e) = self.storage.write(REFRESH_KEY, refresh) {
                warn!(error = %e, "Failed to persist rotated refresh credential");
            }
        }

        data.access = access;
        if let Some(refresh) = refresh {
            data.refresh = refresh;
        }
        drop(guard);

        let _ = self.events.send(SessionEvent::Renewed);
        true
    }

    /// Explicit sign-out
    pub fn clear(&self) {
        self.reset();
        info!("Signed out");
        let _ = self.events.send(SessionEvent::SignedOut);
    }

    /// Drop the session because it can no longer be renewed
    pub fn invalidate(&self) {
        self.reset();
        warn!("Session invalidated");
        let _ = self.events.send(SessionEvent::Invalidated);
    }

    fn reset(&self) {
        *self.data.write() = None;
        self.purge();
    }

    fn purge(&self) {
        for key in ALL_KEYS {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to remove persisted session key");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Option<SessionData> {
        self.data.read().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.data.read().as_ref().map(|d| d.identity.clone())
    }

    pub fn access_credential(&self) -> Option<String> {
        self.data.read().as_ref().map(|d| d.access.clone())
    }

    pub fn refresh_credential(&self) -> Option<String> {
        self.data.read().as_ref().map(|d| d.refresh.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.read().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.data
            .read()
            .as_ref()
            .map(|d| d.identity.is_admin)
            .unwrap_or(false)
    }
}
