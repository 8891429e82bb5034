//! Authenticated session: the current user plus a durably stored bearer token.

use crate::types::{AuthResponse, Credentials, Registration, UserProfile};
use crate::{AgriClient, Error};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Durable storage for the bearer token, a single key holding one string.
pub trait TokenStore {
    /// Reads the stored token, if any.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> io::Result<Option<String>>;

    /// Replaces the stored token.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn save(&mut self, token: &str) -> io::Result<()>;

    /// Removes the stored token. Removing an absent token is not an error.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn clear(&mut self) -> io::Result<()>;
}

/// Process-local token storage. Clones share the same slot, so a second
/// session built from a clone sees what the first one persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token.into()))),
        }
    }

    /// Current contents, for inspection.
    #[must_use]
    pub fn peek(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.peek())
    }

    fn save(&mut self, token: &str) -> io::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// The single active session of a process.
///
/// The session owns the [`AgriClient`] and is the only writer of its token;
/// everything else borrows the client read-only through [`AuthSession::client`].
#[derive(Debug)]
pub struct AuthSession<S> {
    client: AgriClient,
    store: S,
    user: Option<UserProfile>,
    resolved: bool,
}

impl<S: TokenStore> AuthSession<S> {
    /// Creates an unresolved session. Call [`AuthSession::restore`] to pick up
    /// a persisted token.
    pub const fn new(client: AgriClient, store: S) -> Self {
        Self {
            client,
            store,
            user: None,
            resolved: false,
        }
    }

    /// Re-hydrates the session from the persisted token.
    ///
    /// A rejected token, or one whose user no longer exists, is cleared. A
    /// transport failure keeps the token but leaves the user unset. Either way the session is resolved afterwards.
    ///
    /// # Errors
    /// Returns storage errors and non-auth request errors.
    pub async fn restore(&mut self) -> Result<Option<&UserProfile>, Error> {
        let stored = self.store.load();
        let token = match stored {
            Ok(token) => token,
            Err(err) => {
                self.resolved = true;
                return Err(err.into());
            }
        };

        let Some(token) = token else {
            debug!("no persisted token");
            self.client.set_token(None);
            self.user = None;
            self.resolved = true;
            return Ok(None);
        };

        self.client.set_token(Some(token));
        let result = self.client.me().await;
        self.resolved = true;
        match result {
            Ok(user) => {
                info!(username = %user.username, "session restored");
                let user: &UserProfile = self.user.insert(user);
                Ok(Some(user))
            }
            Err(err) if err.is_auth() || matches!(err, Error::Server { status: 404, .. }) => {
                info!(error = %err, "persisted token rejected; clearing session");
                self.clear()?;
                Ok(None)
            }
            Err(err) => {
                self.user = None;
                Err(err)
            }
        }
    }

    /// Logs in and persists the returned token.
    ///
    /// # Errors
    /// Returns [`Error::Auth`] when the service rejects the credentials.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<&UserProfile, Error> {
        let response = self
            .client
            .login(credentials)
            .await
            .map_err(|err| err.into_auth("Invalid email or password. Please try again."))?;
        self.establish(response)
    }

    /// Registers a new account and logs it in.
    ///
    /// Password confirmation and length are checked before any request.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for local failures and [`Error::Auth`]
    /// when the service rejects the registration.
    pub async fn register(&mut self, registration: &Registration) -> Result<&UserProfile, Error> {
        registration.validate().map_err(Error::Validation)?;
        let response = self
            .client
            .register(registration)
            .await
            .map_err(|err| err.into_auth("Registration failed. Please try again."))?;
        self.establish(response)
    }

    /// Clears the user and the persisted token. Safe to call repeatedly.
    ///
    /// # Errors
    /// Returns an error if the token storage cannot be written; the in-memory
    /// session is cleared regardless.
    pub fn logout(&mut self) -> Result<(), Error> {
        if self.user.is_some() {
            info!("logged out");
        }
        self.clear()
    }

    /// Invalidates the session when `err` is an auth rejection from a
    /// downstream call. Returns whether the session was cleared.
    ///
    /// # Errors
    /// Returns an error if the token storage cannot be written.
    pub fn handle_error(&mut self, err: &Error) -> Result<bool, Error> {
        if !err.is_auth() || (self.user.is_none() && self.client.token().is_none()) {
            return Ok(false);
        }
        info!("session rejected by service");
        self.clear()?;
        Ok(true)
    }

    #[must_use]
    pub const fn current_user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Whether restore/login/logout has settled the session state.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.client.token()
    }

    #[must_use]
    pub const fn client(&self) -> &AgriClient {
        &self.client
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn establish(&mut self, response: AuthResponse) -> Result<&UserProfile, Error> {
        self.store.save(&response.access_token)?;
        self.client.set_token(Some(response.access_token));
        self.resolved = true;
        info!(username = %response.user.username, "logged in");
        let user: &UserProfile = self.user.insert(response.user);
        Ok(user)
    }

    fn clear(&mut self) -> Result<(), Error> {
        self.user = None;
        self.client.set_token(None);
        self.resolved = true;
        self.store.clear()?;
        Ok(())
    }
}
