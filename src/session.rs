use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clients::{AuthClient, AuthError, AuthSession, AuthUser, DataClient, SignUpOutcome};
use crate::models::{Profile, Role};

/// Resolved authentication state for one session.
///
/// `loading` is true only while the initial resolution is in flight; after
/// that the state always settles, signed in or not. Profile may lag the user:
/// a freshly confirmed account can have `user` set while the profile row has
/// not materialized yet.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub fn resolving() -> Self {
        Self {
            user: None,
            profile: None,
            loading: true,
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            user: None,
            profile: None,
            loading: false,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }
}

/// Holds one session's auth state and keeps it consistent across
/// sign-in/sign-out transitions.
///
/// Profile fetches are guarded by an epoch counter: every state transition
/// bumps it, and a fetch that finishes under a stale epoch is discarded
/// instead of overwriting the newer state.
#[derive(Debug)]
pub struct SessionStore {
    auth: AuthClient,
    data: DataClient,
    state: watch::Sender<AuthState>,
    epoch: AtomicU64,
    access_token: RwLock<Option<String>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(auth: AuthClient, data: DataClient) -> Self {
        let (state, _) = watch::channel(AuthState::resolving());
        Self {
            auth,
            data,
            state,
            epoch: AtomicU64::new(0),
            access_token: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    /// Resolves the state for a previously stored token. Any failure lands
    /// on signed-out with loading cleared; startup never wedges on a dead
    /// backend or an expired token.
    pub async fn initialize(&self, access_token: Option<String>) {
        let Some(token) = access_token else {
            self.apply_session_change(None, None).await;
            return;
        };

        match self.auth.get_user(&token).await {
            Ok(user) => self.apply_session_change(Some(user), Some(token)).await,
            Err(AuthError::Unauthorized) => {
                debug!("Stored token no longer valid");
                self.apply_session_change(None, None).await;
            }
            Err(err) => {
                warn!("Session resolution failed, treating as signed out: {err}");
                self.apply_session_change(None, None).await;
            }
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> Result<SignUpOutcome, AuthError> {
        self.auth.sign_up(email, password, full_name, role).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let session = self.auth.sign_in(email, password).await?;
        self.apply_session_change(Some(session.user.clone()), Some(session.access_token.clone()))
            .await;
        Ok(session)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.access_token.read().await.clone();
        if let Some(token) = token {
            self.auth.sign_out(&token).await?;
        }
        self.apply_session_change(None, None).await;
        Ok(())
    }

    /// Re-reads the profile row for the current user, e.g. after a profile
    /// update. No-op when signed out.
    pub async fn refresh_profile(&self) {
        let user = self.current().user;
        let token = self.access_token.read().await.clone();
        if let (Some(user), Some(token)) = (user, token) {
            let epoch = self.begin_epoch();
            self.load_profile(epoch, user, token).await;
        }
    }

    async fn apply_session_change(&self, user: Option<AuthUser>, token: Option<String>) {
        let epoch = self.begin_epoch();
        *self.access_token.write().await = token.clone();

        match (user, token) {
            (Some(user), Some(token)) => {
                // Publish the user immediately; the profile follows once
                // fetched so callers never see a signed-in state with a
                // stale other-user profile.
                self.state.send_replace(AuthState {
                    user: Some(user.clone()),
                    profile: None,
                    loading: false,
                });
                self.load_profile(epoch, user, token).await;
            }
            _ => {
                self.state.send_replace(AuthState::signed_out());
            }
        }
    }

    async fn load_profile(&self, epoch: u64, user: AuthUser, token: String) {
        let profile = self.fetch_profile(user.id, &token).await;

        if !self.epoch_is_current(epoch) {
            debug!(user_id = %user.id, "Discarding profile fetch from a superseded session state");
            return;
        }

        match profile {
            Ok(profile) => {
                self.state.send_replace(AuthState {
                    user: Some(user),
                    profile,
                    loading: false,
                });
            }
            Err(err) => {
                warn!(user_id = %user.id, "Profile fetch failed: {err}");
                self.state.send_replace(AuthState {
                    user: Some(user),
                    profile: None,
                    loading: false,
                });
            }
        }
    }

    /// A missing row is a valid state (profile not materialized yet), not an
    /// error.
    async fn fetch_profile(&self, user_id: Uuid, token: &str) -> anyhow::Result<Option<Profile>> {
        self.data
            .from("profiles")
            .select("id,full_name,role,avatar_url")
            .eq("id", user_id)
            .auth(token)
            .maybe_single()
            .await
    }

    fn begin_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn epoch_is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }
}

/// How long an untouched registry entry outlives its last request. Matches
/// the cookie session's inactivity expiry, so a store is dropped once the
/// cookie that could reach it has expired.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct SessionEntry {
    store: Arc<SessionStore>,
    last_seen: Instant,
}

/// Per-session stores, keyed by the server-side session id. Sign-in creates
/// an entry, sign-out removes it, and entries idle past [`SESSION_IDLE_TTL`]
/// are swept on the next sign-in so abandoned cookies cannot grow the map
/// without bound.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    auth: AuthClient,
    data: DataClient,
    stores: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(auth: AuthClient, data: DataClient) -> Self {
        Self {
            auth,
            data,
            stores: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store for the given session id, creating it on first sight. Expired
    /// entries are pruned here, since sign-in is the only way the map grows.
    pub async fn store_for(&self, session_id: &str) -> Arc<SessionStore> {
        let mut stores = self.stores.write().await;

        let now = Instant::now();
        stores.retain(|_, entry| now.duration_since(entry.last_seen) < SESSION_IDLE_TTL);

        let entry = stores
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                store: Arc::new(SessionStore::new(self.auth.clone(), self.data.clone())),
                last_seen: now,
            });
        entry.last_seen = now;
        Arc::clone(&entry.store)
    }

    /// Touches the entry so activity keeps it alive.
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionStore>> {
        let mut stores = self.stores.write().await;
        let now = Instant::now();

        let expired = stores
            .get(session_id)
            .is_some_and(|entry| now.duration_since(entry.last_seen) >= SESSION_IDLE_TTL);
        if expired {
            stores.remove(session_id);
            return None;
        }

        let entry = stores.get_mut(session_id)?;
        entry.last_seen = now;
        Some(Arc::clone(&entry.store))
    }

    pub async fn remove(&self, session_id: &str) {
        self.stores.write().await.remove(session_id);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.stores.read().await.len()
    }
}
