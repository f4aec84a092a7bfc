use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use log::info;
use uuid::Uuid;

use crate::access::{FilterSelection, roster_identities};
use crate::error::DashboardError;
use crate::schema::{Role, View};
use crate::table::Table;

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Per-session state: who is logged in, as which role, and what they are looking at.
///
/// Only changes through [`login`](Self::login), [`logout`](Self::logout),
/// [`select_view`](Self::select_view) and [`set_filters`](Self::set_filters).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    identity: Option<String>,
    role: Option<Role>,
    pub view: View,
    pub filters: FilterSelection,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Role and identity together, present only after a successful login.
    pub fn principal(&self) -> Option<(Role, &str)> {
        match (self.role, self.identity.as_deref()) {
            (Some(role), Some(identity)) => Some((role, identity)),
            _ => None,
        }
    }

    /// Authenticate `raw_identity` against the roster's `role` column.
    ///
    /// The identity is trimmed and lower-cased first. On failure the context
    /// is left unauthenticated.
    pub fn login(
        &mut self,
        roster: &Table,
        role: Role,
        raw_identity: &str,
    ) -> Result<(), DashboardError> {
        let identity = raw_identity.trim().to_lowercase();
        if identity.is_empty() {
            return Err(DashboardError::MissingIdentity);
        }
        if !roster_identities(roster, role.column()).contains(&identity) {
            return Err(DashboardError::AuthFailure);
        }
        info!("login as {} ({})", identity, role.label());
        self.identity = Some(identity);
        self.role = Some(role);
        Ok(())
    }

    pub fn logout(&mut self) {
        *self = SessionContext::default();
    }

    /// Switching views drops the narrowing chosen for the previous one.
    pub fn select_view(&mut self, view: View) {
        if self.view != view {
            self.view = view;
            self.filters = FilterSelection::default();
        }
    }

    pub fn set_filters(&mut self, filters: FilterSelection) {
        self.filters = filters.normalized();
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    context: SessionContext,
    expires_at: SystemTime,
}

/// Session contexts keyed by the opaque id kept in the `session` cookie.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::from_secs(SESSION_DURATION))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of stored sessions, expired ones not yet swept included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `context` under a fresh id and return the id.
    ///
    /// Expired sessions are swept first.
    pub fn create(&self, context: SessionContext) -> String {
        let session_id = Uuid::new_v4().to_string();
        let now = SystemTime::now();
        let expires_at = now + self.ttl;
        let mut sessions = self.lock();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            session_id.clone(),
            StoredSession {
                context,
                expires_at,
            },
        );
        session_id
    }

    /// The context for `session_id`, if it exists and has not expired.
    pub fn get(&self, session_id: &str) -> Option<SessionContext> {
        let mut sessions = self.lock();
        match sessions.get(session_id) {
            Some(s) if s.expires_at > SystemTime::now() => Some(s.context.clone()),
            Some(_) => {
                sessions.remove(session_id);
                None
            }
            None => None,
        }
    }

    /// Replace the stored context. Unknown ids are ignored.
    pub fn update(&self, session_id: &str, context: SessionContext) {
        if let Some(s) = self.lock().get_mut(session_id) {
            s.context = context;
        }
    }

    pub fn remove(&self, session_id: &str) {
        self.lock().remove(session_id);
    }
}
