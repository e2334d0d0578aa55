//! Keyed store of live interview sessions.
//!
//! At most one session per user id. Callers work on clones and write them
//! back with [`SessionStore::set`]; the store never hands out references into
//! its map.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::AssessmentError;
use crate::session::InterviewSession;

pub struct SessionStore {
    sessions: Mutex<HashMap<String, InterviewSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, InterviewSession>>, AssessmentError> {
        self.sessions
            .lock()
            .map_err(|e| AssessmentError::Storage(format!("Lock poisoned: {}", e)))
    }

    /// Snapshot of the user's session, if one is live.
    pub fn get(&self, user_id: &str) -> Result<Option<InterviewSession>, AssessmentError> {
        Ok(self.lock()?.get(user_id).cloned())
    }

    /// Insert or replace the session keyed by its user id.
    pub fn set(&self, session: InterviewSession) -> Result<(), AssessmentError> {
        self.lock()?.insert(session.user_id.clone(), session);
        Ok(())
    }

    /// Remove the user's session, returning it if it existed.
    pub fn delete(&self, user_id: &str) -> Result<Option<InterviewSession>, AssessmentError> {
        Ok(self.lock()?.remove(user_id))
    }

    /// Insert `session` unless its user already has one. Returns the live
    /// session and whether it was created by this call.
    pub fn get_or_insert(
        &self,
        session: InterviewSession,
    ) -> Result<(InterviewSession, bool), AssessmentError> {
        let mut sessions = self.lock()?;
        if let Some(existing) = sessions.get(&session.user_id) {
            return Ok((existing.clone(), false));
        }
        sessions.insert(session.user_id.clone(), session.clone());
        Ok((session, true))
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.lock()
            .map(|s| s.contains_key(user_id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle for longer than `ttl` and return their user ids.
    pub fn expire_idle(&self, ttl: Duration) -> Vec<String> {
        let mut sessions = match self.lock() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Cannot expire idle sessions");
                return vec![];
            }
        };

        let ttl_secs = ttl.as_secs();
        let expired: Vec<String> = sessions
            .values()
            .filter(|s| s.last_update.age_secs() > ttl_secs)
            .map(|s| s.user_id.clone())
            .collect();

        for user_id in &expired {
            sessions.remove(user_id);
            tracing::info!(user_id = %user_id, "Idle assessment session expired");
        }

        expired
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
