//! In-memory conversation history.
//!
//! Each session keeps a bounded window of recent exchanges. Nothing is
//! persisted; history is lost when the process exits.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Default number of exchanges remembered per session.
pub const DEFAULT_MAX_HISTORY: usize = 2;

/// One question and the answer given to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub query: String,
    pub response: String,
}

/// Tracks conversation history for every open session.
pub struct SessionManager {
    max_history: usize,
    counter: AtomicU64,
    sessions: Mutex<HashMap<String, VecDeque<Exchange>>>,
}

impl SessionManager {
    /// Create a manager that keeps at most `max_history` exchanges per session.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            counter: AtomicU64::new(0),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Exchange>>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a new, empty session and return its id.
    ///
    /// Ids already taken, for example by a client-chosen id passed to
    /// [`add_exchange`](Self::add_exchange), are skipped.
    pub fn create_session(&self) -> String {
        let mut sessions = self.guard();
        loop {
            let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            let id = format!("session_{}", n);
            if let Entry::Vacant(slot) = sessions.entry(id.clone()) {
                slot.insert(VecDeque::new());
                debug!("Created {}", id);
                return id;
            }
        }
    }

    /// Render the remembered exchanges, oldest first.
    ///
    /// Returns `None` for an unknown session and an empty string for a
    /// session with no exchanges yet.
    pub fn history(&self, session_id: &str) -> Option<String> {
        let sessions = self.guard();
        let exchanges = sessions.get(session_id)?;

        let lines: Vec<String> = exchanges
            .iter()
            .flat_map(|e| {
                [
                    format!("user: {}", e.query),
                    format!("assistant: {}", e.response),
                ]
            })
            .collect();

        Some(lines.join("\n"))
    }

    /// Record an exchange, evicting the oldest once the window is full.
    ///
    /// An unknown id opens a session under that id.
    pub fn add_exchange(&self, session_id: &str, query: &str, response: &str) {
        let mut sessions = self.guard();
        let exchanges = sessions.entry(session_id.to_string()).or_default();

        exchanges.push_back(Exchange {
            query: query.to_string(),
            response: response.to_string(),
        });
        while exchanges.len() > self.max_history {
            exchanges.pop_front();
        }
    }

    /// Drop a session. Returns whether it existed.
    pub fn delete_session(&self, session_id: &str) -> bool {
        let removed = self.guard().remove(session_id).is_some();
        if removed {
            debug!("Deleted {}", session_id);
        }
        removed
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.guard().len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
