use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use mm_types::LoginResponse;

/// State of one logged-in session, shared by the sync loop and every pipe
/// watcher.
///
/// The cursor is only ever advanced by the sync loop after a batch has been
/// fully processed. The transaction counter is advanced by senders.
pub struct Session {
    user_id: String,
    /// Empty until the first successful sync.
    cursor: Mutex<String>,
    txn_counter: AtomicU64,
}

impl Session {
    pub fn new(login: &LoginResponse) -> Self {
        // Seeding from the clock keeps ids unique across restarts of a
        // process that reuses the same token.
        let seed = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self {
            user_id: login.user_id.clone(),
            cursor: Mutex::new(String::new()),
            txn_counter: AtomicU64::new(seed),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Current cursor, `None` before the first successful sync.
    pub fn cursor(&self) -> Option<String> {
        let cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        (!cursor.is_empty()).then(|| cursor.clone())
    }

    /// Move the cursor to `next_batch`. Empty tokens are ignored.
    pub fn advance(&self, next_batch: &str) {
        if next_batch.is_empty() {
            return;
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        *cursor = next_batch.to_string();
    }

    /// Next transaction id for an outbound message. Strictly increasing
    /// within a session, independent of wall-clock adjustments.
    pub fn next_txn_id(&self) -> String {
        let n = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!("mm{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let login = LoginResponse {
            access_token: "tok".into(),
            user_id: "@bob:host".into(),
            home_server: Some("host".into()),
            device_id: Some("DEV".into()),
        };
        Session::new(&login)
    }

    #[test]
    fn starts_in_initial_state() {
        let s = session();
        assert_eq!(s.cursor(), None);
        assert_eq!(s.user_id(), "@bob:host");
    }

    #[test]
    fn advance_ignores_empty_tokens() {
        let s = session();
        s.advance("s1");
        s.advance("");
        assert_eq!(s.cursor().as_deref(), Some("s1"));
    }

    #[test]
    fn txn_ids_are_unique_and_increasing() {
        let s = session();
        let ids: Vec<u64> = (0..100)
            .map(|_| s.next_txn_id().trim_start_matches("mm").parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
    }
}
