use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Text a manager must type to confirm the purge
pub const RESET_CONFIRMATION: &str = "CONFIRM";

/// One-shot tokens handed out by the reset confirmation step
pub struct ResetTokens {
    pending: Mutex<HashMap<Uuid, DateTime<Utc>>>,
    ttl: Duration,
}

impl ResetTokens {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn issue(&self) -> (Uuid, DateTime<Utc>) {
        let token = Uuid::new_v4();
        let expires_at = Utc::now() + self.ttl;

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        pending.retain(|_, exp| *exp > now);
        pending.insert(token, expires_at);

        (token, expires_at)
    }

    /// Consume a token; false if it was never issued, already used, or expired
    pub fn redeem(&self, token: Uuid) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending
            .remove(&token)
            .is_some_and(|expires_at| expires_at > Utc::now())
    }
}

impl Default for ResetTokens {
    fn default() -> Self {
        Self::new(Duration::minutes(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_single_use() {
        let tokens = ResetTokens::default();
        let (token, _) = tokens.issue();

        assert!(tokens.redeem(token));
        assert!(!tokens.redeem(token));
    }

    #[test]
    fn test_unknown_and_expired_tokens_are_rejected() {
        let tokens = ResetTokens::new(Duration::seconds(-1));
        let (token, _) = tokens.issue();

        assert!(!tokens.redeem(token));
        assert!(!tokens.redeem(Uuid::new_v4()));
    }
}
