use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

/// Process-wide `{response_id -> cancel handle}` map (spec §5/§9). A plain
/// `std::sync::Mutex` guards it — the teacher reaches for `std::sync`
/// rather than an actor/channel abstraction for small shared maps like
/// `Arc<Config>`, and lookups here are brief enough not to need an async
/// lock.
#[derive(Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh token for a response that is about to start
    /// running, returning the token the in-flight task should poll.
    pub fn register(&self, response_id: impl Into<String>) -> CancellationToken {
        let token = CancellationToken::new();
        let mut guard = self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(response_id.into(), token.clone());
        token
    }

    /// Cancels the in-flight turn for `response_id`, if one is registered.
    /// Returns `true` if a matching registration was found.
    pub fn cancel(&self, response_id: &str) -> bool {
        let guard = self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.get(response_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drops the registration once a response reaches a terminal state.
    pub fn remove(&self, response_id: &str) {
        let mut guard = self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.remove(response_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_reaches_the_registered_token() {
        let registry = CancellationRegistry::new();
        let token = registry.register("resp_abcdefghijklmnopqrstuvwx");
        assert!(!token.is_cancelled());
        assert!(registry.cancel("resp_abcdefghijklmnopqrstuvwx"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_on_unknown_id_is_a_no_op() {
        let registry = CancellationRegistry::new();
        assert!(!registry.cancel("resp_does_not_exist"));
    }

    #[test]
    fn remove_forgets_the_registration() {
        let registry = CancellationRegistry::new();
        registry.register("resp_abcdefghijklmnopqrstuvwx");
        registry.remove("resp_abcdefghijklmnopqrstuvwx");
        assert!(!registry.cancel("resp_abcdefghijklmnopqrstuvwx"));
    }
}
