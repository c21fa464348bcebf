use std::time::Duration;

pub const INITIAL_BACKOFF_MS: u64 = 1_000;
pub const MAX_BACKOFF_MS: u64 = 15_000;

/// Doubling reconnect delay, capped, reset on every successful open.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial_ms: u64,
    max_ms: u64,
    current_ms: u64,
}

impl ReconnectBackoff {
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial_ms = initial_ms.max(1);
        let max_ms = max_ms.max(initial_ms);
        Self {
            initial_ms,
            max_ms,
            current_ms: initial_ms,
        }
    }

    /// Delay to wait before the next attempt; the following call returns
    /// double this value (up to the cap).
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_ms;
        self.current_ms = self.current_ms.saturating_mul(2).min(self.max_ms);
        Duration::from_millis(delay)
    }

    pub fn current_ms(&self) -> u64 {
        self.current_ms
    }

    pub fn reset(&mut self) {
        self.current_ms = self.initial_ms;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF_MS, MAX_BACKOFF_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delays(backoff: &mut ReconnectBackoff, n: usize) -> Vec<u64> {
        (0..n).map(|_| backoff.next_delay().as_millis() as u64).collect()
    }

    #[test]
    fn test_doubles_up_to_cap() {
        let mut backoff = ReconnectBackoff::default();
        assert_eq!(
            delays(&mut backoff, 7),
            vec![1_000, 2_000, 4_000, 8_000, 15_000, 15_000, 15_000]
        );
    }

    #[test]
    fn test_reset_restores_initial_delay() {
        let mut backoff = ReconnectBackoff::default();
        delays(&mut backoff, 4);
        backoff.reset();
        assert_eq!(delays(&mut backoff, 2), vec![1_000, 2_000]);
    }

    #[test]
    fn test_degenerate_bounds_are_sanitized() {
        let mut backoff = ReconnectBackoff::new(0, 0);
        assert_eq!(delays(&mut backoff, 3), vec![1, 1, 1]);
    }
}
