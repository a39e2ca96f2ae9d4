//! Política de reintentos del engine.
//!
//! Presupuesto y forma del backoff son configuración fija del engine (se
//! eligen al construirlo), no parámetros por llamada.

use std::time::Duration;

use crate::constants::{DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_RETRY_BUDGET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Un fallo transitorio que lleva el contador a `budget` es terminal.
    pub budget: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { budget: DEFAULT_RETRY_BUDGET,
               base_delay: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
               max_delay: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS) }
    }
}

impl RetryPolicy {
    pub fn new(budget: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self { budget,
               base_delay,
               max_delay }
    }

    /// ¿Se permite reintentar cuando el contador pasa a `attempt`?
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.budget
    }

    /// Espera previa al reintento número `attempt` (>= 1):
    /// `base * 2^(attempt-1)`, acotado por `max_delay`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let factor = 1u32 << exp;
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_allows_two_retries() {
        let p = RetryPolicy::default();
        assert!(p.allows(1));
        assert!(p.allows(2));
        assert!(!p.allows(3));
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let p = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(p.backoff_for(1), Duration::from_millis(100));
        assert_eq!(p.backoff_for(2), Duration::from_millis(200));
        assert_eq!(p.backoff_for(3), Duration::from_millis(350));
        assert_eq!(p.backoff_for(40), Duration::from_millis(350));
    }
}
