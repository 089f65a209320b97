use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which mutation phase runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOrder {
    #[default]
    CreatesFirst,
    DeletesFirst,
}

impl PhaseOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "creates_first" => Some(PhaseOrder::CreatesFirst),
            "deletes_first" => Some(PhaseOrder::DeletesFirst),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseOrder::CreatesFirst => f.write_str("creates_first"),
            PhaseOrder::DeletesFirst => f.write_str("deletes_first"),
        }
    }
}

/// Retry settings for transient directory failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

/// How a plan is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// Refuse to apply while unattributed assignments exist
    #[serde(default)]
    pub guardrail: bool,
    #[serde(default)]
    pub ordering: PhaseOrder,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-call timeout for directory mutations
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_dry_run() -> bool {
    true
}

fn default_max_concurrency() -> usize {
    4
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            dry_run: default_dry_run(),
            guardrail: false,
            ordering: PhaseOrder::default(),
            max_concurrency: default_max_concurrency(),
            call_timeout_ms: default_call_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ReconcilePolicy {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Concurrency actually used, never below one
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("creates_first", Some(PhaseOrder::CreatesFirst))]
    #[case(" DELETES_FIRST ", Some(PhaseOrder::DeletesFirst))]
    #[case("deletes-first", None)]
    #[case("", None)]
    fn test_phase_order_parse(#[case] input: &str, #[case] expected: Option<PhaseOrder>) {
        assert_eq!(PhaseOrder::parse(input), expected);
    }

    #[test]
    fn test_defaults_from_empty_document() {
        let policy: ReconcilePolicy = serde_yaml::from_str("{}").unwrap();
        assert_eq!(policy, ReconcilePolicy::default());
        assert!(policy.dry_run);
        assert!(!policy.guardrail);
        assert_eq!(policy.ordering, PhaseOrder::CreatesFirst);
        assert_eq!(policy.max_concurrency, 4);
        assert_eq!(policy.retry.max_retries, 3);
        assert_eq!(policy.retry.base_delay_ms, 500);
    }

    #[test]
    fn test_partial_overrides() {
        let policy: ReconcilePolicy = serde_yaml::from_str(
            "dry_run: false\nordering: deletes_first\nretry:\n  max_retries: 1\n",
        )
        .unwrap();
        assert!(!policy.dry_run);
        assert_eq!(policy.ordering, PhaseOrder::DeletesFirst);
        assert_eq!(policy.retry.max_retries, 1);
        assert_eq!(policy.retry.base_delay_ms, 500);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let policy = ReconcilePolicy {
            max_concurrency: 0,
            ..ReconcilePolicy::default()
        };
        assert_eq!(policy.effective_concurrency(), 1);
    }
}
