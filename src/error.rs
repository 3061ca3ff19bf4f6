use thiserror::Error;

/// Domain errors raised by the rule list and its sync gate
///
/// Store and filesystem failures travel as `anyhow::Error` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("an inhibit rule for '{0}' already exists")]
    AlreadyExists(String),

    #[error("another rule list mutation is still in flight")]
    MutationInProgress,
}
