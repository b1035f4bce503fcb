use thiserror::Error;

pub type BanditResult<T> = Result<T, BanditError>;

/// Errors raised by the bandit environment and agents. Both variants are
/// caller bugs, never transient conditions, so nothing in the crate retries
/// on them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BanditError {
    /// Construction parameters were rejected. No object is built.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An arm index outside `[0, arm_count)` was passed to `step`.
    #[error("Invalid action {action}: arm index must be in [0, {arm_count})")]
    InvalidAction { action: usize, arm_count: usize },
}
