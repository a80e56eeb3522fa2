use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid object id: {0}")]
    InvalidOid(String),

    #[error("Invalid mirror interval: {0}")]
    InvalidInterval(String),

    #[error("Interval {interval:?} is set below minimum interval of {minimum:?}")]
    IntervalBelowMinimum { interval: Duration, minimum: Duration },

    #[error("Invalid remote address: {0}")]
    InvalidRemoteAddress(String),

    #[error("Invalid repository name: {0}")]
    InvalidRepositoryName(String),
}
