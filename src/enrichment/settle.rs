use std::future::Future;
use std::time::Duration;

use crate::upstream::LookupError;

/// Outcome of one fan-out branch. A failure never escapes the branch.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T> {
    Matched(T),
    Absent,
    Failed(String),
}

impl<T> Settled<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Settled::Matched(value) => Some(value),
            Settled::Absent | Settled::Failed(_) => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Settled::Matched(_))
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Settled::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            Settled::Matched(_) => "matched",
            Settled::Absent => "absent",
            Settled::Failed(_) => "failed",
        }
    }
}

/// Runs `lookup` under `timeout` and folds every outcome into a [`Settled`].
pub async fn settle<T, F>(lookup: F, timeout: Duration) -> Settled<T>
where
    F: Future<Output = Result<Option<T>, LookupError>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(Some(value))) => Settled::Matched(value),
        Ok(Ok(None)) => Settled::Absent,
        Ok(Err(err)) => Settled::Failed(err.to_string()),
        Err(_) => Settled::Failed(LookupError::Timeout.to_string()),
    }
}
