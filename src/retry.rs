//! Bounded retry for transient `Conflict` errors (spec.md §7: "Conflict
//! resolution inside a single mutation is attempted with a bounded retry
//! (e.g., up to 3 times) before surfacing").

use crate::error::{Error, Result};
use std::future::Future;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub async fn with_conflict_retry<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable_conflict() && attempt < max_attempts => {
                log::debug!("retrying after conflict (attempt {attempt}/{max_attempts}): {e}");
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let calls = AtomicU32::new(0);
        let result = with_conflict_retry(DEFAULT_MAX_ATTEMPTS, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 { Err(Error::conflict("stale version")) } else { Ok(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_conflict_once_budget_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_conflict_retry(DEFAULT_MAX_ATTEMPTS, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::conflict("still stale"))
        })
        .await;
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn non_conflict_errors_do_not_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_conflict_retry(DEFAULT_MAX_ATTEMPTS, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::validation("bad input"))
        })
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
