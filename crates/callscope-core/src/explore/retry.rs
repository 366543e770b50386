//! Timeout and retry around oracle calls

use crate::config::ExplorationConfig;
use crate::error::OracleError;
use std::future::Future;
use std::time::Duration;

/// Call `f` until it succeeds, bounding each attempt by the oracle timeout.
///
/// Makes `oracle_max_retries + 1` attempts with a doubling backoff between
/// them and returns the last error when all fail.
pub async fn with_oracle_retry<T, F, Fut>(
    config: &ExplorationConfig,
    step: &str,
    mut f: F,
) -> Result<T, OracleError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OracleError>>,
{
    let attempts = config.oracle_max_retries + 1;
    let timeout = Duration::from_secs(config.oracle_timeout_secs);
    let mut backoff = Duration::from_millis(config.retry_backoff_ms);
    let mut last_error = OracleError::Unavailable(format!("{} was not attempted", step));

    for attempt in 1..=attempts {
        let result = match tokio::time::timeout(timeout, f()).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(config.oracle_timeout_secs)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(step, attempt, attempts, error = %e, "oracle call failed");
                last_error = e;
                if attempt < attempts {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config(retries: u32) -> ExplorationConfig {
        ExplorationConfig {
            oracle_max_retries: retries,
            oracle_timeout_secs: 5,
            retry_backoff_ms: 100,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let result = with_oracle_retry(&config(2), "plan", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(OracleError::Transport("reset".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_with_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_oracle_retry(&config(1), "plan", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(OracleError::Malformed("not json".to_string()))
        })
        .await;
        assert!(matches!(result, Err(OracleError::Malformed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_call_times_out() {
        let result: Result<(), _> = with_oracle_retry(&config(0), "synthesize", || async {
            std::future::pending::<()>().await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(OracleError::Timeout(5))));
    }
}
