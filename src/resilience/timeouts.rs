//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap outbound calls with a deadline
//! - Map an elapsed deadline to [`TransportError::Timeout`]
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Timeout errors are distinct from other transport errors

use std::future::Future;
use std::time::Duration;

use crate::transport::TransportError;

/// Run `fut` with a deadline of `limit`.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let res = with_deadline(Duration::from_millis(200), async { Ok::<_, TransportError>(7) }).await;
        assert_eq!(res.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_elapsed_deadline_is_timeout() {
        let res = with_deadline(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, TransportError>(())
        })
        .await;
        assert!(matches!(res, Err(TransportError::Timeout(d)) if d == Duration::from_millis(20)));
    }
}
