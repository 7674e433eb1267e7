// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Finite deadlines for collaborator calls.

use std::future::Future;
use std::time::Duration;

use cortex_core::CortexError;

/// Deadline applied to storage calls made by the engine.
pub const STORAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Awaits `future`, mapping an elapsed deadline to [`CortexError::Timeout`].
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, CortexError>
where
    F: Future<Output = Result<T, CortexError>>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| CortexError::Timeout { duration })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_timeout_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, CortexError>(1)
        };
        let err = with_timeout(Duration::from_secs(1), slow).await.unwrap_err();
        assert!(matches!(err, CortexError::Timeout { duration } if duration == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn inner_result_passes_through() {
        assert_eq!(
            with_timeout(Duration::from_secs(1), async { Ok::<_, CortexError>(7) })
                .await
                .unwrap(),
            7
        );
        let err = with_timeout(Duration::from_secs(1), async {
            Err::<(), _>(CortexError::Internal("boom".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CortexError::Internal(_)));
    }
}
