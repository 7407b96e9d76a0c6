use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Why a single call into the store did not succeed.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("The store did not answer within {0:?}")]
    TimedOut(Duration),
}

/// Runs one store call, giving up after `limit`.
///
/// A call that times out is dropped, so nothing after it runs.
pub async fn within<F, T>(limit: Duration, operation: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match timeout(limit, operation).await {
        Ok(result) => result.map_err(RemoteError::from),
        Err(_) => Err(RemoteError::TimedOut(limit)),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        remote::{RemoteError, within},
        store::StoreError,
    };
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn outcomes() {
        let limit = Duration::from_secs(1);

        assert_eq!(within(limit, async { Ok::<_, StoreError>(7) }).await, Ok(7));
        assert_eq!(
            within(limit, async {
                Err::<(), _>(StoreError::Unavailable("offline".to_owned()))
            })
            .await,
            Err(RemoteError::Store(StoreError::Unavailable(
                "offline".to_owned()
            )))
        );
        assert_eq!(
            within(limit, std::future::pending::<Result<(), StoreError>>()).await,
            Err(RemoteError::TimedOut(limit))
        );
    }
}
