use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::error;
use tracing::warn;

use crate::Error;
use crate::NetworkError;
use crate::Result;

/// Runs one call per endpoint, at most `limit` at a time, each bounded by
/// `timeout` once it holds a permit.
///
/// Results come back in input order. A call that runs out of time yields
/// the error built by `on_timeout`.
pub(crate) async fn bounded<T, Fut>(
    calls: Vec<(String, Fut)>,
    limit: usize,
    timeout: Duration,
    on_timeout: fn(String, Duration) -> NetworkError,
) -> Vec<Result<T>>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));

    let handles: Vec<_> = calls
        .into_iter()
        .map(|(endpoint, call)| {
            let semaphore = semaphore.clone();
            task::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Err(Error::Fatal("fan-out semaphore closed".to_string()));
                };
                match tokio::time::timeout(timeout, call).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("{} did not answer within {:?}", endpoint, timeout);
                        Err(on_timeout(endpoint, timeout).into())
                    }
                }
            })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok(result) => result,
            Err(e) => {
                error!("fan-out task failed: {:?}", e);
                Err(NetworkError::TaskFailed(e).into())
            }
        })
        .collect()
}

pub(crate) fn request_timeout(
    endpoint: String,
    duration: Duration,
) -> NetworkError {
    NetworkError::Timeout { endpoint, duration }
}

pub(crate) fn connect_timeout(
    endpoint: String,
    duration: Duration,
) -> NetworkError {
    NetworkError::ConnectTimeout { endpoint, duration }
}
