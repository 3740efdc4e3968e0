//! Timeout wrapper applied to every external call.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::{Error, Result};

/// Await `fut`, converting an elapsed deadline into [`Error::Timeout`].
pub async fn with_deadline<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            debug!("{} exceeded {:?}", operation, limit);
            Err(Error::Timeout {
                operation,
                millis: limit.as_millis(),
            })
        }
    }
}
