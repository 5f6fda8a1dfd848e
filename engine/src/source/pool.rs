use crate::error::SourceError;
use fleet_analytics_config::PoolSettings;
use std::{
    future::Future,
    sync::Arc,
    time::Duration,
};
use tokio::sync::Semaphore;

/// A source behind a bounded number of concurrent queries.
///
/// Waiting for a permit counts against the query timeout, so a saturated pool
/// fails the same way a slow store does.
pub struct SourcePool<S: ?Sized> {
    name: &'static str,
    source: Arc<S>,
    permits: Arc<Semaphore>,
    capacity: usize,
    timeout: Duration,
}

impl<S: ?Sized> Clone for SourcePool<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            source: Arc::clone(&self.source),
            permits: Arc::clone(&self.permits),
            capacity: self.capacity,
            timeout: self.timeout,
        }
    }
}

impl<S: ?Sized> SourcePool<S> {
    pub fn new(name: &'static str, source: Arc<S>, settings: PoolSettings) -> Self {
        let capacity = settings.max_connections.max(1);
        Self {
            name,
            source,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            timeout: settings.query_timeout(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Refuses every further query.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Runs one query under a permit and the pool's timeout. No retries.
    pub async fn run<'a, T, F, Fut>(&'a self, query: &'static str, f: F) -> Result<T, SourceError>
    where
        F: FnOnce(&'a S) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let attempt = async {
            let _permit = self.permits.acquire().await.map_err(|_| SourceError::PoolClosed)?;
            trace!(pool = self.name, query, "running query");
            f(&*self.source).await
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => {
                debug!(pool = self.name, query, timeout = ?self.timeout, "query timed out");
                Err(SourceError::Timeout(self.timeout))
            }
        }
    }
}
