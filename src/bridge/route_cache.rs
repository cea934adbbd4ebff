//! Lazily populated route catalog with an optional time-to-live

use crate::error::EngineResult;
use crate::remote::{Route, SwapApi};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedRoutes {
    fetched_at: Instant,
    routes: Arc<Vec<Route>>,
}

/// Route cache owned by one validator instance
pub struct RouteCache {
    ttl: Option<Duration>,
    entry: RwLock<Option<CachedRoutes>>,
}

impl RouteCache {
    /// `None` keeps the first fetch for the cache's lifetime
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    fn is_fresh(&self, cached: &CachedRoutes) -> bool {
        match self.ttl {
            Some(ttl) => cached.fetched_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Cached routes, fetching from `api` on first use or after expiry
    pub async fn get_or_fetch(&self, api: &dyn SwapApi) -> EngineResult<Arc<Vec<Route>>> {
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref().filter(|c| self.is_fresh(c)) {
                return Ok(cached.routes.clone());
            }
        }

        let mut entry = self.entry.write().await;
        // Another caller may have refreshed while we waited for the write lock
        if let Some(cached) = entry.as_ref().filter(|c| self.is_fresh(c)) {
            return Ok(cached.routes.clone());
        }

        let routes = Arc::new(api.get_available_routes().await?);
        debug!("Route cache refreshed with {} routes", routes.len());
        *entry = Some(CachedRoutes {
            fetched_at: Instant::now(),
            routes: routes.clone(),
        });

        Ok(routes)
    }

    /// Forget the cached entry; the next call fetches again
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockSwapApi;

    fn routes() -> Vec<Route> {
        vec![Route {
            source_network: "starknet_mainnet".into(),
            destination_network: "base_mainnet".into(),
            source_tokens: vec!["ETH".into()],
            destination_tokens: vec!["ETH".into()],
        }]
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_once_without_ttl() {
        let mut api = MockSwapApi::new();
        api.expect_get_available_routes()
            .times(1)
            .returning(|| Ok(routes()));

        let cache = RouteCache::new(None);
        cache.get_or_fetch(&api).await.unwrap();
        tokio::time::sleep(Duration::from_secs(86_400)).await;
        assert_eq!(cache.get_or_fetch(&api).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetches_after_ttl() {
        let mut api = MockSwapApi::new();
        api.expect_get_available_routes()
            .times(2)
            .returning(|| Ok(routes()));

        let cache = RouteCache::new(Some(Duration::from_secs(60)));
        cache.get_or_fetch(&api).await.unwrap();
        cache.get_or_fetch(&api).await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;
        cache.get_or_fetch(&api).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let mut api = MockSwapApi::new();
        api.expect_get_available_routes()
            .times(2)
            .returning(|| Ok(routes()));

        let cache = RouteCache::new(None);
        cache.get_or_fetch(&api).await.unwrap();
        cache.get_or_fetch(&api).await.unwrap();
        cache.invalidate().await;
        cache.get_or_fetch(&api).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_is_not_cached() {
        let mut api = MockSwapApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_get_available_routes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(crate::error::EngineError::Transport("down".into())));
        api.expect_get_available_routes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(routes()));

        let cache = RouteCache::new(None);
        assert!(cache.get_or_fetch(&api).await.is_err());
        assert!(cache.get_or_fetch(&api).await.is_ok());
    }
}
