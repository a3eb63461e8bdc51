//! Load Balancer Service
//!
//! Selects backend instances for a request and fetches the feed from them.
//! Instances are grouped by platform affinity; a separate fallback group is
//! used when the preferred group fails or does not exist.

use crate::domain::entities::{Feed, Instance};
use crate::domain::errors::FetchError;
use crate::domain::json_feed::JsonFeed;
use crate::domain::ports::FeedFetcher;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Load balancer over a fixed pool of backend instances.
///
/// The instance table, the platform map and the fallback list are built once
/// and never mutated afterwards, so the balancer can be shared behind an
/// `Arc` and read by any number of concurrent requests without locking.
///
/// Fetch strategy for a group:
/// 1. Pick one member at random and try it.
/// 2. If it fails and the group has other members, try all of them at once.
///    The first success wins and the remaining attempts are aborted.
pub struct LoadBalancer {
    instances: Vec<Instance>,
    /// platform tag -> indices into `instances`
    platform_map: HashMap<String, Vec<usize>>,
    /// indices into `instances`
    fallbacks: Vec<usize>,
    fetcher: Arc<dyn FeedFetcher>,
    timeout: Duration,
}

impl LoadBalancer {
    /// Build the balancer from the configured instance list.
    ///
    /// An instance listing several platforms is referenced from each of them
    /// by index, so it is never duplicated.
    pub fn new(instances: Vec<Instance>, fetcher: Arc<dyn FeedFetcher>, timeout: Duration) -> Self {
        let mut platform_map: HashMap<String, Vec<usize>> = HashMap::new();
        let mut fallbacks = Vec::new();

        for (id, instance) in instances.iter().enumerate() {
            for platform in &instance.platforms {
                platform_map.entry(platform.clone()).or_default().push(id);
            }
            if instance.fallback {
                fallbacks.push(id);
            }
        }

        tracing::info!(
            "load balancer ready: instances={} platforms={} fallbacks={}",
            instances.len(),
            platform_map.len(),
            fallbacks.len()
        );

        Self {
            instances,
            platform_map,
            fallbacks,
            fetcher,
            timeout,
        }
    }

    /// All configured instances, in configuration order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Instances with affinity for `platform`, if any.
    pub fn preferred_group(&self, platform: &str) -> Option<&[usize]> {
        self.platform_map
            .get(platform)
            .filter(|group| !group.is_empty())
            .map(|group| group.as_slice())
    }

    /// Instances eligible as fallback.
    pub fn fallback_group(&self) -> &[usize] {
        &self.fallbacks
    }

    /// Fetch a feed for `request_path` on behalf of `platform`.
    ///
    /// Tries the preferred group first (when the platform has one), then the
    /// fallback group. Only when both fail is an error returned.
    pub async fn fetch(&self, request_path: &str, platform: &str) -> Result<Feed, FetchError> {
        tracing::debug!("start fetch url={} platform={}", request_path, platform);

        if let Some(group) = self.preferred_group(platform) {
            tracing::debug!("instances with platform match: {:?}", group);
            match self.fetch_from_group(request_path, group).await {
                Ok(feed) => {
                    tracing::debug!("fetched feed from preferred instances");
                    return Ok(feed.into_feed());
                }
                Err(e) => {
                    tracing::warn!(
                        "failed to get feed from preferred instances ({}), trying fallback",
                        e
                    );
                }
            }
        }

        tracing::debug!("fetching from fallback instances: {:?}", self.fallbacks);
        let feed = self
            .fetch_from_group(request_path, &self.fallbacks)
            .await
            .map_err(|e| FetchError::Exhausted(Box::new(e)))?;

        tracing::debug!("fetched feed from fallback instances");
        Ok(feed.into_feed())
    }

    /// Fetch from one group of interchangeable instances.
    pub async fn fetch_from_group(
        &self,
        request_path: &str,
        group: &[usize],
    ) -> Result<JsonFeed, FetchError> {
        if group.is_empty() {
            tracing::debug!("empty group");
            return Err(FetchError::EmptyGroup);
        }

        let picked = rand::thread_rng().gen_range(0..group.len());
        let picked_id = group[picked];
        let picked_instance = &self.instances[picked_id];
        tracing::debug!("picked instance {} ({})", picked_id, picked_instance.url);

        match self.fetch_instance(picked_instance, request_path).await {
            Ok(feed) => return Ok(feed),
            Err(e) => {
                tracing::warn!(
                    "failed to get feed from instance={} url={}: {}",
                    picked_instance.url,
                    request_path,
                    e
                );
            }
        }

        if group.len() == 1 {
            tracing::debug!("no remaining member in group");
            return Err(FetchError::AllAttemptsFailed);
        }

        tracing::debug!("racing {} remaining instances", group.len() - 1);
        let mut racers = JoinSet::new();
        for (pos, &id) in group.iter().enumerate() {
            if pos == picked {
                continue;
            }
            let fetcher = Arc::clone(&self.fetcher);
            let instance = self.instances[id].clone();
            let path = request_path.to_string();
            let timeout = self.timeout;
            racers.spawn(async move {
                let result = Self::attempt(fetcher.as_ref(), &instance, &path, timeout).await;
                (instance, result)
            });
        }

        // join_next hands out results one at a time, so exactly one success
        // is ever taken from the race.
        while let Some(joined) = racers.join_next().await {
            match joined {
                Ok((instance, Ok(feed))) => {
                    tracing::debug!("race won by {}", instance.url);
                    racers.abort_all();
                    return Ok(feed);
                }
                Ok((instance, Err(e))) => {
                    tracing::warn!("racing attempt to {} failed: {}", instance.url, e);
                }
                Err(e) => {
                    tracing::warn!("racing attempt aborted: {}", e);
                }
            }
        }

        tracing::debug!("all attempts failed");
        Err(FetchError::AllAttemptsFailed)
    }

    async fn fetch_instance(
        &self,
        instance: &Instance,
        request_path: &str,
    ) -> Result<JsonFeed, FetchError> {
        Self::attempt(self.fetcher.as_ref(), instance, request_path, self.timeout).await
    }

    async fn attempt(
        fetcher: &dyn FeedFetcher,
        instance: &Instance,
        request_path: &str,
        timeout: Duration,
    ) -> Result<JsonFeed, FetchError> {
        match tokio::time::timeout(timeout, fetcher.fetch(instance, request_path)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }
}
