//! Background sweeper for the retrieval cache

use crate::cache::RetrievalCache;
use crate::config::CacheConfig;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Counters accumulated across sweep cycles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepMetrics {
    /// Completed cycles
    pub cycles: u64,
    /// Keys pruned from the similarity index
    pub pruned: u64,
    /// Entries left after the latest cycle
    pub entries: usize,
    /// Cache hit rate at the latest cycle
    pub hit_rate: f64,
}

impl SweepMetrics {
    /// Human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Cycles: {}\nPruned: {}\nEntries: {}\nHit rate: {:.1}%",
            self.cycles,
            self.pruned,
            self.entries,
            self.hit_rate * 100.0
        )
    }
}

/// Periodically drops expired cache entries
///
/// # Examples
///
/// ```no_run
/// use evident_retrieval::{CacheConfig, CacheSweeper, RetrievalCache};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let config = CacheConfig::default();
///     let cache = Arc::new(RetrievalCache::new(config.clone()));
///     let mut sweeper = CacheSweeper::new(cache, &config);
///
///     // Run until Ctrl+C
///     sweeper.run().await;
/// }
/// ```
pub struct CacheSweeper {
    cache: Arc<RetrievalCache>,
    interval: Duration,
    metrics: SweepMetrics,
}

impl CacheSweeper {
    /// Create a sweeper for `cache` using the configured interval
    pub fn new(cache: Arc<RetrievalCache>, config: &CacheConfig) -> Self {
        Self {
            cache,
            interval: config.sweep_interval(),
            metrics: SweepMetrics::default(),
        }
    }

    /// Override the sweep interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Metrics so far
    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }

    fn sweep(&mut self) {
        let pruned = self.cache.invalidate_expired();
        let stats = self.cache.stats();
        self.metrics.cycles += 1;
        self.metrics.pruned += pruned as u64;
        self.metrics.entries = stats.entries;
        self.metrics.hit_rate = stats.hit_rate();
        tracing::info!(
            "Cache sweep completed: {} pruned, {} entries, {:.1}% hit rate",
            pruned,
            stats.entries,
            stats.hit_rate() * 100.0
        );
    }

    /// Sweep at the configured interval until Ctrl+C
    pub async fn run(&mut self) {
        let mut ticker = interval(self.interval);
        tracing::info!("Cache sweeper started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep(),
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping cache sweeper");
                    break;
                }
            }
        }

        tracing::info!("Cache sweeper stopped. Final metrics:\n{}", self.metrics.summary());
    }

    /// Run a fixed number of sweep cycles
    pub async fn run_cycles(&mut self, cycles: usize) {
        let mut ticker = interval(self.interval);
        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting cache sweep {}/{}", cycle + 1, cycles);
            self.sweep();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_domain::{EvidenceItem, EvidenceTier};

    #[tokio::test]
    async fn test_sweeper_prunes_expired_entries() {
        let config = CacheConfig {
            ttl_secs: 1,
            ..CacheConfig::default()
        };
        let cache = Arc::new(RetrievalCache::new(config.clone()));
        cache.insert(
            "interchange rates",
            vec![EvidenceItem::new("d1", "Rates", "1.8% + $0.10", 0.8, EvidenceTier::Document)],
        );

        let mut sweeper = CacheSweeper::new(cache.clone(), &config).with_interval(Duration::from_millis(600));
        // first tick is immediate, second lands after expiry
        sweeper.run_cycles(3).await;

        assert_eq!(sweeper.metrics().cycles, 3);
        assert_eq!(sweeper.metrics().pruned, 1);
        assert_eq!(sweeper.metrics().entries, 0);
        assert!(sweeper.metrics().summary().contains("Pruned: 1"));
    }
}
