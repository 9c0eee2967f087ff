//! Bounded fan-out of fetch, decode and transform pipelines.
//!
//! Every source runs through its own pipeline on a rayon pool sized to the
//! concurrency cap. Pipelines report `(index, result)` over a channel and the
//! collector reassembles tiles in input order once every dispatched pipeline
//! has reported.
//!
//! Failure is fail-fast: the first error to arrive fails the whole run and all
//! tiles are discarded. Pipelines already in flight are left to finish; ones
//! that have not started when a failure is seen are skipped.

use crate::compose::layout::LayoutPolicy;
use crate::core::config::Config;
use crate::core::error::{CollectError, CollectResult, ItemError};
use crate::core::types::{ImageSource, Raster};
use crate::filters::transform::prepare_tile;
use crate::source::decode::decode;
use crate::source::fetcher::SourceFetcher;
use crossbeam::channel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of simultaneous pipelines.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// What one pipeline sent back.
enum Report {
    Done(Result<Raster, ItemError>),
    Skipped,
}

/// Statistics of one collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectStats {
    /// Pipelines that ran to completion, successfully or not.
    pub completed: usize,
    /// Pipelines skipped after a failure.
    pub skipped: usize,
    /// Wall time of the run.
    pub duration: Duration,
}

/// Runs the per-source pipelines with bounded concurrency.
#[derive(Clone)]
pub struct FanOutCollector {
    fetcher: Arc<dyn SourceFetcher>,
    concurrency: usize,
}

impl std::fmt::Debug for FanOutCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutCollector")
            .field("fetcher", &"<fetcher>")
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl FanOutCollector {
    /// Create a collector with the default concurrency cap.
    pub fn new(fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self {
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Create a collector using the configured concurrency cap.
    pub fn from_config(fetcher: Arc<dyn SourceFetcher>, config: &Config) -> Self {
        Self::new(fetcher).with_concurrency(config.fetch_concurrency)
    }

    /// Set the concurrency cap. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The concurrency cap.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Produce one prepared tile per source, in input order.
    pub fn collect(
        &self,
        sources: &[ImageSource],
        policy: &LayoutPolicy,
    ) -> CollectResult<Vec<Raster>> {
        self.collect_with_stats(sources, policy).map(|(tiles, _)| tiles)
    }

    /// Like [`collect`](Self::collect), also returning run statistics.
    pub fn collect_with_stats(
        &self,
        sources: &[ImageSource],
        policy: &LayoutPolicy,
    ) -> CollectResult<(Vec<Raster>, CollectStats)> {
        let start_time = Instant::now();
        let mut stats = CollectStats::default();

        if sources.is_empty() {
            return Ok((Vec::new(), stats));
        }

        let workers = self.concurrency.min(sources.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("stargrid-fetch-{}", i))
            .build()
            .map_err(|e| CollectError::WorkerPool(e.to_string()))?;

        let (tx, rx) = channel::unbounded::<(usize, Report)>();
        let aborted = AtomicBool::new(false);
        let fetcher: &dyn SourceFetcher = self.fetcher.as_ref();

        pool.scope(|scope| {
            for (index, source) in sources.iter().enumerate() {
                let tx = tx.clone();
                let aborted = &aborted;
                scope.spawn(move |_| {
                    if aborted.load(Ordering::Acquire) {
                        let _ = tx.send((index, Report::Skipped));
                        return;
                    }
                    let result = run_pipeline(fetcher, &source.url, policy);
                    if result.is_err() {
                        aborted.store(true, Ordering::Release);
                    }
                    let _ = tx.send((index, Report::Done(result)));
                });
            }
        });
        drop(tx);

        // Every sender is gone once the scope returns, so this drains exactly
        // one report per source.
        let mut slots: Vec<Option<Raster>> = vec![None; sources.len()];
        let mut first_error: Option<CollectError> = None;

        for (index, report) in rx.iter() {
            match report {
                Report::Done(Ok(tile)) => {
                    stats.completed += 1;
                    slots[index] = Some(tile);
                }
                Report::Done(Err(error)) => {
                    stats.completed += 1;
                    log::debug!("pipeline {} ({}) failed: {}", index, sources[index].url, error);
                    if first_error.is_none() {
                        first_error = Some(CollectError::Item {
                            index,
                            url: sources[index].url.clone(),
                            source: error,
                        });
                    }
                }
                Report::Skipped => stats.skipped += 1,
            }
        }
        stats.duration = start_time.elapsed();

        if let Some(error) = first_error {
            log::warn!(
                "collection aborted after {} pipeline(s), {} skipped: {}",
                stats.completed,
                stats.skipped,
                error
            );
            return Err(error);
        }

        let missing = slots.iter().filter(|s| s.is_none()).count();
        if missing > 0 {
            return Err(CollectError::Incomplete { missing });
        }

        log::debug!(
            "collected {} tile(s) with {} worker(s) in {}ms",
            sources.len(),
            workers,
            stats.duration.as_millis()
        );
        Ok((slots.into_iter().flatten().collect(), stats))
    }
}

/// fetch → decode → resize → mask for one source.
fn run_pipeline(
    fetcher: &dyn SourceFetcher,
    url: &str,
    policy: &LayoutPolicy,
) -> Result<Raster, ItemError> {
    let raw = fetcher.fetch(url)?;
    let raster = decode(raw)?;
    Ok(prepare_tile(raster, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{DecodeError, FetchError};
    use crate::core::types::CornerStyle;
    use crate::testing::MemoryFetcher;

    const MS: Duration = Duration::from_millis(1);

    fn flat_policy(tile: u32) -> LayoutPolicy {
        LayoutPolicy {
            tile_size: tile,
            corner_style: CornerStyle::Rounded,
            corner_radius: 0.0,
            ..LayoutPolicy::default()
        }
    }

    fn sources(urls: &[&str]) -> Vec<ImageSource> {
        urls.iter().map(|u| ImageSource::new(*u)).collect()
    }

    #[test]
    fn test_order_preserved_when_completion_is_reversed() {
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .image("a", 8, [255, 0, 0, 255], MS * 150)
                .image("b", 8, [0, 255, 0, 255], MS * 0)
                .image("c", 8, [0, 0, 255, 255], MS * 60),
        );
        let collector = FanOutCollector::new(fetcher).with_concurrency(3);

        let tiles = collector
            .collect(&sources(&["a", "b", "c"]), &flat_policy(8))
            .unwrap();

        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0].get_pixel(4, 4).0, [255, 0, 0, 255]);
        assert_eq!(tiles[1].get_pixel(4, 4).0, [0, 255, 0, 255]);
        assert_eq!(tiles[2].get_pixel(4, 4).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_concurrency_is_bounded() {
        let mut fetcher = MemoryFetcher::new();
        let urls: Vec<String> = (0..12).map(|i| format!("u{}", i)).collect();
        for url in &urls {
            fetcher = fetcher.image(url, 4, [1, 2, 3, 255], MS * 20);
        }
        let fetcher = Arc::new(fetcher);
        let collector = FanOutCollector::new(fetcher.clone()).with_concurrency(3);

        let list: Vec<_> = urls.iter().map(|u| ImageSource::new(u.as_str())).collect();
        let tiles = collector.collect(&list, &flat_policy(4)).unwrap();

        assert_eq!(tiles.len(), 12);
        assert_eq!(fetcher.calls(), 12);
        assert!(fetcher.max_in_flight() <= 3, "saw {}", fetcher.max_in_flight());
        assert!(fetcher.max_in_flight() >= 1);
    }

    #[test]
    fn test_fail_fast_on_fetch_error() {
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .image("a", 8, [9, 9, 9, 255], MS * 30)
                .failure(
                    "b",
                    FetchError::Timeout {
                        url: "b".to_string(),
                    },
                    MS * 5,
                )
                .image("c", 8, [9, 9, 9, 255], MS * 30),
        );
        let collector = FanOutCollector::new(fetcher).with_concurrency(3);

        let error = collector
            .collect(&sources(&["a", "b", "c"]), &flat_policy(8))
            .unwrap_err();

        assert_eq!(error.index(), Some(1));
        assert!(error.is_network());
        assert!(matches!(
            error,
            CollectError::Item {
                source: ItemError::Fetch(FetchError::Timeout { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_decode_failure_aborts() {
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .image("a", 8, [9, 9, 9, 255], MS * 0)
                .bytes("b", b"definitely not an image"),
        );
        let collector = FanOutCollector::new(fetcher).with_concurrency(2);

        let error = collector
            .collect(&sources(&["a", "b"]), &flat_policy(8))
            .unwrap_err();
        assert!(matches!(
            error,
            CollectError::Item {
                index: 1,
                source: ItemError::Decode(DecodeError::UnsupportedFormat { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_unstarted_pipelines_are_skipped_after_failure() {
        let mut fetcher = MemoryFetcher::new();
        for url in ["a", "b", "c", "d"] {
            fetcher = fetcher.failure(
                url,
                FetchError::HttpStatus {
                    url: url.to_string(),
                    code: 500,
                },
                MS * 0,
            );
        }
        let fetcher = Arc::new(fetcher);
        let collector = FanOutCollector::new(fetcher.clone()).with_concurrency(1);

        let result = collector.collect_with_stats(&sources(&["a", "b", "c", "d"]), &flat_policy(8));
        assert!(matches!(result, Err(CollectError::Item { .. })));
        // A single worker runs one pipeline at a time, so only the first one fetched.
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_tiles_are_resized_and_masked() {
        let fetcher = Arc::new(MemoryFetcher::new().image("a", 40, [50, 60, 70, 255], MS * 0));
        let collector = FanOutCollector::new(fetcher);
        let policy = LayoutPolicy {
            tile_size: 16,
            corner_style: CornerStyle::Circular,
            ..LayoutPolicy::default()
        };

        let tiles = collector.collect(&sources(&["a"]), &policy).unwrap();
        assert_eq!(tiles[0].dimensions(), (16, 16));
        assert_eq!(tiles[0].get_pixel(0, 0)[3], 0);
        assert_eq!(tiles[0].get_pixel(8, 8)[3], 255);
    }

    #[test]
    fn test_empty_input() {
        let fetcher = Arc::new(MemoryFetcher::new());
        let collector = FanOutCollector::new(fetcher.clone());

        let (tiles, stats) = collector.collect_with_stats(&[], &flat_policy(8)).unwrap();
        assert!(tiles.is_empty());
        assert_eq!(stats.completed, 0);
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let fetcher = Arc::new(MemoryFetcher::new());
        assert_eq!(FanOutCollector::new(fetcher).with_concurrency(0).concurrency(), 1);
    }
}
