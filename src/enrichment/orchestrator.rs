use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::settle::{settle, Settled};
use crate::playlist::{CatalogMatch, EnrichedTrack, TrackDescriptor, VideoMatch};
use crate::server::metrics::record_lookup;
use crate::upstream::{CatalogLookup, LookupError, VideoLookup};

/// Which upstreams an enrichment pass should query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sources {
    All,
    CatalogOnly,
}

/// Per-branch outcomes for a single track.
#[derive(Debug, Clone)]
pub struct TrackLookup {
    pub catalog: Settled<CatalogMatch>,
    pub video: Settled<VideoMatch>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentReport {
    pub tracks: Vec<EnrichedTrack>,
    pub catalog_matches: usize,
    pub video_matches: usize,
    pub catalog_failures: usize,
    pub video_failures: usize,
}

/// Fans each track out to both upstreams and merges the results.
///
/// Tracks run concurrently in a bounded window and come back in input order.
/// Upstream failures turn into absent attachments; they are logged and counted
/// but never fail the batch.
pub struct Enricher {
    catalog: Arc<dyn CatalogLookup>,
    video: Arc<dyn VideoLookup>,
    timeout: Duration,
    max_concurrent: usize,
}

impl Enricher {
    pub fn new(
        catalog: Arc<dyn CatalogLookup>,
        video: Arc<dyn VideoLookup>,
        timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            catalog,
            video,
            timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub async fn enrich(&self, tracks: Vec<TrackDescriptor>, sources: Sources) -> EnrichmentReport {
        let total = tracks.len();
        let started = Instant::now();

        let looked_up: Vec<(TrackDescriptor, TrackLookup)> = stream::iter(tracks)
            .map(|descriptor| async move {
                let lookup = self.lookup(&descriptor, sources).await;
                (descriptor, lookup)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut report = EnrichmentReport {
            tracks: Vec::with_capacity(total),
            catalog_matches: 0,
            video_matches: 0,
            catalog_failures: 0,
            video_failures: 0,
        };

        for (descriptor, lookup) in looked_up {
            if let Some(reason) = lookup.catalog.failure() {
                warn!(
                    "CatalogLookupFailed for \"{}\" by {}: {}",
                    descriptor.title, descriptor.artist, reason
                );
                report.catalog_failures += 1;
            }
            if let Some(reason) = lookup.video.failure() {
                warn!(
                    "VideoLookupFailed for \"{}\" by {}: {}",
                    descriptor.title, descriptor.artist, reason
                );
                report.video_failures += 1;
            }
            report.catalog_matches += lookup.catalog.is_matched() as usize;
            report.video_matches += lookup.video.is_matched() as usize;

            report.tracks.push(EnrichedTrack {
                descriptor,
                catalog_match: lookup.catalog.into_option(),
                video_match: lookup.video.into_option(),
            });
        }

        if total > 0 && report.catalog_failures == total {
            warn!(
                "All {} {} lookups failed, the upstream looks unavailable",
                total,
                self.catalog.name()
            );
        }
        if sources == Sources::All && total > 0 && report.video_failures == total {
            warn!(
                "All {} {} lookups failed, the upstream looks unavailable",
                total,
                self.video.name()
            );
        }

        info!(
            "Enriched {} tracks in {}ms: {} catalog matches, {} video matches",
            total,
            started.elapsed().as_millis(),
            report.catalog_matches,
            report.video_matches
        );
        report
    }

    /// Runs both lookups for one track concurrently.
    pub async fn lookup(&self, descriptor: &TrackDescriptor, sources: Sources) -> TrackLookup {
        match sources {
            Sources::All => {
                let (catalog, video) = tokio::join!(
                    self.lookup_catalog(descriptor),
                    self.lookup_video(descriptor)
                );
                TrackLookup { catalog, video }
            }
            Sources::CatalogOnly => TrackLookup {
                catalog: self.lookup_catalog(descriptor).await,
                video: Settled::Absent,
            },
        }
    }

    async fn lookup_catalog(&self, descriptor: &TrackDescriptor) -> Settled<CatalogMatch> {
        let lookup = self
            .catalog
            .search_track(&descriptor.title, &descriptor.artist);
        self.timed(self.catalog.name(), lookup).await
    }

    async fn lookup_video(&self, descriptor: &TrackDescriptor) -> Settled<VideoMatch> {
        let query = descriptor.plain_query();
        let lookup = async {
            let videos = self.video.search_videos(&query, 1).await?;
            Ok::<_, LookupError>(videos.into_iter().next())
        };
        self.timed(self.video.name(), lookup).await
    }

    async fn timed<T, F>(&self, upstream: &str, lookup: F) -> Settled<T>
    where
        F: Future<Output = Result<Option<T>, LookupError>>,
    {
        let started = Instant::now();
        let settled = settle(lookup, self.timeout).await;
        record_lookup(upstream, settled.outcome_label(), started.elapsed());
        settled
    }

    /// Trending music videos, bounded by the same timeout as lookups.
    pub async fn trending_videos(&self, limit: u32) -> Result<Vec<VideoMatch>, LookupError> {
        match tokio::time::timeout(self.timeout, self.video.trending(limit)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout),
        }
    }
}
