//! Climate resolver
//!
//! Per call: extract a representative point (or use the default location),
//! resolve its region, fetch observations through the summary cache, then
//! attach the trail's display name. There are no retries; a slow or failed
//! fetch degrades straight to synthetic data. No error escapes `resolve`.

use crate::cache::{CacheStats, CacheStore};
use crate::climate::{
    synthesize, ClimateStatus, ClimateSummary, Clock, ObservationFetcher, SystemClock,
};
use crate::config::Config;
use crate::error::Result;
use crate::geo::{
    extract_representative_point, GeoPoint, IpLocator, RegionCode, RegionResolver, TrailFeature,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name given to a trail whose feature carries none
pub const UNNAMED_TRAIL: &str = "Unnamed Trail";

/// Composes geometry extraction, region lookup and observation fetching
#[derive(Debug)]
pub struct ClimateResolver {
    default_point: GeoPoint,
    regions: RegionResolver,
    observations: ObservationFetcher,
    ip_locator: IpLocator,
    summaries: CacheStore<String, ClimateSummary>,
    summary_ttl: Duration,
    zip_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ClimateResolver {
    /// Create a resolver using the system clock
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a resolver with an explicit clock
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            default_point: config.location.point(),
            regions: RegionResolver::new(config)?,
            observations: ObservationFetcher::new(config, Arc::clone(&clock))?,
            ip_locator: IpLocator::new(config)?,
            summaries: CacheStore::new("summaries", config.cache.max_entries),
            summary_ttl: config.cache.observation_ttl(),
            zip_ttl: config.cache.zip_ttl(),
            clock,
        })
    }

    /// Climate summary for one trail feature
    pub async fn resolve(&self, feature: &TrailFeature) -> ClimateSummary {
        self.resolve_named(feature, UNNAMED_TRAIL).await
    }

    /// Resolve every feature concurrently, preserving input order
    ///
    /// Features without a name are labelled `Trail <n>` by position.
    pub async fn resolve_collection(&self, features: &[TrailFeature]) -> Vec<ClimateSummary> {
        let placeholders: Vec<String> = (1..=features.len())
            .map(|n| format!("Trail {}", n))
            .collect();

        join_all(
            features
                .iter()
                .zip(&placeholders)
                .map(|(feature, placeholder)| self.resolve_named(feature, placeholder)),
        )
        .await
    }

    /// Climate summary for the caller's IP location, used when there is no geometry
    ///
    /// Only the postal code is taken from the lookup; synthetic values are
    /// computed at the default point so one postal code always yields one
    /// summary.
    pub async fn resolve_without_geometry(&self) -> ClimateSummary {
        let location = self.ip_locator.locate().await;
        let region = RegionCode::zip(&location.postal_code);
        let key = format!("zip:{}", location.postal_code);

        info!(%region, "resolving climate without geometry");
        self.fetch_summary(key.clone(), region, self.default_point, key, self.zip_ttl)
            .await
            .with_trail_name(format!("ZIP {}", location.postal_code))
    }

    pub fn cache_stats(&self) -> Vec<CacheStats> {
        vec![
            self.regions.cache_stats(),
            self.observations.cache_stats(),
            self.summaries.stats(),
        ]
    }

    async fn resolve_named(&self, feature: &TrailFeature, placeholder: &str) -> ClimateSummary {
        let trail_name = feature.display_name().unwrap_or(placeholder).to_string();

        let point = match extract_representative_point(feature.geometry.as_ref()) {
            Ok(point) => point,
            Err(e) => {
                debug!(trail = trail_name.as_str(), error = %e, "using default location");
                self.default_point
            }
        };

        let region = self.regions.resolve_region(point).await;

        // Every producer input, including the synthetic seed, is derived from the key
        let (key, entity_id) = match feature.trail_id() {
            Some(id) => (format!("trail:{}", id), id),
            None => {
                let key = format!("{}@{:.4},{:.4}", region, point.latitude, point.longitude);
                (key.clone(), key)
            }
        };

        self.fetch_summary(key, region, point, entity_id, self.summary_ttl)
            .await
            .with_trail_name(trail_name)
    }

    async fn fetch_summary(
        &self,
        key: String,
        region: RegionCode,
        point: GeoPoint,
        entity_id: String,
        ttl: Duration,
    ) -> ClimateSummary {
        let fetcher = self.observations.clone();
        let producer_entity = entity_id.clone();

        let fetched = self
            .summaries
            .get_or_fetch(key.clone(), ttl, move || async move {
                Ok(fetcher
                    .fetch_observations(&region, point, &producer_entity)
                    .await)
            })
            .await;

        match fetched {
            Ok(summary) => summary,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "summary fetch failed");
                synthesize(point, self.clock.today(), &entity_id)
                    .with_status(ClimateStatus::SyntheticError)
            }
        }
    }
}
