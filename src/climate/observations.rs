//! Historical observations fetcher
//!
//! Queries the NOAA Climate Data Online `data` endpoint for a region over a
//! rolling window that ends a few days before today (observations are
//! published late), aggregates the results and fills any missing field from
//! the synthetic model.

use crate::cache::{CacheStats, CacheStore};
use crate::climate::{
    month_name, round2, synthesize, ClimateStatus, ClimateSummary, Clock, Temperature,
};
use crate::config::Config;
use crate::constants::observations::{DATA_TYPES, PRECIPITATION_SCALE, UNITS};
use crate::error::{Error, Result};
use crate::geo::{GeoPoint, RegionCode};
use crate::net::{build_client, InflightRequests};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One observation as returned by the service
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Observation {
    pub datatype: String,
    pub value: f64,
    #[serde(default)]
    pub date: String,
}

impl Observation {
    pub fn new(datatype: &str, value: f64, date: &str) -> Self {
        Self {
            datatype: datatype.to_string(),
            value,
            date: date.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ObservationResponse {
    #[serde(default)]
    results: Vec<Observation>,
}

/// Inclusive date range of an observations query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ObservationWindow {
    /// Window of `span_days` days ending `lag_days` before `today`
    pub fn ending_before(today: NaiveDate, lag_days: u32, span_days: u32) -> Self {
        let end = today
            .checked_sub_days(Days::new(lag_days as u64))
            .unwrap_or(today);
        let start = end
            .checked_sub_days(Days::new(span_days.saturating_sub(1) as u64))
            .unwrap_or(end);
        Self { start, end }
    }
}

/// Running totals over a set of observations
///
/// Average temperature is the mean over every TMAX and TMIN value pooled
/// together; min and max run over the same pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationAggregate {
    pub temperature_total: f64,
    pub temperature_count: usize,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub precipitation_total: f64,
    pub precipitation_count: usize,
    pub wind_total: f64,
    pub wind_count: usize,
}

impl ObservationAggregate {
    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut aggregate = Self::default();
        for observation in observations {
            aggregate.add(observation);
        }
        aggregate
    }

    pub fn add(&mut self, observation: &Observation) {
        let value = observation.value;
        match observation.datatype.as_str() {
            "TMAX" | "TMIN" => {
                self.temperature_total += value;
                self.temperature_count += 1;
                self.temperature_min = Some(self.temperature_min.map_or(value, |m| m.min(value)));
                self.temperature_max = Some(self.temperature_max.map_or(value, |m| m.max(value)));
            }
            "PRCP" => {
                self.precipitation_total += value;
                self.precipitation_count += 1;
            }
            "AWND" => {
                self.wind_total += value;
                self.wind_count += 1;
            }
            other => debug!(datatype = other, "ignoring unrequested datatype"),
        }
    }

    /// Normalized temperature range, if any temperature was observed
    pub fn temperature(&self) -> Option<Temperature> {
        if self.temperature_count == 0 {
            return None;
        }
        Some(
            Temperature {
                average: self.temperature_total / self.temperature_count as f64,
                min: self.temperature_min?,
                max: self.temperature_max?,
            }
            .normalized(),
        )
    }

    /// Mean daily precipitation in millimetres
    pub fn precipitation(&self) -> Option<f64> {
        (self.precipitation_count > 0).then(|| {
            round2(self.precipitation_total / self.precipitation_count as f64 * PRECIPITATION_SCALE)
        })
    }

    /// Mean wind speed in mph
    pub fn wind_speed(&self) -> Option<f64> {
        (self.wind_count > 0).then(|| round2(self.wind_total / self.wind_count as f64))
    }

    pub fn is_empty(&self) -> bool {
        self.temperature_count == 0 && self.precipitation_count == 0 && self.wind_count == 0
    }

    /// Build a summary, taking each missing field from `synthetic`
    ///
    /// Returns `synthetic` unchanged when nothing usable was observed.
    pub fn compose(&self, synthetic: ClimateSummary, source_month: String) -> ClimateSummary {
        if self.is_empty() {
            return synthetic;
        }

        ClimateSummary {
            precipitation: self.precipitation().unwrap_or(synthetic.precipitation),
            temperature: self.temperature().unwrap_or(synthetic.temperature),
            humidity: None,
            wind_speed: self.wind_speed().unwrap_or(synthetic.wind_speed),
            source_month,
            status: ClimateStatus::Live,
            trail_name: synthetic.trail_name,
        }
    }
}

/// Cache key for one raw observations query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObservationQuery {
    region: RegionCode,
    window: ObservationWindow,
}

struct FetcherInner {
    client: reqwest::Client,
    base_url: String,
    token: String,
    dataset: String,
    result_limit: u32,
    lag_days: u32,
    window_days: u32,
    timeout: Duration,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    results: CacheStore<ObservationQuery, Vec<Observation>>,
    inflight: Arc<InflightRequests>,
}

/// Fetches and aggregates observations, falling back to the synthetic model
#[derive(Clone)]
pub struct ObservationFetcher {
    inner: Arc<FetcherInner>,
}

impl std::fmt::Debug for ObservationFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationFetcher")
            .field("base_url", &self.inner.base_url)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl ObservationFetcher {
    /// Create a fetcher from configuration
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let timeout = config.fetch.timeout();

        // The deadline is enforced per request below; the client timeout
        // only guards against a hung connection outliving it.
        let client = build_client(timeout.saturating_add(Duration::from_secs(1)))?;

        Ok(Self {
            inner: Arc::new(FetcherInner {
                client,
                base_url: config.services.observations_url.clone(),
                token: config.api_keys.noaa.clone(),
                dataset: config.fetch.dataset.clone(),
                result_limit: config.fetch.result_limit,
                lag_days: config.fetch.lag_days,
                window_days: config.fetch.window_days.max(1),
                timeout,
                ttl: config.cache.observation_ttl(),
                clock,
                results: CacheStore::new("observations", config.cache.max_entries),
                inflight: Arc::new(InflightRequests::new()),
            }),
        })
    }

    /// Window that a query issued today would cover
    pub fn current_window(&self) -> ObservationWindow {
        ObservationWindow::ending_before(
            self.inner.clock.today(),
            self.inner.lag_days,
            self.inner.window_days,
        )
    }

    /// Produce a summary for `region`, never failing
    ///
    /// Timeouts, unreachable services and empty responses yield a synthetic
    /// summary tagged with the cause. Partial responses are completed field
    /// by field from the synthetic model.
    pub async fn fetch_observations(
        &self,
        region: &RegionCode,
        point: GeoPoint,
        entity_id: &str,
    ) -> ClimateSummary {
        let today = self.inner.clock.today();
        let window = self.current_window();
        let synthetic = synthesize(point, today, entity_id);

        match self.fetch_results(region, window).await {
            Ok(results) if results.is_empty() => {
                info!(%region, "no observations in window, using synthetic data");
                synthetic.with_status(ClimateStatus::SyntheticNoData)
            }
            Ok(results) => {
                let aggregate = ObservationAggregate::from_observations(&results);
                if aggregate.is_empty() {
                    info!(%region, "no usable observations, using synthetic data");
                    return synthetic.with_status(ClimateStatus::SyntheticNoData);
                }
                debug!(
                    %region,
                    temperature = aggregate.temperature_count,
                    precipitation = aggregate.precipitation_count,
                    wind = aggregate.wind_count,
                    "aggregated observations"
                );
                aggregate.compose(synthetic, month_name(window.end))
            }
            Err(e) => {
                let status = match e.root() {
                    Error::Timeout(_) => ClimateStatus::SyntheticTimeout,
                    Error::Decode(_) | Error::Cancelled(_) => ClimateStatus::SyntheticError,
                    _ => ClimateStatus::SyntheticNoData,
                };
                warn!(%region, error = %e, %status, "observations unavailable");
                synthetic.with_status(status)
            }
        }
    }

    /// Raw results for a region and window, shared between concurrent callers
    async fn fetch_results(
        &self,
        region: &RegionCode,
        window: ObservationWindow,
    ) -> Result<Vec<Observation>> {
        let query = ObservationQuery {
            region: region.clone(),
            window,
        };
        let url = self.inner.query_url(&query);
        let inner = Arc::clone(&self.inner);

        self.inner
            .results
            .get_or_fetch(query, self.inner.ttl, move || async move {
                inner.request(&url).await
            })
            .await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.results.stats()
    }
}

impl FetcherInner {
    fn query_url(&self, query: &ObservationQuery) -> String {
        format!(
            "{}?datasetid={}&locationid={}&datatypeid={}&units={}&startdate={}&enddate={}&limit={}",
            self.base_url,
            urlencoding::encode(&self.dataset),
            urlencoding::encode(query.region.as_str()),
            DATA_TYPES.join(","),
            UNITS,
            query.window.start.format("%Y-%m-%d"),
            query.window.end.format("%Y-%m-%d"),
            self.result_limit,
        )
    }

    /// One GET raced against the deadline
    async fn request(&self, url: &str) -> Result<Vec<Observation>> {
        let guard = self.inflight.begin(url);
        debug!(url, "requesting observations");

        let request = async {
            let response = self
                .client
                .get(url)
                .header("token", &self.token)
                .send()
                .await
                .map_err(|e| Error::Upstream(format!("Observations request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Error::Upstream(format!(
                    "Observations service returned status: {}",
                    response.status()
                )));
            }

            let body: ObservationResponse = response.json().await.map_err(|e| {
                if e.is_decode() {
                    Error::Decode(format!("Failed to parse observations response: {}", e))
                } else {
                    Error::Upstream(format!("Failed to read observations response: {}", e))
                }
            })?;

            Ok(body.results)
        };

        match tokio::time::timeout(self.timeout, guard.run(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn synthetic() -> ClimateSummary {
        synthesize(GeoPoint::new(39.64, -79.95), date(2026, 10, 19), "t")
    }

    #[test]
    fn test_huge_timeout_does_not_overflow() {
        let mut config = Config::default();
        config.fetch.timeout_ms = u64::MAX;
        let clock = Arc::new(crate::climate::FixedClock(date(2026, 10, 19)));

        assert!(ObservationFetcher::new(&config, clock).is_ok());
    }

    #[test]
    fn test_window_ends_before_today() {
        let window = ObservationWindow::ending_before(date(2026, 10, 19), 3, 7);
        assert_eq!(window.end, date(2026, 10, 16));
        assert_eq!(window.start, date(2026, 10, 10));
    }

    #[test]
    fn test_window_crosses_year_boundary() {
        let window = ObservationWindow::ending_before(date(2026, 1, 2), 3, 7);
        assert_eq!(window.end, date(2025, 12, 30));
        assert_eq!(window.start, date(2025, 12, 24));
    }

    #[test]
    fn test_average_pools_max_and_min() {
        let observations = vec![
            Observation::new("TMAX", 70.0, "2026-10-10"),
            Observation::new("TMAX", 80.0, "2026-10-11"),
            Observation::new("TMAX", 75.0, "2026-10-12"),
            Observation::new("TMIN", 40.0, "2026-10-10"),
        ];
        let aggregate = ObservationAggregate::from_observations(&observations);
        let t = aggregate.temperature().unwrap();

        // (70 + 80 + 75 + 40) / 4, not the mean of per-type means (62.5)
        assert_relative_eq!(t.average, 66.25);
        assert_eq!(t.min, 40.0);
        assert_eq!(t.max, 80.0);
    }

    #[test]
    fn test_precipitation_is_scaled() {
        let observations = vec![
            Observation::new("PRCP", 0.1, "2026-10-10"),
            Observation::new("PRCP", 0.3, "2026-10-11"),
        ];
        let aggregate = ObservationAggregate::from_observations(&observations);
        assert_relative_eq!(aggregate.precipitation().unwrap(), 5.08);
    }

    #[test]
    fn test_wind_mean() {
        let observations = vec![
            Observation::new("AWND", 4.0, "2026-10-10"),
            Observation::new("AWND", 7.0, "2026-10-11"),
        ];
        let aggregate = ObservationAggregate::from_observations(&observations);
        assert_relative_eq!(aggregate.wind_speed().unwrap(), 5.5);
    }

    #[test]
    fn test_negative_readings_are_normalized() {
        let observations = vec![
            Observation::new("TMAX", 12.0, "2026-01-10"),
            Observation::new("TMIN", -8.0, "2026-01-10"),
        ];
        let t = ObservationAggregate::from_observations(&observations)
            .temperature()
            .unwrap();
        assert!(t.is_ordered());
        assert!(t.min >= 0.0);
    }

    #[test]
    fn test_compose_full_live() {
        let observations = vec![
            Observation::new("TMAX", 70.0, ""),
            Observation::new("TMIN", 50.0, ""),
            Observation::new("PRCP", 0.2, ""),
            Observation::new("AWND", 5.0, ""),
        ];
        let summary = ObservationAggregate::from_observations(&observations)
            .compose(synthetic(), "October".to_string());

        assert_eq!(summary.status, ClimateStatus::Live);
        assert_relative_eq!(summary.temperature.average, 60.0);
        assert_relative_eq!(summary.precipitation, 5.08);
        assert_relative_eq!(summary.wind_speed, 5.0);
        assert_eq!(summary.humidity, None);
    }

    #[test]
    fn test_compose_partial_fills_from_synthetic() {
        let observations = vec![Observation::new("PRCP", 0.5, "")];
        let fallback = synthetic();
        let summary = ObservationAggregate::from_observations(&observations)
            .compose(fallback.clone(), "October".to_string());

        assert_eq!(summary.status, ClimateStatus::Live);
        assert_relative_eq!(summary.precipitation, 12.7);
        assert_eq!(summary.temperature, fallback.temperature);
        assert!(summary.temperature.average > 0.0);
        assert_eq!(summary.wind_speed, fallback.wind_speed);
    }

    #[test]
    fn test_compose_nothing_usable_returns_synthetic() {
        let observations = vec![Observation::new("SNOW", 3.0, "")];
        let fallback = synthetic();
        let summary = ObservationAggregate::from_observations(&observations)
            .compose(fallback.clone(), "October".to_string());
        assert_eq!(summary, fallback);
    }

    #[test]
    fn test_response_without_results_field() {
        let body: ObservationResponse = serde_json::from_str("{}").unwrap();
        assert!(body.results.is_empty());

        let body: ObservationResponse = serde_json::from_str(
            r#"{"metadata": {}, "results": [{"datatype": "TMAX", "value": 61.0, "date": "2026-10-10T00:00:00", "station": "GHCND:X"}]}"#,
        )
        .unwrap();
        assert_eq!(body.results, vec![Observation::new("TMAX", 61.0, "2026-10-10T00:00:00")]);
    }

    #[test]
    fn test_query_url() {
        let config = Config::default();
        let clock: Arc<dyn Clock> = Arc::new(crate::climate::FixedClock(date(2026, 10, 19)));
        let fetcher = ObservationFetcher::new(&config, clock).unwrap();
        let query = ObservationQuery {
            region: RegionCode::new("FIPS:54061"),
            window: fetcher.current_window(),
        };

        let url = fetcher.inner.query_url(&query);
        assert!(url.contains("locationid=FIPS%3A54061"));
        assert!(url.contains("datatypeid=TMAX,TMIN,PRCP,AWND"));
        assert!(url.contains("startdate=2026-10-10&enddate=2026-10-16"));
        assert!(url.contains("units=standard"));
        assert!(url.contains("limit=1000"));
    }
}
