//! Reverse geocoding to administrative region codes
//!
//! Uses the FCC Census Area API to map a point to its county FIPS code.
//! Lookups are cached for a very long time since region boundaries do not
//! move. Any failure yields the configured default region instead of an
//! error; the observations fetcher absorbs the degradation.

use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use crate::net::build_client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Opaque region key used to query observations, e.g. `FIPS:54061`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCode(String);

impl RegionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// County region from a five-digit FIPS code
    pub fn fips(county: &str) -> Self {
        Self(format!("FIPS:{}", county))
    }

    /// Postal-code region
    pub fn zip(postal_code: &str) -> Self {
        Self(format!("ZIP:{}", postal_code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// FCC area API response
#[derive(Debug, Deserialize)]
struct AreaResponse {
    #[serde(default)]
    results: Vec<AreaResult>,
}

#[derive(Debug, Deserialize)]
struct AreaResult {
    county_fips: Option<String>,
    #[serde(default)]
    county_name: Option<String>,
}

/// Resolves points to region codes through a long-lived cache
#[derive(Debug)]
pub struct RegionResolver {
    client: reqwest::Client,
    base_url: String,
    default_region: RegionCode,
    ttl: Duration,
    cache: CacheStore<String, RegionCode>,
}

impl RegionResolver {
    /// Create a resolver from configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_client(config.fetch.lookup_timeout())?,
            base_url: config.services.region_url.clone(),
            default_region: RegionCode::new(config.location.region.clone()),
            ttl: config.cache.region_ttl(),
            cache: CacheStore::new("regions", config.cache.max_entries),
        })
    }

    /// Region for `point`, or the default region if the lookup fails
    pub async fn resolve_region(&self, point: GeoPoint) -> RegionCode {
        let client = self.client.clone();
        let url = self.lookup_url(point);

        let lookup = self
            .cache
            .get_or_fetch(point.cache_key(), self.ttl, move || async move {
                lookup_region(&client, &url).await
            })
            .await;

        match lookup {
            Ok(region) => region,
            Err(e) => {
                warn!(
                    lat = point.latitude,
                    lng = point.longitude,
                    error = %e,
                    fallback = %self.default_region,
                    "region lookup failed, using default region"
                );
                self.default_region.clone()
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn lookup_url(&self, point: GeoPoint) -> String {
        format!(
            "{}?lat={}&lon={}&format=json",
            self.base_url, point.latitude, point.longitude
        )
    }
}

async fn lookup_region(client: &reqwest::Client, url: &str) -> Result<RegionCode> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Upstream(format!("Region request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::Upstream(format!(
            "Region service returned status: {}",
            response.status()
        )));
    }

    let body: AreaResponse = response
        .json()
        .await
        .map_err(|e| Error::Decode(format!("Failed to parse region response: {}", e)))?;

    parse_region(body)
}

fn parse_region(body: AreaResponse) -> Result<RegionCode> {
    let area = body
        .results
        .into_iter()
        .find(|area| area.county_fips.as_deref().is_some_and(|f| !f.trim().is_empty()))
        .ok_or_else(|| Error::Decode("Region response has no county".to_string()))?;

    let fips = area.county_fips.unwrap_or_default();
    debug!(
        fips = fips.as_str(),
        county = area.county_name.as_deref().unwrap_or("?"),
        "resolved region"
    );
    Ok(RegionCode::fips(fips.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let body: AreaResponse = serde_json::from_str(
            r#"{"input": {}, "results": [{"block_fips": "540610101001000", "county_fips": "54061", "county_name": "Monongalia County", "state_code": "WV"}]}"#,
        )
        .unwrap();
        assert_eq!(parse_region(body).unwrap(), RegionCode::new("FIPS:54061"));
    }

    #[test]
    fn test_parse_region_missing_county() {
        let body: AreaResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(matches!(parse_region(body), Err(Error::Decode(_))));

        let body: AreaResponse =
            serde_json::from_str(r#"{"results": [{"county_fips": ""}]}"#).unwrap();
        assert!(parse_region(body).is_err());

        let body: AreaResponse = serde_json::from_str("{}").unwrap();
        assert!(parse_region(body).is_err());
    }

    #[test]
    fn test_region_code_constructors() {
        assert_eq!(RegionCode::fips("54061").as_str(), "FIPS:54061");
        assert_eq!(RegionCode::zip("26505").to_string(), "ZIP:26505");
        assert_eq!(serde_json::to_string(&RegionCode::zip("1")).unwrap(), "\"ZIP:1\"");
    }

    #[tokio::test]
    async fn test_unreachable_service_uses_default() {
        let mut config = Config::default();
        config.services.region_url = "http://127.0.0.1:1/area".to_string();
        config.fetch.lookup_timeout_ms = 500;
        let resolver = RegionResolver::new(&config).unwrap();

        let region = resolver.resolve_region(GeoPoint::new(39.64, -79.95)).await;
        assert_eq!(region, RegionCode::new("FIPS:54061"));
        // Fallbacks are not cached
        assert_eq!(resolver.cache_stats().entries, 0);
    }
}
