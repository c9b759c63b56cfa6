//! IP-based geolocation
//!
//! Uses the Abstract IP geolocation API to find the caller's postal code
//! when no trail geometry is available at all. Falls back to the
//! configured postal code on any failure. Reported coordinates are ignored:
//! the postal code alone selects the region and the cache entry.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::net::build_client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Result of an IP lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpLocation {
    pub postal_code: String,
}

/// Abstract API response
#[derive(Debug, Deserialize)]
struct AbstractIpResponse {
    postal_code: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

/// IP location service
#[derive(Debug)]
pub struct IpLocator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_postal_code: String,
}

impl IpLocator {
    /// Create an IP locator from configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_client(config.fetch.lookup_timeout())?,
            base_url: config.services.ip_location_url.clone(),
            api_key: config.api_keys.ip_geolocation.clone(),
            default_postal_code: config.location.postal_code.clone(),
        })
    }

    /// Current location, or the default postal code if the lookup fails
    pub async fn locate(&self) -> IpLocation {
        match self.fetch_location().await {
            Ok(location) => location,
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = self.default_postal_code.as_str(),
                    "IP location failed, using default postal code"
                );
                IpLocation {
                    postal_code: self.default_postal_code.clone(),
                }
            }
        }
    }

    /// Fetch location from the IP geolocation service
    async fn fetch_location(&self) -> Result<IpLocation> {
        let url = format!(
            "{}?api_key={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("IP location request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "IP location API returned status: {}",
                response.status()
            )));
        }

        let data: AbstractIpResponse = response
            .json()
            .await
            .map_err(|e| Error::Decode(format!("Failed to parse IP location response: {}", e)))?;

        parse_location(data)
    }
}

fn parse_location(data: AbstractIpResponse) -> Result<IpLocation> {
    let postal_code = data
        .postal_code
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| Error::Decode("No postal code in response".to_string()))?;

    debug!(
        postal_code = postal_code.as_str(),
        city = data.city.as_deref().unwrap_or("?"),
        "located by IP"
    );

    Ok(IpLocation { postal_code })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        let data: AbstractIpResponse = serde_json::from_str(
            r#"{"ip_address": "1.2.3.4", "city": "Morgantown", "postal_code": "26505", "latitude": 39.63, "longitude": -79.95}"#,
        )
        .unwrap();
        let location = parse_location(data).unwrap();

        assert_eq!(location.postal_code, "26505");
    }

    #[test]
    fn test_parse_location_without_postal_code() {
        let data: AbstractIpResponse =
            serde_json::from_str(r#"{"postal_code": null, "latitude": 1.0, "longitude": 2.0}"#)
                .unwrap();
        assert!(parse_location(data).is_err());
    }

    #[test]
    fn test_parse_location_trims_postal_code() {
        let data: AbstractIpResponse = serde_json::from_str(r#"{"postal_code": " 10001 "}"#).unwrap();
        assert_eq!(parse_location(data).unwrap().postal_code, "10001");

        let data: AbstractIpResponse = serde_json::from_str(r#"{"postal_code": "  "}"#).unwrap();
        assert!(parse_location(data).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_service_uses_default() {
        let mut config = Config::default();
        config.services.ip_location_url = "http://127.0.0.1:1/v1/".to_string();
        config.fetch.lookup_timeout_ms = 500;
        let locator = IpLocator::new(&config).unwrap();

        let location = locator.locate().await;
        assert_eq!(location.postal_code, "26505");
    }
}
