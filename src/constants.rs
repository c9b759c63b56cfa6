//! Centralized constants for the trail-climate crate
//!
//! Values shared across modules live here so the model, fetcher and
//! config defaults agree.

/// External API endpoints
pub mod api {
    /// FCC Census Area API (reverse geocoding to county FIPS)
    pub const REGION_URL: &str = "https://geo.fcc.gov/api/census/area";

    /// NOAA Climate Data Online v2 data endpoint
    pub const OBSERVATIONS_URL: &str = "https://www.ncei.noaa.gov/cdo-web/api/v2/data";

    /// Abstract IP geolocation API
    pub const IP_LOCATION_URL: &str = "https://ipgeolocation.abstractapi.com/v1/";

    /// User-Agent sent with every upstream request
    pub const USER_AGENT: &str = concat!("trail-climate/", env!("CARGO_PKG_VERSION"));
}

/// Fallback locality (Coopers Rock / Morgantown, WV)
pub mod fallback {
    pub const LATITUDE: f64 = 39.65633506508309;
    pub const LONGITUDE: f64 = -79.80989610567241;

    /// Monongalia County, WV
    pub const REGION_CODE: &str = "FIPS:54061";

    /// Morgantown, WV
    pub const POSTAL_CODE: &str = "26505";
}

/// Observation query constants
pub mod observations {
    /// Requested data types: max temp, min temp, precipitation, average wind
    pub const DATA_TYPES: [&str; 4] = ["TMAX", "TMIN", "PRCP", "AWND"];

    /// Inches to millimetres
    pub const PRECIPITATION_SCALE: f64 = 25.4;

    /// Unit system requested from the observations service
    pub const UNITS: &str = "standard";
}

/// Cache lifetimes in seconds
pub mod cache {
    /// Region boundaries are static
    pub const REGION_TTL_SECS: u64 = 365 * 24 * 3600;

    /// Per-trail observation summaries
    pub const OBSERVATION_TTL_SECS: u64 = 3600;

    /// Whole-process climate-by-zip fallback
    pub const ZIP_TTL_SECS: u64 = 600;

    /// Entries per store before sweeping
    pub const MAX_ENTRIES: usize = 10_000;
}
