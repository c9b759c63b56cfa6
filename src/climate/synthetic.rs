//! Deterministic synthetic climate model
//!
//! Produces a plausible summary from a point, a date and an entity id
//! without touching the network. The same inputs always give the same
//! output: noise comes from a sine hash of a seed built from the entity,
//! the day of year and the location, never from a time-seeded RNG.
//!
//! The model is a coarse proxy, not climatology:
//! - base temperature falls off with distance from a reference meridian
//! - a cosine seasonal term peaks in July
//! - precipitation is a sine base plus noise, boosted June through September
//! - humidity is a linear blend of precipitation and temperature
//! - wind has a winter-biased base plus noise

use crate::climate::{month_name, round2, ClimateStatus, ClimateSummary, Temperature};
use crate::geo::GeoPoint;
use chrono::{Datelike, NaiveDate};
use std::f64::consts::PI;

/// Longitude the temperature gradient is measured from
const REFERENCE_MERIDIAN: f64 = -80.0;

/// Base temperature at the reference meridian, in Celsius
const BASE_TEMPERATURE_C: f64 = 16.0;

/// Degrees of longitude over which the base temperature halves
const GRADIENT_SCALE: f64 = 40.0;

/// Seasonal swing amplitude, in Celsius
const SEASONAL_AMPLITUDE_C: f64 = 10.0;

/// Month (0-indexed) at which the seasonal term peaks
const SEASONAL_PEAK_MONTH: f64 = 6.0;

/// Summer precipitation boost, months 5..=8 (0-indexed)
const SUMMER_MONTHS: std::ops::RangeInclusive<u32> = 5..=8;
const SUMMER_BOOST: f64 = 1.3;

/// Build a synthetic summary for `point` on `date`
///
/// The returned status is `SyntheticNoData`; callers retag it when the
/// fallback had a different cause. The trail name is left empty.
pub fn synthesize(point: GeoPoint, date: NaiveDate, entity_id: &str) -> ClimateSummary {
    let seed = seed(point, date, entity_id);
    let month = date.month0();
    let angle = 2.0 * PI * month as f64 / 12.0;

    let offset = (point.longitude - REFERENCE_MERIDIAN).abs();
    let base_c = BASE_TEMPERATURE_C / (1.0 + offset / GRADIENT_SCALE);
    let seasonal_c =
        SEASONAL_AMPLITUDE_C * (2.0 * PI * (month as f64 - SEASONAL_PEAK_MONTH) / 12.0).cos();
    let average_c = base_c + seasonal_c + (noise(seed, 1.0) - 0.5) * 4.0;
    let spread_c = 3.0 + noise(seed, 2.0) * 4.0;

    let temperature = Temperature {
        average: celsius_to_fahrenheit(average_c),
        min: celsius_to_fahrenheit(average_c - spread_c),
        max: celsius_to_fahrenheit(average_c + spread_c),
    }
    .normalized();

    let mut precipitation = 2.5 + 1.5 * angle.sin() + noise(seed, 3.0) * 2.0;
    if SUMMER_MONTHS.contains(&month) {
        precipitation *= SUMMER_BOOST;
    }

    let humidity = (45.0 + precipitation * 4.0 + temperature.average * 0.15).clamp(0.0, 100.0);
    let wind_speed = 6.0 + 3.0 * angle.cos() + noise(seed, 4.0) * 4.0;

    ClimateSummary {
        precipitation: round2(precipitation),
        temperature,
        humidity: Some(round2(humidity)),
        wind_speed: round2(wind_speed),
        source_month: month_name(date),
        status: ClimateStatus::SyntheticNoData,
        trail_name: String::new(),
    }
}

/// Absolute Celsius magnitude converted to Fahrenheit
fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius.abs() * 9.0 / 5.0 + 32.0
}

/// Numeric seed from entity, day of year and location
fn seed(point: GeoPoint, date: NaiveDate, entity_id: &str) -> f64 {
    let entity = (fnv1a(entity_id) % 10_000) as f64;
    let day = date.ordinal() as f64;
    let location = (point.latitude.abs() * 100.0 + point.longitude.abs() * 10.0).round();
    entity + day * 31.0 + location
}

/// Pseudo-random value in [0, 1) from a seed and a per-field salt
fn noise(seed: f64, salt: f64) -> f64 {
    let x = (seed + salt * 7.13).sin() * 10_000.0;
    x - x.floor()
}

/// 64-bit FNV-1a, stable across platforms and releases
fn fnv1a(input: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    input
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}
