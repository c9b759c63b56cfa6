//! Trail geometry and location lookups
//!
//! Provides the representative-point extraction for trail geometries,
//! reverse geocoding to region codes, and IP geolocation.

pub mod ip_location;
pub mod region;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use ip_location::{IpLocation, IpLocator};
pub use region::{RegionCode, RegionResolver};

/// A geographic point in (latitude, longitude) order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Validate that the point is within valid ranges
    ///
    /// Latitude: -90 to 90
    /// Longitude: -180 to 180
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidGeometry(format!(
                "Latitude {} is out of range [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidGeometry(format!(
                "Longitude {} is out of range [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }

    /// Exact cache key for this point
    pub fn cache_key(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// A position as stored in GeoJSON: (longitude, latitude)
pub type Position = [f64; 2];

/// Supported trail geometries
#[derive(Debug, Clone, PartialEq)]
pub enum TrailGeometry {
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

impl TrailGeometry {
    /// Parse a GeoJSON geometry object
    pub fn from_value(value: &Value) -> Result<Self> {
        let raw = RawGeometry::deserialize(value)
            .map_err(|e| Error::InvalidGeometry(format!("Malformed geometry: {}", e)))?;

        match raw.kind.as_str() {
            "LineString" => {
                let line: Vec<Vec<f64>> = serde_json::from_value(raw.coordinates)
                    .map_err(|e| Error::InvalidGeometry(format!("Malformed LineString: {}", e)))?;
                Ok(Self::LineString(to_positions(line)?))
            }
            "MultiLineString" => {
                let lines: Vec<Vec<Vec<f64>>> = serde_json::from_value(raw.coordinates)
                    .map_err(|e| {
                        Error::InvalidGeometry(format!("Malformed MultiLineString: {}", e))
                    })?;
                let lines = lines
                    .into_iter()
                    .map(to_positions)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::MultiLineString(lines))
            }
            other => Err(Error::InvalidGeometry(format!(
                "Unsupported geometry type: {}",
                other
            ))),
        }
    }

    /// The midpoint of the first (or only) line
    pub fn representative_point(&self) -> Result<GeoPoint> {
        let line = match self {
            Self::LineString(line) => line,
            Self::MultiLineString(lines) => lines.first().ok_or_else(|| {
                Error::InvalidGeometry("MultiLineString has no lines".to_string())
            })?,
        };

        if line.is_empty() {
            return Err(Error::InvalidGeometry("Line has no coordinates".to_string()));
        }

        let [lng, lat] = line[line.len() / 2];
        let point = GeoPoint::new(lat, lng);
        point.validate()?;
        Ok(point)
    }
}

/// Drop elevation and any further members, keeping (lng, lat)
fn to_positions(line: Vec<Vec<f64>>) -> Result<Vec<Position>> {
    line.into_iter()
        .map(|pair| match pair.as_slice() {
            [lng, lat, ..] => Ok([*lng, *lat]),
            _ => Err(Error::InvalidGeometry(format!(
                "Position needs at least two members, got {}",
                pair.len()
            ))),
        })
        .collect()
}

/// Pick a single representative point for a trail geometry
///
/// Returns `InvalidGeometry` for absent, unsupported or empty geometries;
/// callers fall back to their default location.
pub fn extract_representative_point(geometry: Option<&Value>) -> Result<GeoPoint> {
    let value = geometry
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::InvalidGeometry("Feature has no geometry".to_string()))?;

    TrailGeometry::from_value(value)?.representative_point()
}

/// Properties attached to a trail feature
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailProperties {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "trailName", default, skip_serializing_if = "Option::is_none")]
    pub trail_name: Option<String>,

    /// Numeric or string identifier
    #[serde(rename = "trail_id", default, skip_serializing_if = "Option::is_none")]
    pub trail_id: Option<Value>,
}

/// A GeoJSON-like trail feature
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailFeature {
    #[serde(default)]
    pub geometry: Option<Value>,

    #[serde(default)]
    pub properties: Option<TrailProperties>,
}

impl TrailFeature {
    /// Display name from `Name`, then `trailName`
    pub fn display_name(&self) -> Option<&str> {
        let props = self.properties.as_ref()?;
        [props.name.as_deref(), props.trail_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }

    /// Stable trail identifier, if the feature carries one
    pub fn trail_id(&self) -> Option<String> {
        match self.properties.as_ref()?.trail_id.as_ref()? {
            Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// A GeoJSON FeatureCollection of trails
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailCollection {
    #[serde(default)]
    pub features: Vec<TrailFeature>,
}

/// Either a single feature or a collection
#[derive(Debug, Clone)]
pub enum TrailDocument {
    Feature(TrailFeature),
    Collection(TrailCollection),
}

impl TrailDocument {
    /// Parse a JSON document, treating anything with `features` as a collection
    pub fn from_json(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)?;
        if value.get("features").is_some() {
            Ok(Self::Collection(serde_json::from_value(value)?))
        } else {
            Ok(Self::Feature(serde_json::from_value(value)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_line_string_midpoint() {
        let geometry = json!({
            "type": "LineString",
            "coordinates": [[-79.96, 39.63], [-79.95, 39.64], [-79.94, 39.65]]
        });
        let point = extract_representative_point(Some(&geometry)).unwrap();
        assert_eq!(point, GeoPoint::new(39.64, -79.95));
    }

    #[test]
    fn test_even_length_uses_upper_midpoint() {
        let geometry = json!({
            "type": "LineString",
            "coordinates": [[-79.96, 39.63], [-79.95, 39.64]]
        });
        let point = extract_representative_point(Some(&geometry)).unwrap();
        assert_eq!(point, GeoPoint::new(39.64, -79.95));
    }

    #[test]
    fn test_single_coordinate() {
        let geometry = json!({"type": "LineString", "coordinates": [[-80.1, 38.9]]});
        let point = extract_representative_point(Some(&geometry)).unwrap();
        assert_eq!(point, GeoPoint::new(38.9, -80.1));
    }

    #[test]
    fn test_multi_line_string_uses_first_line() {
        let geometry = json!({
            "type": "MultiLineString",
            "coordinates": [
                [[-79.0, 39.0], [-79.1, 39.1], [-79.2, 39.2], [-79.3, 39.3]],
                [[-90.0, 45.0]]
            ]
        });
        let point = extract_representative_point(Some(&geometry)).unwrap();
        assert_eq!(point, GeoPoint::new(39.2, -79.2));
    }

    #[test]
    fn test_elevation_is_ignored() {
        let geometry = json!({
            "type": "LineString",
            "coordinates": [[-79.96, 39.63, 512.0]]
        });
        let point = extract_representative_point(Some(&geometry)).unwrap();
        assert_eq!(point, GeoPoint::new(39.63, -79.96));
    }

    #[test]
    fn test_invalid_geometries() {
        let cases = [
            json!(null),
            json!({"type": "Polygon", "coordinates": [[[0.0, 0.0]]]}),
            json!({"type": "LineString", "coordinates": []}),
            json!({"type": "MultiLineString", "coordinates": []}),
            json!({"type": "MultiLineString", "coordinates": [[]]}),
            json!({"type": "LineString", "coordinates": [[1.0]]}),
            json!({"type": "LineString", "coordinates": "nope"}),
            json!({"coordinates": [[1.0, 2.0]]}),
            json!({"type": "LineString", "coordinates": [[12.0, 95.0]]}),
        ];

        for geometry in &cases {
            let result = extract_representative_point(Some(geometry));
            assert!(
                matches!(result, Err(Error::InvalidGeometry(_))),
                "expected InvalidGeometry for {}",
                geometry
            );
        }

        assert!(matches!(
            extract_representative_point(None),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_feature_names_and_ids() {
        let feature: TrailFeature = serde_json::from_value(json!({
            "geometry": null,
            "properties": {"Name": "  ", "trailName": "Raven Rock", "trail_id": 42}
        }))
        .unwrap();
        assert_eq!(feature.display_name(), Some("Raven Rock"));
        assert_eq!(feature.trail_id(), Some("42".to_string()));

        let feature: TrailFeature = serde_json::from_value(json!({
            "properties": {"Name": "Rhododendron", "trail_id": "cr-7"}
        }))
        .unwrap();
        assert_eq!(feature.display_name(), Some("Rhododendron"));
        assert_eq!(feature.trail_id(), Some("cr-7".to_string()));

        let feature: TrailFeature = serde_json::from_value(json!({"properties": null})).unwrap();
        assert_eq!(feature.display_name(), None);
        assert_eq!(feature.trail_id(), None);
    }

    #[test]
    fn test_document_detection() {
        let doc = TrailDocument::from_json(r#"{"type": "FeatureCollection", "features": [{}, {}]}"#)
            .unwrap();
        assert!(matches!(doc, TrailDocument::Collection(c) if c.features.len() == 2));

        let doc = TrailDocument::from_json(r#"{"type": "Feature", "properties": {"Name": "A"}}"#)
            .unwrap();
        assert!(matches!(doc, TrailDocument::Feature(f) if f.display_name() == Some("A")));

        assert!(TrailDocument::from_json("not json").is_err());
    }
}
