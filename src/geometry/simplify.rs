//! Douglas-Peucker simplification of GeoJSON geometry

use super::resolver::GeometryError;
use geo::{Geometry, GeometryCollection, LineString, MultiPolygon, Polygon, Simplify};
use serde_json::Value;

/// Minimum positions in a closed linear ring
const MIN_RING_POSITIONS: usize = 4;

/// Simplify every line and ring of a GeoJSON geometry.
///
/// Rings that would collapse below a valid ring keep their original
/// positions. Points pass through unchanged.
pub fn simplify_geometry(geometry: Value, tolerance: f64) -> Result<Value, GeometryError> {
    let parsed: geojson::Geometry =
        serde_json::from_value(geometry).map_err(|e| GeometryError::Decode(e.to_string()))?;
    let shape =
        Geometry::<f64>::try_from(parsed).map_err(|e| GeometryError::Decode(e.to_string()))?;

    let simplified = simplify_shape(&shape, tolerance);
    let out = geojson::Geometry::new(geojson::Value::from(&simplified));
    serde_json::to_value(out).map_err(|e| GeometryError::Decode(e.to_string()))
}

fn simplify_shape(shape: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    match shape {
        Geometry::LineString(line) => Geometry::LineString(line.simplify(&tolerance)),
        Geometry::MultiLineString(lines) => Geometry::MultiLineString(lines.simplify(&tolerance)),
        Geometry::Polygon(polygon) => Geometry::Polygon(simplify_polygon(polygon, tolerance)),
        Geometry::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon(
            polygons
                .0
                .iter()
                .map(|polygon| simplify_polygon(polygon, tolerance))
                .collect(),
        )),
        Geometry::GeometryCollection(members) => Geometry::GeometryCollection(GeometryCollection(
            members
                .0
                .iter()
                .map(|member| simplify_shape(member, tolerance))
                .collect(),
        )),
        other => other.clone(),
    }
}

fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    Polygon::new(
        simplify_ring(polygon.exterior(), tolerance),
        polygon
            .interiors()
            .iter()
            .map(|ring| simplify_ring(ring, tolerance))
            .collect(),
    )
}

fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let simplified = ring.simplify(&tolerance);
    if simplified.0.len() < MIN_RING_POSITIONS {
        ring.clone()
    } else {
        simplified
    }
}
