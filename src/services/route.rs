// SPDX-License-Identifier: MIT

//! Route classification: open line vs. closed area.
//!
//! A route that returns near its start captures its polygon interior as
//! well as the line of cells it traverses. The interior fill alone can
//! skip boundary cells, so the two sets are unioned.

use std::collections::HashSet;

use geo::{LineString, Polygon};
use h3o::geom::{PolyfillConfig, Polygon as H3Polygon, ToCells};
use h3o::CellIndex;

use crate::config::Config;
use crate::geo_utils::haversine_distance_m;
use crate::models::RouteShape;
use crate::services::tiler::HexTiler;

/// Result of converting a route into tile ids.
#[derive(Debug, Clone)]
pub struct RouteConversion {
    /// Sorted, deduplicated H3 cell ids
    pub tile_ids: Vec<String>,
    /// Shape the route was captured as
    pub route_type: RouteShape,
}

/// Decides the capture shape of a route and produces its final cell set.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    tiler: HexTiler,
    area_close_threshold_m: f64,
}

impl RouteClassifier {
    pub fn new(config: &Config) -> Self {
        Self {
            tiler: HexTiler::new(config.hex_resolution),
            area_close_threshold_m: config.area_close_threshold_m,
        }
    }

    pub fn tiler(&self) -> &HexTiler {
        &self.tiler
    }

    /// Convert a `(lat, lng)` sequence into tile ids and a route shape.
    pub fn convert_route(&self, points: &[(f64, f64)]) -> RouteConversion {
        let mut cells = self.tiler.cells_for_points(points);
        let route_type = self.classify(points);

        if route_type == RouteShape::Area {
            cells.extend(self.interior_cells(points));
        }

        let mut tile_ids: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        tile_ids.sort_unstable();

        tracing::debug!(
            tiles = tile_ids.len(),
            shape = ?route_type,
            "Converted route"
        );

        RouteConversion {
            tile_ids,
            route_type,
        }
    }

    /// Convert an encoded polyline (precision 5) into tile ids.
    pub fn convert_route_from_polyline(
        &self,
        encoded: &str,
    ) -> Result<RouteConversion, RouteError> {
        let line = polyline::decode_polyline(encoded, 5)
            .map_err(|e| RouteError::PolylineError(e.to_string()))?;
        let points: Vec<(f64, f64)> = line.0.iter().map(|c| (c.y, c.x)).collect();
        Ok(self.convert_route(&points))
    }

    /// A route is an area when it has enough points to form a ring and
    /// ends within the closing threshold of its start.
    fn classify(&self, points: &[(f64, f64)]) -> RouteShape {
        if points.len() < 3 {
            return RouteShape::Line;
        }
        let (first, last) = (points[0], points[points.len() - 1]);
        let closing_distance = haversine_distance_m(first.0, first.1, last.0, last.1);

        if closing_distance <= self.area_close_threshold_m {
            RouteShape::Area
        } else {
            RouteShape::Line
        }
    }

    /// Polygon-interior cells of the route treated as a closed ring.
    /// A ring h3o rejects (self-touching, all-collinear) falls back to
    /// the line cells alone.
    fn interior_cells(&self, points: &[(f64, f64)]) -> HashSet<CellIndex> {
        let ring: Vec<(f64, f64)> = points
            .iter()
            .filter(|(lat, lng)| lat.is_finite() && lng.is_finite())
            .map(|&(lat, lng)| (lng, lat))
            .collect();
        let polygon = Polygon::new(LineString::from(ring), vec![]);

        match H3Polygon::from_degrees(polygon) {
            Ok(h3_polygon) => h3_polygon
                .to_cells(PolyfillConfig::new(self.tiler.resolution()))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Ring rejected, capturing line cells only");
                HashSet::new()
            }
        }
    }
}

/// Errors from route conversion.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Failed to decode polyline: {0}")]
    PolylineError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RouteClassifier {
        RouteClassifier::new(&Config::default())
    }

    /// Rectangular ~1.7km loop in San Francisco, ending at its starting
    /// point. Big enough that its interior holds whole res-9 cells the
    /// border walk never touches.
    fn closed_loop() -> Vec<(f64, f64)> {
        vec![
            (37.7700, -122.4400),
            (37.7700, -122.4200),
            (37.7850, -122.4200),
            (37.7850, -122.4400),
            (37.7700, -122.4400),
        ]
    }

    #[test]
    fn test_two_points_always_line() {
        let conversion = classifier().convert_route(&[(37.7749, -122.4194), (37.7749, -122.4195)]);
        assert_eq!(conversion.route_type, RouteShape::Line);
    }

    #[test]
    fn test_open_route_is_line() {
        // Start and end ~2km apart
        let conversion = classifier().convert_route(&[
            (37.7749, -122.4194),
            (37.7800, -122.4150),
            (37.7930, -122.4100),
        ]);
        assert_eq!(conversion.route_type, RouteShape::Line);
    }

    #[test]
    fn test_closed_route_is_area() {
        let conversion = classifier().convert_route(&closed_loop());
        assert_eq!(conversion.route_type, RouteShape::Area);
    }

    #[test]
    fn test_area_tiles_superset_of_line_tiles() {
        let points = closed_loop();
        let c = classifier();

        let line_cells = c.tiler().cells_for_points(&points);
        let conversion = c.convert_route(&points);
        assert_eq!(conversion.route_type, RouteShape::Area);

        for cell in &line_cells {
            assert!(
                conversion.tile_ids.contains(&cell.to_string()),
                "area capture lost border cell {}",
                cell
            );
        }
        // The loop is big enough that the interior adds cells
        assert!(conversion.tile_ids.len() > line_cells.len());
    }

    #[test]
    fn test_empty_route_yields_empty_set() {
        let conversion = classifier().convert_route(&[]);
        assert!(conversion.tile_ids.is_empty());
        assert_eq!(conversion.route_type, RouteShape::Line);
    }

    #[test]
    fn test_tile_ids_sorted_and_unique() {
        let conversion = classifier().convert_route(&closed_loop());
        let mut sorted = conversion.tile_ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(conversion.tile_ids, sorted);
    }

    #[test]
    fn test_invalid_polyline_is_an_error() {
        assert!(classifier()
            .convert_route_from_polyline("invalid!!!")
            .is_err());
    }

    #[test]
    fn test_polyline_roundtrip_matches_points() {
        let points = closed_loop();
        let line: LineString<f64> =
            LineString::from(points.iter().map(|&(lat, lng)| (lng, lat)).collect::<Vec<_>>());
        let encoded = polyline::encode_coordinates(line, 5).unwrap();

        let from_polyline = classifier().convert_route_from_polyline(&encoded).unwrap();
        let from_points = classifier().convert_route(&points);

        assert_eq!(from_polyline.route_type, from_points.route_type);
        assert_eq!(from_polyline.tile_ids, from_points.tile_ids);
    }
}
