//! Which tiles of a grid does a region of interest fall on, and by how much.
use crate::error::{ArchiveError, Result};
use crate::projection::transform_geometry;
use crate::vector::{Region, TileGrid};
use geo::{Area, BooleanOps, BoundingRect, MultiPolygon};
use std::collections::BTreeMap;
use tracing::debug;

/// Tile id -> fraction of the region's area that falls inside that tile.
pub type TileCoverage = BTreeMap<String, f64>;

/// Full weight for each tile in an explicit list.
pub fn full_coverage<S: AsRef<str>>(tiles: &[S]) -> TileCoverage {
    tiles.iter().map(|t| (t.as_ref().to_string(), 1.0)).collect()
}

/// Union all features of a region into one geometry.
pub fn union_region(region: &Region) -> MultiPolygon<f64> {
    let mut features = region.features.iter();
    let Some(first) = features.next() else {
        return MultiPolygon::new(vec![]);
    };
    features.fold(first.clone(), |acc, feature| acc.union(feature))
}

/// Compute the tiles intersecting `region` and each tile's share of the region's area.
///
/// Weights are `area(region ∩ tile) / area(region)` in the grid's CRS. Tiles touching
/// the region with zero intersection area are left out. A tile id carried by more
/// than one grid feature accumulates the weight of all of them.
pub fn resolve(region: &Region, grid: &TileGrid) -> Result<TileCoverage> {
    let mut coverage = TileCoverage::new();
    if region.is_empty() {
        return Ok(coverage);
    }

    if region.features.iter().all(|f| f.unsigned_area() == 0.0) {
        return Err(ArchiveError::DegenerateGeometry);
    }
    let geometry = union_region(region);
    let geometry = transform_geometry(&geometry, &region.crs, &grid.crs)?;
    let region_area = geometry.unsigned_area();
    if region_area == 0.0 {
        return Err(ArchiveError::DegenerateGeometry);
    }
    let Some(extent) = geometry.bounding_rect() else {
        return Ok(coverage);
    };

    for tile in grid.candidates(extent) {
        let area = geometry.intersection(&tile.geometry).unsigned_area();
        if area == 0.0 {
            continue;
        }
        debug!("Tile {} covers {:.1}% of region", tile.id, 100.0 * area / region_area);
        *coverage.entry(tile.id.clone()).or_insert(0.0) += area / region_area;
    }
    Ok(coverage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{Crs, TileRecord};
    use geo::polygon;

    const EPS: f64 = 1e-9;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
            (x: x0, y: y0),
        ]])
    }

    fn utm() -> Crs {
        Crs::Epsg(32633)
    }

    fn grid(records: Vec<TileRecord>) -> TileGrid {
        TileGrid::new(records, utm())
    }

    #[test]
    fn test_tiles_inside_region() {
        // region area 300, tiles of area 100 and 50 fully inside, a third far away
        let region = Region::new(vec![rect(0.0, 0.0, 30.0, 10.0)], utm());
        let tiles = grid(vec![
            TileRecord::new("000123", rect(0.0, 0.0, 10.0, 10.0)),
            TileRecord::new("000124", rect(10.0, 0.0, 15.0, 10.0)),
            TileRecord::new("000125", rect(100.0, 100.0, 110.0, 110.0)),
        ]);
        let coverage = resolve(&region, &tiles).unwrap();
        assert_eq!(coverage.len(), 2);
        assert!((coverage["000123"] - 100.0 / 300.0).abs() < EPS);
        assert!((coverage["000124"] - 50.0 / 300.0).abs() < EPS);
    }

    #[test]
    fn test_touching_tile_excluded() {
        let region = Region::new(vec![rect(0.0, 0.0, 10.0, 10.0)], utm());
        let tiles = grid(vec![
            TileRecord::new("000001", rect(5.0, 5.0, 15.0, 15.0)),
            TileRecord::new("000002", rect(10.0, 0.0, 20.0, 10.0)),
        ]);
        let coverage = resolve(&region, &tiles).unwrap();
        assert_eq!(coverage.keys().collect::<Vec<_>>(), vec!["000001"]);
        assert!((coverage["000001"] - 0.25).abs() < EPS);
    }

    #[test]
    fn test_features_are_unioned() {
        // two overlapping features: union area is 150, not 200
        let region = Region::new(
            vec![rect(0.0, 0.0, 10.0, 10.0), rect(5.0, 0.0, 15.0, 10.0)],
            utm(),
        );
        let tiles = grid(vec![TileRecord::new("000001", rect(0.0, 0.0, 5.0, 10.0))]);
        let coverage = resolve(&region, &tiles).unwrap();
        assert!((coverage["000001"] - 50.0 / 150.0).abs() < EPS);
    }

    #[test]
    fn test_order_invariant() {
        let region = Region::new(vec![rect(0.0, 0.0, 20.0, 20.0)], utm());
        let mut records = vec![
            TileRecord::new("000001", rect(-5.0, -5.0, 5.0, 5.0)),
            TileRecord::new("000002", rect(5.0, 5.0, 25.0, 25.0)),
            TileRecord::new("000003", rect(0.0, 10.0, 10.0, 20.0)),
            TileRecord::new("000003", rect(10.0, 0.0, 15.0, 5.0)),
        ];
        let forward = resolve(&region, &grid(records.clone())).unwrap();
        records.reverse();
        let backward = resolve(&region, &grid(records)).unwrap();
        assert_eq!(forward.keys().collect::<Vec<_>>(), backward.keys().collect::<Vec<_>>());
        for (tile, weight) in &forward {
            assert!((weight - backward[tile]).abs() < EPS);
        }
        assert!((forward["000003"] - 125.0 / 400.0).abs() < EPS);
    }

    #[test]
    fn test_empty_region() {
        let region = Region::new(vec![], utm());
        let tiles = grid(vec![TileRecord::new("000001", rect(0.0, 0.0, 1.0, 1.0))]);
        assert!(resolve(&region, &tiles).unwrap().is_empty());
    }

    #[test]
    fn test_degenerate_region() {
        let region = Region::new(vec![rect(0.0, 0.0, 10.0, 0.0)], utm());
        let tiles = grid(vec![TileRecord::new("000001", rect(0.0, 0.0, 1.0, 1.0))]);
        let err = resolve(&region, &tiles).unwrap_err();
        assert!(matches!(err, ArchiveError::DegenerateGeometry));
    }

    #[test]
    fn test_undefined_region_crs() {
        let region = Region::new(vec![rect(0.0, 0.0, 10.0, 10.0)], Crs::Undefined);
        let tiles = grid(vec![TileRecord::new("000001", rect(0.0, 0.0, 1.0, 1.0))]);
        let err = resolve(&region, &tiles).unwrap_err();
        assert!(matches!(err, ArchiveError::CrsTransform { .. }));
    }

    #[test]
    fn test_full_coverage() {
        let coverage = full_coverage(&["000001", "000002"]);
        assert_eq!(coverage.len(), 2);
        assert!(coverage.values().all(|w| *w == 1.0));
    }
}
