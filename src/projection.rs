//! Coordinate transformation of geometries between reference systems, in pure Rust
//! (proj4rs with EPSG definitions from crs-definitions).
use crate::error::{ArchiveError, Result};
use crate::vector::Crs;
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// PROJ4 string for a CRS, if it is known.
pub fn proj_string(crs: &Crs) -> Option<String> {
    match crs {
        Crs::Epsg(code) => crs_definitions::from_code(*code).map(|def| def.proj4.to_string()),
        Crs::Proj4(proj) => Some(proj.clone()),
        Crs::Undefined => None,
    }
}

fn is_geographic(proj: &str) -> bool {
    proj.contains("+proj=longlat") || proj.contains("+proj=latlong")
}

/// Reproject `geometry` from `source` into `target`.
///
/// Identical reference systems are a no-op. Fails with [`ArchiveError::CrsTransform`]
/// when either side is undefined, unknown, or the transformation itself fails.
pub fn transform_geometry(
    geometry: &MultiPolygon<f64>,
    source: &Crs,
    target: &Crs,
) -> Result<MultiPolygon<f64>> {
    let error = |reason: String| ArchiveError::CrsTransform {
        source_crs: source.to_string(),
        target_crs: target.to_string(),
        reason,
    };

    if source == target && *source != Crs::Undefined {
        return Ok(geometry.clone());
    }

    let source_str = proj_string(source).ok_or_else(|| error("unknown source CRS".into()))?;
    let target_str = proj_string(target).ok_or_else(|| error("unknown target CRS".into()))?;

    let source_proj = Proj::from_proj_string(&source_str)
        .map_err(|e| error(format!("invalid source projection: {e:?}")))?;
    let target_proj = Proj::from_proj_string(&target_str)
        .map_err(|e| error(format!("invalid target projection: {e:?}")))?;

    // proj4rs works in radians for geographic systems
    let source_geographic = is_geographic(&source_str);
    let target_geographic = is_geographic(&target_str);
    let source_proj = &source_proj;
    let target_proj = &target_proj;

    geometry.try_map_coords(|c: Coord<f64>| {
        let mut point = if source_geographic {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };
        transform(source_proj, target_proj, &mut point)
            .map_err(|e| error(format!("{e:?}")))?;
        if target_geographic {
            Ok(Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            })
        } else {
            Ok(Coord {
                x: point.0,
                y: point.1,
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    const EPS: f64 = 1e-3;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    #[test]
    fn test_same_crs_is_noop() {
        let geom = square(0.0, 0.0, 1.0);
        let out = transform_geometry(&geom, &Crs::Epsg(32633), &Crs::Epsg(32633)).unwrap();
        assert_eq!(out, geom);
    }

    #[test]
    fn test_wgs84_to_web_mercator() {
        let geom = square(0.0, 0.0, 1.0);
        let out = transform_geometry(&geom, &Crs::Epsg(4326), &Crs::Epsg(3857)).unwrap();
        let first = out.0[0].exterior().0[0];
        assert!(first.x.abs() < EPS && first.y.abs() < EPS);
        let third = out.0[0].exterior().0[2];
        assert!((third.x - 111_319.49).abs() < 1.0);
        assert!(out.unsigned_area() > 1.2e10);
    }

    #[test]
    fn test_round_trip_preserves_coordinates() {
        let geom = square(10.0, 45.0, 0.5);
        let utm = transform_geometry(&geom, &Crs::Epsg(4326), &Crs::Epsg(32632)).unwrap();
        let back = transform_geometry(&utm, &Crs::Epsg(32632), &Crs::Epsg(4326)).unwrap();
        for (a, b) in geom.0[0].exterior().0.iter().zip(back.0[0].exterior().0.iter()) {
            assert!((a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_undefined_crs_fails() {
        let geom = square(0.0, 0.0, 1.0);
        let err = transform_geometry(&geom, &Crs::Undefined, &Crs::Epsg(4326)).unwrap_err();
        assert!(matches!(err, ArchiveError::CrsTransform { .. }));
        let err = transform_geometry(&geom, &Crs::Undefined, &Crs::Undefined).unwrap_err();
        assert!(matches!(err, ArchiveError::CrsTransform { .. }));
    }
}
