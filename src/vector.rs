//! Region-of-interest and tile-grid vectors read from GeoJSON.
//!
//! Only areal geometries (`Polygon`, `MultiPolygon`, and collections of them) carry
//! meaning here; points and lines are skipped. The optional legacy `crs` member names
//! the coordinate reference system, defaulting to EPSG:4326 when absent.
use crate::error::{ArchiveError, Result};
use geo::{BoundingRect, Coord, Intersects, LineString, MultiPolygon, Polygon, Rect};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const WGS84: u16 = 4326;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    Epsg(u16),
    Proj4(String),
    Undefined,
}

impl Crs {
    /// Interpret a CRS name such as `EPSG:32633`, `urn:ogc:def:crs:EPSG::32633`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84` or a raw `+proj=` string.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.starts_with("+proj=") {
            return Self::Proj4(name.to_string());
        }
        if name.ends_with("CRS84") {
            return Self::Epsg(WGS84);
        }
        name.rsplit(':')
            .next()
            .filter(|_| name.to_ascii_uppercase().contains("EPSG"))
            .and_then(|code| code.parse().ok())
            .map(Self::Epsg)
            .unwrap_or(Self::Undefined)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epsg(code) => write!(f, "EPSG:{code}"),
            Self::Proj4(proj) => write!(f, "{proj}"),
            Self::Undefined => write!(f, "undefined CRS"),
        }
    }
}

/// Region of interest: every feature of a vector file, not yet unioned.
#[derive(Debug, Clone)]
pub struct Region {
    pub features: Vec<MultiPolygon<f64>>,
    pub crs: Crs,
}

impl Region {
    pub fn new(features: Vec<MultiPolygon<f64>>, crs: Crs) -> Self {
        Self { features, crs }
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let (features, crs) = parse_features(&content, path)?;
        let features = features.into_iter().map(|f| f.geometry).collect();
        Ok(Self { features, crs })
    }

    pub fn is_empty(&self) -> bool {
        self.features.iter().all(|f| f.0.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct TileRecord {
    pub id: String,
    pub geometry: MultiPolygon<f64>,
    bbox: Option<Rect<f64>>,
}

impl TileRecord {
    pub fn new(id: &str, geometry: MultiPolygon<f64>) -> Self {
        let bbox = geometry.bounding_rect();
        Self {
            id: id.to_string(),
            geometry,
            bbox,
        }
    }
}

/// Polygon-per-tile reference grid of a sensor family.
#[derive(Debug, Clone)]
pub struct TileGrid {
    pub tiles: Vec<TileRecord>,
    pub crs: Crs,
}

impl TileGrid {
    pub fn new(tiles: Vec<TileRecord>, crs: Crs) -> Self {
        Self { tiles, crs }
    }

    /// Read a grid, taking each tile id from `attribute` and zero-padding it to `width`.
    pub fn read<P: AsRef<Path>>(path: P, attribute: &str, width: usize) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let (features, crs) = parse_features(&content, path)?;

        let mut tiles = Vec::with_capacity(features.len());
        for feature in features {
            let id = match feature.properties.get(attribute) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    return Err(ArchiveError::InvalidVector {
                        path: path.to_path_buf(),
                        reason: format!("feature without a '{attribute}' attribute"),
                    })
                }
            };
            tiles.push(TileRecord::new(&pad_tile_id(&id, width), feature.geometry));
        }
        Ok(Self { tiles, crs })
    }

    /// Coarse spatial filter: tiles whose bounding box intersects `extent`.
    pub fn candidates(&self, extent: Rect<f64>) -> impl Iterator<Item = &TileRecord> {
        self.tiles
            .iter()
            .filter(move |t| t.bbox.map_or(false, |bbox| bbox.intersects(&extent)))
    }
}

/// Left-pad a tile id with zeros up to the canonical width.
pub fn pad_tile_id(id: &str, width: usize) -> String {
    format!("{id:0>width$}")
}

struct Feature {
    geometry: MultiPolygon<f64>,
    properties: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection {
        features: Vec<RawFeature>,
        #[serde(default)]
        crs: Option<NamedCrs>,
    },
    Feature(RawFeature),
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
        #[serde(default)]
        crs: Option<NamedCrs>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
        #[serde(default)]
        crs: Option<NamedCrs>,
    },
}

#[derive(Deserialize)]
struct RawFeature {
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    crs: Option<NamedCrs>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    GeometryCollection {
        geometries: Vec<RawGeometry>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct NamedCrs {
    properties: NamedCrsProperties,
}

#[derive(Deserialize)]
struct NamedCrsProperties {
    name: String,
}

fn crs_of(named: Option<NamedCrs>) -> Crs {
    named
        .map(|c| Crs::parse(&c.properties.name))
        .unwrap_or(Crs::Epsg(WGS84))
}

fn parse_features(content: &str, path: &Path) -> Result<(Vec<Feature>, Crs)> {
    let invalid = |reason: String| ArchiveError::InvalidVector {
        path: path.to_path_buf(),
        reason,
    };
    let doc: GeoJson = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;

    let (raw_features, crs) = match doc {
        GeoJson::FeatureCollection { features, crs } => (features, crs_of(crs)),
        GeoJson::Feature(mut feature) => {
            let crs = crs_of(feature.crs.take());
            (vec![feature], crs)
        }
        GeoJson::Polygon { coordinates, crs } => {
            let feature = RawFeature {
                geometry: Some(RawGeometry::Polygon { coordinates }),
                properties: None,
                crs: None,
            };
            (vec![feature], crs_of(crs))
        }
        GeoJson::MultiPolygon { coordinates, crs } => {
            let feature = RawFeature {
                geometry: Some(RawGeometry::MultiPolygon { coordinates }),
                properties: None,
                crs: None,
            };
            (vec![feature], crs_of(crs))
        }
    };

    let mut features = Vec::with_capacity(raw_features.len());
    for raw in raw_features {
        let Some(geometry) = raw.geometry else {
            warn!("Skipping feature without geometry in {}", path.display());
            continue;
        };
        let mut polygons = vec![];
        collect_polygons(geometry, &mut polygons).map_err(invalid)?;
        if polygons.is_empty() {
            warn!("Skipping non-areal feature in {}", path.display());
            continue;
        }
        features.push(Feature {
            geometry: MultiPolygon::new(polygons),
            properties: raw.properties.unwrap_or_default(),
        });
    }
    Ok((features, crs))
}

fn collect_polygons(
    geometry: RawGeometry,
    polygons: &mut Vec<Polygon<f64>>,
) -> std::result::Result<(), String> {
    match geometry {
        RawGeometry::Polygon { coordinates } => polygons.push(to_polygon(coordinates)?),
        RawGeometry::MultiPolygon { coordinates } => {
            for rings in coordinates {
                polygons.push(to_polygon(rings)?);
            }
        }
        RawGeometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_polygons(g, polygons)?;
            }
        }
        RawGeometry::Other => {}
    }
    Ok(())
}

fn to_polygon(rings: Vec<Vec<Vec<f64>>>) -> std::result::Result<Polygon<f64>, String> {
    let mut rings = rings
        .into_iter()
        .map(to_ring)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if rings.is_empty() {
        return Err("polygon without rings".to_string());
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn to_ring(positions: Vec<Vec<f64>>) -> std::result::Result<LineString<f64>, String> {
    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err("position with fewer than two coordinates".to_string()),
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}
