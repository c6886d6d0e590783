//! What an inventory needs from a sensor family, and the on-disk implementation of it.
use crate::coverage::{self, full_coverage, TileCoverage};
use crate::dataset::{parse_product_file, sorted_file_names, TileDataset};
use crate::date_range::parse_date_dir;
use crate::error::{ArchiveError, Result};
use crate::family::SensorFamily;
use crate::vector::{pad_tile_id, Region, TileGrid};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use tracing::debug;

pub trait DataClass {
    fn family(&self) -> &SensorFamily;

    /// The family's reference tile grid.
    fn resolve_tile_grid(&self) -> Result<TileGrid>;

    /// Every tile directory present in the archive.
    fn local_tiles(&self) -> Result<Vec<String>>;

    /// Dates with a directory under `tile`. A tile without a directory has none.
    fn find_dates(&self, tile: &str) -> Result<Vec<NaiveDate>>;

    /// One dataset per sensor with data on `date`, in configured sensor order.
    fn construct(
        &self,
        coverage: &Arc<TileCoverage>,
        date: NaiveDate,
        products: Option<&[String]>,
    ) -> Result<Vec<TileDataset>>;

    fn sensor_names(&self) -> Vec<String> {
        self.family().sensor_names()
    }
}

/// Tiles to inventory: an explicit list at full weight, else the tiles covering the
/// region, else every tile in the archive.
pub fn resolve_tiles(
    dataclass: &impl DataClass,
    region: Option<&Region>,
    tiles: Option<&[String]>,
) -> Result<TileCoverage> {
    let width = dataclass.family().tile_width;
    if let Some(tiles) = tiles {
        let padded: Vec<String> = tiles.iter().map(|t| pad_tile_id(t, width)).collect();
        return Ok(full_coverage(&padded));
    }
    if let Some(region) = region {
        let grid = dataclass.resolve_tile_grid()?;
        return coverage::resolve(region, &grid);
    }
    Ok(full_coverage(&dataclass.local_tiles()?))
}

/// A sensor family archived on the local filesystem as `root/<tile>/<YYYYDDD>/`.
pub struct LocalArchive {
    family: Arc<SensorFamily>,
    raw_patterns: Vec<(String, Regex)>,
}

impl LocalArchive {
    pub fn new(family: SensorFamily) -> Result<Self> {
        let mut raw_patterns = vec![];
        for sensor in &family.sensors {
            if let Some(raw) = &sensor.raw {
                raw_patterns.push((sensor.code.clone(), Regex::new(raw)?));
            }
        }
        Ok(Self {
            family: Arc::new(family),
            raw_patterns,
        })
    }

    /// Sensor whose raw-file pattern matches `name`.
    pub fn raw_sensor(&self, name: &str) -> Option<&str> {
        self.raw_patterns
            .iter()
            .find(|(_, re)| re.is_match(name))
            .map(|(code, _)| code.as_str())
    }

    /// Tile and date encoded in a raw file name, read from the `tile` and `date`
    /// capture groups of the matching sensor pattern.
    pub fn raw_location(&self, name: &str) -> Option<(String, NaiveDate)> {
        let captures = self
            .raw_patterns
            .iter()
            .find_map(|(_, re)| re.captures(name))?;
        let tile = pad_tile_id(captures.name("tile")?.as_str(), self.family.tile_width);
        let date = parse_date_dir(captures.name("date")?.as_str())?;
        Some((tile, date))
    }

    fn sensors_on(&self, coverage: &TileCoverage, date: NaiveDate) -> Result<Vec<String>> {
        let mut found = HashSet::new();
        for tile in coverage.keys() {
            let dir = self.family.path(tile, Some(date));
            if !dir.is_dir() {
                continue;
            }
            for name in sorted_file_names(&dir)? {
                if let Some((sensor, _)) = parse_product_file(&self.family, tile, date, &name) {
                    found.insert(sensor.to_string());
                } else if let Some(sensor) = self.raw_sensor(&name) {
                    found.insert(sensor.to_string());
                }
            }
        }
        let mut sensors: Vec<String> = self
            .family
            .sensors
            .iter()
            .filter(|s| found.contains(&s.code))
            .map(|s| s.code.clone())
            .collect();
        if sensors.is_empty() {
            // validated families always declare at least one sensor
            sensors.extend(self.family.sensors.first().map(|s| s.code.clone()));
        }
        Ok(sensors)
    }
}

impl DataClass for LocalArchive {
    fn family(&self) -> &SensorFamily {
        &self.family
    }

    fn resolve_tile_grid(&self) -> Result<TileGrid> {
        let tiles = self.family.tiles.as_ref().ok_or_else(|| {
            ArchiveError::Config(format!("family '{}' has no tile vector", self.family.name))
        })?;
        TileGrid::read(&tiles.vector, &tiles.attribute, self.family.tile_width)
    }

    fn local_tiles(&self) -> Result<Vec<String>> {
        let mut tiles = vec![];
        for entry in fs::read_dir(&self.family.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                tiles.push(name.to_string());
            }
        }
        tiles.sort();
        Ok(tiles)
    }

    fn find_dates(&self, tile: &str) -> Result<Vec<NaiveDate>> {
        let dir = self.family.path(tile, None);
        if !dir.is_dir() {
            debug!("No directory for tile {}", tile);
            return Ok(vec![]);
        }
        let mut dates = vec![];
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().and_then(parse_date_dir) {
                Some(date) => dates.push(date),
                None => debug!("Ignoring {}", entry.path().display()),
            }
        }
        dates.sort();
        Ok(dates)
    }

    fn construct(
        &self,
        coverage: &Arc<TileCoverage>,
        date: NaiveDate,
        products: Option<&[String]>,
    ) -> Result<Vec<TileDataset>> {
        self.sensors_on(coverage, date)?
            .iter()
            .map(|sensor| {
                TileDataset::discover(
                    Arc::clone(&self.family),
                    sensor,
                    date,
                    Arc::clone(coverage),
                    products,
                )
            })
            .collect()
    }
}
