//! One sensor's data for one date across a set of tiles.
use crate::coverage::TileCoverage;
use crate::date_range::format_date_dir;
use crate::error::{ArchiveError, Result};
use crate::family::SensorFamily;
use crate::processor::{
    ProcessOptions, ProcessRequest, Processor, ProductFiles, ProjectOptions, ProjectRequest,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct TileDataset {
    family: Arc<SensorFamily>,
    sensor: String,
    date: NaiveDate,
    coverage: Arc<TileCoverage>,
    /// Only tiles with a directory for this date appear here.
    tiles: BTreeMap<String, ProductFiles>,
    /// Further files of an already indexed product, e.g. suffixed reruns, per tile.
    extras: BTreeMap<String, Vec<PathBuf>>,
    mosaics: ProductFiles,
}

/// Tile counts from one round of processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl AddAssign for ProcessSummary {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl TileDataset {
    /// Scan the date directory of every covered tile for this sensor's products.
    /// `products` restricts which products are picked up.
    pub fn discover(
        family: Arc<SensorFamily>,
        sensor: &str,
        date: NaiveDate,
        coverage: Arc<TileCoverage>,
        products: Option<&[String]>,
    ) -> Result<Self> {
        let mut tiles = BTreeMap::new();
        let mut extras = BTreeMap::new();
        for tile in coverage.keys() {
            let dir = family.path(tile, Some(date));
            if !dir.is_dir() {
                debug!("No data for tile {} on {}", tile, format_date_dir(date));
                continue;
            }
            let mut files = ProductFiles::new();
            let mut more = vec![];
            for name in sorted_file_names(&dir)? {
                let Some((file_sensor, product)) = parse_product_file(&family, tile, date, &name)
                else {
                    continue;
                };
                if file_sensor != sensor {
                    continue;
                }
                if products.map_or(false, |wanted| !wanted.iter().any(|p| p == product)) {
                    continue;
                }
                let canonical = family.product_filename(tile, date, sensor, product, "");
                record(&mut files, &mut more, product, dir.join(&name), name == canonical);
            }
            tiles.insert(tile.clone(), files);
            if !more.is_empty() {
                extras.insert(tile.clone(), more);
            }
        }
        Ok(Self {
            family,
            sensor: sensor.to_string(),
            date,
            coverage,
            tiles,
            extras,
            mosaics: ProductFiles::new(),
        })
    }

    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn family(&self) -> &SensorFamily {
        &self.family
    }

    pub fn coverage(&self) -> &TileCoverage {
        &self.coverage
    }

    pub fn tiles(&self) -> &BTreeMap<String, ProductFiles> {
        &self.tiles
    }

    /// Every product file of every tile, including the extra files of a product.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.tiles
            .values()
            .flat_map(|files| files.values())
            .chain(self.extras.values().flatten())
            .map(PathBuf::as_path)
    }

    pub fn mosaics(&self) -> &ProductFiles {
        &self.mosaics
    }

    /// File of `product` for `tile`, or of the `product` mosaic when no tile is given.
    pub fn filename(&self, product: &str, tile: Option<&str>) -> Result<&Path> {
        let not_found = || ArchiveError::ProductNotFound {
            product: product.to_string(),
            tile: tile.map(str::to_string),
        };
        let files = match tile {
            Some(tile) => self.tiles.get(tile).ok_or_else(not_found)?,
            None => &self.mosaics,
        };
        files
            .get(product)
            .map(|p| p.as_path())
            .ok_or_else(not_found)
    }

    /// Products present for at least one tile, sorted.
    pub fn available_products(&self) -> Vec<String> {
        self.tiles
            .values()
            .flat_map(|files| files.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.files().count()
    }

    /// Create every requested product that is missing (all of them when overwriting),
    /// one tile at a time. A failing tile is logged and left as it was.
    pub fn process(
        &mut self,
        processor: &impl Processor,
        products: &[String],
        options: &ProcessOptions,
    ) -> ProcessSummary {
        let mut summary = ProcessSummary::default();
        let date = format_date_dir(self.date);
        for (tile, files) in self.tiles.iter_mut() {
            let todo: Vec<String> = products
                .iter()
                .filter(|p| options.overwrite || !files.contains_key(p.as_str()))
                .cloned()
                .collect();
            if todo.is_empty() {
                debug!("{} {} {}: products up to date", self.sensor, tile, date);
                summary.skipped += 1;
                continue;
            }
            let request = ProcessRequest {
                family: &self.family,
                sensor: &self.sensor,
                date: self.date,
                tile,
                products: &todo,
                existing: files,
                options,
            };
            match processor.process(&request) {
                Ok(created) => {
                    info!("{} {} {}: created {}", self.sensor, tile, date, todo.join(" "));
                    let more = self.extras.entry(tile.clone()).or_default();
                    for (product, path) in created {
                        let canonical = self.family.product_filename(
                            tile,
                            self.date,
                            &self.sensor,
                            &product,
                            "",
                        );
                        let is_canonical =
                            path.file_name().map_or(false, |n| n == canonical.as_str());
                        record(files, more, &product, path, is_canonical);
                    }
                    if more.is_empty() {
                        self.extras.remove(tile);
                    }
                    summary.processed += 1;
                }
                Err(e) => {
                    error!("{} {} {}: processing failed: {:#}", self.sensor, tile, date, e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Mosaic each requested product across the tiles that have it.
    pub fn project(
        &mut self,
        processor: &impl Processor,
        products: &[String],
        options: &ProjectOptions,
    ) -> anyhow::Result<()> {
        for product in products {
            let inputs: Vec<&Path> = self
                .tiles
                .values()
                .filter_map(|files| files.get(product).map(|p| p.as_path()))
                .collect();
            if inputs.is_empty() {
                warn!(
                    "{} {}: no tiles have {}",
                    self.sensor,
                    format_date_dir(self.date),
                    product
                );
                continue;
            }
            let request = ProjectRequest {
                family: &self.family,
                sensor: &self.sensor,
                date: self.date,
                product,
                inputs,
                options,
            };
            let output = processor.project(&request)?;
            self.mosaics.insert(product.clone(), output);
        }
        Ok(())
    }
}

/// Index `path` as the file of `product`. The canonical, unsuffixed name wins the
/// product entry; any other file of the same product goes to `extras`.
fn record(
    files: &mut ProductFiles,
    extras: &mut Vec<PathBuf>,
    product: &str,
    path: PathBuf,
    canonical: bool,
) {
    let Some(current) = files.get(product) else {
        files.insert(product.to_string(), path);
        return;
    };
    if *current == path || extras.contains(&path) {
        return;
    }
    warn!("More than one file for {}: {}", product, path.display());
    if canonical {
        if let Some(previous) = files.insert(product.to_string(), path) {
            extras.push(previous);
        }
    } else {
        extras.push(path);
    }
}

pub(crate) fn sorted_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = vec![];
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Split `<tile>_<YYYYDDD>_<sensor>_<product>[suffix].<ext>` into sensor and catalog product.
pub(crate) fn parse_product_file<'a>(
    family: &'a SensorFamily,
    tile: &str,
    date: NaiveDate,
    name: &'a str,
) -> Option<(&'a str, &'a str)> {
    let prefix = format!("{tile}_{}_", format_date_dir(date));
    let stem = name
        .strip_prefix(&prefix)?
        .strip_suffix(&family.extension)?
        .strip_suffix('.')?;
    let (sensor, rest) = stem.split_once('_')?;
    family.sensor_name(sensor)?;
    let product = family.match_product(rest)?;
    Some((sensor, product))
}
