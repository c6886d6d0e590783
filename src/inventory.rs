//! Date- and sensor-indexed inventory of archived tile data.
use crate::coverage::TileCoverage;
use crate::dataclass::{resolve_tiles, DataClass};
use crate::dataset::{ProcessSummary, TileDataset};
use crate::date_range::DateRangeFilter;
use crate::error::Result;
use crate::family::SensorFamily;
use crate::links;
use crate::processor::{ProcessOptions, Processor, ProjectOptions};
use crate::vector::Region;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// What to put in an inventory. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct InventoryQuery {
    pub region: Option<Region>,
    pub tiles: Option<Vec<String>>,
    /// `start,end` date range.
    pub dates: Option<String>,
    /// `start,end` day-of-year range.
    pub days: Option<String>,
    pub products: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct Inventory {
    family: SensorFamily,
    coverage: Arc<TileCoverage>,
    spatial: bool,
    filter: DateRangeFilter,
    legend: Vec<String>,
    data: BTreeMap<NaiveDate, Vec<TileDataset>>,
}

/// Outcome of linking every product of an inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub linked: usize,
    pub skipped: usize,
}

impl Inventory {
    /// Resolve tiles, scan their date directories and build one dataset per sensor
    /// for every date that passes the date filters.
    pub fn new(dataclass: &impl DataClass, query: &InventoryQuery) -> Result<Self> {
        let filter = DateRangeFilter::parse(query.dates.as_deref(), query.days.as_deref())?;
        let coverage = resolve_tiles(dataclass, query.region.as_ref(), query.tiles.as_deref())?;

        let mut dates = BTreeSet::new();
        for tile in coverage.keys() {
            for date in dataclass.find_dates(tile)? {
                if filter.contains(date) {
                    dates.insert(date);
                }
            }
        }
        debug!("{} tiles, {} matching dates", coverage.len(), dates.len());

        let coverage = Arc::new(coverage);
        let mut data = BTreeMap::new();
        for date in dates {
            let datasets = dataclass.construct(&coverage, date, query.products.as_deref())?;
            data.insert(date, datasets);
        }

        Ok(Self {
            family: dataclass.family().clone(),
            coverage,
            spatial: query.region.is_some() && query.tiles.is_none(),
            filter,
            legend: dataclass.sensor_names(),
            data,
        })
    }

    pub fn family(&self) -> &SensorFamily {
        &self.family
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.data.keys().copied().collect()
    }

    pub fn date_count(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Datasets of one date, in sensor order.
    pub fn get(&self, date: NaiveDate) -> Option<&[TileDataset]> {
        self.data.get(&date).map(Vec::as_slice)
    }

    pub fn dataset(&self, date: NaiveDate, sensor: &str) -> Option<&TileDataset> {
        self.get(date)?.iter().find(|ds| ds.sensor() == sensor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[TileDataset])> {
        self.data.iter().map(|(date, ds)| (*date, ds.as_slice()))
    }

    pub fn coverage(&self) -> &TileCoverage {
        &self.coverage
    }

    /// Whether tiles were selected by a region of interest.
    pub fn is_spatial(&self) -> bool {
        self.spatial
    }

    pub fn filter(&self) -> &DateRangeFilter {
        &self.filter
    }

    /// Sorted display names of every sensor of the family.
    pub fn legend(&self) -> &[String] {
        &self.legend
    }

    /// Products available on `date` from any sensor, sorted.
    pub fn products_for(&self, date: NaiveDate) -> Vec<String> {
        self.get(date)
            .unwrap_or_default()
            .iter()
            .flat_map(|ds| ds.available_products())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Mosaic file of `product` for `sensor`, per date where it exists.
    pub fn filenames(&self, sensor: &str, product: &str) -> BTreeMap<NaiveDate, PathBuf> {
        self.data
            .keys()
            .filter_map(|date| {
                let ds = self.dataset(*date, sensor)?;
                let path = ds.filename(product, None).ok()?;
                Some((*date, path.to_path_buf()))
            })
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.data
            .values()
            .flatten()
            .map(TileDataset::file_count)
            .sum()
    }

    /// Process every dataset, dates ascending and sensors in order. Product ids outside
    /// the family's catalog are rejected before anything runs.
    pub fn process(
        &mut self,
        processor: &impl Processor,
        products: &[String],
        options: &ProcessOptions,
    ) -> Result<ProcessSummary> {
        self.family.check_products(products)?;
        info!(
            "Requested {} products for {} files",
            products.len(),
            self.file_count()
        );
        let mut summary = ProcessSummary::default();
        for datasets in self.data.values_mut() {
            for ds in datasets.iter_mut() {
                summary += ds.process(processor, products, options);
            }
        }
        info!(
            "Completed processing: {} tiles processed, {} up to date, {} failed",
            summary.processed, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Mosaic products per date and sensor. Returns how many datasets failed.
    pub fn project(
        &mut self,
        processor: &impl Processor,
        products: &[String],
        options: &ProjectOptions,
    ) -> Result<usize> {
        self.family.check_products(products)?;
        info!("Preparing data for {} dates", self.date_count());
        let mut failed = 0;
        for datasets in self.data.values_mut() {
            for ds in datasets.iter_mut() {
                if let Err(e) = ds.project(processor, products, options) {
                    error!("{} {}: projection failed: {:#}", ds.sensor(), ds.date(), e);
                    failed += 1;
                }
            }
        }
        Ok(failed)
    }

    /// Link every tile product into `dest_dir`. Links that cannot be created, usually
    /// because they already exist, are skipped so that re-linking is harmless.
    pub fn create_links(&self, dest_dir: &Path, hard: bool) -> LinkSummary {
        let mut summary = LinkSummary::default();
        for ds in self.data.values().flatten() {
            for file in ds.files() {
                match links::link(file, dest_dir, hard) {
                    Ok(()) => summary.linked += 1,
                    Err(e) => {
                        debug!("Not linking {}: {}", file.display(), e);
                        summary.skipped += 1;
                    }
                }
            }
        }
        summary
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files = self.file_count();
        if files == 0 {
            write!(f, "Data Inventory: No matching files")
        } else {
            write!(
                f,
                "Data Inventory: {} files on {} dates",
                files,
                self.date_count()
            )
        }
    }
}
