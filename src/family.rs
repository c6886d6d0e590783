use crate::error::{ArchiveError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml;

use crate::date_range::format_date_dir;

pub mod landsat;
pub mod modis;

/// Names of the built-in family templates.
pub const BUILTIN: [&str; 2] = ["landsat", "modis"];

/// Immutable description of one sensor family's archive: where it lives, how its
/// tiles are addressed, which sensors and products it knows about.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SensorFamily {
    pub name: String,
    pub description: String,
    pub root: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_tile_width")]
    pub tile_width: usize,
    #[serde(default)]
    pub tiles: Option<TileVector>,
    pub sensors: Vec<Sensor>,
    pub products: Vec<Product>,
    #[serde(default)]
    pub processor: Option<ProcessorCommands>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TileVector {
    pub vector: PathBuf,
    pub attribute: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Sensor {
    pub code: String,
    pub name: String,
    /// Regex matching this sensor's raw files inside a date directory.
    #[serde(default)]
    pub raw: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Product {
    pub id: String,
    pub description: String,
}

/// Argument templates for the external processing program.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ProcessorCommands {
    pub process: Vec<String>,
    /// Appended to `process` when overviews are requested.
    #[serde(default)]
    pub overviews: Vec<String>,
    #[serde(default)]
    pub project: Vec<String>,
}

fn default_extension() -> String {
    "tif".to_string()
}

fn default_tile_width() -> usize {
    6
}

impl SensorFamily {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let family: Self = toml::from_str(&content)?;
        family.validate()?;
        Ok(family)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_template(table: &toml::Table) -> Result<Self> {
        let family: Self = toml::from_str(&table.to_string())?;
        family.validate()?;
        Ok(family)
    }

    pub fn builtin(name: &str) -> Result<Self> {
        match name {
            "landsat" => Self::from_template(&landsat::family_toml()),
            "modis" => Self::from_template(&modis::family_toml()),
            _ => Err(ArchiveError::UnknownFamily(name.to_string())),
        }
    }

    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = root.into();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.sensors.is_empty() {
            return Err(ArchiveError::Config(format!(
                "family '{}' declares no sensors",
                self.name
            )));
        }
        if self.tile_width == 0 {
            return Err(ArchiveError::Config("tile_width must be positive".into()));
        }
        Ok(())
    }

    pub fn sensor_name(&self, code: &str) -> Option<&str> {
        self.sensors
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.name.as_str())
    }

    /// Display names of every sensor, sorted.
    pub fn sensor_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sensors.iter().map(|s| s.name.clone()).collect();
        names.sort();
        names
    }

    /// Catalog product whose id is the longest prefix of `stem`.
    pub fn match_product(&self, stem: &str) -> Option<&str> {
        self.products
            .iter()
            .filter(|p| stem.starts_with(&p.id))
            .max_by_key(|p| p.id.len())
            .map(|p| p.id.as_str())
    }

    /// Fails on the first id that is not in the product catalog.
    pub fn check_products(&self, products: &[String]) -> Result<()> {
        match products
            .iter()
            .find(|p| !self.products.iter().any(|known| &known.id == *p))
        {
            Some(unknown) => Err(ArchiveError::UnknownProduct(unknown.clone())),
            None => Ok(()),
        }
    }

    /// `root/<tile>`, or `root/<tile>/<YYYYDDD>` when a date is given.
    pub fn path(&self, tile: &str, date: Option<NaiveDate>) -> PathBuf {
        let tile_dir = self.root.join(tile);
        match date {
            Some(date) => tile_dir.join(format_date_dir(date)),
            None => tile_dir,
        }
    }

    /// Conventional file name of a processed product.
    pub fn product_filename(
        &self,
        tile: &str,
        date: NaiveDate,
        sensor: &str,
        product: &str,
        suffix: &str,
    ) -> String {
        format!(
            "{tile}_{}_{sensor}_{product}{suffix}.{}",
            format_date_dir(date),
            self.extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_templates() {
        let landsat = SensorFamily::builtin("landsat").unwrap();
        assert_eq!(landsat.name, "landsat");
        assert_eq!(landsat.tile_width, 6);
        assert_eq!(landsat.sensors.len(), 3);
        assert!(landsat.tiles.is_some());

        let modis = SensorFamily::builtin("modis").unwrap();
        assert_eq!(modis.sensors[0].code, "MOD");

        assert!(matches!(
            SensorFamily::builtin("spot"),
            Err(ArchiveError::UnknownFamily(_))
        ));
    }

    #[test]
    fn test_write_and_read_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("landsat.toml");
        let family = SensorFamily::builtin("landsat").unwrap().with_root("/archive");
        family.write(&path).unwrap();

        let family = SensorFamily::read(&path).unwrap();
        assert_eq!(family.root, PathBuf::from("/archive"));
        assert_eq!(family.products.len(), landsat::family_toml()["products"].as_array().unwrap().len());
    }

    #[test]
    fn test_defaults_and_validation() {
        let family: SensorFamily = toml::from_str(
            r#"
            name = "test"
            description = "Test family"
            root = "/tmp"
            sensors = []
            products = []
            "#,
        )
        .unwrap();
        assert_eq!(family.extension, "tif");
        assert_eq!(family.tile_width, 6);
        assert!(family.validate().is_err());
    }

    #[test]
    fn test_match_product_prefers_longest() {
        let family = SensorFamily::builtin("landsat").unwrap();
        assert_eq!(family.match_product("toaref"), Some("toaref"));
        assert_eq!(family.match_product("toaref_v2"), Some("toaref"));
        assert_eq!(family.match_product("ndvi"), Some("ndvi"));
        assert_eq!(family.match_product("unknown"), None);
    }

    #[test]
    fn test_check_products() {
        let family = SensorFamily::builtin("landsat").unwrap();
        let known = vec!["toaref".to_string(), "ndvi".to_string()];
        assert!(family.check_products(&known).is_ok());
        let unknown = vec!["ndvi".to_string(), "toa".to_string()];
        assert!(matches!(
            family.check_products(&unknown),
            Err(ArchiveError::UnknownProduct(p)) if p == "toa"
        ));
    }

    #[test]
    fn test_paths() {
        let family = SensorFamily::builtin("landsat").unwrap().with_root("/archive");
        let date = NaiveDate::from_yo_opt(2015, 34).unwrap();
        assert_eq!(family.path("012034", None), PathBuf::from("/archive/012034"));
        assert_eq!(
            family.path("012034", Some(date)),
            PathBuf::from("/archive/012034/2015034")
        );
        assert_eq!(
            family.product_filename("012034", date, "LC8", "ndvi", "_test"),
            "012034_2015034_LC8_ndvi_test.tif"
        );
    }

    #[test]
    fn test_sensor_names() {
        let family = SensorFamily::builtin("landsat").unwrap();
        assert_eq!(family.sensor_name("LE7"), Some("Landsat 7"));
        assert_eq!(family.sensor_name("XYZ"), None);
        assert_eq!(family.sensor_names(), vec!["Landsat 5", "Landsat 7", "Landsat 8"]);
    }
}
