use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Unable to transform geometry from {source_crs} to {target_crs}: {reason}")]
    CrsTransform {
        source_crs: String,
        target_crs: String,
        reason: String,
    },

    #[error("Region of interest has zero area")]
    DegenerateGeometry,

    #[error("Invalid date range '{0}'")]
    InvalidDateRange(String),

    #[error("Invalid day of year range '{0}'")]
    InvalidDayRange(String),

    #[error("Product '{product}' not found{}", tile_suffix(.tile))]
    ProductNotFound {
        product: String,
        tile: Option<String>,
    },

    #[error("Unknown product '{0}'")]
    UnknownProduct(String),

    #[error("Unknown sensor family '{0}'")]
    UnknownFamily(String),

    #[error("Invalid vector file {path}: {reason}")]
    InvalidVector { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlRead(#[from] toml::de::Error),

    #[error(transparent)]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

fn tile_suffix(tile: &Option<String>) -> String {
    match tile {
        Some(tile) => format!(" for tile {tile}"),
        None => " in mosaics".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
