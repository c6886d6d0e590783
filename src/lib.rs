pub mod archive;
pub mod calendar;
pub mod coverage;
pub mod dataclass;
pub mod dataset;
pub mod date_range;
pub mod error;
pub mod family;
pub mod inventory;
pub mod links;
pub mod logging;
pub mod processor;
pub mod projection;
pub mod vector;

pub use dataclass::{DataClass, LocalArchive};
pub use dataset::TileDataset;
pub use error::{ArchiveError, Result};
pub use family::SensorFamily;
pub use inventory::{Inventory, InventoryQuery};
