use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::debug;

use tile_archive::archive::archive_files;
use tile_archive::calendar::{render_calendar, CalendarOptions};
use tile_archive::logging;
use tile_archive::processor::{CommandProcessor, ProcessOptions, ProjectOptions};
use tile_archive::vector::Region;
use tile_archive::{Inventory, InventoryQuery, LocalArchive, SensorFamily};

/// Catalog and process tiled satellite imagery archived as root/<tile>/<YYYYDDD>/.
#[derive(Debug, Parser)]
#[command(name = "tile-archive", version, about)]
struct Cli {
    /// Built-in sensor family (landsat, modis)
    #[arg(long, default_value = "landsat")]
    family: String,

    /// Sensor family configuration file, instead of a built-in family
    #[arg(long)]
    config: Option<PathBuf>,

    /// Archive root directory
    #[arg(long, env = "TILE_ARCHIVE_ROOT")]
    root: Option<PathBuf>,

    /// Verbosity - 0: quiet, 1: normal, 2: debug
    #[arg(short, long, default_value_t = 1, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct InventoryArgs {
    /// Vector file for region of interest
    #[arg(short, long)]
    site: Option<PathBuf>,

    /// Tile designations
    #[arg(short, long, num_args = 1..)]
    tiles: Option<Vec<String>>,

    /// Range of dates (YYYY-MM-DD,YYYY-MM-DD)
    #[arg(short, long)]
    dates: Option<String>,

    /// Include data within these days of year (doy1,doy2)
    #[arg(long)]
    days: Option<String>,

    /// Process/filter these products
    #[arg(short, long, num_args = 1..)]
    products: Option<Vec<String>>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Get inventory
    Inventory {
        #[command(flatten)]
        filter: InventoryArgs,
        /// Show dates using MM-DD
        #[arg(long)]
        md: bool,
    },
    /// Process scenes
    Process {
        #[command(flatten)]
        filter: InventoryArgs,
        /// Overwrite output files if they exist
        #[arg(long)]
        overwrite: bool,
        /// Append string to end of filename (before extension)
        #[arg(long, default_value = "")]
        suffix: String,
        /// Add overviews to output
        #[arg(long)]
        overviews: bool,
    },
    /// Create project
    Project {
        #[command(flatten)]
        filter: InventoryArgs,
        /// Resolution of output rasters
        #[arg(long, num_args = 2, default_values_t = [30.0, 30.0])]
        res: Vec<f64>,
        /// Append string to end of filename (before extension)
        #[arg(long, default_value = "")]
        suffix: String,
        /// Directory for the mosaics
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Link to products
    Link {
        #[command(flatten)]
        filter: InventoryArgs,
        /// Create hard links instead of symbolic
        #[arg(long)]
        hard: bool,
    },
    /// Move files from a directory into the data archive
    Archive {
        #[arg(default_value = ".")]
        source: PathBuf,
    },
    /// List available products
    Products,
}

fn load_family(cli: &Cli) -> Result<SensorFamily> {
    let family = match &cli.config {
        Some(path) => SensorFamily::read(path)?,
        None => SensorFamily::builtin(&cli.family)?,
    };
    Ok(match &cli.root {
        Some(root) => family.with_root(root),
        None => family,
    })
}

fn query(filter: &InventoryArgs) -> Result<InventoryQuery> {
    let region = match &filter.site {
        Some(path) => Some(Region::read(path)?),
        None => None,
    };
    Ok(InventoryQuery {
        region,
        tiles: filter.tiles.clone(),
        dates: filter.dates.clone(),
        days: filter.days.clone(),
        products: filter.products.clone(),
    })
}

/// Build the inventory, or report the failure and exit with status 1.
fn inventory(archive: &LocalArchive, filter: &InventoryArgs) -> Inventory {
    match query(filter).and_then(|q| Ok(Inventory::new(archive, &q)?)) {
        Ok(inventory) => inventory,
        Err(e) => {
            eprintln!("Error getting inventory: {e}");
            debug!("{e:?}");
            std::process::exit(1);
        }
    }
}

fn requested_products(family: &SensorFamily, filter: &InventoryArgs) -> Result<Vec<String>> {
    let products = match &filter.products {
        Some(products) if !products.is_empty() => products.clone(),
        _ => bail!("No products requested, use --products"),
    };
    family.check_products(&products)?;
    Ok(products)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let family = load_family(&cli)?;

    let archive = LocalArchive::new(family.clone())?;

    match &cli.command {
        Commands::Inventory { filter, md } => {
            let inv = inventory(&archive, filter);
            let options = CalendarOptions {
                month_day: *md,
                products: filter.products.is_some(),
                color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
            };
            print!("{}", render_calendar(&inv, &options));
        }
        Commands::Process {
            filter,
            overwrite,
            suffix,
            overviews,
        } => {
            let products = requested_products(&family, filter)?;
            let processor = CommandProcessor::from_family(&family)?;
            let mut inv = inventory(&archive, filter);
            let options = ProcessOptions {
                overwrite: *overwrite,
                suffix: suffix.clone(),
                overviews: *overviews,
            };
            let summary = inv.process(&processor, &products, &options)?;
            if summary.failed > 0 {
                eprintln!("Error processing: {} tiles failed", summary.failed);
            }
        }
        Commands::Project {
            filter,
            res,
            suffix,
            output,
        } => {
            let products = requested_products(&family, filter)?;
            let processor = CommandProcessor::from_family(&family)?;
            let mut inv = inventory(&archive, filter);
            inv.process(&processor, &products, &ProcessOptions::default())?;

            // pick up what processing just wrote
            let mut inv = inventory(&archive, filter);
            let options = ProjectOptions {
                res: (res[0], res[1]),
                output_dir: output.clone(),
                suffix: suffix.clone(),
            };
            let failed = inv.project(&processor, &products, &options)?;
            if failed > 0 {
                eprintln!("Error projecting: {failed} datasets failed");
            }
        }
        Commands::Link { filter, hard } => {
            let inv = inventory(&archive, filter);
            let summary = inv.create_links(&std::env::current_dir()?, *hard);
            debug!("{} linked, {} skipped", summary.linked, summary.skipped);
        }
        Commands::Archive { source } => {
            let summary = archive_files(&archive, source)?;
            println!(
                "Archived {} files ({} already archived, {} not recognized)",
                summary.moved, summary.existing, summary.unrecognized
            );
        }
        Commands::Products => {
            println!("{} available products:", family.name);
            for product in &family.products {
                println!("    {:<20}{}", product.id, product.description);
            }
            std::process::exit(1);
        }
    }

    Ok(())
}
