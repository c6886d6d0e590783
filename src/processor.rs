//! The raster processing collaborator.
//!
//! The archive only decides *what* needs producing and records *where* results land;
//! producing the rasters is the job of a [`Processor`]. [`CommandProcessor`] drives an
//! external program configured per sensor family.
use crate::date_range::format_date_dir;
use crate::family::{ProcessorCommands, SensorFamily};
use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Product id -> file.
pub type ProductFiles = BTreeMap<String, PathBuf>;

#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub overwrite: bool,
    /// Appended to the file name, before the extension.
    pub suffix: String,
    pub overviews: bool,
}

#[derive(Debug, Clone)]
pub struct ProjectOptions {
    /// Output pixel size (x, y).
    pub res: (f64, f64),
    pub output_dir: PathBuf,
    pub suffix: String,
}

/// Bring one tile of a (sensor, date) dataset up to date.
pub struct ProcessRequest<'a> {
    pub family: &'a SensorFamily,
    pub sensor: &'a str,
    pub date: NaiveDate,
    pub tile: &'a str,
    /// Products to create.
    pub products: &'a [String],
    /// Products already on disk for this tile.
    pub existing: &'a ProductFiles,
    pub options: &'a ProcessOptions,
}

impl ProcessRequest<'_> {
    pub fn input_dir(&self) -> PathBuf {
        self.family.path(self.tile, Some(self.date))
    }

    /// Where `product` is expected to be written.
    pub fn output_path(&self, product: &str) -> PathBuf {
        let name = self.family.product_filename(
            self.tile,
            self.date,
            self.sensor,
            product,
            &self.options.suffix,
        );
        self.input_dir().join(name)
    }
}

/// Mosaic one product of a (sensor, date) dataset across its tiles.
pub struct ProjectRequest<'a> {
    pub family: &'a SensorFamily,
    pub sensor: &'a str,
    pub date: NaiveDate,
    pub product: &'a str,
    pub inputs: Vec<&'a Path>,
    pub options: &'a ProjectOptions,
}

impl ProjectRequest<'_> {
    pub fn output_path(&self) -> PathBuf {
        let name = format!(
            "{}_{}_{}{}.{}",
            format_date_dir(self.date),
            self.sensor,
            self.product,
            self.options.suffix,
            self.family.extension
        );
        self.options.output_dir.join(name)
    }
}

pub trait Processor {
    /// Create the requested products for one tile, returning the files written.
    fn process(&self, request: &ProcessRequest<'_>) -> Result<ProductFiles>;

    /// Create a mosaic of one product, returning the file written.
    fn project(&self, request: &ProjectRequest<'_>) -> Result<PathBuf>;
}

/// Runs the family's configured processing program once per product.
///
/// Placeholders in the argument templates: `{input_dir}`, `{tile}`, `{date}`,
/// `{sensor}`, `{product}`, `{output}`, `{suffix}`, `{res}`, and `{inputs}` which
/// expands to one argument per input file.
pub struct CommandProcessor {
    commands: ProcessorCommands,
}

impl CommandProcessor {
    pub fn new(commands: ProcessorCommands) -> Self {
        Self { commands }
    }

    pub fn from_family(family: &SensorFamily) -> Result<Self> {
        let commands = family
            .processor
            .clone()
            .ok_or(anyhow!("No processor configured for family '{}'", family.name))?;
        Ok(Self::new(commands))
    }
}

impl Processor for CommandProcessor {
    fn process(&self, request: &ProcessRequest<'_>) -> Result<ProductFiles> {
        let mut created = ProductFiles::new();
        for product in request.products {
            let output = request.output_path(product);
            let input_dir = request.input_dir();
            let date = format_date_dir(request.date);
            let vars = [
                ("{input_dir}", input_dir.to_string_lossy().to_string()),
                ("{tile}", request.tile.to_string()),
                ("{date}", date),
                ("{sensor}", request.sensor.to_string()),
                ("{product}", product.clone()),
                ("{output}", output.to_string_lossy().to_string()),
                ("{suffix}", request.options.suffix.clone()),
            ];
            let mut template = self.commands.process.clone();
            if request.options.overviews {
                template.extend(self.commands.overviews.iter().cloned());
            }
            run(&expand(&template, &vars, &[])?)?;
            if !output.exists() {
                bail!("Processor reported success but {} is missing", output.display());
            }
            created.insert(product.clone(), output);
        }
        Ok(created)
    }

    fn project(&self, request: &ProjectRequest<'_>) -> Result<PathBuf> {
        if self.commands.project.is_empty() {
            bail!("No project command configured for family '{}'", request.family.name);
        }
        let output = request.output_path();
        let (xres, yres) = request.options.res;
        let vars = [
            ("{date}", format_date_dir(request.date)),
            ("{sensor}", request.sensor.to_string()),
            ("{product}", request.product.to_string()),
            ("{output}", output.to_string_lossy().to_string()),
            ("{suffix}", request.options.suffix.clone()),
            ("{res}", format!("{xres},{yres}")),
        ];
        let inputs: Vec<String> = request
            .inputs
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        run(&expand(&self.commands.project, &vars, &inputs)?)?;
        if !output.exists() {
            bail!("Processor reported success but {} is missing", output.display());
        }
        Ok(output)
    }
}

fn expand(template: &[String], vars: &[(&str, String)], inputs: &[String]) -> Result<Vec<String>> {
    if template.is_empty() {
        bail!("Empty processor command");
    }
    let mut args = vec![];
    for arg in template {
        if arg == "{inputs}" {
            args.extend(inputs.iter().cloned());
            continue;
        }
        let expanded = vars
            .iter()
            .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value));
        args.push(expanded);
    }
    Ok(args)
}

fn run(args: &[String]) -> Result<()> {
    let (program, rest) = args.split_first().ok_or(anyhow!("Empty processor command"))?;
    debug!("Running {} {}", program, rest.join(" "));
    let output = Command::new(program).args(rest).output()?;
    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
