//! Text rendering of an inventory: a per-year calendar of dates colored by sensor,
//! followed by the sensor legend, a summary line and tile coverage.
use crate::inventory::Inventory;
use chrono::Datelike;
use owo_colors::{AnsiColors, OwoColorize};
use std::fmt::Write;

const PALETTE: [AnsiColors; 6] = [
    AnsiColors::BrightYellow,
    AnsiColors::BrightRed,
    AnsiColors::BrightGreen,
    AnsiColors::BrightBlue,
    AnsiColors::BrightMagenta,
    AnsiColors::BrightCyan,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarOptions {
    /// Show dates as month-day instead of day of year.
    pub month_day: bool,
    /// List the available products after each date.
    pub products: bool,
    pub color: bool,
}

fn paint(text: &str, color: Option<AnsiColors>) -> String {
    match color {
        Some(color) => text.color(color).to_string(),
        None => text.to_string(),
    }
}

pub fn render_calendar(inventory: &Inventory, options: &CalendarOptions) -> String {
    let color_of = |name: &str| -> Option<AnsiColors> {
        if !options.color {
            return None;
        }
        let index = inventory.legend().iter().position(|n| n == name)?;
        Some(PALETTE[index % PALETTE.len()])
    };

    let mut out = String::new();
    let mut year = None;
    for (date, datasets) in inventory.iter() {
        let day = if options.month_day {
            format!("{}-{}", date.month(), date.day())
        } else {
            format!("{:03}", date.ordinal())
        };
        if year != Some(date.year()) {
            let _ = write!(out, "\n{:>5}: ", date.year());
            if options.products {
                out.push_str("\n ");
            }
            year = Some(date.year());
        }

        let mut color = None;
        for ds in datasets {
            let name = ds.family().sensor_name(ds.sensor()).unwrap_or(ds.sensor());
            color = color_of(name);
            out.push_str(&paint(&format!("{day:<6}"), color));
        }
        if options.products {
            out.push_str("        ");
            for product in inventory.products_for(date) {
                out.push_str(&paint(&format!("{product:<12}"), color));
            }
            out.push_str("\n ");
        }
    }
    out.push('\n');

    for name in inventory.legend() {
        out.push_str(&paint(name, color_of(name)));
        out.push('\n');
    }
    let _ = writeln!(out, "{inventory}");

    if inventory.is_spatial() {
        out.push_str("Tile Coverage:\n");
        for (tile, weight) in inventory.coverage() {
            let _ = writeln!(out, "{}: {:>3.0}%", tile, weight * 100.0);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataclass::LocalArchive;
    use crate::family::SensorFamily;
    use crate::inventory::InventoryQuery;
    use std::fs;
    use tempfile::TempDir;

    fn inventory(files: &[&str]) -> (TempDir, Inventory) {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"").unwrap();
        }
        let family = SensorFamily::builtin("landsat").unwrap().with_root(dir.path());
        let archive = LocalArchive::new(family).unwrap();
        let inv = Inventory::new(&archive, &InventoryQuery::default()).unwrap();
        (dir, inv)
    }

    #[test]
    fn test_plain_calendar() {
        let (_dir, inv) = inventory(&[
            "000001/2019360/000001_2019360_LC8_toaref.tif",
            "000001/2020005/000001_2020005_LC8_toaref.tif",
            "000001/2020005/000001_2020005_LE7_ndvi.tif",
        ]);
        let text = render_calendar(&inv, &CalendarOptions::default());
        let expected = "\n 2019: 360   \n 2020: 005   005   \n\
                        Landsat 5\nLandsat 7\nLandsat 8\n\
                        Data Inventory: 3 files on 2 dates\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_month_day_and_products() {
        let (_dir, inv) = inventory(&[
            "000001/2020034/000001_2020034_LC8_toaref.tif",
            "000001/2020034/000001_2020034_LC8_ndvi.tif",
        ]);
        let options = CalendarOptions {
            month_day: true,
            products: true,
            color: false,
        };
        let text = render_calendar(&inv, &options);
        assert!(text.starts_with("\n 2020: \n 2-3           ndvi        toaref      \n \n"));
    }

    #[test]
    fn test_colored_calendar() {
        let (_dir, inv) = inventory(&["000001/2020005/000001_2020005_LC8_toaref.tif"]);
        let options = CalendarOptions {
            color: true,
            ..Default::default()
        };
        let text = render_calendar(&inv, &options);
        // Landsat 8 is third in the legend
        assert!(text.contains(&"005   ".color(AnsiColors::BrightGreen).to_string()));
        assert!(text.contains(&"Landsat 5".color(AnsiColors::BrightYellow).to_string()));
    }
}
