//! Filing loose files into the archive hierarchy.
use crate::dataclass::{DataClass, LocalArchive};
use crate::dataset::{parse_product_file, sorted_file_names};
use crate::date_range::parse_date_dir;
use crate::error::Result;
use crate::links::aux_path;
use chrono::NaiveDate;
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub moved: usize,
    /// Already present in the archive; left where they were.
    pub existing: usize,
    pub unrecognized: usize,
}

/// Tile and date of a file named by the product convention or a sensor's raw pattern.
pub fn locate(archive: &LocalArchive, name: &str) -> Option<(String, NaiveDate)> {
    let re = Regex::new(r"^(?<tile>[^_]+)_(?<date>\d{7})_")
        .expect("Regex pattern should always compile");
    if let Some(captures) = re.captures(name) {
        let tile = &captures["tile"];
        if let Some(date) = parse_date_dir(&captures["date"]) {
            if parse_product_file(archive.family(), tile, date, name).is_some() {
                return Some((tile.to_string(), date));
            }
        }
    }
    archive.raw_location(name)
}

/// Move every recognizable file of `source` to `root/<tile>/<YYYYDDD>/`, together with
/// its `.aux.xml` sidecar.
pub fn archive_files(archive: &LocalArchive, source: &Path) -> Result<ArchiveSummary> {
    let mut summary = ArchiveSummary::default();
    for name in sorted_file_names(source)? {
        let src = source.join(&name);
        if !src.exists() {
            // sidecar already moved with its raster
            continue;
        }
        let Some((tile, date)) = locate(archive, &name) else {
            debug!("Not archiving {}", name);
            summary.unrecognized += 1;
            continue;
        };
        let dest_dir = archive.family().path(&tile, Some(date));
        let dest = dest_dir.join(&name);
        if dest.exists() {
            warn!("{} already archived", dest.display());
            summary.existing += 1;
            continue;
        }
        fs::create_dir_all(&dest_dir)?;
        move_file(&src, &dest)?;
        let aux = aux_path(&src);
        if aux.is_file() {
            move_file(&aux, &aux_path(&dest))?;
        }
        info!("{} -> {}", name, dest_dir.display());
        summary.moved += 1;
    }
    Ok(summary)
}

fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    // rename fails across filesystems
    if fs::rename(src, dest).is_err() {
        fs::copy(src, dest)?;
        fs::remove_file(src)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::SensorFamily;
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> (TempDir, TempDir, LocalArchive) {
        let root = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        for file in files {
            fs::write(source.path().join(file), b"x").unwrap();
        }
        let family = SensorFamily::builtin("landsat").unwrap().with_root(root.path());
        (root, source, LocalArchive::new(family).unwrap())
    }

    #[test]
    fn test_locate() {
        let (_root, _source, archive) = setup(&[]);
        let date = NaiveDate::from_yo_opt(2015, 34).unwrap();
        assert_eq!(
            locate(&archive, "042034_2015034_LC8_ndvi.tif"),
            Some(("042034".to_string(), date))
        );
        assert_eq!(
            locate(&archive, "LC80420342015034LGN00.tar.gz"),
            Some(("042034".to_string(), date))
        );
        assert_eq!(locate(&archive, "042034_2015034_LC8_bogus.tif"), None);
        assert_eq!(locate(&archive, "readme.txt"), None);
    }

    #[test]
    fn test_archive_files() {
        let (root, source, archive) = setup(&[
            "042034_2015034_LC8_ndvi.tif",
            "042034_2015034_LC8_ndvi.tif.aux.xml",
            "LC80420352015034LGN00.tar.gz",
            "readme.txt",
        ]);
        let summary = archive_files(&archive, source.path()).unwrap();
        assert_eq!(summary.moved, 2);
        assert_eq!(summary.existing, 0);
        // the sidecar went along with its raster; only the readme is left
        assert_eq!(summary.unrecognized, 1);

        let day = root.path().join("042034/2015034");
        assert!(day.join("042034_2015034_LC8_ndvi.tif").is_file());
        assert!(day.join("042034_2015034_LC8_ndvi.tif.aux.xml").is_file());
        assert!(root.path().join("042035/2015034/LC80420352015034LGN00.tar.gz").is_file());
        assert_eq!(sorted_file_names(source.path()).unwrap(), vec!["readme.txt"]);
    }

    #[test]
    fn test_archive_leaves_existing() {
        let (root, source, archive) = setup(&["042034_2015034_LC8_ndvi.tif"]);
        let day = root.path().join("042034/2015034");
        fs::create_dir_all(&day).unwrap();
        fs::write(day.join("042034_2015034_LC8_ndvi.tif"), b"old").unwrap();

        let summary = archive_files(&archive, source.path()).unwrap();
        assert_eq!(summary, ArchiveSummary { moved: 0, existing: 1, unrecognized: 0 });
        assert_eq!(fs::read(day.join("042034_2015034_LC8_ndvi.tif")).unwrap(), b"old");
        assert!(source.path().join("042034_2015034_LC8_ndvi.tif").is_file());
    }
}
