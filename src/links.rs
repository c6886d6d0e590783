//! Links to archived products from a working directory.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sidecar metadata file written next to a raster.
pub fn aux_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".aux.xml");
    PathBuf::from(name)
}

/// Link `file` into `dest_dir` under its own file name, together with its `.aux.xml`
/// sidecar when there is one. The sidecar is tried even when the raster link fails,
/// so a partly linked directory gets completed. Returns the first error.
pub fn link(file: &Path, dest_dir: &Path, hard: bool) -> io::Result<()> {
    let raster = link_one(file, dest_dir, hard);
    let aux = aux_path(file);
    let sidecar = if aux.is_file() {
        link_one(&aux, dest_dir, hard)
    } else {
        Ok(())
    };
    raster.and(sidecar)
}

fn link_one(file: &Path, dest_dir: &Path, hard: bool) -> io::Result<()> {
    let name = file.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{} has no file name", file.display()))
    })?;
    let target = dest_dir.join(name);
    if hard {
        fs::hard_link(file, target)
    } else {
        symlink(file, &target)
    }
}

#[cfg(unix)]
fn symlink(file: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(file, target)
}

#[cfg(windows)]
fn symlink(file: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(file, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dest).unwrap();
        (dir, src, dest)
    }

    #[test]
    fn test_aux_path() {
        assert_eq!(aux_path(Path::new("/a/b.tif")), PathBuf::from("/a/b.tif.aux.xml"));
    }

    #[test]
    fn test_symlink_with_sidecar() {
        let (_dir, src, dest) = setup();
        let file = src.join("a.tif");
        fs::write(&file, b"data").unwrap();
        fs::write(aux_path(&file), b"<xml/>").unwrap();

        link(&file, &dest, false).unwrap();
        let linked = dest.join("a.tif");
        assert!(fs::symlink_metadata(&linked).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&linked).unwrap(), file);
        assert!(dest.join("a.tif.aux.xml").exists());
    }

    #[test]
    fn test_hard_link_without_sidecar() {
        let (_dir, src, dest) = setup();
        let file = src.join("b.tif");
        fs::write(&file, b"data").unwrap();

        link(&file, &dest, true).unwrap();
        assert_eq!(fs::read(dest.join("b.tif")).unwrap(), b"data");
        assert!(!dest.join("b.tif.aux.xml").exists());
    }

    #[test]
    fn test_existing_link_is_an_error() {
        let (_dir, src, dest) = setup();
        let file = src.join("c.tif");
        fs::write(&file, b"data").unwrap();
        link(&file, &dest, false).unwrap();
        let err = link(&file, &dest, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_relink_completes_sidecar() {
        let (_dir, src, dest) = setup();
        let file = src.join("d.tif");
        fs::write(&file, b"data").unwrap();
        link(&file, &dest, true).unwrap();

        // sidecar written after the raster was linked
        fs::write(aux_path(&file), b"<xml/>").unwrap();
        let err = link(&file, &dest, true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(dest.join("d.tif.aux.xml")).unwrap(), b"<xml/>");
    }
}
