use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use pdp11_core::peripherals::DISK_BYTES;

/// Opens an existing image for reading and writing.
///
/// Images shorter than a full pack are accepted: sectors past the end read
/// as zeroes and writes extend the file.
///
/// # Errors
///
/// The file is missing, unreadable or not writable.
pub fn open_disk_image(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("opening disk image {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("reading metadata of {}", path.display()))?
        .len();
    if len > DISK_BYTES {
        log::warn!(
            "{}: {len} bytes is larger than an RK05 pack ({DISK_BYTES}); the tail is unreachable",
            path.display()
        );
    } else if len < DISK_BYTES {
        log::info!("{}: {len} of {DISK_BYTES} bytes present", path.display());
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::open_disk_image;

    #[test]
    fn opens_short_image() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0; 512]).unwrap();
        let opened = open_disk_image(file.path()).unwrap();
        assert_eq!(opened.metadata().unwrap().len(), 512);
    }

    #[test]
    fn missing_image_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rk9");
        let err = open_disk_image(&path).unwrap_err();
        assert!(format!("{err:#}").contains("rk9"));
    }
}
