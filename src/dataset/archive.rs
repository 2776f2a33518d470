use indicatif::{ProgressFinish, ProgressIterator};
use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::error::Result;
use crate::progress_bar::progress_bar_style;

/// Extract a zip archive into `dest`. Returns the number of files written.
///
/// Entries whose names would land outside `dest` are skipped.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    fs::create_dir_all(dest)?;

    let mut written = 0;
    for idx in (0..archive.len())
        .progress_with_style(progress_bar_style())
        .with_message("Extracting dataset")
        .with_finish(ProgressFinish::WithMessage("Extracted".into()))
    {
        let mut entry = archive.by_index(idx)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping unsafe archive entry: {:?}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_nested_entries() {
        let temp_dir = TempDir::new().unwrap();
        let zip_path = temp_dir.path().join("roboflow.zip");
        write_zip(
            &zip_path,
            &[
                ("data.yaml", "names: [pawn]\n"),
                ("train/images/a.jpg", "jpg"),
                ("train/labels/a.txt", "0 0.5 0.5 0.1 0.1"),
            ],
        );

        let dest = temp_dir.path().join("chess-1");
        let count = extract_zip(&zip_path, &dest).unwrap();
        assert_eq!(count, 3);
        assert!(dest.join("data.yaml").is_file());
        assert_eq!(
            fs::read_to_string(dest.join("train/labels/a.txt")).unwrap(),
            "0 0.5 0.5 0.1 0.1"
        );
    }

    #[test]
    fn test_escaping_entry_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let zip_path = temp_dir.path().join("evil.zip");
        write_zip(&zip_path, &[("../outside.txt", "x"), ("ok.txt", "y")]);

        let dest = temp_dir.path().join("out");
        let count = extract_zip(&zip_path, &dest).unwrap();
        assert_eq!(count, 1);
        assert!(!temp_dir.path().join("outside.txt").exists());
        assert!(dest.join("ok.txt").is_file());
    }

    #[test]
    fn test_not_a_zip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.zip");
        fs::write(&path, "not a zip").unwrap();
        assert!(extract_zip(&path, temp_dir.path()).is_err());
    }
}
