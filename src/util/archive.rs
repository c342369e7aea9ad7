//! Zip archive reading and deterministic writing.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Seek, Write};
use std::path::{Component, Path};

use anyhow::{Context, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::util::fs::{ensure_dir, list_files_sorted};

/// Permissions recorded for every archived file.
const FILE_MODE: u32 = 0o644;

/// Extract a zip archive into `dest`, refusing entries that escape it.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive: {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("failed to read archive: {}", archive_path.display()))?;

    ensure_dir(dest)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .with_context(|| format!("invalid entry name `{}`", entry.name()))?;
        let dest_path = dest.join(relative);

        if entry.is_dir() {
            ensure_dir(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            ensure_dir(parent)?;
        }
        let mut out = File::create(&dest_path)
            .with_context(|| format!("failed to create {}", dest_path.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("failed to extract {}", dest_path.display()))?;
    }

    Ok(())
}

/// Archive entry name for a relative path: always `/` separated.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Zip every file under `root` into `out` and flush it.
fn zip_tree<W: Write + Seek>(root: &Path, out: W) -> Result<()> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(FILE_MODE);

    let mut writer = ZipWriter::new(out);
    for relative in list_files_sorted(root)? {
        writer.start_file(entry_name(&relative), options)?;
        let mut input = File::open(root.join(&relative))
            .with_context(|| format!("failed to open {}", root.join(&relative).display()))?;
        io::copy(&mut input, &mut writer)?;
    }
    writer.finish()?.flush()?;
    Ok(())
}

/// Zip every file under `root` into `archive_path`.
///
/// Entries are sorted and carry a fixed timestamp and mode, so the same tree
/// always produces the same bytes. The archive is written to a temporary
/// file next to the destination and renamed into place.
pub fn write_zip_deterministic(root: &Path, archive_path: &Path) -> Result<()> {
    let parent = archive_path
        .parent()
        .with_context(|| format!("archive path has no parent: {}", archive_path.display()))?;
    ensure_dir(parent)?;

    let temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
    zip_tree(root, BufWriter::new(temp.as_file()))
        .with_context(|| format!("failed to write archive: {}", archive_path.display()))?;

    if archive_path.exists() {
        fs::remove_file(archive_path)
            .with_context(|| format!("failed to replace {}", archive_path.display()))?;
    }
    temp.persist(archive_path)
        .with_context(|| format!("failed to write archive: {}", archive_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(root: &Path) {
        fs::create_dir_all(root.join("prefab/modules/z")).unwrap();
        fs::write(root.join("prefab/prefab.json"), "{}").unwrap();
        fs::write(root.join("prefab/modules/z/module.json"), "{}").unwrap();
        fs::write(root.join("AndroidManifest.xml"), "<manifest/>").unwrap();
    }

    #[test]
    fn test_zip_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("tree");
        tree(&root);

        let first = tmp.path().join("out/first.aar");
        let second = tmp.path().join("out/second.aar");
        write_zip_deterministic(&root, &first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        write_zip_deterministic(&root, &second).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_zip_entries_sorted_and_extractable() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("tree");
        tree(&root);
        let archive = tmp.path().join("pkg.aar");
        write_zip_deterministic(&root, &archive).unwrap();

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "AndroidManifest.xml",
                "prefab/modules/z/module.json",
                "prefab/prefab.json"
            ]
        );

        let out = tmp.path().join("extracted");
        extract_zip(&archive, &out).unwrap();
        assert_eq!(
            fs::read_to_string(out.join("AndroidManifest.xml")).unwrap(),
            "<manifest/>"
        );
    }

    /// Accepts writes but fails to flush, like a full disk behind a buffer.
    struct UnflushableCursor(io::Cursor<Vec<u8>>);

    impl Write for UnflushableCursor {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("no space left on device"))
        }
    }

    impl Seek for UnflushableCursor {
        fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
            self.0.seek(pos)
        }
    }

    #[test]
    fn test_flush_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("prefab.json"), "{}").unwrap();

        let err = zip_tree(tmp.path(), UnflushableCursor(io::Cursor::new(Vec::new())))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("no space left"));
    }

    #[test]
    fn test_overwrites_existing_archive() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("tree");
        tree(&root);
        let archive = tmp.path().join("pkg.aar");
        fs::write(&archive, "stale").unwrap();

        write_zip_deterministic(&root, &archive).unwrap();
        assert!(ZipArchive::new(File::open(&archive).unwrap()).is_ok());
    }
}
