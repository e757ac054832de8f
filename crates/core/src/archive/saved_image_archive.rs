use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::domain::image_writer::ImageWriter;
use crate::shared::constants::{
    ARCHIVE_FILE_NAME, ARCHIVE_MIME_TYPE, SAVED_IMAGE_EXTENSION, SAVED_IMAGE_PREFIX,
};
use crate::shared::frame::Frame;

/// Seconds since the Unix epoch, used to name saved images.
pub type Clock = Box<dyn Fn() -> u64 + Send>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to save image {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Saved image {0} was not found after writing")]
    Unconfirmed(PathBuf),

    #[error("Failed to read saved image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write archive {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Annotated frames saved during a session, in the order they were saved.
///
/// A path is recorded only after the image has been written and confirmed
/// to exist. Recorded paths are never reordered or removed.
pub struct SavedImageArchive {
    output_dir: PathBuf,
    writer: Box<dyn ImageWriter>,
    clock: Clock,
    saved: Vec<PathBuf>,
}

impl SavedImageArchive {
    pub fn new(output_dir: impl Into<PathBuf>, writer: Box<dyn ImageWriter>) -> Self {
        Self::with_clock(output_dir, writer, Box::new(unix_now))
    }

    pub fn with_clock(
        output_dir: impl Into<PathBuf>,
        writer: Box<dyn ImageWriter>,
        clock: Clock,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            writer,
            clock,
            saved: Vec::new(),
        }
    }

    pub fn saved_paths(&self) -> &[PathBuf] {
        &self.saved
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    /// `<output_dir>/images.zip`
    pub fn default_archive_path(&self) -> PathBuf {
        self.output_dir.join(ARCHIVE_FILE_NAME)
    }

    /// Writes `frame` as `detected_faces_<unixtime>.jpg` and records the
    /// path once the file is confirmed on disk.
    pub fn save_current(&mut self, frame: &Frame) -> Result<PathBuf, ArchiveError> {
        let path = self.next_path((self.clock)());

        self.writer
            .write(&path, frame)
            .map_err(|e| ArchiveError::Write {
                path: path.clone(),
                message: e.to_string(),
            })?;

        if !path.is_file() {
            return Err(ArchiveError::Unconfirmed(path));
        }

        log::debug!("Saved annotated frame {} to {}", frame.index(), path.display());
        self.saved.push(path.clone());
        Ok(path)
    }

    /// Zips every recorded image into memory, one DEFLATE entry per path
    /// named by its base filename. `None` when nothing has been saved.
    pub fn build_archive(&self) -> Result<Option<Vec<u8>>, ArchiveError> {
        if self.saved.is_empty() {
            return Ok(None);
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for path in &self.saved {
            let bytes = std::fs::read(path).map_err(|source| ArchiveError::Read {
                path: path.clone(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());
            zip.start_file(name, options)?;
            zip.write_all(&bytes).map_err(zip::result::ZipError::Io)?;
        }

        let cursor = zip.finish()?;
        Ok(Some(cursor.into_inner()))
    }

    /// Builds the archive and writes it to `dest`. Returns `None` without
    /// touching the filesystem when nothing has been saved.
    pub fn export_archive(&self, dest: &Path) -> Result<Option<PathBuf>, ArchiveError> {
        let Some(bytes) = self.build_archive()? else {
            return Ok(None);
        };

        let export_err = |source| ArchiveError::Export {
            path: dest.to_path_buf(),
            source,
        };
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(export_err)?;
        }
        std::fs::write(dest, bytes).map_err(export_err)?;

        log::info!(
            "Exported {} image(s) to {} ({ARCHIVE_MIME_TYPE})",
            self.saved.len(),
            dest.display()
        );
        Ok(Some(dest.to_path_buf()))
    }

    /// Adds a `_<n>` suffix when two saves land in the same second.
    fn next_path(&self, timestamp: u64) -> PathBuf {
        let stem = format!("{SAVED_IMAGE_PREFIX}{timestamp}");
        let mut path = self
            .output_dir
            .join(format!("{stem}.{SAVED_IMAGE_EXTENSION}"));
        let mut n = 1;
        while self.saved.contains(&path) {
            path = self
                .output_dir
                .join(format!("{stem}_{n}.{SAVED_IMAGE_EXTENSION}"));
            n += 1;
        }
        path
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::archive::infrastructure::jpeg_file_writer::JpegFileWriter;
    use rstest::rstest;
    use std::io::Read;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Reports success without creating anything on disk.
    pub(crate) struct PhantomWriter;

    impl ImageWriter for PhantomWriter {
        fn write(&self, _path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    struct FailingWriter;

    impl ImageWriter for FailingWriter {
        fn write(&self, _path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            Err("disk full".into())
        }
    }

    fn fixed_clock(secs: u64) -> Clock {
        Box::new(move || secs)
    }

    fn make_frame() -> Frame {
        Frame::new(vec![90; 8 * 8 * 3], 8, 8, 3, 0)
    }

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_save_names_file_by_unix_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = SavedImageArchive::with_clock(
            dir.path(),
            Box::new(JpegFileWriter::default()),
            fixed_clock(1_700_000_000),
        );

        let path = archive.save_current(&make_frame()).unwrap();

        assert_eq!(path, dir.path().join("detected_faces_1700000000.jpg"));
        assert!(path.is_file());
        assert_eq!(archive.saved_paths(), &[path]);
    }

    #[test]
    fn test_save_without_file_on_disk_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive =
            SavedImageArchive::with_clock(dir.path(), Box::new(PhantomWriter), fixed_clock(5));

        let err = archive.save_current(&make_frame()).unwrap_err();

        assert!(matches!(err, ArchiveError::Unconfirmed(_)));
        assert!(archive.is_empty());
    }

    #[test]
    fn test_write_failure_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive =
            SavedImageArchive::with_clock(dir.path(), Box::new(FailingWriter), fixed_clock(5));

        let err = archive.save_current(&make_frame()).unwrap_err();

        assert!(err.to_string().contains("disk full"));
        assert!(archive.is_empty());
    }

    #[test]
    fn test_same_second_saves_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = SavedImageArchive::with_clock(
            dir.path(),
            Box::new(JpegFileWriter::default()),
            fixed_clock(42),
        );

        let paths: Vec<PathBuf> = (0..3)
            .map(|_| archive.save_current(&make_frame()).unwrap())
            .collect();

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "detected_faces_42.jpg",
                "detected_faces_42_1.jpg",
                "detected_faces_42_2.jpg"
            ]
        );
    }

    #[test]
    fn test_build_archive_empty_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let archive = SavedImageArchive::new(dir.path(), Box::new(JpegFileWriter::default()));
        assert!(archive.build_archive().unwrap().is_none());
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    fn test_build_archive_has_one_entry_per_saved_path(#[case] saves: u64) {
        let dir = tempfile::tempdir().unwrap();
        let tick = Arc::new(AtomicU64::new(100));
        let clock_tick = tick.clone();
        let mut archive = SavedImageArchive::with_clock(
            dir.path().join("out"),
            Box::new(JpegFileWriter::default()),
            Box::new(move || clock_tick.fetch_add(1, Ordering::SeqCst)),
        );
        for _ in 0..saves {
            archive.save_current(&make_frame()).unwrap();
        }

        let bytes = archive.build_archive().unwrap().unwrap();

        let expected: Vec<String> = (100..100 + saves)
            .map(|t| format!("detected_faces_{t}.jpg"))
            .collect();
        assert_eq!(entry_names(bytes), expected);
    }

    #[test]
    fn test_archive_entries_match_saved_bytes_and_use_deflate() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = SavedImageArchive::with_clock(
            dir.path(),
            Box::new(JpegFileWriter::default()),
            fixed_clock(7),
        );
        let path = archive.save_current(&make_frame()).unwrap();

        let bytes = archive.build_archive().unwrap().unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = zip.by_index(0).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, std::fs::read(path).unwrap());
    }

    #[test]
    fn test_build_archive_fails_when_saved_file_vanished() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = SavedImageArchive::with_clock(
            dir.path(),
            Box::new(JpegFileWriter::default()),
            fixed_clock(9),
        );
        let path = archive.save_current(&make_frame()).unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = archive.build_archive().unwrap_err();
        assert!(matches!(err, ArchiveError::Read { .. }));
        assert_eq!(archive.saved_paths().len(), 1);
    }

    #[test]
    fn test_export_archive_writes_zip() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = SavedImageArchive::with_clock(
            dir.path(),
            Box::new(JpegFileWriter::default()),
            fixed_clock(11),
        );
        archive.save_current(&make_frame()).unwrap();
        let dest = archive.default_archive_path();

        let written = archive.export_archive(&dest).unwrap();

        assert_eq!(written.as_deref(), Some(dest.as_path()));
        assert_eq!(dest.file_name().unwrap(), "images.zip");
        assert_eq!(entry_names(std::fs::read(&dest).unwrap()).len(), 1);
    }

    #[test]
    fn test_export_archive_empty_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = SavedImageArchive::new(dir.path(), Box::new(JpegFileWriter::default()));
        let dest = archive.default_archive_path();

        assert!(archive.export_archive(&dest).unwrap().is_none());
        assert!(!dest.exists());
    }
}
