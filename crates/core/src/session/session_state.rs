use std::path::PathBuf;

use crate::archive::saved_image_archive::SavedImageArchive;
use crate::shared::frame::Frame;

/// Mutable state of one interactive session.
///
/// `is_detecting` follows start/stop, `current_frame` is replaced on every
/// successful tick and survives a stop so the last frame can still be
/// saved. Saved paths are owned by the archive.
pub struct SessionState {
    pub(crate) is_detecting: bool,
    pub(crate) current_frame: Option<Frame>,
    pub(crate) archive: SavedImageArchive,
}

impl SessionState {
    pub fn new(archive: SavedImageArchive) -> Self {
        Self {
            is_detecting: false,
            current_frame: None,
            archive,
        }
    }

    pub fn is_detecting(&self) -> bool {
        self.is_detecting
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current_frame.as_ref()
    }

    pub fn saved_image_paths(&self) -> &[PathBuf] {
        self.archive.saved_paths()
    }
}
