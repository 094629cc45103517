//! Sample namespace loaded into a fresh instance

use crate::error::{FsError, Result};
use crate::filesystem::FileSystem;
use tracing::{info, warn};

/// Directories created by [`seed`], parents first
pub const SAMPLE_DIRECTORIES: &[&str] = &[
    "/documents",
    "/pictures",
    "/music",
    "/documents/work",
    "/documents/personal",
];

/// Files created by [`seed`] with their content
pub const SAMPLE_FILES: &[(&str, &str)] = &[
    ("/documents/readme.txt", "This is a sample readme file."),
    (
        "/documents/work/report.txt",
        "Annual report content would go here.",
    ),
    (
        "/documents/personal/notes.txt",
        "Personal notes and reminders.",
    ),
    ("/pictures/vacation.jpg", "[BINARY IMAGE DATA]"),
    ("/music/song.mp3", "[BINARY AUDIO DATA]"),
];

/// Populate an empty file system with the sample namespace
///
/// Files that do not fit in a small store are skipped.
pub fn seed(fs: &mut FileSystem) -> Result<()> {
    for dir in SAMPLE_DIRECTORIES {
        fs.mkdir(dir)?;
    }

    let mut created = 0;
    for (path, content) in SAMPLE_FILES {
        match fs.create_or_overwrite(path, content.as_bytes()) {
            Ok(()) => created += 1,
            Err(e @ FsError::InsufficientStorage { .. }) => {
                warn!("Skipping sample file {}: {}", path, e);
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Seeded sample namespace: {} directories, {} files",
        SAMPLE_DIRECTORIES.len(),
        created
    );
    Ok(())
}
