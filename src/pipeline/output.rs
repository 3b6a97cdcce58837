//! Plain-text output helpers.

use std::io;
use std::path::Path;

/// Write `content` to `path`, creating parent directories as needed.
pub fn save_text(content: &str, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    log::info!("Saved: {}", path.display());
    Ok(())
}

/// Read a UTF-8 text file with surrounding whitespace removed.
pub fn load_text(path: &Path) -> io::Result<String> {
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}
