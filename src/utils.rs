use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

/// Write `bytes` to `path` through a temporary file in the same directory,
/// renamed into place once fully flushed. Returns the number of bytes written.
///
/// On failure the temporary file is removed and `path` is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<u64> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".opencut-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    debug!("Persisting {} bytes to {}", bytes.len(), path.display());
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(bytes.len() as u64)
}

/// Byte count for display, e.g. `12.3 KB`
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
