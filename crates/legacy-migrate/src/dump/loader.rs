//! Dump file loading with gzip detection.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{MigrateError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A dump read into memory and decoded to text.
#[derive(Debug, Clone)]
pub struct LoadedDump {
    /// Path that was actually read.
    pub path: PathBuf,
    /// Decompressed dump text.
    pub text: String,
    /// Whether the file was gzip-compressed.
    pub compressed: bool,
    /// Size of the file on disk.
    pub file_bytes: u64,
    /// SHA-256 of the file on disk, lowercase hex.
    pub sha256: String,
}

/// Resolve the configured path, falling back to `<path>.gz`.
pub fn resolve_dump_path(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    let mut gz = path.as_os_str().to_owned();
    gz.push(".gz");
    let gz = PathBuf::from(gz);
    if gz.is_file() {
        return Ok(gz);
    }
    Err(MigrateError::Config(format!(
        "dump file not found: {} (also tried {})",
        path.display(),
        gz.display()
    )))
}

/// Read, decompress and decode the dump at `path`.
pub fn load_dump(path: &Path) -> Result<LoadedDump> {
    let path = resolve_dump_path(path)?;
    let raw = std::fs::read(&path)?;
    let sha256 = format!("{:x}", Sha256::digest(&raw));
    let (text, compressed) = decode_dump(&raw)?;

    info!(
        "Loaded dump {} ({} bytes on disk{}, {} bytes of SQL)",
        path.display(),
        raw.len(),
        if compressed { ", gzip" } else { "" },
        text.len()
    );

    Ok(LoadedDump {
        path,
        text,
        compressed,
        file_bytes: raw.len() as u64,
        sha256,
    })
}

/// Decode raw dump bytes; gzip is detected by its magic number.
pub fn decode_dump(raw: &[u8]) -> Result<(String, bool)> {
    let compressed = raw.starts_with(&GZIP_MAGIC);
    let bytes = if compressed {
        let mut out = Vec::with_capacity(raw.len() * 4);
        MultiGzDecoder::new(raw)
            .read_to_end(&mut out)
            .map_err(|e| MigrateError::Dump(format!("gzip decompression failed: {}", e)))?;
        out
    } else {
        raw.to_vec()
    };

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "Dump is not valid UTF-8 (first bad byte at {}), decoding lossily",
                e.utf8_error().valid_up_to()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    Ok((text, compressed))
}
