//! File payload helpers
//!
//! Thin wrappers used by the file-transfer surface to attach and store
//! `FILE_TRANSFER` payloads. Out of the channel core; nothing here touches
//! key material or framing.

use std::io;
use std::path::Path;

use bytes::Bytes;

/// Read a whole file into a payload buffer
pub async fn read_file_bytes(path: impl AsRef<Path>) -> io::Result<Bytes> {
    let data = tokio::fs::read(path).await?;
    Ok(Bytes::from(data))
}

/// Write a payload buffer to a file
///
/// Creates the parent directory if it doesn't exist.
pub async fn write_file_bytes(path: impl AsRef<Path>, data: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await
}
