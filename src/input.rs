//! Reading dump files, optionally compressed, with byte-level progress.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// Reader wrapper reporting the running total of bytes read.
///
/// Wraps the raw file, so for compressed dumps progress is measured against
/// the compressed size.
pub struct ProgressReader<R: Read> {
    reader: R,
    callback: Box<dyn Fn(u64)>,
    bytes_read: u64,
}

impl<R: Read> ProgressReader<R> {
    pub fn new<F>(reader: R, callback: F) -> Self
    where
        F: Fn(u64) + 'static,
    {
        Self {
            reader,
            callback: Box::new(callback),
            bytes_read: 0,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        self.bytes_read += n as u64;
        (self.callback)(self.bytes_read);
        Ok(n)
    }
}

/// Read a whole dump into memory, decompressing by extension.
///
/// Invalid UTF-8 is replaced rather than rejected; dumps with mixed encodings
/// still restore their readable rows.
pub fn read_dump(path: &Path, progress: Option<Box<dyn Fn(u64)>>) -> io::Result<String> {
    let file = File::open(path)?;
    let compression = Compression::from_path(path);

    let raw: Box<dyn Read> = match progress {
        Some(cb) => Box::new(ProgressReader::new(file, cb)),
        None => Box::new(file),
    };
    let mut reader = compression.wrap_reader(raw)?;

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), "dump is not valid UTF-8; replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_compression_from_path() {
        assert_eq!(Compression::from_path(Path::new("a.sql")), Compression::None);
        assert_eq!(Compression::from_path(Path::new("a.sql.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("a.SQL.ZST")), Compression::Zstd);
    }

    #[test]
    fn test_read_gzip_dump() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.sql.gz");
        let mut encoder =
            flate2::write::GzEncoder::new(File::create(&path).unwrap(), flate2::Compression::fast());
        encoder.write_all(b"INSERT INTO t VALUES (1);").unwrap();
        encoder.finish().unwrap();

        assert_eq!(read_dump(&path, None).unwrap(), "INSERT INTO t VALUES (1);");
    }

    #[test]
    fn test_read_zstd_dump() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.sql.zst");
        let compressed = zstd::encode_all(&b"INSERT INTO t VALUES (2);"[..], 3).unwrap();
        std::fs::write(&path, compressed).unwrap();

        assert_eq!(read_dump(&path, None).unwrap(), "INSERT INTO t VALUES (2);");
    }

    #[test]
    fn test_progress_reports_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.sql");
        std::fs::write(&path, "SELECT 1;").unwrap();

        let seen = Arc::new(AtomicU64::new(0));
        let seen_clone = seen.clone();
        read_dump(
            &path,
            Some(Box::new(move |bytes: u64| seen_clone.store(bytes, Ordering::Relaxed))),
        )
        .unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 9);
    }
}
