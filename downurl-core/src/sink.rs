//! Filesystem sink (spec.md §4.7) — writes a byte stream to a placement
//! computed by [`crate::storage`], serializing concurrent writers that target
//! the same final path and resolving name collisions with `_1`, `_2`, ... .

use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

const MAX_COLLISION_ATTEMPTS: u32 = 1000;

/// Per-path mutex registry: grown lazily, one lock per distinct destination
/// directory+name stem, so unrelated writes never contend.
#[derive(Default)]
pub struct FilesystemSink {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FilesystemSink {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, key: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.to_path_buf()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Write `reader` to `dir/filename`, creating `dir` (mode 0755-equivalent
    /// via `create_dir_all`) and resolving same-name collisions by inserting
    /// `_1`, `_2`, ... before the extension. Returns the final path and byte
    /// count written.
    pub async fn write<R>(&self, dir: &Path, filename: &str, mut reader: R) -> Result<(PathBuf, u64)>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let lock_key = dir.join(filename);
        let path_lock = self.lock_for(&lock_key).await;
        let _guard = path_lock.lock().await;

        tokio::fs::create_dir_all(dir).await?;
        let final_path = resolve_collision(dir, filename).await?;

        let mut file = tokio::fs::File::create(&final_path).await?;
        let mut buf = [0u8; 64 * 1024];
        let mut written: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            tokio::io::AsyncWriteExt::write_all(&mut file, &buf[..n]).await?;
            written += n as u64;
        }

        Ok((final_path, written))
    }
}

async fn resolve_collision(dir: &Path, filename: &str) -> Result<PathBuf> {
    let candidate = dir.join(filename);
    if tokio::fs::metadata(&candidate).await.is_err() {
        return Ok(candidate);
    }

    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    let ext = path.extension().and_then(|e| e.to_str());

    for n in 1..=MAX_COLLISION_ATTEMPTS {
        let candidate_name = match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = dir.join(&candidate_name);
        if tokio::fs::metadata(&candidate).await.is_err() {
            return Ok(candidate);
        }
    }

    Err(crate::error::Error::FilesystemWrite(format!(
        "could not resolve a free filename for {filename} in {} after {MAX_COLLISION_ATTEMPTS} attempts",
        dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_file_and_reports_byte_count() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FilesystemSink::new();
        let data = b"hello world".to_vec();
        let (path, written) = sink.write(dir.path(), "out.txt", data.as_slice()).await.unwrap();
        assert_eq!(written, 11);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), data);
    }

    #[tokio::test]
    async fn collision_appends_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FilesystemSink::new();

        let (first, _) = sink.write(dir.path(), "out.txt", b"a".as_slice()).await.unwrap();
        let (second, _) = sink.write(dir.path(), "out.txt", b"b".as_slice()).await.unwrap();
        let (third, _) = sink.write(dir.path(), "out.txt", b"c".as_slice()).await.unwrap();

        assert_eq!(first.file_name().unwrap(), "out.txt");
        assert_eq!(second.file_name().unwrap(), "out_1.txt");
        assert_eq!(third.file_name().unwrap(), "out_2.txt");
    }

    #[tokio::test]
    async fn creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");
        let sink = FilesystemSink::new();
        let (path, _) = sink.write(&nested, "f.txt", b"x".as_slice()).await.unwrap();
        assert!(path.starts_with(&nested));
        assert!(tokio::fs::metadata(&nested).await.unwrap().is_dir());
    }
}
