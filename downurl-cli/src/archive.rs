//! Archive collaborator (SPEC_FULL.md §4.16) — tar+gzip the output directory
//! to `output.tar.gz`, run off the async runtime since `tar`/`flate2` are
//! synchronous.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Archive `dir` into `dir/output.tar.gz`. The tar stream is built at a
/// sibling path first so the walk never tries to include the archive it is
/// still writing, then renamed into place once the walk completes.
pub async fn archive_output_dir(dir: PathBuf) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || build_archive(&dir)).await.context("archive task panicked")?
}

fn build_archive(dir: &Path) -> Result<PathBuf> {
    let tmp_path = dir.parent().unwrap_or_else(|| Path::new(".")).join("output.tar.gz.tmp");
    let final_path = dir.join("output.tar.gz");

    let file = File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let dir_name = dir.file_name().unwrap_or_default();
    builder.append_dir_all(dir_name, dir).with_context(|| format!("archiving {}", dir.display()))?;
    builder.into_inner().context("finishing tar stream")?.finish().context("finishing gzip stream")?;

    std::fs::rename(&tmp_path, &final_path).with_context(|| format!("renaming {} to {}", tmp_path.display(), final_path.display()))?;

    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn archives_directory_contents() {
        let root = tempfile::tempdir().unwrap();
        let out_dir = root.path().join("downloads");
        std::fs::create_dir_all(&out_dir).unwrap();
        std::fs::write(out_dir.join("a.txt"), b"hello").unwrap();

        let archive_path = archive_output_dir(out_dir.clone()).await.unwrap();
        assert!(archive_path.exists());
        assert_eq!(archive_path, out_dir.join("output.tar.gz"));
    }
}
