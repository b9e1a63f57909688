use std::io;
use std::path::{Path, PathBuf};

use super::PathTranslator;
use crate::domain::TargetId;

const MARKDOWN_EXTENSION: &str = "md";

/// A previously produced output directory that already holds markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedOutput {
    pub output_dir: PathBuf,
    pub markdown_length: u64,
}

/// Where each target's output lands, and how that location is reported back
/// to callers that see the filesystem through a container mount.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    output_base: PathBuf,
    translator: PathTranslator,
}

impl OutputLayout {
    pub fn new(output_base: PathBuf, translator: PathTranslator) -> Self {
        Self {
            output_base,
            translator,
        }
    }

    pub fn output_base(&self) -> &Path {
        &self.output_base
    }

    pub fn output_dir(&self, target_id: &TargetId) -> PathBuf {
        self.output_base.join(target_id.output_dir_name())
    }

    /// Path as the caller should see it.
    pub fn display_path(&self, path: &Path) -> String {
        self.translator.to_container(&path.to_string_lossy())
    }

    pub fn find_cached(&self, target_id: &TargetId) -> io::Result<Option<CachedOutput>> {
        let output_dir = self.output_dir(target_id);
        if !output_dir.is_dir() {
            return Ok(None);
        }

        let markdown = markdown_files(&output_dir)?;
        if markdown.is_empty() {
            return Ok(None);
        }

        let markdown_length = markdown.iter().map(|(_, len)| len).sum();
        Ok(Some(CachedOutput {
            output_dir,
            markdown_length,
        }))
    }
}

/// Total size in bytes of every markdown file below `dir`.
pub fn markdown_length(dir: &Path) -> io::Result<u64> {
    Ok(markdown_files(dir)?.iter().map(|(_, len)| len).sum())
}

fn markdown_files(dir: &Path) -> io::Result<Vec<(PathBuf, u64)>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
            {
                let len = entry.metadata()?.len();
                found.push((path, len));
            }
        }
    }

    Ok(found)
}
