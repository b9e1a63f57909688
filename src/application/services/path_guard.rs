use std::io;
use std::path::{Component, Path, PathBuf};

use super::RejectionKind;

pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Rewrites paths between a container's view of the filesystem and the
/// host's. Callers often run in a sidecar that mounts documents under a
/// different prefix than this service sees.
#[derive(Debug, Clone, Default)]
pub struct PathTranslator {
    container_prefix: String,
    host_prefix: String,
    mappings: Vec<(String, String)>,
}

impl PathTranslator {
    pub fn new(
        container_prefix: impl Into<String>,
        host_prefix: impl Into<String>,
        mappings: Vec<(String, String)>,
    ) -> Self {
        Self {
            container_prefix: container_prefix.into(),
            host_prefix: host_prefix.into(),
            mappings,
        }
    }

    /// Parses `"container_prefix:host_prefix"` entries; malformed ones are skipped.
    pub fn parse_mappings<S: AsRef<str>>(entries: &[S]) -> Vec<(String, String)> {
        entries
            .iter()
            .filter_map(|entry| {
                let (container, host) = entry.as_ref().split_once(':')?;
                let (container, host) = (container.trim(), host.trim());
                if container.is_empty() || host.is_empty() {
                    return None;
                }
                Some((container.to_string(), host.to_string()))
            })
            .collect()
    }

    pub fn to_host(&self, raw: &str) -> String {
        if self.container_prefix.is_empty() || !raw.starts_with(&self.container_prefix) {
            return raw.to_string();
        }

        for (container, host) in &self.mappings {
            if raw.starts_with(container.as_str()) {
                return raw.replacen(container.as_str(), host, 1);
            }
        }

        if !self.host_prefix.is_empty() {
            return raw.replacen(&self.container_prefix, &self.host_prefix, 1);
        }

        raw.to_string()
    }

    pub fn to_container(&self, host_path: &str) -> String {
        if !self.container_prefix.is_empty() && host_path.starts_with(&self.container_prefix) {
            return host_path.to_string();
        }

        for (container, host) in &self.mappings {
            if host_path.starts_with(host.as_str()) {
                return host_path.replacen(host.as_str(), container, 1);
            }
        }

        if !self.host_prefix.is_empty() && host_path.starts_with(&self.host_prefix) {
            return host_path.replacen(&self.host_prefix, &self.container_prefix, 1);
        }

        host_path.to_string()
    }

    /// Host-side prefixes this translator can produce, used as default roots.
    pub fn host_roots(&self) -> Vec<String> {
        let mut roots = Vec::new();
        if !self.host_prefix.is_empty() {
            roots.push(self.host_prefix.clone());
        }
        roots.extend(self.mappings.iter().map(|(_, host)| host.clone()));
        roots
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PathGuardError {
    #[error("input_path is empty")]
    Empty,
    #[error("input_path contains invalid characters")]
    InvalidCharacters,
    #[error("input_path must be an absolute path")]
    NotAbsolute,
    #[error("Input file not found")]
    NotFound,
    #[error("Invalid input_path")]
    Unresolvable(#[source] io::Error),
    #[error("input_path must point to a regular file")]
    NotAFile,
    #[error("input_path must point to a .{expected} file")]
    WrongExtension { expected: &'static str },
    #[error("Input file is not readable")]
    Unreadable,
    #[error("input_path is outside allowed directories")]
    OutsideAllowedRoots,
}

impl PathGuardError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            PathGuardError::NotFound => RejectionKind::NotFound,
            PathGuardError::Unreadable | PathGuardError::OutsideAllowedRoots => {
                RejectionKind::PermissionDenied
            }
            _ => RejectionKind::InvalidInput,
        }
    }
}

/// Validates caller-supplied input paths against the allowed roots.
///
/// Containment is always decided on canonical paths, so `..` segments and
/// symlinks pointing out of a root are rejected the same way as a plain
/// outside path.
#[derive(Debug, Clone)]
pub struct PathGuard {
    translator: PathTranslator,
    allowed_roots: Vec<PathBuf>,
    enforce_roots: bool,
    extension: &'static str,
}

impl PathGuard {
    pub fn new(translator: PathTranslator, roots: &[PathBuf], allow_unsafe_paths: bool) -> Self {
        let mut allowed_roots: Vec<PathBuf> = Vec::new();
        for root in roots {
            let canonical = canonicalize_lenient(&expand_home(root));
            if !allowed_roots.contains(&canonical) {
                allowed_roots.push(canonical);
            }
        }

        Self {
            translator,
            allowed_roots,
            enforce_roots: !allow_unsafe_paths,
            extension: DOCUMENT_EXTENSION,
        }
    }

    pub fn allowed_roots(&self) -> &[PathBuf] {
        &self.allowed_roots
    }

    pub fn translator(&self) -> &PathTranslator {
        &self.translator
    }

    pub fn resolve(&self, raw: &str) -> Result<PathBuf, PathGuardError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathGuardError::Empty);
        }
        if raw.contains('\0') {
            return Err(PathGuardError::InvalidCharacters);
        }

        let translated = self.translator.to_host(raw);
        let candidate = expand_home(Path::new(&translated));
        if !candidate.is_absolute() {
            return Err(PathGuardError::NotAbsolute);
        }

        let resolved = std::fs::canonicalize(&candidate).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PathGuardError::NotFound,
            _ => PathGuardError::Unresolvable(e),
        })?;

        let metadata = std::fs::metadata(&resolved).map_err(PathGuardError::Unresolvable)?;
        if !metadata.is_file() {
            return Err(PathGuardError::NotAFile);
        }

        let extension_matches = resolved
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension));
        if !extension_matches {
            return Err(PathGuardError::WrongExtension {
                expected: self.extension,
            });
        }

        if let Err(e) = std::fs::File::open(&resolved) {
            tracing::debug!(error = %e, path = %resolved.display(), "Input file not readable");
            return Err(PathGuardError::Unreadable);
        }

        if self.enforce_roots
            && !self.allowed_roots.is_empty()
            && !self.allowed_roots.iter().any(|root| resolved.starts_with(root))
        {
            tracing::warn!(path = %resolved.display(), "Rejected input path outside allowed roots");
            return Err(PathGuardError::OutsideAllowedRoots);
        }

        Ok(resolved)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Canonicalizes when the path exists; otherwise normalizes it lexically so a
/// root that is created later still compares correctly.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
