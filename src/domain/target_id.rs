use std::fmt;

use serde::{Deserialize, Serialize};

const ARXIV_PREFIX: &str = "arxiv:";

/// Caller-supplied identifier of the document being processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name for this target's output, safe to join under the
    /// output base. Only `[A-Za-z0-9._-]` survive; everything else becomes `_`.
    pub fn output_dir_name(&self) -> String {
        let stripped = self.0.strip_prefix(ARXIV_PREFIX).unwrap_or(&self.0);
        let name: String = stripped
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        match name.as_str() {
            "" | "." | ".." => format!("_{}", name),
            _ => name,
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
