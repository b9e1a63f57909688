use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Document parsers the engine knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    Mineru,
    Docling,
}

impl ParserKind {
    pub const ALL: [ParserKind; 2] = [ParserKind::Mineru, ParserKind::Docling];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::Mineru => "mineru",
            ParserKind::Docling => "docling",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid parser: {0}. Expected one of: mineru, docling")]
pub struct UnknownParser(pub String);

impl FromStr for ParserKind {
    type Err = UnknownParser;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mineru" => Ok(ParserKind::Mineru),
            "docling" => Ok(ParserKind::Docling),
            _ => Err(UnknownParser(s.to_string())),
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
