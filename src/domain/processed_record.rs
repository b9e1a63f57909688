use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParserKind, TargetId};

/// What the dedup store remembers about a successfully processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub target_id: TargetId,
    pub output_dir: String,
    pub parser: ParserKind,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedRecord {
    pub fn new(target_id: TargetId, output_dir: String, parser: ParserKind) -> Self {
        Self {
            target_id,
            output_dir,
            parser,
            processed_at: Utc::now(),
        }
    }
}
