mod in_memory_processed_store;
mod json_processed_store;

use crate::application::ports::StoreStats;
use crate::domain::ProcessedRecord;

pub use in_memory_processed_store::InMemoryProcessedStore;
pub use json_processed_store::JsonProcessedStore;

fn stats_of<'a>(records: impl Iterator<Item = &'a ProcessedRecord>) -> StoreStats {
    let mut stats = StoreStats::default();
    for record in records {
        stats.total_processed += 1;
        *stats
            .by_parser
            .entry(record.parser.as_str().to_string())
            .or_default() += 1;
    }
    stats
}
