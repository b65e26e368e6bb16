/// Per-table and system-wide response tallies
pub mod tally_aggregator;

pub use tally_aggregator::{aggregate_global, aggregate_table, SegmentReading, TableReading};
