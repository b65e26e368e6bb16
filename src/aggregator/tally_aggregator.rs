//! Response tally aggregation
//!
//! Turns the raw readings of one polling pass into per-table tallies and then
//! into a single system-wide tally. Both steps are pure functions of their
//! inputs.

use crate::counters::{CodeSegment, Observation, ResponseTally, Table, TableTally};
use crate::error::ReadError;
use crate::rules::TableRules;
use log::debug;

/// Counters read from one segment of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReading {
    pub segment: CodeSegment,
    pub observations: Vec<Observation>,
}

/// Everything read for one table during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReading {
    pub table: Table,
    pub segments: Vec<SegmentReading>,
    pub timeouts: u64,
}

impl TableReading {
    /// Sum of every observed count plus timeouts, `None` on overflow
    pub fn total_count(&self) -> Option<u64> {
        self.segments
            .iter()
            .flat_map(|segment| segment.observations.iter())
            .try_fold(self.timeouts, |sum, observation| {
                sum.checked_add(observation.count)
            })
    }
}

/// Classify and sum every observation of a table, then add its timeouts
///
/// Readings for a segment the rules do not poll contribute nothing.
///
/// # Errors
///
/// Returns `ReadError::CounterOverflow` if a bucket total does not fit in a
/// `u64`; the reading is then unusable.
pub fn aggregate_table(
    rules: &TableRules,
    reading: &TableReading,
) -> Result<TableTally, ReadError> {
    let mut tally = ResponseTally::default();

    for segment_reading in &reading.segments {
        let Some(rule) = rules.rule_for(segment_reading.segment) else {
            debug!(
                "Ignoring {} {} segment: not polled for this table",
                reading.table, segment_reading.segment
            );
            continue;
        };

        let mut segment_tally = ResponseTally::default();
        for observation in &segment_reading.observations {
            let bucket = rule.classify(segment_reading.segment, observation.code);
            segment_tally.record(bucket, observation.count)?;
        }

        debug!(
            "{} {} segment: {} successes, {} client errors, {} server errors",
            reading.table,
            segment_reading.segment,
            segment_tally.successes,
            segment_tally.client_errors,
            segment_tally.server_errors
        );
        tally = tally.checked_add(segment_tally)?;
    }

    tally.record_timeouts(reading.timeouts)?;

    debug!(
        "Total {}: {} successes, {} client errors, {} server errors ({} timeouts)",
        reading.table, tally.successes, tally.client_errors, tally.server_errors, reading.timeouts
    );

    Ok(TableTally {
        table: reading.table,
        tally,
    })
}

/// Sum per-table tallies into the system-wide tally for a pass
pub fn aggregate_global(tables: &[TableTally]) -> Result<ResponseTally, ReadError> {
    let total = tables
        .iter()
        .try_fold(ResponseTally::default(), |total, table| {
            total.checked_add(table.tally)
        })?;

    debug!(
        "Total successes = {}, client errors = {}, server errors = {}",
        total.successes, total.client_errors, total.server_errors
    );

    Ok(total)
}
