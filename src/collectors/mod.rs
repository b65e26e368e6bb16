//! Counter sources for the Cx response statistics

use crate::counters::{CodeSegment, Observation, Table};
use crate::error::ReadError;

/// OID layout of the Homestead Cx statistics tables
pub mod oid;

/// Counter source backed by the net-snmp command-line tools
pub mod snmp_collector;

pub use snmp_collector::SnmpCollector;

/// Point-in-time reader of the "previous five minutes" Cx counters
///
/// Every call returns a fresh snapshot; implementations never cache between
/// calls, because the confirmation pass relies on re-reading.
#[cfg_attr(test, mockall::automock)]
pub trait CounterSource: Send + Sync {
    /// Read the per-result-code counts for one segment of a table
    ///
    /// An empty segment is an empty list, not an error.
    fn read_counters(&self, table: Table, segment: CodeSegment)
        -> Result<Vec<Observation>, ReadError>;

    /// Read the number of requests on a table that timed out
    fn read_timeouts(&self, table: Table) -> Result<u64, ReadError>;
}
