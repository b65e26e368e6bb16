//! Core counter types for the Cx health check
//!
//! This module defines the data structures that flow through a polling pass:
//! the monitored request tables, their code segments, raw counter observations
//! and the success/client-error/server-error tallies built from them.

use crate::error::ReadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Cx request table with its own independent response counters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Table {
    /// Multimedia-Auth-Request
    Mar,
    /// Server-Assignment-Request
    Sar,
    /// User-Authorization-Request
    Uar,
    /// Location-Info-Request
    Lir,
}

impl Table {
    /// Every monitored table, in MIB order
    pub const ALL: [Table; 4] = [Table::Mar, Table::Sar, Table::Uar, Table::Lir];

    /// Index of this table under the Homestead statistics OID
    pub fn oid_index(self) -> u32 {
        match self {
            Table::Mar => 10,
            Table::Sar => 11,
            Table::Uar => 12,
            Table::Lir => 13,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Table::Mar => "MAR",
            Table::Sar => "SAR",
            Table::Uar => "UAR",
            Table::Lir => "LIR",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Subdivision of a table's counters by result code space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CodeSegment {
    /// Standard Diameter Result-Code values
    Base,
    /// 3GPP Experimental-Result-Code values
    Experimental,
}

impl CodeSegment {
    /// Application id used as the segment's OID element
    pub fn app_id(self) -> u32 {
        match self {
            CodeSegment::Base => 0,
            CodeSegment::Experimental => 1,
        }
    }
}

impl fmt::Display for CodeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeSegment::Base => f.write_str("base"),
            CodeSegment::Experimental => f.write_str("experimental"),
        }
    }
}

/// A single point-in-time counter read: how many responses with `code`
/// the table saw during the trailing window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Observation {
    pub table: Table,
    pub segment: CodeSegment,
    pub code: u32,
    pub count: u64,
}

impl Observation {
    pub fn new(table: Table, segment: CodeSegment, code: u32, count: u64) -> Self {
        Self {
            table,
            segment,
            code,
            count,
        }
    }
}

/// Outcome class a response count is attributed to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResponseBucket {
    /// The request reached the server
    Success,
    /// The request was rejected because of the caller
    ClientError,
    /// The request failed, possibly without reaching the server
    ServerError,
}

/// Success/client-error/server-error counts for a table or a whole pass
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseTally {
    pub successes: u64,
    pub client_errors: u64,
    pub server_errors: u64,
}

impl ResponseTally {
    pub fn new(successes: u64, client_errors: u64, server_errors: u64) -> Self {
        Self {
            successes,
            client_errors,
            server_errors,
        }
    }

    /// Attribute `count` responses to `bucket`
    ///
    /// # Errors
    ///
    /// Returns `ReadError::CounterOverflow`, leaving the tally unchanged, if the
    /// bucket total would wrap.
    pub fn record(&mut self, bucket: ResponseBucket, count: u64) -> Result<(), ReadError> {
        let slot = match bucket {
            ResponseBucket::Success => &mut self.successes,
            ResponseBucket::ClientError => &mut self.client_errors,
            ResponseBucket::ServerError => &mut self.server_errors,
        };
        *slot = slot
            .checked_add(count)
            .ok_or(ReadError::CounterOverflow(bucket))?;
        Ok(())
    }

    /// Timeouts never reached the server, so they always count as server errors
    pub fn record_timeouts(&mut self, count: u64) -> Result<(), ReadError> {
        self.record(ResponseBucket::ServerError, count)
    }

    /// Bucket-wise sum of two tallies
    pub fn checked_add(self, other: ResponseTally) -> Result<ResponseTally, ReadError> {
        let mut sum = self;
        sum.record(ResponseBucket::Success, other.successes)?;
        sum.record(ResponseBucket::ClientError, other.client_errors)?;
        sum.record(ResponseBucket::ServerError, other.server_errors)?;
        Ok(sum)
    }

    /// Number of responses across all buckets, `None` if it does not fit in a `u64`
    pub fn total(&self) -> Option<u64> {
        self.successes
            .checked_add(self.client_errors)?
            .checked_add(self.server_errors)
    }
}

/// Tally for one table within a pass
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableTally {
    pub table: Table,
    #[serde(flatten)]
    pub tally: ResponseTally,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_oid_indexes() {
        let indexes: Vec<u32> = Table::ALL.iter().map(|t| t.oid_index()).collect();
        assert_eq!(indexes, vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_segment_app_ids() {
        assert_eq!(CodeSegment::Base.app_id(), 0);
        assert_eq!(CodeSegment::Experimental.app_id(), 1);
    }

    #[test]
    fn test_tally_record_each_bucket() {
        let mut tally = ResponseTally::default();
        tally.record(ResponseBucket::Success, 3).unwrap();
        tally.record(ResponseBucket::ClientError, 4).unwrap();
        tally.record(ResponseBucket::ServerError, 5).unwrap();
        tally.record_timeouts(6).unwrap();

        assert_eq!(tally, ResponseTally::new(3, 4, 11));
        assert_eq!(tally.total(), Some(18));
    }

    #[test]
    fn test_tally_checked_add() {
        let total = ResponseTally::new(1, 2, 3)
            .checked_add(ResponseTally::new(10, 20, 30))
            .unwrap();
        assert_eq!(total, ResponseTally::new(11, 22, 33));

        let unchanged = total.checked_add(ResponseTally::default()).unwrap();
        assert_eq!(unchanged, total);
    }

    #[test]
    fn test_tally_overflow_is_an_error_not_a_wrap() {
        let mut tally = ResponseTally::default();
        tally.record(ResponseBucket::Success, u64::MAX).unwrap();

        let result = tally.record(ResponseBucket::Success, 1);
        assert!(matches!(
            result,
            Err(ReadError::CounterOverflow(ResponseBucket::Success))
        ));
        assert_eq!(tally.successes, u64::MAX);

        let result = ResponseTally::new(0, 0, 1).checked_add(ResponseTally::new(0, 0, u64::MAX));
        assert!(matches!(
            result,
            Err(ReadError::CounterOverflow(ResponseBucket::ServerError))
        ));

        assert_eq!(ResponseTally::new(u64::MAX, 0, 1).total(), None);
    }

    #[test]
    fn test_table_tally_serialization() {
        let tally = TableTally {
            table: Table::Uar,
            tally: ResponseTally::new(1, 0, 7),
        };

        let json = serde_json::to_string(&tally).unwrap();
        assert!(json.contains("\"table\":\"UAR\""));
        assert!(json.contains("\"server_errors\":7"));

        let deserialized: TableTally = serde_json::from_str(&json).unwrap();
        assert_eq!(tally, deserialized);
    }
}
