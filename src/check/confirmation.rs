//! Two-pass confirmation of the "all requests failing" verdict
//!
//! The "previous five minutes" counters cannot be read atomically across
//! tables, so a single pass may straddle a period boundary ("tick rollover")
//! and see a spuriously empty success count. A positive first pass is
//! therefore only trusted if a second, independently read pass agrees.

use crate::aggregator::{aggregate_global, aggregate_table, SegmentReading, TableReading};
use crate::check::decision::FailureDecision;
use crate::collectors::CounterSource;
use crate::counters::{ResponseTally, TableTally, Timestamp};
use crate::error::ReadError;
use crate::rules::TableRules;
use chrono::Utc;
use log::{debug, info};
use serde::Serialize;

/// Exit status when the checked stack is healthy
pub const HEALTHY_EXIT_CODE: u8 = 0;

/// Exit status when the health check itself could not run
pub const FAILURE_EXIT_CODE: u8 = 1;

/// Exit status asking the supervisor to restart the service
pub const RESTART_EXIT_CODE: u8 = 3;

/// Result of a single read→classify→aggregate→decide pass
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PassReport {
    /// 1 for the initial pass, 2 for the confirmation pass
    pub pass: u8,
    pub taken_at: Timestamp,
    pub tables: Vec<TableTally>,
    pub total: ResponseTally,
    pub all_requests_failing: bool,
}

/// Result of a complete health check
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckReport {
    pub tolerance: u64,
    pub passes: Vec<PassReport>,
    pub all_requests_failing: bool,
}

impl CheckReport {
    /// Human-readable verdict printed by the command-line tool
    pub fn verdict_line(&self) -> String {
        format!("All requests failing? {}", self.all_requests_failing)
    }

    pub fn outcome(&self) -> Outcome {
        if self.all_requests_failing {
            Outcome::AllRequestsFailing
        } else {
            Outcome::Healthy
        }
    }
}

/// What the invoking supervisor should make of this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// At least one pass saw the stack working
    Healthy,
    /// Both passes saw only server errors; restarting may restore service
    AllRequestsFailing,
    /// The check could not be completed; says nothing about the stack
    ExecutionFailed,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Healthy => HEALTHY_EXIT_CODE,
            Outcome::AllRequestsFailing => RESTART_EXIT_CODE,
            Outcome::ExecutionFailed => FAILURE_EXIT_CODE,
        }
    }
}

/// Runs the Cx health check against a counter source
pub struct HealthCheck<S> {
    source: S,
    tables: Vec<TableRules>,
    decision: FailureDecision,
    parallel_reads: bool,
}

impl<S: CounterSource> HealthCheck<S> {
    /// Create a health check over `tables`, reading sequentially
    pub fn new(source: S, tables: Vec<TableRules>, decision: FailureDecision) -> Self {
        Self {
            source,
            tables,
            decision,
            parallel_reads: false,
        }
    }

    /// Read the tables of each pass on separate threads
    pub fn with_parallel_reads(mut self, parallel_reads: bool) -> Self {
        self.parallel_reads = parallel_reads;
        self
    }

    /// Run the check: one pass, plus a confirmation pass if the first is positive
    ///
    /// # Errors
    ///
    /// Returns the first `ReadError` from either pass; no verdict is produced
    /// from partial data.
    pub fn run(&self) -> Result<CheckReport, ReadError> {
        let first = self.run_pass(1)?;
        info!("First check returned {}", first.all_requests_failing);

        let mut passes = vec![first];
        if passes[0].all_requests_failing {
            // Don't trust a single positive; re-read everything
            let second = self.run_pass(2)?;
            info!("Second check returned {}", second.all_requests_failing);
            passes.push(second);
        }

        let all_requests_failing = passes.iter().all(|pass| pass.all_requests_failing);

        Ok(CheckReport {
            tolerance: self.decision.tolerance(),
            passes,
            all_requests_failing,
        })
    }

    /// Perform a single independent pass over every monitored table
    pub fn run_pass(&self, pass: u8) -> Result<PassReport, ReadError> {
        debug!("Starting pass {} over {} tables", pass, self.tables.len());
        let taken_at = Utc::now();

        let readings = self.read_tables()?;
        let tables: Vec<TableTally> = self
            .tables
            .iter()
            .zip(&readings)
            .map(|(rules, reading)| aggregate_table(rules, reading))
            .collect::<Result<Vec<_>, ReadError>>()?;

        let total = aggregate_global(&tables)?;
        let all_requests_failing = self.decision.all_requests_failing(&total);

        Ok(PassReport {
            pass,
            taken_at,
            tables,
            total,
            all_requests_failing,
        })
    }

    /// Read every table, in the same order as `self.tables`
    fn read_tables(&self) -> Result<Vec<TableReading>, ReadError> {
        if !self.parallel_reads {
            return self
                .tables
                .iter()
                .map(|rules| read_table(&self.source, rules))
                .collect();
        }

        let source = &self.source;
        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .tables
                .iter()
                .map(|rules| scope.spawn(move || read_table(source, rules)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }
}

/// Read every polled segment of a table, then its timeout count
fn read_table<S: CounterSource + ?Sized>(
    source: &S,
    rules: &TableRules,
) -> Result<TableReading, ReadError> {
    let table = rules.table();

    let segments = rules
        .segments()
        .map(|(segment, _)| {
            source
                .read_counters(table, segment)
                .map(|observations| SegmentReading {
                    segment,
                    observations,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let timeouts = source.read_timeouts(table)?;

    Ok(TableReading {
        table,
        segments,
        timeouts,
    })
}
