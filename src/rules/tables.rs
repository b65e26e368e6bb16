//! Per-table classification rule sets
//!
//! This module defines which segments of each Cx table are polled and how the
//! result codes in them are classified under each deployment policy.

use crate::counters::{CodeSegment, Table};
use crate::error::ConfigError;
use crate::rules::classifier::{CodeLists, SegmentRule};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification policy selected per deployment
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Coarse 2xxx/4xxx/experimental success classes, both segments of every table
    #[default]
    ClassBased,
    /// Explicit success and client-error code lists per table segment
    ExplicitCodes,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::ClassBased => f.write_str("class-based"),
            Policy::ExplicitCodes => f.write_str("explicit-codes"),
        }
    }
}

impl Policy {
    /// Build the rule sets for every monitored table under this policy
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if a code list is inconsistent.
    pub fn table_rules(self) -> Result<Vec<TableRules>, ConfigError> {
        match self {
            Policy::ClassBased => Ok(Table::ALL
                .iter()
                .map(|&table| {
                    TableRules::new(table)
                        .with_segment(CodeSegment::Base, SegmentRule::ClassBased)
                        .with_segment(CodeSegment::Experimental, SegmentRule::ClassBased)
                })
                .collect()),
            Policy::ExplicitCodes => explicit_table_rules(),
        }
    }

    /// SNMP community the agent exposes to deployments using this policy
    pub fn default_community(self) -> &'static str {
        match self {
            Policy::ClassBased => "clearwater-internal",
            Policy::ExplicitCodes => "clearwater",
        }
    }
}

/// Explicit code lists as deployed
///
/// Experimental response statistics are not maintained for MAR and SAR, so
/// those segments are not polled.
fn explicit_table_rules() -> Result<Vec<TableRules>, ConfigError> {
    let explicit = |success: &[u32], client_errors: &[u32]| {
        CodeLists::new(success.iter().copied(), client_errors.iter().copied())
            .map(SegmentRule::Explicit)
    };

    Ok(vec![
        TableRules::new(Table::Mar).with_segment(CodeSegment::Base, explicit(&[2001], &[5001])?),
        TableRules::new(Table::Sar).with_segment(CodeSegment::Base, explicit(&[2001], &[])?),
        TableRules::new(Table::Uar)
            .with_segment(CodeSegment::Base, explicit(&[2001], &[5003])?)
            .with_segment(
                CodeSegment::Experimental,
                explicit(&[2001, 2002], &[5001, 5002, 5004])?,
            ),
        TableRules::new(Table::Lir)
            .with_segment(CodeSegment::Base, explicit(&[2001], &[])?)
            .with_segment(CodeSegment::Experimental, explicit(&[2003, 5003], &[5001])?),
    ])
}

/// Polled segments of one table and the rule that classifies each
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRules {
    table: Table,
    segments: Vec<(CodeSegment, SegmentRule)>,
}

impl TableRules {
    /// Create a rule set with no polled segments
    pub fn new(table: Table) -> Self {
        Self {
            table,
            segments: Vec::new(),
        }
    }

    /// Poll `segment` and classify it with `rule`, replacing any earlier rule
    pub fn with_segment(mut self, segment: CodeSegment, rule: SegmentRule) -> Self {
        self.segments.retain(|(existing, _)| *existing != segment);
        self.segments.push((segment, rule));
        self
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Rule for `segment`, or `None` if that segment is not polled for this table
    pub fn rule_for(&self, segment: CodeSegment) -> Option<&SegmentRule> {
        self.segments
            .iter()
            .find(|(candidate, _)| *candidate == segment)
            .map(|(_, rule)| rule)
    }

    pub fn segments(&self) -> impl Iterator<Item = (CodeSegment, &SegmentRule)> {
        self.segments.iter().map(|(segment, rule)| (*segment, rule))
    }
}
