//! Counter classification
//!
//! Maps a single response code observed in a table segment to the bucket its
//! count belongs to. Two policies coexist in the fleet and are deliberately not
//! equivalent: the class-based rule has no client-error bucket at all, while
//! explicit code lists separate client errors from server errors.

use crate::counters::{CodeSegment, ResponseBucket};
use crate::error::ConfigError;
use std::collections::BTreeSet;

/// Explicit success and client-error result codes for one table segment
///
/// Any code in neither set is a server error. The two sets never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLists {
    success: BTreeSet<u32>,
    client_errors: BTreeSet<u32>,
}

impl CodeLists {
    /// Create code lists for a segment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if a code appears in both lists.
    pub fn new(
        success: impl IntoIterator<Item = u32>,
        client_errors: impl IntoIterator<Item = u32>,
    ) -> Result<Self, ConfigError> {
        let success: BTreeSet<u32> = success.into_iter().collect();
        let client_errors: BTreeSet<u32> = client_errors.into_iter().collect();

        let overlap: Vec<String> = success
            .intersection(&client_errors)
            .map(|code| code.to_string())
            .collect();
        if !overlap.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "result codes listed as both success and client error: {}",
                overlap.join(",")
            )));
        }

        Ok(Self {
            success,
            client_errors,
        })
    }

    pub fn success_codes(&self) -> &BTreeSet<u32> {
        &self.success
    }

    pub fn client_error_codes(&self) -> &BTreeSet<u32> {
        &self.client_errors
    }

    pub fn classify(&self, code: u32) -> ResponseBucket {
        if self.success.contains(&code) {
            ResponseBucket::Success
        } else if self.client_errors.contains(&code) {
            ResponseBucket::ClientError
        } else {
            ResponseBucket::ServerError
        }
    }
}

/// Classification rule applied to one polled segment of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentRule {
    /// Success means "the server answered": any experimental code, or a base
    /// code in the 2xxx or 4xxx class. Everything else is a server error.
    ClassBased,
    /// Per-segment success and client-error code lists
    Explicit(CodeLists),
}

impl SegmentRule {
    /// Classify a response code observed in `segment`
    ///
    /// Unrecognised codes are never an error; they land in the server error
    /// bucket.
    pub fn classify(&self, segment: CodeSegment, code: u32) -> ResponseBucket {
        match self {
            SegmentRule::ClassBased => classify_by_class(segment, code),
            SegmentRule::Explicit(lists) => lists.classify(code),
        }
    }
}

/// Class-based classification
///
/// Experimental result codes can only come from the server, so they are
/// always successes.
pub fn classify_by_class(segment: CodeSegment, code: u32) -> ResponseBucket {
    if segment == CodeSegment::Experimental {
        return ResponseBucket::Success;
    }

    match code / 1000 {
        2 | 4 => ResponseBucket::Success,
        _ => ResponseBucket::ServerError,
    }
}
