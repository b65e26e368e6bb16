use crate::counters::{CodeSegment, Table};

/// Homestead statistics root
pub const HOMESTEAD_STATS_ROOT: &str = ".1.2.826.0.1.1578918.9.5";

/// Table suffix selecting the "count" column of the "previous five minutes" rows
///
/// ".1" is the table entry, ".4" the count column and ".3" the period.
pub const PREVIOUS_FIVE_MINUTE_COUNTS: &str = "1.4.3";

/// Head OID of a table's previous five minute counts
pub fn table_head(table: Table) -> String {
    format!(
        "{}.{}.{}",
        HOMESTEAD_STATS_ROOT,
        table.oid_index(),
        PREVIOUS_FIVE_MINUTE_COUNTS
    )
}

/// Subtree holding one counter per result code for a segment
pub fn segment_oid(table: Table, segment: CodeSegment) -> String {
    format!("{}.{}", table_head(table), segment.app_id())
}

/// Scalar holding the table's timeout count
pub fn timeouts_oid(table: Table) -> String {
    format!("{}.2.0", table_head(table))
}

/// Strip the "iso" alias some agents print in place of the leading ".1"
pub fn normalize(oid: &str) -> String {
    match oid.strip_prefix("iso.") {
        Some(rest) => format!(".1.{}", rest),
        None if !oid.starts_with('.') => format!(".{}", oid),
        None => oid.to_string(),
    }
}
