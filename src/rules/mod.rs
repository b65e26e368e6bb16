/// Counter classification rules
pub mod classifier;
pub mod tables;

pub use classifier::{classify_by_class, CodeLists, SegmentRule};
pub use tables::{Policy, TableRules};
