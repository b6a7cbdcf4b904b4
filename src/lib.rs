//! Rule expressions over flat records.
//!
//! Rules are strings such as `age > 30 AND (department = Sales OR salary > 50000)`.
//! They are tokenized, parsed into a binary tree of comparisons joined by
//! `AND`/`OR`, and evaluated against a [`Record`]. `AND` and `OR` share one
//! precedence level and group left to right; use parentheses to override.
//!
//! ```
//! use ruletree::{combine, parse, Record};
//!
//! let senior = parse("age > 30").unwrap();
//! let sales = parse("department = Sales OR salary > 50000").unwrap();
//! let rule = combine([senior, sales]).unwrap();
//!
//! let record = Record::new()
//!     .set("age", 35_i64)
//!     .set("department", "Sales")
//!     .set("salary", 40000_i64);
//! assert!(rule.evaluate(&record));
//! ```
//!
//! [`RuleEngine`] parses against a configurable attribute set, and
//! [`RuleService`] adds validated storage on top of a [`RuleRepository`].

mod combine;
mod config;
mod engine;
mod error;
mod evaluate;
pub mod parse;
#[cfg(feature = "binary-cache")]
pub mod serial;
pub mod store;
mod types;

pub use combine::combine;
pub use config::EngineConfig;
pub use engine::{RuleEngine, RuleEngineBuilder};
pub use error::RuleError;
pub use evaluate::evaluate;
pub use parse::{parse, parse_with, ParseError, MAX_NESTING};
pub use store::{InMemoryRepository, RuleRepository, RuleService};
pub use types::{
    attr, AttrExpr, AttributeSet, Comparator, Comparison, LogicalOp, Metadata, Node, Record,
    RuleRecord, StoredRule, Value, DEFAULT_ATTRIBUTES, MAX_SERIALIZED_DEPTH,
};
