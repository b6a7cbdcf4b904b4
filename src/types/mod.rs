mod attributes;
mod node;
mod record;
mod rule;
mod value;

pub use attributes::{AttributeSet, DEFAULT_ATTRIBUTES};
pub use node::{attr, AttrExpr, Comparator, Comparison, LogicalOp, Node, MAX_SERIALIZED_DEPTH};
pub use record::Record;
pub use rule::{Metadata, RuleRecord, StoredRule};
pub use value::Value;
