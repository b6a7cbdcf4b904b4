use tracing::trace;

use crate::{Comparison, LogicalOp, Node, Record};

/// Evaluate a rule tree against a record.
///
/// Never fails. A comparison on an attribute the record does not carry is
/// false. Both children of an AND/OR node are always evaluated; there is no
/// short-circuiting. The walk uses an explicit stack, so arbitrarily long
/// chains are fine.
#[must_use]
pub fn evaluate(node: &Node, record: &Record) -> bool {
    node.fold(
        |cmp| eval_comparison(cmp, record),
        |op, lhs, rhs| match op {
            LogicalOp::And => lhs && rhs,
            LogicalOp::Or => lhs || rhs,
        },
    )
}

fn eval_comparison(cmp: &Comparison, record: &Record) -> bool {
    match record.get(&cmp.attribute) {
        Some(value) => value.compare(cmp.comparator, &cmp.literal),
        None => {
            trace!(attribute = %cmp.attribute, "attribute missing from record");
            false
        }
    }
}
