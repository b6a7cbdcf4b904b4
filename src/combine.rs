use tracing::debug;

use crate::Node;

/// Fold rule trees into one, joined with AND.
///
/// `combine([a, b, c])` is `AND(AND(a, b), c)`. A single tree comes back
/// unchanged. No trees yields `None`, which is distinct from any tree: there
/// is no implicit always-true rule. Inputs are not re-validated.
#[must_use]
pub fn combine<I>(asts: I) -> Option<Node>
where
    I: IntoIterator<Item = Node>,
{
    let mut count = 0_usize;
    let combined = asts.into_iter().inspect(|_| count += 1).reduce(Node::and);
    debug!(count, "combined rule trees");
    combined
}
