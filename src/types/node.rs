use std::fmt;
use std::mem;
use std::str::FromStr;

use serde::de::Error as _;
use serde::ser::{Error as _, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::record::Record;
use crate::parse::ParseError;

/// Comparison operators supported in rule expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "=")]
    Eq,
}

impl Comparator {
    /// The single-character symbol used in rule strings.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Eq => "=",
        }
    }

    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(Comparator::Gt),
            "<" => Some(Comparator::Lt),
            "=" => Some(Comparator::Eq),
            _ => None,
        }
    }
}

/// Logical connective joining two subtrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicalOp {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }

    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "AND" => Some(LogicalOp::And),
            "OR" => Some(LogicalOp::Or),
            _ => None,
        }
    }
}

/// A single `attribute comparator literal` test. The literal is kept verbatim;
/// its interpretation is up to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(rename = "left")]
    pub attribute: String,
    #[serde(rename = "operator")]
    pub comparator: Comparator,
    #[serde(rename = "right")]
    pub literal: String,
}

/// Rule AST. Leaves are comparisons, internal nodes are AND/OR connectives
/// that own both of their children.
///
/// Serializes to the plain structured form used at the storage boundary:
///
/// ```text
/// {"type":"operand","left":null,"right":null,"value":{"left":"age","operator":">","right":"30"}}
/// {"type":"operator","left":{..},"right":{..},"value":"AND"}
/// ```
///
/// Long rules build deep trees: `a AND b AND ... AND z` leans left one level
/// per term. Evaluation, comparison, cloning, `Display` and drop all walk the
/// tree with an explicit stack, so depth is bounded only by memory. The
/// structured form is the exception, see [`MAX_SERIALIZED_DEPTH`].
pub enum Node {
    Operand(Comparison),
    Operator {
        op: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    #[must_use]
    pub fn operand(
        attribute: impl Into<String>,
        comparator: Comparator,
        literal: impl Into<String>,
    ) -> Node {
        Node::Operand(Comparison {
            attribute: attribute.into(),
            comparator,
            literal: literal.into(),
        })
    }

    #[must_use]
    pub fn operator(op: LogicalOp, left: Node, right: Node) -> Node {
        Node::Operator {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn and(self, other: Node) -> Node {
        Node::operator(LogicalOp::And, self, other)
    }

    #[must_use]
    pub fn or(self, other: Node) -> Node {
        Node::operator(LogicalOp::Or, self, other)
    }

    /// Evaluate this tree against a record. See [`evaluate`](crate::evaluate).
    #[must_use]
    pub fn evaluate(&self, record: &Record) -> bool {
        crate::evaluate::evaluate(self, record)
    }

    /// All comparisons in the tree, left to right.
    #[must_use]
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.fold(|cmp| out.push(cmp), |_, (), ()| ());
        out
    }

    /// Total number of nodes, leaves included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.fold(|_| 1, |_, left, right| 1 + left + right)
    }

    /// Number of nodes on the longest root-to-leaf path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.fold(|_| 1, |_, left, right| 1 + left.max(right))
    }

    /// Post-order fold without recursion. `leaf` sees comparisons left to
    /// right; `join` combines the values of an operator's two children.
    pub(crate) fn fold<'a, T>(
        &'a self,
        mut leaf: impl FnMut(&'a Comparison) -> T,
        mut join: impl FnMut(LogicalOp, T, T) -> T,
    ) -> T {
        struct Frame<'a, T> {
            op: LogicalOp,
            right: &'a Node,
            left: Option<T>,
        }

        let mut frames: Vec<Frame<'a, T>> = Vec::new();
        let mut cur = self;
        'descend: loop {
            let mut value = loop {
                match cur {
                    Node::Operand(cmp) => break leaf(cmp),
                    Node::Operator { op, left, right } => {
                        frames.push(Frame {
                            op: *op,
                            right: &**right,
                            left: None,
                        });
                        cur = &**left;
                    }
                }
            };
            while let Some(Frame { op, right, left }) = frames.pop() {
                match left {
                    None => {
                        frames.push(Frame {
                            op,
                            right,
                            left: Some(value),
                        });
                        cur = right;
                        continue 'descend;
                    }
                    Some(left) => value = join(op, left, value),
                }
            }
            return value;
        }
    }

    /// Encode this tree into the binary cache format.
    ///
    /// Pass the rule string the tree was parsed from to record its digest,
    /// retrievable later with [`Node::source_digest`].
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    #[cfg(feature = "binary-cache")]
    pub fn to_bytes(&self, source: Option<&str>) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, source)
    }

    /// Decode a tree previously produced by [`Node::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) if the
    /// header, checksum, or payload is invalid.
    #[cfg(feature = "binary-cache")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Node, crate::serial::DeserializeError> {
        crate::serial::decode(bytes)
    }

    /// Source digest stored in a cached tree, if one was recorded.
    ///
    /// # Errors
    ///
    /// Same as [`Node::from_bytes`].
    #[cfg(feature = "binary-cache")]
    pub fn source_digest(bytes: &[u8]) -> Result<Option<[u8; 32]>, crate::serial::DeserializeError> {
        crate::serial::source_digest(bytes)
    }

    /// Cached tree for `source`, or `None` if the entry was built from a
    /// different string. See [`serial::decode_for_source`](crate::serial::decode_for_source).
    ///
    /// # Errors
    ///
    /// Same as [`Node::from_bytes`].
    #[cfg(feature = "binary-cache")]
    pub fn from_cache(
        bytes: &[u8],
        source: &str,
    ) -> Result<Option<Node>, crate::serial::DeserializeError> {
        crate::serial::decode_for_source(bytes, source)
    }
}

/// Placeholder left behind when [`Drop`] detaches a child. Allocates nothing.
fn detached() -> Node {
    Node::Operand(Comparison {
        attribute: String::new(),
        comparator: Comparator::Eq,
        literal: String::new(),
    })
}

fn detach_children(node: &mut Node, out: &mut Vec<Node>) {
    if let Node::Operator { left, right, .. } = node {
        out.push(mem::replace(&mut **left, detached()));
        out.push(mem::replace(&mut **right, detached()));
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Node::Operand(_) = self {
            return;
        }
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut node) = pending.pop() {
            detach_children(&mut node, &mut pending);
        }
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        self.fold(|cmp| Node::Operand(cmp.clone()), Node::operator)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some(pair) = pending.pop() {
            match pair {
                (Node::Operand(a), Node::Operand(b)) => {
                    if a != b {
                        return false;
                    }
                }
                (
                    Node::Operator {
                        op: op_a,
                        left: left_a,
                        right: right_a,
                    },
                    Node::Operator {
                        op: op_b,
                        left: left_b,
                        right: right_b,
                    },
                ) => {
                    if op_a != op_b {
                        return false;
                    }
                    pending.push((&**right_a, &**right_b));
                    pending.push((&**left_a, &**left_b));
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Node {}

/// Prints the rule-string form, e.g. `Node((age > 1 AND salary > 2))`.
impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Node").field(&format_args!("{self}")).finish()
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.comparator, self.literal)
    }
}

/// Renders the tree back into rule-string syntax, fully parenthesized so the
/// output re-parses to the same shape.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Piece<'a> {
            Node(&'a Node),
            Op(LogicalOp),
            Close,
        }

        let mut pending = vec![Piece::Node(self)];
        while let Some(piece) = pending.pop() {
            match piece {
                Piece::Node(Node::Operand(cmp)) => write!(f, "{cmp}")?,
                Piece::Node(Node::Operator { op, left, right }) => {
                    f.write_str("(")?;
                    pending.push(Piece::Close);
                    pending.push(Piece::Node(right));
                    pending.push(Piece::Op(*op));
                    pending.push(Piece::Node(left));
                }
                Piece::Op(op) => write!(f, " {op} ")?,
                Piece::Close => f.write_str(")")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Node {
    type Err = ParseError;

    /// Parse with the default attribute set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse::parse(s)
    }
}

// -- Structured form --------------------------------------------------------

/// Deepest tree the structured form will write. The form nests one object
/// per level, and common deserializers refuse input nested much deeper
/// (`serde_json` stops at 128), so deeper trees fail with a serializer
/// error instead of producing output nothing can read back.
pub const MAX_SERIALIZED_DEPTH: usize = 100;

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Bounded {
            node: self,
            remaining: MAX_SERIALIZED_DEPTH,
        }
        .serialize(serializer)
    }
}

struct Bounded<'a> {
    node: &'a Node,
    /// Levels still allowed below and including `node`.
    remaining: usize,
}

impl Bounded<'_> {
    fn child<'c>(&self, node: &'c Node) -> Bounded<'c> {
        Bounded {
            node,
            remaining: self.remaining - 1,
        }
    }
}

impl Serialize for Bounded<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.remaining == 0 {
            return Err(S::Error::custom(format!(
                "rule tree deeper than {MAX_SERIALIZED_DEPTH} levels"
            )));
        }
        let mut state = serializer.serialize_struct("Node", 4)?;
        match self.node {
            Node::Operand(cmp) => {
                state.serialize_field("type", "operand")?;
                state.serialize_field("left", &None::<Node>)?;
                state.serialize_field("right", &None::<Node>)?;
                state.serialize_field("value", cmp)?;
            }
            Node::Operator { op, left, right } => {
                state.serialize_field("type", "operator")?;
                state.serialize_field("left", &self.child(left))?;
                state.serialize_field("right", &self.child(right))?;
                state.serialize_field("value", op)?;
            }
        }
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    Operand,
    Operator,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: RawKind,
    #[serde(default)]
    left: Option<Box<RawNode>>,
    #[serde(default)]
    right: Option<Box<RawNode>>,
    #[serde(default)]
    value: serde_json::Value,
}

impl RawNode {
    fn into_node(self) -> Result<Node, String> {
        match self.kind {
            RawKind::Operand => {
                let cmp: Comparison = serde_json::from_value(self.value)
                    .map_err(|e| format!("invalid operand value: {e}"))?;
                Ok(Node::Operand(cmp))
            }
            RawKind::Operator => {
                let op: LogicalOp = serde_json::from_value(self.value)
                    .map_err(|e| format!("invalid operator value: {e}"))?;
                let (Some(left), Some(right)) = (self.left, self.right) else {
                    return Err(format!("operator node '{op}' requires both children"));
                };
                Ok(Node::operator(op, left.into_node()?, right.into_node()?))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawNode::deserialize(deserializer)?
            .into_node()
            .map_err(D::Error::custom)
    }
}

// -- Builders ---------------------------------------------------------------

/// Intermediate builder for comparison nodes.
/// Created by [`attr()`]; requires a comparison method to produce a [`Node`].
#[derive(Debug, Clone)]
pub struct AttrExpr {
    name: String,
}

impl AttrExpr {
    #[must_use]
    pub fn gt(self, literal: impl fmt::Display) -> Node {
        Node::operand(self.name, Comparator::Gt, literal.to_string())
    }

    #[must_use]
    pub fn lt(self, literal: impl fmt::Display) -> Node {
        Node::operand(self.name, Comparator::Lt, literal.to_string())
    }

    #[must_use]
    pub fn eq(self, literal: impl fmt::Display) -> Node {
        Node::operand(self.name, Comparator::Eq, literal.to_string())
    }
}

#[must_use]
pub fn attr(name: &str) -> AttrExpr {
    AttrExpr {
        name: name.to_owned(),
    }
}
