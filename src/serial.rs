//! Binary cache format for rule trees.
//!
//! This is a derived cache, never the store of record: rule strings are what
//! gets persisted, and a cached tree is only a shortcut past re-parsing one.
//! Entries are keyed by the BLAKE3 digest of the rule string they were parsed
//! from. [`decode_for_source`] (and [`Node::from_cache`]) hand back a tree only
//! when that digest matches the string in hand; on a miss the caller parses
//! the string again.
//!
//! A cached tree is a 32-byte fixed header followed by a bincode-encoded
//! payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"RTRE"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! The payload stores the tree as a flat post-order list of steps rather than
//! nested values, so encoding, validating and decoding never recurse and a
//! crafted payload cannot nest its way past the stack.
//!
//! ## Versioning
//!
//! The format version must match exactly, otherwise decoding fails with
//! [`DeserializeError::IncompatibleVersion`]. The engine version is
//! informational only.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::{Comparator, Comparison, LogicalOp, Node};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"RTRE";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when encoding a [`Node`] to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode rule tree: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("payload of {0} bytes exceeds the format limit")]
    TooLarge(usize),
}

/// Errors that can occur when decoding a [`Node`] from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a rule tree cache: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedTree {
    metadata: TreeMetadata,
    steps: Vec<SerializedStep>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TreeMetadata {
    node_count: usize,
    source_digest: Option<[u8; 32]>,
}

/// One post-order step. An operand pushes a leaf; an operator pops `arity`
/// subtrees and joins them left to right. Same-operator chains along the
/// left spine collapse into one step, so `(a AND b) AND c` is
/// `[a, b, c, And/3]` while `a AND (b AND c)` is `[a, b, c, And/2, And/2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SerializedStep {
    Operand {
        attribute: String,
        comparator: SerializedComparator,
        literal: String,
    },
    Operator {
        op: SerializedLogicalOp,
        arity: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SerializedComparator {
    Gt,
    Lt,
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SerializedLogicalOp {
    And,
    Or,
}

// ---------------------------------------------------------------------------
// Operator conversion
// ---------------------------------------------------------------------------

fn serialize_comparator(comparator: Comparator) -> SerializedComparator {
    match comparator {
        Comparator::Gt => SerializedComparator::Gt,
        Comparator::Lt => SerializedComparator::Lt,
        Comparator::Eq => SerializedComparator::Eq,
    }
}

fn deserialize_comparator(comparator: SerializedComparator) -> Comparator {
    match comparator {
        SerializedComparator::Gt => Comparator::Gt,
        SerializedComparator::Lt => Comparator::Lt,
        SerializedComparator::Eq => Comparator::Eq,
    }
}

fn serialize_logical(op: LogicalOp) -> SerializedLogicalOp {
    match op {
        LogicalOp::And => SerializedLogicalOp::And,
        LogicalOp::Or => SerializedLogicalOp::Or,
    }
}

fn deserialize_logical(op: SerializedLogicalOp) -> LogicalOp {
    match op {
        SerializedLogicalOp::And => LogicalOp::And,
        SerializedLogicalOp::Or => LogicalOp::Or,
    }
}

// ---------------------------------------------------------------------------
// Tree flattening (binary -> post-order steps)
// ---------------------------------------------------------------------------

enum Task<'a> {
    Visit(&'a Node),
    Emit(LogicalOp, usize),
}

fn flatten(root: &Node) -> Vec<SerializedStep> {
    let mut steps = Vec::new();
    let mut tasks = vec![Task::Visit(root)];
    while let Some(task) = tasks.pop() {
        match task {
            Task::Visit(Node::Operand(cmp)) => steps.push(SerializedStep::Operand {
                attribute: cmp.attribute.clone(),
                comparator: serialize_comparator(cmp.comparator),
                literal: cmp.literal.clone(),
            }),
            Task::Visit(node @ Node::Operator { op: chain_op, .. }) => {
                // right children from the top of the chain down
                let mut rights = Vec::new();
                let mut cur = node;
                while let Node::Operator { op, left, right } = cur {
                    if op != chain_op {
                        break;
                    }
                    rights.push(&**right);
                    cur = &**left;
                }
                tasks.push(Task::Emit(*chain_op, rights.len() + 1));
                tasks.extend(rights.into_iter().map(Task::Visit));
                tasks.push(Task::Visit(cur));
            }
            Task::Emit(op, arity) => steps.push(SerializedStep::Operator {
                op: serialize_logical(op),
                arity,
            }),
        }
    }
    steps
}

// ---------------------------------------------------------------------------
// Tree unflattening (post-order steps -> binary)
// ---------------------------------------------------------------------------

fn unflatten(steps: Vec<SerializedStep>) -> Result<Node, DeserializeError> {
    let mut stack: Vec<Node> = Vec::new();
    for step in steps {
        match step {
            SerializedStep::Operand {
                attribute,
                comparator,
                literal,
            } => stack.push(Node::Operand(Comparison {
                attribute,
                comparator: deserialize_comparator(comparator),
                literal,
            })),
            SerializedStep::Operator { op, arity } => {
                if arity < 2 || arity > stack.len() {
                    return Err(bad_arity(arity, stack.len()));
                }
                let op = deserialize_logical(op);
                let mut children = stack.split_off(stack.len() - arity).into_iter();
                let joined = children
                    .next()
                    .map(|first| children.fold(first, |acc, child| Node::operator(op, acc, child)))
                    .ok_or_else(|| bad_arity(arity, 0))?;
                stack.push(joined);
            }
        }
    }
    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) => Ok(root),
        _ => Err(DeserializeError::Validation(
            "steps do not form a single tree".to_owned(),
        )),
    }
}

fn bad_arity(arity: usize, available: usize) -> DeserializeError {
    DeserializeError::Validation(format!(
        "operator of arity {arity} with {available} subtrees available, needs at least 2"
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Replays the steps without building anything and checks they describe
/// exactly one tree of the recorded size.
fn validate(tree: &SerializedTree) -> Result<(), DeserializeError> {
    let mut height = 0usize;
    let mut count = 0usize;
    for step in &tree.steps {
        match step {
            SerializedStep::Operand { attribute, .. } => {
                if attribute.is_empty() {
                    return Err(DeserializeError::Validation(
                        "operand with empty attribute".to_owned(),
                    ));
                }
                height += 1;
                count += 1;
            }
            SerializedStep::Operator { arity, .. } => {
                if *arity < 2 || *arity > height {
                    return Err(bad_arity(*arity, height));
                }
                // n subtrees joined by n - 1 binary operators
                height -= arity - 1;
                count += arity - 1;
            }
        }
    }
    if height != 1 {
        return Err(DeserializeError::Validation(format!(
            "steps leave {height} subtrees, expected exactly 1"
        )));
    }
    if count != tree.metadata.node_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} nodes but payload has {}",
            tree.metadata.node_count, count
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) -> Result<(), SerializeError> {
    let payload_len =
        u32::try_from(payload.len()).map_err(|_| SerializeError::TooLarge(payload.len()))?;
    let hash = blake3::hash(payload);

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash.as_bytes()[..16]);
    Ok(())
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(node: &Node, source_text: Option<&str>) -> Result<Vec<u8>, SerializeError> {
    let tree = SerializedTree {
        metadata: TreeMetadata {
            node_count: node.node_count(),
            source_digest: source_text.map(digest),
        },
        steps: flatten(node),
    };
    let payload = bincode::serde::encode_to_vec(&tree, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload)?;
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Node, DeserializeError> {
    decode_tree(bytes).and_then(|tree| unflatten(tree.steps))
}

/// Digest of the source string recorded at encode time, if any.
pub(crate) fn source_digest(bytes: &[u8]) -> Result<Option<[u8; 32]>, DeserializeError> {
    decode_tree(bytes).map(|tree| tree.metadata.source_digest)
}

/// Decode a cached tree only if it was built from `source`.
///
/// Returns `Ok(None)` when the entry carries no digest or a digest of some
/// other string; the caller should parse `source` instead.
///
/// # Errors
///
/// Returns [`DeserializeError`] if the bytes are not a valid cache entry.
pub fn decode_for_source(bytes: &[u8], source: &str) -> Result<Option<Node>, DeserializeError> {
    let tree = decode_tree(bytes)?;
    if tree.metadata.source_digest != Some(digest(source)) {
        debug!(rule = source, "cached tree is stale or unkeyed");
        return Ok(None);
    }
    unflatten(tree.steps).map(Some)
}

fn decode_tree(bytes: &[u8]) -> Result<SerializedTree, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != payload_len as usize {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: payload.len(),
        });
    }

    if blake3::hash(payload).as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (tree, _): (SerializedTree, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
    validate(&tree)?;
    Ok(tree)
}

/// BLAKE3 digest of a rule string, comparable with [`Node::source_digest`].
#[must_use]
pub fn digest(source: &str) -> [u8; 32] {
    *blake3::hash(source.as_bytes()).as_bytes()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr;

    fn leaf(name: &str) -> SerializedStep {
        SerializedStep::Operand {
            attribute: name.to_owned(),
            comparator: SerializedComparator::Eq,
            literal: "x".to_owned(),
        }
    }

    fn join(op: SerializedLogicalOp, arity: usize) -> SerializedStep {
        SerializedStep::Operator { op, arity }
    }

    fn tree(steps: Vec<SerializedStep>, node_count: usize) -> SerializedTree {
        SerializedTree {
            metadata: TreeMetadata {
                node_count,
                source_digest: None,
            },
            steps,
        }
    }

    #[test]
    fn comparator_round_trip() {
        for cmp in [Comparator::Gt, Comparator::Lt, Comparator::Eq] {
            assert_eq!(deserialize_comparator(serialize_comparator(cmp)), cmp);
        }
    }

    #[test]
    fn left_chain_collapses_into_one_step() {
        let node = attr("age")
            .gt(1)
            .and(attr("salary").gt(2))
            .and(attr("experience").gt(3));
        let steps = flatten(&node);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[3], join(SerializedLogicalOp::And, 3));
        assert_eq!(unflatten(steps).unwrap(), node);
    }

    #[test]
    fn right_nesting_is_kept() {
        let node = attr("age")
            .gt(1)
            .and(attr("salary").gt(2).and(attr("experience").gt(3)));
        let steps = flatten(&node);
        assert_eq!(
            steps[3..],
            [
                join(SerializedLogicalOp::And, 2),
                join(SerializedLogicalOp::And, 2)
            ]
        );
        assert_eq!(unflatten(steps).unwrap(), node);
    }

    #[test]
    fn mixed_ops_stop_at_boundary() {
        let node = attr("age")
            .gt(1)
            .or(attr("salary").gt(2))
            .and(attr("department").eq("Sales"));
        let steps = flatten(&node);
        assert_eq!(steps[2], join(SerializedLogicalOp::Or, 2));
        assert_eq!(steps[4], join(SerializedLogicalOp::And, 2));
        assert_eq!(unflatten(steps).unwrap(), node);
    }

    #[test]
    fn header_round_trip() {
        let payload = b"test payload data";
        let mut buf = Vec::new();
        write_header(&mut buf, payload).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);

        let (format_version, payload_len, hash) = read_header(&buf).unwrap();
        assert_eq!(format_version, FORMAT_VERSION);
        assert_eq!(payload_len as usize, payload.len());
        assert_eq!(&hash, &blake3::hash(payload).as_bytes()[..16]);
    }

    #[test]
    fn header_bad_magic() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"BAAD");
        assert!(matches!(read_header(&buf), Err(DeserializeError::BadMagic)));
    }

    #[test]
    fn header_too_short() {
        assert!(matches!(
            read_header(&[0u8; 10]),
            Err(DeserializeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn operator_needs_two_subtrees() {
        let unary = tree(vec![leaf("age"), join(SerializedLogicalOp::Or, 1)], 1);
        assert!(matches!(validate(&unary), Err(DeserializeError::Validation(_))));

        let short = tree(vec![leaf("age"), join(SerializedLogicalOp::Or, 2)], 2);
        assert!(matches!(validate(&short), Err(DeserializeError::Validation(_))));
        assert!(unflatten(short.steps).is_err());
    }

    #[test]
    fn steps_must_form_one_tree() {
        let forest = tree(vec![leaf("age"), leaf("salary")], 2);
        assert!(matches!(validate(&forest), Err(DeserializeError::Validation(_))));
        assert!(unflatten(forest.steps).is_err());

        assert!(validate(&tree(Vec::new(), 0)).is_err());
    }

    #[test]
    fn node_count_must_match() {
        let steps = vec![leaf("age"), leaf("salary"), join(SerializedLogicalOp::And, 2)];
        assert!(validate(&tree(steps.clone(), 3)).is_ok());
        assert!(validate(&tree(steps, 4)).is_err());
    }

    #[test]
    fn empty_attribute_rejected() {
        assert!(matches!(
            validate(&tree(vec![leaf("")], 1)),
            Err(DeserializeError::Validation(_))
        ));
    }
}
