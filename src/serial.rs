//! Binary persistence of compiled rule trees.
//!
//! A compiled [`RuleTree`](crate::RuleTree) is written as a 32-byte fixed
//! header followed by a bincode-encoded payload, so hosts can skip parsing
//! and conditional unwrapping on start-up.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"FLGC"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! The format version must match exactly; the engine version is
//! informational. A decoded tree gets a fresh serial, so resolve caches
//! never carry over from the tree that was saved.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Attributes, Combinator, Node, NodeId, NodeKind, RuleTree, TargetSpec};

const MAGIC: &[u8; 4] = b"FLGC";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

/// Errors raised while encoding a [`RuleTree`](crate::RuleTree).
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode rule tree: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding a [`RuleTree`](crate::RuleTree).
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a formlogic binary: invalid magic bytes")]
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

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedTree {
    metadata: TreeMetadata,
    nodes: Vec<SerializedNode>,
    validate_roots: Vec<usize>,
    preprocess_roots: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TreeMetadata {
    node_count: usize,
    validate_count: usize,
    preprocess_count: usize,
    source_digest: Option<[u8; 32]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedNode {
    kind: SerializedKind,
    any: bool,
    inverted: bool,
    fail_if_null: bool,
    field_count: usize,
    target: TargetSpec,
    error_target: Option<TargetSpec>,
    attrs: Attributes,
    children: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SerializedKind {
    Validate,
    Preprocess,
    Block,
    Rule,
}

fn serialize_kind(kind: NodeKind) -> SerializedKind {
    match kind {
        NodeKind::Validate => SerializedKind::Validate,
        NodeKind::Preprocess => SerializedKind::Preprocess,
        NodeKind::Block => SerializedKind::Block,
        NodeKind::Rule => SerializedKind::Rule,
    }
}

fn deserialize_kind(kind: SerializedKind) -> NodeKind {
    match kind {
        SerializedKind::Validate => NodeKind::Validate,
        SerializedKind::Preprocess => NodeKind::Preprocess,
        SerializedKind::Block => NodeKind::Block,
        SerializedKind::Rule => NodeKind::Rule,
    }
}

fn tree_to_serialized(tree: &RuleTree, source_text: Option<&str>) -> SerializedTree {
    let nodes = tree
        .nodes
        .iter()
        .map(|n| SerializedNode {
            kind: serialize_kind(n.kind),
            any: n.combinator == Combinator::Any,
            inverted: n.inverted,
            fail_if_null: n.fail_if_null,
            field_count: n.field_count,
            target: n.target.clone(),
            error_target: n.error_target.clone(),
            attrs: n.attrs.clone(),
            children: n.children.iter().map(|c| c.index()).collect(),
        })
        .collect();

    SerializedTree {
        metadata: TreeMetadata {
            node_count: tree.nodes.len(),
            validate_count: tree.validate_roots.len(),
            preprocess_count: tree.preprocess_roots.len(),
            source_digest: source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes()),
        },
        nodes,
        validate_roots: tree.validate_roots.iter().map(|r| r.index()).collect(),
        preprocess_roots: tree.preprocess_roots.iter().map(|r| r.index()).collect(),
    }
}

fn serialized_to_tree(ser: SerializedTree) -> Result<RuleTree, DeserializeError> {
    validate(&ser)?;

    let nodes = ser
        .nodes
        .into_iter()
        .map(|n| Node {
            kind: deserialize_kind(n.kind),
            combinator: if n.any { Combinator::Any } else { Combinator::All },
            inverted: n.inverted,
            fail_if_null: n.fail_if_null,
            field_count: n.field_count,
            target: n.target,
            error_target: n.error_target,
            attrs: n.attrs,
            children: n.children.into_iter().map(NodeId::new).collect(),
        })
        .collect();

    Ok(RuleTree::from_parts(
        nodes,
        ser.validate_roots.into_iter().map(NodeId::new).collect(),
        ser.preprocess_roots.into_iter().map(NodeId::new).collect(),
    ))
}

fn validate(ser: &SerializedTree) -> Result<(), DeserializeError> {
    let node_count = ser.nodes.len();

    if ser.metadata.node_count != node_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} nodes but payload has {node_count}",
            ser.metadata.node_count
        )));
    }
    if ser.metadata.validate_count != ser.validate_roots.len()
        || ser.metadata.preprocess_count != ser.preprocess_roots.len()
    {
        return Err(DeserializeError::Validation(
            "metadata root counts do not match payload".to_owned(),
        ));
    }

    for (index, node) in ser.nodes.iter().enumerate() {
        // Preorder arena: every child follows its parent.
        if let Some(&child) = node.children.iter().find(|&&c| c <= index || c >= node_count) {
            return Err(DeserializeError::Validation(format!(
                "node {index} has child {child} outside ({index}, {node_count})"
            )));
        }
        if node.kind == SerializedKind::Rule && !node.children.is_empty() {
            return Err(DeserializeError::Validation(format!(
                "rule node {index} has children"
            )));
        }
        if node.kind == SerializedKind::Rule && node.field_count != node.target.declared_count() {
            return Err(DeserializeError::Validation(format!(
                "rule node {index} expects {} fields but declares {}",
                node.field_count,
                node.target.declared_count()
            )));
        }
    }

    check_roots(ser, &ser.validate_roots, SerializedKind::Validate)?;
    check_roots(ser, &ser.preprocess_roots, SerializedKind::Preprocess)
}

fn check_roots(
    ser: &SerializedTree,
    roots: &[usize],
    kind: SerializedKind,
) -> Result<(), DeserializeError> {
    for &root in roots {
        match ser.nodes.get(root) {
            Some(node) if node.kind == kind => {}
            Some(node) => {
                return Err(DeserializeError::Validation(format!(
                    "root {root} is a {:?} node, expected {kind:?}",
                    node.kind
                )));
            }
            None => {
                return Err(DeserializeError::Validation(format!(
                    "root {root} out of bounds (max {})",
                    ser.nodes.len()
                )));
            }
        }
    }
    Ok(())
}

/// The fixed-size prefix of every blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    format_version: u16,
    payload_len: u32,
    checksum: [u8; 16],
}

impl Header {
    fn for_payload(payload: &[u8]) -> Self {
        #[allow(clippy::cast_possible_truncation)] // rule trees stay far below 4 GiB
        let payload_len = payload.len() as u32;
        Self {
            format_version: FORMAT_VERSION,
            payload_len,
            checksum: checksum(payload),
        }
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(MAGIC);
        out[4..6].copy_from_slice(&self.format_version.to_le_bytes());
        out[6..8].copy_from_slice(&ENGINE_VERSION.to_le_bytes());
        // 8..12: flags, reserved as zero
        out[12..16].copy_from_slice(&self.payload_len.to_le_bytes());
        out[16..].copy_from_slice(&self.checksum);
        out
    }

    #[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32
    fn parse(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let Some((head, _)) = bytes.split_first_chunk::<HEADER_SIZE>() else {
            return Err(DeserializeError::LengthMismatch {
                expected: HEADER_SIZE as u32,
                actual: bytes.len(),
            });
        };
        if head[..4] != MAGIC[..] {
            return Err(DeserializeError::BadMagic);
        }
        let mut checksum = [0u8; 16];
        checksum.copy_from_slice(&head[16..]);
        Ok(Self {
            format_version: u16::from_le_bytes([head[4], head[5]]),
            payload_len: u32::from_le_bytes([head[12], head[13], head[14], head[15]]),
            checksum,
        })
    }
}

fn checksum(payload: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&blake3::hash(payload).as_bytes()[..16]);
    out
}

/// Prefix `payload` with its header.
fn seal(payload: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(HEADER_SIZE + payload.len());
    blob.extend_from_slice(&Header::for_payload(payload).to_bytes());
    blob.extend_from_slice(payload);
    blob
}

/// The payload of a sealed blob, once version, length and checksum agree.
fn open(bytes: &[u8]) -> Result<&[u8], DeserializeError> {
    let header = Header::parse(bytes)?;
    if header.format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: header.format_version,
            supported: FORMAT_VERSION,
        });
    }
    let body = &bytes[HEADER_SIZE..];
    let payload = body
        .get(..header.payload_len as usize)
        .ok_or(DeserializeError::LengthMismatch {
            expected: header.payload_len,
            actual: body.len(),
        })?;
    if checksum(payload) != header.checksum {
        return Err(DeserializeError::ChecksumMismatch);
    }
    Ok(payload)
}

fn decode_payload(bytes: &[u8]) -> Result<SerializedTree, DeserializeError> {
    let (serialized, _): (SerializedTree, usize) =
        bincode::serde::decode_from_slice(open(bytes)?, bincode::config::standard())?;
    Ok(serialized)
}

pub(crate) fn encode(tree: &RuleTree, source_text: Option<&str>) -> Result<Vec<u8>, SerializeError> {
    let serialized = tree_to_serialized(tree, source_text);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;
    Ok(seal(&payload))
}

pub(crate) fn decode(bytes: &[u8]) -> Result<RuleTree, DeserializeError> {
    let tree = serialized_to_tree(decode_payload(bytes)?)?;
    tracing::debug!(serial = tree.serial(), nodes = tree.len(), "rule tree decoded");
    Ok(tree)
}

/// Whether a cached blob was built from exactly `source_text`.
///
/// Blobs written without source text never match.
///
/// # Errors
///
/// Returns [`DeserializeError`] if the blob itself is unreadable.
pub fn matches_source(bytes: &[u8], source_text: &str) -> Result<bool, DeserializeError> {
    let serialized = decode_payload(bytes)?;
    Ok(serialized.metadata.source_digest == Some(*blake3::hash(source_text.as_bytes()).as_bytes()))
}

impl RuleTree {
    /// Serialize this compiled tree to a byte vector.
    ///
    /// The optional `source_text` is hashed (BLAKE3) and embedded in the
    /// payload metadata; see [`matches_source`].
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`] if encoding fails.
    pub fn to_bytes(&self, source_text: Option<&str>) -> Result<Vec<u8>, SerializeError> {
        encode(self, source_text)
    }

    /// Deserialize a tree produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`] on format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        decode(bytes)
    }

    /// # Errors
    ///
    /// Returns [`SerializeError`] on encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), SerializeError> {
        std::fs::write(path, self.to_bytes(source_text)?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DeserializeError`] on I/O, format, integrity, or validation
    /// failure.
    pub fn from_binary_file(path: impl AsRef<std::path::Path>) -> Result<Self, DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
