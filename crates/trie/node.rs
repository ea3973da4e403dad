mod branch;
mod extension;
mod leaf;

pub use branch::BranchNode;
pub use extension::ExtensionNode;
pub use leaf::LeafNode;

use zond_rust_rlp::structs::Encoder;

use crate::{nibbles::Nibbles, node_hash::NodeHash, ValueRLP};

/// A node of an Ethereum-compatible Merkle Patricia Trie, owning its subtree.
#[derive(Debug, Clone)]
pub enum Node {
    Branch(BranchNode),
    Extension(ExtensionNode),
    Leaf(LeafNode),
}

impl From<BranchNode> for Node {
    fn from(val: BranchNode) -> Self {
        Node::Branch(val)
    }
}

impl From<ExtensionNode> for Node {
    fn from(val: ExtensionNode) -> Self {
        Node::Extension(val)
    }
}

impl From<LeafNode> for Node {
    fn from(val: LeafNode) -> Self {
        Node::Leaf(val)
    }
}

impl Node {
    /// Retrieves a value from the subtrie originating from this node given its path
    pub fn get(&self, path: Nibbles) -> Option<&ValueRLP> {
        match self {
            Node::Branch(n) => n.get(path),
            Node::Extension(n) => n.get(path),
            Node::Leaf(n) => n.get(path),
        }
    }

    /// Inserts a value into the subtrie originating from this node and
    /// returns the new root of the subtrie. Duplicate paths overwrite.
    pub fn insert(self, path: Nibbles, value: ValueRLP) -> Node {
        match self {
            Node::Branch(n) => n.insert(path, value),
            Node::Extension(n) => n.insert(path, value),
            Node::Leaf(n) => n.insert(path, value),
        }
    }

    /// RLP encoding of the node itself (not of a reference to it).
    pub fn encode_raw(&self) -> Vec<u8> {
        match self {
            Node::Branch(n) => n.encode_raw(),
            Node::Extension(n) => n.encode_raw(),
            Node::Leaf(n) => n.encode_raw(),
        }
    }

    /// Computes the node's hash, inlining encodings shorter than 32 bytes.
    pub fn compute_hash(&self) -> NodeHash {
        NodeHash::from_encoded_raw(self.encode_raw())
    }
}

/// Adds a child reference to a node encoding under construction: the child's
/// keccak hash if its encoding is 32 bytes or longer, the raw encoding inline
/// otherwise.
pub(crate) fn encode_child<'a>(encoder: Encoder<'a>, child: &Node) -> Encoder<'a> {
    match child.compute_hash() {
        NodeHash::Hashed(hash) => encoder.encode_bytes(hash.as_bytes()),
        NodeHash::Inline(raw) => encoder.encode_raw(&raw),
    }
}
