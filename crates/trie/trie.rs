mod nibbles;
mod node;
mod node_hash;

use ethereum_types::H256;
use sha3::{Digest, Keccak256};
use zond_rust_rlp::constants::RLP_NULL;

pub use nibbles::Nibbles;
pub use node_hash::NodeHash;

use node::{LeafNode, Node};

use lazy_static::lazy_static;

lazy_static! {
    // Hash value for an empty trie, equal to keccak(RLP_NULL)
    pub static ref EMPTY_TRIE_HASH: H256 = H256::from_slice(
        Keccak256::new()
            .chain_update([RLP_NULL])
            .finalize()
            .as_slice(),
    );
}

/// RLP-encoded trie path
pub type PathRLP = Vec<u8>;
/// RLP-encoded trie value
pub type ValueRLP = Vec<u8>;

/// In-memory Ethereum Compatible Merkle Patricia Trie.
/// Insert-only; used to compute authenticated roots over accounts,
/// storages, transactions and receipts.
#[derive(Debug, Default)]
pub struct Trie {
    root: Option<Node>,
}

impl Trie {
    /// Creates a new empty trie
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Retrieve a value from the trie given its path.
    pub fn get(&self, path: &PathRLP) -> Option<&ValueRLP> {
        self.root
            .as_ref()
            .and_then(|root| root.get(Nibbles::from_bytes(path)))
    }

    /// Insert a value into the trie. Duplicate paths overwrite.
    pub fn insert(&mut self, path: PathRLP, value: ValueRLP) {
        let path = Nibbles::from_bytes(&path);
        self.root = Some(match self.root.take() {
            // If the trie is not empty, call the root node's insertion logic
            Some(root) => root.insert(path, value),
            // If the trie is empty, just add a leaf.
            None => LeafNode::new(path, value).into(),
        });
    }

    /// Return the hash of the trie's root node.
    /// Returns keccak(RLP_NULL) if the trie is empty
    pub fn hash(&self) -> H256 {
        self.root
            .as_ref()
            .map(|root| root.compute_hash().finalize())
            .unwrap_or(*EMPTY_TRIE_HASH)
    }

    /// Builds an in-memory trie from the given elements and returns its hash
    pub fn compute_hash_from_unsorted_iter(
        iter: impl Iterator<Item = (PathRLP, ValueRLP)>,
    ) -> H256 {
        let mut trie = Trie::new();
        for (path, value) in iter {
            trie.insert(path, value);
        }
        trie.hash()
    }
}
