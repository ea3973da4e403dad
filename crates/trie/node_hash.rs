use ethereum_types::H256;
use sha3::{Digest, Keccak256};

/// Reference to a trie node as seen by its parent.
/// Nodes whose RLP encoding is shorter than 32 bytes are embedded verbatim
/// instead of being referenced by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeHash {
    Hashed(H256),
    Inline(Vec<u8>),
}

impl NodeHash {
    /// Returns the `NodeHash` of an encoded node.
    pub fn from_encoded_raw(encoded: Vec<u8>) -> NodeHash {
        if encoded.len() >= 32 {
            let hash = Keccak256::new_with_prefix(&encoded).finalize();
            NodeHash::Hashed(H256::from_slice(hash.as_slice()))
        } else {
            NodeHash::Inline(encoded)
        }
    }

    /// Returns the finalized hash.
    /// NOTE: This will hash smaller nodes, only use to get the final root hash, not for child references.
    pub fn finalize(self) -> H256 {
        match self {
            NodeHash::Inline(x) => {
                H256::from_slice(Keccak256::new().chain_update(&*x).finalize().as_slice())
            }
            NodeHash::Hashed(x) => x,
        }
    }
}

impl AsRef<[u8]> for NodeHash {
    fn as_ref(&self) -> &[u8] {
        match self {
            NodeHash::Inline(x) => x.as_ref(),
            NodeHash::Hashed(x) => x.as_bytes(),
        }
    }
}
