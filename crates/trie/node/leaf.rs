use zond_rust_rlp::structs::Encoder;

use crate::{nibbles::Nibbles, node::BranchNode, ValueRLP};

use super::{ExtensionNode, Node};

/// Leaf Node of an an Ethereum Compatible Patricia Merkle Trie
/// Contains the node's remaining path and its value
#[derive(Debug, Clone, Default)]
pub struct LeafNode {
    pub partial: Nibbles,
    pub value: ValueRLP,
}

impl LeafNode {
    /// Creates a new leaf node with the given path and value
    pub fn new(partial: Nibbles, value: ValueRLP) -> Self {
        Self { partial, value }
    }

    /// Returns the stored value if the given path matches the stored path
    pub fn get(&self, path: Nibbles) -> Option<&ValueRLP> {
        (self.partial == path).then_some(&self.value)
    }

    /// Stores the received value and returns the new root of the subtrie previously consisting of self
    pub fn insert(mut self, path: Nibbles, value: ValueRLP) -> Node {
        /* Possible flow paths:
            Leaf { SelfValue } -> Leaf { Value }
            Leaf { SelfValue } -> Extension { Branch { [Self,...], Value } }
            Leaf { SelfValue } -> Extension { Branch { [ Leaf { Value }, ... ], SelfValue } }
            Leaf { SelfValue } -> Branch { [ Leaf { Value }, Self, ... ] }
        */
        if self.partial == path {
            self.value = value;
            return self.into();
        }

        let match_index = path.count_prefix(&self.partial);
        let self_choice_idx = self.partial.at(match_index);
        let new_leaf_choice_idx = path.at(match_index);

        let branch_node = if self_choice_idx == 16 {
            // The stored path ends at the divergence point, its value moves
            // into the branch. The new value continues in a leaf below it.
            let new_leaf = LeafNode::new(path.offset(match_index + 1), value);
            let mut choices = Box::new(BranchNode::EMPTY_CHOICES);
            choices[new_leaf_choice_idx] = Some(new_leaf.into());
            BranchNode::new_with_value(choices, self.value)
        } else if new_leaf_choice_idx == 16 {
            // The new path ends at the divergence point, the branch holds the
            // new value and self continues below it.
            let old_leaf = LeafNode::new(self.partial.offset(match_index + 1), self.value);
            let mut choices = Box::new(BranchNode::EMPTY_CHOICES);
            choices[self_choice_idx] = Some(old_leaf.into());
            BranchNode::new_with_value(choices, value)
        } else {
            // Both paths continue below the branch in their own leaves.
            let new_leaf = LeafNode::new(path.offset(match_index + 1), value);
            let old_leaf = LeafNode::new(self.partial.offset(match_index + 1), self.value);
            let mut choices = Box::new(BranchNode::EMPTY_CHOICES);
            choices[new_leaf_choice_idx] = Some(new_leaf.into());
            choices[self_choice_idx] = Some(old_leaf.into());
            BranchNode::new(choices)
        };

        if match_index == 0 {
            branch_node.into()
        } else {
            // The shared prefix becomes an extension node above the branch.
            ExtensionNode::new(path.slice(0, match_index), branch_node.into()).into()
        }
    }

    /// Encodes the node: a 2-item list [compact_path, value]
    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = vec![];
        Encoder::new(&mut buf)
            .encode_bytes(&self.partial.encode_compact())
            .encode_bytes(&self.value)
            .finish();
        buf
    }
}
