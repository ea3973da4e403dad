use zond_rust_rlp::structs::Encoder;

use crate::{nibbles::Nibbles, node::encode_child, ValueRLP};

use super::{BranchNode, Node};

/// Extension Node of an an Ethereum Compatible Patricia Merkle Trie
/// Contains the node's prefix and a single child subtree, doesn't store any value
#[derive(Debug, Clone)]
pub struct ExtensionNode {
    pub prefix: Nibbles,
    pub child: Box<Node>,
}

impl ExtensionNode {
    /// Creates a new extension node given its child and prefix
    pub fn new(prefix: Nibbles, child: Node) -> Self {
        Self {
            prefix,
            child: Box::new(child),
        }
    }

    /// Retrieves a value from the subtrie originating from this node given its path
    pub fn get(&self, path: Nibbles) -> Option<&ValueRLP> {
        // If the path is prefixed by this node's prefix, delegate to its child.
        // Otherwise, no value is present.
        if path.starts_with(&self.prefix) {
            self.child.get(path.offset(self.prefix.len()))
        } else {
            None
        }
    }

    /// Inserts a value into the subtrie originating from this node and returns the new root of the subtrie
    pub fn insert(mut self, path: Nibbles, value: ValueRLP) -> Node {
        /* Possible flow paths:
            Extension { prefix, child } -> Extension { prefix, child' } (insert into child)
            Extension { prefix, child } -> Branch { [ ..., child/Extension, ..., Leaf ] } (prefix split at the first nibble)
            Extension { prefixL+prefixR, child } -> Extension { prefixL, Branch { ... } } (prefix split further in)
        */
        let match_index = path.count_prefix(&self.prefix);
        if match_index == self.prefix.len() {
            // Insert into child node
            let child = *self.child;
            self.child = Box::new(child.insert(path.offset(match_index), value));
            self.into()
        } else if match_index == 0 {
            // An extension prefix never carries the terminal marker, so the
            // first nibble is a valid branch choice.
            let choice = self.prefix.at(0);
            let stripped = if self.prefix.len() == 1 {
                *self.child
            } else {
                ExtensionNode::new(self.prefix.offset(1), *self.child).into()
            };
            let mut choices = Box::new(BranchNode::EMPTY_CHOICES);
            choices[choice] = Some(stripped);
            Node::from(BranchNode::new(choices)).insert(path, value)
        } else {
            // Split the prefix at the divergence point, keeping the shared
            // part in self and pushing the rest into a new extension.
            let inner = ExtensionNode::new(self.prefix.offset(match_index), *self.child);
            let new_child = inner.insert(path.offset(match_index), value);
            ExtensionNode::new(self.prefix.slice(0, match_index), new_child).into()
        }
    }

    /// Encodes the node: a 2-item list [compact_prefix, child_reference]
    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = vec![];
        let encoder = Encoder::new(&mut buf).encode_bytes(&self.prefix.encode_compact());
        encode_child(encoder, &self.child).finish();
        buf
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::LeafNode;

    fn sample_extension() -> ExtensionNode {
        // Two leaves sharing the first nibble of their key
        let leaf_a = LeafNode::new(Nibbles::from_bytes(&[0x00]), vec![0x12, 0x34]);
        let node = Node::from(leaf_a).insert(Nibbles::from_bytes(&[0x01]), vec![0x56, 0x78]);
        match node {
            Node::Extension(n) => n,
            _ => panic!("expected an extension node"),
        }
    }

    #[test]
    fn get_some() {
        let node = sample_extension();
        assert_eq!(
            node.get(Nibbles::from_bytes(&[0x00])),
            Some(&vec![0x12, 0x34])
        );
        assert_eq!(
            node.get(Nibbles::from_bytes(&[0x01])),
            Some(&vec![0x56, 0x78])
        );
    }

    #[test]
    fn get_none() {
        let node = sample_extension();
        assert!(node.get(Nibbles::from_bytes(&[0x02])).is_none());
    }

    #[test]
    fn insert_into_child() {
        let node = sample_extension();
        let path = Nibbles::from_bytes(&[0x02]);
        let value = vec![0x9A];
        let node = node.insert(path.clone(), value.clone());
        assert!(matches!(node, Node::Extension(_)));
        assert_eq!(node.get(path), Some(&value));
    }

    #[test]
    fn insert_splitting_prefix() {
        let node = sample_extension();
        let path = Nibbles::from_bytes(&[0x10]);
        let value = vec![0x9A];
        let node = node.insert(path.clone(), value.clone());
        assert_eq!(node.get(path), Some(&value));
        assert_eq!(
            node.get(Nibbles::from_bytes(&[0x00])),
            Some(&vec![0x12, 0x34])
        );
    }
}
