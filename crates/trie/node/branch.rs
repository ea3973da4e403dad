use zond_rust_rlp::structs::Encoder;

use crate::{nibbles::Nibbles, node::encode_child, ValueRLP};

use super::{LeafNode, Node};

/// Branch Node of an an Ethereum Compatible Patricia Merkle Trie
/// Contains the node's children (one per nibble) and an optional value for
/// a path terminating at this node
#[derive(Debug, Clone)]
pub struct BranchNode {
    pub choices: Box<[Option<Node>; 16]>,
    pub value: Option<ValueRLP>,
}

impl BranchNode {
    /// An empty choice array, used to build fresh branch nodes
    pub const EMPTY_CHOICES: [Option<Node>; 16] = [
        None, None, None, None, None, None, None, None, None, None, None, None, None, None, None,
        None,
    ];

    /// Creates a new branch node given its children
    pub fn new(choices: Box<[Option<Node>; 16]>) -> Self {
        Self {
            choices,
            value: None,
        }
    }

    /// Creates a new branch node given its children and a value ending here
    pub fn new_with_value(choices: Box<[Option<Node>; 16]>, value: ValueRLP) -> Self {
        Self {
            choices,
            value: Some(value),
        }
    }

    /// Retrieves a value from the subtrie originating from this node given its path
    pub fn get(&self, path: Nibbles) -> Option<&ValueRLP> {
        match path.at(0) {
            // The terminal marker: the path ends at this branch.
            16 => self.value.as_ref(),
            choice => self.choices[choice]
                .as_ref()
                .and_then(|child| child.get(path.offset(1))),
        }
    }

    /// Inserts a value into the subtrie originating from this node and returns the new root of the subtrie
    pub fn insert(mut self, path: Nibbles, value: ValueRLP) -> Node {
        match path.at(0) {
            16 => self.value = Some(value),
            choice => {
                self.choices[choice] = Some(match self.choices[choice].take() {
                    Some(child) => child.insert(path.offset(1), value),
                    None => LeafNode::new(path.offset(1), value).into(),
                })
            }
        }
        self.into()
    }

    /// Encodes the node: a 17-item list of the child references followed by
    /// the value slot (empty string if no path ends here)
    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = vec![];
        let mut encoder = Encoder::new(&mut buf);
        for choice in self.choices.iter() {
            encoder = match choice {
                Some(child) => encode_child(encoder, child),
                None => encoder.encode_bytes(&[]),
            };
        }
        encoder
            .encode_bytes(self.value.as_deref().unwrap_or(&[]))
            .finish();
        buf
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_branch() -> BranchNode {
        // Two keys diverging on their first nibble
        let node = Node::from(LeafNode::new(Nibbles::from_bytes(&[0x00]), vec![0x12]))
            .insert(Nibbles::from_bytes(&[0x10]), vec![0x34]);
        match node {
            Node::Branch(n) => n,
            _ => panic!("expected a branch node"),
        }
    }

    #[test]
    fn get_some() {
        let node = sample_branch();
        assert_eq!(node.get(Nibbles::from_bytes(&[0x00])), Some(&vec![0x12]));
        assert_eq!(node.get(Nibbles::from_bytes(&[0x10])), Some(&vec![0x34]));
    }

    #[test]
    fn get_none() {
        let node = sample_branch();
        assert!(node.get(Nibbles::from_bytes(&[0x20])).is_none());
    }

    #[test]
    fn insert_self_value() {
        // A key that is a strict prefix of existing keys terminates in the branch
        let leaf = LeafNode::new(Nibbles::from_bytes(&[0x12, 0x34]), vec![0x56]);
        let node = Node::from(leaf).insert(Nibbles::from_bytes(&[0x12]), vec![0x78]);
        assert_eq!(node.get(Nibbles::from_bytes(&[0x12])), Some(&vec![0x78]));
        assert_eq!(
            node.get(Nibbles::from_bytes(&[0x12, 0x34])),
            Some(&vec![0x56])
        );
    }
}
