use crate::{db::TrieDB, error::TrieError, nibbles::Nibbles, node_hash::NodeHash};
use ethereum_types::H256;
use hearth_rlp::constants::RLP_NULL;
use hearth_rlp::decode::{decode_bytes, decode_rlp_item, get_item_with_prefix};
use hearth_rlp::encode::{encode_bytes, encode_length};
use hearth_rlp::error::RLPDecodeError;

/// Reference to a child node: absent, stored (by hash or inlined), or
/// loaded in memory after a mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NodeRef {
    #[default]
    None,
    Hash(NodeHash),
    Node(Box<Node>),
}

impl NodeRef {
    pub fn is_some(&self) -> bool {
        !matches!(self, NodeRef::None)
    }

    /// Retrieves the value at `path` under this reference.
    pub fn get(&self, db: &dyn TrieDB, path: Nibbles) -> Result<Option<Vec<u8>>, TrieError> {
        match self {
            NodeRef::None => Ok(None),
            NodeRef::Node(node) => node.get(db, path),
            NodeRef::Hash(_) => match self.load(db)? {
                Some(node) => node.get(db, path),
                None => Ok(None),
            },
        }
    }

    /// Decodes the referenced node from its stored encoding.
    fn load(&self, db: &dyn TrieDB) -> Result<Option<Node>, TrieError> {
        match self {
            NodeRef::None => Ok(None),
            NodeRef::Node(node) => Ok(Some((**node).clone())),
            NodeRef::Hash(NodeHash::Inline(encoded)) => Ok(Some(Node::decode_raw(encoded)?)),
            NodeRef::Hash(NodeHash::Hashed(hash)) => {
                let encoded = db.get(*hash)?.ok_or(TrieError::MissingNode(*hash))?;
                Ok(Some(Node::decode_raw(&encoded)?))
            }
        }
    }

    /// Takes the node out for mutation, loading it from the backend if needed.
    pub fn take_node(&mut self, db: &dyn TrieDB) -> Result<Option<Node>, TrieError> {
        match std::mem::take(self) {
            NodeRef::Node(node) => Ok(Some(*node)),
            other => other.load(db),
        }
    }
}

impl From<Node> for NodeRef {
    fn from(node: Node) -> Self {
        NodeRef::Node(Box::new(node))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    pub partial: Nibbles,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionNode {
    pub prefix: Nibbles,
    pub child: NodeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub choices: Box<[NodeRef; 16]>,
    pub value: Vec<u8>,
}

impl Default for BranchNode {
    fn default() -> Self {
        Self {
            choices: Box::new(std::array::from_fn(|_| NodeRef::None)),
            value: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(LeafNode),
    Extension(ExtensionNode),
    Branch(BranchNode),
}

impl Node {
    pub fn leaf(partial: Nibbles, value: Vec<u8>) -> Node {
        Node::Leaf(LeafNode { partial, value })
    }

    fn extension(prefix: Nibbles, child: NodeRef) -> Node {
        Node::Extension(ExtensionNode { prefix, child })
    }

    pub fn get(&self, db: &dyn TrieDB, path: Nibbles) -> Result<Option<Vec<u8>>, TrieError> {
        match self {
            Node::Leaf(leaf) => Ok((leaf.partial == path).then(|| leaf.value.clone())),
            Node::Extension(ext) => {
                if path.common_prefix_len(&ext.prefix) == ext.prefix.len() {
                    ext.child.get(db, path.offset(ext.prefix.len()))
                } else {
                    Ok(None)
                }
            }
            Node::Branch(branch) => match path.at(0) {
                None => Ok((!branch.value.is_empty()).then(|| branch.value.clone())),
                Some(nibble) => branch.choices[nibble as usize].get(db, path.offset(1)),
            },
        }
    }

    /// Inserts `value` at `path`, returning the updated node.
    pub fn insert(
        self,
        db: &dyn TrieDB,
        path: Nibbles,
        value: Vec<u8>,
    ) -> Result<Node, TrieError> {
        match self {
            Node::Leaf(leaf) => {
                if leaf.partial == path {
                    return Ok(Node::leaf(path, value));
                }
                Ok(split_into_branch(
                    leaf.partial,
                    leaf.value,
                    path,
                    value,
                ))
            }
            Node::Extension(mut ext) => {
                let common = path.common_prefix_len(&ext.prefix);
                if common == ext.prefix.len() {
                    let child = ext
                        .child
                        .take_node(db)?
                        .ok_or_else(|| inconsistent(&ext.prefix))?;
                    ext.child = child.insert(db, path.offset(common), value)?.into();
                    return Ok(Node::Extension(ext));
                }

                // The paths diverge inside the prefix: split into a branch
                // holding the old child on one side and the new leaf (or the
                // branch value) on the other.
                let mut branch = BranchNode::default();
                let ext_nibble = ext.prefix.at(common).unwrap_or_default();
                let ext_suffix = ext.prefix.offset(common + 1);
                branch.choices[ext_nibble as usize] = if ext_suffix.is_empty() {
                    ext.child
                } else {
                    Node::extension(ext_suffix, ext.child).into()
                };
                match path.at(common) {
                    None => branch.value = value,
                    Some(nibble) => {
                        branch.choices[nibble as usize] =
                            Node::leaf(path.offset(common + 1), value).into();
                    }
                }
                let node = Node::Branch(branch);
                if common > 0 {
                    Ok(Node::extension(path.prefix(common), node.into()))
                } else {
                    Ok(node)
                }
            }
            Node::Branch(mut branch) => {
                match path.at(0) {
                    None => branch.value = value,
                    Some(nibble) => {
                        let choice = &mut branch.choices[nibble as usize];
                        let updated = match choice.take_node(db)? {
                            Some(node) => node.insert(db, path.offset(1), value)?,
                            None => Node::leaf(path.offset(1), value),
                        };
                        *choice = updated.into();
                    }
                }
                Ok(Node::Branch(branch))
            }
        }
    }

    /// Removes the value at `path`.
    ///
    /// Returns the node that replaces this one (`None` if the subtree is now
    /// empty) along with the removed value.
    #[allow(clippy::type_complexity)]
    pub fn remove(
        self,
        db: &dyn TrieDB,
        path: Nibbles,
    ) -> Result<(Option<Node>, Option<Vec<u8>>), TrieError> {
        match self {
            Node::Leaf(leaf) => {
                if leaf.partial == path {
                    Ok((None, Some(leaf.value)))
                } else {
                    Ok((Some(Node::Leaf(leaf)), None))
                }
            }
            Node::Extension(mut ext) => {
                if path.common_prefix_len(&ext.prefix) != ext.prefix.len() {
                    return Ok((Some(Node::Extension(ext)), None));
                }
                let child = ext
                    .child
                    .take_node(db)?
                    .ok_or_else(|| inconsistent(&ext.prefix))?;
                let (new_child, removed) = child.remove(db, path.offset(ext.prefix.len()))?;
                let node = match new_child {
                    None => None,
                    // An extension may not point at a leaf or another
                    // extension: merge the paths instead.
                    Some(Node::Leaf(leaf)) => Some(Node::leaf(
                        ext.prefix.join(&leaf.partial),
                        leaf.value,
                    )),
                    Some(Node::Extension(inner)) => Some(Node::extension(
                        ext.prefix.join(&inner.prefix),
                        inner.child,
                    )),
                    Some(branch) => {
                        ext.child = branch.into();
                        Some(Node::Extension(ext))
                    }
                };
                Ok((node, removed))
            }
            Node::Branch(mut branch) => {
                let removed = match path.at(0) {
                    None => {
                        if branch.value.is_empty() {
                            return Ok((Some(Node::Branch(branch)), None));
                        }
                        Some(std::mem::take(&mut branch.value))
                    }
                    Some(nibble) => {
                        let choice = &mut branch.choices[nibble as usize];
                        match choice.take_node(db)? {
                            None => return Ok((Some(Node::Branch(branch)), None)),
                            Some(child) => {
                                let (new_child, removed) = child.remove(db, path.offset(1))?;
                                *choice = match new_child {
                                    Some(node) => node.into(),
                                    None => NodeRef::None,
                                };
                                removed
                            }
                        }
                    }
                };
                if removed.is_none() {
                    return Ok((Some(Node::Branch(branch)), None));
                }
                Ok((branch.normalize(db)?, removed))
            }
        }
    }

    /// Stores this node (and any loaded descendants) into the backend,
    /// returning its reference. Short encodings are inlined, not stored.
    pub fn commit(&mut self, db: &dyn TrieDB) -> Result<NodeHash, TrieError> {
        match self {
            Node::Leaf(_) => {}
            Node::Extension(ext) => {
                if let NodeRef::Node(child) = &mut ext.child {
                    ext.child = NodeRef::Hash(child.commit(db)?);
                }
            }
            Node::Branch(branch) => {
                for choice in branch.choices.iter_mut() {
                    if let NodeRef::Node(child) = choice {
                        *choice = NodeRef::Hash(child.commit(db)?);
                    }
                }
            }
        }
        let encoded = self.encode_raw();
        let hash = NodeHash::from_encoded(&encoded);
        if let NodeHash::Hashed(digest) = &hash {
            db.put(*digest, encoded)?;
        }
        Ok(hash)
    }

    /// RLP encoding per Yellow Paper Appendix D. All loaded children must
    /// have been committed first.
    pub fn encode_raw(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        match self {
            Node::Leaf(leaf) => {
                encode_bytes(&leaf.partial.to_compact(true), &mut payload);
                encode_bytes(&leaf.value, &mut payload);
            }
            Node::Extension(ext) => {
                encode_bytes(&ext.prefix.to_compact(false), &mut payload);
                encode_child(&ext.child, &mut payload);
            }
            Node::Branch(branch) => {
                for choice in branch.choices.iter() {
                    encode_child(choice, &mut payload);
                }
                encode_bytes(&branch.value, &mut payload);
            }
        }
        let mut buf = Vec::with_capacity(payload.len() + 4);
        encode_length(payload.len(), &mut buf);
        buf.extend_from_slice(&payload);
        buf
    }

    /// Decodes a node from its RLP encoding.
    pub fn decode_raw(encoded: &[u8]) -> Result<Node, TrieError> {
        let (is_list, mut payload, _) = decode_rlp_item(encoded)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString.into());
        }
        let mut items: Vec<&[u8]> = Vec::with_capacity(17);
        while !payload.is_empty() {
            let (item, rest) = get_item_with_prefix(payload)?;
            items.push(item);
            payload = rest;
        }
        match items.as_slice() {
            [path_item, value_item] => {
                let (compact, _) = decode_bytes(path_item)?;
                let (path, is_leaf) = Nibbles::from_compact(compact)
                    .ok_or(RLPDecodeError::MalformedData)?;
                if is_leaf {
                    let (value, _) = decode_bytes(value_item)?;
                    Ok(Node::leaf(path, value.to_vec()))
                } else {
                    Ok(Node::extension(path, decode_child(value_item)?))
                }
            }
            [choices @ .., value_item] if choices.len() == 16 => {
                let mut branch = BranchNode::default();
                for (i, choice) in choices.iter().enumerate() {
                    branch.choices[i] = decode_child(choice)?;
                }
                let (value, _) = decode_bytes(value_item)?;
                branch.value = value.to_vec();
                Ok(Node::Branch(branch))
            }
            _ => Err(RLPDecodeError::MalformedData.into()),
        }
    }
}

impl BranchNode {
    /// Restores the branch invariant after a removal: a branch must keep at
    /// least two children, or one child plus a value.
    fn normalize(mut self, db: &dyn TrieDB) -> Result<Option<Node>, TrieError> {
        let mut present = self
            .choices
            .iter()
            .enumerate()
            .filter(|(_, choice)| choice.is_some())
            .map(|(index, _)| index);
        let first = present.next();
        let second = present.next();
        let single = match (first, second) {
            // Two or more children left: still a valid branch.
            (Some(_), Some(_)) => return Ok(Some(Node::Branch(self))),
            (Some(index), None) => {
                if !self.value.is_empty() {
                    return Ok(Some(Node::Branch(self)));
                }
                index
            }
            (None, None) => {
                if self.value.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(Node::leaf(Nibbles::default(), self.value)));
            }
            _ => unreachable!(),
        };

        // Exactly one child and no value: absorb the child into its parent
        // path, turning the branch into a longer leaf or extension.
        let nibble = single as u8;
        let child = std::mem::take(&mut self.choices[single])
            .take_node(db)?
            .ok_or_else(|| inconsistent(&Nibbles::from_raw(vec![nibble])))?;
        Ok(Some(match child {
            Node::Leaf(leaf) => Node::leaf(leaf.partial.prepend(nibble), leaf.value),
            Node::Extension(ext) => Node::extension(ext.prefix.prepend(nibble), ext.child),
            branch @ Node::Branch(_) => {
                Node::extension(Nibbles::from_raw(vec![nibble]), branch.into())
            }
        }))
    }
}

/// Builds the branch (possibly under an extension) holding two diverging
/// leaf paths. Used when splitting a leaf on insert.
fn split_into_branch(
    old_path: Nibbles,
    old_value: Vec<u8>,
    new_path: Nibbles,
    new_value: Vec<u8>,
) -> Node {
    let common = old_path.common_prefix_len(&new_path);
    let mut branch = BranchNode::default();
    for (path, value) in [(&old_path, old_value), (&new_path, new_value)] {
        match path.at(common) {
            None => branch.value = value,
            Some(nibble) => {
                branch.choices[nibble as usize] =
                    Node::leaf(path.offset(common + 1), value).into();
            }
        }
    }
    let node = Node::Branch(branch);
    if common > 0 {
        Node::extension(new_path.prefix(common), node.into())
    } else {
        node
    }
}

fn encode_child(child: &NodeRef, payload: &mut Vec<u8>) {
    match child {
        NodeRef::None => payload.push(RLP_NULL),
        NodeRef::Hash(NodeHash::Hashed(hash)) => encode_bytes(hash.as_bytes(), payload),
        NodeRef::Hash(NodeHash::Inline(encoded)) => payload.extend_from_slice(encoded),
        // Loaded children are committed before their parent is encoded.
        NodeRef::Node(_) => unreachable!("encode_raw called with uncommitted child"),
    }
}

fn decode_child(item: &[u8]) -> Result<NodeRef, TrieError> {
    let (is_list, payload, _) = decode_rlp_item(item)?;
    if is_list {
        return Ok(NodeRef::Hash(NodeHash::Inline(item.to_vec())));
    }
    match payload.len() {
        0 => Ok(NodeRef::None),
        32 => Ok(NodeRef::Hash(NodeHash::Hashed(H256::from_slice(payload)))),
        _ => Err(RLPDecodeError::MalformedData.into()),
    }
}

fn inconsistent(path: &Nibbles) -> TrieError {
    TrieError::DbError(format!(
        "inconsistent tree: missing child along path {:?}",
        path.as_slice()
    ))
}
