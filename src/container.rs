//! Artifact Container
//!
//! The compressed artifact holds the packed Huffman bits, the tree needed to walk them,
//! and the count of padding bits.  Integers are little endian.
//!
//! ```text
//! [u32 padding] [u32 node count] [nodes in pre-order] [u64 packed length] [packed bytes]
//! ```
//!
//! Each node is a tag byte, 0 for a branch and 1 for a leaf.  A leaf is followed by its
//! symbol as a u16, a branch is followed directly by its left and then its right subtree.
//! Only structure is checked here, whether the bits make sense is up to the codecs.

use std::collections::HashSet;
use std::io::{Cursor,Read};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use crate::huffman::{Node,Tree};
use crate::{Error,Token};

/// placeholder for a child that has not been read yet
const UNLINKED: usize = usize::MAX;

#[derive(FromPrimitive)]
enum Tag {
    Branch = 0,
    Leaf = 1
}

#[derive(Clone,Debug)]
pub struct Artifact {
    pub packed: Vec<u8>,
    pub tree: Tree,
    pub padding: u8
}

/// Facts about an artifact, suitable for display
#[derive(Debug,PartialEq)]
pub struct Summary {
    pub padding: u8,
    pub tree_nodes: usize,
    pub leaves: usize,
    pub packed_bytes: usize,
    pub total_bytes: usize
}

impl std::fmt::Display for Summary {
    fn fmt(&self,f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f,"artifact size: {}",self.total_bytes)?;
        writeln!(f,"tree nodes:    {}",self.tree_nodes)?;
        writeln!(f,"tree leaves:   {}",self.leaves)?;
        writeln!(f,"packed bytes:  {}",self.packed_bytes)?;
        write!(f,"padding bits:  {}",self.padding)
    }
}

fn corrupt(msg: &str) -> Error {
    log::error!("{}",msg);
    Error::CorruptStream(msg.to_string())
}

fn read_array<const N: usize>(reader: &mut Cursor<&[u8]>,what: &str) -> Result<[u8;N],Error> {
    let mut buf = [0;N];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(buf),
        Err(_) => Err(corrupt(&format!("artifact ends inside {}",what)))
    }
}

fn remaining(reader: &Cursor<&[u8]>) -> usize {
    reader.get_ref().len().saturating_sub(reader.position() as usize)
}

/// Read `count` pre-order nodes into an arena whose root is at index 0.
/// Branches wait on a stack until both children are linked.
fn read_tree(reader: &mut Cursor<&[u8]>,count: usize) -> Result<Tree,Error> {
    let mut nodes: Vec<Node> = Vec::with_capacity(count);
    let mut pending: Vec<usize> = Vec::new();
    let mut symbols: HashSet<Token> = HashSet::new();
    for idx in 0..count {
        if idx > 0 {
            let parent = match pending.last() {
                Some(p) => *p,
                None => return Err(corrupt("tree is complete before the declared node count"))
            };
            if let Node::Branch { left, right } = &mut nodes[parent] {
                if *left == UNLINKED {
                    *left = idx;
                } else {
                    *right = idx;
                    pending.pop();
                }
            }
        }
        let [tag] = read_array::<1>(reader,"tree node")?;
        match Tag::from_u8(tag) {
            Some(Tag::Branch) => {
                pending.push(idx);
                nodes.push(Node::Branch { left: UNLINKED, right: UNLINKED });
            },
            Some(Tag::Leaf) => {
                let sym = Token::from_le_bytes(read_array(reader,"leaf symbol")?);
                if !symbols.insert(sym) {
                    return Err(corrupt(&format!("symbol {} appears twice in tree",sym)));
                }
                nodes.push(Node::Leaf(sym));
            },
            None => return Err(corrupt(&format!("unknown tree node tag {}",tag)))
        }
    }
    if !pending.is_empty() {
        return Err(corrupt("tree has branches with missing children"));
    }
    Ok(Tree::from_parts(nodes,0))
}

impl Artifact {
    pub fn to_bytes(&self) -> Vec<u8> {
        let order = self.tree.pre_order();
        let mut ans = Vec::with_capacity(16 + 3*order.len() + self.packed.len());
        ans.extend_from_slice(&u32::to_le_bytes(self.padding as u32));
        ans.extend_from_slice(&u32::to_le_bytes(order.len() as u32));
        for idx in order {
            match self.tree.node(idx) {
                Node::Branch { .. } => ans.push(Tag::Branch as u8),
                Node::Leaf(sym) => {
                    ans.push(Tag::Leaf as u8);
                    ans.extend_from_slice(&sym.to_le_bytes());
                }
            }
        }
        ans.extend_from_slice(&u64::to_le_bytes(self.packed.len() as u64));
        ans.extend_from_slice(&self.packed);
        ans
    }
    pub fn from_bytes(buf: &[u8]) -> Result<Self,Error> {
        let mut reader = Cursor::new(buf);
        let padding = u32::from_le_bytes(read_array(&mut reader,"padding")?);
        if padding > 7 {
            return Err(corrupt(&format!("padding of {} bits",padding)));
        }
        let count = u32::from_le_bytes(read_array(&mut reader,"node count")?) as usize;
        // every node takes at least one byte
        if count == 0 || count > remaining(&reader) {
            return Err(corrupt(&format!("node count {} does not fit artifact",count)));
        }
        let tree = read_tree(&mut reader,count)?;
        let packed_len = u64::from_le_bytes(read_array(&mut reader,"packed length")?);
        if packed_len != remaining(&reader) as u64 {
            return Err(corrupt(&format!("packed length {} but {} bytes remain",packed_len,remaining(&reader))));
        }
        let packed = buf[reader.position() as usize..].to_vec();
        if packed.is_empty() && padding > 0 {
            return Err(corrupt("padding without packed bits"));
        }
        log::debug!("artifact has {} tree nodes and {} packed bytes",count,packed.len());
        Ok(Self {
            packed,
            tree,
            padding: padding as u8
        })
    }
    pub fn summary(&self) -> Summary {
        Summary {
            padding: self.padding,
            tree_nodes: self.tree.node_count(),
            leaves: self.tree.leaf_count(),
            packed_bytes: self.packed.len(),
            total_bytes: 16 + 2*self.tree.leaf_count() + self.tree.node_count() + self.packed.len()
        }
    }
}

// *************** TESTS *****************

#[cfg(test)]
fn small_artifact() -> Artifact {
    use crate::tools::progress::Progress;
    let tree = Tree::build(&[5,5,7]).expect("build failed");
    let (packed,padding) = crate::huffman::encode(&[5,5,7],&tree,&mut Progress::silent()).expect("encoding failed");
    Artifact { packed, tree, padding }
}

#[test]
fn layout() {
    let expected = "05000000 03000000 00 010700 010500 0100000000000000 C0";
    let bytes = small_artifact().to_bytes();
    assert_eq!(bytes,hex::decode(expected.replace(" ","")).unwrap());
    assert_eq!(small_artifact().summary().total_bytes,bytes.len());
}

#[test]
fn parse_and_write_back() {
    let bytes = small_artifact().to_bytes();
    let artifact = Artifact::from_bytes(&bytes).expect("parse failed");
    assert_eq!(artifact.padding,5);
    assert_eq!(artifact.packed,vec![0xc0]);
    assert_eq!(artifact.tree.node(0),&Node::Branch { left: 1, right: 2 });
    assert_eq!(artifact.tree.code_table(),small_artifact().tree.code_table());
    assert_eq!(artifact.to_bytes(),bytes);
    assert_eq!(artifact.summary(),Summary { padding: 5, tree_nodes: 3, leaves: 2, packed_bytes: 1, total_bytes: 24 });
}

#[test]
fn single_leaf_tree() {
    let bytes = hex::decode("00000000 01000000 014100 0200000000000000 0000".replace(" ","")).unwrap();
    let artifact = Artifact::from_bytes(&bytes).expect("parse failed");
    assert_eq!(artifact.tree.node_count(),1);
    assert_eq!(artifact.tree.node(artifact.tree.root()),&Node::Leaf(0x41));
    assert_eq!(artifact.to_bytes(),bytes);
}

#[test]
fn structural_errors() {
    let good = small_artifact().to_bytes();
    let check = |bytes: &[u8]| matches!(Artifact::from_bytes(bytes),Err(Error::CorruptStream(_)));
    // truncated anywhere
    for len in 0..good.len() {
        assert!(check(&good[0..len]));
    }
    // trailing garbage
    let mut long = good.clone();
    long.push(0);
    assert!(check(&long));
    // padding too large
    let mut bad = good.clone();
    bad[0] = 8;
    assert!(check(&bad));
    // bad tag
    let mut bad = good.clone();
    bad[8] = 2;
    assert!(check(&bad));
    // node count too small leaves a branch without children
    let mut bad = good.clone();
    bad[4] = 2;
    assert!(check(&bad));
    // duplicate leaves
    let bytes = hex::decode("00000000 03000000 00 010700 010700 0100000000000000 C0".replace(" ","")).unwrap();
    assert!(check(&bytes));
    // zero nodes
    let bytes = hex::decode("00000000 00000000 0000000000000000".replace(" ","")).unwrap();
    assert!(check(&bytes));
}
