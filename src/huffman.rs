//! Static Huffman Coding of Tokens
//!
//! The tree is built once from the frequencies of the whole token stream.  It is kept in
//! an arena: nodes live in a `Vec` and refer to their children by index, the root index is
//! kept separately.  All traversals are iterative.
//!
//! Bits are packed MSB first, the last byte is padded with zeros, and the number of padding
//! bits (0-7) is returned along with the bytes.  A tree with a single leaf assigns it the
//! code `0`.

use std::cmp::Reverse;
use std::collections::{BinaryHeap,BTreeMap,HashMap};
use bit_vec::BitVec;
use crate::tools::progress::Progress;
use crate::{Error,Token};

#[derive(Clone,Debug,PartialEq)]
pub enum Node {
    Leaf(Token),
    /// children are indices into the arena, `left` is reached with a 0 bit
    Branch { left: usize, right: usize }
}

#[derive(Clone,Debug,PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: usize
}

impl Tree {
    /// Build the tree from the frequencies of `symbols`.
    /// Ties in frequency go to the lower arena index.  Leaves are put in the arena in ascending
    /// symbol order, and each merged node gets the next index, so the build is reproducible.
    pub fn build(symbols: &[Token]) -> Result<Self,Error> {
        let mut freq: BTreeMap<Token,usize> = BTreeMap::new();
        for sym in symbols {
            *freq.entry(*sym).or_insert(0) += 1;
        }
        let mut nodes = Vec::with_capacity(2*freq.len());
        let mut heap = BinaryHeap::new();
        for (sym,count) in freq {
            heap.push(Reverse((count,nodes.len())));
            nodes.push(Node::Leaf(sym));
        }
        log::debug!("building tree with {} leaves",nodes.len());
        loop {
            let Reverse((f1,left)) = match heap.pop() {
                Some(n) => n,
                None => return Err(Error::EmptyInput)
            };
            let Reverse((f2,right)) = match heap.pop() {
                Some(n) => n,
                None => return Ok(Self { nodes, root: left })
            };
            heap.push(Reverse((f1+f2,nodes.len())));
            nodes.push(Node::Branch { left, right });
        }
    }
    /// Assemble a tree from parts that have already been checked.
    /// Every branch must point at existing nodes and every node must be reachable from `root`.
    pub(crate) fn from_parts(nodes: Vec<Node>,root: usize) -> Self {
        Self {
            nodes,
            root
        }
    }
    pub fn root(&self) -> usize {
        self.root
    }
    pub fn node(&self,idx: usize) -> &Node {
        &self.nodes[idx]
    }
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n,Node::Leaf(_))).count()
    }
    /// arena indices in pre-order, left before right
    pub fn pre_order(&self) -> Vec<usize> {
        let mut ans = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            ans.push(idx);
            if let Node::Branch { left, right } = &self.nodes[idx] {
                stack.push(*right);
                stack.push(*left);
            }
        }
        ans
    }
    /// Map each symbol to its code by walking the tree
    pub fn code_table(&self) -> HashMap<Token,BitVec> {
        let mut table = HashMap::new();
        if let Node::Leaf(sym) = &self.nodes[self.root] {
            table.insert(*sym,BitVec::from_elem(1,false));
            return table;
        }
        let mut stack = vec![(self.root,BitVec::new())];
        while let Some((idx,path)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf(sym) => {
                    table.insert(*sym,path);
                },
                Node::Branch { left, right } => {
                    let mut right_path = path.clone();
                    right_path.push(true);
                    stack.push((*right,right_path));
                    let mut left_path = path;
                    left_path.push(false);
                    stack.push((*left,left_path));
                }
            }
        }
        table
    }
}

/// Pack the codes for `symbols` into bytes, returns (bytes,padding)
pub fn encode(symbols: &[Token],tree: &Tree,progress: &mut Progress) -> Result<(Vec<u8>,u8),Error> {
    let table = tree.code_table();
    let mut bits = BitVec::new();
    for (i,sym) in symbols.iter().enumerate() {
        let code = table.get(sym).ok_or(Error::UnknownSymbol(*sym))?;
        bits.extend(code.iter());
        progress.tick(i,symbols.len());
    }
    let padding = ((8 - bits.len() % 8) % 8) as u8;
    log::debug!("packed {} symbols into {} bits",symbols.len(),bits.len());
    progress.finish();
    Ok((bits.to_bytes(),padding))
}

/// Recover the symbols by walking the tree
pub fn decode(packed: &[u8],tree: &Tree,padding: u8,progress: &mut Progress) -> Result<Vec<Token>,Error> {
    if padding > 7 || (packed.is_empty() && padding > 0) {
        log::error!("padding of {} bits with {} bytes",padding,packed.len());
        return Err(Error::CorruptStream(format!("bad padding {}",padding)));
    }
    let bits = BitVec::from_bytes(packed);
    let total = bits.len() - padding as usize;
    let mut ans = Vec::new();
    let root_children = match tree.node(tree.root()) {
        Node::Branch { left, right } => (*left,*right),
        Node::Leaf(sym) => {
            for (i,bit) in bits.iter().take(total).enumerate() {
                if bit {
                    log::error!("bit {} is not the code of the only symbol",i);
                    return Err(Error::CorruptStream(format!("unknown code at bit {}",i)));
                }
                ans.push(*sym);
                progress.tick(i,total);
            }
            progress.finish();
            return Ok(ans);
        }
    };
    // children of the branch the walk is standing on
    let mut curs = root_children;
    for (i,bit) in bits.iter().take(total).enumerate() {
        let next = match bit {
            true => curs.1,
            false => curs.0
        };
        curs = match tree.node(next) {
            Node::Leaf(sym) => {
                ans.push(*sym);
                root_children
            },
            Node::Branch { left, right } => (*left,*right)
        };
        progress.tick(i,total);
    }
    if curs != root_children {
        log::error!("bits ran out inside the tree");
        return Err(Error::CorruptStream("bit stream ends in the middle of a code".to_string()));
    }
    log::debug!("unpacked {} symbols",ans.len());
    progress.finish();
    Ok(ans)
}

// *************** TESTS *****************

#[test]
fn small_tree() {
    let tree = Tree::build(&[5,5,7]).expect("build failed");
    assert_eq!(tree.node_count(),3);
    assert_eq!(tree.node(tree.root()),&Node::Branch { left: 1, right: 0 });
    let table = tree.code_table();
    assert_eq!(table[&7],BitVec::from_elem(1,false));
    assert_eq!(table[&5],BitVec::from_elem(1,true));
    let (packed,padding) = encode(&[5,5,7],&tree,&mut Progress::silent()).expect("encoding failed");
    assert_eq!(packed,vec![0xc0]);
    assert_eq!(padding,5);
}

#[test]
fn single_leaf() {
    let symbols: Vec<Token> = vec![0x41;10000];
    let tree = Tree::build(&symbols).expect("build failed");
    assert_eq!(tree.node_count(),1);
    assert_eq!(tree.leaf_count(),1);
    assert_eq!(tree.code_table()[&0x41],BitVec::from_elem(1,false));
    let (packed,padding) = encode(&symbols,&tree,&mut Progress::silent()).expect("encoding failed");
    assert_eq!(packed,vec![0;1250]);
    assert_eq!(padding,0);
    let decoded = decode(&packed,&tree,padding,&mut Progress::silent()).expect("decoding failed");
    assert_eq!(decoded,symbols);
    // a 1 bit is not a code in this tree
    assert!(matches!(decode(&[0x01],&tree,0,&mut Progress::silent()),Err(Error::CorruptStream(_))));
}

#[test]
fn prefix_property() {
    let symbols: Vec<Token> = vec![84,79,66,69,79,82,78,79,84,256,258,260,265,259,261,263];
    let tree = Tree::build(&symbols).expect("build failed");
    assert_eq!(tree.leaf_count(),13);
    assert_eq!(tree.node_count(),25);
    let codes: Vec<BitVec> = tree.code_table().into_values().collect();
    for (i,a) in codes.iter().enumerate() {
        for (j,b) in codes.iter().enumerate() {
            if i != j && a.len() <= b.len() {
                assert!(b.iter().take(a.len()).ne(a.iter()));
            }
        }
    }
}

#[test]
fn invertibility() {
    let symbols: Vec<Token> = vec![84,79,66,69,79,82,78,79,84,256,258,260,265,259,261,263];
    let tree = Tree::build(&symbols).expect("build failed");
    let (packed,padding) = encode(&symbols,&tree,&mut Progress::silent()).expect("encoding failed");
    assert!(padding < 8);
    let decoded = decode(&packed,&tree,padding,&mut Progress::silent()).expect("decoding failed");
    assert_eq!(decoded,symbols);
}

#[test]
fn deterministic_build() {
    let symbols: Vec<Token> = (0..2000).map(|i| ((i * 7919) % 600) as Token).collect();
    let t1 = Tree::build(&symbols).expect("build failed");
    let t2 = Tree::build(&symbols).expect("build failed");
    assert_eq!(t1,t2);
}

#[test]
fn errors() {
    assert!(matches!(Tree::build(&[]),Err(Error::EmptyInput)));
    let tree = Tree::build(&[1,2,2,3,3,3]).expect("build failed");
    assert!(matches!(encode(&[4],&tree,&mut Progress::silent()),Err(Error::UnknownSymbol(4))));
    assert!(matches!(decode(&[0xff],&tree,8,&mut Progress::silent()),Err(Error::CorruptStream(_))));
    assert!(matches!(decode(&[],&tree,1,&mut Progress::silent()),Err(Error::CorruptStream(_))));
}

#[test]
fn truncated_bits() {
    // frequencies 1,2,4 give codes of length 2,2,1
    let tree = Tree::build(&[1,2,2,3,3,3,3]).expect("build failed");
    let table = tree.code_table();
    assert_eq!(table[&1].len(),2);
    assert_eq!(table[&3].len(),1);
    let (packed,padding) = encode(&[1],&tree,&mut Progress::silent()).expect("encoding failed");
    assert_eq!(padding,6);
    // claim 7 bits of padding so the code for 1 is cut in half
    assert!(matches!(decode(&packed,&tree,7,&mut Progress::silent()),Err(Error::CorruptStream(_))));
}

#[test]
fn stream_ends_mid_code() {
    let tree = Tree::build(&[1,2,2,3,3,3,3]).expect("build failed");
    let symbols: Vec<Token> = vec![3,1,3,2];
    let (packed,padding) = encode(&symbols,&tree,&mut Progress::silent()).expect("encoding failed");
    // codes of length 1,2,1,2
    assert_eq!(padding,2);
    let decoded = decode(&packed,&tree,padding,&mut Progress::silent()).expect("decoding failed");
    assert_eq!(decoded,symbols);
    // three whole codes decode, then the last one is cut
    assert!(matches!(decode(&packed,&tree,3,&mut Progress::silent()),Err(Error::CorruptStream(_))));
    // cutting exactly one code is still a valid stream
    let decoded = decode(&packed,&tree,4,&mut Progress::silent()).expect("decoding failed");
    assert_eq!(decoded,vec![3,1,3]);
}
