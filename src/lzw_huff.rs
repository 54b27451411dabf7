//! LZW Compression with Static Huffman Encoding
//!
//! Compression runs the LZW stage, builds a Huffman tree from the token frequencies,
//! packs the tokens, and writes the container.  Expansion runs the same steps in reverse.
//!
//! * This transforms buffers, not files, the stream functions read everything first
//! * Progress goes from 0 to 50 during the first stage and from 50 to 100 during the second
//! * Empty input is refused with `Error::EmptyInput`
//!
//! Separate calls share nothing, so independent buffers can be handled on separate threads.

use std::io::{Read,Write};
use crate::container::Artifact;
use crate::tools::progress::Progress;
use crate::{huffman,lzw,Error,Options};

/// Compress a buffer, `on_progress` receives percentages in 0..=100
pub fn compress_slice(slice: &[u8],opt: &Options,on_progress: Option<&mut dyn FnMut(f64)>) -> Result<Vec<u8>,Error> {
    opt.check()?;
    if slice.is_empty() {
        return Err(Error::EmptyInput);
    }
    let mut progress = Progress::create(on_progress,opt.progress_interval);
    log::debug!("LZW stage");
    progress.stage(0.0,50.0);
    let tokens = lzw::encode(slice,opt,&mut progress)?;
    log::debug!("Huffman stage");
    progress.stage(50.0,100.0);
    let tree = huffman::Tree::build(&tokens)?;
    let (packed,padding) = huffman::encode(&tokens,&tree,&mut progress)?;
    let artifact = Artifact {
        packed,
        tree,
        padding
    };
    Ok(artifact.to_bytes())
}

/// Expand an artifact, `on_progress` receives percentages in 0..=100
pub fn expand_slice(slice: &[u8],opt: &Options,on_progress: Option<&mut dyn FnMut(f64)>) -> Result<Vec<u8>,Error> {
    opt.check()?;
    let mut progress = Progress::create(on_progress,opt.progress_interval);
    let artifact = Artifact::from_bytes(slice)?;
    log::debug!("Huffman stage");
    progress.stage(0.0,50.0);
    let tokens = huffman::decode(&artifact.packed,&artifact.tree,artifact.padding,&mut progress)?;
    log::debug!("LZW stage");
    progress.stage(50.0,100.0);
    lzw::decode(&tokens,opt,&mut progress)
}

/// Main compression function.
/// `expanded_in` is an object with the `Read` trait, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is an object with the `Write` trait, usually `std::fs::File`, or `Vec<u8>`.
/// Returns (in_size,out_size) or error.
pub fn compress<R,W>(expanded_in: &mut R,compressed_out: &mut W,opt: &Options,on_progress: Option<&mut dyn FnMut(f64)>) -> Result<(u64,u64),Error>
where R: Read, W: Write {
    let mut ibuf = Vec::new();
    expanded_in.read_to_end(&mut ibuf)?;
    let obuf = compress_slice(&ibuf,opt,on_progress)?;
    compressed_out.write_all(&obuf)?;
    compressed_out.flush()?;
    Ok((ibuf.len() as u64,obuf.len() as u64))
}

/// Main decompression function.
/// `compressed_in` is an object with the `Read` trait, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is an object with the `Write` trait, usually `std::fs::File`, or `Vec<u8>`.
/// Returns (in_size,out_size) or error.
pub fn expand<R,W>(compressed_in: &mut R,expanded_out: &mut W,opt: &Options,on_progress: Option<&mut dyn FnMut(f64)>) -> Result<(u64,u64),Error>
where R: Read, W: Write {
    let mut ibuf = Vec::new();
    compressed_in.read_to_end(&mut ibuf)?;
    let obuf = expand_slice(&ibuf,opt,on_progress)?;
    expanded_out.write_all(&obuf)?;
    expanded_out.flush()?;
    Ok((ibuf.len() as u64,obuf.len() as u64))
}

// *************** TESTS *****************

#[cfg(test)]
use crate::STD_OPTIONS;

#[cfg(test)]
fn pseudo_random(len: usize,mut seed: u32) -> Vec<u8> {
    let mut ans = Vec::with_capacity(len);
    for _i in 0..len {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        ans.push((seed >> 24) as u8);
    }
    ans
}

#[cfg(test)]
fn round_trip(test_data: &[u8]) -> Vec<u8> {
    let compressed = compress_slice(test_data,&STD_OPTIONS,None).expect("compression failed");
    let expanded = expand_slice(&compressed,&STD_OPTIONS,None).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
    compressed
}

#[test]
fn concrete_scenario() {
    let test_data = "TOBEORNOTTOBEORTOBEORNOT".as_bytes();
    let compressed = round_trip(test_data);
    let artifact = Artifact::from_bytes(&compressed).expect("parse failed");
    // 13 distinct tokens
    assert_eq!(artifact.tree.leaf_count(),13);
    let tokens = huffman::decode(&artifact.packed,&artifact.tree,artifact.padding,&mut Progress::silent()).expect("decoding failed");
    assert_eq!(tokens,vec![84,79,66,69,79,82,78,79,84,256,258,260,265,259,261,263]);
}

#[test]
fn invertibility() {
    round_trip("I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes());
    round_trip(&[0]);
    round_trip(&pseudo_random(255,7));
    let all_bytes: Vec<u8> = (0..=255).collect();
    round_trip(&all_bytes);
    round_trip(&pseudo_random(256,99));
}

#[test]
fn invertibility_with_resets() {
    // random bytes make short matches, so the dictionary fills many times
    let test_data = pseudo_random(100000,0xdead_beef);
    let tokens = lzw::encode_slice(&test_data).expect("encoding failed");
    assert!(tokens.len() > 2*(STD_OPTIONS.max_codes - 256));
    round_trip(&test_data);
}

#[test]
fn single_byte_input() {
    let compressed = round_trip("A".as_bytes());
    let artifact = Artifact::from_bytes(&compressed).expect("parse failed");
    assert_eq!(artifact.tree.node_count(),1);
    assert_eq!(artifact.packed,vec![0]);
    assert_eq!(artifact.padding,7);
}

#[test]
fn repeated_byte() {
    let test_data = vec![0x41;10000];
    let compressed = round_trip(&test_data);
    assert!(compressed.len() < 1000);
}

#[test]
fn determinism() {
    let test_data = pseudo_random(20000,3);
    let c1 = compress_slice(&test_data,&STD_OPTIONS,None).expect("compression failed");
    let c2 = compress_slice(&test_data,&STD_OPTIONS,None).expect("compression failed");
    assert_eq!(c1,c2);
}

#[test]
fn empty_input() {
    assert!(matches!(compress_slice(&[],&STD_OPTIONS,None),Err(Error::EmptyInput)));
    assert!(matches!(expand_slice(&[],&STD_OPTIONS,None),Err(Error::CorruptStream(_))));
}

#[test]
fn effectiveness() {
    let test_data = "ab".repeat(100000).into_bytes();
    let compressed = round_trip(&test_data);
    assert!(compressed.len() < test_data.len() / 10);
}

#[test]
fn corruption() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(20).into_bytes();
    let compressed = compress_slice(&test_data,&STD_OPTIONS,None).expect("compression failed");
    let artifact = Artifact::from_bytes(&compressed).expect("parse failed");
    let packed_start = compressed.len() - artifact.packed.len();
    let mid = packed_start + artifact.packed.len() / 2;
    for bit in 0..8 {
        let mut bad = compressed.clone();
        bad[mid] ^= 1 << bit;
        match expand_slice(&bad,&STD_OPTIONS,None) {
            Err(Error::CorruptStream(_)) => {},
            Ok(expanded) => assert_ne!(expanded,test_data),
            Err(e) => panic!("unexpected error {}",e)
        }
    }
}

#[test]
fn mismatched_ceiling() {
    let mut opt = STD_OPTIONS;
    opt.max_codes = 100;
    assert!(matches!(compress_slice("abc".as_bytes(),&opt,None),Err(Error::BadOptions(_))));
    assert!(matches!(expand_slice(&[],&opt,None),Err(Error::BadOptions(_))));
}

#[test]
fn progress_reports() {
    let test_data = pseudo_random(50000,11);
    let mut seen: Vec<f64> = Vec::new();
    let mut record = |p: f64| seen.push(p);
    let compressed = compress_slice(&test_data,&STD_OPTIONS,Some(&mut record)).expect("compression failed");
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert!(seen.iter().any(|p| *p > 0.0 && *p < 50.0));
    assert_eq!(seen.last().copied(),Some(100.0));
    // bounded rate: a handful of reports per stage, not one per element
    assert!(seen.len() < 100);
    let mut seen: Vec<f64> = Vec::new();
    let mut record = |p: f64| seen.push(p);
    let expanded = expand_slice(&compressed,&STD_OPTIONS,Some(&mut record)).expect("expansion failed");
    assert_eq!(expanded,test_data);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert!(seen.iter().any(|p| *p >= 50.0 && *p < 100.0));
    assert_eq!(seen.last().copied(),Some(100.0));
}

#[test]
fn streams() {
    let test_data = "TOBEORNOTTOBEORTOBEORNOT".as_bytes();
    let mut compressed: Vec<u8> = Vec::new();
    let (in_size,out_size) = compress(&mut std::io::Cursor::new(test_data),&mut compressed,&STD_OPTIONS,None).expect("compression failed");
    assert_eq!(in_size,24);
    assert_eq!(out_size,compressed.len() as u64);
    let mut expanded: Vec<u8> = Vec::new();
    let (in_size,out_size) = expand(&mut std::io::Cursor::new(&compressed),&mut expanded,&STD_OPTIONS,None).expect("expansion failed");
    assert_eq!(in_size,compressed.len() as u64);
    assert_eq!(out_size,24);
    assert_eq!(expanded,test_data.to_vec());
}

#[test]
fn independent_threads() {
    let handles: Vec<_> = (0..4).map(|seed| std::thread::spawn(move || {
        let test_data = pseudo_random(30000,seed + 1);
        let compressed = compress_slice(&test_data,&STD_OPTIONS,None).expect("compression failed");
        (compressed,test_data)
    })).collect();
    for h in handles {
        let (compressed,test_data) = h.join().expect("thread panicked");
        assert_eq!(expand_slice(&compressed,&STD_OPTIONS,None).expect("expansion failed"),test_data);
        assert_eq!(compress_slice(&test_data,&STD_OPTIONS,None).expect("compression failed"),compressed);
    }
}
