//! LZW Dictionary Stage
//!
//! Bytes are turned into a sequence of tokens, each token being the code of the longest
//! dictionary string matching the input at that point.  Codes 0-255 are the single bytes,
//! new strings are assigned codes starting from 256.
//!
//! When an insertion would reach `Options::max_codes` the whole dictionary is thrown away
//! and re-seeded with the 256 single bytes.  No clear code is written; the expander counts
//! insertions the same way and resets at the same point in the token stream.
//! The first token after a reset is therefore always a single byte.

use std::collections::HashMap;
use crate::tools::progress::Progress;
use crate::{Error,Options,Token};

/// Dictionary element as seen during expansion.
/// The string for a code is found by following `prefix` back to a root.
#[derive(Clone)]
struct Link {
    prefix: usize,
    sym: u8
}

impl Link {
    fn root(sym: u8) -> Self {
        // roots are identified by a prefix that is out of range of valid codes
        Self {
            prefix: usize::MAX,
            sym
        }
    }
    fn create(prefix: usize,sym: u8) -> Self {
        Self {
            prefix,
            sym
        }
    }
    fn is_root(&self) -> bool {
        self.prefix == usize::MAX
    }
}

/// Structure to perform LZW compression and expansion.
struct LZW {
    max_codes: usize,
    /// (prefix code, next byte) maps to code, used in compression
    index: HashMap<(usize,u8),usize>,
    /// code maps to (prefix code, last byte), used in expansion
    links: Vec<Link>,
    /// number of tokens that were emitted or consumed at each reset
    resets: Vec<usize>
}

impl LZW {
    fn create(opt: &Options) -> Result<Self,Error> {
        opt.check()?;
        let mut lzw = Self {
            max_codes: opt.max_codes,
            index: HashMap::new(),
            links: Vec::with_capacity(opt.max_codes),
            resets: Vec::new()
        };
        lzw.seed();
        Ok(lzw)
    }
    fn seed(&mut self) {
        self.index.clear();
        self.links.clear();
        for i in 0..=255 {
            self.links.push(Link::root(i));
        }
    }
    /// the next code that will be assigned
    fn next_code(&self) -> usize {
        self.links.len()
    }
    fn is_full(&self) -> bool {
        self.next_code() >= self.max_codes
    }
    /// Add the string `prefix`+`sym`, or start a new epoch if the ceiling has been reached.
    /// `boundary` is the token count at this point, kept as a record of where resets happen.
    fn add_or_reset(&mut self,prefix: usize,sym: u8,boundary: usize) {
        if self.is_full() {
            log::debug!("dictionary full after {} tokens, reset",boundary);
            self.seed();
            self.resets.push(boundary);
        } else {
            let code = self.next_code();
            self.index.insert((prefix,sym),code);
            self.links.push(Link::create(prefix,sym));
            log::trace!("add {} linking to {}.{}",code,prefix,sym);
        }
    }
    /// Walk back through the links to form the string
    fn get_string(&self,mut code: usize) -> Vec<u8> {
        let mut rev = Vec::new();
        loop {
            let link = &self.links[code];
            rev.push(link.sym);
            if link.is_root() {
                break;
            }
            code = link.prefix;
        }
        rev.reverse();
        rev
    }
}

/// Greedy longest match encoding, records the token count at each reset
fn encode_with_resets(ibuf: &[u8],opt: &Options,progress: &mut Progress) -> Result<(Vec<Token>,Vec<usize>),Error> {
    let mut lzw = LZW::create(opt)?;
    let mut tokens: Vec<Token> = Vec::new();
    // code of the string that has been matched so far
    let mut curr_match: Option<usize> = None;
    log::debug!("encoding {} bytes",ibuf.len());
    for (i,c) in ibuf.iter().enumerate() {
        curr_match = match curr_match {
            None => Some(*c as usize),
            Some(prefix) => match lzw.index.get(&(prefix,*c)) {
                Some(code) => Some(*code),
                None => {
                    log::trace!("code: {}",prefix);
                    tokens.push(prefix as Token);
                    lzw.add_or_reset(prefix,*c,tokens.len());
                    Some(*c as usize)
                }
            }
        };
        progress.tick(i,ibuf.len());
    }
    if let Some(prefix) = curr_match {
        tokens.push(prefix as Token);
    }
    log::debug!("produced {} tokens with {} resets",tokens.len(),lzw.resets.len());
    progress.finish();
    Ok((tokens,lzw.resets))
}

fn decode_with_resets(tokens: &[Token],opt: &Options,progress: &mut Progress) -> Result<(Vec<u8>,Vec<usize>),Error> {
    let mut lzw = LZW::create(opt)?;
    let (first,rest) = match tokens.split_first() {
        Some((first,rest)) => (*first as usize,rest),
        None => {
            log::error!("no tokens to decode");
            return Err(Error::CorruptStream("empty token stream".to_string()));
        }
    };
    if first > 255 {
        log::error!("first token {} is not a byte",first);
        return Err(Error::CorruptStream(format!("first LZW code {} is not a byte",first)));
    }
    let mut prev_code = first;
    let mut prev_str = vec![first as u8];
    let mut ans = prev_str.clone();
    log::debug!("decoding {} tokens",tokens.len());
    for (i,tok) in rest.iter().enumerate() {
        let code = *tok as usize;
        let entry = if code < lzw.next_code() {
            lzw.get_string(code)
        } else if code == lzw.next_code() && !lzw.is_full() {
            // string being defined by this very token
            let mut entry = prev_str.clone();
            entry.push(prev_str[0]);
            entry
        } else {
            log::error!("Bad LZW code, expected at most {}, got {}",lzw.next_code(),code);
            return Err(Error::CorruptStream(format!("invalid LZW code {} at token {}",code,i+1)));
        };
        log::trace!("  write {} as {:?}",code,entry);
        ans.extend_from_slice(&entry);
        let was_full = lzw.is_full();
        lzw.add_or_reset(prev_code,entry[0],i+1);
        if was_full && code > 255 {
            // the compressor always starts an epoch with a single byte
            log::error!("code {} opens a new dictionary epoch",code);
            return Err(Error::CorruptStream(format!("invalid LZW code {} after reset",code)));
        }
        prev_code = code;
        prev_str = entry;
        progress.tick(i,rest.len());
    }
    log::debug!("expanded to {} bytes with {} resets",ans.len(),lzw.resets.len());
    progress.finish();
    Ok((ans,lzw.resets))
}

/// Turn bytes into LZW tokens.  Empty input gives no tokens.
pub fn encode(ibuf: &[u8],opt: &Options,progress: &mut Progress) -> Result<Vec<Token>,Error> {
    Ok(encode_with_resets(ibuf,opt,progress)?.0)
}

/// Turn LZW tokens back into bytes.  There must be at least one token.
pub fn decode(tokens: &[Token],opt: &Options,progress: &mut Progress) -> Result<Vec<u8>,Error> {
    Ok(decode_with_resets(tokens,opt,progress)?.0)
}

/// Convenience function, calls `encode` with standard options and no progress reporting
pub fn encode_slice(slice: &[u8]) -> Result<Vec<Token>,Error> {
    encode(slice,&crate::STD_OPTIONS,&mut Progress::silent())
}

/// Convenience function, calls `decode` with standard options and no progress reporting
pub fn decode_slice(tokens: &[Token]) -> Result<Vec<u8>,Error> {
    decode(tokens,&crate::STD_OPTIONS,&mut Progress::silent())
}

// *************** TESTS *****************

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

#[test]
fn encoding_works() {
    // Example from wikipedia, without their stop code
    let test_data = "TOBEORNOTTOBEORTOBEORNOT".as_bytes();
    let expected: Vec<Token> = vec![84,79,66,69,79,82,78,79,84,256,258,260,265,259,261,263];
    assert_eq!(encode_slice(test_data).expect("encoding failed"),expected);
    assert_eq!(decode_slice(&expected).expect("decoding failed"),test_data.to_vec());
}

#[test]
fn self_referencing_code() {
    // "aaa..." produces codes that are used in the same step they are defined
    let test_data = "aaaaaaaaaa".as_bytes();
    let tokens = encode_slice(test_data).expect("encoding failed");
    assert_eq!(tokens,vec![97,256,257,258]);
    assert_eq!(decode_slice(&tokens).expect("decoding failed"),test_data.to_vec());
}

#[test]
fn empty_input() {
    assert!(encode_slice(&[]).expect("encoding failed").is_empty());
    assert!(matches!(decode_slice(&[]),Err(Error::CorruptStream(_))));
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let tokens = encode_slice(test_data).expect("encoding failed");
    assert!(tokens.len() < test_data.len());
    assert_eq!(decode_slice(&tokens).expect("decoding failed"),test_data.to_vec());
    let all_bytes: Vec<u8> = (0..=255).collect();
    let tokens = encode_slice(&all_bytes).expect("encoding failed");
    assert_eq!(tokens.len(),256);
    assert_eq!(decode_slice(&tokens).expect("decoding failed"),all_bytes);
}

#[test]
fn resets_are_synchronized() {
    let test_data = pseudo_random(60000,0x1234_5678);
    let (tokens,enc_resets) = encode_with_resets(&test_data,&crate::STD_OPTIONS,&mut Progress::silent()).expect("encoding failed");
    assert!(enc_resets.len() >= 2);
    assert!(tokens.iter().all(|t| (*t as usize) < crate::STD_OPTIONS.max_codes));
    for r in &enc_resets {
        assert!(tokens[*r] < 256);
    }
    let (expanded,dec_resets) = decode_with_resets(&tokens,&crate::STD_OPTIONS,&mut Progress::silent()).expect("decoding failed");
    assert_eq!(enc_resets,dec_resets);
    assert_eq!(expanded,test_data);
}

#[test]
fn small_ceiling() {
    let mut opt = crate::STD_OPTIONS;
    opt.max_codes = 260;
    let test_data = "TOBEORNOTTOBEORTOBEORNOT".as_bytes();
    let (tokens,resets) = encode_with_resets(test_data,&opt,&mut Progress::silent()).expect("encoding failed");
    assert!(tokens.iter().all(|t| *t < 260));
    assert!(resets.len() >= 2);
    let (expanded,dec_resets) = decode_with_resets(&tokens,&opt,&mut Progress::silent()).expect("decoding failed");
    assert_eq!(resets,dec_resets);
    assert_eq!(expanded,test_data.to_vec());
}

#[test]
fn bad_codes() {
    // 300 is beyond the next free code
    assert!(matches!(decode_slice(&[84,300]),Err(Error::CorruptStream(_))));
    // first code must be a byte
    assert!(matches!(decode_slice(&[256]),Err(Error::CorruptStream(_))));
    // next free code is allowed
    assert_eq!(decode_slice(&[84,256]).expect("decoding failed"),"TTT".as_bytes().to_vec());
}

#[test]
fn progress_is_bounded() {
    let mut opt = crate::STD_OPTIONS;
    opt.progress_interval = 1000;
    let test_data = pseudo_random(10000,42);
    let mut seen: Vec<f64> = Vec::new();
    let mut record = |p: f64| seen.push(p);
    let mut progress = Progress::create(Some(&mut record),opt.progress_interval);
    progress.stage(0.0,50.0);
    encode(&test_data,&opt,&mut progress).expect("encoding failed");
    drop(progress);
    assert_eq!(seen.len(),11);
    assert!(seen.iter().all(|p| *p >= 0.0 && *p <= 50.0));
    assert_eq!(*seen.last().unwrap(),50.0);
}
