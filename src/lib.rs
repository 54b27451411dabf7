//! # lzwhuff
//!
//! Lossless compression in two stages.  Bytes are first turned into a stream of
//! LZW codes ("tokens"), then the tokens are entropy coded with a static Huffman
//! tree that is stored alongside the packed bits.
//!
//! * `lzw` - dictionary stage, bytes to tokens and back
//! * `huffman` - tree construction and bit packing of tokens
//! * `container` - the on-disk artifact holding packed bits, tree, and padding
//! * `lzw_huff` - the full pipeline, this is what most callers want
//!
//! Everything here transforms buffers in memory, the stream wrappers simply
//! read the whole input before starting.

mod tools;
pub mod lzw;
pub mod huffman;
pub mod container;
pub mod lzw_huff;

pub use lzw_huff::{compress_slice,expand_slice};
pub use tools::progress::Progress;

/// LZW tokens, also the symbols of the Huffman stage
pub type Token = u16;

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("input is empty")]
    EmptyInput,
    #[error("corrupt stream: {0}")]
    CorruptStream(String),
    #[error("symbol {0} is not in the code tree")]
    UnknownSymbol(Token),
    #[error("bad options: {0}")]
    BadOptions(String),
    #[error("i/o failure: {0}")]
    IoFailure(#[from] std::io::Error)
}

/// Options controlling compression.
/// Nothing here is stored in the artifact, so expansion has to use the same options.
#[derive(Clone)]
pub struct Options {
    /// ceiling on LZW codes, the dictionary is reset when an insertion would reach it,
    /// must be in 257..=65536 so that tokens fit in 16 bits
    pub max_codes: usize,
    /// number of elements processed between progress reports
    pub progress_interval: usize
}

pub const STD_OPTIONS: Options = Options {
    max_codes: 4096,
    progress_interval: 10000
};

impl Options {
    /// Verify the options can be satisfied
    pub fn check(&self) -> Result<(),Error> {
        if self.max_codes <= 256 || self.max_codes > Token::MAX as usize + 1 {
            return Err(Error::BadOptions(format!("max_codes must be in 257..=65536, got {}",self.max_codes)));
        }
        if self.progress_interval == 0 {
            return Err(Error::BadOptions("progress_interval cannot be 0".to_string()));
        }
        Ok(())
    }
}

#[test]
fn option_limits() {
    assert!(STD_OPTIONS.check().is_ok());
    let mut opt = STD_OPTIONS;
    opt.max_codes = 256;
    assert!(matches!(opt.check(),Err(Error::BadOptions(_))));
    opt.max_codes = 65536;
    assert!(opt.check().is_ok());
    opt.max_codes = 65537;
    assert!(matches!(opt.check(),Err(Error::BadOptions(_))));
    opt.max_codes = 4096;
    opt.progress_interval = 0;
    assert!(matches!(opt.check(),Err(Error::BadOptions(_))));
}
