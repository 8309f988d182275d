//! Decoder for a chunked, instruction-driven hyperspectral X-ray map
//! container: a raster of pixels, each carrying a sparse energy-channel
//! spectrum, packed into a block-oriented binary stream.
//!
//! This crate owns only the inner decode loop (see [`block_reader`],
//! [`spectrum`], [`map_walker`], [`driver`]). The outer archive format
//! (compound-file discovery, header parsing, geometry estimation) is an
//! external collaborator, represented here by the [`driver::Container`]
//! trait.

pub mod block_reader;
pub mod byte_ops;
pub mod cube;
pub mod driver;
pub mod map_walker;
pub mod pixel;
pub mod spectrum;

pub use block_reader::BlockReader;
pub use cube::{Count, Cube, CountWidth};
pub use driver::{AnyCube, ChunkedCubes, Container, DecodeOptions};

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    StreamExhausted,
    FormatViolation(String),
    UnsupportedCountWidth,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StreamExhausted => write!(f, "block iterator ended mid-record"),
            Error::FormatViolation(msg) => write!(f, "format violation: {}", msg),
            Error::UnsupportedCountWidth => write!(f, "64-bit count width is not supported"),
        }
    }
}

impl StdError for Error {}

pub type Result<T> = std::result::Result<T, Error>;
