//! Entry points that allocate the output cube(s), position the reader at
//! the map data, and hand control to [`crate::map_walker::MapWalker`].
//!
//! The outer archive format — compound-file discovery, header parsing,
//! geometry estimation — is out of scope for this crate and is represented
//! here only by the [`Container`] trait a real caller implements against it.

use crate::block_reader::BlockReader;
use crate::cube::{Count, Cube, CountWidth};
use crate::map_walker::MapWalker;
use crate::{Error, Result};

/// Absolute offset, within the logical data stream, at which map data
/// begins. Fixed by the on-disk format; skips a header prologue this
/// crate does not otherwise interpret.
pub const MAP_DATA_OFFSET: u32 = 0x1A0;

/// The inward collaborator contract: everything the driver needs from the
/// outer archive format to drive a decode, without this crate knowing
/// anything about compound-file discovery or header parsing.
pub trait Container {
    /// The type of the raw block iterator this container hands out.
    type Blocks: Iterator<Item = Vec<u8>>;

    /// Returns a fresh block iterator over the logical data stream, the
    /// nominal block size, and the total block count.
    fn get_iter_and_properties(&self) -> (Self::Blocks, u32, u32);

    /// Default channel depth when the caller supplies no explicit cutoff.
    fn estimate_map_channels(&self) -> u32;

    /// Suggested count-element width for a decode at the given downsample.
    fn estimate_map_depth(&self, downsample: u32) -> CountWidth;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Caller-supplied knobs for a decode. Mirrors how the teacher configures
/// itself through plain constructor arguments rather than an external
/// config format — there is nothing here to load from a file or the
/// environment.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Exclusive upper bound on channel indices written to the cube. When
    /// `None`, the container's own channel estimate is used.
    pub cutoff: Option<u32>,
    /// Spatial downsample factor. Must be >= 1.
    pub downsample: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            cutoff: None,
            downsample: 1,
        }
    }
}

fn ceil_div(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

/// An output cube whose count-element width was chosen at runtime from the
/// container's estimate, rather than by the caller.
#[derive(Debug)]
pub enum AnyCube {
    U8(Cube<u8>),
    U16(Cube<u16>),
    U32(Cube<u32>),
}

/// Decodes the entire map in one pass into a single cube shaped
/// `(D, ceil(W/s), ceil(H/s))`.
pub fn decode_whole_map<C: Container>(container: &C, options: DecodeOptions) -> Result<AnyCube> {
    let (blocks, _block_size, _total_blocks) = container.get_iter_and_properties();
    let mut reader = BlockReader::new(blocks)?;
    reader.seek(MAP_DATA_OFFSET)?;

    let depth = options.cutoff.unwrap_or_else(|| container.estimate_map_channels());
    let cutoff = options.cutoff.unwrap_or(depth);
    let s = options.downsample;
    let wd = ceil_div(container.width(), s);
    let hd = ceil_div(container.height(), s);

    match container.estimate_map_depth(s) {
        CountWidth::U64 => Err(Error::UnsupportedCountWidth),
        CountWidth::U8 => {
            let mut cube = Cube::<u8>::zeroed(depth, wd, hd);
            MapWalker::decode_rows(&mut reader, &mut cube, container.height(), s, cutoff)?;
            Ok(AnyCube::U8(cube))
        }
        CountWidth::U16 => {
            let mut cube = Cube::<u16>::zeroed(depth, wd, hd);
            MapWalker::decode_rows(&mut reader, &mut cube, container.height(), s, cutoff)?;
            Ok(AnyCube::U16(cube))
        }
        CountWidth::U32 => {
            let mut cube = Cube::<u32>::zeroed(depth, wd, hd);
            MapWalker::decode_rows(&mut reader, &mut cube, container.height(), s, cutoff)?;
            Ok(AnyCube::U32(cube))
        }
    }
}

/// A lazy sequence of per-band cubes, one per entry of the caller-supplied
/// list of row-band heights. The underlying [`BlockReader`] is preserved
/// across yields: each call to `next()` resumes exactly where the previous
/// band left off.
struct ChunkedDecoder<I: Iterator<Item = Vec<u8>>, T: Count> {
    reader: BlockReader<I>,
    band_heights: std::vec::IntoIter<u32>,
    depth: u32,
    width: u32,
    cutoff: u32,
    downsample: u32,
    _marker: std::marker::PhantomData<T>,
}

impl<I: Iterator<Item = Vec<u8>>, T: Count> Iterator for ChunkedDecoder<I, T> {
    type Item = Result<Cube<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let h = self.band_heights.next()?;
        let mut cube = Cube::<T>::zeroed(self.depth, self.width, h);
        match MapWalker::decode_rows(&mut self.reader, &mut cube, h, self.downsample, self.cutoff)
        {
            Ok(()) => Some(Ok(cube)),
            Err(e) => {
                log::warn!("chunked decode discarding in-flight band: {}", e);
                Some(Err(e))
            }
        }
    }
}

/// Count-width-erased wrapper around [`ChunkedDecoder`], yielding [`AnyCube`]
/// values so callers need not know the width ahead of time.
pub enum ChunkedCubes<I: Iterator<Item = Vec<u8>>> {
    U8(ChunkedDecoder<I, u8>),
    U16(ChunkedDecoder<I, u16>),
    U32(ChunkedDecoder<I, u32>),
}

impl<I: Iterator<Item = Vec<u8>>> Iterator for ChunkedCubes<I> {
    type Item = Result<AnyCube>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ChunkedCubes::U8(d) => d.next().map(|r| r.map(AnyCube::U8)),
            ChunkedCubes::U16(d) => d.next().map(|r| r.map(AnyCube::U16)),
            ChunkedCubes::U32(d) => d.next().map(|r| r.map(AnyCube::U32)),
        }
    }
}

/// Decodes the map as a lazy sequence of row bands, each of shape
/// `(D, W, h_i)` for `h_i` in `band_heights`. Width is intentionally left
/// un-downsampled here — the caller is expected to pass already-quantised
/// band heights; the decoder does not enforce that they are multiples of
/// the downsample factor.
pub fn decode_chunked<C: Container>(
    container: &C,
    band_heights: Vec<u32>,
    options: DecodeOptions,
) -> Result<ChunkedCubes<C::Blocks>> {
    let (blocks, _block_size, _total_blocks) = container.get_iter_and_properties();
    let mut reader = BlockReader::new(blocks)?;
    reader.seek(MAP_DATA_OFFSET)?;

    let depth = options.cutoff.unwrap_or_else(|| container.estimate_map_channels());
    let cutoff = options.cutoff.unwrap_or(depth);
    let width = container.width();
    let downsample = options.downsample;

    match container.estimate_map_depth(downsample) {
        CountWidth::U64 => Err(Error::UnsupportedCountWidth),
        CountWidth::U8 => Ok(ChunkedCubes::U8(ChunkedDecoder {
            reader,
            band_heights: band_heights.into_iter(),
            depth,
            width,
            cutoff,
            downsample,
            _marker: std::marker::PhantomData,
        })),
        CountWidth::U16 => Ok(ChunkedCubes::U16(ChunkedDecoder {
            reader,
            band_heights: band_heights.into_iter(),
            depth,
            width,
            cutoff,
            downsample,
            _marker: std::marker::PhantomData,
        })),
        CountWidth::U32 => Ok(ChunkedCubes::U32(ChunkedDecoder {
            reader,
            band_heights: band_heights.into_iter(),
            depth,
            width,
            cutoff,
            downsample,
            _marker: std::marker::PhantomData,
        })),
    }
}
