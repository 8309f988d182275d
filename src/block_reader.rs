//! A cursor over a lazy sequence of opaque byte blocks that hides block
//! boundaries from upper layers.
//!
//! Modelled on the teacher's push-based `StartCodeScanner`, but pull-based:
//! the reader owns the iterator that produces raw blocks and fetches from
//! it only when a primitive read would otherwise run off the end of the
//! currently loaded buffer.

use crate::byte_ops;
use crate::{Error, Result};

/// Reads primitive little-endian integers and borrowed byte ranges from a
/// block-chunked stream, stitching block boundaries together transparently.
///
/// `I` yields one raw block per `next()` call; every block but possibly the
/// last is the producer's nominal block size.
pub struct BlockReader<I: Iterator<Item = Vec<u8>>> {
    blocks: I,
    buf: Vec<u8>,
    offset: usize,
}

impl<I: Iterator<Item = Vec<u8>>> BlockReader<I> {
    /// Creates a reader and eagerly loads the first block.
    ///
    /// Fails with [`Error::StreamExhausted`] if the block iterator is
    /// empty — there is no stream to read at all.
    pub fn new(mut blocks: I) -> Result<Self> {
        let first = blocks.next().ok_or(Error::StreamExhausted)?;
        Ok(Self {
            blocks,
            buf: first,
            offset: 0,
        })
    }

    /// Stitches the unread residue of the current buffer onto the next raw
    /// block and resets the offset to 0.
    fn fetch_next(&mut self) -> Result<()> {
        let next = self.blocks.next().ok_or(Error::StreamExhausted)?;
        if self.offset == 0 {
            // No residue to carry — avoid the copy.
            self.buf = next;
        } else {
            let mut stitched = self.buf[self.offset..].to_vec();
            stitched.extend_from_slice(&next);
            self.buf = stitched;
        }
        self.offset = 0;
        Ok(())
    }

    /// Fetches blocks until at least `n` bytes are available ahead of the
    /// offset, or the stream is exhausted.
    fn ensure(&mut self, n: usize) -> Result<()> {
        while self.buf.len() - self.offset < n {
            self.fetch_next()?;
        }
        Ok(())
    }

    /// Sets the read offset within the currently loaded buffer. Does not
    /// trigger a block fetch. The caller guarantees `absolute` lies within
    /// the buffer already loaded by [`BlockReader::new`] — this is used
    /// exactly once per decode, to skip the fixed header prologue.
    pub fn seek(&mut self, absolute: u32) -> Result<()> {
        let absolute = absolute as usize;
        if absolute > self.buf.len() {
            return Err(Error::FormatViolation(format!(
                "seek target {} lies outside the loaded buffer ({} bytes)",
                absolute,
                self.buf.len()
            )));
        }
        self.offset = absolute;
        Ok(())
    }

    /// Advances the offset by `n` bytes, fetching blocks as needed.
    pub fn skip(&mut self, n: u32) -> Result<()> {
        let n = n as usize;
        self.ensure(n)?;
        self.offset += n;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let v = self.buf[self.offset];
        self.offset += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let v = byte_ops::read_u16(&self.buf[self.offset..]);
        self.offset += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let v = byte_ops::read_u32(&self.buf[self.offset..]);
        self.offset += 4;
        Ok(v)
    }

    /// Reads the 40-bit value described in [`crate::byte_ops::read_u40`],
    /// advancing the offset by 5 bytes (not 8).
    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(5)?;
        let v = byte_ops::read_u40(&self.buf[self.offset..]);
        self.offset += 5;
        Ok(v)
    }

    /// Returns a borrowed contiguous slice of length `n` starting at the
    /// current offset, then advances past it. Fetches blocks first if
    /// needed. The borrow is only valid until the next call that could
    /// fetch a new block — which the borrow checker enforces, since this
    /// takes `&mut self` and returns a reference tied to that borrow.
    pub fn borrow(&mut self, n: usize) -> Result<&[u8]> {
        self.ensure(n)?;
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_over(blocks: Vec<Vec<u8>>) -> BlockReader<std::vec::IntoIter<Vec<u8>>> {
        BlockReader::new(blocks.into_iter()).unwrap()
    }

    #[test]
    fn test_new_fails_on_empty_stream() {
        let blocks: Vec<Vec<u8>> = vec![];
        assert!(matches!(
            BlockReader::new(blocks.into_iter()),
            Err(Error::StreamExhausted)
        ));
    }

    #[test]
    fn test_reads_within_single_block() {
        let mut r = reader_over(vec![vec![0x01, 0x02, 0x03, 0x04]]);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16().unwrap(), 0x0403);
    }

    #[test]
    fn test_read_u32_spans_block_boundary() {
        // 0x04030201 split across two blocks.
        let mut r = reader_over(vec![vec![0x01, 0x02], vec![0x03, 0x04]]);
        assert_eq!(r.read_u32().unwrap(), 0x0403_0201);
    }

    #[test]
    fn test_borrow_spans_block_boundary() {
        let mut r = reader_over(vec![vec![0xaa, 0xbb], vec![0xcc, 0xdd, 0xee]]);
        let slice = r.borrow(4).unwrap().to_vec();
        assert_eq!(slice, vec![0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(r.read_u8().unwrap(), 0xee);
    }

    #[test]
    fn test_stream_exhausted_mid_record() {
        let mut r = reader_over(vec![vec![0x01]]);
        assert!(matches!(r.read_u32(), Err(Error::StreamExhausted)));
    }

    #[test]
    fn test_seek_then_skip() {
        let mut r = reader_over(vec![vec![0, 1, 2, 3, 4, 5]]);
        r.seek(2).unwrap();
        assert_eq!(r.read_u8().unwrap(), 2);
        r.skip(2).unwrap();
        assert_eq!(r.read_u8().unwrap(), 5);
    }

    #[test]
    fn test_read_u64_consumes_five_bytes() {
        let mut r = reader_over(vec![vec![1, 0, 0, 0, 0, 0xaa, 0xbb]]);
        assert_eq!(r.read_u64().unwrap(), 1);
        assert_eq!(r.read_u8().unwrap(), 0xaa);
    }
}
