//! The outer decode loop: walks rows, then pixels within each row,
//! dispatching each pixel's payload to the matching spectrum decoder.

use crate::block_reader::BlockReader;
use crate::cube::{Count, Cube};
use crate::pixel::PixelHeader;
use crate::spectrum;
use crate::{Error, Result};

pub struct MapWalker;

impl MapWalker {
    /// Decodes `rows` rows of pixel records from `reader` into `cube`,
    /// starting at whatever position `reader` is currently at.
    ///
    /// `downsample` divides both pixel_x and the row index (integer
    /// division) to compute the destination column; `cutoff` is the
    /// exclusive upper bound on channel indices written to `cube`.
    pub fn decode_rows<I, T>(
        reader: &mut BlockReader<I>,
        cube: &mut Cube<T>,
        rows: u32,
        downsample: u32,
        cutoff: u32,
    ) -> Result<()>
    where
        I: Iterator<Item = Vec<u8>>,
        T: Count,
    {
        for row in 0..rows {
            let pixel_count = reader.read_u32()?;
            let yd = row / downsample;

            for _ in 0..pixel_count {
                let header = PixelHeader::parse(reader)?;
                let xd = header.pixel_x / downsample;

                if header.is_twelve_bit() {
                    let payload = reader.borrow(header.data_size2 as usize)?;
                    spectrum::decode_pulses12(
                        payload,
                        header.n_of_pulses as u32,
                        cube,
                        xd,
                        yd,
                        cutoff,
                    )?;
                } else {
                    if header.data_size2 < 4 {
                        return Err(Error::FormatViolation(format!(
                            "data_size2 ({}) is too small to hold the trailing add_pulse_size field",
                            header.data_size2
                        )));
                    }
                    let bunch_len = header.data_size2 as usize - 4;
                    let payload = reader.borrow(bunch_len)?;
                    spectrum::decode_bunches(payload, cube, xd, yd, cutoff)?;

                    // add_pulse_size's value is never used, only consumed;
                    // this read covers both the n_of_pulses > 0 case and
                    // the n_of_pulses == 0 "skip 4 bytes" case identically.
                    let _add_pulse_size = reader.read_u32()?;
                    for _ in 0..header.n_of_pulses {
                        let v = reader.read_u16()? as u32;
                        if v < cutoff {
                            cube.add(v, xd, yd, 1);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
