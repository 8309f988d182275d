//! Translates a contiguous, already-borrowed byte range into channel
//! increments on one (x, y) column of the output cube.
//!
//! Two independent encodings share this module: the instructed "bunch"
//! decoder (runs of consecutive channels with a shared baseline) and the
//! 12-bit pulse decoder (an explicit list of channel indices for dense
//! pixels). Neither touches the [`crate::block_reader::BlockReader`]
//! directly — both operate purely on a slice the caller has already
//! borrowed, which keeps them trivially unit-testable.

use crate::byte_ops;
use crate::cube::{Count, Cube};
use crate::{Error, Result};

/// Decodes an instructed-bunch payload of `channels` runs into `cube` at
/// column `(x, y)`, dropping any channel index `>= cutoff`.
///
/// The payload is a sequence of 2-byte bunch heads `(size, channels)`
/// followed by a size-dependent gain and a size-dependent packed data area.
/// Decoding stops when the internal offset reaches the end of `data`; if a
/// bunch's declared fields would read past the end, decoding fails with
/// [`Error::FormatViolation`].
pub fn decode_bunches<T: Count>(
    data: &[u8],
    cube: &mut Cube<T>,
    x: u32,
    y: u32,
    cutoff: u32,
) -> Result<()> {
    let len = data.len();
    let mut offset = 0usize;
    let mut channel_cursor: u32 = 0;

    while offset < len {
        if offset + 2 > len {
            return Err(Error::FormatViolation(
                "bunch head runs past end of payload".into(),
            ));
        }
        let size = data[offset];
        let channels = data[offset + 1] as u32;
        offset += 2;

        if size == 0 {
            channel_cursor += channels;
            continue;
        }

        let gain_width = match size {
            1 | 2 | 4 => size as usize,
            _ => {
                log::warn!("bunch head took the legacy size={} gain branch", size);
                5
            }
        };
        if offset + gain_width > len {
            return Err(Error::FormatViolation(
                "bunch gain runs past end of payload".into(),
            ));
        }
        let gain: u64 = match size {
            1 => data[offset] as u64,
            2 => byte_ops::read_u16(&data[offset..]) as u64,
            4 => byte_ops::read_u32(&data[offset..]) as u64,
            _ => byte_ops::read_u40(&data[offset..]),
        };
        offset += gain_width;

        let data_bytes = match size {
            1 => (channels as usize + 1) / 2,
            2 => channels as usize,
            4 => channels as usize * 2,
            _ => channels as usize * 4,
        };
        if offset + data_bytes > len {
            return Err(Error::FormatViolation(
                "bunch data area runs past end of payload".into(),
            ));
        }
        let chunk = &data[offset..offset + data_bytes];

        for i in 0..channels {
            let value: u32 = match size {
                1 => {
                    let byte = chunk[(i / 2) as usize];
                    if i % 2 == 0 {
                        (byte & 0x0f) as u32
                    } else {
                        (byte >> 4) as u32
                    }
                }
                2 => chunk[i as usize] as u32,
                4 => byte_ops::read_u16(&chunk[(i as usize) * 2..]) as u32,
                _ => byte_ops::read_u32(&chunk[(i as usize) * 4..]),
            };

            let channel = channel_cursor + i;
            if channel < cutoff {
                cube.add(channel, x, y, value.wrapping_add(gain as u32));
            }
        }

        offset += data_bytes;
        channel_cursor += channels;
    }

    if offset != len {
        return Err(Error::FormatViolation(
            "bunch decode consumed a different byte count than the declared payload length"
                .into(),
        ));
    }
    Ok(())
}

/// Extracts the channel index of pulse `i` (0-based) from a 12-bit pulse
/// payload, per the fixed 4-pulses-per-6-bytes bit recipe.
fn extract_channel(data: &[u8], i: u32) -> u32 {
    let group = (i / 4) as usize;
    let phase = i % 4;
    let b = &data[group * 6..group * 6 + 6];
    match phase {
        0 => (b[0] as u32 >> 4) | ((b[1] as u32) << 4),
        1 => (((b[0] as u32) << 8) | b[3] as u32) & 0x0fff,
        2 => ((b[2] as u32) << 4) | (b[5] as u32 >> 4),
        3 => (((b[5] as u32) << 8) | b[4] as u32) & 0x0fff,
        _ => unreachable!("i % 4 is always in 0..4"),
    }
}

/// Decodes a 12-bit pulse list of `n_pulses` explicit channel indices into
/// `cube` at column `(x, y)`, dropping any channel index `>= cutoff`. Each
/// pulse increments its channel by exactly 1 — there is no gain and no
/// running channel cursor, unlike [`decode_bunches`].
pub fn decode_pulses12<T: Count>(
    data: &[u8],
    n_pulses: u32,
    cube: &mut Cube<T>,
    x: u32,
    y: u32,
    cutoff: u32,
) -> Result<()> {
    let groups_needed = (n_pulses as usize + 3) / 4;
    let bytes_needed = groups_needed * 6;
    if data.len() < bytes_needed {
        return Err(Error::FormatViolation(format!(
            "12-bit pulse payload has {} bytes, needs {} for {} pulses",
            data.len(),
            bytes_needed,
            n_pulses
        )));
    }

    for i in 0..n_pulses {
        let channel = extract_channel(data, i);
        if channel < cutoff {
            cube.add(channel, x, y, 1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::Cube;

    #[test]
    fn test_single_zero_gain_bunch() {
        // size=2, channels=3, gain=0 (2 bytes), data=[5, 7, 11]
        let payload = [2u8, 3, 0, 0, 5, 7, 11];
        let mut cube = Cube::<u16>::zeroed(8, 1, 1);
        decode_bunches(&payload, &mut cube, 0, 0, 8).unwrap();
        assert_eq!(cube.get(0, 0, 0), 5);
        assert_eq!(cube.get(1, 0, 0), 7);
        assert_eq!(cube.get(2, 0, 0), 11);
    }

    #[test]
    fn test_nibble_packed_bunch() {
        // size=1, channels=4, gain=10, data=[0x21, 0x43] -> nibbles 1,2,3,4
        let payload = [1u8, 4, 10, 0x21, 0x43];
        let mut cube = Cube::<u16>::zeroed(8, 1, 1);
        decode_bunches(&payload, &mut cube, 0, 0, 8).unwrap();
        assert_eq!(cube.get(0, 0, 0), 11);
        assert_eq!(cube.get(1, 0, 0), 12);
        assert_eq!(cube.get(2, 0, 0), 13);
        assert_eq!(cube.get(3, 0, 0), 14);
    }

    #[test]
    fn test_u16_packed_bunch() {
        // size=4, channels=2, gain=0 (4 bytes), data = two u16 LE values [1, 2]
        let payload = [4u8, 2, 0, 0, 0, 0, 0x01, 0x00, 0x02, 0x00];
        let mut cube = Cube::<u32>::zeroed(4, 1, 1);
        decode_bunches(&payload, &mut cube, 0, 0, 4).unwrap();
        assert_eq!(cube.get(0, 0, 0), 1);
        assert_eq!(cube.get(1, 0, 0), 2);
    }

    #[test]
    fn test_size_zero_bunch_advances_cursor_without_writing() {
        // size=0 run of 5 channels, then size=2 run of 1 channel with
        // gain=0 and a single data byte of 99.
        let payload = [0u8, 5, 2, 1, 0, 0, 99];
        let mut cube = Cube::<u32>::zeroed(8, 1, 1);
        decode_bunches(&payload, &mut cube, 0, 0, 8).unwrap();
        for c in 0..5 {
            assert_eq!(cube.get(c, 0, 0), 0);
        }
        assert_eq!(cube.get(5, 0, 0), 99);
    }

    #[test]
    fn test_legacy_size_branch_reads_five_byte_gain() {
        // size=9 (anything other than 0/1/2/4): 5-byte gain, u32-per-value data.
        let payload = [9u8, 1, 7, 0, 0, 0, 0, 3, 0, 0, 0];
        let mut cube = Cube::<u32>::zeroed(4, 1, 1);
        decode_bunches(&payload, &mut cube, 0, 0, 4).unwrap();
        assert_eq!(cube.get(0, 0, 0), 10);
    }

    #[test]
    fn test_cutoff_clips_channels() {
        // channels 0..9 via a single bunch, cutoff=5.
        let mut data = vec![2u8, 9, 0, 0];
        data.extend((0u8..9).map(|c| c + 1));
        let mut cube = Cube::<u32>::zeroed(9, 1, 1);
        decode_bunches(&data, &mut cube, 0, 0, 5).unwrap();
        for c in 0..5 {
            assert_eq!(cube.get(c, 0, 0), c + 1);
        }
        for c in 5..9 {
            assert_eq!(cube.get(c, 0, 0), 0);
        }
    }

    #[test]
    fn test_bunch_overrun_is_format_violation() {
        let payload = [2u8, 3, 0, 5, 7]; // declares 3 channels, only 2 bytes of data
        let mut cube = Cube::<u32>::zeroed(8, 1, 1);
        assert!(matches!(
            decode_bunches(&payload, &mut cube, 0, 0, 8),
            Err(Error::FormatViolation(_))
        ));
    }

    #[test]
    fn test_twelve_bit_pulses() {
        // N=4, one six-byte group encoding channels 0x123, 0x456, 0x789, 0xABC.
        // phase0: (b0>>4)|(b1<<4) = 0x123 -> b0 = 0x?3 (low nibble 3), b1 = 0x12
        // phase1: ((b0<<8)|b3)&0xFFF = 0x456 -> b0 low nibble=4 -> b0=0x43 (high nibble free)
        // phase2: (b2<<4)|(b5>>4) = 0x789 -> b2=0x78, b5 high nibble=9
        // phase3: ((b5<<8)|b4)&0xFFF = 0xABC -> b5 low nibble=0xA, b4=0xBC
        let b0 = 0x43u8; // low nibble (bits0-3) = 3 for phase0, high nibble = 4 for phase1
        let b1 = 0x12u8;
        let b2 = 0x78u8;
        let b3 = 0x56u8;
        let b4 = 0xBCu8;
        let b5 = 0x9Au8; // high nibble 9 (phase2), low nibble 0xA (phase3)
        let group = [b0, b1, b2, b3, b4, b5];

        assert_eq!(extract_channel(&group, 0), 0x123);
        assert_eq!(extract_channel(&group, 1), 0x456);
        assert_eq!(extract_channel(&group, 2), 0x789);
        assert_eq!(extract_channel(&group, 3), 0xABC);

        let mut cube = Cube::<u32>::zeroed(0xAC0, 1, 1);
        decode_pulses12(&group, 4, &mut cube, 0, 0, 0xAC0).unwrap();
        assert_eq!(cube.get(0x123, 0, 0), 1);
        assert_eq!(cube.get(0x456, 0, 0), 1);
        assert_eq!(cube.get(0x789, 0, 0), 1);
        assert_eq!(cube.get(0xABC, 0, 0), 1);
    }

    #[test]
    fn test_twelve_bit_pulse_payload_too_short() {
        let group = [0u8; 5]; // needs 6 for even a single pulse
        let mut cube = Cube::<u32>::zeroed(16, 1, 1);
        assert!(matches!(
            decode_pulses12(&group, 1, &mut cube, 0, 0, 16),
            Err(Error::FormatViolation(_))
        ));
    }

    #[test]
    fn test_twelve_bit_cutoff_drops_high_channels() {
        let group = [0x43u8, 0x12, 0x78, 0x56, 0xBC, 0x9A];
        let mut cube = Cube::<u32>::zeroed(0x200, 1, 1);
        decode_pulses12(&group, 2, &mut cube, 0, 0, 0x200).unwrap();
        assert_eq!(cube.get(0x123, 0, 0), 1);
        // channel 1 (0x456) is >= cutoff (0x200), so it must be dropped.
    }
}
