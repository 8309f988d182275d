//! Minimal whole-map decode against a toy in-memory container.
//!
//! Builds a single-block stream with one row of one pixel carrying a
//! two-channel instructed bunch, then decodes it and prints the resulting
//! cube slice.

use edx_hypermap::cube::CountWidth;
use edx_hypermap::driver::{decode_whole_map, AnyCube, Container, DecodeOptions, MAP_DATA_OFFSET};

struct ToyContainer {
    block: Vec<u8>,
    channels: u32,
    width: u32,
    height: u32,
}

impl Container for ToyContainer {
    type Blocks = std::iter::Once<Vec<u8>>;

    fn get_iter_and_properties(&self) -> (Self::Blocks, u32, u32) {
        (
            std::iter::once(self.block.clone()),
            self.block.len() as u32,
            1,
        )
    }

    fn estimate_map_channels(&self) -> u32 {
        self.channels
    }

    fn estimate_map_depth(&self, _downsample: u32) -> CountWidth {
        CountWidth::U16
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

fn pixel_record(pixel_x: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&pixel_x.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // chan1
    out.extend_from_slice(&0u16.to_le_bytes()); // chan2
    out.extend_from_slice(&0u32.to_le_bytes()); // unknown constant
    out.extend_from_slice(&0u16.to_le_bytes()); // flag = 0 (instructed bunch)
    out.extend_from_slice(&0u16.to_le_bytes()); // data_size1
    out.extend_from_slice(&0u16.to_le_bytes()); // n_of_pulses
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // padding
    out.extend_from_slice(payload);
    out
}

fn main() {
    // size=2, channels=2, gain=0, data=[5, 7] -> channel 0 = 5, channel 1 = 7.
    let bunch_payload = [2u8, 2, 0, 0, 5, 7];
    let mut payload = bunch_payload.to_vec();
    payload.extend_from_slice(&0u32.to_le_bytes()); // add_pulse_size, unused

    let mut block = vec![0u8; MAP_DATA_OFFSET as usize];
    block.extend_from_slice(&1u32.to_le_bytes()); // one pixel in this row
    block.extend_from_slice(&pixel_record(0, &payload));

    let container = ToyContainer {
        block,
        channels: 8,
        width: 1,
        height: 1,
    };

    let cube = decode_whole_map(&container, DecodeOptions::default()).expect("decode failed");
    match cube {
        AnyCube::U16(cube) => {
            println!("channel 0 = {}", cube.get(0, 0, 0));
            println!("channel 1 = {}", cube.get(1, 0, 0));
        }
        _ => unreachable!("ToyContainer always estimates U16"),
    }
}
