use afl::*;

use edx_hypermap::cube::CountWidth;
use edx_hypermap::driver::{decode_whole_map, Container, DecodeOptions};

/// A single opaque block holding whatever bytes AFL hands us. Geometry is
/// fixed and generous enough that most inputs exercise the real decode
/// path rather than bailing out on `StreamExhausted` immediately.
struct FuzzContainer {
    block: Vec<u8>,
}

impl Container for FuzzContainer {
    type Blocks = std::iter::Once<Vec<u8>>;

    fn get_iter_and_properties(&self) -> (Self::Blocks, u32, u32) {
        (std::iter::once(self.block.clone()), self.block.len() as u32, 1)
    }

    fn estimate_map_channels(&self) -> u32 {
        4096
    }

    fn estimate_map_depth(&self, _downsample: u32) -> CountWidth {
        CountWidth::U32
    }

    fn width(&self) -> u32 {
        64
    }

    fn height(&self) -> u32 {
        64
    }
}

fn main() {
    fuzz!(|data: &[u8]| {
        let container = FuzzContainer {
            block: data.to_vec(),
        };
        // Either a clean cube or a clean Err is acceptable; a panic is not.
        let _ = decode_whole_map(&container, DecodeOptions::default());
    })
}
