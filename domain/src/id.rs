//! Record id generation strategies.

use crate::base62::encode_u64;
use crate::{IdGenerator, RecordId};

/// Base62 encoder-based id generator. Deterministic w.r.t. the sequence.
/// If `min_width` is set, left-pads with '0' to reach the minimal length, which
/// keeps ids of the same width ordered like their sequence numbers.
#[derive(Clone, Copy, Debug)]
pub struct Base62IdGenerator {
    min_width: usize,
}

impl Base62IdGenerator {
    pub const DEFAULT_WIDTH: usize = 8;

    pub fn new(min_width: usize) -> Self {
        Self {
            min_width: min_width.min(RecordId::MAX_LEN),
        }
    }
}

impl Default for Base62IdGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH)
    }
}

impl IdGenerator for Base62IdGenerator {
    fn next_id(&self, seq: u64) -> RecordId {
        let encoded = encode_u64(seq);
        // base62 digits and the '0' pad are alphanumeric, so this is a valid id
        RecordId(format!("{:0>width$}", encoded, width = self.min_width))
    }
}
