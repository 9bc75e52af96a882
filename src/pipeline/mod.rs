//! Streaming XOR transform: padded readers are combined into one stream,
//! which is split into one-time-pad shares as it is written.
//!
//! ```text
//! inputs → Pad → Combine → Split → outputs
//! ```

pub mod combine;
pub mod pad;
pub mod split;

pub use combine::*;
pub use pad::*;
pub use split::*;

use crate::error::Result;
use rand::{CryptoRng, RngCore};
use std::io::{Read, Write};

/// Default block size for the copy loop (64 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Largest accepted block size (64 MiB)
pub const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

/// Drive a combiner into a splitter, one block at a time, in stream order.
/// Returns the number of bytes moved.
pub fn pump<R, W, G>(
    combiner: &mut Combiner<R>,
    splitter: &mut Splitter<W, G>,
    block_size: usize,
) -> Result<u64>
where
    R: Read,
    W: Write,
    G: RngCore + CryptoRng,
{
    let mut buf = vec![0u8; block_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = combiner.read_block(&mut buf)?;
        if n == 0 {
            break;
        }
        splitter.write_block(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

/// XOR `key` into `data`, position by position, over the shorter of the two.
pub fn xor_in_place(data: &mut [u8], key: &[u8]) {
    for (d, k) in data.iter_mut().zip(key.iter()) {
        *d ^= k;
    }
}
