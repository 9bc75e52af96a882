use std::io::{self, Chain, Empty, Read, Repeat, Take};

/// A reader extended with zero bytes past its end and cut to an exact length.
///
/// Every input share contributes exactly `length` bytes to a combine, real
/// bytes first and zeros filling any shortfall.
pub struct Padded<R> {
    inner: Take<Chain<R, Repeat>>,
}

impl<R: Read> Padded<R> {
    pub fn new(reader: R, length: u64) -> Self {
        Self {
            inner: reader.chain(io::repeat(0)).take(length),
        }
    }

    /// Bytes still to be produced before the padded view ends.
    pub fn remaining(&self) -> u64 {
        self.inner.limit()
    }
}

impl Padded<Empty> {
    /// All-zero stream of `length` bytes, standing in for a root without the file.
    pub fn zeros(length: u64) -> Self {
        Self::new(io::empty(), length)
    }
}

impl<R: Read> Read for Padded<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
