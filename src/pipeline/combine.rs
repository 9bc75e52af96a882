use crate::error::{Result, XorshareError};
use crate::pipeline::pad::Padded;
use crate::pipeline::xor_in_place;
use std::io::{self, ErrorKind, Read};
use std::path::PathBuf;

/// XOR of several input streams, produced block by block.
///
/// The first reader decides how many bytes a block holds; every other
/// reader must then supply exactly that many bytes or the combine fails
/// with [`XorshareError::StreamShortfall`]. Readers are usually [`Padded`],
/// see [`combine`].
pub struct Combiner<R> {
    readers: Vec<R>,
    names: Vec<PathBuf>,
    scratch: Vec<u8>,
    produced: u64,
}

/// Combine `readers`, each zero-extended and cut to `length` bytes.
pub fn combine<R: Read>(readers: Vec<R>, length: u64) -> Result<Combiner<Padded<R>>> {
    Combiner::new(readers.into_iter().map(|r| Padded::new(r, length)).collect())
}

/// Like [`combine`], with the path of each reader used in error messages.
pub fn combine_named<R: Read>(
    readers: Vec<(PathBuf, R)>,
    length: u64,
) -> Result<Combiner<Padded<R>>> {
    Combiner::named(
        readers
            .into_iter()
            .map(|(name, r)| (name, Padded::new(r, length)))
            .collect(),
    )
}

impl<R: Read> Combiner<R> {
    pub fn new(readers: Vec<R>) -> Result<Self> {
        let named = readers
            .into_iter()
            .enumerate()
            .map(|(i, r)| (PathBuf::from(format!("<input {}>", i)), r))
            .collect();
        Self::named(named)
    }

    pub fn named(readers: Vec<(PathBuf, R)>) -> Result<Self> {
        if readers.is_empty() {
            return Err(XorshareError::Config("No input streams to combine".into()));
        }
        let (names, readers) = readers.into_iter().unzip();
        Ok(Self {
            readers,
            names,
            scratch: Vec::new(),
            produced: 0,
        })
    }

    /// Bytes handed out so far
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Fill the front of `buf` with the next combined block.
    /// Returns 0 once the first reader is exhausted.
    pub fn read_block(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Self {
            readers,
            names,
            scratch,
            ..
        } = self;
        let (first, rest) = match readers.split_first_mut() {
            Some(split) => split,
            None => return Ok(0),
        };

        let n = read_some(first, buf).map_err(|e| XorshareError::io("read", &names[0], e))?;
        if n == 0 {
            return Ok(0);
        }
        let block = &mut buf[..n];

        scratch.resize(n, 0);
        for (reader, name) in rest.iter_mut().zip(&names[1..]) {
            let got = read_full(reader, scratch).map_err(|e| XorshareError::io("read", name, e))?;
            if got < n {
                return Err(XorshareError::StreamShortfall {
                    expected: n as u64,
                    available: got as u64,
                });
            }
            xor_in_place(block, scratch);
        }

        self.produced += n as u64;
        Ok(n)
    }
}

impl<R: Read> Read for Combiner<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_block(buf).map_err(io::Error::other)
    }
}

fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Read until `buf` is full or the reader is exhausted; returns the count read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
