use crate::error::{Result, XorshareError};
use crate::pipeline::xor_in_place;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Fans one stream out into XOR shares.
///
/// For every block, each writer but the last receives a fresh one-time pad
/// and the last writer receives the block XOR all of those pads. XOR of all
/// writers' bytes at any position gives back the source byte. With a single
/// writer the block is written unchanged.
pub struct Splitter<W, G = OsRng> {
    writers: Vec<W>,
    names: Vec<PathBuf>,
    rng: G,
    pad: Vec<u8>,
    work: Vec<u8>,
    written: u64,
}

impl<W: Write> Splitter<W, OsRng> {
    /// Splitter drawing pads from the operating system's CSPRNG
    pub fn new(writers: Vec<W>) -> Result<Self> {
        Self::with_rng(writers, OsRng)
    }
}

impl<W: Write, G: RngCore + CryptoRng> Splitter<W, G> {
    pub fn with_rng(writers: Vec<W>, rng: G) -> Result<Self> {
        let named = writers
            .into_iter()
            .enumerate()
            .map(|(i, w)| (PathBuf::from(format!("<output {}>", i)), w))
            .collect();
        Self::named(named, rng)
    }

    /// Writers paired with the path used in error messages
    pub fn named(writers: Vec<(PathBuf, W)>, rng: G) -> Result<Self> {
        if writers.is_empty() {
            return Err(XorshareError::Config("No output streams to split into".into()));
        }
        let (names, writers) = writers.into_iter().unzip();
        Ok(Self {
            writers,
            names,
            rng,
            pad: Vec::new(),
            work: Vec::new(),
            written: 0,
        })
    }

    /// Source bytes consumed so far (each writer received this many)
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Split one block across all writers.
    pub fn write_block(&mut self, block: &[u8]) -> Result<()> {
        if block.is_empty() {
            return Ok(());
        }
        let Self {
            writers,
            names,
            rng,
            pad,
            work,
            ..
        } = self;
        let (last, shares) = match writers.split_last_mut() {
            Some(split) => split,
            None => return Ok(()),
        };
        let (last_name, share_names) = match names.split_last() {
            Some(split) => split,
            None => return Ok(()),
        };

        pad.resize(block.len(), 0);
        work.clear();
        work.extend_from_slice(block);

        let remainder = shares.iter_mut().zip(share_names).try_fold(
            work,
            |acc, (writer, name)| {
                rng.try_fill_bytes(pad)?;
                xor_in_place(acc, pad);
                writer
                    .write_all(pad)
                    .map_err(|e| XorshareError::io("write", name, e))?;
                Ok::<_, XorshareError>(acc)
            },
        )?;

        last.write_all(remainder)
            .map_err(|e| XorshareError::io("write", last_name, e))?;

        self.written += block.len() as u64;
        Ok(())
    }

    /// Flush every writer, reporting the first failure.
    pub fn flush_all(&mut self) -> Result<()> {
        for (writer, name) in self.writers.iter_mut().zip(&self.names) {
            writer
                .flush()
                .map_err(|e| XorshareError::io("flush", name, e))?;
        }
        Ok(())
    }

    /// Hand the writers back, e.g. to inspect in-memory shares.
    pub fn into_writers(self) -> Vec<W> {
        self.writers
    }
}

impl<W: Write, G: RngCore + CryptoRng> Write for Splitter<W, G> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_block(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_all().map_err(io::Error::other)
    }
}

/// Split everything `source` yields across `writers`, `block_size` bytes at a time.
/// Returns the number of source bytes split.
pub fn split<S: Read, W: Write>(source: &mut S, writers: Vec<W>, block_size: usize) -> Result<u64> {
    let mut splitter = Splitter::new(writers)?;
    let mut buf = vec![0u8; block_size.max(1)];
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(XorshareError::io("read", "<source>", e)),
        };
        splitter.write_block(&buf[..n])?;
    }
    splitter.flush_all()?;
    Ok(splitter.written())
}
