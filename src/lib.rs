//! xorshare - XOR one-time-pad shares of whole directory trees
//!
//! Several input trees are reconciled into one logical view, then every file
//! is streamed through an XOR transform into several output trees:
//!
//! ```text
//! input roots → Scan → Pad → Combine → Split → output roots
//! ```
//!
//! - **Scan**: union of all input trees, each file's target length is the
//!   largest size seen for it
//! - **Pad**: inputs shorter than the target (or missing) read as zeros
//! - **Combine**: byte-wise XOR of all inputs
//! - **Split**: every output but the last gets a fresh random pad, the last
//!   gets the combined stream XOR all pads
//!
//! With one input and several outputs this splits a plaintext tree into
//! shares; with several inputs and one output it puts the shares back
//! together. Every share is needed: any subset of fewer than all of them is
//! indistinguishable from random bytes.
//!
//! ## Example
//!
//! ```no_run
//! use xorshare::config::TransformOptions;
//! use xorshare::transform::run;
//! use std::path::PathBuf;
//!
//! // Split a tree into two shares
//! let split = TransformOptions::new(
//!     vec![PathBuf::from("plain")],
//!     vec![PathBuf::from("share1"), PathBuf::from("share2")],
//! );
//! run(&split).unwrap();
//!
//! // Put it back together
//! let combine = TransformOptions::new(
//!     vec![PathBuf::from("share1"), PathBuf::from("share2")],
//!     vec![PathBuf::from("restored")],
//! );
//! run(&combine).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod scan;
pub mod transform;

pub use config::{Mode, TransformOptions};
pub use error::{Result, XorshareError};
pub use scan::{scan, TreeInfo};
pub use transform::{run, TransformSummary};
