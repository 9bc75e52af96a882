//! Runs the XOR transform over whole trees.
//!
//! Order of work: validate options, scan every input root, create the
//! directory scaffolding under every output root, then transform each file.
//! Files are independent and run on a worker pool; within a file blocks go
//! strictly in order.

use crate::config::{Mode, TransformOptions};
use crate::error::{Result, XorshareError};
use crate::pipeline::{combine_named, pump, Splitter};
use crate::scan::{resolve, scan, TreeInfo};
use rand::rngs::OsRng;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct TransformSummary {
    pub mode: Mode,
    /// Number of output roots, i.e. shares written per file
    pub shares: usize,
    pub directories: usize,
    /// Files written to every output root
    pub files: usize,
    /// Bytes written to each output root
    pub bytes_per_share: u64,
    pub failures: Vec<FileFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

impl TransformSummary {
    /// Turn recorded failures into an error.
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(XorshareError::PartialFailure {
                failed: self.failures.len(),
                total: self.files + self.failures.len(),
            })
        }
    }
}

/// Scan, scaffold and transform every file. Per-file failures abort the run
/// unless `keep_going` is set, in which case they are listed in the summary.
pub fn run(options: &TransformOptions) -> Result<TransformSummary> {
    options.validate()?;
    let started = Instant::now();

    let info = scan(&options.inputs)?;
    info!(
        "Scanned {} input root(s): {} directories, {} files",
        options.inputs.len(),
        info.subdirs.len(),
        info.files.len()
    );

    scaffold(&info, &options.outputs)?;
    let summary = transform_all(&info, options)?;

    info!(
        "{} finished: {} files, {} bytes per share, {} failed, {:?}",
        summary.mode,
        summary.files,
        summary.bytes_per_share,
        summary.failures.len(),
        started.elapsed()
    );
    Ok(summary)
}

/// Create every scanned directory under every output root.
pub fn scaffold(info: &TreeInfo, outputs: &[PathBuf]) -> Result<()> {
    for rel in &info.subdirs {
        for root in outputs {
            let path = resolve(root, rel);
            fs::create_dir_all(&path)
                .map_err(|e| XorshareError::io("make directory", &path, e))?;
        }
    }
    Ok(())
}

fn transform_all(info: &TreeInfo, options: &TransformOptions) -> Result<TransformSummary> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.worker_threads())
        .build()
        .map_err(|e| XorshareError::Config(format!("Failed to build worker pool: {}", e)))?;

    let files: Vec<(&PathBuf, u64)> = info.files.iter().map(|(p, len)| (p, *len)).collect();
    let outcomes: Vec<(&PathBuf, u64, Result<u64>)> = if options.keep_going {
        pool.install(|| {
            files
                .par_iter()
                .map(|&(rel, length)| (rel, length, transform_labeled(rel, length, options)))
                .collect()
        })
    } else {
        pool.install(|| {
            files
                .par_iter()
                .map(|&(rel, length)| {
                    transform_labeled(rel, length, options).map(|n| (rel, length, Ok(n)))
                })
                .collect::<Result<Vec<_>>>()
        })?
    };

    let mut summary = TransformSummary {
        mode: options.mode(),
        shares: options.outputs.len(),
        directories: info.subdirs.len(),
        files: 0,
        bytes_per_share: 0,
        failures: Vec::new(),
    };
    for (rel, length, outcome) in outcomes {
        match outcome {
            Ok(_) => {
                summary.files += 1;
                summary.bytes_per_share += length;
            }
            Err(e) => summary.failures.push(FileFailure {
                path: rel.clone(),
                error: e.to_string(),
            }),
        }
    }
    Ok(summary)
}

fn transform_labeled(rel: &Path, length: u64, options: &TransformOptions) -> Result<u64> {
    let started = Instant::now();
    debug!("Transforming {} ({} bytes)", rel.display(), length);
    match transform_file(rel, length, &options.inputs, &options.outputs, options.block_size) {
        Ok(n) => {
            debug!("Wrote {} in {:?}", rel.display(), started.elapsed());
            Ok(n)
        }
        Err(e) => {
            // a file root has an empty relative path, name the first input instead
            let e = if rel.as_os_str().is_empty() {
                e.in_file(&options.inputs[0])
            } else {
                e.in_file(rel)
            };
            debug!("{}", e);
            Err(e)
        }
    }
}

/// Transform one logical file: combine its copies under `inputs`, padded to
/// `length`, and split the result across `outputs`.
///
/// A root without the file contributes zeros. Every handle is owned here and
/// closed before this returns, whether or not the transform succeeded.
pub fn transform_file(
    rel: &Path,
    length: u64,
    inputs: &[PathBuf],
    outputs: &[PathBuf],
    block_size: usize,
) -> Result<u64> {
    let readers = inputs
        .iter()
        .map(|root| open_input(&resolve(root, rel)))
        .collect::<Result<Vec<_>>>()?;
    let writers = outputs
        .iter()
        .map(|root| open_output(&resolve(root, rel), block_size))
        .collect::<Result<Vec<_>>>()?;

    let mut combiner = combine_named(readers, length)?;
    let mut splitter = Splitter::named(writers, OsRng)?;

    let moved = pump(&mut combiner, &mut splitter, block_size)?;
    if moved != length {
        return Err(XorshareError::StreamShortfall {
            expected: length,
            available: moved,
        });
    }
    splitter.flush_all()?;
    Ok(moved)
}

fn open_input(path: &Path) -> Result<(PathBuf, Box<dyn Read + Send>)> {
    let reader: Box<dyn Read + Send> = match File::open(path) {
        Ok(file) => Box::new(file),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} missing, reading as zeros", path.display());
            Box::new(io::empty())
        }
        Err(e) => return Err(XorshareError::io("open", path, e)),
    };
    Ok((path.to_path_buf(), reader))
}

fn open_output(path: &Path, block_size: usize) -> Result<(PathBuf, BufWriter<File>)> {
    let file = File::create(path).map_err(|e| XorshareError::io("create", path, e))?;
    Ok((path.to_path_buf(), BufWriter::with_capacity(block_size, file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::xor_in_place;
    use tempfile::tempdir;

    fn xor_files(paths: &[PathBuf]) -> Vec<u8> {
        let contents: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();
        let mut out = vec![0u8; contents.iter().map(Vec::len).max().unwrap_or(0)];
        for c in &contents {
            xor_in_place(&mut out, c);
        }
        out
    }

    #[test]
    fn test_split_then_combine_scenario() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        let out = dir.path().join("out");
        fs::create_dir(&a).unwrap();
        fs::write(a.join("secret"), b"hi").unwrap();

        let split = TransformOptions::new(vec![a.clone()], vec![b.clone(), c.clone()]);
        let summary = run(&split).unwrap();
        assert_eq!(summary.mode, Mode::Split);
        assert_eq!(summary.files, 1);
        assert_eq!(summary.bytes_per_share, 2);

        let b_secret = fs::read(b.join("secret")).unwrap();
        let c_secret = fs::read(c.join("secret")).unwrap();
        assert_eq!(b_secret.len(), 2);
        assert_eq!(c_secret.len(), 2);
        assert_eq!(xor_files(&[b.join("secret"), c.join("secret")]), b"hi");

        let combine = TransformOptions::new(vec![b, c], vec![out.clone()]);
        let summary = run(&combine).unwrap();
        assert_eq!(summary.mode, Mode::Combine);
        assert_eq!(fs::read(out.join("secret")).unwrap(), b"hi");
    }

    #[test]
    fn test_nested_tree_roundtrip_with_small_blocks() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("docs/deep")).unwrap();
        fs::create_dir_all(src.join("empty_dir")).unwrap();
        let big: Vec<u8> = (0..70_000u32).map(|i| (i % 253) as u8).collect();
        fs::write(src.join("docs/deep/big.bin"), &big).unwrap();
        fs::write(src.join("docs/note.txt"), b"note").unwrap();
        fs::write(src.join("zero"), b"").unwrap();

        let shares: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("s{}", i))).collect();
        let mut split = TransformOptions::new(vec![src.clone()], shares.clone());
        split.block_size = 1000;
        split.jobs = 2;
        run(&split).unwrap();

        for share in &shares {
            assert!(share.join("empty_dir").is_dir());
            assert_eq!(fs::metadata(share.join("zero")).unwrap().len(), 0);
        }

        let restored = dir.path().join("restored");
        let mut combine = TransformOptions::new(shares, vec![restored.clone()]);
        combine.block_size = 333;
        run(&combine).unwrap();

        assert_eq!(fs::read(restored.join("docs/deep/big.bin")).unwrap(), big);
        assert_eq!(fs::read(restored.join("docs/note.txt")).unwrap(), b"note");
        assert!(restored.join("empty_dir").is_dir());
    }

    #[test]
    fn test_uneven_inputs_are_padded() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let out = dir.path().join("out");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        fs::write(a.join("f"), [0x41, 0x42]).unwrap();
        fs::write(b.join("f"), [0x00, 0x00, 0x00, 0x00]).unwrap();
        fs::write(b.join("only_b"), [0x10, 0x20]).unwrap();

        run(&TransformOptions::new(vec![a, b], vec![out.clone()])).unwrap();
        assert_eq!(fs::read(out.join("f")).unwrap(), vec![0x41, 0x42, 0x00, 0x00]);
        assert_eq!(fs::read(out.join("only_b")).unwrap(), vec![0x10, 0x20]);
    }

    #[test]
    fn test_file_roots() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        let s1 = dir.path().join("plain.1");
        let s2 = dir.path().join("plain.2");
        let back = dir.path().join("back.txt");
        fs::write(&plain, b"single file mode").unwrap();

        run(&TransformOptions::new(vec![plain.clone()], vec![s1.clone(), s2.clone()])).unwrap();
        run(&TransformOptions::new(vec![s1, s2], vec![back.clone()])).unwrap();
        assert_eq!(fs::read(back).unwrap(), b"single file mode");
    }

    #[test]
    fn test_config_error_writes_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let err = run(&TransformOptions::new(vec![], vec![out.clone()])).unwrap_err();
        assert!(matches!(err, XorshareError::Config(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_scan_error_writes_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let missing = dir.path().join("missing");
        assert!(run(&TransformOptions::new(vec![missing], vec![out.clone()])).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_aliased_output_leaves_input_intact() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        fs::create_dir(&a).unwrap();
        fs::write(a.join("secret"), b"precious").unwrap();

        let options = TransformOptions::new(vec![a.clone()], vec![dir.path().join("x/../a")]);
        assert!(matches!(run(&options), Err(XorshareError::Config(_))));
        assert_eq!(fs::read(a.join("secret")).unwrap(), b"precious");
    }

    #[test]
    fn test_repeated_output_is_rejected() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::write(a.join("secret"), b"hi there").unwrap();

        let options = TransformOptions::new(vec![a], vec![b.clone(), b.clone()]);
        assert!(matches!(run(&options), Err(XorshareError::Config(_))));
        assert!(!b.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_keep_going_reports_failures() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("good"), b"fine").unwrap();
        fs::write(src.join("bad"), b"hidden").unwrap();
        fs::set_permissions(src.join("bad"), fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores permission bits
        if File::open(src.join("bad")).is_ok() {
            return;
        }

        let mut options = TransformOptions::new(vec![src.clone()], vec![out.clone()]);
        options.keep_going = true;
        let summary = run(&options).unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].path, PathBuf::from("bad"));
        assert_eq!(fs::read(out.join("good")).unwrap(), b"fine");
        assert!(matches!(
            summary.into_result(),
            Err(XorshareError::PartialFailure { failed: 1, total: 2 })
        ));

        options.keep_going = false;
        let err = run(&options).unwrap_err();
        assert!(matches!(err, XorshareError::File { .. }));
    }

    #[test]
    fn test_transform_file_missing_everywhere_yields_zeros() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        let written = transform_file(
            Path::new("ghost"),
            5,
            &[dir.path().join("nowhere")],
            &[out.clone()],
            2,
        )
        .unwrap();
        assert_eq!(written, 5);
        assert_eq!(fs::read(out.join("ghost")).unwrap(), vec![0u8; 5]);
    }

    #[test]
    fn test_output_open_failure_names_path() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("f"), b"x").unwrap();
        let missing_parent = dir.path().join("no/such/dir");

        let err = transform_file(Path::new("f"), 1, &[src], &[missing_parent.clone()], 16)
            .unwrap_err();
        match err {
            XorshareError::Io { op, path, .. } => {
                assert_eq!(op, "create");
                assert_eq!(path, missing_parent.join("f"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
