//! Full-rebuild site generator: walks a source tree, routes `.html` files
//! through the preprocessor, and copies everything else verbatim.

use std::fs;
use std::path::{Path, PathBuf};

use colored::*;

use crate::error::ErrorExt;
use crate::preprocess::Preprocessor;

/// Names skipped during both the generator's tree walk and the watcher's
/// filesystem events: the implementation's own source files and anything
/// under an output directory.
const IGNORED_NAMES: &[&str] = &["Cargo.toml", "Cargo.lock"];
const IGNORED_DIR_NAMES: &[&str] = &["target", ".git"];

pub(crate) fn is_ignored_path(path: &Path, output_dir: &Path) -> bool {
    if path.starts_with(output_dir) {
        return true;
    }

    if path.extension().map(|e| e == "rs").unwrap_or(false) {
        return true;
    }

    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        if IGNORED_NAMES.contains(&name) {
            return true;
        }
    }

    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| IGNORED_DIR_NAMES.contains(&s))
            .unwrap_or(false)
    })
}

/// Replaces `output_dir`'s contents with a fresh build of `source_dir`.
///
/// Per-file preprocessor errors are printed and do not abort the walk; only
/// I/O failures that prevent the tree from being walked at all (e.g. the
/// output directory cannot be recreated) are fatal.
pub fn generate(source_dir: &Path, output_dir: &Path) -> std::io::Result<()> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)?;
    }
    fs::create_dir_all(output_dir)?;

    println!("{}", "building site...".green().bold());

    let mut preprocessor = Preprocessor::new();
    let mut built = 0usize;
    let mut failed = 0usize;

    for path in walk(source_dir, output_dir)? {
        let relative = path.strip_prefix(source_dir).unwrap_or(&path);
        let target = output_dir.join(relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let is_html = path.extension().map(|e| e == "html").unwrap_or(false);

        if is_html {
            match preprocessor.process_file(&path).print_error() {
                Some(output) => {
                    fs::write(&target, output)?;
                    built += 1;
                }
                None => failed += 1,
            }
        } else {
            fs::copy(&path, &target)?;
            built += 1;
        }
    }

    println!(
        "{} {} file(s) built, {} failed",
        "done:".green().bold(),
        built,
        failed
    );

    Ok(())
}

fn walk(dir: &Path, output_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if is_ignored_path(&path, output_dir) {
            continue;
        }
        if path.is_dir() {
            files.extend(walk(&path, output_dir)?);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}
