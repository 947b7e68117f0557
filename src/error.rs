use std::fmt::{self, Display};
use std::io;
use std::path::{Path, PathBuf};

use colored::*;

/// Everything that can go fatally wrong while preprocessing a single file.
///
/// None of these ever abort an entire site build: the generator shell catches
/// them at the file boundary (see `generator::generate`) and moves on to the
/// next file.
#[derive(Debug)]
pub enum PreprocessError {
    /// The normalized include path was already on the include stack.
    CircularInclude { stack: Vec<PathBuf>, offending: PathBuf },
    /// EOF was reached before a `#define` body's parentheses balanced.
    UnbalancedMacroParens { file: PathBuf, line: u32 },
    /// A macro call supplied a different number of arguments than its
    /// definition's parameter list.
    ArityMismatch {
        macro_name: String,
        expected: usize,
        got: usize,
        defined_at: (PathBuf, u32),
    },
    /// `#else` with an empty conditional stack.
    StrayElse { file: PathBuf, line: u32 },
    /// `#endif` with an empty conditional stack.
    StrayEndif { file: PathBuf, line: u32 },
    /// The file ended with unterminated `#ifdef`/`#ifndef` regions.
    UnterminatedConditional { file: PathBuf, depth: usize },
    /// The underlying file could not be opened or read.
    IoError { path: PathBuf, source: io::Error },
}

impl Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PreprocessError::CircularInclude { stack, offending } => {
                writeln!(f, "circular include detected:")?;
                for path in stack {
                    writeln!(f, "  {}", path.display())?;
                }
                write!(f, "  {}", offending.display())
            }
            PreprocessError::UnbalancedMacroParens { file, line } => write!(
                f,
                "{}:{}: unbalanced parentheses in macro definition",
                file.display(),
                line
            ),
            PreprocessError::ArityMismatch { macro_name, expected, got, defined_at } => write!(
                f,
                "macro \"{}\" expects {} argument(s), but got {} (defined at {}:{})",
                macro_name,
                expected,
                got,
                defined_at.0.display(),
                defined_at.1
            ),
            PreprocessError::StrayElse { file, line } => {
                write!(f, "{}:{}: #else without matching #ifdef/#ifndef", file.display(), line)
            }
            PreprocessError::StrayEndif { file, line } => {
                write!(f, "{}:{}: #endif without matching #ifdef/#ifndef", file.display(), line)
            }
            PreprocessError::UnterminatedConditional { file, depth } => write!(
                f,
                "{}: {} conditional region(s) left open at end of file",
                file.display(),
                depth
            ),
            PreprocessError::IoError { path, source } => write!(f, "{}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for PreprocessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PreprocessError::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Attaches the offending path to a bare `io::Error`.
pub trait IoResultExt<T> {
    fn at_path(self, path: &Path) -> Result<T, PreprocessError>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at_path(self, path: &Path) -> Result<T, PreprocessError> {
        self.map_err(|source| PreprocessError::IoError { path: path.to_path_buf(), source })
    }
}

/// Console-reporting helper: renders the error and returns `None`, letting
/// the caller move on. Per-file preprocessor errors never abort the overall
/// build.
pub trait ErrorExt<T> {
    fn print_error(self) -> Option<T>;
}

impl<T> ErrorExt<T> for Result<T, PreprocessError> {
    fn print_error(self) -> Option<T> {
        match self {
            Ok(t) => Some(t),
            Err(error) => {
                eprintln!("{} {}", "error:".red().bold(), error);
                None
            }
        }
    }
}
