//! The `#ifdef`/`#ifndef`/`#else`/`#endif` nesting stack.

use std::path::Path;

use crate::error::PreprocessError;

/// Ordered sequence of booleans; the top element decides whether tokens in
/// the current region are emitted. Directives always update the stack, even
/// while inside a suppressed region, so nested conditionals are tracked
/// correctly.
#[derive(Debug, Default)]
pub struct ConditionalStack {
    stack: Vec<bool>,
}

impl ConditionalStack {
    pub fn new() -> ConditionalStack {
        ConditionalStack { stack: Vec::new() }
    }

    /// Whether the innermost region is currently active. An empty stack is
    /// always active (top-level text).
    pub fn is_active(&self) -> bool {
        self.stack.last().copied().unwrap_or(true)
    }

    pub fn push_ifdef(&mut self, defined: bool) {
        self.stack.push(defined);
    }

    pub fn push_ifndef(&mut self, defined: bool) {
        self.stack.push(!defined);
    }

    pub fn handle_else(&mut self, file: &Path, line: u32) -> Result<(), PreprocessError> {
        match self.stack.last_mut() {
            Some(top) => {
                *top = !*top;
                Ok(())
            }
            None => Err(PreprocessError::StrayElse { file: file.to_path_buf(), line }),
        }
    }

    pub fn handle_endif(&mut self, file: &Path, line: u32) -> Result<(), PreprocessError> {
        if self.stack.pop().is_none() {
            return Err(PreprocessError::StrayEndif { file: file.to_path_buf(), line });
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn finish(&self, file: &Path) -> Result<(), PreprocessError> {
        if self.stack.is_empty() {
            Ok(())
        } else {
            Err(PreprocessError::UnterminatedConditional {
                file: file.to_path_buf(),
                depth: self.stack.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn nested_ifdef_tracks_independently() {
        let mut cond = ConditionalStack::new();
        cond.push_ifdef(true);
        cond.push_ifdef(false);
        assert!(!cond.is_active());
        cond.handle_endif(&PathBuf::from("f"), 1).unwrap();
        assert!(cond.is_active());
    }

    #[test]
    fn else_without_if_is_stray() {
        let mut cond = ConditionalStack::new();
        assert!(cond.handle_else(&PathBuf::from("f"), 1).is_err());
    }

    #[test]
    fn endif_without_if_is_stray() {
        let mut cond = ConditionalStack::new();
        assert!(cond.handle_endif(&PathBuf::from("f"), 1).is_err());
    }

    #[test]
    fn unterminated_conditional_at_finish() {
        let mut cond = ConditionalStack::new();
        cond.push_ifdef(true);
        assert!(cond.finish(&PathBuf::from("f")).is_err());
    }
}
