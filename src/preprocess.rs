//! Two-pass preprocessor driver tying the lexer, macro table, include
//! resolver and conditional stack together.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::conditional::ConditionalStack;
use crate::error::{IoResultExt, PreprocessError};
use crate::include::{resolve_include_path, IncludeStack};
use crate::lexer::lex;
use crate::macros::MacroTable;
use crate::token::{Directive, Macro, TokenKind};

/// Owns the macro table and include stack for one generation run. A single
/// instance is meant to process every file of a site build in turn: a
/// `#define` registered while processing one file remains visible while a
/// later file is processed (see `generator::generate`), which is a
/// deliberate, preserved behavior rather than a bug.
///
/// The conditional stack is not carried across top-level files: its
/// emptiness is a success postcondition of each file, so a fresh one per
/// call is observationally identical on the happy path and safer after a
/// file aborts mid-conditional (see DESIGN.md).
#[derive(Default)]
pub struct Preprocessor {
    macros: MacroTable,
    includes: IncludeStack,
}

impl Preprocessor {
    pub fn new() -> Preprocessor {
        Preprocessor { macros: MacroTable::new(), includes: IncludeStack::new() }
    }

    /// Preprocesses `content` as the file at `origin` (or the current
    /// directory, if `origin` is `None`): pass 1 collects every macro
    /// reachable through includes, pass 2 emits the processed text.
    pub fn process(&mut self, content: &str, origin: Option<PathBuf>) -> Result<String, PreprocessError> {
        let origin_path = origin.unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("<input>")
        });

        self.collect_macros(content, &origin_path)?;

        let mut cond = ConditionalStack::new();
        let output = self.emit(content, &origin_path, &mut cond)?;
        cond.finish(&origin_path)?;
        Ok(output)
    }

    /// Reads `path` from disk and preprocesses it.
    pub fn process_file(&mut self, path: &Path) -> Result<String, PreprocessError> {
        let content = fs::read_to_string(path).at_path(path)?;
        self.process(&content, Some(path.to_path_buf()))
    }

    /// Pass 1: records every `Define` and recurses through every `Include`,
    /// ignoring `Undef` and conditionals entirely, so the table ends up
    /// holding the union of every macro textually present in the include
    /// closure.
    fn collect_macros(&mut self, content: &str, file: &Path) -> Result<(), PreprocessError> {
        let file_rc = Rc::new(file.to_path_buf());
        let tokens = lex(content, &file_rc, &self.macros)?;

        for token in tokens {
            match token.kind {
                TokenKind::Directive(Directive::Define { name, params, body }) => {
                    self.macros.define(Macro {
                        name,
                        params,
                        body,
                        defined_at: (file.to_path_buf(), token.line),
                    });
                }
                TokenKind::Directive(Directive::Include(include_path)) => {
                    self.collect_include(file, &include_path)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn collect_include(&mut self, from: &Path, include_path: &str) -> Result<(), PreprocessError> {
        let resolved = resolve_include_path(from, include_path);
        if self.includes.contains(&resolved) {
            return Err(self.includes.cycle_error(resolved));
        }

        self.includes.push(resolved.clone());
        let result = fs::read_to_string(&resolved)
            .at_path(&resolved)
            .and_then(|c| self.collect_macros(&c, &resolved));
        self.includes.pop();
        result
    }

    /// Pass 2: walks the token stream again, consulting the conditional
    /// stack and the now-complete macro table to emit text.
    fn emit(&mut self, content: &str, file: &Path, cond: &mut ConditionalStack) -> Result<String, PreprocessError> {
        let file_rc = Rc::new(file.to_path_buf());
        let tokens = lex(content, &file_rc, &self.macros)?;

        let mut output: Vec<String> = Vec::new();

        for token in tokens {
            if !cond.is_active() {
                match token.kind {
                    TokenKind::Directive(Directive::Ifdef(sym)) => {
                        cond.push_ifdef(self.macros.is_defined(&sym));
                    }
                    TokenKind::Directive(Directive::Ifndef(sym)) => {
                        cond.push_ifndef(self.macros.is_defined(&sym));
                    }
                    TokenKind::Directive(Directive::Else) => {
                        cond.handle_else(&token.file, token.line)?;
                    }
                    TokenKind::Directive(Directive::Endif) => {
                        cond.handle_endif(&token.file, token.line)?;
                    }
                    _ => {}
                }
                continue;
            }

            match token.kind {
                TokenKind::Directive(Directive::Include(include_path)) => {
                    output.push(self.emit_include(file, &include_path, cond)?);
                }
                TokenKind::Text(line) => {
                    output.push(self.macros.expand_line(&line)?);
                }
                TokenKind::Directive(Directive::Ifdef(sym)) => {
                    cond.push_ifdef(self.macros.is_defined(&sym));
                }
                TokenKind::Directive(Directive::Ifndef(sym)) => {
                    cond.push_ifndef(self.macros.is_defined(&sym));
                }
                TokenKind::Directive(Directive::Else) => {
                    cond.handle_else(&token.file, token.line)?;
                }
                TokenKind::Directive(Directive::Endif) => {
                    cond.handle_endif(&token.file, token.line)?;
                }
                TokenKind::Directive(Directive::Undef(sym)) => {
                    self.macros.undef(&sym);
                }
                TokenKind::Directive(Directive::Define { .. }) => {}
            }
        }

        Ok(output.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join("\n"))
    }

    fn emit_include(
        &mut self,
        from: &Path,
        include_path: &str,
        cond: &mut ConditionalStack,
    ) -> Result<String, PreprocessError> {
        let resolved = resolve_include_path(from, include_path);
        if self.includes.contains(&resolved) {
            return Err(self.includes.cycle_error(resolved));
        }

        self.includes.push(resolved.clone());
        let result = fs::read_to_string(&resolved)
            .at_path(&resolved)
            .and_then(|c| self.emit(&c, &resolved, cond));
        self.includes.pop();
        result
    }
}
