//! Macro table storage, argument parsing and placeholder expansion.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::token::Macro;

lazy_static! {
    /// Matches one macro call: `NAME(...)` with one level of balanced inner
    /// parentheses, per the "at most one macro call per text token" rule.
    static ref CALL_RE: Regex = Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(((?:[^()]*|\([^()]*\))*)\)").unwrap();
}

/// Maps macro names to their definitions and tracks which symbols are
/// currently `#define`d, for `#ifdef`/`#ifndef` queries.
///
/// Invariant: a name is in `defined_symbols` iff it is a key of `macros`.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> MacroTable {
        MacroTable { macros: HashMap::new() }
    }

    pub fn define(&mut self, m: Macro) {
        self.macros.insert(m.name.clone(), m);
    }

    pub fn undef(&mut self, name: &str) {
        self.macros.remove(name);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    /// Splits the raw text between a call's outer parentheses on top-level
    /// commas (commas nested inside parentheses are preserved), trims each
    /// argument and drops empty trailing arguments.
    pub fn parse_args(args_text: &str) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut depth: i32 = 0;

        for c in args_text.chars() {
            match c {
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth -= 1;
                    current.push(c);
                }
                ',' if depth == 0 => {
                    args.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            }
        }
        if !current.trim().is_empty() {
            args.push(current.trim().to_string());
        }

        args.into_iter().filter(|a| !a.is_empty()).collect()
    }

    /// Expands `m` with `args`, replacing `{param}` placeholders only (bare
    /// occurrences of the parameter name are left untouched). Single-pass:
    /// the result is never re-scanned for further macro calls.
    pub fn expand(m: &Macro, args: &[String]) -> Result<String, crate::error::PreprocessError> {
        if args.len() != m.params.len() {
            return Err(crate::error::PreprocessError::ArityMismatch {
                macro_name: m.name.clone(),
                expected: m.params.len(),
                got: args.len(),
                defined_at: m.defined_at.clone(),
            });
        }

        let mut result = m.body.clone();
        for (param, arg) in m.params.iter().zip(args.iter()) {
            let placeholder = format!("{{{}}}", param);
            result = result.replace(&placeholder, arg);
        }
        Ok(result)
    }

    /// Finds the first macro call in `line` whose name is registered,
    /// expands it, and splices the expansion back into the line. Returns the
    /// line unchanged if no registered macro call is found.
    pub fn expand_line(&self, line: &str) -> Result<String, crate::error::PreprocessError> {
        for caps in CALL_RE.captures_iter(line) {
            let name = &caps[1];
            if let Some(m) = self.macros.get(name) {
                let whole = caps.get(0).unwrap();
                let args = MacroTable::parse_args(&caps[2]);
                let expansion = MacroTable::expand(m, &args)?;
                let mut out = String::with_capacity(line.len());
                out.push_str(&line[..whole.start()]);
                out.push_str(&expansion);
                out.push_str(&line[whole.end()..]);
                return Ok(out);
            }
        }
        Ok(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn m(name: &str, params: &[&str], body: &str) -> Macro {
        Macro {
            name: name.to_string(),
            params: params.iter().map(|s| s.to_string()).collect(),
            body: body.to_string(),
            defined_at: (PathBuf::from("test.html"), 1),
        }
    }

    #[test]
    fn placeholder_locality() {
        let macro_ = m("M", &["x"], " x and {x} ");
        let out = MacroTable::expand(&macro_, &["HI".to_string()]).unwrap();
        assert_eq!(" x and HI ", out);
    }

    #[test]
    fn arity_mismatch() {
        let macro_ = m("M", &["x", "y"], "{x}{y}");
        let err = MacroTable::expand(&macro_, &["one".to_string()]).unwrap_err();
        match err {
            crate::error::PreprocessError::ArityMismatch { expected, got, .. } => {
                assert_eq!(2, expected);
                assert_eq!(1, got);
            }
            _ => panic!("wrong error variant"),
        }
    }

    #[test]
    fn nested_parens_preserved_in_args() {
        let args = MacroTable::parse_args("a(b,c), d");
        assert_eq!(vec!["a(b,c)", "d"], args);
    }

    #[test]
    fn trailing_empty_argument_dropped() {
        let args = MacroTable::parse_args("a, b,   ");
        assert_eq!(vec!["a", "b"], args);
    }

    #[test]
    fn expand_line_splices_in_place() {
        let mut table = MacroTable::new();
        table.define(m("GREET", &["who"], "<p>hello, {who}</p>"));
        let out = table.expand_line("prefix GREET(world) suffix").unwrap();
        assert_eq!("prefix <p>hello, world</p> suffix", out);
    }
}
