//! Line-oriented scanner that turns file content into a token stream,
//! harvesting multi-line `#define` bodies and multi-line macro calls.

use std::path::PathBuf;
use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::PreprocessError;
use crate::macros::MacroTable;
use crate::token::{Directive, Token, TokenKind};

lazy_static! {
    static ref RE_INCLUDE: Regex = Regex::new(r#"^#include\s*[<"]([^<>"]+)[>"]"#).unwrap();
    static ref RE_DEFINE: Regex =
        Regex::new(r"^#define\s+(\w+)(?:\(([\w\s,]*)\))?\s*\(").unwrap();
    static ref RE_IFDEF: Regex = Regex::new(r"^#ifdef\s+(\w+)").unwrap();
    static ref RE_IFNDEF: Regex = Regex::new(r"^#ifndef\s+(\w+)").unwrap();
    static ref RE_UNDEF: Regex = Regex::new(r"^#undef\s+(\w+)").unwrap();
    static ref RE_CALL_START: Regex = Regex::new(r"^(\w+)\s*\(").unwrap();
}

/// Scans forward from `first_remainder` (text already past an opening paren
/// whose matching close we're hunting for) across `lines[first_idx + 1..]`,
/// tracking paren depth starting at 1. Returns the collected text (joined by
/// `\n`, excluding the final closing paren) and the index of the line it
/// closed on. `Err(())` means EOF was reached first.
fn harvest_balanced(lines: &[&str], first_idx: usize, first_remainder: &str) -> Result<(String, usize), ()> {
    let mut depth: i32 = 1;
    let mut collected: Vec<String> = Vec::new();

    let mut current = String::new();
    for ch in first_remainder.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    collected.push(current);
                    return Ok((collected.join("\n"), first_idx));
                }
                current.push(ch);
            }
            _ => current.push(ch),
        }
    }
    collected.push(current);

    let mut idx = first_idx + 1;
    while idx < lines.len() {
        let mut current = String::new();
        for ch in lines[idx].chars() {
            match ch {
                '(' => {
                    depth += 1;
                    current.push(ch);
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        collected.push(current);
                        return Ok((collected.join("\n"), idx));
                    }
                    current.push(ch);
                }
                _ => current.push(ch),
            }
        }
        collected.push(current);
        idx += 1;
    }

    Err(())
}

/// Lexes `content` into tokens. `macros` is consulted, as it stands at the
/// moment of this call, to recognize multi-line macro calls — callers
/// re-lex a file for each pass with whatever macro-table state is current
/// at that point (see `preprocess::Preprocessor`).
pub fn lex(content: &str, file: &Rc<PathBuf>, macros: &MacroTable) -> Result<Vec<Token>, PreprocessError> {
    let lines: Vec<&str> = content.lines().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < lines.len() {
        let raw = lines[i];
        let line = raw.trim();

        if line.is_empty() {
            i += 1;
            continue;
        }

        if let Some(caps) = RE_INCLUDE.captures(line) {
            tokens.push(Token::new(
                TokenKind::Directive(Directive::Include(caps[1].to_string())),
                file.clone(),
                (i + 1) as u32,
            ));
            i += 1;
            continue;
        }

        if let Some(caps) = RE_DEFINE.captures(line) {
            let name = caps[1].to_string();
            let params: Vec<String> = match caps.get(2) {
                Some(m) if !m.as_str().trim().is_empty() => {
                    m.as_str().split(',').map(|p| p.trim().to_string()).collect()
                }
                _ => Vec::new(),
            };
            let define_line = (i + 1) as u32;
            let remainder = &line[caps.get(0).unwrap().end()..];

            let (body, end_idx) = harvest_balanced(&lines, i, remainder).map_err(|_| {
                PreprocessError::UnbalancedMacroParens { file: (**file).clone(), line: define_line }
            })?;

            tokens.push(Token::new(
                TokenKind::Directive(Directive::Define { name, params, body }),
                file.clone(),
                define_line,
            ));
            i = end_idx + 1;
            continue;
        }

        if let Some(caps) = RE_IFDEF.captures(line) {
            tokens.push(Token::new(
                TokenKind::Directive(Directive::Ifdef(caps[1].to_string())),
                file.clone(),
                (i + 1) as u32,
            ));
            i += 1;
            continue;
        }

        if let Some(caps) = RE_IFNDEF.captures(line) {
            tokens.push(Token::new(
                TokenKind::Directive(Directive::Ifndef(caps[1].to_string())),
                file.clone(),
                (i + 1) as u32,
            ));
            i += 1;
            continue;
        }

        if line.starts_with("#else") {
            tokens.push(Token::new(TokenKind::Directive(Directive::Else), file.clone(), (i + 1) as u32));
            i += 1;
            continue;
        }

        if line.starts_with("#endif") {
            tokens.push(Token::new(TokenKind::Directive(Directive::Endif), file.clone(), (i + 1) as u32));
            i += 1;
            continue;
        }

        if let Some(caps) = RE_UNDEF.captures(line) {
            tokens.push(Token::new(
                TokenKind::Directive(Directive::Undef(caps[1].to_string())),
                file.clone(),
                (i + 1) as u32,
            ));
            i += 1;
            continue;
        }

        if let Some(caps) = RE_CALL_START.captures(line) {
            let name = &caps[1];
            if macros.is_defined(name) {
                let text_line = (i + 1) as u32;
                let remainder = &line[caps.get(0).unwrap().end()..];
                let (body, end_idx) = harvest_balanced(&lines, i, remainder).map_err(|_| {
                    PreprocessError::UnbalancedMacroParens { file: (**file).clone(), line: text_line }
                })?;
                let merged = format!("{}({})", name, body);
                tokens.push(Token::new(TokenKind::Text(merged), file.clone(), text_line));
                i = end_idx + 1;
                continue;
            }
        }

        tokens.push(Token::new(TokenKind::Text(line.to_string()), file.clone(), (i + 1) as u32));
        i += 1;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> Rc<PathBuf> {
        Rc::new(PathBuf::from("test.html"))
    }

    #[test]
    fn single_line_define() {
        let macros = MacroTable::new();
        let tokens = lex("#define GREET(who)(<p>hello, {who}</p>)", &file(), &macros).unwrap();
        assert_eq!(1, tokens.len());
        match &tokens[0].kind {
            TokenKind::Directive(Directive::Define { name, params, body }) => {
                assert_eq!("GREET", name);
                assert_eq!(vec!["who".to_string()], *params);
                assert_eq!("<p>hello, {who}</p>", body);
            }
            other => panic!("unexpected token: {:?}", other),
        }
    }

    #[test]
    fn bare_flag_define() {
        let macros = MacroTable::new();
        let tokens = lex("#define FLAG()(     )", &file(), &macros).unwrap();
        match &tokens[0].kind {
            TokenKind::Directive(Directive::Define { name, params, .. }) => {
                assert_eq!("FLAG", name);
                assert!(params.is_empty());
            }
            other => panic!("unexpected token: {:?}", other),
        }
    }

    #[test]
    fn multiline_define_body() {
        let macros = MacroTable::new();
        let src = "#define BOX(t,c)(\n<div>{t}:{c}</div>\n)";
        let tokens = lex(src, &file(), &macros).unwrap();
        match &tokens[0].kind {
            TokenKind::Directive(Directive::Define { body, .. }) => {
                assert_eq!("\n<div>{t}:{c}</div>\n", body);
            }
            other => panic!("unexpected token: {:?}", other),
        }
    }

    #[test]
    fn unbalanced_define_is_fatal() {
        let macros = MacroTable::new();
        let src = "#define BOX(t)(\n<div>{t}</div>";
        assert!(lex(src, &file(), &macros).is_err());
    }

    #[test]
    fn multiline_call_merged_when_macro_known() {
        let mut macros = MacroTable::new();
        macros.define(crate::token::Macro {
            name: "BOX".to_string(),
            params: vec!["t".to_string(), "c".to_string()],
            body: "<div>{t}:{c}</div>".to_string(),
            defined_at: (PathBuf::from("test.html"), 1),
        });
        let src = "BOX(\n  Title,\n  Body\n)";
        let tokens = lex(src, &file(), &macros).unwrap();
        assert_eq!(1, tokens.len());
        match &tokens[0].kind {
            TokenKind::Text(text) => assert_eq!("BOX(\n  Title,\n  Body\n)", text),
            other => panic!("unexpected token: {:?}", other),
        }
    }

    #[test]
    fn call_not_merged_when_macro_unknown() {
        let macros = MacroTable::new();
        let src = "BOX(\n  Title,\n  Body\n)";
        let tokens = lex(src, &file(), &macros).unwrap();
        // Without BOX registered, each line is independent text.
        assert_eq!(4, tokens.len());
    }

    #[test]
    fn blank_lines_discarded() {
        let macros = MacroTable::new();
        let tokens = lex("a\n\n\nb", &file(), &macros).unwrap();
        assert_eq!(2, tokens.len());
    }

    #[test]
    fn conditional_and_undef_tokens() {
        let macros = MacroTable::new();
        let tokens = lex("#ifdef X\n#else\n#endif\n#undef X", &file(), &macros).unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Directive(Directive::Ifdef(_))));
        assert!(matches!(tokens[1].kind, TokenKind::Directive(Directive::Else)));
        assert!(matches!(tokens[2].kind, TokenKind::Directive(Directive::Endif)));
        assert!(matches!(tokens[3].kind, TokenKind::Directive(Directive::Undef(_))));
    }
}
