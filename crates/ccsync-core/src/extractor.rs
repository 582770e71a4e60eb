//! Declaration extraction
//!
//! The tracker never parses source itself; it asks a [`DeclarationExtractor`]
//! for the top-level declarations of a file. [`DartDeclarationScanner`] is the
//! built-in implementation: a lexical scanner that understands comments,
//! string literals (including interpolation) and brace nesting, which is all
//! that is needed to find top-level names and their bodies.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// What a top-level declaration declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Function,
    Class,
    Enum,
    Mixin,
    Extension,
}

/// A named top-level declaration and its body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    /// Trimmed body: text between the braces, or after `=>`
    pub body: String,
    /// Byte offset where the declaration starts
    pub start: usize,
    /// Byte offset one past the end of the declaration
    pub end: usize,
}

impl Declaration {
    /// Library-private names start with an underscore.
    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }
}

/// Extracts top-level declarations from source text.
///
/// Implementations must be deterministic: identical input yields identical
/// output.
pub trait DeclarationExtractor: Send + Sync {
    fn extract(&self, source: &str) -> Result<Vec<Declaration>>;
}

/// Lexical scanner for Dart top-level declarations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DartDeclarationScanner;

impl DeclarationExtractor for DartDeclarationScanner {
    fn extract(&self, source: &str) -> Result<Vec<Declaration>> {
        Scanner::new(source).top_level()
    }
}

static TYPE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(class|enum|mixin|extension)\s+([A-Za-z_$][\w$]*)").expect("valid regex")
});

static GETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)get\s+([A-Za-z_$][\w$]*)\s*$").expect("valid regex"));

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[\w$.]+(?:\s*\([^)]*\))?").expect("valid regex"));

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)//[^\n]*|/\*.*?\*/").expect("valid regex"));

const FUNCTION_MODIFIERS: &[&str] = &["", "async", "async*", "sync*"];

enum Skipped {
    Nothing,
    Comment,
    Literal,
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn top_level(mut self) -> Result<Vec<Declaration>> {
        let mut declarations = Vec::new();
        let mut segment_start = 0;
        let mut code_start: Option<usize> = None;
        let mut paren_depth = 0usize;
        let mut bracket_depth = 0usize;

        while self.pos < self.bytes.len() {
            let here = self.pos;
            match self.skip_comment_or_literal()? {
                Skipped::Comment => continue,
                Skipped::Literal => {
                    code_start.get_or_insert(here);
                    continue;
                }
                Skipped::Nothing => {}
            }

            let byte = self.bytes[self.pos];
            if !byte.is_ascii_whitespace() {
                code_start.get_or_insert(here);
            }

            match byte {
                b'(' => paren_depth += 1,
                b')' => paren_depth = paren_depth.saturating_sub(1),
                b'[' => bracket_depth += 1,
                b']' => bracket_depth = bracket_depth.saturating_sub(1),
                b'{' if paren_depth > 0 || bracket_depth > 0 => {
                    self.skip_braces()?;
                    continue;
                }
                b'{' => {
                    let open = self.pos;
                    self.skip_braces()?;
                    let close = self.pos;
                    let header = &self.src[segment_start..open];
                    if let Some((name, kind)) = classify_block_header(header) {
                        declarations.push(Declaration {
                            name,
                            kind,
                            body: self.src[open + 1..close - 1].trim().to_string(),
                            start: code_start.unwrap_or(segment_start),
                            end: close,
                        });
                        segment_start = close;
                        code_start = None;
                    }
                    continue;
                }
                b'}' => {
                    return Err(Error::parse(format!(
                        "unbalanced '}}' at byte {}",
                        self.pos
                    )));
                }
                b';' if paren_depth == 0 && bracket_depth == 0 => {
                    let header = &self.src[segment_start..self.pos];
                    if let Some((name, body)) = classify_arrow_function(header) {
                        declarations.push(Declaration {
                            name,
                            kind: DeclarationKind::Function,
                            body,
                            start: code_start.unwrap_or(segment_start),
                            end: self.pos + 1,
                        });
                    }
                    segment_start = self.pos + 1;
                    code_start = None;
                }
                _ => {}
            }
            self.pos += 1;
        }

        Ok(declarations)
    }

    /// Skip a comment or string literal starting at the cursor, if any.
    fn skip_comment_or_literal(&mut self) -> Result<Skipped> {
        let bytes = self.bytes;
        let pos = self.pos;
        let next = bytes.get(pos + 1).copied();

        match bytes[pos] {
            b'/' if next == Some(b'/') => {
                self.pos = self.src[pos..]
                    .find('\n')
                    .map_or(bytes.len(), |offset| pos + offset);
                Ok(Skipped::Comment)
            }
            b'/' if next == Some(b'*') => {
                self.skip_block_comment()?;
                Ok(Skipped::Comment)
            }
            b'\'' | b'"' => {
                self.skip_string(false)?;
                Ok(Skipped::Literal)
            }
            b'r' if matches!(next, Some(b'\'') | Some(b'"'))
                && (pos == 0 || !is_identifier_byte(bytes[pos - 1])) =>
            {
                self.pos += 1;
                self.skip_string(true)?;
                Ok(Skipped::Literal)
            }
            _ => Ok(Skipped::Nothing),
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let start = self.pos;
        let mut depth = 0usize;
        while self.pos + 1 < self.bytes.len() {
            match (self.bytes[self.pos], self.bytes[self.pos + 1]) {
                (b'/', b'*') => {
                    depth += 1;
                    self.pos += 2;
                }
                (b'*', b'/') => {
                    depth -= 1;
                    self.pos += 2;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => self.pos += 1,
            }
        }
        Err(Error::parse(format!(
            "unterminated block comment starting at byte {}",
            start
        )))
    }

    /// Skip a string literal; the cursor is on the opening quote.
    fn skip_string(&mut self, raw: bool) -> Result<()> {
        let start = self.pos;
        let quote = self.bytes[self.pos];
        let triple = self.bytes.get(self.pos + 1) == Some(&quote)
            && self.bytes.get(self.pos + 2) == Some(&quote);
        self.pos += if triple { 3 } else { 1 };

        while self.pos < self.bytes.len() {
            let byte = self.bytes[self.pos];
            if byte == quote {
                if !triple {
                    self.pos += 1;
                    return Ok(());
                }
                if self.bytes.get(self.pos + 1) == Some(&quote)
                    && self.bytes.get(self.pos + 2) == Some(&quote)
                {
                    self.pos += 3;
                    return Ok(());
                }
                self.pos += 1;
            } else if !raw && byte == b'\\' {
                self.pos += 2;
            } else if !raw && byte == b'$' && self.bytes.get(self.pos + 1) == Some(&b'{') {
                self.pos += 1;
                self.skip_braces()?;
            } else {
                self.pos += 1;
            }
        }
        Err(Error::parse(format!(
            "unterminated string literal starting at byte {}",
            start
        )))
    }

    /// Skip a balanced `{ ... }` group; the cursor is on the opening brace.
    fn skip_braces(&mut self) -> Result<()> {
        let start = self.pos;
        let mut depth = 0usize;
        while self.pos < self.bytes.len() {
            match self.skip_comment_or_literal()? {
                Skipped::Nothing => {}
                _ => continue,
            }
            match self.bytes[self.pos] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(Error::parse(format!(
            "unbalanced '{{' at byte {}",
            start
        )))
    }
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// Remove comments and annotations so only declaration syntax remains.
fn header_code(header: &str) -> String {
    let without_comments = COMMENT.replace_all(header, " ");
    ANNOTATION.replace_all(&without_comments, " ").trim().to_string()
}

/// Name and kind of a declaration whose body is a brace block.
fn classify_block_header(header: &str) -> Option<(String, DeclarationKind)> {
    let code = header_code(header);

    for captures in TYPE_DECLARATION.captures_iter(&code) {
        let name = &captures[2];
        if name == "class" || name == "on" {
            continue;
        }
        let kind = match &captures[1] {
            "class" => DeclarationKind::Class,
            "enum" => DeclarationKind::Enum,
            "mixin" => DeclarationKind::Mixin,
            _ => DeclarationKind::Extension,
        };
        return Some((name.to_string(), kind));
    }

    if let Some(captures) = GETTER.captures(&code) {
        return Some((captures[1].to_string(), DeclarationKind::Function));
    }

    function_name(&code).map(|name| (name, DeclarationKind::Function))
}

/// Name and body of an expression-bodied function (`... => expr;`).
fn classify_arrow_function(header: &str) -> Option<(String, String)> {
    let code = header_code(header);
    let arrow = code.find("=>")?;
    let (signature, body) = (code[..arrow].trim(), code[arrow + 2..].trim());

    let name = match GETTER.captures(signature) {
        Some(captures) => captures[1].to_string(),
        None => function_name(signature)?,
    };
    Some((name, body.to_string()))
}

/// Name of the function declared by `signature`, e.g. `Future<int> f(int a) async`.
fn function_name(signature: &str) -> Option<String> {
    let open = signature.find('(')?;
    let prefix = &signature[..open];
    if prefix.contains('=') {
        return None;
    }

    let close = matching_paren(signature, open)?;
    if !FUNCTION_MODIFIERS.contains(&signature[close + 1..].trim()) {
        return None;
    }

    let prefix = strip_trailing_type_parameters(prefix.trim_end());
    let name: String = prefix
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let starts_like_identifier = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    starts_like_identifier.then_some(name)
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in text.as_bytes()[open..].iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// `T first<T>` -> `T first`
fn strip_trailing_type_parameters(prefix: &str) -> &str {
    if !prefix.ends_with('>') {
        return prefix;
    }
    let mut depth = 0usize;
    for (idx, byte) in prefix.as_bytes().iter().enumerate().rev() {
        match byte {
            b'>' => depth += 1,
            b'<' => {
                depth -= 1;
                if depth == 0 {
                    return prefix[..idx].trim_end();
                }
            }
            _ => {}
        }
    }
    prefix
}
