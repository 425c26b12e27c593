//! Built-in processors.
//!
//! - [`CssUrlRewriter`] (`css-url-rewriting`, rank 100) rewrites relative
//!   `url(...)` references so they keep working once the stylesheet is served
//!   from a different URL
//! - [`CssMinifier`] (`css-min`, rank 1000) drops comments and redundant
//!   whitespace
//! - [`JsMinifier`] (`js-min`, rank 1000) drops indentation, blank lines and
//!   full-line comments
//!
//! The minifiers are conservative: quoted strings and JavaScript template
//! literals are copied unchanged and statement boundaries are kept. Template
//! literals nested inside `${...}` are not tracked.

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use super::{ProcessingContext, Processor};
use crate::constants::{CSS_MIN, CSS_URL_REWRITING, JS_MIN};
use crate::core::AssetType;

const CSS_TYPES: &[AssetType] = &[AssetType::Css, AssetType::Less];
const JS_TYPES: &[AssetType] = &[AssetType::Js];

fn as_text(content: &[u8]) -> Result<&str> {
    std::str::from_utf8(content).context("Asset content is not valid UTF-8")
}

/// Rewrites relative `url(...)` references against the asset's final location.
#[derive(Debug, Clone)]
pub struct CssUrlRewriter {
    url_regex: Regex,
}

impl CssUrlRewriter {
    /// Compile the processor.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            url_regex: Regex::new(r#"url\(\s*(['"]?)([^'")]*?)(['"]?)\s*\)"#)?,
        })
    }
}

impl Processor for CssUrlRewriter {
    fn key(&self) -> &str {
        CSS_URL_REWRITING
    }

    fn compatible_types(&self) -> &[AssetType] {
        CSS_TYPES
    }

    fn rank(&self) -> u32 {
        100
    }

    fn process(&self, content: &[u8], context: &ProcessingContext<'_>) -> Result<Vec<u8>> {
        let css = as_text(content)?;
        let rewritten = self.url_regex.replace_all(css, |caps: &Captures<'_>| {
            let quote = &caps[1];
            let target = &caps[2];
            format!("url({quote}{}{quote})", rewrite_url(context.location, target))
        });
        Ok(rewritten.into_owned().into_bytes())
    }
}

/// Resolve `url` relative to the directory of `base_location`.
///
/// Absolute paths, full URLs, fragments and data URIs are returned unchanged.
fn rewrite_url(base_location: &str, url: &str) -> String {
    if url.is_empty()
        || url.starts_with('/')
        || url.starts_with('#')
        || url.starts_with("data:")
        || url.contains("://")
    {
        return url.to_string();
    }

    // Split "scheme://host" from the path so only the path is normalized
    let path_start = base_location
        .find("://")
        .map_or(0, |idx| base_location[idx + 3..].find('/').map_or(base_location.len(), |p| idx + 3 + p));
    let (origin, base_path) = base_location.split_at(path_start);
    let base_path = base_path.split(['?', '#']).next().unwrap_or_default();
    let base_dir = base_path.rfind('/').map_or("", |idx| &base_path[..=idx]);

    let (url_path, suffix) = url.find(['?', '#']).map_or((url, ""), |idx| url.split_at(idx));

    let absolute = base_dir.starts_with('/') || !origin.is_empty();
    let mut segments: Vec<&str> = Vec::new();
    for segment in base_dir.split('/').chain(url_path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("{origin}/{joined}{suffix}")
    } else {
        format!("{joined}{suffix}")
    }
}

/// Removes comments and collapses whitespace in stylesheets.
#[derive(Debug, Clone)]
pub struct CssMinifier {
    literals: Regex,
    whitespace: Regex,
    punctuation: Regex,
}

impl CssMinifier {
    /// Compile the processor.
    ///
    /// # Errors
    ///
    /// Returns an error if an internal pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            literals: Regex::new(r#"(?s)"(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])*'|/\*.*?\*/"#)?,
            whitespace: Regex::new(r"\s+")?,
            punctuation: Regex::new(r"\s*([{};,>])\s*")?,
        })
    }

    fn minify_code(&self, code: &str) -> String {
        let code = self.whitespace.replace_all(code, " ");
        let code = self.punctuation.replace_all(&code, "$1");
        code.replace(";}", "}")
    }
}

impl Processor for CssMinifier {
    fn key(&self) -> &str {
        CSS_MIN
    }

    fn compatible_types(&self) -> &[AssetType] {
        CSS_TYPES
    }

    fn process(&self, content: &[u8], _context: &ProcessingContext<'_>) -> Result<Vec<u8>> {
        let css = as_text(content)?;
        let mut out = String::with_capacity(css.len());
        // code between string literals, comments already dropped
        let mut code = String::new();
        let mut last = 0;

        for literal in self.literals.find_iter(css) {
            code.push_str(&css[last..literal.start()]);
            last = literal.end();
            if literal.as_str().starts_with("/*") {
                continue;
            }
            out.push_str(&self.minify_code(&code));
            out.push_str(literal.as_str());
            code.clear();
        }
        code.push_str(&css[last..]);
        out.push_str(&self.minify_code(&code));

        Ok(out.trim().as_bytes().to_vec())
    }
}

/// Lexical state of a script at a line boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptState {
    Code,
    Template,
    BlockComment,
}

/// State after scanning `line` from `state`.
fn scan_script_line(line: &str, mut state: ScriptState) -> ScriptState {
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            ScriptState::BlockComment => {
                if c == '*' && chars.next_if_eq(&'/').is_some() {
                    state = ScriptState::Code;
                }
            }
            ScriptState::Template => match c {
                '\\' => {
                    chars.next();
                }
                '`' => state = ScriptState::Code,
                _ => {}
            },
            ScriptState::Code => match quote {
                Some(q) => {
                    if c == '\\' {
                        chars.next();
                    } else if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '"' | '\'' => quote = Some(c),
                    '`' => state = ScriptState::Template,
                    '/' if chars.peek() == Some(&'/') => break,
                    '/' if chars.next_if_eq(&'*').is_some() => state = ScriptState::BlockComment,
                    _ => {}
                },
            },
        }
    }
    state
}

/// Strips indentation, blank lines and full-line `//` comments from scripts.
///
/// Lines inside a multi-line template literal are kept verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsMinifier;

impl Processor for JsMinifier {
    fn key(&self) -> &str {
        JS_MIN
    }

    fn compatible_types(&self) -> &[AssetType] {
        JS_TYPES
    }

    fn process(&self, content: &[u8], _context: &ProcessingContext<'_>) -> Result<Vec<u8>> {
        let js = as_text(content)?;
        let mut state = ScriptState::Code;
        let mut lines: Vec<&str> = Vec::new();

        for line in js.lines() {
            let inside_template = state == ScriptState::Template;
            state = scan_script_line(line, state);
            if inside_template {
                lines.push(line);
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }
            // trailing whitespace belongs to a template literal opened on this line
            lines.push(if state == ScriptState::Template { line.trim_start() } else { trimmed });
        }
        Ok(lines.join("\n").into_bytes())
    }
}
