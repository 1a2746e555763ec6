//! Message templates
//!
//! Users write templates with uppercase aliases such as `{{TITLE}}` and
//! `{{COMMENT}}`. Before parsing, [`substitute_aliases`] rewrites every alias
//! to its canonical field path; the result is a Handlebars template.
//!
//! | Alias | Canonical path |
//! |-------|----------------|
//! | `{{TITLE}}` | `{{article.title}}` |
//! | `{{URL}}` | `{{article.url}}` |
//! | `{{CONTENT}}` | `{{article.content}}` |
//! | `{{COMMENT}}` | `{{comment}}` |
//! | `{{FIXED_MESSAGE}}` | `{{fixed_message}}` |

use std::borrow::Cow;
use std::sync::OnceLock;

use handlebars::Handlebars;
use regex::{Captures, Regex};
use serde::Serialize;
use thiserror::Error;

use crate::feed::Article;

/// Alias table: (alias, canonical path).
pub const ALIASES: &[(&str, &str)] = &[
    ("TITLE", "article.title"),
    ("URL", "article.url"),
    ("CONTENT", "article.content"),
    ("COMMENT", "comment"),
    ("FIXED_MESSAGE", "fixed_message"),
];

/// Bare identifiers that are valid canonical roots.
const CANONICAL_ROOTS: &[&str] = &["article", "comment", "fixed_message"];

/// Control keywords passed through untouched.
const KEYWORDS: &[&str] = &[
    "if", "else", "end", "range", "with", "define", "template", "block", "each", "unless",
    "lookup", "this",
];

/// Errors raised while preparing or rendering a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// An alias written in the wrong case, e.g. `{{title}}`
    #[error("template alias {token} must be uppercase; did you mean {suggestion}?")]
    LowercaseAlias { token: String, suggestion: String },

    /// An uppercase token that is not a known alias
    #[error("unknown template alias {token}; valid aliases are {valid}")]
    UnknownAlias { token: String, valid: String },

    /// The substituted template failed to parse
    #[error("template syntax error: {0}")]
    Syntax(String),

    /// Rendering failed
    #[error("template render error: {0}")]
    Render(String),
}

type PatternCell = OnceLock<Result<Regex, String>>;

/// Compile `pattern` once into `cell`; a bad pattern stays an error on every call.
fn compiled(cell: &'static PatternCell, pattern: &str) -> Result<&'static Regex, TemplateError> {
    cell.get_or_init(|| Regex::new(pattern).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| TemplateError::Syntax(format!("invalid pattern {pattern}: {e}")))
}

fn token_pattern() -> Result<&'static Regex, TemplateError> {
    static PATTERN: PatternCell = OnceLock::new();
    compiled(&PATTERN, r"(?s)\{\{(\{?~?)(\s*)(.*?)(\s*)(~?\}?)\}\}")
}

fn valid_aliases() -> String {
    ALIASES
        .iter()
        .map(|(alias, _)| format!("{{{{{alias}}}}}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn canonical_for(alias: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|(_, path)| *path)
}

fn word_pattern() -> Result<&'static Regex, TemplateError> {
    static PATTERN: PatternCell = OnceLock::new();
    compiled(&PATTERN, r"\b[A-Z][A-Z0-9_]*\b")
}

/// How a single `{{ ... }}` token is treated by the pre-pass.
enum TokenKind {
    /// Left exactly as written
    Verbatim,
    /// Helper or block expression; alias words inside are rewritten
    Expression,
    /// A bare identifier that may be an alias
    Identifier,
}

fn classify(token: &str) -> TokenKind {
    if token.is_empty() || token.starts_with(['.', '!', '>', '@', '&', '*']) {
        return TokenKind::Verbatim;
    }
    if token.starts_with(['#', '^', '/', '~'])
        || token.contains(|c: char| c.is_whitespace() || c == '(')
    {
        return TokenKind::Expression;
    }
    if token.contains(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        || KEYWORDS.contains(&token)
        || CANONICAL_ROOTS.contains(&token)
    {
        return TokenKind::Verbatim;
    }
    TokenKind::Identifier
}

fn rewrite_expression<'t>(words: &Regex, token: &'t str) -> Cow<'t, str> {
    words.replace_all(token, |caps: &Captures<'_>| {
        canonical_for(&caps[0])
            .map(str::to_string)
            .unwrap_or_else(|| caps[0].to_string())
    })
}

fn is_uppercase_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Rewrite uppercase aliases to canonical field paths.
///
/// Idempotent: canonical paths are passed through unchanged.
pub fn substitute_aliases(template: &str) -> Result<String, TemplateError> {
    let words = word_pattern()?;
    let mut failure = None;

    let substituted = token_pattern()?.replace_all(template, |caps: &Captures<'_>| {
        let whole = caps[0].to_string();
        if failure.is_some() {
            return whole;
        }

        let token = &caps[3];
        let rebuilt = |body: &str| {
            format!(
                "{{{{{}{}{}{}{}}}}}",
                &caps[1], &caps[2], body, &caps[4], &caps[5]
            )
        };

        match classify(token) {
            TokenKind::Verbatim => return whole,
            TokenKind::Expression => return rebuilt(&rewrite_expression(words, token)),
            TokenKind::Identifier => {}
        }

        if let Some(canonical) = canonical_for(token) {
            return rebuilt(canonical);
        }

        let upper = token.to_ascii_uppercase();
        if canonical_for(&upper).is_some() {
            failure = Some(TemplateError::LowercaseAlias {
                token: format!("{{{{{token}}}}}"),
                suggestion: format!("{{{{{upper}}}}}"),
            });
        } else if is_uppercase_identifier(token) {
            failure = Some(TemplateError::UnknownAlias {
                token: format!("{{{{{token}}}}}"),
                valid: valid_aliases(),
            });
        }
        whole
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(substituted.into_owned()),
    }
}

/// Check that a template substitutes and parses without rendering it.
pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    MessageTemplate::parse(template).map(|_| ())
}

/// A parsed, ready-to-render template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    source: String,
}

impl MessageTemplate {
    /// Substitute aliases and compile.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let source = substitute_aliases(raw)?;
        handlebars::Template::compile(&source)
            .map_err(|e| TemplateError::Syntax(e.to_string()))?;
        Ok(Self { source })
    }

    /// The template after alias substitution.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .render_template(&self.source, ctx)
            .map_err(|e| TemplateError::Render(e.to_string()))
    }
}

/// Article fields exposed to templates.
#[derive(Debug, Serialize)]
pub struct ArticleFields<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub content: &'a str,
}

/// Data available while rendering.
#[derive(Debug, Serialize)]
pub struct TemplateContext<'a> {
    pub article: ArticleFields<'a>,
    pub comment: &'a str,
    pub fixed_message: &'a str,
}

impl<'a> TemplateContext<'a> {
    pub fn new(article: &'a Article, comment: &'a str, fixed_message: &'a str) -> Self {
        Self {
            article: ArticleFields {
                title: &article.title,
                url: &article.link,
                content: &article.content,
            },
            comment,
            fixed_message,
        }
    }
}
