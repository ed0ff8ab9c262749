// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Format templates with `%{name}` placeholders.
//!
//! A template is parsed once into literal and placeholder tokens. The same
//! tokens drive both directions:
//!
//! - [`Template::render`] substitutes variables into the template.
//! - [`Template::invert`] builds a pattern that pulls one placeholder's value
//!   back out of a rendered line.
//!
//! Two placeholders with no literal text between them have no recoverable
//! boundary. [`Template::is_adjacent`] reports that case; inversion still
//! works but the capture may run into the neighbour's text.

use std::collections::HashMap;

use regex::Regex;

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Placeholder(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<Token>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn push_literal(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Literal(prev)) = tokens.last_mut() {
        prev.push_str(text);
    } else {
        tokens.push(Token::Literal(text.to_string()));
    }
}

impl Template {
    /// Splits `src` into tokens. A `%{` without a closing brace, or with a name
    /// containing anything other than letters, digits and `_`, is literal text.
    pub fn parse(src: &str) -> Template {
        let mut tokens = Vec::new();
        let mut rest = src;
        while let Some(open) = rest.find("%{") {
            let after = &rest[open + 2..];
            let name = after
                .find('}')
                .map(|close| &after[..close])
                .filter(|n| !n.is_empty() && n.chars().all(is_name_char));
            match name {
                Some(name) => {
                    push_literal(&mut tokens, &rest[..open]);
                    tokens.push(Token::Placeholder(name.to_string()));
                    rest = &after[name.len() + 1..];
                }
                None => {
                    push_literal(&mut tokens, &rest[..open + 1]);
                    rest = &rest[open + 1..];
                }
            }
        }
        push_literal(&mut tokens, rest);
        Template { tokens }
    }

    /// Substitutes each placeholder once. Unknown names stay as `%{name}`;
    /// substituted values are never scanned again.
    pub fn render(&self, vars: &HashMap<String, String>) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Placeholder(name) => match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("%{");
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, Token::Placeholder(n) if n == name))
    }

    /// True if some occurrence of `name` touches another placeholder with no
    /// literal text in between.
    pub fn is_adjacent(&self, name: &str) -> bool {
        self.tokens.windows(2).any(|pair| match pair {
            [Token::Placeholder(a), Token::Placeholder(b)] => a == name || b == name,
            _ => false,
        })
    }

    /// Builds the extraction pattern for `target`.
    ///
    /// Literals match themselves, the first `%{target}` becomes a greedy
    /// capturing group and every other placeholder a non-capturing wildcard.
    /// The pattern is anchored to the whole line.
    pub fn invert(&self, target: &str) -> Result<Inversion> {
        let mut pattern = String::from("^");
        let mut captured = false;
        for token in &self.tokens {
            match token {
                Token::Literal(text) => pattern.push_str(&regex::escape(text)),
                Token::Placeholder(name) if name == target && !captured => {
                    pattern.push_str("(.+)");
                    captured = true;
                }
                Token::Placeholder(_) => pattern.push_str("(?:.+)"),
            }
        }
        pattern.push('$');
        Ok(Inversion {
            regex: Regex::new(&pattern)?,
        })
    }
}

/// Compiled extraction pattern produced by [`Template::invert`].
#[derive(Clone, Debug)]
pub struct Inversion {
    regex: Regex,
}

impl Inversion {
    /// The captured value, or `None` when the line does not match or the
    /// template never contained the target placeholder.
    pub fn extract<'t>(&self, line: &'t str) -> Option<&'t str> {
        self.regex
            .captures(line)?
            .get(1)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
