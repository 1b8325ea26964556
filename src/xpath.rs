//! # Location Paths
//!
//! The page layout is described with XPath-style location paths copied straight
//! out of the browser's "copy XPath" menu, e.g.
//! `//*[@id="wr-forecast"]/div[4]/div/div[1]/span`. The HTML engine only speaks
//! CSS, so each path is parsed once and compiled to an equivalent selector.
//!
//! ## Supported Subset
//!
//! | XPath                 | CSS                                   |
//! |-----------------------|---------------------------------------|
//! | `/a` (leading)        | `a:root`                              |
//! | `//a` (leading)       | `a`                                   |
//! | `a/b`                 | `a > b`                               |
//! | `a//b`                | `a b`                                 |
//! | `*`                   | `*`                                   |
//! | `div[3]`              | `div:nth-of-type(3)`                  |
//! | `*[3]`                | `*:nth-child(3)`                      |
//! | `*[@id="x"]`          | `*[id="x"]`                           |
//!
//! A position after an attribute test (`div[@class="x"][2]`) means "the second
//! of the filtered set" in XPath, which CSS cannot express, so it is rejected.
//! So are functions, axes and anything else outside the table.

use scraper::{ElementRef, Html, Selector};
use std::fmt::{self, Write};
use thiserror::Error;
use tracing::debug;

/// Errors raised while compiling a location path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    /// Path text does not follow the grammar
    #[error("invalid path `{path}`: {reason}")]
    Syntax { path: String, reason: String },

    /// Valid XPath, but not expressible as a CSS selector
    #[error("unsupported path `{path}`: {reason}")]
    Unsupported { path: String, reason: String },

    /// The generated CSS was refused by the selector engine
    #[error("selector `{css}` rejected: {reason}")]
    Selector { css: String, reason: String },
}

/// How a step relates to the one before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// `/`
    Child,
    /// `//`
    Descendant,
}

/// One `/name[predicates]` segment of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    /// Element name, `None` for `*`
    pub name: Option<String>,
    /// `[@attr="value"]` tests, in source order
    pub attributes: Vec<(String, String)>,
    /// `[n]`, 1-based
    pub position: Option<usize>,
}

/// A parsed and compiled location path.
#[derive(Clone, Debug)]
pub struct LocationPath {
    source: String,
    steps: Vec<Step>,
    css: String,
    selector: Selector,
}

impl LocationPath {
    /// Parse `path` and compile it to a CSS selector.
    ///
    /// # Example
    /// ```
    /// use weather_logger_lib::xpath::LocationPath;
    ///
    /// let path = LocationPath::parse(r#"//*[@id="daylink-0"]/div[4]/span"#).unwrap();
    /// assert_eq!(path.css(), r#"*[id="daylink-0"] > div:nth-of-type(4) > span"#);
    /// ```
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let steps = parse_steps(path)?;
        let css = to_css(&steps);
        let selector = Selector::parse(&css).map_err(|e| PathError::Selector {
            css: css.clone(),
            reason: e.to_string(),
        })?;
        debug!(path, css = %css, "compiled location path");

        Ok(LocationPath {
            source: path.to_string(),
            steps,
            css,
            selector,
        })
    }

    /// Path text as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compiled selector text.
    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// First matching element in document order, like `tree.xpath(path)[0]`.
    pub fn select_first<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        doc.select(&self.selector).next()
    }
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn syntax(path: &str, reason: impl Into<String>) -> PathError {
    PathError::Syntax {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn unsupported(path: &str, reason: impl Into<String>) -> PathError {
    PathError::Unsupported {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_steps(path: &str) -> Result<Vec<Step>, PathError> {
    let mut rest = path.trim();
    if !rest.starts_with('/') {
        return Err(syntax(path, "must start with '/' or '//'"));
    }

    let mut steps = Vec::new();
    while !rest.is_empty() {
        let axis = if let Some(r) = rest.strip_prefix("//") {
            rest = r;
            Axis::Descendant
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
            Axis::Child
        } else {
            return Err(syntax(path, format!("expected '/' before `{rest}`")));
        };

        let (step, remaining) = parse_step(path, rest, axis)?;
        steps.push(step);
        rest = remaining;
    }

    Ok(steps)
}

fn parse_step<'a>(path: &str, input: &'a str, axis: Axis) -> Result<(Step, &'a str), PathError> {
    let (name, mut rest) = if let Some(r) = input.strip_prefix('*') {
        (None, r)
    } else {
        let end = input.find(|c| !is_name_char(c)).unwrap_or(input.len());
        if end == 0 {
            return match input.chars().next() {
                Some(c @ ('@' | '.')) => Err(unsupported(path, format!("`{c}` steps"))),
                Some(c) => Err(syntax(path, format!("unexpected `{c}`"))),
                None => Err(syntax(path, "trailing separator")),
            };
        }
        (Some(input[..end].to_ascii_lowercase()), &input[end..])
    };

    let mut step = Step {
        axis,
        name,
        attributes: Vec::new(),
        position: None,
    };

    while let Some(r) = rest.strip_prefix('[') {
        if let Some(r) = r.strip_prefix('@') {
            let (attr, remaining) = parse_attribute(path, r)?;
            step.attributes.push(attr);
            rest = remaining;
        } else {
            let close = r.find(']').ok_or_else(|| syntax(path, "unclosed '['"))?;
            let index = &r[..close];
            let n: usize = index
                .trim()
                .parse()
                .map_err(|_| unsupported(path, format!("predicate `[{index}]`")))?;
            if n == 0 {
                return Err(syntax(path, "positions start at 1"));
            }
            if step.position.is_some() {
                return Err(unsupported(path, "more than one position"));
            }
            if !step.attributes.is_empty() {
                return Err(unsupported(path, "position after an attribute test"));
            }
            step.position = Some(n);
            rest = &r[close + 1..];
        }
    }

    match rest.chars().next() {
        None | Some('/') => Ok((step, rest)),
        Some('(') => Err(unsupported(path, "functions")),
        Some(':') => Err(unsupported(path, "axes")),
        Some(c) => Err(syntax(path, format!("unexpected `{c}`"))),
    }
}

/// Parse `name="value"]` (the `[@` is already consumed).
fn parse_attribute<'a>(path: &str, input: &'a str) -> Result<((String, String), &'a str), PathError> {
    let end = input.find(|c| !is_name_char(c)).unwrap_or(input.len());
    if end == 0 {
        return Err(syntax(path, "expected attribute name after '@'"));
    }
    let name = input[..end].to_ascii_lowercase();

    let rest = input[end..]
        .trim_start()
        .strip_prefix('=')
        .ok_or_else(|| unsupported(path, format!("attribute test on `@{name}` without '='")))?
        .trim_start();

    let quote = rest
        .chars()
        .next()
        .filter(|c| *c == '"' || *c == '\'')
        .ok_or_else(|| syntax(path, "attribute value must be quoted"))?;
    let rest = &rest[1..];
    let close = rest
        .find(quote)
        .ok_or_else(|| syntax(path, "unterminated attribute value"))?;
    let value = rest[..close].to_string();

    let rest = rest[close + 1..]
        .trim_start()
        .strip_prefix(']')
        .ok_or_else(|| syntax(path, "expected ']' after attribute value"))?;

    Ok(((name, value), rest))
}

fn to_css(steps: &[Step]) -> String {
    let mut css = String::new();
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            css.push_str(match step.axis {
                Axis::Child => " > ",
                Axis::Descendant => " ",
            });
        }

        css.push_str(step.name.as_deref().unwrap_or("*"));
        if let Some(n) = step.position {
            let pseudo = if step.name.is_some() {
                "nth-of-type"
            } else {
                "nth-child"
            };
            let _ = write!(css, ":{pseudo}({n})");
        }
        for (name, value) in &step.attributes {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            let _ = write!(css, "[{name}=\"{escaped}\"]");
        }

        // A leading single slash anchors the first step at the document element
        if i == 0 && step.axis == Axis::Child {
            css.push_str(":root");
        }
    }
    css
}
