//! Extraction of the voltage reading from a status page
//!
//! The page is scanned for elements of a given tag carrying a style class.
//! The first candidate whose text starts with the label yields the reading:
//!
//! ```text
//! <div class="text-md">Напруга: 221.4В</div>
//!                      ^^^^^^^^ ^^^^^ ^
//!                      label    value unit
//! ```

use regex::{Captures, Regex};
use tracing::trace;

use crate::error::ExtractError;

pub const DEFAULT_ELEMENT: &str = "div";
pub const DEFAULT_CLASS: &str = "text-md";
pub const DEFAULT_LABEL: &str = "Напруга:";

/// A single sampled value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f64,
}

/// Turns a page body into a reading
pub trait Extractor: Send + Sync {
    fn extract(&self, body: &str) -> Result<Reading, ExtractError>;
}

/// Extractor matching elements by tag, style class and label prefix
#[derive(Debug, Clone)]
pub struct LabelExtractor {
    open: Regex,
    close: Regex,
    class_attr: Regex,
    markup: Regex,
    hidden: Regex,
    char_ref: Regex,
    class: String,
    label: String,
}

impl LabelExtractor {
    pub fn new(element: &str, class: &str, label: &str) -> Result<Self, regex::Error> {
        let tag = regex::escape(element);
        Ok(Self {
            open: Regex::new(&format!(r"(?i)<{tag}\b([^>]*)>"))?,
            close: Regex::new(&format!(r"(?i)</{tag}\s*>"))?,
            class_attr: Regex::new(
                r#"(?i)(?:^|\s)class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            )?,
            markup: Regex::new(r"<[^>]*>")?,
            hidden: Regex::new(
                r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
            )?,
            char_ref: Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));")?,
            class: class.to_string(),
            label: label.to_string(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn has_class(&self, attributes: &str) -> bool {
        self.class_attr.captures(attributes).is_some_and(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .is_some_and(|value| value.as_str().split_whitespace().any(|c| c == self.class))
        })
    }

    /// Inner text of every element carrying the configured class
    ///
    /// An element's text runs up to the next closing tag of the same kind, so
    /// nested elements of the configured tag truncate their parent.
    fn candidates<'a>(&'a self, body: &'a str) -> impl Iterator<Item = String> + 'a {
        self.open.captures_iter(body).filter_map(move |caps| {
            let attributes = caps.get(1).map_or("", |m| m.as_str());
            if !self.has_class(attributes) {
                return None;
            }
            let rest = &body[caps.get(0)?.end()..];
            let end = self.close.find(rest).map_or(rest.len(), |m| m.start());
            Some(self.decode_entities(&self.markup.replace_all(&rest[..end], "")))
        })
    }

    /// Decode numeric character references and the common named entities
    fn decode_entities(&self, text: &str) -> String {
        let decoded = self.char_ref.replace_all(text, |caps: &Captures| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
                _ => None,
            };
            // unrepresentable references stay as written
            code.and_then(char::from_u32)
                .map_or_else(|| caps[0].to_string(), String::from)
        });

        // &amp; last so an escaped reference is not decoded twice
        decoded
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&")
    }
}

impl Default for LabelExtractor {
    fn default() -> Self {
        // the defaults are escaped literals and always compile
        Self::new(DEFAULT_ELEMENT, DEFAULT_CLASS, DEFAULT_LABEL)
            .unwrap_or_else(|e| unreachable!("default extractor pattern is invalid: {e}"))
    }
}

impl Extractor for LabelExtractor {
    fn extract(&self, body: &str) -> Result<Reading, ExtractError> {
        // comments and script/style blocks are never rendered
        let visible = self.hidden.replace_all(body, "");
        let mut candidates = self.candidates(&visible).peekable();
        if candidates.peek().is_none() {
            return Err(ExtractError::NoCandidateElements);
        }

        let text = candidates
            .find(|text| text.trim().starts_with(&self.label))
            .ok_or(ExtractError::LabelNotFound)?;
        trace!("matched element text '{}'", text.trim());

        let rest = text.trim()[self.label.len()..].trim();
        parse_value(rest).map(|value| Reading { value })
    }
}

/// Parse `221.4В` style text, dropping one trailing unit character
fn parse_value(text: &str) -> Result<f64, ExtractError> {
    let number = match text.chars().last() {
        Some(unit) if !unit.is_ascii_digit() && unit != '.' => {
            text[..text.len() - unit.len_utf8()].trim_end()
        }
        _ => text,
    };

    number
        .parse::<f64>()
        .map_err(|_| ExtractError::NumberFormat(text.to_string()))
}
