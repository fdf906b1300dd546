use anyhow::{Context, Result};
use regex::Regex;

/// A slice of normalized text between two identifier tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'a> {
    /// Identifier token right before the fragment, `None` for the leading one.
    pub delimiter: Option<&'a str>,
    pub fragment: &'a str,
}

/// A fragment that survived the noise filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub code: Option<&'a str>,
    pub raw: &'a str,
    pub text: &'a str,
}

/// Splits bulletin text on listing identifiers (`8734075 RMV 1`).
#[derive(Debug, Clone)]
pub struct Segmenter {
    delimiter: Regex,
    min_len: usize,
}

impl Segmenter {
    pub fn new(pattern: &str, min_len: usize) -> Result<Self> {
        let delimiter = Regex::new(pattern)
            .with_context(|| format!("Invalid bulletin delimiter pattern: {pattern}"))?;
        Ok(Self { delimiter, min_len })
    }

    /// Every fragment, untrimmed, with the delimiter that opened it.
    /// `delimiter + fragment` over all spans rebuilds the input exactly.
    pub fn split_spans<'a>(&self, text: &'a str) -> Vec<Span<'a>> {
        let mut spans = Vec::new();
        let mut delimiter = None;
        let mut cursor = 0;

        for m in self.delimiter.find_iter(text) {
            spans.push(Span {
                delimiter,
                fragment: &text[cursor..m.start()],
            });
            delimiter = Some(m.as_str());
            cursor = m.end();
        }
        spans.push(Span {
            delimiter,
            fragment: &text[cursor..],
        });
        spans
    }

    /// Trimmed fragments at least `min_len` characters long, in source order.
    pub fn segment<'a>(&self, text: &'a str) -> Vec<Candidate<'a>> {
        self.split_spans(text)
            .into_iter()
            .filter_map(|span| {
                let trimmed = span.fragment.trim();
                (trimmed.chars().count() >= self.min_len).then_some(Candidate {
                    code: span.delimiter,
                    raw: span.fragment,
                    text: trimmed,
                })
            })
            .collect()
    }
}
