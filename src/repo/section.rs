//! Section view over ini-style `.repo` files.
//!
//! A section starts at a line beginning with `[id]` and runs up to, but not including,
//! the next such line or the end of the text. Sections are recomputed from the text on
//! every call; nothing here owns the file.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\[([^\]\r\n]*)\]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub id: &'a str,
    /// Header line through the line before the next header, newlines included.
    pub body: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Section<'a> {
    /// Value of the first `key=value` line in the section, whitespace around both trimmed.
    pub fn value(&self, key: &str) -> Option<&'a str> {
        self.body.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once('=')?;
            (k.trim() == key).then(|| v.trim())
        })
    }
}

/// Parses every section of `content`, keyed by id in file order.
///
/// A repeated id keeps its first position but the body of its last occurrence.
pub fn parse_sections(content: &str) -> IndexMap<&str, Section<'_>> {
    let headers = HEADER.captures_iter(content).collect::<Vec<_>>();
    let mut sections = IndexMap::with_capacity(headers.len());

    for (i, caps) in headers.iter().enumerate() {
        let (Some(all), Some(id)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(content.len());

        sections.insert(
            id.as_str(),
            Section {
                id: id.as_str(),
                body: &content[all.start()..end],
                start: all.start(),
                end,
            },
        );
    }

    sections
}

/// Looks up a single section by exact id, agreeing with [`parse_sections`] on duplicates.
pub fn extract_section<'a>(content: &'a str, id: &str) -> Option<Section<'a>> {
    let mut found = None;
    let mut matches = HEADER.captures_iter(content).peekable();

    while let Some(caps) = matches.next() {
        let next_start = matches
            .peek()
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(content.len());

        let (Some(all), Some(header_id)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        if header_id.as_str() == id {
            found = Some(Section {
                id: header_id.as_str(),
                body: &content[all.start()..next_start],
                start: all.start(),
                end: next_start,
            });
        }
    }

    found
}

pub fn has_section(content: &str, id: &str) -> bool {
    HEADER
        .captures_iter(content)
        .any(|caps| caps.get(1).is_some_and(|m| m.as_str() == id))
}
