use serde::{Deserialize, Serialize};
use std::fmt;

/// Type assigned to scrolls that do not declare one
pub const DEFAULT_SCROLL_TYPE: &str = "default";

/// Prefix of metadata lines inside a scroll source file
const METADATA_PREFIX: &str = "%@";

/// Identifier of a scroll: the source file name without its extension
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrollId(String);

impl ScrollId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScrollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScrollId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ScrollId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ScrollId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A parsed scroll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scroll {
    /// Unique identifier
    pub id: ScrollId,

    /// Scroll type, selects the header/footer templates
    #[serde(rename = "type")]
    pub scroll_type: String,

    /// LaTeX body
    pub content: String,

    /// Where the knowledge comes from
    pub source: String,

    /// Space separated tags
    pub tags: String,

    /// Searchable text that is not shown in the rendered image
    pub hidden: String,

    /// Any metadata the parser has no dedicated field for
    pub other: String,
}

impl Scroll {
    /// Create an empty scroll of the default type
    pub fn new(id: impl Into<ScrollId>) -> Self {
        Self {
            id: id.into(),
            scroll_type: DEFAULT_SCROLL_TYPE.to_string(),
            content: String::new(),
            source: String::new(),
            tags: String::new(),
            hidden: String::new(),
            other: String::new(),
        }
    }

    /// Name of the type specific header template
    pub fn header_template(&self) -> String {
        format!("{}_header", self.scroll_type)
    }

    /// Name of the type specific footer template
    pub fn footer_template(&self) -> String {
        format!("{}_footer", self.scroll_type)
    }
}

/// Parse the source text of a scroll.
///
/// Lines of the form `%@key value` carry metadata. `type`, `source`, `tags`
/// and `hidden` have dedicated fields; unknown keys are collected in `other`.
/// Every other line is part of the content.
pub fn parse(id: impl Into<ScrollId>, text: &str) -> Scroll {
    let mut scroll = Scroll::new(id);
    let mut content = Vec::new();

    for line in text.lines() {
        let Some(metadata) = line.trim_start().strip_prefix(METADATA_PREFIX) else {
            content.push(line);
            continue;
        };

        let (key, value) = match metadata.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (metadata, ""),
        };

        match key {
            "type" if !value.is_empty() => scroll.scroll_type = value.to_string(),
            "type" => {}
            "source" => append_field(&mut scroll.source, value),
            "tags" => append_field(&mut scroll.tags, value),
            "hidden" => append_field(&mut scroll.hidden, value),
            _ => append_field(&mut scroll.other, metadata.trim()),
        }
    }

    scroll.content = content.join("\n").trim().to_string();
    scroll
}

fn append_field(field: &mut String, value: &str) {
    if value.is_empty() {
        return;
    }
    if !field.is_empty() {
        field.push(' ');
    }
    field.push_str(value);
}
