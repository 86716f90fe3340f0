//! Search document structures and the index schema

use crate::models::Scroll;
use serde::{Deserialize, Serialize};
use tantivy::schema::*;
use tantivy::TantivyDocument;

/// Schema field names
pub mod fields {
    /// Raw identifier, the primary key used for deletion
    pub const ID: &str = "id";
    /// Tokenized identifier, searchable
    pub const IDENTIFIER: &str = "identifier";
    pub const TYPE: &str = "type";
    pub const CONTENT: &str = "content";
    pub const SOURCE: &str = "source";
    pub const TAGS: &str = "tags";
    pub const HIDDEN: &str = "hidden";
    pub const OTHER: &str = "other";

    /// Fields searched by terms without an explicit `field:` prefix
    pub const DEFAULT_SEARCH: [&str; 7] = [IDENTIFIER, TYPE, CONTENT, SOURCE, TAGS, HIDDEN, OTHER];
}

/// English stemming analyzer, registered by Tantivy out of the box
pub const LANGUAGE_ANALYZER: &str = "en_stem";

/// Exact-match analyzer
pub const KEYWORD_ANALYZER: &str = "raw";

/// Whitespace/punctuation splitting plus lowercasing
pub const SIMPLE_ANALYZER: &str = "default";

/// Trait for documents that can be indexed and searched
pub trait SearchDocument {
    /// Convert to Tantivy document
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument;

    /// Get document ID
    fn document_id(&self) -> String;
}

/// Scroll as stored in the search index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollDocument {
    pub id: String,
    pub scroll_type: String,
    pub content: String,
    pub source: String,
    pub tags: String,
    pub hidden: String,
    pub other: String,
}

impl From<&Scroll> for ScrollDocument {
    fn from(scroll: &Scroll) -> Self {
        Self {
            id: scroll.id.to_string(),
            scroll_type: scroll.scroll_type.clone(),
            content: scroll.content.clone(),
            source: scroll.source.clone(),
            tags: scroll.tags.clone(),
            hidden: scroll.hidden.clone(),
            other: scroll.other.clone(),
        }
    }
}

impl From<Scroll> for ScrollDocument {
    fn from(scroll: Scroll) -> Self {
        Self::from(&scroll)
    }
}

impl SearchDocument for ScrollDocument {
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument {
        let mut doc = TantivyDocument::new();

        for (name, value) in [
            (fields::ID, &self.id),
            (fields::IDENTIFIER, &self.id),
            (fields::TYPE, &self.scroll_type),
            (fields::CONTENT, &self.content),
            (fields::SOURCE, &self.source),
            (fields::TAGS, &self.tags),
            (fields::HIDDEN, &self.hidden),
            (fields::OTHER, &self.other),
        ] {
            if let Ok(field) = schema.get_field(name) {
                doc.add_text(field, value);
            }
        }

        doc
    }

    fn document_id(&self) -> String {
        self.id.clone()
    }
}

fn analyzed(tokenizer: &str) -> TextOptions {
    TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(tokenizer)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    )
}

/// Build the search schema for scrolls
pub fn build_scroll_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // Primary key, only field we read back from hits
    schema_builder.add_text_field(fields::ID, STRING | STORED);

    schema_builder.add_text_field(fields::IDENTIFIER, analyzed(SIMPLE_ANALYZER));
    schema_builder.add_text_field(fields::TYPE, analyzed(KEYWORD_ANALYZER));

    for name in [
        fields::CONTENT,
        fields::SOURCE,
        fields::TAGS,
        fields::HIDDEN,
        fields::OTHER,
    ] {
        schema_builder.add_text_field(name, analyzed(LANGUAGE_ANALYZER));
    }

    schema_builder.build()
}
