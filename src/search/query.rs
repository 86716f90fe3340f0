//! Query translation and building
//!
//! Users write space separated terms with an optional leading operator:
//!
//! ```text
//! +term   term must match
//! -term   term must not match
//! ~term   term may match
//! term    same as +term
//! ```
//!
//! The terms are rewritten into Tantivy query syntax, where a bare term is
//! optional, and parsed against every searchable field. `field:text` keeps
//! its meaning for schema fields; any other colon is searched literally.

use crate::search::document::fields;
use crate::search::error::SearchResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, QueryParser};
use tantivy::schema::Schema;
use tantivy::Index;

/// A single term of a user query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryTerm {
    /// `+term` or a bare term
    Required(String),

    /// `-term`
    Excluded(String),

    /// `~term`
    Optional(String),
}

impl QueryTerm {
    /// Classify a raw term by its first character.
    /// Empty terms and lone operators yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let mut chars = raw.chars();
        let term = match chars.next()? {
            '+' => QueryTerm::Required(chars.as_str().to_string()),
            '-' => QueryTerm::Excluded(chars.as_str().to_string()),
            '~' => QueryTerm::Optional(chars.as_str().to_string()),
            _ => QueryTerm::Required(raw.to_string()),
        };

        if term.text().is_empty() {
            None
        } else {
            Some(term)
        }
    }

    /// Same operator, different text
    pub fn with_text(&self, text: String) -> Self {
        match self {
            QueryTerm::Required(_) => QueryTerm::Required(text),
            QueryTerm::Excluded(_) => QueryTerm::Excluded(text),
            QueryTerm::Optional(_) => QueryTerm::Optional(text),
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, QueryTerm::Excluded(_))
    }

    pub fn text(&self) -> &str {
        match self {
            QueryTerm::Required(text) | QueryTerm::Excluded(text) | QueryTerm::Optional(text) => {
                text
            }
        }
    }
}

impl fmt::Display for QueryTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryTerm::Required(text) => write!(f, "+{}", text),
            QueryTerm::Excluded(text) => write!(f, "-{}", text),
            QueryTerm::Optional(text) => write!(f, "{}", text),
        }
    }
}

/// Split a user query on spaces and classify each term
pub fn parse_terms(query: &str) -> Vec<QueryTerm> {
    query.split(' ').filter_map(QueryTerm::parse).collect()
}

/// Rewrite a user query into Tantivy query syntax
pub fn translate_prefixes(query: &str) -> String {
    join_terms(&parse_terms(query))
}

fn join_terms(terms: &[QueryTerm]) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Query builder for the scroll index
pub struct QueryBuilder {
    parser: QueryParser,
    schema: Schema,
}

impl QueryBuilder {
    /// Create a query builder searching every default field of `index`
    pub fn new(index: &Index) -> SearchResult<Self> {
        let schema = index.schema();
        let default_fields = fields::DEFAULT_SEARCH
            .iter()
            .map(|name| schema.get_field(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            parser: QueryParser::for_index(index, default_fields),
            schema,
        })
    }

    /// Build a Tantivy query from a user query.
    /// Returns `None` if the query has no usable terms.
    ///
    /// A query made only of excluded terms matches every scroll without them.
    pub fn build(&self, query: &str) -> SearchResult<Option<Box<dyn Query>>> {
        let terms: Vec<QueryTerm> = parse_terms(query)
            .iter()
            .map(|term| term.with_text(self.literal(term.text())))
            .collect();
        if terms.is_empty() {
            return Ok(None);
        }

        if terms.iter().all(QueryTerm::is_excluded) {
            let excluded = terms
                .iter()
                .map(QueryTerm::text)
                .collect::<Vec<_>>()
                .join(" ");
            tracing::debug!(query = %query, excluded = %excluded, "Built exclusion-only query");
            let excluded = self.parser.parse_query(&excluded)?;
            return Ok(Some(Box::new(BooleanQuery::new(vec![
                (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                (Occur::MustNot, excluded),
            ]))));
        }

        let translated = join_terms(&terms);
        tracing::debug!(query = %query, translated = %translated, "Built search query");
        Ok(Some(self.parser.parse_query(&translated)?))
    }

    /// Quote a term whose `prefix:` does not name a schema field, so the
    /// parser searches the text instead of looking for a field.
    fn literal(&self, text: &str) -> String {
        match text.split_once(':') {
            Some((field, _)) if self.schema.get_field(field).is_err() => {
                format!("\"{}\"", text.replace('"', ""))
            }
            _ => text.to_string(),
        }
    }
}
