//! Reference evaluator for compiled queries
//!
//! Applies a [`QueryComponent`] tree to one stored document with Elasticsearch boolean
//! semantics: every `must` and `filter` clause has to match, no `must_not` clause may
//! match, and `should` clauses are required (at least one) only when the Bool has no
//! `must` or `filter` clauses.

use serde_json::{Map, Value};

use super::analyzer;
use crate::query::bool_query::BoolQuery;
use crate::query::component::QueryComponent;
use crate::query::types::FieldValue;

/// A document as the evaluator sees it
#[derive(Clone, Copy, Debug)]
pub struct DocumentView<'a> {
    pub type_name: &'a str,
    pub source: &'a Value,
}

/// Whether `query` accepts the document
pub fn matches(query: &QueryComponent, doc: DocumentView<'_>) -> bool {
    match query {
        QueryComponent::Term { field, value } => scalars_at(doc.source, field)
            .iter()
            .any(|v| v.compare(value) == Some(std::cmp::Ordering::Equal)),
        QueryComponent::Range { field, bounds } => scalars_at(doc.source, field)
            .iter()
            .any(|v| bounds.contains(v)),
        QueryComponent::Exists { field } => !scalars_at(doc.source, field).is_empty(),
        QueryComponent::Match {
            field,
            text,
            auto_fuzzy,
        } => {
            let query_terms = analyzer::tokenize(text);
            texts_at(doc.source, field).iter().any(|value| {
                let indexed = analyzer::tokenize(value);
                query_terms.iter().any(|q| {
                    indexed
                        .iter()
                        .any(|t| analyzer::term_matches(q, t, *auto_fuzzy))
                })
            })
        }
        QueryComponent::MatchPhrasePrefix { field, text } => {
            let query_terms = analyzer::tokenize(text);
            texts_at(doc.source, field)
                .iter()
                .any(|value| !phrase_prefix_positions(&analyzer::tokenize(value), &query_terms).is_empty())
        }
        QueryComponent::Type { type_name } => doc.type_name == type_name,
        QueryComponent::MatchAll => true,
        QueryComponent::Bool(bool_query) => matches_bool(bool_query, doc),
    }
}

fn matches_bool(query: &BoolQuery, doc: DocumentView<'_>) -> bool {
    if !query.must.iter().all(|c| matches(c, doc)) {
        return false;
    }
    if !query.filter.iter().all(|c| matches(c, doc)) {
        return false;
    }
    if query.must_not.iter().any(|c| matches(c, doc)) {
        return false;
    }
    let should_required = query.must.is_empty() && query.filter.is_empty();
    if should_required && !query.should.is_empty() {
        return query.should.iter().any(|c| matches(c, doc));
    }
    true
}

/// Relevance of a matching document: one point per matching scoring clause
pub fn score(query: &QueryComponent, doc: DocumentView<'_>) -> f64 {
    match query {
        QueryComponent::Match { .. } | QueryComponent::MatchPhrasePrefix { .. } => {
            if matches(query, doc) {
                1.0
            } else {
                0.0
            }
        }
        QueryComponent::MatchAll => 1.0,
        QueryComponent::Bool(b) => b.must.iter().chain(b.should.iter()).map(|c| score(c, doc)).sum(),
        _ => 0.0,
    }
}

/// Highlight fragments per requested field, `<em>`-wrapping matched words
pub fn highlight(query: &QueryComponent, doc: DocumentView<'_>, fields: &[String]) -> Map<String, Value> {
    let mut clauses = Vec::new();
    collect_text_clauses(query, &mut clauses);

    let mut result = Map::new();
    for field in fields {
        let mut fragments = Vec::new();
        for value in texts_at(doc.source, field) {
            let words = analyzer::word_spans(&value);
            let tokens: Vec<String> = words.iter().map(|(_, w)| w.to_lowercase()).collect();
            let mut marked = vec![false; words.len()];

            for clause in clauses.iter().filter(|c| clause_field(c) == Some(field.as_str())) {
                match clause {
                    QueryComponent::Match {
                        text, auto_fuzzy, ..
                    } => {
                        let query_terms = analyzer::tokenize(text);
                        for (i, token) in tokens.iter().enumerate() {
                            if query_terms
                                .iter()
                                .any(|q| analyzer::term_matches(q, token, *auto_fuzzy))
                            {
                                marked[i] = true;
                            }
                        }
                    }
                    QueryComponent::MatchPhrasePrefix { text, .. } => {
                        let query_terms = analyzer::tokenize(text);
                        for start in phrase_prefix_positions(&tokens, &query_terms) {
                            for flag in marked.iter_mut().skip(start).take(query_terms.len()) {
                                *flag = true;
                            }
                        }
                    }
                    _ => {}
                }
            }

            if marked.iter().any(|m| *m) {
                fragments.push(Value::String(mark(&value, &words, &marked)));
            }
        }
        if !fragments.is_empty() {
            result.insert(field.clone(), Value::Array(fragments));
        }
    }
    result
}

fn collect_text_clauses<'q>(query: &'q QueryComponent, out: &mut Vec<&'q QueryComponent>) {
    match query {
        QueryComponent::Match { .. } | QueryComponent::MatchPhrasePrefix { .. } => out.push(query),
        QueryComponent::Bool(b) => {
            for clause in b.must.iter().chain(b.should.iter()).chain(b.filter.iter()) {
                collect_text_clauses(clause, out);
            }
        }
        _ => {}
    }
}

fn clause_field(clause: &QueryComponent) -> Option<&str> {
    match clause {
        QueryComponent::Match { field, .. } | QueryComponent::MatchPhrasePrefix { field, .. } => {
            Some(field)
        }
        _ => None,
    }
}

fn mark(text: &str, words: &[(usize, &str)], marked: &[bool]) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut cursor = 0;
    for ((offset, word), hit) in words.iter().zip(marked) {
        if !*hit {
            continue;
        }
        out.push_str(&text[cursor..*offset]);
        out.push_str("<em>");
        out.push_str(word);
        out.push_str("</em>");
        cursor = offset + word.len();
    }
    out.push_str(&text[cursor..]);
    out
}

/// Start positions where `query_terms` occur in `tokens`, the last term as a prefix
fn phrase_prefix_positions(tokens: &[String], query_terms: &[String]) -> Vec<usize> {
    let Some((last, head)) = query_terms.split_last() else {
        return Vec::new();
    };
    if tokens.len() < query_terms.len() {
        return Vec::new();
    }
    (0..=tokens.len() - query_terms.len())
        .filter(|&start| {
            head.iter()
                .enumerate()
                .all(|(i, term)| tokens[start + i] == *term)
                && tokens[start + head.len()].starts_with(last.as_str())
        })
        .collect()
}

/// Every non-null JSON value at a dotted path, arrays flattened
fn values_at<'a>(source: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![source];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in flatten(current) {
            if let Some(child) = value.as_object().and_then(|m| m.get(segment)) {
                next.push(child);
            }
        }
        current = next;
    }
    flatten(current)
        .into_iter()
        .filter(|v| !v.is_null())
        .collect()
}

fn flatten(values: Vec<&Value>) -> Vec<&Value> {
    let mut out = Vec::new();
    for value in values {
        match value {
            Value::Array(items) => out.extend(flatten(items.iter().collect())),
            other => out.push(other),
        }
    }
    out
}

fn scalars_at(source: &Value, path: &str) -> Vec<FieldValue> {
    values_at(source, path)
        .into_iter()
        .filter_map(FieldValue::from_json)
        .collect()
}

fn texts_at(source: &Value, path: &str) -> Vec<String> {
    values_at(source, path)
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}
