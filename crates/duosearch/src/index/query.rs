//! Construction of the two tantivy query shapes used for comparison.
//!
//! The exact shape is a single term match against the non-analyzed name
//! field. The similar shape is a disjunction of three weighted clauses that
//! trade precision against recall, with boosts biasing the ranking toward
//! precise matches first.

use tantivy::{
    Term,
    query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, TermQuery},
    schema::{Field, IndexRecordOption},
};

use super::error::Result;

const EXACT_BOOST: f32 = 2.0;
const PREFIX_BOOST: f32 = 1.5;
const TOKEN_MATCH_BOOST: f32 = 1.0;

/// The indexed fields a query can be built against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueryFields {
    pub name: Field,
    pub name_exact: Field,
}

/// Build the strict query: one exact term against the keyword name field.
///
/// Blank terms are rejected; the orchestrator short-circuits to an empty
/// result before ever calling a builder with one.
pub(crate) fn build_exact(fields: QueryFields, term: &str) -> Result<Box<dyn Query>> {
    let term = term.trim();
    if term.is_empty() {
        return Err(anyhow::anyhow!("query term is blank").into());
    }

    Ok(Box::new(TermQuery::new(
        Term::from_field_text(fields.name_exact, term),
        IndexRecordOption::Basic,
    )))
}

/// Build the similar query: a weighted disjunction requiring at least one of
/// - an exact term on the keyword name field (boost 2.0),
/// - a prefix on the analyzed name field using the lower-cased input (1.5),
/// - a per-token match on the analyzed name field where at least
///   [`minimum_required_tokens`] of the tokens must occur (1.0).
pub(crate) fn build_similar(fields: QueryFields, term: &str) -> Result<Box<dyn Query>> {
    let term = term.trim();
    if term.is_empty() {
        return Err(anyhow::anyhow!("query term is blank").into());
    }
    let lowered = term.to_lowercase();

    let exact = TermQuery::new(
        Term::from_field_text(fields.name_exact, term),
        IndexRecordOption::Basic,
    );

    let prefix = FuzzyTermQuery::new_prefix(Term::from_field_text(fields.name, &lowered), 0, true);

    let token_queries: Vec<Box<dyn Query>> = lowered
        .split_whitespace()
        .map(|token| {
            Box::new(TermQuery::new(
                Term::from_field_text(fields.name, token),
                IndexRecordOption::WithFreqs,
            )) as Box<dyn Query>
        })
        .collect();
    let required = minimum_required_tokens(token_queries.len());
    let token_match = BooleanQuery::union_with_minimum_required_clauses(token_queries, required);

    let clauses: Vec<(Occur, Box<dyn Query>)> = vec![
        (
            Occur::Should,
            Box::new(BoostQuery::new(Box::new(exact), EXACT_BOOST)),
        ),
        (
            Occur::Should,
            Box::new(BoostQuery::new(Box::new(prefix), PREFIX_BOOST)),
        ),
        (
            Occur::Should,
            Box::new(BoostQuery::new(Box::new(token_match), TOKEN_MATCH_BOOST)),
        ),
    ];

    Ok(Box::new(BooleanQuery::new(clauses)))
}

/// How many of `n` query tokens must match for the token clause to fire.
///
/// Below two tokens every token must match; from two tokens on, 70% of them
/// must (rounded down, never below one).
fn minimum_required_tokens(n: usize) -> usize {
    if n < 2 { n } else { ((n * 7) / 10).max(1) }
}
