// strata-core/src/query/filter.rs
// The filter language: a closed set of modifiers over flat field names.
//
// Parsing and evaluation are strictly separated. `Filter::parse` validates
// shapes (modifier operands must be objects, `$in`/`$nin` operands arrays,
// regexes must compile) and produces a typed clause tree; `Filter::matches`
// is total over that tree and cannot fail mid-scan.
//
// Cross-field combination inside one modifier is part of the language and
// intentionally asymmetric: `$eq`, `$ne` and `$nin` require every listed
// field to pass, while `$gt`/`$gte`/`$lt`/`$lte`, `$in` and `$regex` need
// only one. Top-level keys of a filter node always conjoin.

use lazy_static::lazy_static;
use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::num::NonZeroUsize;

use crate::document::{json_type_name, Document};
use crate::error::{Result, StrataError};
use crate::value_utils::{compare_values, value_to_text, values_equal};

/// How `parse` treats a `$`-prefixed key that is not a known operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Unrecognized keys are ordinary field names (so `{"$typo": 1}` is an
    /// equality test against a field literally named `$typo`). This is the
    /// default because it is what dynamic callers historically got.
    #[default]
    Lenient,
    /// Unrecognized `$` keys fail parsing with `InvalidQuery`.
    Strict,
}

/// One top-level clause of a filter node.
#[derive(Debug, Clone)]
pub enum Clause {
    /// `field: literal` — equality on a single field.
    Field(String, Value),
    /// `$eq: {field: literal, ...}` — every listed field must be equal.
    Eq(Vec<(String, Value)>),
    /// `$ne: {field: literal, ...}` — every listed field must differ (or be
    /// absent).
    Ne(Vec<(String, Value)>),
    /// `$gt: {field: literal, ...}` — some listed field must order greater.
    Gt(Vec<(String, Value)>),
    /// `$gte: {field: literal, ...}` — some listed field must order
    /// greater-or-equal.
    Gte(Vec<(String, Value)>),
    /// `$lt: {field: literal, ...}` — some listed field must order less.
    Lt(Vec<(String, Value)>),
    /// `$lte: {field: literal, ...}` — some listed field must order
    /// less-or-equal.
    Lte(Vec<(String, Value)>),
    /// `$in: {field: [candidates], ...}` — some listed field must equal one
    /// of its candidates.
    In(Vec<(String, Vec<Value>)>),
    /// `$nin: {field: [candidates], ...}` — every listed field must equal
    /// none of its candidates (absent fields pass).
    Nin(Vec<(String, Vec<Value>)>),
    /// `$regex: {field: pattern, ...}` — some listed field's text form must
    /// match its pattern.
    Regex(Vec<(String, Regex)>),
    /// `$and: [node, ...]` — every branch must match.
    And(Vec<Filter>),
    /// `$or: [node, ...]` — some branch must match.
    Or(Vec<Filter>),
}

/// A parsed filter: the top-level clauses of one node, all of which must
/// hold. An empty filter matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// The match-everything filter.
    pub fn empty() -> Self {
        Filter::default()
    }

    /// Parse a JSON filter node leniently (see [`ParseMode::Lenient`]).
    pub fn parse(raw: &Value) -> Result<Self> {
        Self::parse_with(raw, ParseMode::Lenient)
    }

    /// Parse a JSON filter node, rejecting unknown operators.
    pub fn parse_strict(raw: &Value) -> Result<Self> {
        Self::parse_with(raw, ParseMode::Strict)
    }

    pub fn parse_with(raw: &Value, mode: ParseMode) -> Result<Self> {
        let node = raw.as_object().ok_or_else(|| {
            StrataError::InvalidQuery(format!(
                "filter must be a JSON object, got {}",
                json_type_name(raw)
            ))
        })?;

        let mut clauses = Vec::with_capacity(node.len());
        for (key, operand) in node {
            clauses.push(parse_clause(key, operand, mode)?);
        }
        Ok(Filter { clauses })
    }

    /// True when the document satisfies every top-level clause. Total:
    /// evaluation of a parsed filter never fails.
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| clause.matches(doc))
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The bare field names at the top level of this node. Index selection
    /// looks at these and nothing else: names inside modifier operands or
    /// `$and`/`$or` branches do not steer the scan.
    pub fn top_level_fields(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().filter_map(|clause| match clause {
            Clause::Field(name, _) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

impl Clause {
    /// Single exhaustive dispatch over the operator set.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Clause::Field(field, expected) => field_equals(doc, field, expected),
            Clause::Eq(pairs) => pairs.iter().all(|(f, v)| field_equals(doc, f, v)),
            Clause::Ne(pairs) => pairs.iter().all(|(f, v)| !field_equals(doc, f, v)),
            Clause::Gt(pairs) => pairs
                .iter()
                .any(|(f, v)| field_orders(doc, f, v, |ord| ord == Ordering::Greater)),
            Clause::Gte(pairs) => pairs
                .iter()
                .any(|(f, v)| field_orders(doc, f, v, |ord| ord != Ordering::Less)),
            Clause::Lt(pairs) => pairs
                .iter()
                .any(|(f, v)| field_orders(doc, f, v, |ord| ord == Ordering::Less)),
            Clause::Lte(pairs) => pairs
                .iter()
                .any(|(f, v)| field_orders(doc, f, v, |ord| ord != Ordering::Greater)),
            Clause::In(pairs) => pairs.iter().any(|(f, candidates)| {
                doc.get(f)
                    .map_or(false, |v| candidates.iter().any(|c| values_equal(v, c)))
            }),
            Clause::Nin(pairs) => pairs.iter().all(|(f, candidates)| {
                doc.get(f)
                    .map_or(true, |v| !candidates.iter().any(|c| values_equal(v, c)))
            }),
            Clause::Regex(pairs) => pairs.iter().any(|(f, regex)| {
                doc.get(f)
                    .and_then(value_to_text)
                    .map_or(false, |text| regex.is_match(&text))
            }),
            Clause::And(branches) => branches.iter().all(|node| node.matches(doc)),
            Clause::Or(branches) => branches.iter().any(|node| node.matches(doc)),
        }
    }
}

fn field_equals(doc: &Document, field: &str, expected: &Value) -> bool {
    doc.get(field)
        .map_or(false, |actual| values_equal(actual, expected))
}

fn field_orders(
    doc: &Document,
    field: &str,
    operand: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    doc.get(field)
        .and_then(|actual| compare_values(actual, operand))
        .map_or(false, accept)
}

// ============================================================================
// PARSING
// ============================================================================

fn parse_clause(key: &str, operand: &Value, mode: ParseMode) -> Result<Clause> {
    match key {
        "$eq" => Ok(Clause::Eq(literal_operands(key, operand)?)),
        "$ne" => Ok(Clause::Ne(literal_operands(key, operand)?)),
        "$gt" => Ok(Clause::Gt(literal_operands(key, operand)?)),
        "$gte" => Ok(Clause::Gte(literal_operands(key, operand)?)),
        "$lt" => Ok(Clause::Lt(literal_operands(key, operand)?)),
        "$lte" => Ok(Clause::Lte(literal_operands(key, operand)?)),
        "$in" => Ok(Clause::In(array_operands(key, operand)?)),
        "$nin" => Ok(Clause::Nin(array_operands(key, operand)?)),
        "$regex" => Ok(Clause::Regex(pattern_operands(operand)?)),
        "$and" => Ok(Clause::And(branch_nodes(key, operand, mode)?)),
        "$or" => Ok(Clause::Or(branch_nodes(key, operand, mode)?)),
        _ if key.starts_with('$') && mode == ParseMode::Strict => Err(
            StrataError::InvalidQuery(format!("unknown operator: {}", key)),
        ),
        _ => Ok(Clause::Field(key.to_string(), operand.clone())),
    }
}

fn operand_map<'a>(op: &str, operand: &'a Value) -> Result<&'a Map<String, Value>> {
    operand.as_object().ok_or_else(|| {
        StrataError::InvalidQuery(format!(
            "{} takes an object of field/operand pairs, got {}",
            op,
            json_type_name(operand)
        ))
    })
}

fn literal_operands(op: &str, operand: &Value) -> Result<Vec<(String, Value)>> {
    Ok(operand_map(op, operand)?
        .iter()
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect())
}

fn array_operands(op: &str, operand: &Value) -> Result<Vec<(String, Vec<Value>)>> {
    let mut pairs = Vec::new();
    for (field, candidates) in operand_map(op, operand)? {
        match candidates.as_array() {
            Some(items) => pairs.push((field.clone(), items.clone())),
            None => {
                return Err(StrataError::InvalidQuery(format!(
                    "{} operand for field '{}' must be an array, got {}",
                    op,
                    field,
                    json_type_name(candidates)
                )))
            }
        }
    }
    Ok(pairs)
}

fn pattern_operands(operand: &Value) -> Result<Vec<(String, Regex)>> {
    let mut pairs = Vec::new();
    for (field, spec) in operand_map("$regex", operand)? {
        let regex = match spec {
            Value::String(pattern) => compile_pattern(pattern, "")?,
            Value::Object(obj) => {
                let pattern = obj.get("pattern").and_then(Value::as_str).ok_or_else(|| {
                    StrataError::InvalidQuery(format!(
                        "$regex object for field '{}' needs a string \"pattern\"",
                        field
                    ))
                })?;
                let flags = match obj.get("flags") {
                    None => "",
                    Some(Value::String(flags)) => flags.as_str(),
                    Some(other) => {
                        return Err(StrataError::InvalidQuery(format!(
                            "$regex flags for field '{}' must be a string, got {}",
                            field,
                            json_type_name(other)
                        )))
                    }
                };
                compile_pattern(pattern, flags)?
            }
            other => {
                return Err(StrataError::InvalidQuery(format!(
                    "$regex operand for field '{}' must be a pattern string or a {{pattern, flags}} object, got {}",
                    field,
                    json_type_name(other)
                )))
            }
        };
        pairs.push((field.clone(), regex));
    }
    Ok(pairs)
}

fn branch_nodes(op: &str, operand: &Value, mode: ParseMode) -> Result<Vec<Filter>> {
    let items = operand.as_array().ok_or_else(|| {
        StrataError::InvalidQuery(format!(
            "{} takes an array of filter nodes, got {}",
            op,
            json_type_name(operand)
        ))
    })?;
    items
        .iter()
        .map(|item| Filter::parse_with(item, mode))
        .collect()
}

// ============================================================================
// REGEX COMPILATION
// ============================================================================

const REGEX_CACHE_SIZE: usize = 100;

lazy_static! {
    // Compiled patterns are cached across queries; the same handful of
    // patterns tends to be parsed over and over.
    static ref REGEX_CACHE: Mutex<LruCache<String, Regex>> =
        Mutex::new(LruCache::new(NonZeroUsize::new(REGEX_CACHE_SIZE).unwrap()));
}

/// Compile `pattern` with JS-style flag letters. `i`/`m`/`s`/`x` lower to an
/// inline `(?imsx)` group; `g`/`u`/`y` are accepted and ignored (a
/// per-document substring test has no match state to be global or sticky
/// about); anything else is rejected.
fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex> {
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' | 'x' => {
                if !inline.contains(flag) {
                    inline.push(flag);
                }
            }
            'g' | 'u' | 'y' => {}
            other => {
                return Err(StrataError::InvalidQuery(format!(
                    "unsupported regex flag '{}'",
                    other
                )))
            }
        }
    }

    let full = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", inline, pattern)
    };

    let mut cache = REGEX_CACHE.lock();
    if let Some(regex) = cache.get(&full) {
        return Ok(regex.clone());
    }

    let regex = Regex::new(&full)
        .map_err(|e| StrataError::InvalidQuery(format!("invalid regex pattern: {}", e)))?;
    cache.put(full, regex.clone());
    Ok(regex)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> Document {
        Document::from_value(fields).unwrap()
    }

    fn parse(raw: Value) -> Filter {
        Filter::parse(&raw).unwrap()
    }

    // ---- shape and policy ----------------------------------------------

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = parse(json!({}));
        assert!(filter.is_empty());
        assert!(filter.matches(&doc(json!({"a": 1}))));
        assert!(filter.matches(&Document::new()));
    }

    #[test]
    fn test_non_object_filter_is_rejected() {
        for bad in [json!(1), json!("x"), json!([{"a": 1}]), json!(null)] {
            assert!(matches!(
                Filter::parse(&bad),
                Err(StrataError::InvalidQuery(_))
            ));
        }
    }

    #[test]
    fn test_non_object_modifier_operand_is_rejected() {
        for bad in [
            json!({"$gt": 5}),
            json!({"$eq": [1, 2]}),
            json!({"$ne": "x"}),
            json!({"$regex": "Fr"}),
        ] {
            assert!(matches!(
                Filter::parse(&bad),
                Err(StrataError::InvalidQuery(_))
            ));
        }
    }

    #[test]
    fn test_unknown_operator_lenient_is_field_equality() {
        let filter = parse(json!({"$where": 1}));
        // no field literally named "$where" -> no match
        assert!(!filter.matches(&doc(json!({"age": 1}))));
        // a field literally named "$where" -> plain equality
        assert!(filter.matches(&doc(json!({"$where": 1}))));
    }

    #[test]
    fn test_unknown_operator_strict_is_rejected() {
        let err = Filter::parse_strict(&json!({"$where": 1})).unwrap_err();
        match err {
            StrataError::InvalidQuery(msg) => assert!(msg.contains("$where")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strict_mode_recurses_into_branches() {
        let raw = json!({"$and": [{"$bogus": {"a": 1}}]});
        assert!(Filter::parse(&raw).is_ok());
        assert!(matches!(
            Filter::parse_strict(&raw),
            Err(StrataError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_parse_mode_default_is_lenient() {
        assert_eq!(ParseMode::default(), ParseMode::Lenient);
    }

    // ---- equality ------------------------------------------------------

    #[test]
    fn test_bare_field_equality() {
        let filter = parse(json!({"author": "Fred"}));
        assert!(filter.matches(&doc(json!({"author": "Fred", "age": 1}))));
        assert!(!filter.matches(&doc(json!({"author": "Barney"}))));
        assert!(!filter.matches(&doc(json!({"title": "x"}))));
    }

    #[test]
    fn test_bare_field_numeric_leniency() {
        let filter = parse(json!({"age": 2}));
        assert!(filter.matches(&doc(json!({"age": 2.0}))));
        assert!(!filter.matches(&doc(json!({"age": "2"}))));
    }

    #[test]
    fn test_top_level_keys_conjoin() {
        let filter = parse(json!({"author": "Fred", "age": 1}));
        assert!(filter.matches(&doc(json!({"author": "Fred", "age": 1}))));
        assert!(!filter.matches(&doc(json!({"author": "Fred", "age": 2}))));
        assert!(!filter.matches(&doc(json!({"author": "Barney", "age": 1}))));
    }

    #[test]
    fn test_eq_requires_every_field() {
        let filter = parse(json!({"$eq": {"author": "Fred", "age": 1}}));
        assert!(filter.matches(&doc(json!({"author": "Fred", "age": 1}))));
        assert!(!filter.matches(&doc(json!({"author": "Fred", "age": 3}))));
        assert!(!filter.matches(&doc(json!({"author": "Fred"}))));
    }

    #[test]
    fn test_eq_with_no_fields_is_vacuously_true() {
        let filter = parse(json!({"$eq": {}}));
        assert!(filter.matches(&doc(json!({"anything": 1}))));
    }

    #[test]
    fn test_ne_requires_every_field_to_differ() {
        let filter = parse(json!({"$ne": {"author": "Fred", "age": 1}}));
        assert!(filter.matches(&doc(json!({"author": "Barney", "age": 3}))));
        // one field equal -> no match
        assert!(!filter.matches(&doc(json!({"author": "Fred", "age": 3}))));
        assert!(!filter.matches(&doc(json!({"author": "Barney", "age": 1}))));
    }

    #[test]
    fn test_ne_treats_missing_fields_as_different() {
        let filter = parse(json!({"$ne": {"author": "Fred"}}));
        assert!(filter.matches(&doc(json!({"title": "x"}))));
        assert!(filter.matches(&Document::new()));
    }

    // ---- ordering ------------------------------------------------------

    #[test]
    fn test_gt() {
        let filter = parse(json!({"$gt": {"age": 2}}));
        assert!(filter.matches(&doc(json!({"age": 3}))));
        assert!(!filter.matches(&doc(json!({"age": 2}))));
        assert!(!filter.matches(&doc(json!({"age": 1}))));
    }

    #[test]
    fn test_gte_lte_include_the_boundary() {
        let gte = parse(json!({"$gte": {"age": 2}}));
        assert!(gte.matches(&doc(json!({"age": 2}))));
        assert!(gte.matches(&doc(json!({"age": 2.5}))));
        assert!(!gte.matches(&doc(json!({"age": 1}))));

        let lte = parse(json!({"$lte": {"age": 2}}));
        assert!(lte.matches(&doc(json!({"age": 2}))));
        assert!(lte.matches(&doc(json!({"age": 1}))));
        assert!(!lte.matches(&doc(json!({"age": 3}))));
    }

    #[test]
    fn test_lt() {
        let filter = parse(json!({"$lt": {"age": 2}}));
        assert!(filter.matches(&doc(json!({"age": 1}))));
        assert!(!filter.matches(&doc(json!({"age": 2}))));
    }

    #[test]
    fn test_range_operators_are_disjunctive_across_fields() {
        let filter = parse(json!({"$gt": {"age": 5, "pages": 100}}));
        // age fails, pages passes -> the clause passes
        assert!(filter.matches(&doc(json!({"age": 1, "pages": 150}))));
        assert!(filter.matches(&doc(json!({"age": 9, "pages": 10}))));
        assert!(!filter.matches(&doc(json!({"age": 1, "pages": 10}))));
    }

    #[test]
    fn test_range_with_no_fields_never_matches() {
        let filter = parse(json!({"$gt": {}}));
        assert!(!filter.matches(&doc(json!({"age": 99}))));
    }

    #[test]
    fn test_ordering_against_missing_or_mismatched_field_fails() {
        let filter = parse(json!({"$gt": {"age": 2}}));
        assert!(!filter.matches(&doc(json!({"title": "x"}))));
        assert!(!filter.matches(&doc(json!({"age": "three"}))));
        assert!(!filter.matches(&doc(json!({"age": null}))));
    }

    #[test]
    fn test_string_ordering_is_lexicographic() {
        let filter = parse(json!({"$gte": {"since": "2024-03-01"}}));
        assert!(filter.matches(&doc(json!({"since": "2024-06-15"}))));
        assert!(!filter.matches(&doc(json!({"since": "2023-12-31"}))));
    }

    // ---- set membership ------------------------------------------------

    #[test]
    fn test_in() {
        let filter = parse(json!({"$in": {"isbn": [234567, 345678]}}));
        assert!(filter.matches(&doc(json!({"isbn": 234567}))));
        assert!(filter.matches(&doc(json!({"isbn": 345678.0}))));
        assert!(!filter.matches(&doc(json!({"isbn": 123456}))));
        assert!(!filter.matches(&doc(json!({"title": "x"}))));
    }

    #[test]
    fn test_in_is_disjunctive_across_fields() {
        let filter = parse(json!({"$in": {"isbn": [1], "age": [2]}}));
        assert!(filter.matches(&doc(json!({"isbn": 9, "age": 2}))));
        assert!(filter.matches(&doc(json!({"isbn": 1}))));
        assert!(!filter.matches(&doc(json!({"isbn": 9, "age": 9}))));
    }

    #[test]
    fn test_nin() {
        let filter = parse(json!({"$nin": {"isbn": [234567, 345678]}}));
        assert!(filter.matches(&doc(json!({"isbn": 123456}))));
        assert!(!filter.matches(&doc(json!({"isbn": 234567}))));
        // absent field is "not in" by definition
        assert!(filter.matches(&doc(json!({"title": "x"}))));
    }

    #[test]
    fn test_nin_is_conjunctive_across_fields() {
        let filter = parse(json!({"$nin": {"isbn": [1], "age": [2]}}));
        assert!(filter.matches(&doc(json!({"isbn": 9, "age": 9}))));
        assert!(!filter.matches(&doc(json!({"isbn": 1, "age": 9}))));
        assert!(!filter.matches(&doc(json!({"isbn": 9, "age": 2}))));
    }

    #[test]
    fn test_in_nin_reject_non_array_operands() {
        for bad in [
            json!({"$in": {"isbn": 234567}}),
            json!({"$nin": {"isbn": "x"}}),
            json!({"$in": {"isbn": {"list": []}}}),
        ] {
            assert!(matches!(
                Filter::parse(&bad),
                Err(StrataError::InvalidQuery(_))
            ));
        }
    }

    // ---- regex ---------------------------------------------------------

    #[test]
    fn test_regex_string_pattern_is_case_sensitive() {
        let filter = parse(json!({"$regex": {"author": "Fr"}}));
        assert!(filter.matches(&doc(json!({"author": "Fred"}))));
        assert!(filter.matches(&doc(json!({"author": "Frank"}))));
        assert!(!filter.matches(&doc(json!({"author": "froid"}))));
        assert!(!filter.matches(&doc(json!({"author": "Barney"}))));
    }

    #[test]
    fn test_regex_object_pattern_carries_flags() {
        let filter = parse(json!({"$regex": {"author": {"pattern": "Fr", "flags": "i"}}}));
        assert!(filter.matches(&doc(json!({"author": "froid"}))));
        assert!(filter.matches(&doc(json!({"author": "Fred"}))));
        assert!(!filter.matches(&doc(json!({"author": "Barney"}))));
    }

    #[test]
    fn test_regex_coerces_numbers_to_text() {
        let filter = parse(json!({"$regex": {"isbn": {"pattern": "234", "flags": "g"}}}));
        assert!(filter.matches(&doc(json!({"isbn": 123456})))); // "123456" contains "234"
        assert!(filter.matches(&doc(json!({"isbn": 234567}))));
        assert!(!filter.matches(&doc(json!({"isbn": 567890}))));
    }

    #[test]
    fn test_regex_non_text_values_never_match() {
        let filter = parse(json!({"$regex": {"tags": "a"}}));
        assert!(!filter.matches(&doc(json!({"tags": ["abc"]}))));
        assert!(!filter.matches(&doc(json!({"tags": null}))));
        assert!(!filter.matches(&doc(json!({"tags": {"a": 1}}))));
    }

    #[test]
    fn test_regex_is_disjunctive_across_fields() {
        let filter = parse(json!({"$regex": {"author": "Fr", "title": "Quarry"}}));
        assert!(filter.matches(&doc(json!({"author": "Barney", "title": "Quarry Memories"}))));
        assert!(filter.matches(&doc(json!({"author": "Fred", "title": "Bedrock"}))));
        assert!(!filter.matches(&doc(json!({"author": "Barney", "title": "Bedrock"}))));
    }

    #[test]
    fn test_regex_rejects_bad_patterns_and_flags() {
        assert!(matches!(
            Filter::parse(&json!({"$regex": {"a": "["}})),
            Err(StrataError::InvalidQuery(_))
        ));
        assert!(matches!(
            Filter::parse(&json!({"$regex": {"a": {"pattern": "x", "flags": "z"}}})),
            Err(StrataError::InvalidQuery(_))
        ));
        assert!(matches!(
            Filter::parse(&json!({"$regex": {"a": 42}})),
            Err(StrataError::InvalidQuery(_))
        ));
        assert!(matches!(
            Filter::parse(&json!({"$regex": {"a": {"flags": "i"}}})),
            Err(StrataError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_regex_multiline_flag() {
        let filter = parse(json!({"$regex": {"notes": {"pattern": "^second", "flags": "m"}}}));
        assert!(filter.matches(&doc(json!({"notes": "first\nsecond"}))));
        let anchored = parse(json!({"$regex": {"notes": "^second"}}));
        assert!(!anchored.matches(&doc(json!({"notes": "first\nsecond"}))));
    }

    // ---- composition ---------------------------------------------------

    #[test]
    fn test_and_is_conjunctive() {
        let filter = parse(json!({"$and": [
            {"author": "Fred"},
            {"$gte": {"age": 2}}
        ]}));
        assert!(filter.matches(&doc(json!({"author": "Fred", "age": 2}))));
        assert!(!filter.matches(&doc(json!({"author": "Fred", "age": 1}))));
        assert!(!filter.matches(&doc(json!({"author": "Barney", "age": 2}))));
    }

    #[test]
    fn test_or_is_disjunctive() {
        let filter = parse(json!({"$or": [
            {"author": "Barney"},
            {"$gt": {"age": 2}}
        ]}));
        assert!(filter.matches(&doc(json!({"author": "Barney", "age": 1}))));
        assert!(filter.matches(&doc(json!({"author": "Fred", "age": 3}))));
        assert!(!filter.matches(&doc(json!({"author": "Fred", "age": 1}))));
    }

    #[test]
    fn test_empty_and_matches_empty_or_does_not() {
        assert!(parse(json!({"$and": []})).matches(&doc(json!({"a": 1}))));
        assert!(!parse(json!({"$or": []})).matches(&doc(json!({"a": 1}))));
    }

    #[test]
    fn test_three_levels_of_nesting() {
        let filter = parse(json!({"$and": [
            {"$or": [
                {"author": "Fred"},
                {"$and": [
                    {"author": "Barney"},
                    {"$lte": {"age": 3}}
                ]}
            ]},
            {"$ne": {"title": "Water Buffaloes"}}
        ]}));

        assert!(filter.matches(&doc(json!({"author": "Fred", "title": "Quarry Memories", "age": 9}))));
        assert!(filter.matches(&doc(json!({"author": "Barney", "title": "Bedrock Nights", "age": 3}))));
        assert!(!filter.matches(&doc(json!({"author": "Barney", "title": "Bedrock Nights", "age": 4}))));
        assert!(!filter.matches(&doc(json!({"author": "Fred", "title": "Water Buffaloes", "age": 1}))));
    }

    #[test]
    fn test_composite_alongside_field_keys() {
        let filter = parse(json!({
            "author": "Fred",
            "$or": [
                {"$lt": {"age": 2}},
                {"$gt": {"age": 9}}
            ]
        }));
        assert!(filter.matches(&doc(json!({"author": "Fred", "age": 1}))));
        assert!(filter.matches(&doc(json!({"author": "Fred", "age": 10}))));
        assert!(!filter.matches(&doc(json!({"author": "Fred", "age": 5}))));
        assert!(!filter.matches(&doc(json!({"author": "Barney", "age": 1}))));
    }

    #[test]
    fn test_and_or_reject_non_array_operands() {
        for bad in [json!({"$and": {"a": 1}}), json!({"$or": "x"})] {
            assert!(matches!(
                Filter::parse(&bad),
                Err(StrataError::InvalidQuery(_))
            ));
        }
    }

    // ---- planner inputs ------------------------------------------------

    #[test]
    fn test_top_level_fields_skips_modifiers_and_branches() {
        let filter = parse(json!({
            "author": "Fred",
            "title": "Quarry Memories",
            "$gt": {"age": 2},
            "$and": [{"isbn": 123456}]
        }));
        let mut fields: Vec<&str> = filter.top_level_fields().collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["author", "title"]);
    }

    // ---- properties ----------------------------------------------------

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn scalar_value() -> impl Strategy<Value = Value> {
            prop_oneof![
                any::<i64>().prop_map(|n| json!(n)),
                any::<bool>().prop_map(|b| json!(b)),
                "[a-zA-Z0-9 ]{0,12}".prop_map(|s| json!(s)),
            ]
        }

        fn field_map() -> impl Strategy<Value = Vec<(String, Value)>> {
            proptest::collection::btree_map("[a-z]{1,8}", scalar_value(), 0..6)
                .prop_map(|m| m.into_iter().collect())
        }

        fn document_from(fields: &[(String, Value)]) -> Document {
            let mut doc = Document::new();
            for (name, value) in fields {
                doc.set(name.clone(), value.clone());
            }
            doc
        }

        proptest! {
            #[test]
            fn empty_filter_matches_any_document(fields in field_map()) {
                let doc = document_from(&fields);
                prop_assert!(Filter::empty().matches(&doc));
            }

            #[test]
            fn document_matches_equality_on_its_own_fields(fields in field_map()) {
                let doc = document_from(&fields);
                let raw: Value = doc.to_value();
                let filter = Filter::parse(&raw).unwrap();
                prop_assert!(filter.matches(&doc));
            }

            #[test]
            fn and_of_clauses_agrees_with_flat_node(fields in field_map()) {
                let doc = document_from(&fields);
                // {a: 1, b: 2} must behave exactly like {$and: [{a: 1}, {b: 2}]}
                let flat = Filter::parse(&doc.to_value()).unwrap();
                let branches: Vec<Value> = doc
                    .iter()
                    .map(|(k, v)| json!({ k.clone(): v.clone() }))
                    .collect();
                let nested = Filter::parse(&json!({"$and": branches})).unwrap();
                prop_assert_eq!(flat.matches(&doc), nested.matches(&doc));
            }
        }
    }
}
