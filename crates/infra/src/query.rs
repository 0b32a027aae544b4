//! Collection queries for return authorizations.
//!
//! `QueryTranslator` turns ransack-style request parameters
//! (`q[reason_cont]=damage`, `page`, `per_page`) into a [`StoreQuery`].
//! Unknown filter fields or operators are rejected, never ignored.

use serde::{Deserialize, Serialize};

use rma_core::{DomainError, DomainResult};
use rma_returns::{ReturnAuthorization, ReturnAuthorizationState};

/// Filterable attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Reason,
    Number,
    State,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "reason" => Some(Field::Reason),
            "number" => Some(Field::Number),
            "state" => Some(Field::State),
            _ => None,
        }
    }

    fn value_of<'a>(self, ra: &'a ReturnAuthorization) -> &'a str {
        match self {
            Field::Reason => ra.reason(),
            Field::Number => ra.number(),
            Field::State => ra.state().as_str(),
        }
    }
}

/// Comparison against the stored value; case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Contains(String),
    Equals(String),
    StartsWith(String),
}

impl Predicate {
    /// Operator suffixes as they appear in `q[<field>_<op>]`.
    const OPERATORS: [&'static str; 3] = ["cont", "eq", "start"];

    fn build(op: &str, value: String) -> Option<Self> {
        match op {
            "cont" => Some(Predicate::Contains(value)),
            "eq" => Some(Predicate::Equals(value)),
            "start" => Some(Predicate::StartsWith(value)),
            _ => None,
        }
    }

    fn value(&self) -> &str {
        match self {
            Predicate::Contains(v) | Predicate::Equals(v) | Predicate::StartsWith(v) => v,
        }
    }

    fn test(&self, candidate: &str) -> bool {
        match self {
            Predicate::Contains(v) => candidate.contains(v.as_str()),
            Predicate::Equals(v) => candidate == v,
            Predicate::StartsWith(v) => candidate.starts_with(v.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: Field,
    pub predicate: Predicate,
}

impl Filter {
    pub fn matches(&self, ra: &ReturnAuthorization) -> bool {
        self.predicate.test(self.field.value_of(ra))
    }
}

/// Store-level query: all filters must match; pages are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreQuery {
    pub filters: Vec<Filter>,
    pub page: u32,
    pub per_page: u32,
}

impl StoreQuery {
    pub fn matches(&self, ra: &ReturnAuthorization) -> bool {
        self.filters.iter().all(|f| f.matches(ra))
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.per_page as usize)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matches across all pages.
    pub total_count: u64,
    pub current_page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    /// Items on this page.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// `ceil(total_count / per_page)`.
    pub fn pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.per_page))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            current_page: self.current_page,
            per_page: self.per_page,
        }
    }
}

/// Page size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_per_page: 25,
            max_per_page: 100,
        }
    }
}

/// Translates raw request parameters into a [`StoreQuery`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryTranslator {
    limits: PageLimits,
}

impl QueryTranslator {
    pub fn new(limits: PageLimits) -> Self {
        Self { limits }
    }

    /// Parameters other than `page`, `per_page` and `q[...]` are ignored;
    /// blank filter values are skipped.
    pub fn translate<K, V>(&self, params: &[(K, V)]) -> DomainResult<StoreQuery>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut page = 1u32;
        let mut per_page = self.limits.default_per_page;
        let mut filters = Vec::new();

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "page" => page = parse_positive("page", value)?,
                "per_page" => {
                    per_page = parse_positive("per_page", value)?.min(self.limits.max_per_page)
                }
                _ => {
                    let Some(expr) = key.strip_prefix("q[").and_then(|k| k.strip_suffix(']')) else {
                        continue;
                    };
                    if value.trim().is_empty() {
                        continue;
                    }
                    filters.push(parse_filter(expr, value)?);
                }
            }
        }

        Ok(StoreQuery {
            filters,
            page,
            per_page: per_page.max(1),
        })
    }
}

fn parse_positive(name: &str, raw: &str) -> DomainResult<u32> {
    let n: u32 = raw
        .trim()
        .parse()
        .map_err(|_| DomainError::validation(format!("{name} must be a positive integer")))?;
    if n == 0 {
        return Err(DomainError::validation(format!("{name} must be at least 1")));
    }
    Ok(n)
}

fn parse_filter(expr: &str, value: &str) -> DomainResult<Filter> {
    let (field_name, op) = Predicate::OPERATORS
        .iter()
        .find_map(|op| {
            expr.strip_suffix(op)
                .and_then(|rest| rest.strip_suffix('_'))
                .map(|field| (field, *op))
        })
        .ok_or_else(|| DomainError::validation(format!("unsupported filter operator in '{expr}'")))?;

    let field = Field::parse(field_name)
        .ok_or_else(|| DomainError::validation(format!("unknown filter field '{field_name}'")))?;

    let predicate = Predicate::build(op, value.to_string())
        .ok_or_else(|| DomainError::validation(format!("unsupported filter operator '{op}'")))?;

    if field == Field::State {
        if !matches!(predicate, Predicate::Equals(_)) {
            return Err(DomainError::validation("state only supports the 'eq' operator"));
        }
        predicate.value().parse::<ReturnAuthorizationState>()?;
    }

    Ok(Filter { field, predicate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn translate(pairs: &[(&str, &str)]) -> DomainResult<StoreQuery> {
        QueryTranslator::default().translate(pairs)
    }

    #[test]
    fn defaults_apply_without_params() {
        let q = translate(&[]).unwrap();
        assert_eq!(q, StoreQuery { filters: vec![], page: 1, per_page: 25 });
    }

    #[test]
    fn reason_cont_becomes_contains_filter() {
        let q = translate(&[("q[reason_cont]", "damage"), ("per_page", "1"), ("page", "2")]).unwrap();
        assert_eq!(
            q.filters,
            vec![Filter {
                field: Field::Reason,
                predicate: Predicate::Contains("damage".to_string()),
            }]
        );
        assert_eq!((q.page, q.per_page), (2, 1));
        assert_eq!(q.offset(), 1);
    }

    #[test]
    fn per_page_is_capped() {
        let q = translate(&[("per_page", "5000")]).unwrap();
        assert_eq!(q.per_page, 100);
    }

    #[test]
    fn malformed_pagination_is_invalid_input() {
        for pairs in [[("page", "0")], [("page", "abc")], [("per_page", "-1")]] {
            assert!(matches!(translate(&pairs), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn unknown_fields_and_operators_are_rejected() {
        assert!(matches!(
            translate(&[("q[colour_cont]", "red")]),
            Err(DomainError::Validation(msg)) if msg.contains("unknown filter field")
        ));
        assert!(matches!(
            translate(&[("q[reason_matches]", "x")]),
            Err(DomainError::Validation(msg)) if msg.contains("operator")
        ));
        assert!(translate(&[("q[state_eq]", "pending")]).is_err());
        assert!(translate(&[("q[state_cont]", "auth")]).is_err());
    }

    #[test]
    fn blank_filters_and_foreign_params_are_skipped() {
        let q = translate(&[("q[reason_cont]", " "), ("_", "12345")]).unwrap();
        assert!(q.filters.is_empty());
    }

    #[test]
    fn state_eq_and_number_start_are_supported() {
        let q = translate(&[("q[state_eq]", "received"), ("q[number_start]", "RA0")]).unwrap();
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[0].field, Field::State);
        assert_eq!(q.filters[1].predicate, Predicate::StartsWith("RA0".to_string()));
    }

    proptest! {
        /// Property: pages * per_page covers total, and one page fewer does not.
        #[test]
        fn pages_is_ceiling_division(total in 0u64..10_000, per_page in 1u32..200) {
            let page: Page<()> = Page { items: vec![], total_count: total, current_page: 1, per_page };
            let pages = page.pages();
            prop_assert!(pages * u64::from(per_page) >= total);
            if total > 0 {
                prop_assert!((pages - 1) * u64::from(per_page) < total);
            } else {
                prop_assert_eq!(pages, 0);
            }
        }
    }
}
