//! Declarative list filters.
//!
//! A `FilterSet` holds named predicates. A record passes when it passes every
//! active predicate. A predicate whose value is empty or one of the "all"
//! sentinels is neutral and always passes. Text comparisons are
//! case-insensitive; a record missing the inspected field never matches an
//! active predicate.

use crate::error::UnknownFilter;

/// Reads one text field off a record.
pub type Field<T> = fn(&T) -> Option<&str>;

const NEUTRAL_VALUES: [&str; 3] = ["all", "todos", "todas"];

pub fn is_neutral(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || NEUTRAL_VALUES.iter().any(|n| value.eq_ignore_ascii_case(n))
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

pub fn equals_ci(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub enum Rule<T> {
    /// Substring match against any of the fields (OR across fields).
    Search(Vec<Field<T>>),
    /// Whole-value equality.
    Equals(Field<T>),
    /// Substring match against one field.
    Contains(Field<T>),
    /// Anything the stock rules cannot express. Receives the active value.
    Custom(fn(&T, &str) -> bool),
}

impl<T> Clone for Rule<T> {
    fn clone(&self) -> Self {
        match self {
            Rule::Search(fields) => Rule::Search(fields.clone()),
            Rule::Equals(field) => Rule::Equals(*field),
            Rule::Contains(field) => Rule::Contains(*field),
            Rule::Custom(f) => Rule::Custom(*f),
        }
    }
}

impl<T> Rule<T> {
    fn matches(&self, item: &T, value: &str) -> bool {
        match self {
            Rule::Search(fields) => fields
                .iter()
                .any(|field| field(item).is_some_and(|text| contains_ci(text, value))),
            Rule::Equals(field) => field(item).is_some_and(|text| equals_ci(text, value)),
            Rule::Contains(field) => field(item).is_some_and(|text| contains_ci(text, value)),
            Rule::Custom(f) => f(item, value),
        }
    }
}

struct Predicate<T> {
    key: &'static str,
    rule: Rule<T>,
    value: String,
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            rule: self.rule.clone(),
            value: self.value.clone(),
        }
    }
}

pub struct FilterSet<T> {
    predicates: Vec<Predicate<T>>,
}

impl<T> Clone for FilterSet<T> {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
        }
    }
}

impl<T> Default for FilterSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FilterSet<T> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Register a predicate, neutral until set.
    pub fn with(mut self, key: &'static str, rule: Rule<T>) -> Self {
        self.predicates.push(Predicate {
            key,
            rule,
            value: String::new(),
        });
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.predicates.iter().map(|p| p.key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), UnknownFilter> {
        let predicate = self
            .predicates
            .iter_mut()
            .find(|p| p.key == key)
            .ok_or_else(|| UnknownFilter(key.to_string()))?;
        predicate.value = value.into();
        Ok(())
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.predicates
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Reset every predicate to neutral.
    pub fn clear(&mut self) {
        for predicate in &mut self.predicates {
            predicate.value.clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.predicates.iter().any(|p| !is_neutral(&p.value))
    }

    pub fn matches(&self, item: &T) -> bool {
        self.predicates
            .iter()
            .filter(|p| !is_neutral(&p.value))
            .all(|p| p.rule.matches(item, &p.value))
    }

    pub fn apply<'a>(&self, items: &'a [T]) -> Vec<&'a T> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        title: &'static str,
        company: Option<&'static str>,
        city: Option<&'static str>,
        kind: &'static str,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { title: "Backend Rust", company: Some("Ferris SA"), city: Some("Guadalajara"), kind: "Tiempo Completo" },
            Row { title: "Frontend React", company: Some("Web MX"), city: Some("Ciudad de México"), kind: "Medio Tiempo" },
            Row { title: "QA Tester", company: None, city: None, kind: "Freelance" },
            Row { title: "Data Engineer", company: Some("Rustaceans"), city: Some("Monterrey"), kind: "Tiempo Completo" },
        ]
    }

    fn title(r: &Row) -> Option<&str> {
        Some(r.title)
    }

    fn company(r: &Row) -> Option<&str> {
        r.company
    }

    fn city(r: &Row) -> Option<&str> {
        r.city
    }

    fn kind(r: &Row) -> Option<&str> {
        Some(r.kind)
    }

    fn filters() -> FilterSet<Row> {
        FilterSet::new()
            .with("search", Rule::Search(vec![title as Field<Row>, company]))
            .with("city", Rule::Contains(city))
            .with("kind", Rule::Equals(kind))
    }

    fn titles(rows: Vec<&Row>) -> Vec<&'static str> {
        rows.into_iter().map(|r| r.title).collect()
    }

    #[test]
    fn test_neutral_sentinels() {
        for value in ["", "  ", "all", "Todos", "TODAS"] {
            assert!(is_neutral(value), "{value:?} should be neutral");
        }
        assert!(!is_neutral("Remoto"));
    }

    #[test]
    fn test_no_active_filters_is_identity() {
        let data = rows();
        assert_eq!(filters().apply(&data).len(), data.len());
    }

    #[test]
    fn test_search_is_or_across_fields() {
        let data = rows();
        let mut f = filters();
        f.set("search", "RUST").unwrap();
        assert_eq!(titles(f.apply(&data)), vec!["Backend Rust", "Data Engineer"]);
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let data = rows();
        let mut f = filters();
        f.set("search", "rust").unwrap();
        f.set("kind", "tiempo completo").unwrap();
        f.set("city", "monterrey").unwrap();
        assert_eq!(titles(f.apply(&data)), vec!["Data Engineer"]);
    }

    #[test]
    fn test_missing_fields_never_match_active_filter() {
        let data = rows();
        let mut f = filters();
        f.set("city", "a").unwrap();
        assert!(!titles(f.apply(&data)).contains(&"QA Tester"));

        f.set("city", "Todas").unwrap();
        assert!(titles(f.apply(&data)).contains(&"QA Tester"));
    }

    #[test]
    fn test_clear_restores_identity() {
        let data = rows();
        let mut f = filters();
        f.set("search", "nothing matches this").unwrap();
        f.set("kind", "Freelance").unwrap();
        assert!(f.apply(&data).is_empty());

        f.clear();
        assert!(!f.is_active());
        assert_eq!(f.apply(&data).len(), data.len());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut f = filters();
        assert_eq!(f.set("salary", "10"), Err(UnknownFilter("salary".into())));
        assert_eq!(f.value("salary"), None);
    }

    #[test]
    fn test_results_are_subset_satisfying_every_predicate() {
        let data = rows();
        let values = ["", "a", "rust", "tiempo", "Todos", "mx"];
        for search in values {
            for city in values {
                for kind in ["", "Freelance", "Tiempo Completo"] {
                    let mut f = filters();
                    f.set("search", search).unwrap();
                    f.set("city", city).unwrap();
                    f.set("kind", kind).unwrap();
                    let kept = f.apply(&data);
                    for row in &data {
                        let expected = (is_neutral(search)
                            || contains_ci(row.title, search)
                            || row.company.is_some_and(|c| contains_ci(c, search)))
                            && (is_neutral(city) || row.city.is_some_and(|c| contains_ci(c, city)))
                            && (is_neutral(kind) || equals_ci(row.kind, kind));
                        let got = kept.iter().any(|k| std::ptr::eq(*k, row));
                        assert_eq!(got, expected, "search={search:?} city={city:?} kind={kind:?}");
                    }
                }
            }
        }
    }
}
