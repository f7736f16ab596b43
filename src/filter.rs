use std::collections::BTreeMap;

use crate::api::resources::Resource;

/// Search box text plus dropdown facets for one page.
///
/// Matching is a pure function of the cached list and these values, so the
/// same inputs always show the same rows in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    query: String,
    facets: BTreeMap<String, String>,
}

/// Dropdown entries that mean "no filter".
const ANY: &[&str] = &["", "all", "any"];

impl Filter {
    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_lowercase();
    }

    /// Sets or clears (`None`, `""`, `"all"`) an equality facet.
    pub fn set_facet(&mut self, name: &str, value: Option<&str>) {
        match value.map(str::trim) {
            Some(v) if !ANY.contains(&v.to_lowercase().as_str()) => {
                self.facets.insert(name.to_string(), v.to_lowercase());
            }
            _ => {
                self.facets.remove(name);
            }
        }
    }

    pub fn facet(&self, name: &str) -> Option<&str> {
        self.facets.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.facets.is_empty()
    }

    pub fn matches<R: Resource>(&self, item: &R) -> bool {
        let text_ok = self.query.is_empty() || item.search_text().to_lowercase().contains(&self.query);
        text_ok
            && self.facets.iter().all(|(name, wanted)| {
                item.facet(name).is_some_and(|v| v.trim().to_lowercase() == *wanted)
            })
    }

    pub fn apply<'a, R: Resource>(&self, items: &'a [R]) -> Vec<&'a R> {
        items.iter().filter(|item| self.matches(*item)).collect()
    }
}

/// Distinct non-empty values of a facet, sorted, for populating a dropdown.
pub fn facet_values<R: Resource>(items: &[R], name: &str) -> Vec<String> {
    let mut values: Vec<String> = items
        .iter()
        .filter_map(|item| item.facet(name))
        .filter(|v| !v.trim().is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Extension;

    fn ext(number: &str, name: &str, department: &str) -> Extension {
        Extension {
            number: number.into(),
            display_name: name.into(),
            department: department.into(),
            ..Default::default()
        }
    }

    fn fixture() -> Vec<Extension> {
        vec![
            ext("2001", "Alice Moreau", "sales"),
            ext("2002", "Bob Tran", "support"),
            ext("2003", "Carla Diaz", "Sales"),
            ext("2004", "Dev Patel", "billing"),
        ]
    }

    #[test]
    fn department_facet_narrows_to_two_of_four() {
        let items = fixture();
        let mut filter = Filter::default();
        filter.set_facet("department", Some("sales"));
        let visible = filter.apply(&items);
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].number, "2001");
        assert_eq!(visible[1].number, "2003");
    }

    #[test]
    fn query_matches_any_text_field_case_insensitively() {
        let items = fixture();
        let mut filter = Filter::default();
        filter.set_query("  TRAN ");
        assert_eq!(filter.apply(&items).len(), 1);
        filter.set_query("200");
        assert_eq!(filter.apply(&items).len(), 4);
    }

    #[test]
    fn query_and_facet_combine() {
        let items = fixture();
        let mut filter = Filter::default();
        filter.set_facet("department", Some("sales"));
        filter.set_query("carla");
        let visible = filter.apply(&items);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].number, "2003");
    }

    #[test]
    fn all_clears_a_facet() {
        let items = fixture();
        let mut filter = Filter::default();
        filter.set_facet("department", Some("billing"));
        filter.set_facet("department", Some("All"));
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&items).len(), items.len());
    }

    #[test]
    fn same_inputs_same_rows() {
        let items = fixture();
        let mut filter = Filter::default();
        filter.set_query("a");
        let first: Vec<&str> = filter.apply(&items).iter().map(|e| e.number.as_str()).collect();
        let second: Vec<&str> = filter.apply(&items).iter().map(|e| e.number.as_str()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn facet_values_are_distinct() {
        let items = fixture();
        assert_eq!(facet_values(&items, "department"), vec!["Sales", "billing", "sales", "support"]);
    }
}
