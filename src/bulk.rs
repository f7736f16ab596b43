use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Actions offered by the bulk bar once rows are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Enable,
    Disable,
    Delete,
}

impl BulkAction {
    pub fn path(self) -> &'static str {
        match self {
            Self::Enable => "bulk_enable",
            Self::Disable => "bulk_disable",
            Self::Delete => "bulk_delete",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Enable => "Enable",
            Self::Disable => "Disable",
            Self::Delete => "Delete",
        }
    }
}

/// `{"<key>": [id, ...]}`
pub fn payload(key: &str, ids: &[String]) -> Value {
    let mut body = Map::new();
    body.insert(key.to_string(), Value::from(ids.to_vec()));
    Value::Object(body)
}

/// Checked row ids on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn set(&mut self, id: &str, checked: bool) {
        if checked {
            self.ids.insert(id.to_string());
        } else {
            self.ids.remove(id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// "Select all" over the given (visible) ids; unchecks them all when
    /// every one is already checked.
    pub fn toggle_all<'a>(&mut self, visible: impl IntoIterator<Item = &'a str>) {
        let visible: Vec<&str> = visible.into_iter().collect();
        let all_checked = !visible.is_empty() && visible.iter().all(|id| self.ids.contains(*id));
        for id in visible {
            self.set(id, !all_checked);
        }
    }

    /// Forget ids that are no longer present after a reload.
    pub fn retain<'a>(&mut self, present: impl IntoIterator<Item = &'a str>) {
        let present: BTreeSet<&str> = present.into_iter().collect();
        self.ids.retain(|id| present.contains(id.as_str()));
    }

    /// The checked ids among `visible`, in `visible` order.
    pub fn checked_in<'a>(&self, visible: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        visible
            .into_iter()
            .filter(|id| self.ids.contains(*id))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_uses_resource_key() {
        let body = payload("extensions", &["2001".into(), "2003".into()]);
        assert_eq!(body, json!({"extensions": ["2001", "2003"]}));
    }

    #[test]
    fn checked_in_follows_visible_order_and_skips_hidden() {
        let mut sel = Selection::default();
        sel.set("2003", true);
        sel.set("2001", true);
        sel.set("2009", true);
        assert_eq!(sel.checked_in(["2001", "2002", "2003"]), vec!["2001", "2003"]);
    }

    #[test]
    fn unchecking_removes() {
        let mut sel = Selection::default();
        sel.set("600", true);
        sel.set("600", false);
        assert!(sel.is_empty());
    }

    #[test]
    fn toggle_all_selects_then_clears() {
        let mut sel = Selection::default();
        sel.set("a", true);
        sel.toggle_all(["a", "b"]);
        assert_eq!(sel.checked_in(["a", "b", "c"]), vec!["a", "b"]);
        sel.toggle_all(["a", "b"]);
        assert!(sel.is_empty());
    }

    #[test]
    fn retain_drops_vanished_rows() {
        let mut sel = Selection::default();
        sel.set("a", true);
        sel.set("b", true);
        sel.retain(["b", "c"]);
        assert!(!sel.contains("a"));
        assert!(sel.contains("b"));
    }
}
