//! Ordered model catalog. Order is significant: the first entry is the default.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: Vec<String>,
}

impl ModelCatalog {
    /// Build a catalog, trimming entries and dropping blanks and duplicates
    /// while keeping first-seen order.
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for model in models {
            let model = model.into().trim().to_string();
            if !model.is_empty() && !out.contains(&model) {
                out.push(model);
            }
        }
        Self { models: out }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    /// `model` when it belongs to the catalog, otherwise the catalog default.
    pub fn resolve<'a>(&'a self, model: Option<&'a str>) -> Option<&'a str> {
        match model {
            Some(m) if self.contains(m) => Some(m),
            _ => self.default_model(),
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_drops_blanks_and_duplicates() {
        let catalog = ModelCatalog::new([" a ", "", "b", "a"]);
        assert_eq!(catalog.models(), &["a".to_string(), "b".to_string()]);
        assert_eq!(catalog.default_model(), Some("a"));
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let catalog = ModelCatalog::new(["a", "b"]);
        assert_eq!(catalog.resolve(Some("b")), Some("b"));
        assert_eq!(catalog.resolve(Some("retired")), Some("a"));
        assert_eq!(catalog.resolve(None), Some("a"));
    }

    #[test]
    fn empty_catalog_has_no_default() {
        let catalog = ModelCatalog::new(Vec::<String>::new());
        assert!(catalog.is_empty());
        assert_eq!(catalog.resolve(Some("x")), None);
    }
}
