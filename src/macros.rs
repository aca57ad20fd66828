use std::collections::HashMap;

/// Object-like macros registered through `#define`, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroTable {
    macros: HashMap<String, String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `name`, returning the replaced value if it was already defined.
    pub fn define(&mut self, name: &str, value: &str) -> Option<String> {
        self.macros.insert(name.to_string(), value.to_string())
    }

    pub fn undefine(&mut self, name: &str) -> Option<String> {
        self.macros.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Copies every macro of `other` into this table, overwriting duplicates.
    pub fn merge(&mut self, other: &MacroTable) {
        for (name, value) in &other.macros {
            self.macros.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.macros.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MacroTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            macros: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefinition_overwrites() {
        let mut table = MacroTable::new();
        assert_eq!(table.define("A", "1"), None);
        assert_eq!(table.define("A", "2"), Some("1".to_string()));
        assert_eq!(table.get("A"), Some("2"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn merge_overwrites_duplicates() {
        let mut table: MacroTable = [("A", "1"), ("B", "2")].into_iter().collect();
        let other: MacroTable = [("B", "3"), ("C", "4")].into_iter().collect();
        table.merge(&other);
        assert_eq!(table.get("B"), Some("3"));
        assert_eq!(table.len(), 3);
    }
}
