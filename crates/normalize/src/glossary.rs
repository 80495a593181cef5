use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex must compile"));

/// Lookup key for an alias: trimmed, inner whitespace collapsed, lowercased.
pub fn canonical_key(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").to_lowercase()
}

/// Alias table that remembers insertion order.
///
/// Alias scans over free text walk entries in this order, so the first configured alias
/// that occurs wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: Vec<(String, String)>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced alias keeps its position.
    pub fn insert(&mut self, alias: &str, canonical: impl Into<String>) {
        let key = canonical_key(alias);
        let canonical = canonical.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = canonical,
            None => self.entries.push((key, canonical)),
        }
    }

    pub fn get(&self, value: &str) -> Option<&str> {
        let key = canonical_key(value);
        self.entries
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, canonical)| canonical.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(alias, canonical)| (alias.as_str(), canonical.as_str()))
    }

    /// Entries sorted by alias
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self.iter().collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn merged(&self, overrides: &AliasMap) -> AliasMap {
        let mut merged = self.clone();
        for (alias, canonical) in &overrides.entries {
            merged.insert(alias, canonical.clone());
        }
        merged
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for AliasMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AliasMap::new();
        for (alias, canonical) in iter {
            map.insert(alias.as_ref(), canonical);
        }
        map
    }
}

/// Case-insensitive alias tables mapping colloquial names onto canonical identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermGlossary {
    pub service_aliases: AliasMap,
    pub table_aliases: AliasMap,
    pub column_aliases: AliasMap,
}

impl TermGlossary {
    pub fn new(service_aliases: AliasMap, table_aliases: AliasMap, column_aliases: AliasMap) -> Self {
        Self {
            service_aliases,
            table_aliases,
            column_aliases,
        }
    }

    pub fn from_maps(
        service_aliases: &BTreeMap<String, String>,
        table_aliases: &BTreeMap<String, String>,
        column_aliases: &BTreeMap<String, String>,
    ) -> Self {
        Self {
            service_aliases: service_aliases.iter().map(|(k, v)| (k, v.clone())).collect(),
            table_aliases: table_aliases.iter().map(|(k, v)| (k, v.clone())).collect(),
            column_aliases: column_aliases.iter().map(|(k, v)| (k, v.clone())).collect(),
        }
    }

    /// Aliases shipped with the normalizer.
    pub fn builtin() -> Self {
        Self {
            service_aliases: [("billing svc", "BillingService"), ("order api", "OrderAPI")]
                .into_iter()
                .collect(),
            table_aliases: [
                ("ledger", "billing_ledger"),
                ("session store", "session_store"),
                ("audit trail", "audit_log"),
            ]
            .into_iter()
            .collect(),
            column_aliases: [
                ("checkout total", "checkout_total"),
                ("status flag", "status_flag"),
            ]
            .into_iter()
            .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.service_aliases.is_empty()
            && self.table_aliases.is_empty()
            && self.column_aliases.is_empty()
    }

    pub fn canonical_service(&self, value: &str) -> String {
        lookup(&self.service_aliases, value)
    }

    pub fn canonical_table(&self, value: &str) -> String {
        lookup(&self.table_aliases, value)
    }

    pub fn canonical_column(&self, value: &str) -> String {
        lookup(&self.column_aliases, value)
    }

    /// New glossary where `overrides` win per alias. Neither input is touched.
    pub fn merge(&self, overrides: Option<&TermGlossary>) -> TermGlossary {
        match overrides {
            None => self.clone(),
            Some(other) => TermGlossary {
                service_aliases: self.service_aliases.merged(&other.service_aliases),
                table_aliases: self.table_aliases.merged(&other.table_aliases),
                column_aliases: self.column_aliases.merged(&other.column_aliases),
            },
        }
    }
}

fn lookup(map: &AliasMap, value: &str) -> String {
    map.get(value).unwrap_or(value).to_string()
}
