use crate::crawler::title_case;
use std::collections::BTreeMap;

/// Local city spellings mapped to the English names used in filters.
const DEFAULT_ALIASES: [(&str, &str); 3] = [
    ("Göteborg", "Gothenburg"),
    ("København", "Copenhagen"),
    ("Warszawa", "Warsaw"),
];

/// Bilingual lookup applied to location names before they are stored.
#[derive(Debug, Clone)]
pub struct CityTranslator {
    aliases: BTreeMap<String, String>,
}

impl Default for CityTranslator {
    fn default() -> Self {
        Self::with_aliases(&BTreeMap::new())
    }
}

impl CityTranslator {
    /// Built-in table with `extra` entries added on top (and winning on clashes).
    pub fn with_aliases(extra: &BTreeMap<String, String>) -> Self {
        let mut aliases: BTreeMap<String, String> = DEFAULT_ALIASES
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        aliases.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { aliases }
    }

    /// If any known spelling occurs inside `name`, the whole name becomes its
    /// translation ("Göteborg, Sweden" -> "Gothenburg").
    pub fn translate(&self, name: &str) -> String {
        let name = name.trim();
        self.aliases
            .iter()
            .find(|(from, _)| name.contains(from.as_str()))
            .map(|(_, to)| to.clone())
            .unwrap_or_else(|| name.to_string())
    }

    /// Brings a user-supplied name into the stored form: title-cased like the
    /// crawled meta text, then translated.
    pub fn normalize(&self, name: &str) -> String {
        self.translate(&title_case(name.trim()))
    }
}
