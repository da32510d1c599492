use crate::store::{CompanyRow, Offer};

/// Keeps offers whose title or department contains one of the keywords.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<String>,
    case_sensitive: bool,
}

impl KeywordFilter {
    pub fn new(keywords: &[String], case_sensitive: bool) -> Self {
        let keywords = keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| if case_sensitive { k.clone() } else { k.to_lowercase() })
            .collect();
        Self { keywords, case_sensitive }
    }

    pub fn matches(&self, offer: &Offer) -> bool {
        self.contains(&offer.title) || offer.department.as_deref().is_some_and(|d| self.contains(d))
    }

    fn contains(&self, field: &str) -> bool {
        if self.case_sensitive {
            self.keywords.iter().any(|k| field.contains(k.as_str()))
        } else {
            let field = field.to_lowercase();
            self.keywords.iter().any(|k| field.contains(k.as_str()))
        }
    }

    /// No keywords means no filtering.
    pub fn apply(&self, offers: Vec<Offer>) -> Vec<Offer> {
        if self.keywords.is_empty() {
            return offers;
        }
        offers.into_iter().filter(|offer| self.matches(offer)).collect()
    }
}

/// Companies of interest for a crawl. Names compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CompanySelection {
    names: Vec<String>,
}

impl CompanySelection {
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.iter().map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty()).collect(),
        }
    }

    pub fn includes(&self, company: &CompanyRow) -> bool {
        self.names.is_empty() || self.names.contains(&company.name.to_lowercase())
    }
}
