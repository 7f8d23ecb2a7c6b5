use std::fmt;

use serde::Serialize;

/// Which aspect of a product a question is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Benefits,
    Requirements,
    Fees,
    Features,
    General,
}

impl QueryIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryIntent::Benefits => "benefits",
            QueryIntent::Requirements => "requirements",
            QueryIntent::Fees => "fees",
            QueryIntent::Features => "features",
            QueryIntent::General => "general",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Checked in order; the first group with a hit wins.
const INTENT_KEYWORDS: &[(QueryIntent, &[&str])] = &[
    (
        QueryIntent::Benefits,
        &["benefit", "advantage", "ubwino", "why choose", "what do i get"],
    ),
    (
        QueryIntent::Requirements,
        &["requirement", "eligibility", "zofunikira", "qualify", "need to", "criteria"],
    ),
    (
        QueryIntent::Fees,
        &["fee", "cost", "charge", "price", "mtengo", "phindu", "interest rate", "how much"],
    ),
    (
        QueryIntent::Features,
        &["how does", "how to use", "functionality", "works", "feature"],
    ),
];

pub fn detect_intent(query: &str) -> QueryIntent {
    let lower = query.to_lowercase();
    INTENT_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(intent, _)| *intent)
        .unwrap_or(QueryIntent::General)
}

// Longer mentions first so "amayi angathe" wins over "amayi".
const PRODUCT_MENTIONS: &[(&str, &str)] = &[
    ("amayi angathe", "amayi_angathe"),
    ("amayi", "amayi_angathe"),
    ("mlimi", "mlimi"),
    ("farmer", "mlimi"),
    ("agricultural", "mlimi"),
];

/// Knowledge-base key of the product the query mentions, if any.
pub fn extract_product(query: &str) -> Option<&'static str> {
    let lower = query.to_lowercase();
    PRODUCT_MENTIONS
        .iter()
        .find(|(mention, _)| lower.contains(mention))
        .map(|(_, key)| *key)
}
