//! Keyword detection of the business aspects an item talks about.

use std::sync::LazyLock;

use regex::Regex;

/// Keywords per aspect, lowercase. Multi-word keywords match as phrases.
const ASPECT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "product_quality",
        &["quality", "product", "durability", "performance", "defective", "broke"],
    ),
    (
        "customer_service",
        &["service", "support", "representative", "agent", "customer service", "helpdesk"],
    ),
    (
        "price_value",
        &["price", "cost", "value", "expensive", "cheap", "affordable", "worth", "overpriced"],
    ),
    (
        "user_experience",
        &["experience", "user", "interface", "usability", "easy to use", "difficult", "confusing"],
    ),
    (
        "reliability",
        &["reliable", "reliability", "consistent", "dependable", "trust", "trustworthy", "outage"],
    ),
    ("delivery", &["delivery", "shipping", "arrive", "arrived", "package", "shipment"]),
    ("website_app", &["website", "app", "application", "site", "online", "mobile"]),
    ("staff", &["employee", "staff", "worker", "manager", "team"]),
    ("location", &["location", "store", "branch", "office"]),
    ("policies", &["policy", "policies", "terms", "conditions", "rules", "return", "refund"]),
];

static ASPECT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ASPECT_KEYWORDS
        .iter()
        .map(|(aspect, keywords)| {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?i)\b(?:{alternation})s?\b");
            (*aspect, Regex::new(&pattern).expect("valid aspect keyword regex"))
        })
        .collect()
});

/// Aspects mentioned in `text`, in the fixed order of [`crate::BUSINESS_ASPECTS`].
#[must_use]
pub fn extract_aspects(text: &str) -> Vec<&'static str> {
    ASPECT_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(aspect, _)| *aspect)
        .collect()
}

/// Keywords for one aspect, or an empty slice for an unknown tag.
#[must_use]
pub fn aspect_keywords(aspect: &str) -> &'static [&'static str] {
    ASPECT_KEYWORDS
        .iter()
        .find(|(name, _)| *name == aspect)
        .map_or(&[], |(_, keywords)| keywords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BUSINESS_ASPECTS;

    #[test]
    fn aspect_tags_match_core_list() {
        let tags: Vec<&str> = ASPECT_KEYWORDS.iter().map(|(a, _)| *a).collect();
        assert_eq!(tags, BUSINESS_ASPECTS.to_vec());
    }

    #[test]
    fn detects_service_and_delivery() {
        let aspects = extract_aspects("Support never answered and the package arrived broken");
        assert_eq!(aspects, vec!["customer_service", "delivery"]);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        // "happy" must not trigger website_app through "app"
        assert!(extract_aspects("I am happy").is_empty());
    }

    #[test]
    fn phrases_and_plurals_match() {
        assert!(extract_aspects("It is EASY TO USE").contains(&"user_experience"));
        assert!(extract_aspects("Their refunds take weeks").contains(&"policies"));
    }

    #[test]
    fn unknown_aspect_has_no_keywords() {
        assert!(aspect_keywords("weather").is_empty());
        assert!(aspect_keywords("staff").contains(&"manager"));
    }
}
