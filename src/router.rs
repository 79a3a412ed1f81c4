//! Keyword routing of queries to one of the two datasets.

use std::fmt;

use serde::Serialize;

/// The two fixed datasets a query can be answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// Meeting notes about startups, founders and fundraising.
    Meeting,
    /// Records describing domains people are looking for or interested in.
    Domain,
}

impl Dataset {
    pub const ALL: [Dataset; 2] = [Dataset::Meeting, Dataset::Domain];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Meeting => "meeting",
            Dataset::Domain => "domain",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered routing rules. The first rule with a keyword contained in the
/// lower-cased query wins, so meeting keywords take priority over domain
/// keywords when a query mentions both.
pub const ROUTING_RULES: &[(&[&str], Dataset)] = &[
    (&["startup", "founder", "raised"], Dataset::Meeting),
    (&["looking for", "interest", "domain"], Dataset::Domain),
];

/// Dataset used when no rule matches.
pub const FALLBACK_DATASET: Dataset = Dataset::Meeting;

/// Pick the dataset for a raw query string.
///
/// Only lower-casing is applied before plain substring matching; there is
/// no tokenization, so "interesting" matches "interest".
pub fn route(query: &str) -> Dataset {
    let q = query.to_lowercase();
    ROUTING_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| q.contains(kw)))
        .map(|(_, dataset)| *dataset)
        .unwrap_or(FALLBACK_DATASET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_keywords_route_to_meeting() {
        assert_eq!(route("Which startups raised funding?"), Dataset::Meeting);
        assert_eq!(route("who is the FOUNDER of acme"), Dataset::Meeting);
        assert_eq!(route("how much was raised"), Dataset::Meeting);
    }

    #[test]
    fn test_domain_keywords_route_to_domain() {
        assert_eq!(route("Looking for AI domain experts"), Dataset::Domain);
        assert_eq!(route("areas of interest"), Dataset::Domain);
        assert_eq!(route("which DOMAIN fits"), Dataset::Domain);
    }

    #[test]
    fn test_meeting_keywords_win_over_domain_keywords() {
        assert_eq!(route("domain interest of the founder"), Dataset::Meeting);
        assert_eq!(route("looking for a startup"), Dataset::Meeting);
    }

    #[test]
    fn test_no_keyword_falls_back_to_meeting() {
        assert_eq!(route("climate tech in Berlin"), Dataset::Meeting);
        assert_eq!(route(""), Dataset::Meeting);
    }

    #[test]
    fn test_substring_match_without_tokenization() {
        assert_eq!(route("interesting fintech"), Dataset::Domain);
        assert_eq!(route("cofounders"), Dataset::Meeting);
    }

    #[test]
    fn test_punctuation_is_not_stripped() {
        // "looking-for" does not contain "looking for"
        assert_eq!(route("looking-for robotics"), Dataset::Meeting);
        assert_eq!(route("looking  for robotics"), Dataset::Meeting);
    }

    #[test]
    fn test_dataset_display() {
        assert_eq!(Dataset::Meeting.to_string(), "meeting");
        assert_eq!(Dataset::Domain.to_string(), "domain");
        assert_eq!(serde_json::to_string(&Dataset::Domain).unwrap(), "\"domain\"");
    }
}
