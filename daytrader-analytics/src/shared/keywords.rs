//! Keyword index for the "Hot Mentions" tally.

/// A named topic and the lowercase terms that count as a mention of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordTopic {
    pub label: &'static str,
    pub terms: &'static [&'static str],
}

/// Default topics, in display tie-break order
pub const DEFAULT_KEYWORDS: &[KeywordTopic] = &[
    KeywordTopic {
        label: "Gold",
        terms: &["gold", "xau"],
    },
    KeywordTopic {
        label: "Silver",
        terms: &["silver", "xag"],
    },
    KeywordTopic {
        label: "Oil",
        terms: &["oil", "wti", "brent", "crude"],
    },
    KeywordTopic {
        label: "Cobalt",
        terms: &["cobalt"],
    },
    KeywordTopic {
        label: "BTC",
        terms: &["btc", "bitcoin"],
    },
    KeywordTopic {
        label: "NVDA",
        terms: &["nvda", "nvidia"],
    },
];
