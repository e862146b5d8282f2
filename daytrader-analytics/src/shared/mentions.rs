//! Keyword mention tally across forum posts and research titles.

use itertools::Itertools;
use regex::Regex;
use serde::Serialize;

use super::keywords::KeywordTopic;
use super::types::{Post, ResearchItem};

/// Number of whole-word mentions of one topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MentionTally {
    pub label: &'static str,
    pub count: usize,
}

/// Tally every topic of `index` over all post texts and research titles.
///
/// Sorted descending by count; ties keep the index's declared order.
pub fn tally_mentions(
    index: &[KeywordTopic],
    posts: &[Post],
    research: &[ResearchItem],
) -> Vec<MentionTally> {
    let corpus = posts
        .iter()
        .map(|post| post.text.as_str())
        .chain(research.iter().map(|item| item.title.as_str()))
        .join(" ")
        .to_lowercase();

    let mut tallies: Vec<MentionTally> = index
        .iter()
        .map(|topic| MentionTally {
            label: topic.label,
            count: topic
                .terms
                .iter()
                .filter_map(|term| whole_word_regex(&term.to_lowercase()))
                .map(|regex| regex.find_iter(&corpus).count())
                .sum(),
        })
        .collect();

    // Vec::sort_by is stable
    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    tallies
}

/// Count non-overlapping occurrences of `term` bounded by non-word characters.
///
/// Word characters are ASCII alphanumerics and `_`, so "oil" does not match
/// inside "foil" or "oil_price".
pub fn count_whole_word(haystack: &str, term: &str) -> usize {
    whole_word_regex(term)
        .map(|regex| regex.find_iter(haystack).count())
        .unwrap_or(0)
}

/// Literal `term` between ASCII word boundaries, `None` for an empty term
fn whole_word_regex(term: &str) -> Option<Regex> {
    if term.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?-u:\b){}(?-u:\b)", regex::escape(term))).ok()
}
