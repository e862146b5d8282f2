//! Bias extraction and "Bull vs Dying" mood.
//!
//! Agents end their notes with a `Bias: Long | Short | Neutral` line. Posts
//! without a marker carry no signal and are left out of every total.

use serde::Serialize;

use super::types::Post;

/// Directional bias declared in a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bias {
    Long,
    Short,
    Neutral,
}

impl Bias {
    /// Markers in priority order
    const MARKERS: [(&'static str, Bias); 3] = [
        ("bias: long", Bias::Long),
        ("bias: short", Bias::Short),
        ("bias: neutral", Bias::Neutral),
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Bias::Long => "Long",
            Bias::Short => "Short",
            Bias::Neutral => "Neutral",
        }
    }
}

/// Extract the bias marker from a post body, first marker in priority order wins
pub fn extract_bias(text: &str) -> Option<Bias> {
    if text.is_empty() {
        return None;
    }
    let lower = text.to_lowercase();
    Bias::MARKERS
        .iter()
        .find(|(marker, _)| lower.contains(marker))
        .map(|(_, bias)| *bias)
}

/// Per-label counts over a post batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub long: usize,
    pub short: usize,
    pub neutral: usize,
    /// Posts carrying any marker
    pub total: usize,
}

impl SentimentCounts {
    pub fn from_posts<'a>(posts: impl IntoIterator<Item = &'a Post>) -> Self {
        posts
            .into_iter()
            .filter_map(|post| extract_bias(&post.text))
            .fold(Self::default(), |mut counts, bias| {
                counts.record(bias);
                counts
            })
    }

    pub fn record(&mut self, bias: Bias) {
        match bias {
            Bias::Long => self.long += 1,
            Bias::Short => self.short += 1,
            Bias::Neutral => self.neutral += 1,
        }
        self.total += 1;
    }
}

/// Rounded mood percentages
///
/// `bull_pct` and `dying_pct` are rounded independently; `neutral_pct`
/// absorbs the remainder and never goes negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Mood {
    pub bull_pct: u32,
    pub dying_pct: u32,
    pub neutral_pct: u32,
}

impl Mood {
    pub fn from_counts(counts: &SentimentCounts) -> Self {
        if counts.total == 0 {
            return Self::default();
        }
        let pct = |count: usize| ((count as f64 / counts.total as f64) * 100.0).round() as u32;
        let bull_pct = pct(counts.long);
        let dying_pct = pct(counts.short);
        Self {
            bull_pct,
            dying_pct,
            neutral_pct: 100u32.saturating_sub(bull_pct + dying_pct),
        }
    }
}
