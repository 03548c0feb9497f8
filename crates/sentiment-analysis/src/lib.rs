//! Lexicon-based polarity scoring for news text.
//!
//! Polarity is the mean weight of every lexicon hit in the text, in `[-1.0, 1.0]`.
//! A hit preceded by an intensifier within one token is scaled up; a hit with a
//! negation within [`NEGATION_WINDOW`] tokens before it is flipped and damped.

use forecast_core::{NewsArticle, SentimentLabel};
use std::collections::HashMap;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;
const NEGATION_FACTOR: f64 = -0.5;

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("really", 1.2),
    ("sharply", 1.4),
    ("significantly", 1.3),
    ("strongly", 1.3),
    ("slightly", 0.6),
    ("somewhat", 0.7),
];

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("good", 0.7), ("great", 0.8), ("excellent", 1.0), ("best", 1.0), ("better", 0.5),
    ("positive", 0.23), ("strong", 0.43), ("stronger", 0.5), ("success", 0.3),
    ("successful", 0.75), ("win", 0.8), ("wins", 0.8), ("gain", 0.4), ("gains", 0.4),
    ("growth", 0.3), ("grow", 0.3), ("profit", 0.4), ("profitable", 0.5), ("beat", 0.4),
    ("beats", 0.4), ("surge", 0.5), ("surges", 0.5), ("soar", 0.6), ("soars", 0.6),
    ("rally", 0.5), ("rallies", 0.5), ("rise", 0.3), ("rises", 0.3), ("up", 0.1),
    ("bullish", 0.6), ("upgrade", 0.5), ("upgraded", 0.5), ("outperform", 0.5),
    ("record", 0.3), ("innovative", 0.5), ("innovation", 0.4), ("breakthrough", 0.6),
    ("optimistic", 0.5), ("robust", 0.4), ("boost", 0.4), ("boosts", 0.4),
    ("exceed", 0.4), ("exceeds", 0.4), ("impressive", 1.0), ("love", 0.5),
    ("happy", 0.8), ("new", 0.14), ("high", 0.16), ("higher", 0.25), ("best-selling", 0.7),
    ("recovery", 0.3), ("rebound", 0.3), ("dividend", 0.2), ("buyback", 0.3),
    ("promising", 0.6), ("opportunity", 0.3), ("popular", 0.6), ("easy", 0.43),
    ("top", 0.5), ("leading", 0.3), ("advance", 0.3), ("accelerating", 0.4),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("bad", -0.7), ("worse", -0.4), ("worst", -1.0), ("poor", -0.4), ("negative", -0.3),
    ("weak", -0.38), ("weaker", -0.4), ("fail", -0.5), ("fails", -0.5), ("failed", -0.5),
    ("failure", -0.32), ("loss", -0.4), ("losses", -0.4), ("lose", -0.4), ("decline", -0.4),
    ("declines", -0.4), ("drop", -0.3), ("drops", -0.3), ("fall", -0.3), ("falls", -0.3),
    ("plunge", -0.6), ("plunges", -0.6), ("crash", -0.7), ("crashes", -0.7),
    ("slump", -0.5), ("bearish", -0.6), ("downgrade", -0.5), ("downgraded", -0.5),
    ("underperform", -0.5), ("miss", -0.4), ("misses", -0.4), ("disappointing", -0.6),
    ("disappoint", -0.6), ("concern", -0.3), ("concerns", -0.3), ("risk", -0.2),
    ("risks", -0.2), ("fear", -0.5), ("fears", -0.5), ("lawsuit", -0.4),
    ("investigation", -0.3), ("probe", -0.3), ("bankruptcy", -0.8), ("layoff", -0.5),
    ("layoffs", -0.5), ("recall", -0.4), ("warning", -0.4), ("pessimistic", -0.5),
    ("low", -0.1), ("lower", -0.2), ("down", -0.16), ("terrible", -1.0), ("hard", -0.29),
    ("difficult", -0.5), ("sad", -0.5), ("angry", -0.5), ("uncertain", -0.2),
    ("volatile", -0.2), ("cut", -0.3), ("cuts", -0.3), ("slowdown", -0.4),
];

/// Deterministic lexicon polarity scorer and binary labeller.
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    lexicon: HashMap<&'static str, f64>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer {
    pub fn new() -> Self {
        Self {
            lexicon: POSITIVE_WORDS
                .iter()
                .chain(NEGATIVE_WORDS.iter())
                .copied()
                .collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
        }
    }

    /// Polarity of `text` in `[-1.0, 1.0]`; `0.0` when no lexicon word occurs.
    pub fn polarity(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        let words: Vec<&str> = text_lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '"' | '(' | ')'))
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| NEGATION_WORDS.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut total = 0.0;
        let mut hits = 0usize;

        for (i, word) in words.iter().enumerate() {
            let Some(&weight) = self.lexicon.get(*word) else {
                continue;
            };

            let mut score = weight;
            if i > 0 {
                if let Some(&factor) = self.intensifiers.get(words[i - 1]) {
                    score = (score * factor).clamp(-1.0, 1.0);
                }
            }

            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);
            if negated {
                score *= NEGATION_FACTOR;
            }

            total += score;
            hits += 1;
        }

        if hits == 0 {
            return 0.0;
        }
        (total / hits as f64).clamp(-1.0, 1.0)
    }

    /// `Positive` only for strictly positive polarity; zero maps to `Negative`.
    pub fn classify(&self, text: &str) -> SentimentLabel {
        if self.polarity(text) > 0.0 {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        }
    }

    /// Label an article from its title, description and content.
    pub fn classify_article(&self, article: &NewsArticle) -> SentimentLabel {
        let label = self.classify(&article.scoring_text());
        tracing::trace!("Scored article {:?} as {:?}", article.url, label);
        label
    }
}
