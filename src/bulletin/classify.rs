use std::collections::BTreeSet;

/// Signed bag-of-keywords scorer.
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: Vec<String>,
    negative: Vec<String>,
    threshold: i32,
}

impl Lexicon {
    pub fn new<S: AsRef<str>>(positive: &[S], negative: &[S], threshold: i32) -> Self {
        Self {
            positive: fold(positive),
            negative: fold(negative),
            threshold,
        }
    }

    /// Distinct positive hits minus distinct negative hits.
    pub fn score(&self, text: &str) -> i32 {
        let lower = text.to_lowercase();
        hits(&self.positive, &lower) - hits(&self.negative, &lower)
    }

    /// `(score, included)`; included only when the score beats the threshold.
    pub fn classify(&self, text: &str) -> (i32, bool) {
        let score = self.score(text);
        (score, score > self.threshold)
    }
}

fn fold<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn hits(words: &[String], lower: &str) -> i32 {
    words.iter().filter(|w| lower.contains(w.as_str())).count() as i32
}
