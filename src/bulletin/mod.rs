pub mod classify;
pub mod normalize;
pub mod segment;

use anyhow::Result;
use rayon::prelude::*;

use crate::config::BulletinSettings;
use crate::model::PdfBlock;
use classify::Lexicon;
use normalize::normalize_text;
use segment::Segmenter;

/// Normalize → segment → classify, for text extracted from the bulletin PDF.
#[derive(Debug, Clone)]
pub struct BulletinScanner {
    segmenter: Segmenter,
    lexicon: Lexicon,
}

impl BulletinScanner {
    pub fn new(settings: &BulletinSettings) -> Result<Self> {
        Ok(Self {
            segmenter: Segmenter::new(&settings.delimiter, settings.min_block_len)?,
            lexicon: Lexicon::new(
                &settings.keywords,
                &settings.negative_keywords,
                settings.threshold,
            ),
        })
    }

    /// Every candidate block with its score, in bulletin order.
    pub fn scan(&self, text: &str) -> Vec<PdfBlock> {
        let normalized = normalize_text(text);
        let candidates = self.segmenter.segment(&normalized);

        candidates
            .par_iter()
            .map(|c| {
                let (score, included) = self.lexicon.classify(c.text);
                PdfBlock {
                    code: c.code.map(str::to_string),
                    raw_text: c.raw.to_string(),
                    normalized_text: c.text.to_string(),
                    score,
                    included,
                }
            })
            .collect()
    }
}
