pub mod detail;
pub mod jsonld;
pub mod stubs;
pub mod text;

use anyhow::Result;

use crate::config::BoardSettings;
use crate::model::{DetailRecord, ListingStub};
use detail::DetailResolver;
use stubs::StubParser;

/// Both halves of the web path: search fragment → stubs, detail page → record.
#[derive(Debug, Clone)]
pub struct BoardParser {
    stubs: StubParser,
    detail: DetailResolver,
}

impl BoardParser {
    pub fn new(board: &BoardSettings) -> Result<Self> {
        Ok(Self {
            stubs: StubParser::new(board)?,
            detail: DetailResolver::new(board),
        })
    }

    pub fn parse_stubs(&self, fragment: &str) -> Vec<ListingStub> {
        self.stubs.parse(fragment)
    }

    pub fn resolve_detail(&self, html: &str) -> DetailRecord {
        self.detail.resolve(html)
    }
}
