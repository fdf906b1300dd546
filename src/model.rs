use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::ser::Serializer;
use serde::Serialize;

/// Partial listing found on a search-results page, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingStub {
    pub id: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub urgent: bool,
    pub url: Option<String>,
    pub source: String,
}

impl ListingStub {
    /// Cards without a resolved URL are terminal and never enriched.
    pub fn is_resolvable(&self) -> bool {
        self.url.is_some()
    }
}

/// Fields read from a single listing's detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailRecord {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub contract_type: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    pub source_schema: Option<String>,
}

/// A stub combined with its detail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobPosting {
    pub id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub contract_type: Option<String>,
    pub urgent: bool,
    pub url: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    pub source_schema: Option<String>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobPosting {
    /// Detail values win over stub values field by field; the stub keeps
    /// identity (`id`, `url`, `source`) and the `urgent` flag.
    pub fn merge(stub: ListingStub, detail: DetailRecord) -> Self {
        Self {
            id: stub.id,
            title: detail.title.or(stub.title),
            company: detail.company,
            location: detail.location.or(stub.location),
            contract_type: detail.contract_type,
            urgent: stub.urgent,
            url: stub.url,
            description_html: detail.description_html,
            description_text: detail.description_text,
            source_schema: detail.source_schema,
            source: stub.source,
            error: None,
        }
    }

    /// A stub that was never enriched, either because it had no URL or
    /// because fetching its detail page failed.
    pub fn from_stub(stub: ListingStub, error: Option<String>) -> Self {
        let mut posting = Self::merge(stub, DetailRecord::default());
        posting.error = error;
        posting
    }
}

/// One segmented unit of the bulletin text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfBlock {
    /// Identifier token that preceded the block (`8734075 RMV 1`).
    pub code: Option<String>,
    pub raw_text: String,
    pub normalized_text: String,
    pub score: i32,
    pub included: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Posting(JobPosting),
    Block(PdfBlock),
}

// Bulletin vacancies are published as their text only.
impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Record::Posting(posting) => posting.serialize(serializer),
            Record::Block(block) => serializer.serialize_str(&block.normalized_text),
        }
    }
}

/// Everything one run of a source produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub query: BTreeMap<String, String>,
    pub scraped_at: DateTime<Utc>,
    pub total: usize,
    #[serde(rename = "vacancies")]
    pub records: Vec<Record>,
}

impl RunResult {
    pub fn new(source: impl Into<String>, query: BTreeMap<String, String>, records: Vec<Record>) -> Self {
        Self {
            source: source.into(),
            url: None,
            query,
            scraped_at: Utc::now(),
            total: records.len(),
            records,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub() -> ListingStub {
        ListingStub {
            id: Some("abc-123".into()),
            title: Some("Dev Jr".into()),
            location: Some("São Carlos".into()),
            urgent: true,
            url: Some("https://example.com/candidato/vaga/ver_vaga/abc-123".into()),
            source: "CezcomRH".into(),
        }
    }

    #[test]
    fn detail_fields_win() {
        let detail = DetailRecord {
            title: Some("Desenvolvedor Júnior".into()),
            location: Some("São Carlos - SP".into()),
            company: Some("ACME".into()),
            ..Default::default()
        };
        let p = JobPosting::merge(stub(), detail);
        assert_eq!(p.title.as_deref(), Some("Desenvolvedor Júnior"));
        assert_eq!(p.location.as_deref(), Some("São Carlos - SP"));
        assert_eq!(p.company.as_deref(), Some("ACME"));
        assert!(p.urgent);
        assert_eq!(p.id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn stub_fills_gaps() {
        let p = JobPosting::merge(stub(), DetailRecord::default());
        assert_eq!(p.title.as_deref(), Some("Dev Jr"));
        assert_eq!(p.location.as_deref(), Some("São Carlos"));
        assert!(p.company.is_none());
    }

    #[test]
    fn failed_enrichment_keeps_error() {
        let p = JobPosting::from_stub(stub(), Some("timed out".into()));
        assert_eq!(p.error.as_deref(), Some("timed out"));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["error"], "timed out");
    }

    #[test]
    fn block_serializes_as_text() {
        let block = Record::Block(PdfBlock {
            code: Some("8734075 RMV 1".into()),
            raw_text: " Desenvolvedor Python ".into(),
            normalized_text: "Desenvolvedor Python".into(),
            score: 1,
            included: true,
        });
        let run = RunResult::new("Prefeitura", BTreeMap::new(), vec![block]);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["vacancies"][0], "Desenvolvedor Python");
        assert!(json.get("url").is_none());
    }
}
