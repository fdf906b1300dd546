use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::jsonld::{self, StructuredPosting};
use super::text::{html_to_text, unescape_markup};
use crate::config::BoardSettings;
use crate::model::DetailRecord;

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static H2: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").unwrap());

const SCHEMA_JOB_POSTING: &str = "JobPosting";

/// Outcome of looking for embedded JSON-LD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredPhase {
    Found(StructuredPosting),
    Absent,
}

/// Page-layout fallbacks, used for whatever JSON-LD left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeuristicFields {
    pub title: Option<String>,
    pub description_html: Option<String>,
}

type TitleStrategy = fn(&Html) -> Option<String>;

// The board renders the job title as `h2`; `h1` is usually the site banner.
const TITLE_FALLBACKS: &[(&str, TitleStrategy)] = &[("h2", first_h2), ("h1", first_h1)];

/// Reads one detail page into a [`DetailRecord`].
#[derive(Debug, Clone)]
pub struct DetailResolver {
    description_headers: Vec<String>,
}

impl DetailResolver {
    pub fn new(board: &BoardSettings) -> Self {
        Self {
            description_headers: board.description_headers.clone(),
        }
    }

    pub fn resolve(&self, html: &str) -> DetailRecord {
        let document = Html::parse_document(html);

        let structured = match jsonld::find_job_posting(&document) {
            Some(posting) => StructuredPhase::Found(posting),
            None => StructuredPhase::Absent,
        };
        debug!(found = matches!(structured, StructuredPhase::Found(_)), "structured data");

        let needs_title = !matches!(&structured, StructuredPhase::Found(p) if p.title.is_some());
        let needs_description =
            !matches!(&structured, StructuredPhase::Found(p) if p.description.is_some());
        let heuristic = HeuristicFields {
            title: needs_title.then(|| heuristic_title(&document)).flatten(),
            description_html: needs_description
                .then(|| self.labeled_section(&document))
                .flatten(),
        };

        normalize(merge(structured, heuristic))
    }

    /// Inner markup of the closest `div` around a known section label.
    fn labeled_section(&self, document: &Html) -> Option<String> {
        document.root_element().descendants().find_map(|node| {
            let Node::Text(text) = node.value() else {
                return None;
            };
            if !self.description_headers.iter().any(|h| text.contains(h.as_str())) {
                return None;
            }
            let container = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "div")?;
            let inner = container.inner_html();
            (!inner.trim().is_empty()).then(|| inner.trim().to_string())
        })
    }
}

/// Structured wins field by field; heuristics only fill gaps.
pub fn merge(structured: StructuredPhase, heuristic: HeuristicFields) -> DetailRecord {
    match structured {
        StructuredPhase::Found(p) => DetailRecord {
            title: p.title.or(heuristic.title),
            company: p.organization,
            location: p.location,
            contract_type: p.employment_type,
            description_html: p.description.or(heuristic.description_html),
            description_text: None,
            source_schema: Some(SCHEMA_JOB_POSTING.to_string()),
        },
        StructuredPhase::Absent => DetailRecord {
            title: heuristic.title,
            description_html: heuristic.description_html,
            ..Default::default()
        },
    }
}

/// Entity-decode plain-text fields and derive `description_text`.
pub fn normalize(mut record: DetailRecord) -> DetailRecord {
    record.title = record.title.map(|t| decode(&t));
    record.company = record.company.map(|c| decode(&c));
    record.location = record.location.map(|l| decode(&l));
    record.contract_type = record.contract_type.map(|c| decode(&c));

    record.description_html = record.description_html.map(|d| unescape_markup(&d));
    record.description_text = record
        .description_html
        .as_deref()
        .map(html_to_text)
        .filter(|t| !t.is_empty());
    record
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).trim().to_string()
}

fn heuristic_title(document: &Html) -> Option<String> {
    TITLE_FALLBACKS.iter().find_map(|(name, strategy)| {
        let title = strategy(document)?;
        debug!(heading = *name, "title from page heading");
        Some(title)
    })
}

fn first_h1(document: &Html) -> Option<String> {
    first_heading(document, &H1)
}

fn first_h2(document: &Html) -> Option<String> {
    first_heading(document, &H2)
}

fn first_heading(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|h| h.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DetailResolver {
        DetailResolver::new(&BoardSettings::default())
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{name}.html")).unwrap()
    }

    #[test]
    fn structured_values_win() {
        let record = resolver().resolve(&fixture("detail_jsonld"));
        assert_eq!(record.title.as_deref(), Some("Desenvolvedor Full Stack"));
        assert_eq!(record.company.as_deref(), Some("CEZCOM CONSULTORIA & RH LTDA"));
        assert_eq!(record.location.as_deref(), Some("São Carlos - SP"));
        assert_eq!(record.contract_type.as_deref(), Some("FULL_TIME"));
        assert_eq!(record.source_schema.as_deref(), Some("JobPosting"));
        let html = record.description_html.unwrap();
        assert!(html.starts_with("<p>Atuar no desenvolvimento"));
        assert!(!html.contains("Texto da página"));
    }

    #[test]
    fn falls_back_to_page_layout() {
        let record = resolver().resolve(&fixture("detail_plain"));
        assert_eq!(record.title.as_deref(), Some("Técnico de Suporte"));
        assert!(record.source_schema.is_none());
        assert!(record.company.is_none());

        let html = record.description_html.unwrap();
        assert!(html.contains("Descrição detalhada"));
        assert!(html.contains("<li>Atendimento ao usuário</li>"));
        assert_eq!(
            record.description_text.as_deref(),
            Some("Descrição detalhada\nSuporte a usuários internos.\nAtendimento ao usuário\nManutenção de equipamentos")
        );
    }

    #[test]
    fn job_heading_beats_site_banner() {
        let record = resolver().resolve(&fixture("detail_banner"));
        assert_eq!(record.title.as_deref(), Some("Desenvolvedor Backend"));
        assert_eq!(
            record.description_text.as_deref(),
            Some("Descrição detalhada\nAPIs em Rust e Go.")
        );
    }

    #[test]
    fn h1_when_page_has_no_h2() {
        let record = resolver().resolve("<body><h1>Analista de Dados</h1></body>");
        assert_eq!(record.title.as_deref(), Some("Analista de Dados"));
    }

    #[test]
    fn malformed_structured_data_falls_through() {
        let html = r#"<html><head><script type="application/ld+json">{"@type": "JobPosting", </script></head>
            <body><h2>Programador</h2><div><strong>Descrição detalhada</strong><p>Java</p></div></body></html>"#;
        let record = resolver().resolve(html);
        assert_eq!(record.title.as_deref(), Some("Programador"));
        assert_eq!(record.description_text.as_deref(), Some("Descrição detalhada\nJava"));
        assert!(record.source_schema.is_none());
    }

    #[test]
    fn partial_structured_data_is_filled() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"JobPosting","hiringOrganization":{"name":"P&amp;D Ltda"}}
            </script></head>
            <body><h1>Analista de TI</h1><div>Descrição detalhada: infraestrutura</div></body></html>"#;
        let record = resolver().resolve(html);
        assert_eq!(record.title.as_deref(), Some("Analista de TI"));
        assert_eq!(record.company.as_deref(), Some("P&D Ltda"));
        assert_eq!(record.source_schema.as_deref(), Some("JobPosting"));
        assert_eq!(
            record.description_text.as_deref(),
            Some("Descrição detalhada: infraestrutura")
        );
    }

    #[test]
    fn escaped_description_becomes_markup() {
        let html = r#"<script type="application/ld+json">
            {"@type":"JobPosting","title":"Dev","description":"&lt;p&gt;Rust &amp;amp; Go&lt;/p&gt;&lt;p&gt;Remoto&lt;/p&gt;"}
            </script>"#;
        let record = resolver().resolve(html);
        assert_eq!(record.description_html.as_deref(), Some("<p>Rust &amp; Go</p><p>Remoto</p>"));
        assert_eq!(record.description_text.as_deref(), Some("Rust & Go\nRemoto"));
    }

    #[test]
    fn escaped_text_in_structured_description_is_kept() {
        let html = r#"<script type="application/ld+json">
            {"@type":"JobPosting","title":"Dev Rust","description":"<p>Experiência com Vec&lt;T&gt; e Option&lt;String&gt; em Rust</p>"}
            </script>"#;
        let record = resolver().resolve(html);
        assert_eq!(
            record.description_text.as_deref(),
            Some("Experiência com Vec<T> e Option<String> em Rust")
        );
    }

    #[test]
    fn description_text_is_stripped_twin() {
        for name in ["detail_jsonld", "detail_plain"] {
            let record = resolver().resolve(&fixture(name));
            let html = record.description_html.as_deref().unwrap();
            let text = record.description_text.as_deref().unwrap();
            assert!(!text.contains('<') && !text.contains('>'), "{name}");
            assert_eq!(html_to_text(html), text, "{name}");
        }
    }

    #[test]
    fn empty_page() {
        assert_eq!(resolver().resolve(""), DetailRecord::default());
    }
}
