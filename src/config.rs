use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_USER_AGENT: &str =
    "saocarlos-tech-jobs-aggregator/0.1 (+https://github.com/v1cferr)";

const KEYWORDS: &[&str] = &[
    "informática",
    "desenvolvedor",
    "programador",
    "suporte técnico",
    "analista de sistemas",
    "analista de ti",
    "sistemas de informação",
    "software",
    "hardware",
    "técnico em informática",
    "infraestrutura de ti",
    "redes de computadores",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "doméstica",
    "motorista",
    "auxiliar",
    "padeiro",
    "vendas",
    "logística",
    "produção",
    "limpeza",
    "farmácia",
    "eletricista",
    "mecânico",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub board: BoardSettings,
    pub bulletin: BulletinSettings,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            board: BoardSettings::default(),
            bulletin: BulletinSettings::default(),
            output_dir: PathBuf::from("data/raw"),
        }
    }
}

/// Transport identity, timeouts and pacing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Simultaneous detail fetches against the board origin.
    pub concurrency: usize,
    /// Pause each worker takes after a detail fetch.
    pub detail_delay_ms: u64,
    /// Pause between search result pages.
    pub page_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 15,
            concurrency: 4,
            detail_delay_ms: 500,
            page_delay_ms: 1000,
        }
    }
}

/// Layout of the job board behind the paginated search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub source: String,
    pub base_url: String,
    pub search_path: String,
    pub detail_path: String,
    /// Name of the inline JS function cards call with the listing id.
    pub click_handler: String,
    /// Query parameters share redirectors wrap the target URL in, in lookup order.
    pub redirect_params: Vec<String>,
    /// Phrases that label the description section on a detail page.
    pub description_headers: Vec<String>,
    pub funcao: String,
    pub cidade: String,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            source: "CezcomRH".to_string(),
            base_url: "https://cezcomrh.tweezer.jobs".to_string(),
            search_path: "/candidato/vaga/buscar_vaga/json/".to_string(),
            detail_path: "/candidato/vaga/ver_vaga/".to_string(),
            click_handler: "ver_vaga".to_string(),
            redirect_params: vec!["url".to_string(), "u".to_string()],
            description_headers: vec!["Descrição detalhada".to_string()],
            funcao: "tecnologia".to_string(),
            cidade: "São Carlos".to_string(),
        }
    }
}

/// The PDF bulletin source and its lexicon classifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BulletinSettings {
    pub source: String,
    pub pdf_url: String,
    pub timeout_secs: u64,
    /// Accept invalid certificates from the bulletin origin.
    pub insecure_origin: bool,
    pub delimiter: String,
    pub min_block_len: usize,
    pub threshold: i32,
    pub keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
}

impl Default for BulletinSettings {
    fn default() -> Self {
        Self {
            source: "Prefeitura de São Carlos - Casa do Trabalhador".to_string(),
            pdf_url: "https://saocarlos.sp.gov.br/files/vagas_trabalhador.pdf".to_string(),
            timeout_secs: 30,
            insecure_origin: true,
            delimiter: r"\b8\d{6} [A-Z]{3} \d+\b".to_string(),
            min_block_len: 30,
            threshold: 0,
            keywords: KEYWORDS.iter().map(|s| s.to_string()).collect(),
            negative_keywords: NEGATIVE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Defaults, then the TOML file if it exists, then `JOBS_*` variables
    /// (`JOBS_HTTP__CONCURRENCY=2`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new("jobs.toml"));
        let settings = Config::builder()
            .add_source(File::from(file).required(path.is_some()))
            .add_source(
                Environment::with_prefix("JOBS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("board.redirect_params")
                    .with_list_parse_key("board.description_headers")
                    .with_list_parse_key("bulletin.keywords")
                    .with_list_parse_key("bulletin.negative_keywords")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings from {}", file.display()))?;

        settings
            .try_deserialize()
            .context("Invalid settings")
    }
}
