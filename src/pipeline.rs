use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::bulletin::BulletinScanner;
use crate::config::{BulletinSettings, HttpSettings, Settings};
use crate::error::FetchError;
use crate::fetch::{SearchQuery, Transport};
use crate::model::{JobPosting, ListingStub, Record, RunResult};
use crate::parser::BoardParser;

/// Walk every search page, enrich each card from its detail page, and
/// collect the postings in discovery order.
pub async fn run_board(
    settings: &Settings,
    transport: Arc<dyn Transport>,
    query: &SearchQuery,
    max_pages: Option<u32>,
) -> Result<RunResult> {
    let parser = Arc::new(BoardParser::new(&settings.board)?);
    let page_delay = Duration::from_millis(settings.http.page_delay_ms);
    let mut postings = Vec::new();
    let mut page = 1;

    loop {
        let result = transport
            .search_page(page, query)
            .await
            .with_context(|| format!("Failed to fetch search page {page}"))?;

        let stubs = parser.parse_stubs(&result.html);
        info!(page, cards = stubs.len(), has_next = result.has_next, "search page");

        let enriched =
            enrich(stubs, Arc::clone(&transport), Arc::clone(&parser), &settings.http).await;
        postings.extend(enriched);

        if !result.has_next || max_pages.is_some_and(|max| page >= max) {
            break;
        }
        page += 1;
        tokio::time::sleep(page_delay).await;
    }

    let errors = postings.iter().filter(|p| p.error.is_some()).count();
    info!(total = postings.len(), errors, "board run finished");

    let mut params = BTreeMap::new();
    params.insert("funcao".to_string(), query.funcao.clone());
    params.insert("cidade".to_string(), query.cidade.clone());

    let records = postings.into_iter().map(Record::Posting).collect();
    Ok(RunResult::new(settings.board.source.clone(), params, records))
}

/// Fetch detail pages with at most `http.concurrency` requests in flight.
/// A failed, timed-out or panicked fetch only affects its own posting;
/// output order follows `stubs`.
pub async fn enrich(
    stubs: Vec<ListingStub>,
    transport: Arc<dyn Transport>,
    parser: Arc<BoardParser>,
    http: &HttpSettings,
) -> Vec<JobPosting> {
    let semaphore = Arc::new(Semaphore::new(http.concurrency.max(1)));
    let timeout = Duration::from_secs(http.timeout_secs);
    let delay = Duration::from_millis(http.detail_delay_ms);
    let total = stubs.len();

    let mut slots: Vec<Option<JobPosting>> = vec![None; total];
    let mut workers = Vec::with_capacity(total);
    let (tx, mut rx) = tokio::sync::mpsc::channel::<(usize, JobPosting)>(total.max(1));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    for (idx, stub) in stubs.into_iter().enumerate() {
        let url = match stub.url.clone() {
            Some(url) if stub.is_resolvable() => url,
            _ => {
                debug!(title = ?stub.title, "skipping enrichment, no URL");
                slots[idx] = Some(JobPosting::from_stub(stub, None));
                pb.inc(1);
                continue;
            }
        };

        let sem = Arc::clone(&semaphore);
        let transport = Arc::clone(&transport);
        let parser = Arc::clone(&parser);
        let tx = tx.clone();
        let fallback = stub.clone();

        let handle = tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            let posting = match fetch_detail(transport.as_ref(), &url, timeout).await {
                Ok(html) => JobPosting::merge(stub, parser.resolve_detail(&html)),
                Err(e) => {
                    warn!(url = %url, error = %e, "detail enrichment failed");
                    JobPosting::from_stub(stub, Some(e.to_string()))
                }
            };
            tokio::time::sleep(delay).await;
            let _ = tx.send((idx, posting)).await;
        });
        workers.push((idx, fallback, handle));
    }

    drop(tx);

    while let Some((idx, posting)) = rx.recv().await {
        slots[idx] = Some(posting);
        pb.inc(1);
    }

    // A worker that died before sending still owes its stub.
    for (idx, fallback, handle) in workers {
        if let Err(e) = handle.await {
            if slots[idx].is_none() {
                warn!(url = ?fallback.url, error = %e, "detail worker failed");
                slots[idx] = Some(JobPosting::from_stub(
                    fallback,
                    Some(format!("detail worker failed: {e}")),
                ));
                pb.inc(1);
            }
        }
    }
    pb.finish_and_clear();

    slots.into_iter().flatten().collect()
}

async fn fetch_detail(
    transport: &dyn Transport,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    tokio::time::timeout(timeout, transport.detail_page(url))
        .await
        .map_err(|_| FetchError::Timeout { url: url.to_string() })?
}

/// Classify the bulletin text and keep the relevant blocks.
pub fn scan_bulletin(settings: &BulletinSettings, text: &str) -> Result<RunResult> {
    let scanner = BulletinScanner::new(settings)?;
    let blocks = scanner.scan(text);

    for block in blocks.iter().filter(|b| !b.included) {
        debug!(code = ?block.code, score = block.score, "block excluded");
    }

    let records: Vec<Record> = blocks
        .into_iter()
        .filter(|b| b.included)
        .map(Record::Block)
        .collect();
    info!(matches = records.len(), "bulletin scanned");

    Ok(RunResult::new(settings.source.clone(), BTreeMap::new(), records)
        .with_url(settings.pdf_url.clone()))
}
