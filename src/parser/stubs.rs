use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::config::BoardSettings;
use crate::model::ListingStub;

static CARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".card").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".card-title").unwrap());
static MAP_MARKER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".fa-map-marker-alt").unwrap());
static URGENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".vaga-urgente").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Detail URL (and maybe id) recovered from a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub id: Option<String>,
}

/// One way of reading a detail URL out of a card.
pub type CardStrategy = fn(&StubParser, ElementRef) -> Option<Resolution>;

/// One way of reading a detail URL out of an anchor's `href`.
pub type HrefStrategy = fn(&StubParser, &str) -> Option<Resolution>;

/// Tried in order; the first URL wins.
pub const CARD_STRATEGIES: &[(&str, CardStrategy)] = &[
    ("anchor", StubParser::from_anchors),
    ("click_handler", StubParser::from_click_handler),
];

pub const HREF_STRATEGIES: &[(&str, HrefStrategy)] = &[
    ("redirect_param", StubParser::from_redirect_param),
    ("status_share", StubParser::from_status_share),
    ("direct", StubParser::from_direct_link),
];

/// Turns a search-result fragment into one stub per listing card.
#[derive(Debug, Clone)]
pub struct StubParser {
    source: String,
    base: Url,
    detail_path: String,
    redirect_params: Vec<String>,
    clickable: Selector,
    click_re: Regex,
    share_re: Regex,
}

impl StubParser {
    pub fn new(board: &BoardSettings) -> Result<Self> {
        let base = Url::parse(&board.base_url)
            .with_context(|| format!("Invalid board base URL: {}", board.base_url))?;
        let handler = regex::escape(&board.click_handler);
        let detail = regex::escape(&board.detail_path);

        let clickable = Selector::parse(&format!("[onclick*='{}']", board.click_handler))
            .map_err(|e| anyhow::anyhow!("Invalid click handler selector: {e:?}"))?;

        Ok(Self {
            source: board.source.clone(),
            base,
            detail_path: board.detail_path.clone(),
            redirect_params: board.redirect_params.clone(),
            clickable,
            click_re: Regex::new(&format!(r#"{handler}\(\s*['"]([\w-]+)['"]\s*\)"#))?,
            share_re: Regex::new(&format!(r"(https?://[^\s]+{detail}[\w-]+)"))?,
        })
    }

    /// One stub per `.card`, in document order. Cards whose URL cannot be
    /// resolved are kept with `id` and `url` unset.
    pub fn parse(&self, fragment: &str) -> Vec<ListingStub> {
        let document = Html::parse_fragment(fragment);
        document.select(&CARD).map(|card| self.parse_card(card)).collect()
    }

    fn parse_card(&self, card: ElementRef) -> ListingStub {
        let title = card.select(&TITLE).next().map(text_of).filter(|t| !t.is_empty());
        let location = card
            .select(&MAP_MARKER)
            .next()
            .and_then(|icon| enclosing(icon, "span"))
            .map(text_of)
            .filter(|t| !t.is_empty());
        let urgent = card.select(&URGENT).next().is_some();

        let resolved = CARD_STRATEGIES.iter().find_map(|(name, strategy)| {
            let found = strategy(self, card)?;
            debug!(strategy = *name, url = %found.url, "resolved listing URL");
            Some(found)
        });

        let (id, url) = match resolved {
            Some(Resolution { url, id }) => {
                let url = collapse_slashes(&url);
                let id = id.or_else(|| last_segment(&url));
                (id, Some(url))
            }
            None => {
                debug!(title = ?title, "card has no resolvable URL");
                (None, None)
            }
        };

        ListingStub {
            id,
            title,
            location,
            urgent,
            url,
            source: self.source.clone(),
        }
    }

    fn from_anchors(&self, card: ElementRef) -> Option<Resolution> {
        card.select(&ANCHOR).find_map(|a| {
            let href = a.value().attr("href")?.trim();
            HREF_STRATEGIES
                .iter()
                .find_map(|(_, strategy)| strategy(self, href))
        })
    }

    fn from_click_handler(&self, card: ElementRef) -> Option<Resolution> {
        card.select(&self.clickable).find_map(|el| {
            let onclick = el.value().attr("onclick")?;
            let id = self.click_re.captures(onclick)?.get(1)?.as_str().to_string();
            Some(Resolution {
                url: self.detail_url(&id),
                id: Some(id),
            })
        })
    }

    /// Share links that wrap the target in a query parameter
    /// (`?url=` for LinkedIn/Twitter, `?u=` for Facebook).
    fn from_redirect_param(&self, href: &str) -> Option<Resolution> {
        let wrapper = self.base.join(href).ok()?;
        let target = self.redirect_params.iter().find_map(|param| {
            wrapper
                .query_pairs()
                .find(|(k, v)| k == param.as_str() && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        })?;
        let url = self.absolute(&target)?;
        self.is_detail(&url).then(|| Resolution {
            url: url.to_string(),
            id: None,
        })
    }

    /// Twitter-style `?status=<text> <url>`: the detail URL sits inside free text.
    fn from_status_share(&self, href: &str) -> Option<Resolution> {
        let wrapper = self.base.join(href).ok()?;
        let status = wrapper
            .query_pairs()
            .find(|(k, _)| k == "status")
            .map(|(_, v)| v.into_owned())?;
        let found = self.share_re.captures(&status)?.get(1)?.as_str().to_string();
        Some(Resolution { url: found, id: None })
    }

    fn from_direct_link(&self, href: &str) -> Option<Resolution> {
        let url = self.absolute(href)?;
        self.is_detail(&url).then(|| Resolution {
            url: url.to_string(),
            id: None,
        })
    }

    fn detail_url(&self, id: &str) -> String {
        collapse_slashes(&format!(
            "{}/{}/{}",
            self.base.as_str().trim_end_matches('/'),
            self.detail_path.trim_matches('/'),
            id
        ))
    }

    /// Absolute hrefs as-is; anything else is appended to the base URL.
    fn absolute(&self, href: &str) -> Option<Url> {
        let joined = if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            let base = self.base.as_str().trim_end_matches('/');
            let sep = if href.starts_with('/') { "" } else { "/" };
            format!("{base}{sep}{href}")
        };
        Url::parse(&collapse_slashes(&joined)).ok()
    }

    fn is_detail(&self, url: &Url) -> bool {
        url.path().contains(self.detail_path.as_str())
    }
}

/// Collapse `//` in the path of an absolute URL. Scheme separator and query
/// string are left alone.
pub fn collapse_slashes(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return squeeze(url);
    };
    let (scheme, rest) = url.split_at(scheme_end + 3);
    let split_at = rest.find(['?', '#']).unwrap_or(rest.len());
    let (path, tail) = rest.split_at(split_at);
    format!("{scheme}{}{tail}", squeeze(path))
}

fn squeeze(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

fn last_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

fn enclosing<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == tag)
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://cezcomrh.tweezer.jobs";

    fn parser() -> StubParser {
        StubParser::new(&BoardSettings::default()).unwrap()
    }

    fn one(html: &str) -> ListingStub {
        let stubs = parser().parse(html);
        assert_eq!(stubs.len(), 1);
        stubs.into_iter().next().unwrap()
    }

    #[test]
    fn click_handler_card() {
        let stub = one(
            r#"<div class="card"><h5 class="card-title">Dev Jr</h5><button onclick="ver_vaga('abc-123')"></button></div>"#,
        );
        assert_eq!(stub.id.as_deref(), Some("abc-123"));
        assert_eq!(stub.title.as_deref(), Some("Dev Jr"));
        assert_eq!(
            stub.url.as_deref(),
            Some("https://cezcomrh.tweezer.jobs/candidato/vaga/ver_vaga/abc-123")
        );
        assert!(!stub.urgent);
        assert_eq!(stub.source, "CezcomRH");
    }

    #[test]
    fn redirect_conventions_decode_to_same_target() {
        let target = format!("{BASE}/candidato/vaga/ver_vaga/xyz-9");
        let encoded = target.replace(':', "%3A").replace('/', "%2F");
        let hrefs = [
            format!("https://www.linkedin.com/shareArticle?mini=true&url={encoded}"),
            format!("https://www.facebook.com/sharer/sharer.php?u={encoded}"),
            format!("https://twitter.com/share?text=Vaga&url={target}"),
            format!("https://twitter.com/home?status=Confira%20esta%20vaga%20{encoded}"),
            format!("{BASE}/candidato/vaga/ver_vaga/xyz-9"),
            "/candidato/vaga/ver_vaga/xyz-9".to_string(),
        ];
        for href in hrefs {
            let html = format!(
                r#"<div class="card"><a href="{}">share</a></div>"#,
                href.replace('&', "&amp;")
            );
            let stub = one(&html);
            assert_eq!(stub.url.as_deref(), Some(target.as_str()), "href: {href}");
            assert_eq!(stub.id.as_deref(), Some("xyz-9"), "href: {href}");
        }
    }

    #[test]
    fn share_link_to_elsewhere_is_ignored() {
        let stub = one(
            r#"<div class="card">
                 <a href="https://www.facebook.com/sharer/sharer.php?u=https://example.com/blog">f</a>
                 <a href="/candidato/login">entrar</a>
                 <span onclick="ver_vaga('fallback-1')"></span>
               </div>"#,
        );
        assert_eq!(stub.id.as_deref(), Some("fallback-1"));
    }

    #[test]
    fn anchor_wins_over_click_handler() {
        let stub = one(
            r#"<div class="card">
                 <a href="https://www.facebook.com/sharer/sharer.php?u=https://cezcomrh.tweezer.jobs/candidato/vaga/ver_vaga/from-anchor"></a>
                 <div onclick="ver_vaga('from-click')"></div>
               </div>"#,
        );
        assert_eq!(stub.id.as_deref(), Some("from-anchor"));
    }

    #[test]
    fn unresolvable_card_is_kept() {
        let stubs = parser().parse(
            r#"<div class="card"><h5 class="card-title">Sem link</h5></div>
               <div class="card"><h5 class="card-title">Com link</h5><a onclick="ver_vaga('id-2')"></a></div>"#,
        );
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].title.as_deref(), Some("Sem link"));
        assert!(stubs[0].id.is_none() && stubs[0].url.is_none());
        assert!(!stubs[0].is_resolvable());
        assert_eq!(stubs[1].id.as_deref(), Some("id-2"));
    }

    #[test]
    fn location_and_urgent() {
        let stub = one(
            r#"<div class="card">
                 <span class="badge vaga-urgente">Urgente</span>
                 <h5 class="card-title">  Analista   de Sistemas </h5>
                 <span><i class="fas fa-map-marker-alt"></i> São Carlos - SP</span>
               </div>"#,
        );
        assert!(stub.urgent);
        assert_eq!(stub.title.as_deref(), Some("Analista de Sistemas"));
        assert_eq!(stub.location.as_deref(), Some("São Carlos - SP"));
    }

    #[test]
    fn doubled_slash_is_collapsed() {
        let stub = one(r#"<div class="card"><a href="//candidato/vaga/ver_vaga/dup-1/">x</a></div>"#);
        assert_eq!(
            stub.url.as_deref(),
            Some("https://cezcomrh.tweezer.jobs/candidato/vaga/ver_vaga/dup-1/")
        );
        assert_eq!(stub.id.as_deref(), Some("dup-1"));

        let stub = one(
            r#"<div class="card"><a href="https://cezcomrh.tweezer.jobs//candidato/vaga/ver_vaga/dup-2">x</a></div>"#,
        );
        assert_eq!(
            stub.url.as_deref(),
            Some("https://cezcomrh.tweezer.jobs/candidato/vaga/ver_vaga/dup-2")
        );
        assert_eq!(stub.id.as_deref(), Some("dup-2"));
    }

    #[test]
    fn trailing_slash_id() {
        let stub = one(
            r#"<div class="card"><a href="/candidato/vaga/ver_vaga/slash-7/">x</a></div>"#,
        );
        assert_eq!(stub.id.as_deref(), Some("slash-7"));
    }

    #[test]
    fn collapse_keeps_scheme_and_query() {
        assert_eq!(
            collapse_slashes("https://a.com//x///y?next=https://b.com//z"),
            "https://a.com/x/y?next=https://b.com//z"
        );
    }

    #[test]
    fn search_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/search_page.html").unwrap();
        let stubs = parser().parse(&html);
        assert_eq!(stubs.len(), 4);

        let ids: Vec<_> = stubs.iter().map(|s| s.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("a1b2-c3"), Some("d4e5-f6"), Some("g7h8"), None]);
        assert!(stubs[1].urgent);
        assert!(stubs
            .iter()
            .filter_map(|s| s.url.as_deref())
            .all(|u| u.starts_with("https://cezcomrh.tweezer.jobs/candidato/vaga/ver_vaga/")));
    }
}
