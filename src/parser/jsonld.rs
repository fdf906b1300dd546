use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::{Map, Value};

static LD_JSON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

const JOB_POSTING: &str = "JobPosting";

/// Fields read from a schema.org `JobPosting` object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredPosting {
    pub title: Option<String>,
    pub description: Option<String>,
    pub employment_type: Option<String>,
    pub organization: Option<String>,
    pub location: Option<String>,
}

/// First `JobPosting` among the page's JSON-LD scripts. Scripts that fail to
/// parse are skipped.
pub fn find_job_posting(document: &Html) -> Option<StructuredPosting> {
    document.select(&LD_JSON).find_map(|script| {
        let raw: String = script.text().collect();
        let value = parse_lenient(&raw)?;
        select_posting(&value).map(read_posting)
    })
}

/// JSON-LD in the wild carries raw newlines and tabs inside strings.
fn parse_lenient(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    serde_json::from_str(raw)
        .or_else(|_| serde_json::from_str(&escape_control_chars(raw)))
        .ok()
}

fn escape_control_chars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in raw.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if c.is_control() {
                match c {
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    other => out.push_str(&format!("\\u{:04x}", other as u32)),
                }
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    out
}

/// Object, array of objects, or `@graph` container.
fn select_posting(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) => {
            if is_job_posting(map) {
                return Some(map);
            }
            map.get("@graph").and_then(select_posting)
        }
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::Object(map) if is_job_posting(map) => Some(map),
            _ => None,
        }),
        _ => None,
    }
}

fn is_job_posting(map: &Map<String, Value>) -> bool {
    match map.get("@type") {
        Some(Value::String(t)) => t == JOB_POSTING,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(JOB_POSTING)),
        _ => false,
    }
}

fn read_posting(map: &Map<String, Value>) -> StructuredPosting {
    StructuredPosting {
        title: string_field(map.get("title")),
        description: string_field(map.get("description")),
        employment_type: string_field(map.get("employmentType")),
        organization: match map.get("hiringOrganization") {
            Some(Value::Object(org)) => string_field(org.get("name")),
            other => string_field(other),
        },
        location: map.get("jobLocation").and_then(read_location),
    }
}

/// `addressLocality - addressRegion`, skipping whichever part is missing.
fn read_location(value: &Value) -> Option<String> {
    let place = match value {
        Value::Array(places) => places.first()?,
        other => other,
    };
    let address = place.get("address")?.as_object()?;

    let parts: Vec<String> = ["addressLocality", "addressRegion"]
        .iter()
        .filter_map(|key| string_field(address.get(*key)))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" - "))
}

/// Non-empty string, or a list of strings joined with `", "`.
fn string_field(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
