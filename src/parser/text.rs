use scraper::{ElementRef, Html, Node};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "tr",
    "ul",
];

const SKIP_TAGS: &[&str] = &["script", "style", "template", "noscript"];

/// Plain-text twin of an HTML fragment: tags gone, entities decoded, inline
/// whitespace collapsed, one newline per paragraph or line break. Escaped
/// angle brackets are text and survive (`Vec&lt;T&gt;` reads `Vec<T>`).
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut raw = String::with_capacity(html.len());
    walk(fragment.root_element(), &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn walk(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Some boards ship the description entity-escaped (`&lt;p&gt;...`).
pub fn unescape_markup(description: &str) -> String {
    if !description.contains('<') && description.contains("&lt;") {
        html_escape::decode_html_entities(description).into_owned()
    } else {
        description.to_string()
    }
}
