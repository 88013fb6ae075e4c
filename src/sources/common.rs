use crate::error::ScrapeError;
use regex::Regex;
use std::sync::LazyLock;
use tl::{HTMLTag, Node, Parser, VDom};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());

pub fn parse_dom(html: &str) -> Result<VDom<'_>, ScrapeError> {
    tl::parse(html, tl::ParserOptions::default())
        .map_err(|e| ScrapeError::Html(format!("Failed to parse HTML document: {e}")))
}

/// Decodes the handful of entities the portal emits (Latin-1 umlauts come
/// through as named or numeric references).
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let named = input
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&auml;", "ä")
        .replace("&ouml;", "ö")
        .replace("&uuml;", "ü")
        .replace("&Auml;", "Ä")
        .replace("&Ouml;", "Ö")
        .replace("&Uuml;", "Ü")
        .replace("&szlig;", "ß");
    let numeric = NUMERIC_ENTITY_RE.replace_all(&named, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    numeric.replace("&amp;", "&")
}

pub fn normalize_text(input: &str) -> String {
    let decoded = decode_entities(input).replace('\u{00A0}', " ");
    WHITESPACE_RE
        .replace_all(decoded.trim(), " ")
        .trim()
        .to_string()
}

pub fn is_tag(tag: &HTMLTag, name: &str) -> bool {
    tag.name().as_utf8_str().eq_ignore_ascii_case(name)
}

pub fn attr(tag: &HTMLTag, name: &str) -> Option<String> {
    tag.attributes()
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.map(|v| decode_entities(&v)).unwrap_or_default())
}

pub fn has_class(tag: &HTMLTag, class: &str) -> bool {
    attr(tag, "class")
        .map(|value| value.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

pub fn text_of(tag: &HTMLTag, parser: &Parser) -> String {
    normalize_text(&tag.inner_text(parser))
}

/// Every tag named `name` in document order.
pub fn find_tags<'a, 'buf>(dom: &'a VDom<'buf>, name: &str) -> Vec<&'a HTMLTag<'buf>> {
    dom.nodes()
        .iter()
        .filter_map(Node::as_tag)
        .filter(|tag| is_tag(tag, name))
        .collect()
}

pub fn find_tag_with_class<'a, 'buf>(
    dom: &'a VDom<'buf>,
    name: &str,
    class: &str,
) -> Option<&'a HTMLTag<'buf>> {
    find_tags(dom, name)
        .into_iter()
        .find(|tag| has_class(tag, class))
}

pub fn find_tag_with_id<'a, 'buf>(
    dom: &'a VDom<'buf>,
    name: &str,
    id: &str,
) -> Option<&'a HTMLTag<'buf>> {
    find_tags(dom, name)
        .into_iter()
        .find(|tag| attr(tag, "id").as_deref() == Some(id))
}

/// Every descendant of `tag` named `name`, in document order.
pub fn descendants<'p, 'buf>(
    tag: &'p HTMLTag<'buf>,
    parser: &'p Parser<'buf>,
    name: &str,
) -> Vec<&'p HTMLTag<'buf>> {
    tag.children()
        .all(parser)
        .iter()
        .filter_map(Node::as_tag)
        .filter(|child| is_tag(child, name))
        .collect()
}

/// Descendants named `name` that are not nested inside another `stop_at`
/// element below `tag` (e.g. rows of a table but not of its inner tables).
pub fn shallow_descendants<'p, 'buf>(
    tag: &HTMLTag<'buf>,
    parser: &'p Parser<'buf>,
    name: &str,
    stop_at: &str,
) -> Vec<&'p HTMLTag<'buf>> {
    fn walk<'p, 'buf>(
        tag: &HTMLTag<'buf>,
        parser: &'p Parser<'buf>,
        name: &str,
        stop_at: &str,
        out: &mut Vec<&'p HTMLTag<'buf>>,
    ) {
        for handle in tag.children().top().iter() {
            let Some(child) = handle.get(parser).and_then(Node::as_tag) else {
                continue;
            };
            if is_tag(child, name) {
                out.push(child);
            } else if !is_tag(child, stop_at) {
                walk(child, parser, name, stop_at, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(tag, parser, name, stop_at, &mut out);
    out
}

/// Visible text of the whole document, whitespace-collapsed.
pub fn document_text(dom: &VDom) -> String {
    let parser = dom.parser();
    let text = dom
        .children()
        .iter()
        .filter_map(|handle| handle.get(parser))
        .map(|node| node.inner_text(parser).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_text(&text)
}
