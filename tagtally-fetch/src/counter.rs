use scraper::Html;

/// Result of counting a tag in fetched markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCount {
    /// The content carries no <html> element and is not treated as HTML.
    /// Distinct from a zero count in a valid document.
    InvalidHtml,
    /// Number of matching elements, at any depth.
    Count(usize),
}

/// Counts elements whose tag name matches `tag`, case-insensitively.
/// Parsing is lenient; malformed markup never fails, and a tag name that
/// matches nothing counts zero.
pub fn count_tag(body: &str, tag: &str) -> TagCount {
    if !has_html_element(body) {
        return TagCount::InvalidHtml;
    }

    let document = Html::parse_document(body);

    let count = document
        .tree
        .nodes()
        .filter_map(|node| node.value().as_element())
        .filter(|element| element.name().eq_ignore_ascii_case(tag))
        .count();

    TagCount::Count(count)
}

/// The parser synthesizes <html>, <head> and <body> around bare fragments,
/// so validity is judged on the raw markup: an explicit <html> open tag
/// must be present somewhere in the source.
fn has_html_element(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    let mut rest = lower.as_str();

    while let Some(pos) = rest.find("<html") {
        match rest.as_bytes().get(pos + 5) {
            Some(b'>' | b' ' | b'\t' | b'\n' | b'\r' | b'/') => return true,
            _ => rest = &rest[pos + 5..],
        }
    }

    false
}
