use url::Url;

pub const MAX_URL_LENGTH: usize = 500;

pub const INVALID_URL_ERROR: &str = "Invalid url";
pub const TOO_LONG_URL_ERROR: &str = "URL can't be longer than 500 symbols";
pub const EMPTY_ELEMENT_ERROR: &str = "Enter HTML element to count";

/// Outcome of validating form input. Rules are checked in a fixed order and
/// every failed rule contributes its own message; nothing short-circuits.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub ok: bool,
    pub errors: Vec<String>,
}

pub fn validate_input(url: Option<&str>, element: Option<&str>) -> Validation {
    let url_value = url.unwrap_or("");
    let element_value = element.unwrap_or("");

    let rules = [
        (
            url_value.is_empty() || !is_fetchable_url(url_value),
            INVALID_URL_ERROR,
        ),
        (url_value.chars().count() > MAX_URL_LENGTH, TOO_LONG_URL_ERROR),
        (element_value.is_empty(), EMPTY_ELEMENT_ERROR),
    ];

    let errors: Vec<String> = rules
        .iter()
        .filter(|(failed, _)| *failed)
        .map(|(_, message)| message.to_string())
        .collect();

    Validation {
        ok: errors.is_empty(),
        errors,
    }
}

/// A URL is fetchable when it parses and names a host.
fn is_fetchable_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|parsed| parsed.host_str().is_some())
}
