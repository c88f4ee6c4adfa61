use axum::Form;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tagtally_core::data::{Database, GeneralStatistics};
use tagtally_fetch::{Fetcher, TagCount, count_tag};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::validation::validate_input;

pub const INACCESSIBLE_URL_ERROR: &str = "Inaccessible URL";
pub const INVALID_HTML_ERROR: &str = "Invalid HTML";

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const INDEX_HTML: &str = include_str!("../assets/index.html");
const STYLE_CSS: &str = include_str!("../assets/style.css");
const SCRIPT_JS: &str = include_str!("../assets/script.js");

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub fetcher: Arc<Fetcher>,
}

#[derive(Debug, Deserialize)]
pub struct CountForm {
    pub url: Option<String>,
    pub element: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub ok: bool,
    pub url: String,
    pub domain: String,
    pub element: String,
    pub fetch_date_time: String,
    pub response_time: i64,
    pub count: i64,
    pub url_count_for_domain: i64,
    pub average_page_fetch_time_for_domain: i64,
    pub total_element_count_for_domain: i64,
    pub total_element_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub errors: Vec<String>,
}

impl ErrorResponse {
    pub fn new(errors: Vec<String>) -> Self {
        Self { ok: false, errors }
    }
}

/// POST /api/count
///
/// The whole pipeline runs here, in order: validate, dedup-check, fetch,
/// count, persist, aggregate. Every failure terminates immediately with the
/// error shape; form-level errors still answer HTTP 200.
pub async fn count(State(state): State<AppState>, Form(form): Form<CountForm>) -> Response {
    let validation = validate_input(form.url.as_deref(), form.element.as_deref());
    if !validation.ok {
        return error_response(validation.errors);
    }

    let url = form.url.unwrap_or_default();
    let element = form.element.unwrap_or_default();
    // Validation guarantees a parseable URL with a host
    let domain = Url::parse(&url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default();

    // A fetch within the recency window is reused verbatim and nothing new
    // is persisted; only the aggregates are recomputed.
    {
        let db = state.db.lock().await;
        match db.find_recent_fetch(&url, &element) {
            Ok(Some(recent)) => {
                debug!("Reusing recent fetch for {} <{}>", url, element);
                return match db.general_statistics(&domain, &element) {
                    Ok(stats) => success_response(
                        &url,
                        &domain,
                        &element,
                        recent.fetch_time,
                        recent.duration_ms,
                        recent.count,
                        stats,
                    ),
                    Err(e) => internal_error("statistics query failed", e),
                };
            }
            Ok(None) => {}
            Err(e) => return internal_error("recent fetch lookup failed", e),
        }
    }

    let outcome = match state.fetcher.fetch(&url).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Fetch failed for {}: {}", url, e);
            return error_response(vec![INACCESSIBLE_URL_ERROR.to_string()]);
        }
    };

    let count = match count_tag(&outcome.body, &element) {
        TagCount::InvalidHtml => return error_response(vec![INVALID_HTML_ERROR.to_string()]),
        TagCount::Count(n) => n as i64,
    };

    let db = state.db.lock().await;
    let stored = db
        .insert_request(
            &domain,
            &url,
            &element,
            outcome.fetched_at,
            outcome.duration_ms,
            count,
        )
        .and_then(|_| db.general_statistics(&domain, &element));

    match stored {
        Ok(stats) => success_response(
            &url,
            &domain,
            &element,
            outcome.fetched_at,
            outcome.duration_ms,
            count,
            stats,
        ),
        Err(e) => internal_error("request persistence failed", e),
    }
}

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/style.css
pub async fn style() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], STYLE_CSS)
}

/// GET /static/script.js
pub async fn script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], SCRIPT_JS)
}

fn success_response(
    url: &str,
    domain: &str,
    element: &str,
    fetch_time: i64,
    duration_ms: i64,
    count: i64,
    stats: GeneralStatistics,
) -> Response {
    Json(CountResponse {
        ok: true,
        url: url.to_string(),
        domain: domain.to_string(),
        element: element.to_string(),
        fetch_date_time: format_fetch_time(fetch_time),
        response_time: duration_ms,
        count,
        url_count_for_domain: stats.url_count_for_domain,
        average_page_fetch_time_for_domain: stats.average_fetch_time_for_domain,
        total_element_count_for_domain: stats.total_element_count_for_domain,
        total_element_count: stats.total_element_count,
    })
    .into_response()
}

fn error_response(errors: Vec<String>) -> Response {
    Json(ErrorResponse::new(errors)).into_response()
}

fn internal_error(context: &str, error: impl std::fmt::Display) -> Response {
    warn!("{}: {}", context, error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(vec!["internal error".to_string()])),
    )
        .into_response()
}

fn format_fetch_time(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|time| time.format(DATE_TIME_FORMAT).to_string())
        .unwrap_or_default()
}
