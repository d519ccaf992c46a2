//! Browser UI
//!
//! A single self-contained page that talks to the JSON API.

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// `GET /` and `GET /index.html`
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
