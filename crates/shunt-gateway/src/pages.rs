//! Embedded HTML pages for the chat playground and admin console

use axum::response::Html;

const INDEX_HTML: &str = include_str!("templates/index.html");
const ADMIN_HTML: &str = include_str!("templates/admin.html");

/// Serve the chat playground page
pub async fn home_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Serve the admin console page
pub async fn admin_page() -> Html<&'static str> {
    Html(ADMIN_HTML)
}
