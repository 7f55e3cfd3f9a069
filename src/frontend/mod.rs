use axum::{response::Html, Router};
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Handler for every path that is neither shot data nor the listing.
///
/// With a frontend directory, files are served from it and unknown paths get
/// its `index.html`. Without one, a bundled index page is returned for any path.
pub fn router(dir: Option<&Path>) -> Router {
    match dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            Router::new().fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => Router::new().fallback(bundled_index),
    }
}

async fn bundled_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
