use axum::{
    body::Bytes,
    extract::Request,
    http::{header, uri::PathAndQuery, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Router,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::BTreeMap;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::models::{ShotInfo, ShotListing};

/// Listing endpoint path
pub const LISTING_PATH: &str = "/shots.json";

/// Old location of the frontend; requests under it reach the fallback with the
/// prefix stripped.
pub const LEGACY_PREFIX: &str = "/map";

const EMPTY_LISTING: &[u8] = br#"{"all":[]}"#;

/// Characters re-encoded when a stripped path is handed to the next handler
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Static file handler for a single shot
struct ShotRoute {
    files: ServeDir,
    /// Encoded URL prefix without its trailing slash
    prefix: String,
}

impl ShotRoute {
    fn new(shot: &ShotInfo) -> Self {
        Self {
            files: ServeDir::new(&shot.fs_path),
            prefix: utf8_percent_encode(shot.url_path.trim_end_matches('/'), PATH_ENCODE_SET)
                .to_string(),
        }
    }

    /// Serve a request whose path was stripped of this shot's prefix.
    async fn serve(&self, request: Request) -> Response {
        let mut response = match self.files.clone().oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        };

        // Directory redirects point at the stripped path; put the prefix back.
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|location| location.starts_with('/'))
            .map(|location| format!("{}{}", self.prefix, location));
        if let Some(location) = location {
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    response.headers_mut().insert(header::LOCATION, value);
                }
                Err(e) => {
                    tracing::warn!("Invalid redirect location {}: {}", location, e);
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
        }
        response
    }
}

/// Immutable routing snapshot built from one scan.
///
/// Lookups behave like a prefix mux: `/shots.json` exactly, a redirect for a
/// registered prefix missing its slash, the longest shot prefix under
/// `/data/`, then the legacy `/map/` prefix, then the fallback.
pub struct RouteTable {
    shots: Vec<ShotInfo>,
    routes: BTreeMap<String, ShotRoute>,
    listing: Bytes,
    fallback: Router,
}

impl RouteTable {
    /// Build a table for `shots`. Never fails; duplicate URL paths keep the
    /// last shot.
    pub fn build(shots: Vec<ShotInfo>, fallback: Router) -> Self {
        let mut routes = BTreeMap::new();
        for shot in &shots {
            routes.insert(shot.url_path.clone(), ShotRoute::new(shot));
        }
        let listing = encode_listing(&shots);

        Self {
            shots,
            routes,
            listing,
            fallback,
        }
    }

    pub fn shots(&self) -> &[ShotInfo] {
        &self.shots
    }

    pub async fn serve(&self, request: Request) -> Response {
        let path = percent_decode_str(request.uri().path())
            .decode_utf8_lossy()
            .into_owned();

        if path == LISTING_PATH {
            return self.listing_response();
        }

        // An exact shot prefix missing its slash wins over any shorter prefix.
        if path == LEGACY_PREFIX || self.routes.contains_key(&format!("{}/", path)) {
            return redirect_to_dir(request.uri());
        }

        if let Some((prefix, route)) = self.match_shot(&path) {
            return match with_path(request, &path[prefix.len()..]) {
                Some(request) => route.serve(request).await,
                None => StatusCode::BAD_REQUEST.into_response(),
            };
        }

        if let Some(rest) = path
            .strip_prefix(LEGACY_PREFIX)
            .filter(|rest| rest.starts_with('/'))
        {
            return match with_path(request, rest) {
                Some(request) => self.serve_fallback(request).await,
                None => StatusCode::BAD_REQUEST.into_response(),
            };
        }

        self.serve_fallback(request).await
    }

    fn match_shot(&self, path: &str) -> Option<(&str, &ShotRoute)> {
        self.routes
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, route)| (prefix.as_str(), route))
    }

    fn listing_response(&self) -> Response {
        (
            [(header::CONTENT_TYPE, "application/json")],
            self.listing.clone(),
        )
            .into_response()
    }

    async fn serve_fallback(&self, request: Request) -> Response {
        match self.fallback.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

fn encode_listing(shots: &[ShotInfo]) -> Bytes {
    match serde_json::to_vec(&ShotListing { all: shots }) {
        Ok(data) => Bytes::from(data),
        Err(e) => {
            tracing::error!("Unable to build shots.json: {}", e);
            Bytes::from_static(EMPTY_LISTING)
        }
    }
}

/// Replace the request path with `path` (decoded), keeping the query.
fn with_path(mut request: Request, path: &str) -> Option<Request> {
    let mut target = String::from("/");
    target.extend(utf8_percent_encode(
        path.strip_prefix('/').unwrap_or(path),
        PATH_ENCODE_SET,
    ));
    if let Some(query) = request.uri().query() {
        target.push('?');
        target.push_str(query);
    }

    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(target).ok()?);
    *request.uri_mut() = Uri::from_parts(parts).ok()?;
    Some(request)
}

fn redirect_to_dir(uri: &Uri) -> Response {
    let target = match uri.query() {
        Some(query) => format!("{}/?{}", uri.path(), query),
        None => format!("{}/", uri.path()),
    };
    Redirect::permanent(&target).into_response()
}
