use serde::Serialize;
use std::path::PathBuf;

/// URL prefix under which every shot's files are served
pub const DATA_PREFIX: &str = "/data/";

/// One discovered mapshot directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShotInfo {
    /// Path of the shot directory relative to the scan root, `/`-separated
    pub name: String,
    /// HTTP path prefix the tiles and metadata are served under
    #[serde(rename = "path")]
    pub url_path: String,
    /// Absolute directory holding the shot files; never exposed over HTTP
    #[serde(skip)]
    pub fs_path: PathBuf,
}

impl ShotInfo {
    /// Build a shot from its relative name. The scan root itself is named `.`
    /// and served at `/data/` so the dot segment never reaches a URL.
    pub fn new(name: String, fs_path: PathBuf) -> Self {
        let url_path = if name == "." {
            DATA_PREFIX.to_string()
        } else {
            format!("{}{}/", DATA_PREFIX, name)
        };
        Self {
            name,
            url_path,
            fs_path,
        }
    }
}

/// Body of `/shots.json`
#[derive(Debug, Serialize)]
pub struct ShotListing<'a> {
    pub all: &'a [ShotInfo],
}
