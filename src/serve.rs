//! Local preview server
//!
//! `talkdeck serve talk.deck.json` → starts server, opens browser, rebuilds
//! the deck on every page load so edits show up on refresh.

use crate::assets;
use crate::deck::{BuildOptions, Deck};
use crate::error::{DeckError, Result};
use crate::render::{self, Resources};
use chrono::Local;
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tiny_http::{Header, Method, Request, Response, Server};

/// Query overrides for `GET /`, e.g. `/?resources=cdn&embed_video=true`
#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct PreviewParams {
    #[serde(default)]
    pub embed_video: Option<bool>,
    #[serde(default)]
    pub local_files: Option<bool>,
    #[serde(default)]
    pub resources: Option<Resources>,
}

impl PreviewParams {
    fn apply(&self, mut options: BuildOptions) -> BuildOptions {
        if let Some(embed) = self.embed_video {
            options.embed_video = embed;
        }
        if let Some(local) = self.local_files {
            options.local_files = local;
        }
        if let Some(resources) = self.resources {
            options.resources = resources;
        }
        options
    }
}

/// A response before it goes on the wire
#[derive(Debug)]
struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Reply {
    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body: body.into_bytes() }
    }

    fn text(status: u16, body: impl Into<String>) -> Self {
        Self { status, content_type: "text/plain; charset=utf-8", body: body.into().into_bytes() }
    }
}

/// Start server, open browser, serve the deck
pub fn start(port: u16, deck_path: PathBuf, options: BuildOptions) -> Result<()> {
    // Fail early on a broken deck rather than on the first request
    Deck::load(&deck_path)?;

    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| DeckError::Server(e.to_string()))?;

    let url = format!("http://localhost:{}", port);
    eprintln!("\n\x1b[1;32mtalkdeck preview\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Deck: {}\n", deck_path.display());

    if let Err(e) = open::that(&url) {
        warn!("Could not open browser: {}", e);
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &deck_path, options) {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

fn handle_request(request: Request, deck_path: &Path, options: BuildOptions) -> std::io::Result<()> {
    let url = request.url().to_string();
    let reply = if *request.method() == Method::Get {
        route(&url, deck_path, options)
    } else {
        Reply::text(404, "Not found")
    };

    eprintln!(
        "[{}] {} {} → {}",
        Local::now().format("%H:%M:%S"),
        request.method(),
        url,
        reply.status
    );

    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    request.respond(response)
}

fn route(url: &str, deck_path: &Path, options: BuildOptions) -> Reply {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    };

    if path == "/" {
        let params = match serde_urlencoded::from_str::<PreviewParams>(query) {
            Ok(params) => params,
            Err(e) => return Reply::text(400, format!("Bad query: {}", e)),
        };
        return rebuild(deck_path, params.apply(options));
    }

    let base = deck_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match resolve_static(base, path) {
        Some(file) => serve_file(&file),
        None => Reply::text(404, "Not found"),
    }
}

fn rebuild(deck_path: &Path, options: BuildOptions) -> Reply {
    debug!("Rebuilding {} with {:?}", deck_path.display(), options);
    let result = Deck::load(deck_path).and_then(|deck| deck.build(&options));
    match result {
        Ok(doc) => Reply::html(render::to_string(&doc, options.resources)),
        Err(e) => Reply::text(500, format!("Build failed: {}", e)),
    }
}

/// Map a URL path onto a file under `base`; `None` for anything that
/// would leave it. Percent escapes are decoded before the path is checked.
fn resolve_static(base: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url_path).ok()?;
    let relative = Path::new(decoded.trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return None;
    }
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    let full = base.join(relative);
    full.is_file().then_some(full)
}

fn serve_file(path: &Path) -> Reply {
    let content_type = match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ref e) if e == "html" || e == "htm" => "text/html; charset=utf-8",
        Some(ref e) if e == "css" => "text/css",
        Some(ref e) if e == "js" => "application/javascript",
        Some(ref e) if e == "json" => "application/json",
        _ => assets::mime_for(path),
    };
    match std::fs::read(path) {
        Ok(body) => Reply { status: 200, content_type, body },
        Err(e) => Reply::text(500, format!("{}: {}", path.display(), e)),
    }
}
