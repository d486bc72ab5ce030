use std::io::Read as _;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

#[allow(dead_code)]
pub const WELL_FORMED_ANALYSIS: &str = "Emotional Tones: [wistful, tender]\n\
Genres: [classical, folk]\n\
Moods: [longing, hope]\n\
Time Period/Cultural Context: [Regency-era England]\n\
Keywords: [candlelight, estate]\n";

#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
pub enum BooksBehavior {
    MatchAnyStrategy,
    MatchRelaxedOnly,
    NoMatch,
}

#[derive(Debug, Clone)]
pub struct ServiceStubConfig {
    pub books: BooksBehavior,
    pub analysis_text: String,
}

impl Default for ServiceStubConfig {
    fn default() -> Self {
        Self {
            books: BooksBehavior::MatchAnyStrategy,
            analysis_text: WELL_FORMED_ANALYSIS.to_owned(),
        }
    }
}

/// One tiny_http server standing in for all three upstream services:
/// `/books` (catalog), `/gemini` (generation), `/accounts` + `/api`
/// (music catalog). Tests point the per-service base-URL overrides at it.
pub struct ServiceStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ServiceStub {
    pub fn spawn(config: ServiceStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start service stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let raw_url = format!("http://stub{}", request.url());
                let url = match url::Url::parse(&raw_url) {
                    Ok(url) => url,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("bad url").with_status_code(400),
                        );
                        continue;
                    }
                };
                let path = url.path().to_owned();

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid body").with_status_code(400),
                    );
                    continue;
                }

                let response_json = if path == "/books/volumes" {
                    let q = query_param(&url, "q").unwrap_or_default();
                    books_response(config.books, &q)
                } else if path.starts_with("/gemini/models/") && path.ends_with(":generateContent")
                {
                    Some(gemini_response(&config.analysis_text))
                } else if path == "/accounts/api/token" {
                    Some(serde_json::json!({
                        "access_token": "stub-token",
                        "token_type": "Bearer",
                        "expires_in": 3600
                    }))
                } else if path == "/api/search" {
                    let limit = query_param(&url, "limit")
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    Some(search_response(limit))
                } else if path == "/api/me" {
                    Some(serde_json::json!({ "id": "stub-user" }))
                } else if path.starts_with("/api/users/") && path.ends_with("/playlists") {
                    Some(serde_json::json!({
                        "id": "pl_stub",
                        "external_urls": {
                            "spotify": "https://open.spotify.com/playlist/pl_stub"
                        }
                    }))
                } else if path.starts_with("/api/playlists/") && path.ends_with("/tracks") {
                    Some(serde_json::json!({ "snapshot_id": "snap_stub" }))
                } else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                };

                let Some(response_json) = response_json else {
                    // Books stub signalling "zero items" is still a 200.
                    let empty = serde_json::json!({ "totalItems": 0 });
                    let _ = request.respond(json_response(&empty));
                    continue;
                };

                let _ = request.respond(json_response(&response_json));
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for ServiceStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Point every per-service base-URL override at the stub and supply
/// throwaway credentials.
#[allow(dead_code)]
pub fn apply_env(cmd: &mut assert_cmd::Command, stub: &ServiceStub) {
    cmd.env("GOOGLE_BOOKS_API_KEY", "test-books-key")
        .env("GEMINI_API_KEY", "test-gemini-key")
        .env("SPOTIFY_CLIENT_ID", "test-client-id")
        .env("SPOTIFY_CLIENT_SECRET", "test-client-secret")
        .env("BOOKTRACK_BOOKS_BASE_URL", format!("{}/books", stub.base_url))
        .env(
            "BOOKTRACK_GEMINI_BASE_URL",
            format!("{}/gemini", stub.base_url),
        )
        .env(
            "BOOKTRACK_SPOTIFY_API_BASE_URL",
            format!("{}/api", stub.base_url),
        )
        .env(
            "BOOKTRACK_SPOTIFY_ACCOUNTS_BASE_URL",
            format!("{}/accounts", stub.base_url),
        );
}

fn json_response(value: &Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let mut response =
        tiny_http::Response::from_string(value.to_string()).with_status_code(200);
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    response = response.with_header(header);
    response
}

fn query_param(url: &url::Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn books_response(behavior: BooksBehavior, q: &str) -> Option<Value> {
    let is_exact_strategy = q.contains("intitle:\"");
    let matched = match behavior {
        BooksBehavior::MatchAnyStrategy => true,
        BooksBehavior::MatchRelaxedOnly => !is_exact_strategy,
        BooksBehavior::NoMatch => false,
    };
    if !matched {
        return None;
    }

    Some(serde_json::json!({
        "totalItems": 1,
        "items": [
            {
                "volumeInfo": {
                    "title": "Pride and Prejudice",
                    "authors": ["Jane Austen"],
                    "description": "Witty social commentary and romance.",
                    "imageLinks": {
                        "smallThumbnail": "https://example.com/small.jpg",
                        "thumbnail": "https://example.com/cover.jpg"
                    }
                }
            }
        ]
    }))
}

fn gemini_response(analysis_text: &str) -> Value {
    serde_json::json!({
        "candidates": [
            {
                "content": {
                    "parts": [ { "text": analysis_text } ]
                }
            }
        ]
    })
}

/// Canned catalog: every search returns the same pool (capped at `limit`),
/// so the aggregate across queries is full of duplicates and the final
/// list exercises dedup and ranking.
fn search_response(limit: usize) -> Value {
    let pool = [
        ("t1", "First Light", 90),
        ("t2", "Counterpane", 90),
        ("t3", "Longbourn Air", 77),
        ("t4", "Letters", 64),
        ("t5", "The Assembly", 52),
        ("t6", "Netherfield", 41),
        ("t7", "Quiet Hours", 33),
        ("t8", "Last Dance", 12),
    ];

    let items: Vec<Value> = pool
        .iter()
        .take(limit)
        .map(|(id, name, popularity)| {
            serde_json::json!({
                "id": id,
                "name": name,
                "uri": format!("spotify:track:{id}"),
                "popularity": popularity,
                "preview_url": format!("https://example.com/{id}.mp3"),
                "artists": [ { "name": "Stub Ensemble" } ],
                "album": {
                    "name": "Stub Album",
                    "images": [
                        { "url": "https://example.com/640.jpg" },
                        { "url": "https://example.com/300.jpg" },
                        { "url": "https://example.com/64.jpg" }
                    ]
                }
            })
        })
        .collect();

    serde_json::json!({ "tracks": { "items": items } })
}
