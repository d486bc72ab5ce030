use base64::Engine as _;
use serde::Deserialize;
use url::Url;

use crate::config::SpotifyConfig;
use crate::error::PipelineError;
use crate::formats::{SearchQuery, Track};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

const PLAYLIST_SCOPE: &str = "playlist-modify-public";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: SearchTracks,
}

#[derive(Debug, Deserialize)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    id: String,
    name: String,
    uri: String,
    #[serde(default)]
    popularity: u8,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    artists: Vec<ArtistItem>,
    album: AlbumItem,
}

#[derive(Debug, Deserialize)]
struct ArtistItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumItem {
    name: String,
    #[serde(default)]
    images: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct ImageItem {
    url: String,
}

fn normalize_track(item: TrackItem) -> Track {
    let artist = item
        .artists
        .into_iter()
        .next()
        .map(|artist| artist.name)
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_owned());
    // The album image list is ordered largest-first; the second entry is
    // the mid-size rendition.
    let album_image_url = item.album.images.into_iter().nth(1).map(|image| image.url);

    Track {
        id: item.id,
        name: item.name,
        artist,
        album: item.album.name,
        uri: item.uri,
        popularity: item.popularity,
        preview_url: item.preview_url,
        album_image_url,
    }
}

fn basic_auth_header(config: &SpotifyConfig) -> String {
    let credentials = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", config.client_id, config.client_secret));
    format!("Basic {credentials}")
}

fn token_endpoint(accounts_base_url: &str) -> String {
    format!("{}/api/token", accounts_base_url.trim_end_matches('/'))
}

async fn request_token(
    http: &reqwest::Client,
    config: &SpotifyConfig,
    form: &[(&str, &str)],
) -> Result<String, PipelineError> {
    let endpoint = token_endpoint(&config.accounts_base_url);
    let response = http
        .post(&endpoint)
        .header(reqwest::header::AUTHORIZATION, basic_auth_header(config))
        .form(form)
        .send()
        .await
        .map_err(|err| PipelineError::upstream("music catalog", format!("POST {endpoint}: {err}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::upstream(
            "music catalog",
            format!("token request failed with status {status}"),
        ));
    }

    let token: TokenResponse = response.json().await.map_err(|err| {
        PipelineError::upstream("music catalog", format!("parse token response: {err}"))
    })?;
    Ok(token.access_token)
}

/// Search-only catalog session backed by the client-credentials grant.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    api_base_url: String,
    token: String,
}

impl SearchClient {
    pub async fn connect(
        http: reqwest::Client,
        config: &SpotifyConfig,
    ) -> Result<Self, PipelineError> {
        let token = request_token(&http, config, &[("grant_type", "client_credentials")]).await?;
        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    /// One catalog search for track results, normalized.
    pub async fn search_tracks(&self, query: &SearchQuery) -> Result<Vec<Track>, PipelineError> {
        let endpoint = format!("{}/search", self.api_base_url);
        let limit = query.limit.to_string();
        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.terms.as_str()),
                ("type", "track"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|err| {
                PipelineError::upstream("music catalog", format!("GET {endpoint}: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::upstream(
                "music catalog",
                format!("search failed with status {status}"),
            ));
        }

        let search: SearchResponse = response.json().await.map_err(|err| {
            PipelineError::upstream("music catalog", format!("parse search response: {err}"))
        })?;
        Ok(search.tracks.items.into_iter().map(normalize_track).collect())
    }
}

/// Pending authorization-code exchange. The caller presents
/// [`AuthRequest::authorize_url`] to the user and resumes the flow with the
/// pasted redirect URL (or bare code) via [`AuthRequest::exchange`].
#[derive(Debug)]
pub struct AuthRequest {
    config: SpotifyConfig,
    redirect_uri: String,
    authorize_url: String,
}

impl AuthRequest {
    pub fn new(config: SpotifyConfig) -> Result<Self, PipelineError> {
        let redirect_uri = config
            .redirect_uri
            .clone()
            .ok_or_else(|| PipelineError::Auth("no redirect URI configured".to_owned()))?;

        let base = format!(
            "{}/authorize",
            config.accounts_base_url.trim_end_matches('/')
        );
        let authorize_url = Url::parse_with_params(
            &base,
            &[
                ("client_id", config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", PLAYLIST_SCOPE),
            ],
        )
        .map_err(|err| PipelineError::Auth(format!("build authorize url: {err}")))?;

        Ok(Self {
            config,
            redirect_uri,
            authorize_url: authorize_url.to_string(),
        })
    }

    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    /// Complete the grant with the user-supplied code and open an
    /// authorized session.
    pub async fn exchange(
        self,
        http: reqwest::Client,
        pasted: &str,
    ) -> Result<UserSession, PipelineError> {
        let code = parse_authorization_code(pasted)?;
        let token = request_token(
            &http,
            &self.config,
            &[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
        )
        .await
        .map_err(|err| PipelineError::Auth(format!("code exchange failed: {err}")))?;

        Ok(UserSession {
            http,
            api_base_url: self.config.api_base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }
}

/// Accept either the full redirect URL the user landed on or the bare code.
pub fn parse_authorization_code(pasted: &str) -> Result<String, PipelineError> {
    let pasted = pasted.trim();
    if pasted.is_empty() {
        return Err(PipelineError::Auth(
            "no authorization code provided".to_owned(),
        ));
    }

    if pasted.starts_with("http://") || pasted.starts_with("https://") {
        let url = Url::parse(pasted)
            .map_err(|err| PipelineError::Auth(format!("parse redirect url: {err}")))?;
        return url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                PipelineError::Auth("redirect url has no code parameter".to_owned())
            });
    }

    Ok(pasted.to_owned())
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreatePlaylistResponse {
    id: String,
    external_urls: ExternalUrls,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    #[serde(default)]
    spotify: Option<String>,
}

/// Freshly created playlist handle.
#[derive(Debug, Clone)]
pub struct CreatedPlaylist {
    pub id: String,
    pub external_url: String,
}

/// Authorized user session; supports playlist creation and item inserts.
#[derive(Debug)]
pub struct UserSession {
    http: reqwest::Client,
    api_base_url: String,
    token: String,
}

impl UserSession {
    pub async fn current_user_id(&self) -> Result<String, PipelineError> {
        let endpoint = format!("{}/me", self.api_base_url);
        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| {
                PipelineError::upstream("music catalog", format!("GET {endpoint}: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::upstream(
                "music catalog",
                format!("current user request failed with status {status}"),
            ));
        }

        let user: CurrentUser = response.json().await.map_err(|err| {
            PipelineError::upstream("music catalog", format!("parse current user: {err}"))
        })?;
        Ok(user.id)
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<CreatedPlaylist, PipelineError> {
        let endpoint = format!("{}/users/{user_id}/playlists", self.api_base_url);
        let body = serde_json::json!({
            "name": name,
            "description": description,
            "public": public,
        });

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                PipelineError::upstream("music catalog", format!("POST {endpoint}: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::upstream(
                "music catalog",
                format!("playlist creation failed with status {status}"),
            ));
        }

        let created: CreatePlaylistResponse = response.json().await.map_err(|err| {
            PipelineError::upstream("music catalog", format!("parse playlist response: {err}"))
        })?;
        let external_url = created
            .external_urls
            .spotify
            .unwrap_or_else(|| format!("{}/playlists/{}", self.api_base_url, created.id));
        Ok(CreatedPlaylist {
            id: created.id,
            external_url,
        })
    }

    pub async fn add_items(&self, playlist_id: &str, uris: &[String]) -> Result<(), PipelineError> {
        let endpoint = format!("{}/playlists/{playlist_id}/tracks", self.api_base_url);
        let body = serde_json::json!({ "uris": uris });

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                PipelineError::upstream("music catalog", format!("POST {endpoint}: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::upstream(
                "music catalog",
                format!("adding tracks failed with status {status}"),
            ));
        }
        Ok(())
    }
}
