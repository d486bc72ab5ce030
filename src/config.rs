use std::env;

pub const DEFAULT_BOOKS_BASE_URL: &str = "https://www.googleapis.com/books/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Book catalog lookup credentials and endpoint.
#[derive(Debug, Clone)]
pub struct BooksConfig {
    pub api_key: String,
    pub base_url: String,
}

impl BooksConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut reader = EnvReader::default();
        let config = Self::read(&mut reader);
        reader.finish()?;
        Ok(config)
    }

    fn read(reader: &mut EnvReader) -> Self {
        Self {
            api_key: reader.required("GOOGLE_BOOKS_API_KEY"),
            base_url: env_or("BOOKTRACK_BOOKS_BASE_URL", DEFAULT_BOOKS_BASE_URL),
        }
    }
}

/// Generative-text service credentials, endpoint, and model.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut reader = EnvReader::default();
        let config = Self::read(&mut reader);
        reader.finish()?;
        Ok(config)
    }

    fn read(reader: &mut EnvReader) -> Self {
        Self {
            api_key: reader.required("GEMINI_API_KEY"),
            base_url: env_or("BOOKTRACK_GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            model: env_or("BOOKTRACK_GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        }
    }
}

/// Music catalog credentials and endpoints. `redirect_uri` is only present
/// when loaded for playlist creation; search does not need it.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
    pub api_base_url: String,
    pub accounts_base_url: String,
}

impl SpotifyConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut reader = EnvReader::default();
        let config = Self::read(&mut reader, false);
        reader.finish()?;
        Ok(config)
    }

    pub fn from_env_with_redirect() -> anyhow::Result<Self> {
        let mut reader = EnvReader::default();
        let config = Self::read(&mut reader, true);
        reader.finish()?;
        Ok(config)
    }

    fn read(reader: &mut EnvReader, with_redirect: bool) -> Self {
        let redirect_uri = with_redirect.then(|| reader.required("SPOTIFY_REDIRECT_URI"));
        Self {
            client_id: reader.required("SPOTIFY_CLIENT_ID"),
            client_secret: reader.required("SPOTIFY_CLIENT_SECRET"),
            redirect_uri,
            api_base_url: env_or("BOOKTRACK_SPOTIFY_API_BASE_URL", DEFAULT_SPOTIFY_API_BASE_URL),
            accounts_base_url: env_or(
                "BOOKTRACK_SPOTIFY_ACCOUNTS_BASE_URL",
                DEFAULT_SPOTIFY_ACCOUNTS_BASE_URL,
            ),
        }
    }
}

/// Full pipeline configuration. Loading validates every required variable
/// up front and reports all missing ones in a single error.
#[derive(Debug, Clone)]
pub struct Config {
    pub books: BooksConfig,
    pub gemini: GeminiConfig,
    pub spotify: SpotifyConfig,
}

impl Config {
    pub fn from_env(with_playlist: bool) -> anyhow::Result<Self> {
        let mut reader = EnvReader::default();
        let config = Self {
            books: BooksConfig::read(&mut reader),
            gemini: GeminiConfig::read(&mut reader),
            spotify: SpotifyConfig::read(&mut reader, with_playlist),
        };
        reader.finish()?;
        Ok(config)
    }
}

#[derive(Debug, Default)]
struct EnvReader {
    missing: Vec<&'static str>,
}

impl EnvReader {
    fn required(&mut self, name: &'static str) -> String {
        match env::var(name) {
            Ok(value) if !value.trim().is_empty() => value,
            _ => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    fn finish(self) -> anyhow::Result<()> {
        if self.missing.is_empty() {
            return Ok(());
        }
        anyhow::bail!(
            "missing required environment variable(s): {}",
            self.missing.join(", ")
        );
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}
