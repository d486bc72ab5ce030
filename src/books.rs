use std::fs::OpenOptions;
use std::io::Write as _;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::cli::LookupArgs;
use crate::config::BooksConfig;
use crate::error::PipelineError;
use crate::formats::{BookRecord, LookupRecord};

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const NO_DESCRIPTION: &str = "No description available.";

/// One catalog query attempt. Strategies run in order; the first one that
/// returns at least one volume wins.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchStrategy {
    query: String,
    lang_restrict: Option<String>,
}

fn search_strategies(title: &str, author: &str, language: &str) -> Vec<SearchStrategy> {
    vec![
        // Exact-quoted title and author.
        SearchStrategy {
            query: format!("intitle:\"{title}\" inauthor:\"{author}\""),
            lang_restrict: None,
        },
        // Relaxed field filters.
        SearchStrategy {
            query: format!("intitle:{title} inauthor:{author}"),
            lang_restrict: None,
        },
        // Plain terms with a language restriction.
        SearchStrategy {
            query: format!("{title} {author}"),
            lang_restrict: Some(language.to_owned()),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    authors: Option<Vec<String>>,
    description: Option<String>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

fn normalize_volume(info: VolumeInfo) -> BookRecord {
    let authors = match info.authors {
        Some(authors) if !authors.is_empty() => authors,
        _ => vec![UNKNOWN_AUTHOR.to_owned()],
    };
    BookRecord {
        title: info.title.unwrap_or_else(|| "Unknown Title".to_owned()),
        authors,
        summary: info
            .description
            .filter(|description| !description.trim().is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_owned()),
        cover_image_url: info
            .image_links
            .and_then(|links| links.thumbnail.or(links.small_thumbnail)),
    }
}

/// Look a book up by title and author and normalize the first match.
///
/// Every strategy returning zero items is [`PipelineError::NotFound`]; a
/// non-success status or malformed payload aborts the whole lookup with
/// [`PipelineError::Upstream`].
pub async fn lookup(
    client: &reqwest::Client,
    config: &BooksConfig,
    title: &str,
    author: &str,
    language: &str,
) -> Result<BookRecord, PipelineError> {
    let endpoint = format!("{}/volumes", config.base_url.trim_end_matches('/'));

    for strategy in search_strategies(title, author, language) {
        let mut params = vec![
            ("q", strategy.query.clone()),
            ("maxResults", "10".to_owned()),
            ("key", config.api_key.clone()),
        ];
        if let Some(lang) = &strategy.lang_restrict {
            params.push(("langRestrict", lang.clone()));
        }

        let response = client
            .get(&endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|err| PipelineError::upstream("book catalog", format!("GET {endpoint}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::upstream(
                "book catalog",
                format!("unexpected status {status}"),
            ));
        }

        let volumes: VolumesResponse = response.json().await.map_err(|err| {
            PipelineError::upstream("book catalog", format!("parse volumes response: {err}"))
        })?;

        if let Some(volume) = volumes.items.into_iter().next() {
            tracing::debug!(query = %strategy.query, "lookup: strategy matched");
            return Ok(normalize_volume(volume.volume_info));
        }
        tracing::debug!(query = %strategy.query, "lookup: no items; trying next strategy");
    }

    Err(PipelineError::NotFound)
}

pub async fn run(args: LookupArgs) -> anyhow::Result<()> {
    if args.title.trim().is_empty() {
        anyhow::bail!("--title must not be empty");
    }
    if args.author.trim().is_empty() {
        anyhow::bail!("--author must not be empty");
    }

    let config = BooksConfig::from_env().context("load book catalog config")?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("build http client")?;

    tracing::info!(title = %args.title, author = %args.author, "lookup: query catalog");
    let book = lookup(&client, &config, &args.title, &args.author, &args.language).await?;
    tracing::info!(title = %book.title, authors = %book.authors_joined(), "lookup: matched");

    let record = LookupRecord {
        retrieved_at: chrono::Utc::now().to_rfc3339(),
        book,
    };
    let json = serde_json::to_string_pretty(&record).context("serialize book record")?;

    let mut options = OpenOptions::new();
    options.write(true);
    if args.force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut out = options
        .open(&args.out)
        .with_context(|| format!("open book record output: {}", &args.out))?;
    out.write_all(json.as_bytes())
        .with_context(|| format!("write book record: {}", &args.out))?;
    out.write_all(b"\n").context("write trailing newline")?;

    Ok(())
}
