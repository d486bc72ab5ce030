use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::TracksArgs;
use crate::config::SpotifyConfig;
use crate::error::PipelineError;
use crate::formats::{SearchQuery, Track, TrackListRecord};
use crate::profile::{self, Profile};
use crate::spotify::SearchClient;

pub const DEFAULT_MAX_TRACKS: usize = 15;

fn weighted_limit(max_tracks: usize, percent: usize) -> usize {
    max_tracks * percent / 100
}

/// Deterministic, profile-driven query plan. Queries for an absent
/// category are simply not generated.
pub fn query_plan(profile: &Profile, max_tracks: usize) -> Vec<SearchQuery> {
    let mut plan = Vec::new();

    if let Some(genres) = profile.get(profile::GENRES) {
        let limit = weighted_limit(max_tracks, 25);
        for genre in genres {
            plan.push(SearchQuery {
                terms: format!("genre:\"{genre}\""),
                limit,
            });
        }
    }

    if let (Some(tones), Some(genres)) = (
        profile.get(profile::EMOTIONAL_TONES),
        profile.get(profile::GENRES),
    ) {
        let limit = weighted_limit(max_tracks, 30);
        for tone in tones.iter().take(2) {
            for genre in genres.iter().take(2) {
                plan.push(SearchQuery {
                    terms: format!("{tone} {genre}"),
                    limit,
                });
            }
        }
    }

    if let Some(moods) = profile.get(profile::MOODS) {
        let limit = weighted_limit(max_tracks, 30);
        for mood in moods.iter().take(3) {
            plan.push(SearchQuery {
                terms: mood.clone(),
                limit,
            });
        }
    }

    if let Some(keywords) = profile.get(profile::KEYWORDS) {
        let limit = weighted_limit(max_tracks, 15);
        for keyword in keywords {
            plan.push(SearchQuery {
                terms: keyword.clone(),
                limit,
            });
        }
    }

    plan
}

/// Deduplicate by id (first occurrence wins), stable-sort by popularity
/// descending, truncate to `max_tracks`.
pub fn rank_tracks(found: Vec<Track>, max_tracks: usize) -> Vec<Track> {
    let mut seen = HashSet::new();
    let mut tracks: Vec<Track> = found
        .into_iter()
        .filter(|track| seen.insert(track.id.clone()))
        .collect();
    tracks.sort_by(|a, b| b.popularity.cmp(&a.popularity));
    tracks.truncate(max_tracks);
    tracks
}

/// Run the query plan against the catalog and rank the aggregate.
///
/// Queries are issued and awaited in turn; a failing query is logged and
/// skipped without aborting the stage. An empty ranked list is
/// [`PipelineError::NoResults`], except when `max_tracks == 0`, which is a
/// valid "nothing requested" outcome.
pub async fn match_tracks(
    client: &SearchClient,
    profile: &Profile,
    max_tracks: usize,
) -> Result<Vec<Track>, PipelineError> {
    let plan = query_plan(profile, max_tracks);
    tracing::info!(queries = plan.len(), max_tracks, "matching: run query plan");

    let mut found = Vec::new();
    for query in &plan {
        if query.limit == 0 {
            tracing::debug!(terms = %query.terms, "matching: zero-limit query skipped");
            continue;
        }
        match client.search_tracks(query).await {
            Ok(tracks) => {
                tracing::debug!(terms = %query.terms, hits = tracks.len(), "matching: query done");
                found.extend(tracks);
            }
            Err(err) => {
                tracing::warn!(terms = %query.terms, error = %err, "matching: query failed; skipping");
            }
        }
    }

    let ranked = rank_tracks(found, max_tracks);
    if ranked.is_empty() && max_tracks > 0 {
        return Err(PipelineError::NoResults);
    }
    Ok(ranked)
}

pub async fn run(args: TracksArgs) -> anyhow::Result<()> {
    let config = SpotifyConfig::from_env().context("load music catalog config")?;

    let profile_yaml = std::fs::read_to_string(&args.profile)
        .with_context(|| format!("read profile: {}", &args.profile))?;
    let profile: Profile = serde_yaml::from_str(&profile_yaml).context("parse profile yaml")?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("build http client")?;
    let client = SearchClient::connect(http, &config).await?;

    let tracks = match_tracks(&client, &profile, args.max_tracks).await?;

    for (rank, track) in tracks.iter().enumerate() {
        println!(
            "{:>2}. {} - {} [{}] ({}/100)",
            rank + 1,
            track.name,
            track.artist,
            track.album,
            track.popularity
        );
    }

    let record = TrackListRecord {
        retrieved_at: chrono::Utc::now().to_rfc3339(),
        max_tracks: args.max_tracks,
        tracks,
    };
    let json = serde_json::to_string_pretty(&record).context("serialize track list")?;

    let mut options = OpenOptions::new();
    options.write(true);
    if args.force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut out = options
        .open(&args.out)
        .with_context(|| format!("open track list output: {}", &args.out))?;
    out.write_all(json.as_bytes())
        .with_context(|| format!("write track list: {}", &args.out))?;
    out.write_all(b"\n").context("write trailing newline")?;

    Ok(())
}
