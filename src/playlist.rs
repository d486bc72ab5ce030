use std::io::{BufRead as _, Write as _};
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::PlaylistArgs;
use crate::config::SpotifyConfig;
use crate::error::PipelineError;
use crate::formats::{BookRecord, LookupRecord, Track, TrackListRecord};
use crate::profile::{self, Profile};
use crate::spotify::{AuthRequest, UserSession};

/// The playlist service truncates descriptions at this length.
pub const MAX_DESCRIPTION_CHARS: usize = 300;
pub const TRACK_BATCH_SIZE: usize = 50;

pub fn playlist_name(book: &BookRecord) -> String {
    format!("{} - Literary Soundtrack", book.title)
}

/// Compose the full description, then hard-truncate to the service limit.
/// Truncation never preserves word boundaries.
pub fn playlist_description(book: &BookRecord, profile: &Profile) -> String {
    let mut elements = Vec::new();
    if let Some(genres) = profile.get(profile::GENRES)
        && !genres.is_empty()
    {
        elements.push(format!("Genres: {}", join_first(genres, 3)));
    }
    if let Some(moods) = profile.get(profile::MOODS)
        && !moods.is_empty()
    {
        elements.push(format!("Moods: {}", join_first(moods, 3)));
    }

    let mut description = format!(
        "A curated soundtrack for {} by {}.",
        book.title,
        book.authors_joined()
    );
    if !elements.is_empty() {
        description.push(' ');
        description.push_str(&elements.join(" | "));
    }

    truncate_chars(description, MAX_DESCRIPTION_CHARS)
}

fn join_first(terms: &[String], count: usize) -> String {
    terms
        .iter()
        .take(count)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate_chars(input: String, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let mut out = input;
            out.truncate(idx);
            out
        }
        None => input,
    }
}

/// Create the playlist and add the ranked tracks in fixed batches.
///
/// A failing batch aborts the remaining ones; the playlist stays partially
/// populated (no rollback). Returns the external playlist URL.
pub async fn create_playlist(
    session: &UserSession,
    book: &BookRecord,
    tracks: &[Track],
    profile: &Profile,
) -> Result<String, PipelineError> {
    let user_id = session.current_user_id().await?;
    let name = playlist_name(book);
    let description = playlist_description(book, profile);

    let created = session
        .create_playlist(&user_id, &name, &description, true)
        .await?;
    tracing::info!(playlist_id = %created.id, name = %name, "playlist: created");

    let uris: Vec<String> = tracks.iter().map(|track| track.uri.clone()).collect();
    for (batch_index, batch) in uris.chunks(TRACK_BATCH_SIZE).enumerate() {
        session.add_items(&created.id, batch).await?;
        tracing::debug!(batch = batch_index, items = batch.len(), "playlist: batch added");
    }

    Ok(created.external_url)
}

pub async fn run(args: PlaylistArgs) -> anyhow::Result<()> {
    let config = SpotifyConfig::from_env_with_redirect().context("load music catalog config")?;

    let lookup_json = std::fs::read_to_string(&args.book)
        .with_context(|| format!("read book record: {}", &args.book))?;
    let lookup: LookupRecord =
        serde_json::from_str(&lookup_json).context("parse book record json")?;

    let profile_yaml = std::fs::read_to_string(&args.profile)
        .with_context(|| format!("read profile: {}", &args.profile))?;
    let profile: Profile = serde_yaml::from_str(&profile_yaml).context("parse profile yaml")?;

    let tracks_json = std::fs::read_to_string(&args.tracks)
        .with_context(|| format!("read track list: {}", &args.tracks))?;
    let track_list: TrackListRecord =
        serde_json::from_str(&tracks_json).context("parse track list json")?;
    if track_list.tracks.is_empty() {
        anyhow::bail!("track list is empty: {}", &args.tracks);
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("build http client")?;

    let request = AuthRequest::new(config)?;
    println!("Visit this URL to authorize the application:");
    println!("{}", request.authorize_url());
    print!("Paste the redirect URL (or the code) here: ");
    std::io::stdout().flush().context("flush prompt")?;

    let mut pasted = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut pasted)
        .context("read authorization code")?;

    let session = request.exchange(http, &pasted).await?;
    let url = create_playlist(&session, &lookup.book, &track_list.tracks, &profile).await?;

    println!("{url}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> BookRecord {
        BookRecord {
            title: "Pride and Prejudice".to_owned(),
            authors: vec!["Jane Austen".to_owned()],
            summary: "Witty social commentary and romance.".to_owned(),
            cover_image_url: None,
        }
    }

    #[test]
    fn playlist_name_appends_suffix() {
        assert_eq!(
            playlist_name(&book()),
            "Pride and Prejudice - Literary Soundtrack"
        );
    }

    #[test]
    fn description_takes_first_three_genres_and_moods() {
        let profile = Profile::from_sections(&[
            (profile::GENRES, &["A", "B", "C", "D"]),
            (profile::MOODS, &["M1", "M2", "M3", "M4"]),
        ]);
        let description = playlist_description(&book(), &profile);

        assert_eq!(
            description,
            "A curated soundtrack for Pride and Prejudice by Jane Austen. \
Genres: A, B, C | Moods: M1, M2, M3"
        );
        assert!(!description.contains('D'));
        assert!(!description.contains("M4"));
    }

    #[test]
    fn description_omits_absent_categories() {
        let profile = Profile::from_sections(&[(profile::KEYWORDS, &["rain"])]);
        assert_eq!(
            playlist_description(&book(), &profile),
            "A curated soundtrack for Pride and Prejudice by Jane Austen."
        );
    }

    #[test]
    fn description_truncates_after_composition() {
        let long_genre = "g".repeat(200);
        let long_mood = "m".repeat(200);
        let profile = Profile::from_sections(&[
            (profile::GENRES, &[long_genre.as_str()]),
            (profile::MOODS, &[long_mood.as_str()]),
        ]);

        let description = playlist_description(&book(), &profile);
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
        // Composition happens first, so the genre section survives and the
        // mood tail is what gets cut.
        assert!(description.contains(&long_genre));
    }

    #[test]
    fn truncate_chars_respects_multibyte_boundaries() {
        let input = "é".repeat(310);
        let out = truncate_chars(input, MAX_DESCRIPTION_CHARS);
        assert_eq!(out.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn short_descriptions_are_untouched() {
        let input = "short".to_owned();
        assert_eq!(truncate_chars(input.clone(), MAX_DESCRIPTION_CHARS), input);
    }
}
