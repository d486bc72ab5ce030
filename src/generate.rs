use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::{GenerateArgs, LookupArgs, PlaylistArgs, ProfileArgs, TracksArgs};
use crate::config::Config;

/// Run the whole pipeline into a workspace directory:
/// lookup -> profile -> tracks, optionally followed by playlist creation.
pub async fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let workspace_dir = PathBuf::from(&args.out);
    if workspace_dir.exists() {
        anyhow::bail!(
            "workspace output directory already exists: {}",
            workspace_dir.display()
        );
    }
    std::fs::create_dir_all(&workspace_dir)
        .with_context(|| format!("create workspace dir: {}", workspace_dir.display()))?;

    // Validate the full configuration up front so a missing credential
    // fails before the first network call, not between stages.
    Config::from_env(args.playlist).context("load configuration")?;

    let book_path = workspace_dir.join("book.json");
    let analysis_path = workspace_dir.join("analysis.txt");
    let profile_path = workspace_dir.join("profile.yaml");
    let tracks_path = workspace_dir.join("tracks.json");

    tracing::info!(title = %args.title, author = %args.author, "generate: lookup");
    crate::books::run(LookupArgs {
        title: args.title.clone(),
        author: args.author.clone(),
        language: args.language.clone(),
        out: book_path.to_string_lossy().to_string(),
        force: false,
    })
    .await
    .context("lookup")?;

    tracing::info!("generate: profile");
    crate::profile::run(ProfileArgs {
        book: book_path.to_string_lossy().to_string(),
        out: profile_path.to_string_lossy().to_string(),
        raw: Some(analysis_path.to_string_lossy().to_string()),
        force: false,
    })
    .await
    .context("profile")?;

    tracing::info!("generate: tracks");
    crate::matching::run(TracksArgs {
        profile: profile_path.to_string_lossy().to_string(),
        out: tracks_path.to_string_lossy().to_string(),
        max_tracks: args.max_tracks,
        force: false,
    })
    .await
    .context("tracks")?;

    if args.playlist {
        tracing::info!("generate: playlist");
        crate::playlist::run(PlaylistArgs {
            book: book_path.to_string_lossy().to_string(),
            profile: profile_path.to_string_lossy().to_string(),
            tracks: tracks_path.to_string_lossy().to_string(),
        })
        .await
        .context("playlist")?;
    }

    Ok(())
}
