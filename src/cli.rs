use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Generate(GenerateArgs),
    Lookup(LookupArgs),
    Profile(ProfileArgs),
    Tracks(TracksArgs),
    Playlist(PlaylistArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Book title to look up.
    #[arg(long)]
    pub title: String,

    /// Book author to look up.
    #[arg(long)]
    pub author: String,

    /// Language restriction for the plain-terms lookup fallback.
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Output directory for the workspace (book/profile/tracks stage files).
    #[arg(long)]
    pub out: String,

    /// Maximum number of tracks in the final ranked list.
    #[arg(long, default_value_t = crate::matching::DEFAULT_MAX_TRACKS)]
    pub max_tracks: usize,

    /// Also create a playlist (interactive authorization).
    #[arg(long, default_value_t = false)]
    pub playlist: bool,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Book title to look up.
    #[arg(long)]
    pub title: String,

    /// Book author to look up.
    #[arg(long)]
    pub author: String,

    /// Language restriction for the plain-terms lookup fallback.
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Output file path for the book record (`book.json`).
    #[arg(long)]
    pub out: String,

    /// Overwrite the output file if it already exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Input path to the book record (created by `lookup`).
    #[arg(long)]
    pub book: String,

    /// Output file path for the mood profile (`profile.yaml`).
    #[arg(long)]
    pub out: String,

    /// Also write the raw model text to this path.
    #[arg(long)]
    pub raw: Option<String>,

    /// Overwrite output files if they already exist.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct TracksArgs {
    /// Input path to the mood profile (created by `profile`).
    #[arg(long)]
    pub profile: String,

    /// Output file path for the ranked track list (`tracks.json`).
    #[arg(long)]
    pub out: String,

    /// Maximum number of tracks in the final ranked list.
    #[arg(long, default_value_t = crate::matching::DEFAULT_MAX_TRACKS)]
    pub max_tracks: usize,

    /// Overwrite the output file if it already exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct PlaylistArgs {
    /// Input path to the book record (created by `lookup`).
    #[arg(long)]
    pub book: String,

    /// Input path to the mood profile (created by `profile`).
    #[arg(long)]
    pub profile: String,

    /// Input path to the ranked track list (created by `tracks`).
    #[arg(long)]
    pub tracks: String,
}
