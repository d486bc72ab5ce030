use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::cli::ProfileArgs;
use crate::config::GeminiConfig;
use crate::error::PipelineError;
use crate::formats::{BookRecord, LookupRecord};
use crate::gemini;

/// Structured category -> terms mapping derived from generative-text
/// output. Term order within a category is significant (model priority);
/// absent categories have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    sections: BTreeMap<String, Vec<String>>,
}

pub const EMOTIONAL_TONES: &str = "Emotional Tones";
pub const GENRES: &str = "Genres";
pub const MOODS: &str = "Moods";
pub const TIME_PERIOD: &str = "Time Period/Cultural Context";
pub const KEYWORDS: &str = "Keywords";

impl Profile {
    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.sections.get(category).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sections
            .iter()
            .map(|(label, terms)| (label.as_str(), terms.as_slice()))
    }

    /// Canonical `Label: [a, b, c]` rendering. Parsing the rendered text
    /// yields an equal profile.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (label, terms) in &self.sections {
            out.push_str(label);
            out.push_str(": [");
            out.push_str(&terms.join(", "));
            out.push_str("]\n");
        }
        out
    }

    #[cfg(test)]
    pub fn from_sections(sections: &[(&str, &[&str])]) -> Self {
        let mut profile = Self::default();
        for (label, terms) in sections {
            profile.sections.insert(
                (*label).to_owned(),
                terms.iter().map(|t| (*t).to_owned()).collect(),
            );
        }
        profile
    }
}

/// Parse the model's free-text response into a [`Profile`].
///
/// Grammar per line: `label ':' content` where content is an optional
/// bracketed comma list. A no-colon line after a labeled line continues
/// the current category. A response with zero labeled lines is a parse
/// failure, never an empty profile.
pub fn parse_profile(text: &str) -> Result<Profile, PipelineError> {
    let mut profile = Profile::default();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((label, content)) = line.split_once(':') {
            let label = label.trim().to_owned();
            let terms = split_terms(strip_brackets(content.trim()));
            profile.sections.insert(label.clone(), terms);
            current = Some(label);
        } else if let Some(label) = &current
            && let Some(terms) = profile.sections.get_mut(label)
        {
            terms.extend(split_terms(strip_brackets(line)));
        }
    }

    if profile.is_empty() {
        return Err(PipelineError::Parse(
            "response contained no labeled sections".to_owned(),
        ));
    }
    Ok(profile)
}

/// Strip exactly one surrounding bracket pair, only when both sides match.
fn strip_brackets(content: &str) -> &str {
    content
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(content)
}

fn split_terms(content: &str) -> Vec<String> {
    content
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn build_prompt(book: &BookRecord) -> String {
    format!(
        "You are a music and literature expert. Based on the book details below, \
extract musical insights that would help create a fitting and emotionally \
resonant soundtrack.\n\
\n\
Title: {title}\n\
Author(s): {authors}\n\
Summary: {summary}\n\
\n\
Please analyze the story and return:\n\
\n\
1. Emotional Tones - the dominant emotional qualities of the book\n\
2. Genres - suitable music genres that match the overall tone and pacing\n\
3. Moods - key moods or emotional shifts across the book\n\
4. Time Period/Cultural Context - historical or cultural elements\n\
5. Keywords - 5-7 vivid, descriptive words ideal for searching music\n\
\n\
Respond strictly in this format:\n\
Emotional Tones: [comma-separated list]\n\
Genres: [comma-separated list]\n\
Moods: [comma-separated list]\n\
Time Period/Cultural Context: [brief description]\n\
Keywords: [comma-separated list]\n",
        title = book.title,
        authors = book.authors_joined(),
        summary = book.summary,
    )
}

/// Raw model text plus the profile parsed from it.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub raw_text: String,
    pub profile: Profile,
}

pub async fn extract_profile(
    client: &reqwest::Client,
    config: &GeminiConfig,
    book: &BookRecord,
) -> Result<Analysis, PipelineError> {
    let prompt = build_prompt(book);
    let endpoint = gemini::generate_endpoint(&config.base_url, &config.model);
    let raw_text = gemini::generate_text(client, &endpoint, &config.api_key, &prompt).await?;
    let profile = parse_profile(&raw_text)?;
    Ok(Analysis { raw_text, profile })
}

pub async fn run(args: ProfileArgs) -> anyhow::Result<()> {
    let config = GeminiConfig::from_env().context("load gemini config")?;

    let lookup_json = std::fs::read_to_string(&args.book)
        .with_context(|| format!("read book record: {}", &args.book))?;
    let lookup: LookupRecord =
        serde_json::from_str(&lookup_json).context("parse book record json")?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .context("build http client")?;

    tracing::info!(
        title = %lookup.book.title,
        model = %config.model,
        "profile: generate mood profile"
    );
    let analysis = extract_profile(&client, &config, &lookup.book).await?;

    if let Some(raw_path) = &args.raw {
        write_output(raw_path, &analysis.raw_text, args.force)
            .with_context(|| format!("write raw model text: {raw_path}"))?;
    }

    let yaml = serde_yaml::to_string(&analysis.profile).context("serialize profile yaml")?;
    write_output(&args.out, &yaml, args.force)
        .with_context(|| format!("write profile: {}", &args.out))?;

    print!("{}", analysis.profile.to_text());
    Ok(())
}

fn write_output(path: &str, contents: &str, force: bool) -> anyhow::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("open output: {path}"))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("write output: {path}"))?;
    Ok(())
}
