//! Club suggestions: ask the generative model first, fall back to keyword
//! scoring when it is disabled, fails, times out or answers off-list.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::models::ClubSummary;

/// `clubName` returned when nothing in the list fits the interest.
pub const NO_MATCH: &str = "No strong match";

const STOP_WORDS: &[&str] = &[
    "and", "are", "but", "for", "from", "into", "like", "love", "the", "that", "this", "want",
    "with", "about", "enjoy", "club", "clubs", "interested", "interest", "really", "some",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub club_name: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed model output: {0}")]
    Malformed(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}

/// A remote model that maps an interest and a club list to one suggestion.
#[async_trait]
pub trait SuggestionModel: Send + Sync {
    async fn suggest(
        &self,
        interest: &str,
        clubs: &[ClubSummary],
    ) -> Result<Suggestion, ModelError>;
}

/// Trimmed interest, or `BadRequest` when blank.
pub fn required_interest(interest: &str) -> AppResult<&str> {
    let interest = interest.trim();
    if interest.is_empty() {
        return Err(AppError::BadRequest("Interest is required".into()));
    }
    Ok(interest)
}

#[derive(Clone)]
pub struct Resolver {
    model: Option<Arc<dyn SuggestionModel>>,
    timeout: Duration,
}

impl Resolver {
    pub fn new(model: Option<Arc<dyn SuggestionModel>>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub async fn resolve(&self, interest: &str, clubs: &[ClubSummary]) -> AppResult<Suggestion> {
        let interest = required_interest(interest)?;
        if clubs.is_empty() {
            return Ok(Suggestion {
                club_name: NO_MATCH.to_string(),
                reason: "There are no active clubs to suggest yet. Check back soon or start one yourself!"
                    .to_string(),
            });
        }

        if let Some(model) = &self.model {
            match self.ask_model(model.as_ref(), interest, clubs).await {
                Ok(suggestion) => return Ok(suggestion),
                Err(e) => {
                    tracing::warn!(error = %e, "AI club suggestion failed, using keyword fallback")
                }
            }
        }

        Ok(fallback(interest, clubs))
    }

    async fn ask_model(
        &self,
        model: &dyn SuggestionModel,
        interest: &str,
        clubs: &[ClubSummary],
    ) -> Result<Suggestion, ModelError> {
        let answer = tokio::time::timeout(self.timeout, model.suggest(interest, clubs))
            .await
            .map_err(|_| ModelError::Timeout(self.timeout))??;
        validate(answer, clubs)
    }
}

/// Accepts a model answer only if it names a listed club; normalises the
/// name to the list's spelling.
fn validate(answer: Suggestion, clubs: &[ClubSummary]) -> Result<Suggestion, ModelError> {
    let name = answer.club_name.trim();
    let reason = answer.reason.trim();
    if reason.is_empty() {
        return Err(ModelError::Malformed("empty reason".into()));
    }
    let club = clubs
        .iter()
        .find(|c| c.name.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| ModelError::Malformed(format!("unknown club {name:?}")))?;
    Ok(Suggestion {
        club_name: club.name.clone(),
        reason: reason.to_string(),
    })
}

fn tokenize(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Equal, or the shorter (at least 4 chars) is a prefix of the longer:
/// "photo" matches "photography", "games" matches "game".
fn words_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.chars().count() >= 4 && long.starts_with(short)
}

fn field_matches(token: &str, words: &[String]) -> bool {
    words.iter().any(|w| words_match(token, w))
}

/// Name hits weigh 3, category or tag hits 2, description hits 1.
fn score<'a>(tokens: &'a [String], club: &ClubSummary) -> (u32, Vec<&'a str>) {
    let name = tokenize(&club.name);
    let mut labels = tokenize(&club.category);
    for tag in &club.tags {
        labels.extend(tokenize(tag));
    }
    let description = tokenize(&club.description);

    let mut total = 0;
    let mut matched = Vec::new();
    for token in tokens {
        let mut hit = 0;
        if field_matches(token, &name) {
            hit += 3;
        }
        if field_matches(token, &labels) {
            hit += 2;
        }
        if field_matches(token, &description) {
            hit += 1;
        }
        if hit > 0 {
            total += hit;
            matched.push(token.as_str());
        }
    }
    (total, matched)
}

/// Deterministic keyword scoring. The highest score wins; ties keep the
/// earlier club in `clubs`.
pub fn fallback(interest: &str, clubs: &[ClubSummary]) -> Suggestion {
    let tokens = tokenize(interest);

    let mut best: Option<(u32, Vec<&str>, &ClubSummary)> = None;
    for club in clubs {
        let (points, matched) = score(&tokens, club);
        if points == 0 {
            continue;
        }
        if best.as_ref().map_or(true, |(top, _, _)| points > *top) {
            best = Some((points, matched, club));
        }
    }

    match best {
        Some((_, matched, club)) => {
            let mut reason = format!(
                "{} lines up with your interest in {}.",
                club.name,
                matched.join(", ")
            );
            let description = club.description.trim();
            if !description.is_empty() {
                reason.push(' ');
                reason.push_str(description);
            }
            Suggestion {
                club_name: club.name.clone(),
                reason,
            }
        }
        None => Suggestion {
            club_name: NO_MATCH.to_string(),
            reason: format!(
                "None of the current clubs closely match \"{}\". Browse the full list or start a club around it.",
                interest.trim()
            ),
        },
    }
}
