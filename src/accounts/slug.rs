use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::store::AccountStore;
use crate::error::{AppResult, ValidationError};

static SEPARATOR_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_-]+").expect("invalid slug regex"));
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("invalid slug regex"));

/// Lowercases `value` and collapses everything outside `[a-z0-9_-]` into
/// single dashes. `"Acme, Inc."` becomes `"acme-inc"`.
pub fn parameterize(value: &str) -> String {
    let lowered = value.to_lowercase();
    let dashed = SEPARATOR_RUNS.replace_all(&lowered, "-");
    let collapsed = DASH_RUNS.replace_all(&dashed, "-");
    collapsed.trim_matches('-').to_string()
}

/// Derives a slug from `name` that no other account is using. On conflict a
/// UUID is appended so the slug stays stable for the lifetime of the account.
pub async fn unique_slug(store: &dyn AccountStore, name: &str) -> AppResult<String> {
    let candidate = parameterize(name);
    if candidate.is_empty() {
        return Err(ValidationError::BlankSlug.into());
    }
    if !store.slug_taken(&candidate).await? {
        return Ok(candidate);
    }
    let fallback = format!("{candidate}-{}", Uuid::new_v4());
    tracing::debug!(%candidate, %fallback, "slug candidate taken; appending uuid");
    Ok(fallback)
}
