use crate::{
    backend::ReleaseBackend,
    error::{ReleaseProcessingError, SyncError},
    github::{GitHubRelease, ReleaseSource},
    release_notes::{contains_breaking_changes, extract_contributors, extract_version_and_date},
    revalidate::Revalidator,
    types::NewRelease,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

pub const MAX_PAGES: u32 = 5;
pub const PER_PAGE: u32 = 30;
pub const RELEASES_PAGE: &str = "/releases";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub fetched: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub created: usize,
}

pub fn process_release(
    release: &GitHubRelease,
    now: DateTime<Utc>,
) -> Result<NewRelease, ReleaseProcessingError> {
    let parsed = extract_version_and_date(release.title());
    if parsed.version.is_empty() {
        return Err(ReleaseProcessingError::MissingVersion(release.id));
    }
    let release_date = parsed
        .date
        .or_else(|| release.published_at.map(|published| published.date_naive()))
        .ok_or_else(|| ReleaseProcessingError::MissingDate(parsed.version.clone()))?;
    let github_id =
        i64::try_from(release.id).map_err(|_| ReleaseProcessingError::IdOutOfRange(release.id))?;

    let content = release.body.clone().unwrap_or_default();
    Ok(NewRelease {
        version: parsed.version,
        release_date,
        breaking_changes: contains_breaking_changes(&content),
        contributors: extract_contributors(&content),
        content,
        github_id,
        last_synced_at: now,
    })
}

async fn fetch_all<S: ReleaseSource>(source: &S) -> Result<Vec<GitHubRelease>, SyncError> {
    let mut releases = vec![];
    for page in 1..=MAX_PAGES {
        let batch = source.fetch_releases_page(page, PER_PAGE).await?;
        let last_page = batch.len() < PER_PAGE as usize;
        releases.extend(batch);
        if last_page {
            break;
        }
    }
    Ok(releases)
}

/// Pulls published releases from `source` and stores every version not yet
/// known to `backend`. A failed fetch aborts before anything is written;
/// releases that cannot be processed are logged and skipped.
pub async fn sync_releases<S: ReleaseSource, B: ReleaseBackend>(
    source: &S,
    backend: &B,
    revalidator: &Revalidator,
    now: DateTime<Utc>,
) -> Result<SyncSummary, SyncError> {
    let fetched = fetch_all(source).await?;
    let mut known_versions = backend.release_versions()?;
    let mut summary = SyncSummary {
        fetched: fetched.len(),
        ..Default::default()
    };

    for release in fetched.iter().filter(|r| !r.draft && !r.prerelease) {
        let new_release = match process_release(release, now) {
            Ok(new_release) => new_release,
            Err(err) => {
                warn!(?err, release_id = release.id, "Skipping release");
                summary.failed += 1;
                continue;
            }
        };

        if known_versions.contains(&new_release.version) {
            summary.skipped_existing += 1;
            continue;
        }
        known_versions.insert(new_release.version.clone());

        if backend.insert_release(new_release)? {
            summary.created += 1;
        } else {
            summary.skipped_existing += 1;
        }
    }

    info!(?summary, "Release sync finished");
    if summary.created > 0 {
        revalidator.revalidate_path(RELEASES_PAGE);
    }
    Ok(summary)
}
