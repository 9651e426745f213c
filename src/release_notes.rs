//! Parsing for the markdown release notes published on GitHub.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref VERSION_AND_DATE: Regex =
        Regex::new(r"^\s*(v?\d+\.\d+\.\d+(?:-[0-9A-Za-z.]+)?)\s*\((\d{4}-\d{2}-\d{2})\)").unwrap();
    static ref CONTRIBUTORS_HEADING: Regex =
        Regex::new(r"(?mi)^#{1,6}[^\n]*\bcontributors\b[^\n]*$").unwrap();
    static ref BULLET: Regex = Regex::new(
        r"^\s*[-*]\s+(?:\*\*(?P<scope>[^*]+?):\*\*\s*)?(?P<description>.+?)(?:\s*\(\[#(?P<pr>\d+)\]\([^)]*\)\))?(?:\s*\(\[(?P<commit>[0-9a-f]{7,40})\]\([^)]*\)\))?\s*$"
    )
    .unwrap();
}

const BREAKING_MARKERS: &[&str] = &["breaking change", "⚠ breaking", "⚠️ breaking", "💥"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionAndDate {
    pub version: String,
    pub date: Option<NaiveDate>,
}

/// Splits a release title such as `v3.28.1 (2024-05-01)` into its version
/// and date. Titles without a date keep their first word as the version.
pub fn extract_version_and_date(title: &str) -> VersionAndDate {
    if let Some(captures) = VERSION_AND_DATE.captures(title) {
        return VersionAndDate {
            version: captures[1].to_string(),
            date: NaiveDate::parse_from_str(&captures[2], "%Y-%m-%d").ok(),
        };
    }
    VersionAndDate {
        version: title.split_whitespace().next().unwrap_or_default().to_string(),
        date: None,
    }
}

pub fn contains_breaking_changes(body: &str) -> bool {
    let body = body.to_lowercase();
    BREAKING_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Everything below the `Contributors` heading, flattened into one
/// comma-separated line.
pub fn extract_contributors(body: &str) -> Option<String> {
    let heading = CONTRIBUTORS_HEADING.find(body)?;
    let contributors: Vec<&str> = body[heading.end()..]
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*'])
                .trim()
        })
        .filter(|line| !line.is_empty())
        .collect();

    if contributors.is_empty() {
        None
    } else {
        Some(contributors.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseNoteItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseNotes {
    pub bug_fixes: Vec<ReleaseNoteItem>,
    pub features: Vec<ReleaseNoteItem>,
    pub documentation: Vec<ReleaseNoteItem>,
    pub tests: Vec<ReleaseNoteItem>,
    pub chores: Vec<ReleaseNoteItem>,
    pub contributors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    BugFixes,
    Features,
    Documentation,
    Tests,
    Chores,
    Contributors,
}

fn classify_heading(heading: &str) -> Option<Section> {
    let heading = heading.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|marker| heading.contains(marker));

    if has(&["🐛", "bug fix"]) {
        Some(Section::BugFixes)
    } else if has(&["🚀", "✨", "feature"]) {
        Some(Section::Features)
    } else if has(&["📝", "📚", "documentation", "docs"]) {
        Some(Section::Documentation)
    } else if has(&["🧪", "✅", "tests"]) {
        Some(Section::Tests)
    } else if has(&["🏡", "🔧", "chore"]) {
        Some(Section::Chores)
    } else if has(&["🤝", "contributors"]) {
        Some(Section::Contributors)
    } else {
        None
    }
}

fn parse_item(line: &str) -> Option<ReleaseNoteItem> {
    let captures = BULLET.captures(line)?;
    Some(ReleaseNoteItem {
        scope: captures.name("scope").map(|m| m.as_str().trim().to_string()),
        description: captures["description"].trim().to_string(),
        pr: captures.name("pr").and_then(|m| m.as_str().parse().ok()),
        commit: captures.name("commit").map(|m| m.as_str().to_string()),
    })
}

/// Sorts the bullet points of a release body into their sections. Bullets
/// under unrecognised headings are dropped.
pub fn parse_release_notes(body: &str) -> ReleaseNotes {
    let mut notes = ReleaseNotes::default();
    let mut section = None;

    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            section = classify_heading(trimmed);
            continue;
        }
        let (Some(current), Some(item)) = (section, parse_item(line)) else {
            continue;
        };
        match current {
            Section::BugFixes => notes.bug_fixes.push(item),
            Section::Features => notes.features.push(item),
            Section::Documentation => notes.documentation.push(item),
            Section::Tests => notes.tests.push(item),
            Section::Chores => notes.chores.push(item),
            Section::Contributors => notes.contributors.push(item.description),
        }
    }
    notes
}
