//! Profile file parser.
//!
//! Loads child profiles from JSON or TOML files and directories, and reports
//! the coercions applied to each rating.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::model::{AbilityProfile, Coercion, Dimension, Score};

/// On-disk profile encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    Json,
    Toml,
}

impl ProfileFormat {
    /// Format implied by a file extension, if recognised.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Parse profile text into a raw document.
pub fn parse_value_str(content: &str, format: ProfileFormat) -> Result<Value> {
    match format {
        ProfileFormat::Json => serde_json::from_str(content).context("failed to parse JSON"),
        ProfileFormat::Toml => toml::from_str(content).context("failed to parse TOML"),
    }
}

/// Parse profile text. Malformed ratings never fail; only malformed syntax does.
pub fn parse_profile_str(content: &str, format: ProfileFormat) -> Result<AbilityProfile> {
    parse_value_str(content, format).map(|doc| AbilityProfile::from_value(&doc))
}

/// Read a profile file into a raw document. Files without a `.json` or
/// `.toml` extension are tried as JSON, then as TOML.
pub fn read_profile_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile: {}", path.display()))?;

    match ProfileFormat::from_path(path) {
        Some(format) => parse_value_str(&content, format)
            .with_context(|| format!("invalid profile: {}", path.display())),
        None => parse_value_str(&content, ProfileFormat::Json)
            .or_else(|_| parse_value_str(&content, ProfileFormat::Toml))
            .with_context(|| {
                format!("profile is neither JSON nor TOML: {}", path.display())
            }),
    }
}

/// Parse a single profile file.
pub fn parse_profile(path: &Path) -> Result<AbilityProfile> {
    read_profile_value(path).map(|doc| AbilityProfile::from_value(&doc))
}

/// Recursively list `.json` and `.toml` files under `dir`, sorted by path.
pub fn profile_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    collect_profile_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_profile_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_profile_files(&path, files)?;
        } else if ProfileFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    Ok(())
}

/// Load every profile under `dir`. Files that fail to parse are skipped.
pub fn load_profile_directory(dir: &Path) -> Result<Vec<(PathBuf, AbilityProfile)>> {
    let mut profiles = Vec::new();
    for path in profile_files(dir)? {
        match parse_profile(&path) {
            Ok(profile) => profiles.push((path, profile)),
            Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
        }
    }
    Ok(profiles)
}

/// A non-fatal problem found in a profile document.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// Dotted field path, or `(root)`.
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Report everything the normalizer would silently fix in `document`.
pub fn validate_profile(document: &Value) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if !document.is_object() {
        warnings.push(ValidationWarning {
            field: "(root)".into(),
            message: "profile is not a mapping; every rating defaults to 3".into(),
        });
        return warnings;
    }

    let has_name = document
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !has_name {
        warnings.push(ValidationWarning {
            field: "name".into(),
            message: "name is missing".into(),
        });
    }

    for dimension in Dimension::ALL {
        let raw = dimension.raw_value(document);
        let (score, coercion) = Score::normalize(raw);
        let message = match coercion {
            Coercion::Exact => continue,
            Coercion::Missing => format!("missing, defaulted to {score}"),
            Coercion::Unparseable => format!(
                "{} is not an integer, defaulted to {score}",
                raw.map(Value::to_string).unwrap_or_default()
            ),
            Coercion::Truncated { from } => format!("{from} truncated to {score}"),
            Coercion::Clamped { from } => format!("{from} out of range, clamped to {score}"),
        };
        warnings.push(ValidationWarning {
            field: dimension.path(),
            message,
        });
    }

    warnings
}
