//! Package manifest access: read and rewrite the version field.
//!
//! Supports `package.json` (top-level `"version"`) and `Cargo.toml`
//! (`[package] version`). Rewrites touch only the version value so the
//! rest of the file keeps its formatting.

use crate::domain::parse_version;
use crate::error::{ReleaseError, Result};
use regex::Regex;
use semver::Version;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Toml,
}

impl ManifestFormat {
    /// Pick the format from the file extension
    pub fn detect(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(ManifestFormat::Json),
            Some("toml") => Ok(ManifestFormat::Toml),
            _ => Err(ReleaseError::manifest(format!(
                "Unsupported manifest '{}': expected a .json or .toml file",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    format: ManifestFormat,
}

impl Manifest {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = ManifestFormat::detect(&path)?;
        Ok(Manifest { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ManifestFormat {
        self.format
    }

    /// Read and parse the current version
    pub fn version(&self) -> Result<Version> {
        let text = self.read()?;
        let raw = match self.format {
            ManifestFormat::Json => json_version(&text)?,
            ManifestFormat::Toml => toml_version(&text)?,
        };
        parse_version(&raw)
    }

    /// Replace the version value in place
    pub fn set_version(&self, version: &Version) -> Result<()> {
        let text = self.read()?;
        let span = match self.format {
            ManifestFormat::Json => json_version_span(&text)?,
            ManifestFormat::Toml => toml_version_span(&text)?,
        };

        let mut updated = String::with_capacity(text.len());
        updated.push_str(&text[..span.start]);
        updated.push_str(&version.to_string());
        updated.push_str(&text[span.end..]);

        fs::write(&self.path, updated).map_err(|e| {
            ReleaseError::manifest(format!("Cannot write {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(manifest = %self.path.display(), %version, "manifest version updated");
        Ok(())
    }

    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| {
            ReleaseError::manifest(format!("Cannot read {}: {}", self.path.display(), e))
        })
    }
}

fn json_version(text: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ReleaseError::manifest(format!("Invalid JSON manifest: {}", e)))?;
    value
        .get("version")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ReleaseError::manifest("Manifest has no string \"version\" field"))
}

fn toml_version(text: &str) -> Result<String> {
    let value: toml::Value = toml::from_str(text)
        .map_err(|e| ReleaseError::manifest(format!("Invalid TOML manifest: {}", e)))?;
    value
        .get("package")
        .and_then(|p| p.get("version"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ReleaseError::manifest("Manifest has no [package] version string"))
}

/// Byte range of the top-level version value inside a JSON manifest
///
/// Only keys of the outermost object count; nested objects may carry their
/// own `"version"` with the same value.
fn json_version_span(text: &str) -> Result<Range<usize>> {
    json_version(text)?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            b'"' => {
                let end = json_string_end(bytes, i)?;
                if depth == 1 && &text[i + 1..end] == "version" {
                    let colon = skip_whitespace(bytes, end + 1);
                    if bytes.get(colon) == Some(&b':') {
                        let value = skip_whitespace(bytes, colon + 1);
                        if bytes.get(value) == Some(&b'"') {
                            let value_end = json_string_end(bytes, value)?;
                            return Ok(value + 1..value_end);
                        }
                    }
                }
                i = end;
            }
            _ => {}
        }
        i += 1;
    }

    Err(ReleaseError::manifest(
        "Cannot locate the version field to rewrite",
    ))
}

/// Index of the quote closing the string that opens at `start`
fn json_string_end(bytes: &[u8], start: usize) -> Result<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Ok(i),
            _ => i += 1,
        }
    }
    Err(ReleaseError::manifest("Unterminated string in JSON manifest"))
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).map_or(false, |b| b.is_ascii_whitespace()) {
        i += 1;
    }
    i
}

/// Byte range of the `version` value inside the `[package]` table
///
/// Accepts basic and literal strings and headers followed by comments.
/// `[[...]]` headers end the table like any other header.
fn toml_version_span(text: &str) -> Result<Range<usize>> {
    toml_version(text)?;

    let version_key = Regex::new(r#"^\s*version\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .map_err(|e| ReleaseError::manifest(e.to_string()))?;

    let mut in_package = false;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_package = toml_table_name(trimmed) == Some("package");
        } else if in_package {
            let value = version_key
                .captures(line)
                .and_then(|c| c.get(1).or_else(|| c.get(2)));
            if let Some(m) = value {
                return Ok(offset + m.start()..offset + m.end());
            }
        }
        offset += line.len();
    }

    Err(ReleaseError::manifest(
        "Cannot locate the [package] version field to rewrite",
    ))
}

/// Name of the table a header line opens, `None` for an array of tables
fn toml_table_name(header: &str) -> Option<&str> {
    if header.starts_with("[[") {
        return None;
    }
    let close = header.find(']')?;
    Some(header[1..close].trim().trim_matches('"'))
}
