//! Project-local version file discovery.
//!
//! Walks from the working directory upward through parent directories,
//! then the user home directory, then the tool's root-level `version`
//! file; the first file with non-empty content wins. Formats: flat
//! trimmed string, asdf `.tool-versions` key-value lines, and TOML tables
//! with a `version` key.

use std::path::Path;

use crate::config::{Config, Tool};
use crate::error::{Result, TervError};

#[derive(Clone, Copy, Debug)]
enum FileFormat {
    /// Whole file content, trimmed.
    Flat,
    /// asdf-style `<name> <version>` lines.
    KeyValue(&'static str),
    /// TOML document with a top-level `version` entry.
    Toml,
}

#[derive(Clone, Copy, Debug)]
struct VersionFile {
    name: &'static str,
    format: FileFormat,
}

/// Candidate files for `tool`, ordered by preference.
fn version_files(tool: Tool) -> Vec<VersionFile> {
    let mut files = vec![VersionFile {
        name: tool.version_file_name(),
        format: FileFormat::Flat,
    }];
    match tool {
        Tool::Terraform => files.push(VersionFile {
            name: ".tfswitchrc",
            format: FileFormat::Flat,
        }),
        Tool::Terragrunt => files.push(VersionFile {
            name: ".tgswitch.toml",
            format: FileFormat::Toml,
        }),
        _ => {}
    }
    files.push(VersionFile {
        name: ".tool-versions",
        format: FileFormat::KeyValue(tool.asdf_name()),
    });
    files
}

/// Resolve the requested version for `tool` from the environment and
/// version files, or `None` when nothing pins a version.
pub fn resolve_version(conf: &Config, tool: Tool) -> Result<Option<String>> {
    if let Ok(forced) = std::env::var(format!("{}_VERSION", tool.env_prefix())) {
        if !forced.trim().is_empty() {
            return Ok(Some(forced.trim().to_string()));
        }
    }

    let files = version_files(tool);

    let mut user_path_done = false;
    let mut current = conf.work_path.clone();
    loop {
        if let Some(version) = read_version_from_dir(&current, &files)? {
            return Ok(Some(version));
        }
        if current == conf.user_path {
            user_path_done = true;
        }
        if !current.pop() {
            break;
        }
    }

    if !user_path_done {
        if let Some(version) = read_version_from_dir(&conf.user_path, &files)? {
            return Ok(Some(version));
        }
    }

    read_file(&conf.root_version_file(tool), FileFormat::Flat)
}

fn read_version_from_dir(dir: &Path, files: &[VersionFile]) -> Result<Option<String>> {
    for file in files {
        if let Some(version) = read_file(&dir.join(file.name), file.format)? {
            return Ok(Some(version));
        }
    }
    Ok(None)
}

fn read_file(path: &Path, format: FileFormat) -> Result<Option<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        // unreadable directories along the walk are not version files
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let version = match format {
        FileFormat::Flat => {
            let trimmed = content.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        FileFormat::KeyValue(key) => parse_key_value(&content, key),
        FileFormat::Toml => parse_toml(&content, path)?,
    };
    Ok(version)
}

fn parse_key_value(content: &str, key: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let mut parts = line.split_whitespace();
        if parts.next() == Some(key) {
            if let Some(version) = parts.next() {
                return Some(version.to_string());
            }
        }
    }
    None
}

fn parse_toml(content: &str, path: &Path) -> Result<Option<String>> {
    let value: toml::Value = content.parse().map_err(|err| {
        TervError::resolution(format!("failed to parse {}: {err}", path.display()))
    })?;
    Ok(value
        .get("version")
        .and_then(toml::Value::as_str)
        .map(str::to_string))
}
