//! IaC constraint scanner.
//!
//! Finds the version constraints a project declares in its
//! `terraform { required_version = "..." }` blocks. Files sharing a stem
//! across several extensions (`main.tf` vs `main.tf.json`) are parsed only
//! once, using the most preferred extension present. Read-only: the only
//! side effect is diagnostics through the reporter.

use std::collections::HashMap;
use std::path::Path;

use crate::config::{Config, Tool};
use crate::error::{Result, TervError};
use crate::reporter::Reporter;

const REQUIRED_VERSION: &str = "required_version";
const TERRAFORM_BLOCK: &str = "terraform";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Hcl,
    Json,
}

/// File extensions scanned for `tool`, ordered by preference.
fn extensions(tool: Tool) -> &'static [(&'static str, Format)] {
    match tool {
        Tool::Tofu => &[
            (".tofu", Format::Hcl),
            (".tofu.json", Format::Json),
            (".tf", Format::Hcl),
            (".tf.json", Format::Json),
        ],
        Tool::Terraform => &[(".tf", Format::Hcl), (".tf.json", Format::Json)],
        // the remaining tools do not declare version constraints in IaC files
        _ => &[],
    }
}

/// Scan the working directory for declared version constraints.
///
/// A parse error on any selected file aborts scanning; files that parse
/// but lack the attribute contribute nothing.
pub fn gather_required_version(conf: &Config, tool: Tool) -> Result<Vec<String>> {
    let exts = extensions(tool);
    if exts.is_empty() {
        return Ok(Vec::new());
    }

    conf.reporter.debug("Scan project to find IaC files");

    let entries = match std::fs::read_dir(&conf.work_path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    // group by stem, remembering which extensions are present
    let mut similar: HashMap<String, u32> = HashMap::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        for (index, (ext, _)) in exts.iter().enumerate() {
            if let Some(stem) = name.strip_suffix(ext) {
                *similar.entry(stem.to_string()).or_default() |= 1 << index;
                break;
            }
        }
    }

    let mut requireds = Vec::new();
    for (stem, ext_flags) in similar {
        let (ext, format) = preferred_ext(ext_flags, exts);
        let path = conf.work_path.join(format!("{stem}{ext}"));
        conf.reporter
            .debug(&format!("Read {}", path.display()));
        requireds.extend(extract_from_file(&path, format, conf.reporter.as_ref())?);
    }
    Ok(requireds)
}

fn preferred_ext(
    ext_flags: u32,
    exts: &'static [(&'static str, Format)],
) -> (&'static str, Format) {
    for (index, (ext, format)) in exts.iter().enumerate() {
        if ext_flags & (1 << index) != 0 {
            return (ext, *format);
        }
    }
    // the stem was grouped from one of the extensions
    (exts[0].0, exts[0].1)
}

fn extract_from_file(path: &Path, format: Format, reporter: &dyn Reporter) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Hcl => extract_from_hcl(&content, path),
        Format::Json => extract_from_json(&content, path, reporter),
    }
}

fn extract_from_hcl(content: &str, path: &Path) -> Result<Vec<String>> {
    let body = hcl::parse(content).map_err(|err| {
        TervError::resolution(format!("failed to parse {}: {err}", path.display()))
    })?;

    let mut requireds = Vec::new();
    for block in body.blocks() {
        if block.identifier() != TERRAFORM_BLOCK {
            continue;
        }
        for attr in block.body.attributes() {
            if attr.key() != REQUIRED_VERSION {
                continue;
            }
            if let hcl::Expression::String(value) = attr.expr() {
                requireds.push(value.clone());
            }
        }
    }
    Ok(requireds)
}

fn extract_from_json(content: &str, path: &Path, reporter: &dyn Reporter) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|err| {
        TervError::resolution(format!("failed to parse {}: {err}", path.display()))
    })?;

    let mut requireds = Vec::new();
    match value.get(TERRAFORM_BLOCK) {
        Some(serde_json::Value::Object(block)) => {
            collect_json_required(block, &mut requireds);
        }
        Some(serde_json::Value::Array(blocks)) => {
            for block in blocks {
                if let serde_json::Value::Object(block) = block {
                    collect_json_required(block, &mut requireds);
                }
            }
        }
        Some(_) => {
            reporter.warning(&format!(
                "unexpected terraform block shape in {}",
                path.display()
            ));
        }
        None => {}
    }
    Ok(requireds)
}

fn collect_json_required(
    block: &serde_json::Map<String, serde_json::Value>,
    requireds: &mut Vec<String>,
) {
    if let Some(serde_json::Value::String(value)) = block.get(REQUIRED_VERSION) {
        requireds.push(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conf(dir: &Path) -> Config {
        Config::for_root(dir)
    }

    #[test]
    fn extracts_from_hcl_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("versions.tf"),
            "terraform {\n  required_version = \">= 1.5.0, < 1.7.0\"\n}\n",
        )
        .unwrap();
        let found = gather_required_version(&conf(tmp.path()), Tool::Terraform).unwrap();
        assert_eq!(found, vec![">= 1.5.0, < 1.7.0".to_string()]);
    }

    #[test]
    fn extracts_from_json_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("versions.tf.json"),
            r#"{"terraform": {"required_version": ">= 1.2.0"}}"#,
        )
        .unwrap();
        let found = gather_required_version(&conf(tmp.path()), Tool::Terraform).unwrap();
        assert_eq!(found, vec![">= 1.2.0".to_string()]);
    }

    #[test]
    fn prefers_tofu_extension_for_same_stem() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("main.tofu"),
            "terraform {\n  required_version = \"1.7.0\"\n}\n",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("main.tf"),
            "terraform {\n  required_version = \"1.5.0\"\n}\n",
        )
        .unwrap();
        let found = gather_required_version(&conf(tmp.path()), Tool::Tofu).unwrap();
        assert_eq!(found, vec!["1.7.0".to_string()]);
    }

    #[test]
    fn file_without_block_contributes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.tf"), "resource \"null_resource\" \"x\" {}\n")
            .unwrap();
        let found = gather_required_version(&conf(tmp.path()), Tool::Terraform).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn malformed_file_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("broken.tf"), "terraform {\n").unwrap();
        assert!(gather_required_version(&conf(tmp.path()), Tool::Terraform).is_err());
    }

    #[test]
    fn tools_without_iac_extensions_scan_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("broken.tf"), "terraform {\n").unwrap();
        let found = gather_required_version(&conf(tmp.path()), Tool::Terragrunt).unwrap();
        assert!(found.is_empty());
    }
}
