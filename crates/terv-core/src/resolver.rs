//! Turns a free-form version request into a search predicate.
//!
//! Dispatch is ordered, first match wins: exact version, project-scanning
//! keywords, latest keywords, regex shortcuts, and finally a constraint
//! expression. The returned [`PredicateInfo`] is consumed by exactly one
//! search pass over local or remote candidates.

use regex::Regex;

use crate::config::{Config, Tool};
use crate::constraint::Constraint;
use crate::error::{Result, TervError};
use crate::iac;
use crate::version::ParsedVersion;

pub const LATEST: &str = "latest";
pub const LATEST_STABLE: &str = "latest-stable";
pub const LATEST_PRE: &str = "latest-pre";
pub const LATEST_ALLOWED: &str = "latest-allowed";
pub const MIN_REQUIRED: &str = "min-required";

const MIN_REGEX_PREFIX: &str = "min:";
const LATEST_REGEX_PREFIX: &str = "latest:";

/// A search predicate plus the direction of the single search pass that
/// will consume it.
pub struct PredicateInfo {
    pub predicate: Box<dyn Fn(&str) -> bool + Send + Sync>,
    pub search_descending: bool,
    /// Human-readable notes accumulated during resolution, flushed by the
    /// caller before the search outcome is reported.
    pub diagnostics: Vec<String>,
}

impl std::fmt::Debug for PredicateInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateInfo")
            .field("search_descending", &self.search_descending)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl PredicateInfo {
    fn new(
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        search_descending: bool,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            search_descending,
            diagnostics: Vec::new(),
        }
    }
}

/// Build the predicate for `requested`, consulting project files for the
/// scanning strategies. Errors abort the whole operation; no partial side
/// effects are possible here (reads only).
pub fn parse_predicate(conf: &Config, tool: Tool, requested: &str) -> Result<PredicateInfo> {
    if let ParsedVersion::Ordered(wanted) = ParsedVersion::parse(requested) {
        if crate::version::is_version(requested) {
            let predicate = move |candidate: &str| match ParsedVersion::parse(candidate) {
                ParsedVersion::Ordered(v) => v == wanted,
                ParsedVersion::Unordered => false,
            };
            return Ok(PredicateInfo::new(predicate, true));
        }
    }

    match requested {
        MIN_REQUIRED => constraint_predicate(conf, tool, false),
        LATEST_ALLOWED => constraint_predicate(conf, tool, true),
        LATEST | LATEST_STABLE => Ok(PredicateInfo::new(
            |candidate: &str| ParsedVersion::parse(candidate).is_stable(),
            true,
        )),
        LATEST_PRE => Ok(PredicateInfo::new(
            |candidate: &str| {
                matches!(ParsedVersion::parse(candidate), ParsedVersion::Ordered(_))
            },
            true,
        )),
        _ => {
            if let Some(expr) = requested.strip_prefix(MIN_REGEX_PREFIX) {
                return regex_predicate(expr, false);
            }
            if let Some(expr) = requested.strip_prefix(LATEST_REGEX_PREFIX) {
                return regex_predicate(expr, true);
            }

            let mut constraint = Constraint::parse(requested)?;
            if let Some(default) = default_constraint(conf, tool)? {
                constraint.and(default);
            }
            Ok(PredicateInfo::new(
                move |candidate: &str| constraint.matches(&ParsedVersion::parse(candidate)),
                true,
            ))
        }
    }
}

/// Gather declared constraints from project IaC files and the tool's
/// default constraint; fall back to latest-stable when nothing declares a
/// requirement.
fn constraint_predicate(conf: &Config, tool: Tool, descending: bool) -> Result<PredicateInfo> {
    let mut diagnostics = Vec::new();
    let mut constraint = Constraint::default();

    for expr in iac::gather_required_version(conf, tool)? {
        constraint.and(Constraint::parse(&expr)?);
    }
    if let Some(default) = default_constraint(conf, tool)? {
        constraint.and(default);
    }

    if constraint.is_empty() {
        diagnostics.push(format!(
            "no {} version requirement found in project files, fallback to latest-stable",
            tool.exec_name()
        ));
        let mut info = PredicateInfo::new(
            |candidate: &str| ParsedVersion::parse(candidate).is_stable(),
            true,
        );
        info.diagnostics = diagnostics;
        return Ok(info);
    }

    let mut info = PredicateInfo::new(
        move |candidate: &str| constraint.matches(&ParsedVersion::parse(candidate)),
        descending,
    );
    info.diagnostics = diagnostics;
    Ok(info)
}

/// Regex shortcut predicates, kept for backward compatibility. The match
/// runs against the raw version string.
fn regex_predicate(expr: &str, descending: bool) -> Result<PredicateInfo> {
    let re = Regex::new(expr)
        .map_err(|err| TervError::resolution(format!("invalid regex {expr:?}: {err}")))?;
    Ok(PredicateInfo::new(
        move |candidate: &str| re.is_match(candidate),
        descending,
    ))
}

/// The tool's default constraint: the `constraint` file under the tool's
/// install root, or the `<PREFIX>_DEFAULT_CONSTRAINT` variable.
fn default_constraint(conf: &Config, tool: Tool) -> Result<Option<Constraint>> {
    if let Ok(expr) = std::env::var(format!("{}_DEFAULT_CONSTRAINT", tool.env_prefix())) {
        if !expr.trim().is_empty() {
            return Constraint::parse(expr.trim()).map(Some);
        }
    }

    match std::fs::read_to_string(conf.constraint_file(tool)) {
        Ok(content) => {
            let content = content.trim();
            if content.is_empty() {
                Ok(None)
            } else {
                Constraint::parse(content).map(Some)
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
