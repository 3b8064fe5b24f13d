//! Version parsing and total ordering over version strings.
//!
//! Release tags in the wild are messier than strict semver: `v1.6.0`,
//! `1.2`, `alpha20240216`. Parsing is lenient (leading `v` stripped,
//! missing components padded) and anything still unparsable becomes a
//! distinguished [`ParsedVersion::Unordered`] value that sorts before every
//! parsable version, so sorting never fails.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;
use semver::Version;

const VERSION_PATTERN: &str = r"v?[0-9]+(\.[0-9]+){0,2}(-[0-9A-Za-z.-]+)?|alpha-?[0-9]+";

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VERSION_PATTERN).unwrap())
}

fn exact_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!("^({VERSION_PATTERN})$")).unwrap())
}

/// A normalized version, or a marker for strings no parser accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedVersion {
    Ordered(Version),
    Unordered,
}

impl ParsedVersion {
    /// Lenient parse: strips a leading `v`, pads missing minor/patch
    /// components, maps `alphaN` to a prerelease of 0.0.0.
    pub fn parse(raw: &str) -> ParsedVersion {
        let raw = raw.trim();
        let raw = raw.strip_prefix('v').unwrap_or(raw);
        if raw.is_empty() {
            return ParsedVersion::Unordered;
        }

        if let Some(alpha) = raw.strip_prefix("alpha") {
            let alpha = alpha.strip_prefix('-').unwrap_or(alpha);
            if alpha.chars().all(|c| c.is_ascii_digit()) && !alpha.is_empty() {
                if let Ok(v) = Version::parse(&format!("0.0.0-alpha{alpha}")) {
                    return ParsedVersion::Ordered(v);
                }
            }
            return ParsedVersion::Unordered;
        }

        let (numbers, rest) = match raw.find(['-', '+']) {
            Some(idx) => raw.split_at(idx),
            None => (raw, ""),
        };
        let padded = match numbers.split('.').count() {
            1 => format!("{numbers}.0.0{rest}"),
            2 => format!("{numbers}.0{rest}"),
            _ => raw.to_string(),
        };
        match Version::parse(&padded) {
            Ok(v) => ParsedVersion::Ordered(v),
            Err(_) => ParsedVersion::Unordered,
        }
    }

    /// The canonical `major.minor.patch[-pre]` form, if parsable.
    pub fn canonical(&self) -> Option<String> {
        match self {
            ParsedVersion::Ordered(v) => Some(v.to_string()),
            ParsedVersion::Unordered => None,
        }
    }

    pub fn is_stable(&self) -> bool {
        match self {
            ParsedVersion::Ordered(v) => v.pre.is_empty(),
            ParsedVersion::Unordered => false,
        }
    }
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ParsedVersion::Ordered(a), ParsedVersion::Ordered(b)) => a.cmp(b),
            (ParsedVersion::Unordered, ParsedVersion::Unordered) => Ordering::Equal,
            (ParsedVersion::Unordered, ParsedVersion::Ordered(_)) => Ordering::Less,
            (ParsedVersion::Ordered(_), ParsedVersion::Unordered) => Ordering::Greater,
        }
    }
}

/// Total preorder over raw version strings. Unparsable strings compare
/// as older than any parsable one and equal to each other.
pub fn cmp_versions(a: &str, b: &str) -> Ordering {
    ParsedVersion::parse(a).cmp(&ParsedVersion::parse(b))
}

/// Sort raw version strings in place, optionally newest-first.
pub fn sort_versions(versions: &mut [String], descending: bool) {
    versions.sort_by(|a, b| cmp_versions(a, b));
    if descending {
        versions.reverse();
    }
}

/// Extract the first version-looking substring (without a leading `v`),
/// accepting forms like `v1.2.3`, `1.2`, `1.2.3-rc1`, `alpha20240216`.
pub fn find_version(token: &str) -> Option<String> {
    let found = version_regex().find(token)?.as_str();
    Some(found.strip_prefix('v').unwrap_or(found).to_string())
}

/// Whether the whole string is a version-looking token.
pub fn is_version(token: &str) -> bool {
    exact_version_regex().is_match(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_parse() {
        assert_eq!(
            ParsedVersion::parse("v1.6.0").canonical().as_deref(),
            Some("1.6.0")
        );
        assert_eq!(
            ParsedVersion::parse("1.2").canonical().as_deref(),
            Some("1.2.0")
        );
        assert_eq!(
            ParsedVersion::parse("1").canonical().as_deref(),
            Some("1.0.0")
        );
        assert_eq!(
            ParsedVersion::parse("1.6.0-rc1").canonical().as_deref(),
            Some("1.6.0-rc1")
        );
        assert_eq!(ParsedVersion::parse("not-a-version"), ParsedVersion::Unordered);
    }

    #[test]
    fn alpha_versions_are_prereleases() {
        let v = ParsedVersion::parse("alpha20240216");
        assert!(matches!(v, ParsedVersion::Ordered(_)));
        assert!(!v.is_stable());
    }

    #[test]
    fn ordering_is_total() {
        assert_eq!(cmp_versions("1.6.0", "1.6.0"), Ordering::Equal);
        assert_eq!(cmp_versions("1.5.9", "1.6.0"), Ordering::Less);
        assert_eq!(cmp_versions("1.10.0", "1.9.0"), Ordering::Greater);
        // prerelease sorts before its release
        assert_eq!(cmp_versions("1.6.0-rc1", "1.6.0"), Ordering::Less);
        // unparsable strings are older than anything parsable, equal to each other
        assert_eq!(cmp_versions("garbage", "0.0.1"), Ordering::Less);
        assert_eq!(cmp_versions("garbage", "junk"), Ordering::Equal);
    }

    #[test]
    fn sorting_directions() {
        let mut versions = vec![
            "1.6.0".to_string(),
            "bad".to_string(),
            "1.6.0-rc1".to_string(),
            "1.5.0".to_string(),
        ];
        sort_versions(&mut versions, false);
        assert_eq!(versions, ["bad", "1.5.0", "1.6.0-rc1", "1.6.0"]);
        sort_versions(&mut versions, true);
        assert_eq!(versions, ["1.6.0", "1.6.0-rc1", "1.5.0", "bad"]);
    }

    #[test]
    fn find_version_heuristic() {
        assert_eq!(find_version("v1.2.3").as_deref(), Some("1.2.3"));
        assert_eq!(find_version("download/v1.6.0/").as_deref(), Some("1.6.0"));
        assert_eq!(find_version("1.2").as_deref(), Some("1.2"));
        assert_eq!(find_version("1.2.3-rc1").as_deref(), Some("1.2.3-rc1"));
        assert_eq!(find_version("alpha20240216").as_deref(), Some("alpha20240216"));
        assert_eq!(find_version("no digits here"), None);
    }

    #[test]
    fn stable_check() {
        assert!(ParsedVersion::parse("1.6.0").is_stable());
        assert!(!ParsedVersion::parse("1.6.0-beta2").is_stable());
        assert!(!ParsedVersion::parse("junk").is_stable());
    }
}
