//! Version-range constraint expressions.
//!
//! The managed tools declare requirements in the HashiCorp constraint
//! syntax (`>= 1.5.0, < 1.7.0`, `~> 1.2`), which differs from semver
//! ranges: a bare version means equality, and `~>` is the pessimistic
//! operator. Comparators are evaluated against [`ParsedVersion`] values so
//! a constraint set gathered from several files can be unioned and checked
//! as one predicate.

use semver::Version;

use crate::error::{Result, TervError};
use crate::version::ParsedVersion;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Clone, Debug)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            Op::Eq => candidate == &self.version,
            Op::Ne => candidate != &self.version,
            Op::Gt => candidate > &self.version,
            Op::Ge => candidate >= &self.version,
            Op::Lt => candidate < &self.version,
            Op::Le => candidate <= &self.version,
        }
    }
}

/// A conjunction of comparators; empty means "anything parsable".
#[derive(Clone, Debug, Default)]
pub struct Constraint {
    comparators: Vec<Comparator>,
}

impl Constraint {
    /// Parse a constraint expression, comma-separated comparators.
    pub fn parse(expr: &str) -> Result<Constraint> {
        let mut constraint = Constraint::default();
        for part in expr.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            constraint.push_comparator(part)?;
        }
        if constraint.comparators.is_empty() {
            return Err(TervError::resolution(format!(
                "empty constraint expression {expr:?}"
            )));
        }
        Ok(constraint)
    }

    /// Union another parsed constraint into this one (all must hold).
    pub fn and(&mut self, other: Constraint) {
        self.comparators.extend(other.comparators);
    }

    pub fn is_empty(&self) -> bool {
        self.comparators.is_empty()
    }

    /// Whether `candidate` satisfies every comparator. Unparsable
    /// candidates never match.
    pub fn matches(&self, candidate: &ParsedVersion) -> bool {
        let ParsedVersion::Ordered(version) = candidate else {
            return false;
        };
        self.comparators.iter().all(|c| c.matches(version))
    }

    fn push_comparator(&mut self, part: &str) -> Result<()> {
        let (op, rest) = split_operator(part)?;
        let raw = rest.trim();
        let segments = raw
            .strip_prefix('v')
            .unwrap_or(raw)
            .split(['-', '+'])
            .next()
            .unwrap_or(raw)
            .split('.')
            .count();
        let version = match ParsedVersion::parse(raw) {
            ParsedVersion::Ordered(v) => v,
            ParsedVersion::Unordered => {
                return Err(TervError::resolution(format!(
                    "invalid version {raw:?} in constraint"
                )));
            }
        };

        if op == "~>" {
            // pessimistic operator: the rightmost given component may grow
            let upper = if segments >= 3 {
                Version::new(version.major, version.minor + 1, 0)
            } else {
                Version::new(version.major + 1, 0, 0)
            };
            self.comparators.push(Comparator {
                op: Op::Ge,
                version,
            });
            self.comparators.push(Comparator {
                op: Op::Lt,
                version: upper,
            });
            return Ok(());
        }

        let op = match op {
            "" | "=" => Op::Eq,
            "!=" => Op::Ne,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "<" => Op::Lt,
            "<=" => Op::Le,
            other => {
                return Err(TervError::resolution(format!(
                    "unknown constraint operator {other:?}"
                )));
            }
        };
        self.comparators.push(Comparator { op, version });
        Ok(())
    }
}

fn split_operator(part: &str) -> Result<(&str, &str)> {
    let idx = part
        .find(|c: char| c.is_ascii_digit() || c == 'v')
        .ok_or_else(|| TervError::resolution(format!("invalid constraint {part:?}")))?;
    Ok((part[..idx].trim(), &part[idx..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(expr: &str, version: &str) -> bool {
        Constraint::parse(expr)
            .unwrap()
            .matches(&ParsedVersion::parse(version))
    }

    #[test]
    fn bare_version_means_equality() {
        assert!(matches("1.6.0", "1.6.0"));
        assert!(!matches("1.6.0", "1.6.1"));
    }

    #[test]
    fn range_expression() {
        assert!(matches(">=1.5.0, <1.7.0", "1.6.0"));
        assert!(!matches(">=1.5.0, <1.7.0", "1.7.0"));
        assert!(!matches(">=1.5.0, <1.7.0", "1.4.9"));
    }

    #[test]
    fn pessimistic_operator_three_segments() {
        assert!(matches("~> 1.2.3", "1.2.9"));
        assert!(!matches("~> 1.2.3", "1.3.0"));
        assert!(!matches("~> 1.2.3", "1.2.2"));
    }

    #[test]
    fn pessimistic_operator_two_segments() {
        assert!(matches("~> 1.2", "1.9.0"));
        assert!(!matches("~> 1.2", "2.0.0"));
        assert!(!matches("~> 1.2", "1.1.0"));
    }

    #[test]
    fn not_equal() {
        assert!(matches("!= 1.6.0, >= 1.5.0", "1.6.1"));
        assert!(!matches("!= 1.6.0, >= 1.5.0", "1.6.0"));
    }

    #[test]
    fn unparsable_candidate_never_matches() {
        assert!(!matches(">=0.0.1", "garbage"));
    }

    #[test]
    fn invalid_expressions_error() {
        assert!(Constraint::parse(">= not.a.version").is_err());
        assert!(Constraint::parse("?? 1.0.0").is_err());
        assert!(Constraint::parse("").is_err());
    }

    #[test]
    fn union_requires_all() {
        let mut c = Constraint::parse(">= 1.5.0").unwrap();
        c.and(Constraint::parse("< 1.7.0").unwrap());
        assert!(c.matches(&ParsedVersion::parse("1.6.0")));
        assert!(!c.matches(&ParsedVersion::parse("1.7.0")));
    }
}
