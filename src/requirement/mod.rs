//! Requirement constraints and requirement-string updates
//!
//! Constraint strings follow the Composer grammar:
//! - Or-groups: `^1.0 || ^2.0` (a single `|` is accepted too)
//! - And-groups: `>=1.0 <2.0`, `>=1.0, <2.0`
//! - Caret `^1.2.3`, tilde `~1.2`, wildcard `1.2.*`, hyphen `1.0 - 2.0`
//! - Comparisons `>=`, `>`, `<=`, `<`, `!=`, `=`/`==`, and bare exact versions
//!
//! Stability flags such as `@dev` are ignored. Branch constraints
//! (`dev-main`) are not version constraints and fail to parse.

mod updater;

pub use updater::{update, RequirementsUpdater};

use crate::domain::Version;
use crate::error::ConfigError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static OPERATOR_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(>=|<=|!=|==|>|<|=|\^|~)\s+").expect("valid regex"));

static OR_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\|?\s*").expect("valid regex"));

static HYPHEN_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+-\s+(\S+)$").expect("valid regex"));

/// Comparison operator of a single comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

/// One `op version` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    /// Operator
    pub op: Op,
    /// Version operand
    pub version: Version,
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Returns true if `version` satisfies this comparator
    pub fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Eq => version == &self.version,
            Op::Ne => version != &self.version,
            Op::Gt => version > &self.version,
            Op::Ge => version >= &self.version,
            Op::Lt => version < &self.version,
            Op::Le => version <= &self.version,
        }
    }
}

/// A parsed requirement constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    raw: String,
    /// Or-list of and-lists; an empty and-list matches everything
    alternatives: Vec<Vec<Comparator>>,
}

impl Constraint {
    /// Parses a constraint string
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let raw = input.trim();
        let mut alternatives = split_alternatives(raw)
            .0
            .into_iter()
            .map(|alt| {
                parse_alternative(alt).map_err(|message| ConfigError::invalid_constraint(raw, message))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if alternatives.is_empty() {
            alternatives.push(Vec::new());
        }

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    /// Returns true if any alternative admits `version`
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|and| and.iter().all(|c| c.matches(version)))
    }

    /// The constraint as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Splits a requirement into its or-alternatives and the separator used
/// between them (`" || "` when there is only one alternative)
pub(crate) fn split_alternatives(raw: &str) -> (Vec<&str>, String) {
    let separator = OR_SEPARATOR
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| " || ".to_string());
    let alternatives = OR_SEPARATOR
        .split(raw)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    (alternatives, separator)
}

/// Splits one alternative into its and-terms and the separator between
/// them
pub(crate) fn split_terms(alternative: &str) -> (Vec<String>, &'static str) {
    let normalized = OPERATOR_SPACING.replace_all(alternative.trim(), "$1");
    let separator = if normalized.contains(',') { ", " } else { " " };
    let terms = normalized
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (terms, separator)
}

/// Splits a hyphen range `1.0 - 2.0` into its bounds
pub(crate) fn hyphen_bounds(alternative: &str) -> Option<(&str, &str)> {
    HYPHEN_RANGE.captures(alternative.trim()).map(|caps| {
        let (_, [low, high]) = caps.extract();
        (low, high)
    })
}

fn parse_alternative(alternative: &str) -> Result<Vec<Comparator>, String> {
    if let Some((low, high)) = hyphen_bounds(alternative) {
        let low = Partial::parse(low)?;
        let high = Partial::parse(high)?;
        let upper = if high.is_complete() {
            Comparator::new(Op::Le, high.floor())
        } else {
            Comparator::new(Op::Lt, high.next_at_precision())
        };
        return Ok(vec![Comparator::new(Op::Ge, low.floor()), upper]);
    }

    let (terms, _) = split_terms(alternative);
    let mut comparators = Vec::new();
    for term in &terms {
        comparators.extend(parse_term(term)?);
    }
    Ok(comparators)
}

fn parse_term(term: &str) -> Result<Vec<Comparator>, String> {
    let term = match term.split_once('@') {
        Some((before, _stability)) => before,
        None => term,
    };
    if term.is_empty() || term == "*" {
        return Ok(Vec::new());
    }
    if term.starts_with("dev-") || term.ends_with("-dev") {
        return Err(format!("'{}' is a branch constraint", term));
    }

    let (op, operand) = split_operator(term);
    let partial = Partial::parse(operand)?;

    let comparators = match op {
        "^" => vec![
            Comparator::new(Op::Ge, partial.floor()),
            Comparator::new(Op::Lt, partial.caret_ceiling()),
        ],
        "~" => vec![
            Comparator::new(Op::Ge, partial.floor()),
            Comparator::new(Op::Lt, partial.tilde_ceiling()),
        ],
        ">=" => vec![Comparator::new(Op::Ge, partial.floor())],
        ">" => vec![Comparator::new(Op::Gt, partial.floor())],
        "<=" => vec![Comparator::new(Op::Le, partial.floor())],
        "<" => vec![Comparator::new(Op::Lt, partial.floor())],
        "!=" => vec![Comparator::new(Op::Ne, partial.floor())],
        _ if partial.wildcard => {
            if partial.components.is_empty() {
                Vec::new()
            } else {
                vec![
                    Comparator::new(Op::Ge, partial.floor()),
                    Comparator::new(Op::Lt, partial.next_at_precision()),
                ]
            }
        }
        _ => vec![Comparator::new(Op::Eq, partial.floor())],
    };
    Ok(comparators)
}

/// Splits the leading operator off a term
pub(crate) fn split_operator(term: &str) -> (&str, &str) {
    const OPERATORS: [&str; 9] = [">=", "<=", "!=", "==", ">", "<", "=", "^", "~"];
    for op in OPERATORS {
        if let Some(rest) = term.strip_prefix(op) {
            let op = if op == "==" { "=" } else { op };
            return (op, rest.trim_start());
        }
    }
    ("", term)
}

/// A possibly incomplete version operand (`1`, `1.2`, `1.2.*`)
#[derive(Debug, Clone)]
pub(crate) struct Partial {
    pub(crate) components: Vec<u64>,
    pub(crate) wildcard: bool,
    pub(crate) pre: Option<String>,
}

impl Partial {
    pub(crate) fn parse(input: &str) -> Result<Self, String> {
        let body = input.strip_prefix(['v', 'V']).unwrap_or(input);
        let (body, pre) = match body.split_once('-') {
            Some((body, pre)) => (body, Some(pre.to_string())),
            None => (body, None),
        };

        let mut components = Vec::new();
        let mut wildcard = false;
        for part in body.split('.') {
            match part {
                "*" | "x" | "X" => {
                    wildcard = true;
                    break;
                }
                _ => {
                    let n = part
                        .parse::<u64>()
                        .map_err(|_| format!("'{}' is not a version", input))?;
                    // ceilings step one past a component
                    if n == u64::MAX {
                        return Err(format!("'{}' has a component that is too large", input));
                    }
                    components.push(n);
                }
            }
        }
        if components.len() > 3 && components[3..].iter().any(|n| *n != 0) {
            return Err(format!("'{}' has too many components", input));
        }
        components.truncate(3);

        Ok(Self {
            components,
            wildcard,
            pre,
        })
    }

    /// All three components given and no wildcard
    fn is_complete(&self) -> bool {
        self.components.len() == 3 && !self.wildcard
    }

    fn component(&self, i: usize) -> u64 {
        self.components.get(i).copied().unwrap_or(0)
    }

    /// Lowest version the operand denotes
    pub(crate) fn floor(&self) -> Version {
        let base = format!("{}.{}.{}", self.component(0), self.component(1), self.component(2));
        let text = match &self.pre {
            Some(pre) if !self.wildcard => format!("{}-{}", base, pre),
            _ => base,
        };
        Version::parse(&text).unwrap_or_else(|_| {
            Version::new(self.component(0), self.component(1), self.component(2))
        })
    }

    /// First version past the last given component (`1.2` → `1.3.0`)
    pub(crate) fn next_at_precision(&self) -> Version {
        match self.components.len() {
            0 | 1 => Version::new(self.component(0) + 1, 0, 0),
            2 => Version::new(self.component(0), self.component(1) + 1, 0),
            _ => Version::new(self.component(0), self.component(1), self.component(2) + 1),
        }
    }

    fn caret_ceiling(&self) -> Version {
        let (major, minor, patch) = (self.component(0), self.component(1), self.component(2));
        if major > 0 || self.components.len() == 1 {
            Version::new(major + 1, 0, 0)
        } else if minor > 0 || self.components.len() == 2 {
            Version::new(0, minor + 1, 0)
        } else {
            Version::new(0, 0, patch + 1)
        }
    }

    fn tilde_ceiling(&self) -> Version {
        match self.components.len() {
            0..=2 => Version::new(self.component(0) + 1, 0, 0),
            _ => Version::new(self.component(0), self.component(1) + 1, 0),
        }
    }
}
