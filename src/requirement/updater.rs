//! Requirement-string rewriting for a target version
//!
//! Rewrites keep the shape of what the user wrote: operator, `v` prefix,
//! number of version components, or-separator and stability flags survive.

use super::{hyphen_bounds, split_alternatives, split_operator, split_terms, Constraint, Partial};
use crate::domain::{Requirement, RequirementsUpdateStrategy, Version};
use tracing::debug;

/// Computes updated requirements for `target` under `strategy`
///
/// Assumes the dependency is locked; see [`RequirementsUpdater::with_lockfile`].
pub fn update(
    requirements: &[Requirement],
    target: Option<&Version>,
    strategy: RequirementsUpdateStrategy,
) -> Vec<Requirement> {
    RequirementsUpdater::new(requirements, target, strategy).updated_requirements()
}

/// Rewrites requirement strings so they admit a target version
#[derive(Debug, Clone)]
pub struct RequirementsUpdater<'a> {
    requirements: &'a [Requirement],
    target: Option<&'a Version>,
    strategy: RequirementsUpdateStrategy,
    locked: bool,
}

impl<'a> RequirementsUpdater<'a> {
    /// Creates an updater for a locked dependency
    pub fn new(
        requirements: &'a [Requirement],
        target: Option<&'a Version>,
        strategy: RequirementsUpdateStrategy,
    ) -> Self {
        Self {
            requirements,
            target,
            strategy,
            locked: true,
        }
    }

    /// Sets whether a lockfile records the installed version
    ///
    /// Without one the manifest requirement is the only record of what gets
    /// installed, so `BumpVersionsIfNecessary` bumps even admitted requirements.
    pub fn with_lockfile(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Returns the updated requirements, in input order
    pub fn updated_requirements(&self) -> Vec<Requirement> {
        let Some(target) = self.target else {
            return self.requirements.to_vec();
        };
        if self.strategy.is_lockfile_only() {
            return self.requirements.to_vec();
        }

        self.requirements
            .iter()
            .map(|req| self.updated_requirement(req, target))
            .collect()
    }

    fn updated_requirement(&self, req: &Requirement, target: &Version) -> Requirement {
        let Some(current) = req.requirement.as_deref() else {
            return req.clone();
        };
        if current.trim_start().starts_with("dev-") {
            return req.clone();
        }

        let constraint = match Constraint::parse(current) {
            Ok(constraint) => constraint,
            Err(e) => {
                debug!(requirement = current, error = %e, "leaving unparseable requirement untouched");
                return req.clone();
            }
        };
        let admitted = constraint.matches(target);

        let updated = match self.strategy {
            RequirementsUpdateStrategy::LockfileOnly => return req.clone(),
            RequirementsUpdateStrategy::WidenRanges if admitted => return req.clone(),
            RequirementsUpdateStrategy::BumpVersionsIfNecessary if admitted && self.locked => {
                return req.clone()
            }
            RequirementsUpdateStrategy::BumpVersions
            | RequirementsUpdateStrategy::BumpVersionsIfNecessary => bump_requirement(current, target),
            RequirementsUpdateStrategy::WidenRanges => widen_requirement(current, target),
        };

        debug!(from = current, to = %updated, strategy = ?self.strategy, "updated requirement");
        req.with_requirement(updated)
    }
}

/// Moves the requirement to `target`, keeping its shape
fn bump_requirement(current: &str, target: &Version) -> String {
    let (alternatives, separator) = split_alternatives(current);
    let Some(last) = alternatives.last() else {
        return current.to_string();
    };
    if alternatives.len() == 1 {
        return bump_alternative(last, target);
    }

    let mut parts: Vec<String> = alternatives.iter().map(|s| s.to_string()).collect();
    let admitting = alternatives.iter().position(|alt| {
        Constraint::parse(alt)
            .map(|c| c.matches(target))
            .unwrap_or(false)
    });
    match admitting {
        Some(i) => parts[i] = bump_alternative(alternatives[i], target),
        None => parts.push(bump_alternative(last, target)),
    }
    parts.join(&separator)
}

/// Extends the requirement to admit `target` without raising its floor
fn widen_requirement(current: &str, target: &Version) -> String {
    let (alternatives, separator) = split_alternatives(current);
    let Some(last) = alternatives.last() else {
        return current.to_string();
    };

    // An exact pin has no range to widen
    if alternatives.len() == 1 && is_exact(last) {
        return bump_alternative(last, target);
    }

    let mut parts: Vec<String> = alternatives.iter().map(|s| s.to_string()).collect();
    if has_upper_bound(last) {
        let i = parts.len() - 1;
        parts[i] = raise_upper_bounds(last, target);
        // exclusions such as `!=` can still reject the target
        if !admits_release(&parts[i], target) {
            parts.push(full(target));
        }
    } else {
        parts.push(bump_alternative(last, target));
    }
    parts.join(&separator)
}

/// Re-spells one alternative around `target`, falling back to an exact
/// pin when the reshaped alternative would still reject it
fn bump_alternative(alternative: &str, target: &Version) -> String {
    if let Some((low, high)) = hyphen_bounds(alternative) {
        let high = if upper_admits(high, target) {
            high.to_string()
        } else {
            retarget(high, target)
        };
        return format!("{} - {}", retarget(low, target), high);
    }

    let (terms, separator) = split_terms(alternative);
    if terms.is_empty() {
        return alternative.to_string();
    }
    let bumped = terms
        .iter()
        .map(|term| bump_term(term, target))
        .collect::<Vec<_>>()
        .join(separator);
    if admits_release(&bumped, target) {
        bumped
    } else {
        full(target)
    }
}

/// Whether `requirement` admits the release `target` belongs to
///
/// Pre-release targets are checked by their release numbers, since a
/// `^2.0` floor sorts after `2.0.0-beta1`.
fn admits_release(requirement: &str, target: &Version) -> bool {
    let release = Version::new(target.major(), target.minor(), target.patch());
    Constraint::parse(requirement).is_ok_and(|c| c.matches(&release))
}

fn raise_upper_bounds(alternative: &str, target: &Version) -> String {
    if let Some((low, high)) = hyphen_bounds(alternative) {
        if upper_admits(high, target) {
            return alternative.to_string();
        }
        return format!("{} - {}", low, retarget(high, target));
    }

    let (terms, separator) = split_terms(alternative);
    terms
        .iter()
        .map(|term| {
            let (body, _) = split_stability(term);
            match split_operator(body).0 {
                "<" | "<=" => bump_term(term, target),
                _ => term.clone(),
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn bump_term(term: &str, target: &Version) -> String {
    let (body, flag) = split_stability(term);
    let (op, operand) = split_operator(body);
    let Ok(partial) = Partial::parse(operand) else {
        return term.to_string();
    };
    if partial.components.is_empty() {
        return term.to_string();
    }
    let prefix = if operand.starts_with(['v', 'V']) { &operand[..1] } else { "" };
    let wildcard = if operand.contains(".x") { ".x" } else { ".*" };

    match op {
        "!=" => term.to_string(),
        "<" | "<=" => {
            if upper_admits(body, target) {
                term.to_string()
            } else {
                let precision = partial.components.len();
                format!("<{}{}{}", prefix, next_major(target, precision), flag)
            }
        }
        ">" => format!(">={}{}{}", prefix, at_precision(&partial, target, wildcard), flag),
        "" | "=" if !partial.wildcard => format!("{}{}{}{}", op, prefix, full(target), flag),
        _ => format!("{}{}{}{}", op, prefix, at_precision(&partial, target, wildcard), flag),
    }
}

/// Whether an upper-bound operand (`<2.0`, `<=2.0`, or a hyphen high end)
/// still admits `target`
fn upper_admits(bound: &str, target: &Version) -> bool {
    let (op, operand) = split_operator(bound);
    let Ok(partial) = Partial::parse(operand) else {
        return true;
    };
    match op {
        "<" => target < &partial.floor(),
        "<=" => target <= &partial.floor(),
        // hyphen high end: inclusive when complete, else up to the next step
        _ if partial.components.len() == 3 && !partial.wildcard => target <= &partial.floor(),
        _ => target < &partial.next_at_precision(),
    }
}

/// Re-spells `operand` with `target`'s numbers at the same precision
fn retarget(operand: &str, target: &Version) -> String {
    let Ok(partial) = Partial::parse(operand) else {
        return operand.to_string();
    };
    let prefix = if operand.starts_with(['v', 'V']) { &operand[..1] } else { "" };
    format!("{}{}", prefix, at_precision(&partial, target, ".*"))
}

fn is_exact(alternative: &str) -> bool {
    if hyphen_bounds(alternative).is_some() {
        return false;
    }
    let (terms, _) = split_terms(alternative);
    match terms.as_slice() {
        [term] => {
            let (op, operand) = split_operator(split_stability(term).0);
            matches!(op, "" | "=")
                && Partial::parse(operand).is_ok_and(|p| !p.wildcard && !p.components.is_empty())
        }
        _ => false,
    }
}

fn has_upper_bound(alternative: &str) -> bool {
    if hyphen_bounds(alternative).is_some() {
        return true;
    }
    let (terms, _) = split_terms(alternative);
    terms
        .iter()
        .any(|term| matches!(split_operator(split_stability(term).0).0, "<" | "<="))
}

fn split_stability(term: &str) -> (&str, &str) {
    match term.find('@') {
        Some(i) => term.split_at(i),
        None => (term, ""),
    }
}

fn at_precision(partial: &Partial, target: &Version, wildcard: &str) -> String {
    let precision = partial.components.len().clamp(1, 3);
    let numbers = [target.major(), target.minor(), target.patch()];
    let mut text = numbers[..precision]
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".");
    if partial.wildcard {
        text.push_str(wildcard);
    } else if precision == 3 && target.is_prerelease() {
        text.push('-');
        text.push_str(target.prerelease());
    }
    text
}

fn full(target: &Version) -> String {
    let mut text = format!("{}.{}.{}", target.major(), target.minor(), target.patch());
    if target.is_prerelease() {
        text.push('-');
        text.push_str(target.prerelease());
    }
    text
}

fn next_major(target: &Version, precision: usize) -> String {
    let mut parts = vec![target.major().saturating_add(1).to_string()];
    parts.resize(precision.clamp(1, 3), "0".to_string());
    parts.join(".")
}
