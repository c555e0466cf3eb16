//! Side/name renames over a node set, with clash resolution.

use std::collections::{HashSet, VecDeque};

use crate::foundation::error::{RigError, RigResult};
use crate::naming::NameConvention;
use crate::scene::graph::SceneGraph;

/// Answer to a naming clash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Retry with these side and name tokens.
    Rename {
        /// New side token.
        side: String,
        /// New name token.
        name: String,
    },
    /// Abandon the operation.
    Cancel,
}

impl Resolution {
    /// Shorthand for [`Resolution::Rename`].
    pub fn rename(side: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Rename {
            side: side.into(),
            name: name.into(),
        }
    }
}

/// Decides how to proceed when a rename would collide with existing nodes.
pub trait Resolver {
    /// Called with the side and name tokens the part carried before the rename.
    fn resolve_clash(&mut self, side: &str, name: &str) -> Resolution;
}

impl<F> Resolver for F
where
    F: FnMut(&str, &str) -> Resolution,
{
    fn resolve_clash(&mut self, side: &str, name: &str) -> Resolution {
        self(side, name)
    }
}

/// Headless resolver: every clash cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoFailResolver;

impl Resolver for AutoFailResolver {
    fn resolve_clash(&mut self, side: &str, name: &str) -> Resolution {
        tracing::info!(side, name, "no interactive resolver, cancelling on clash");
        Resolution::Cancel
    }
}

/// Replays queued answers, then cancels. Records every question it was asked.
#[derive(Clone, Debug, Default)]
pub struct ScriptedResolver {
    answers: VecDeque<Resolution>,
    asked: Vec<(String, String)>,
}

impl ScriptedResolver {
    /// Resolver answering with `answers` in order.
    pub fn new(answers: impl IntoIterator<Item = Resolution>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Clashes reported so far.
    pub fn asked(&self) -> &[(String, String)] {
        &self.asked
    }
}

impl Resolver for ScriptedResolver {
    fn resolve_clash(&mut self, side: &str, name: &str) -> Resolution {
        self.asked.push((side.to_owned(), name.to_owned()));
        self.answers.pop_front().unwrap_or(Resolution::Cancel)
    }
}

/// One rename over a node set.
#[derive(Clone, Copy, Debug)]
pub struct RenameRequest<'a> {
    /// Nodes to rename.
    pub nodes: &'a [String],
    /// Current side and name tokens.
    pub old: (&'a str, &'a str),
    /// Requested side and name tokens.
    pub new: (&'a str, &'a str),
    /// Names that count as taken even when no live node carries them.
    pub reserved: &'a HashSet<String>,
}

/// Result of a successful rename.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenameOutcome {
    /// Side token actually applied.
    pub side: String,
    /// Name token actually applied.
    pub name: String,
    /// `(from, to)` pairs that changed.
    pub renamed: Vec<(String, String)>,
}

/// Rename every node of a set by token substitution.
///
/// The clash domain is every scene node outside the set plus `reserved`. Each clash consults the
/// resolver; a cancel, or more than `max_attempts` clashes, fails with [`RigError::Clash`] and
/// leaves the scene untouched.
pub fn rename_nodes(
    scene: &mut dyn SceneGraph,
    naming: &NameConvention,
    resolver: &mut dyn Resolver,
    req: RenameRequest<'_>,
    max_attempts: u32,
) -> RigResult<RenameOutcome> {
    let own: HashSet<&str> = req.nodes.iter().map(String::as_str).collect();
    let mut side = req.new.0.to_owned();
    let mut name = req.new.1.to_owned();
    let mut attempts = 0;

    let candidates = loop {
        let candidates: Vec<String> = req
            .nodes
            .iter()
            .map(|n| naming.substitute(n, req.old, (&side, &name)))
            .collect();
        let mut seen = HashSet::new();
        let clash = candidates.iter().find(|c| {
            !seen.insert(c.as_str())
                || req.reserved.contains(c.as_str())
                || (scene.exists(c) && !own.contains(c.as_str()))
        });
        let Some(clash) = clash else {
            break candidates;
        };

        attempts += 1;
        if attempts > max_attempts {
            return Err(RigError::clash(format!(
                "'{}' still clashes after {max_attempts} resolution attempts",
                naming.part_id(&side, &name)
            )));
        }
        tracing::warn!(node = %clash, "rename to '{}' clashes", naming.part_id(&side, &name));
        match resolver.resolve_clash(req.old.0, req.old.1) {
            Resolution::Rename { side: s, name: n } => {
                side = s;
                name = n;
            }
            Resolution::Cancel => {
                return Err(RigError::clash(format!(
                    "rename of '{}' to '{}' was cancelled",
                    naming.part_id(req.old.0, req.old.1),
                    naming.part_id(&side, &name)
                )));
            }
        }
    };

    let renamed: Vec<(String, String)> = req
        .nodes
        .iter()
        .cloned()
        .zip(candidates)
        .filter(|(from, to)| from != to)
        .collect();

    // Targets that are still held by another member need a detour through temporary names.
    if renamed.iter().any(|(_, to)| own.contains(to.as_str())) {
        let temps: Vec<String> = renamed
            .iter()
            .enumerate()
            .map(|(i, (from, _))| naming.stash_name(&format!("rename{i}{STASH_TAG}{from}")))
            .collect();
        for ((from, _), tmp) in renamed.iter().zip(&temps) {
            scene.rename_node(from, tmp)?;
        }
        for ((_, to), tmp) in renamed.iter().zip(&temps) {
            scene.rename_node(tmp, to)?;
        }
    } else {
        for (from, to) in &renamed {
            scene.rename_node(from, to)?;
        }
    }

    tracing::debug!(count = renamed.len(), side, name, "renamed node set");
    Ok(RenameOutcome {
        side,
        name,
        renamed,
    })
}

const STASH_TAG: char = '.';

#[cfg(test)]
#[path = "../tests/unit/rename.rs"]
mod tests;
