//! Token-based naming convention.
//!
//! Every generated node is named `side_name[_token...]_SUFFIX`, where the suffix encodes the
//! [`NodeType`]. The two leading tokens identify the owning part and drive left/right mirroring.

use smallvec::SmallVec;

use crate::foundation::config::RigSettings;
use crate::scene::graph::NodeType;

/// Separator between a stash prefix and the stashed node name.
pub const STASH_SEPARATOR: char = ':';

/// Components recovered from a canonical node name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedName {
    /// Leading side token.
    pub side: String,
    /// Part name token.
    pub name: String,
    /// Descriptor tokens between the part prefix and the suffix.
    pub tokens: Vec<String>,
    /// Node type recovered from the suffix, when the name carries one.
    pub node_type: Option<NodeType>,
}

/// Deterministic, invertible naming rules shared by every part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameConvention {
    left: String,
    right: String,
    center: String,
    delimiter: char,
    stash_prefix: String,
}

impl Default for NameConvention {
    fn default() -> Self {
        Self::from_settings(&RigSettings::default())
    }
}

impl NameConvention {
    /// Build the convention from settings.
    pub fn from_settings(settings: &RigSettings) -> Self {
        Self {
            left: settings.left.clone(),
            right: settings.right.clone(),
            center: settings.center.clone(),
            delimiter: settings.delimiter,
            stash_prefix: settings.stash_prefix.clone(),
        }
    }

    /// Left side token.
    pub fn left(&self) -> &str {
        &self.left
    }

    /// Right side token.
    pub fn right(&self) -> &str {
        &self.right
    }

    /// Center side token.
    pub fn center(&self) -> &str {
        &self.center
    }

    /// Token delimiter.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Split a name into delimiter-separated tokens.
    pub fn split<'a>(&self, name: &'a str) -> SmallVec<[&'a str; 8]> {
        name.split(self.delimiter).collect()
    }

    /// Canonical node name. Empty descriptor tokens are dropped.
    pub fn format(&self, side: &str, name: &str, tokens: &[&str], node_type: NodeType) -> String {
        let mut parts: SmallVec<[&str; 8]> = SmallVec::new();
        parts.push(side);
        parts.push(name);
        parts.extend(tokens.iter().copied().filter(|t| !t.is_empty()));
        parts.push(node_type.suffix());
        parts.join(self.delimiter.encode_utf8(&mut [0; 4]))
    }

    /// Inverse of [`NameConvention::format`]. Returns `None` for names without a part prefix.
    pub fn parse(&self, full: &str) -> Option<ParsedName> {
        let toks = self.split(full);
        if toks.len() < 2 {
            return None;
        }
        let node_type = if toks.len() > 2 {
            toks.last().and_then(|s| NodeType::from_suffix(s))
        } else {
            None
        };
        let end = if node_type.is_some() {
            toks.len() - 1
        } else {
            toks.len()
        };
        Some(ParsedName {
            side: toks[0].to_owned(),
            name: toks[1].to_owned(),
            tokens: toks[2..end].iter().map(|s| (*s).to_owned()).collect(),
            node_type,
        })
    }

    /// `side_name` identifier of a part.
    pub fn part_id(&self, side: &str, name: &str) -> String {
        format!("{side}{}{name}", self.delimiter)
    }

    /// Canonical guide-root name of a part.
    pub fn guide_root(&self, side: &str, name: &str) -> String {
        self.format(side, name, &["guide"], NodeType::Group)
    }

    /// Map a guide-root name back to its `side_name` identifier.
    pub fn part_id_from_guide_root(&self, root: &str) -> Option<String> {
        let parsed = self.parse(root)?;
        (parsed.node_type == Some(NodeType::Group) && parsed.tokens == ["guide"])
            .then(|| self.part_id(&parsed.side, &parsed.name))
    }

    /// Opposite side token for left/right, `None` for anything else.
    pub fn swap_side(&self, side: &str) -> Option<&str> {
        if side == self.left {
            Some(&self.right)
        } else if side == self.right {
            Some(&self.left)
        } else {
            None
        }
    }

    /// Swap a leading `L_`/`R_` prefix; `None` when the value carries neither.
    pub fn mirror_value(&self, value: &str) -> Option<String> {
        let (first, rest) = value.split_once(self.delimiter)?;
        let swapped = self.swap_side(first)?;
        Some(format!("{swapped}{}{rest}", self.delimiter))
    }

    /// Whether a token is the left side token.
    pub fn is_left(&self, token: &str) -> bool {
        token == self.left
    }

    /// Substitute the first `old_side` token and the first `old_name` token.
    ///
    /// The two substitutions never target the same token, so `side == name` pairs rename both
    /// leading slots.
    pub fn substitute(
        &self,
        node: &str,
        (old_side, old_name): (&str, &str),
        (new_side, new_name): (&str, &str),
    ) -> String {
        let mut toks: SmallVec<[&str; 8]> = self.split(node);
        let side_at = toks.iter().position(|t| *t == old_side);
        if let Some(i) = side_at {
            toks[i] = new_side;
        }
        if let Some(i) = toks
            .iter()
            .enumerate()
            .position(|(i, t)| Some(i) != side_at && *t == old_name)
        {
            toks[i] = new_name;
        }
        toks.join(self.delimiter.encode_utf8(&mut [0; 4]))
    }

    /// Name a node takes while stashed.
    pub fn stash_name(&self, node: &str) -> String {
        format!("{}{STASH_SEPARATOR}{node}", self.stash_prefix)
    }

    /// Original name of a stashed node, if `node` carries the stash prefix.
    pub fn unstash_name<'a>(&self, node: &'a str) -> Option<&'a str> {
        node.strip_prefix(self.stash_prefix.as_str())?
            .strip_prefix(STASH_SEPARATOR)
    }
}

#[cfg(test)]
#[path = "../tests/unit/naming.rs"]
mod tests;
