//! Rule policy: configuration → filter
//!
//! A configuration is a list of rule nodes, each a preset or a literal block
//! with optional exclusions. Two ways of applying exclusions are supported:
//!
//! - [`ExcludeMode::AllowList`]: every preset and block goes into one
//!   blocklist, every exclusion into one allowlist; the allowlist is checked
//!   first at query time.
//! - [`ExcludeMode::Subtract`]: each node's exclusions are cut out of that
//!   node before the nodes are unioned into a single blocklist.
//!
//! Either way an exclusion must lie inside the CIDRs of the node it is
//! attached to.

use std::fmt;
use std::net::IpAddr;

use serde::Deserialize;

use ipf_core::index::{IndexStats, IpIndex};
use ipf_core::types::{Block, BlockSet};

use crate::algebra::{combine, union};
use crate::builder::build_index;
use crate::parser::{parse_rule, parse_rules, ParseError, ParseMode};
use crate::presets::Preset;
use crate::subset::subset_of_any;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("no rules configured")]
    NoRules,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unknown preset: {0:?}")]
    UnknownPreset(String),
    #[error("preset \"none\" cannot have exclusions")]
    ExcludeOnEmptyPreset,
    #[error("exclusion {exclude} is not inside {parent}")]
    SubsetViolation { exclude: String, parent: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

// =============================================================================
// Configuration
// =============================================================================

/// What a rule node contributes to the blocklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// A named preset, see [`Preset`].
    Preset(String),
    /// A single address or CIDR literal.
    Block(String),
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preset(name) => write!(f, "preset {name}"),
            Self::Block(cidr) => f.write_str(cidr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRuleNode")]
pub struct RuleNode {
    pub kind: RuleKind,
    pub excludes: Vec<String>,
}

impl RuleNode {
    pub fn preset(name: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Preset(name.into()),
            excludes: Vec::new(),
        }
    }

    pub fn block(cidr: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Block(cidr.into()),
            excludes: Vec::new(),
        }
    }

    pub fn excluding<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(excludes.into_iter().map(Into::into));
        self
    }

    /// The node's own blocks, plus the parents its exclusions must fall in.
    fn resolve(&self) -> Result<(BlockSet, Vec<Block>), BuildError> {
        match &self.kind {
            RuleKind::Preset(name) => {
                let preset: Preset = name
                    .parse()
                    .map_err(|_| BuildError::UnknownPreset(name.clone()))?;
                if preset == Preset::None && !self.excludes.is_empty() {
                    return Err(BuildError::ExcludeOnEmptyPreset);
                }
                let blocks = preset.blocks();
                let parents = blocks.iter().collect();
                Ok((blocks, parents))
            }
            RuleKind::Block(cidr) => {
                let block = parse_rule(cidr)?;
                Ok(([block].into_iter().collect(), vec![block]))
            }
        }
    }

    /// Parse the exclusions, requiring each to lie inside one of `parents`.
    fn resolve_excludes(&self, parents: &[Block]) -> Result<BlockSet, BuildError> {
        let mut set = BlockSet::new();
        for (index, text) in self.excludes.iter().enumerate() {
            let exclude = parse_rule(text).map_err(|e| ParseError::AtToken {
                index,
                source: Box::new(e),
            })?;
            if !subset_of_any(&exclude, parents) {
                return Err(BuildError::SubsetViolation {
                    exclude: exclude.to_string(),
                    parent: self.kind.to_string(),
                });
            }
            set.push(exclude);
        }
        Ok(set)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawRuleNode {
    preset: Option<String>,
    block: Option<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

impl TryFrom<RawRuleNode> for RuleNode {
    type Error = String;

    fn try_from(raw: RawRuleNode) -> Result<Self, Self::Error> {
        let kind = match (raw.preset, raw.block) {
            (Some(name), None) => RuleKind::Preset(name),
            (None, Some(cidr)) => RuleKind::Block(cidr),
            (Some(_), Some(_)) => return Err("rule has both \"preset\" and \"block\"".to_string()),
            (None, None) => return Err("rule needs \"preset\" or \"block\"".to_string()),
        };
        Ok(Self {
            kind,
            excludes: raw.exclude,
        })
    }
}

/// How exclusions are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExcludeMode {
    /// Exclusions form an allowlist checked before the blocklist.
    #[default]
    AllowList,
    /// Exclusions are subtracted from their own node.
    Subtract,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub rules: Vec<RuleNode>,
    #[serde(default)]
    pub exclude_mode: ExcludeMode,
    /// Extra literals that are always blocked, exclusions notwithstanding.
    ///
    /// In allow-list mode they are also cut out of the allowlist.
    #[serde(default, rename = "include")]
    pub includes: Vec<String>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, BuildError> {
        serde_json::from_str(text).map_err(|e| BuildError::Config(e.to_string()))
    }

    pub fn rule(mut self, node: RuleNode) -> Self {
        self.rules.push(node);
        self
    }

    pub fn include(mut self, cidr: impl Into<String>) -> Self {
        self.includes.push(cidr.into());
        self
    }

    pub fn exclude_mode(mut self, mode: ExcludeMode) -> Self {
        self.exclude_mode = mode;
        self
    }

    /// Resolve presets, validate exclusions, and build the indexes.
    ///
    /// Fails on the first invalid node; nothing is built in that case.
    pub fn build(&self) -> Result<Filter, BuildError> {
        if self.rules.is_empty() {
            return Err(BuildError::NoRules);
        }

        let mut blocked = Vec::with_capacity(self.rules.len() + 1);
        let mut allowed = Vec::new();

        for node in &self.rules {
            let (blocks, parents) = node.resolve()?;
            let excludes = node.resolve_excludes(&parents)?;
            match self.exclude_mode {
                ExcludeMode::AllowList => {
                    blocked.push(blocks);
                    allowed.push(excludes);
                }
                ExcludeMode::Subtract => blocked.push(combine(&blocks, &excludes)),
            }
        }

        let includes = parse_rules(&self.includes, ParseMode::Strict)?;
        let allow_set = combine(&union(&allowed), &includes);
        blocked.push(includes);
        let block_set = union(&blocked);
        log::debug!(
            "policy resolved: {} rules, {} blocked blocks, {} allowed blocks",
            self.rules.len(),
            block_set.len(),
            allow_set.len()
        );

        let allow = if allow_set.is_empty() {
            None
        } else {
            Some(build_index(&allow_set)?)
        };

        Ok(Filter {
            block: build_index(&block_set)?,
            allow,
        })
    }
}

// =============================================================================
// Filter
// =============================================================================

/// Outcome of checking an address against a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Matched the allowlist; the blocklist was not consulted.
    Allow,
    /// Matched the blocklist.
    Block,
    /// Matched neither.
    Pass,
}

impl Verdict {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Block => "block",
            Self::Pass => "pass",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A built blocklist with its optional allowlist.
#[derive(Debug, Clone)]
pub struct Filter {
    block: IpIndex,
    allow: Option<IpIndex>,
}

impl Filter {
    pub fn block_index(&self) -> &IpIndex {
        &self.block
    }

    pub fn allow_index(&self) -> Option<&IpIndex> {
        self.allow.as_ref()
    }

    pub fn verdict(&self, ip: IpAddr) -> Verdict {
        if self.allow.as_ref().is_some_and(|allow| allow.contains(ip)) {
            return Verdict::Allow;
        }
        if self.block.contains(ip) {
            Verdict::Block
        } else {
            Verdict::Pass
        }
    }

    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        self.verdict(ip) == Verdict::Block
    }

    /// Verdict for a group of addresses answered together.
    ///
    /// One allowed address allows the whole group; otherwise one blocked
    /// address blocks it.
    pub fn verdict_any<I>(&self, addrs: I) -> Verdict
    where
        I: IntoIterator<Item = IpAddr>,
    {
        let mut blocked = false;
        for ip in addrs {
            match self.verdict(ip) {
                Verdict::Allow => return Verdict::Allow,
                Verdict::Block => blocked = true,
                Verdict::Pass => {}
            }
        }
        if blocked {
            Verdict::Block
        } else {
            Verdict::Pass
        }
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            block: self.block.stats(),
            allow: self.allow.as_ref().map(IpIndex::stats),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub block: IndexStats,
    pub allow: Option<IndexStats>,
}
