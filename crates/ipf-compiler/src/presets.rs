//! Named rule presets
//!
//! The special-purpose lists follow the IANA registries:
//! - <https://www.iana.org/assignments/iana-ipv4-special-registry/>
//! - <https://www.iana.org/assignments/iana-ipv6-special-registry/>

use std::fmt;
use std::str::FromStr;

use ipf_core::types::BlockSet;

use crate::parser::{parse_rules, ParseError, ParseMode};

pub const IANA_V4: &[&str] = &[
    "0.0.0.0/8",
    "10.0.0.0/8",
    "100.64.0.0/10",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "192.0.0.0/24",
    "192.0.2.0/24",
    "198.18.0.0/15",
    "224.0.0.0/4",
    "240.0.0.0/4",
];

pub const IANA_V6: &[&str] = &[
    "::/128",
    "::1/128",
    "::ffff:0:0/96",
    "64:ff9b::/96",
    "100::/64",
    "2001:db8::/32",
    "fc00::/7",
    "fe80::/10",
    "ff00::/8",
];

const ALL_ADDRESSES: &[&str] = &["0.0.0.0/0", "::/0"];

/// Built-in address sets selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Matches nothing.
    None,
    /// IANA special-purpose blocks, both families.
    Iana,
    /// Every address of both families.
    AllIp,
}

impl Preset {
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Iana => "iana",
            Self::AllIp => "allip",
        }
    }

    /// CIDR literals this preset is made of. An exclusion attached to the
    /// preset must lie inside one of them.
    pub fn parents(self) -> impl Iterator<Item = &'static str> {
        let (v4, v6): (&[&str], &[&str]) = match self {
            Self::None => (&[], &[]),
            Self::Iana => (IANA_V4, IANA_V6),
            Self::AllIp => (ALL_ADDRESSES, &[]),
        };
        v4.iter().chain(v6.iter()).copied()
    }

    /// Expand the preset into blocks.
    pub fn blocks(self) -> BlockSet {
        // The literal tables above are fixed; a parse failure would be a typo
        // in this file and is caught by the preset tests.
        parse_rules(self.parents(), ParseMode::Lenient).unwrap_or_default()
    }
}

impl FromStr for Preset {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "empty" => Ok(Self::None),
            "iana" | "reserved" => Ok(Self::Iana),
            "allip" | "all" => Ok(Self::AllIp),
            _ => Err(ParseError::UnknownPreset(s.to_string())),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up a preset by name and expand it.
pub fn load_preset(name: &str) -> Result<BlockSet, ParseError> {
    let preset: Preset = name.parse()?;
    Ok(preset.blocks())
}
