use std::net::IpAddr;

use ipf_core::types::{Block, BlockSet, Family, PrefixError, V4Block, V6Block};
use ipf_core::wide::U128;

/// Error type for rule parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty rule")]
    Empty,
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),
    #[error("invalid prefix length: {0:?}")]
    InvalidPrefix(String),
    #[error("prefix length {prefix} exceeds {family} width {}", .family.width())]
    PrefixTooLong { family: Family, prefix: u8 },
    #[error("unknown preset: {0:?}")]
    UnknownPreset(String),
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("rule #{index}: {source}")]
    AtToken {
        index: usize,
        #[source]
        source: Box<ParseError>,
    },
}

impl From<PrefixError> for ParseError {
    fn from(e: PrefixError) -> Self {
        Self::PrefixTooLong {
            family: e.family,
            prefix: e.prefix,
        }
    }
}

/// How a batch treats tokens that fail to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Abort on the first invalid token.
    #[default]
    Strict,
    /// Skip invalid tokens, logging each one.
    Lenient,
}

/// Parse one `address` or `address/prefix` literal into a canonical block.
///
/// A bare address becomes a host route (/32 or /128). The family follows the
/// address syntax, so IPv4-mapped IPv6 text (`::ffff:1.2.3.4`) stays IPv6.
pub fn parse_rule(text: &str) -> Result<Block, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let (addr_part, prefix_part) = match text.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (text, None),
    };

    let addr: IpAddr = addr_part
        .parse()
        .map_err(|_| ParseError::InvalidAddress(addr_part.to_string()))?;
    let family = Family::of(&addr);

    let prefix = match prefix_part {
        Some(p) => parse_prefix(p, family)?,
        None => family.width(),
    };

    let block = match addr {
        IpAddr::V4(v4) => Block::V4(V4Block::new(u32::from(v4), prefix)?),
        IpAddr::V6(v6) => Block::V6(V6Block::new(U128::from(v6), prefix)?),
    };
    Ok(block)
}

fn parse_prefix(text: &str, family: Family) -> Result<u8, ParseError> {
    if text.is_empty() || text.len() > 3 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidPrefix(text.to_string()));
    }
    let value: u16 = text
        .parse()
        .map_err(|_| ParseError::InvalidPrefix(text.to_string()))?;
    if value > family.width() as u16 {
        return Err(ParseError::PrefixTooLong {
            family,
            prefix: value.min(u8::MAX as u16) as u8,
        });
    }
    Ok(value as u8)
}

/// Parse a batch of literals into a block collection.
///
/// In [`ParseMode::Strict`] the first failure is returned, tagged with its
/// position; in [`ParseMode::Lenient`] invalid tokens are skipped.
pub fn parse_rules<I, S>(tokens: I, mode: ParseMode) -> Result<BlockSet, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = BlockSet::new();

    for (index, token) in tokens.into_iter().enumerate() {
        let token = token.as_ref();
        match parse_rule(token) {
            Ok(block) => set.push(block),
            Err(e) => match mode {
                ParseMode::Strict => {
                    return Err(ParseError::AtToken {
                        index,
                        source: Box::new(e),
                    })
                }
                ParseMode::Lenient => {
                    log::warn!("skipping rule #{index} {token:?}: {e}");
                }
            },
        }
    }

    Ok(set)
}

/// Parse a rule list from text: one literal per line, `#` comments and blank
/// lines ignored, surrounding whitespace trimmed.
pub fn parse_rule_list(text: &str, mode: ParseMode) -> Result<BlockSet, ParseError> {
    let tokens = text
        .lines()
        .map(|line| match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty());
    parse_rules(tokens, mode)
}

/// Parse a single address (no prefix).
pub fn parse_address(text: &str) -> Result<IpAddr, ParseError> {
    let text = text.trim();
    text.parse()
        .map_err(|_| ParseError::InvalidAddress(text.to_string()))
}
