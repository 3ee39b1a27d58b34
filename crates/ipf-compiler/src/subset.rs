//! Subset checks for exclusions
//!
//! An exclusion attached to a rule node must lie entirely inside one of the
//! node's own CIDRs; anything else would carve a hole the node never covered.

use ipf_core::types::Block;

use crate::parser::{parse_rule, ParseError};

/// Whether `candidate` parses to a block fully contained in `base`.
///
/// A family mismatch is `Ok(false)`; a malformed candidate is an error.
pub fn subtract_subset(base: &Block, candidate: &str) -> Result<bool, ParseError> {
    let candidate = parse_rule(candidate)?;
    Ok(base.covers(&candidate))
}

/// Multi-parent form of [`subtract_subset`]: true when any parent contains
/// `candidate`.
pub fn subset_of_any<'a, I>(candidate: &Block, parents: I) -> bool
where
    I: IntoIterator<Item = &'a Block>,
{
    parents.into_iter().any(|parent| parent.covers(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str) -> Block {
        parse_rule(text).unwrap()
    }

    #[test]
    fn nested_block_is_subset() {
        let base = block("10.0.0.0/8");
        assert_eq!(subtract_subset(&base, "10.1.0.0/16"), Ok(true));
        assert_eq!(subtract_subset(&base, "10.255.255.255"), Ok(true));
        assert_eq!(subtract_subset(&base, "10.0.0.0/8"), Ok(true));
    }

    #[test]
    fn outside_or_wider_is_not_subset() {
        let base = block("10.0.0.0/8");
        assert_eq!(subtract_subset(&base, "11.0.0.0/16"), Ok(false));
        assert_eq!(subtract_subset(&base, "0.0.0.0/7"), Ok(false));
        assert_eq!(subtract_subset(&base, "::/0"), Ok(false));
    }

    #[test]
    fn v6_subset() {
        let base = block("2001:db8::/32");
        assert_eq!(subtract_subset(&base, "2001:db8:1::/48"), Ok(true));
        assert_eq!(subtract_subset(&base, "2001:db9::/48"), Ok(false));
        assert_eq!(subtract_subset(&block("::/0"), "fe80::1"), Ok(true));
    }

    #[test]
    fn malformed_candidate_is_error() {
        let base = block("10.0.0.0/8");
        assert!(subtract_subset(&base, "10.0.0.0/40").is_err());
        assert!(subtract_subset(&base, "").is_err());
    }

    #[test]
    fn any_parent_suffices() {
        let parents = [block("10.0.0.0/8"), block("192.168.0.0/16")];
        assert!(subset_of_any(&block("192.168.1.0/24"), &parents));
        assert!(!subset_of_any(&block("172.16.0.0/12"), &parents));
        assert!(!subset_of_any(&block("10.0.0.0/8"), &[]));
    }
}
