use ipf_core::types::BlockSet;

use crate::algebra::union;

pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub v4_before: usize,
    pub v4_after: usize,
    pub v6_before: usize,
    pub v6_after: usize,
}

impl OptimizeStats {
    pub fn removed(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}

/// Deduplicate and coalesce a block collection into its minimal cover.
pub fn normalize(set: &BlockSet) -> BlockSet {
    union([set])
}

/// In-place form of [`normalize`] that reports how much the collection shrank.
pub fn optimize_blocks(set: &mut BlockSet) -> OptimizeStats {
    let v4_before = set.v4.len();
    let v6_before = set.v6.len();

    *set = normalize(set);

    let stats = OptimizeStats {
        before: v4_before + v6_before,
        after: set.len(),
        v4_before,
        v4_after: set.v4.len(),
        v6_before,
        v6_after: set.v6.len(),
    };

    log::debug!(
        "normalized {} blocks into {} (v4 {} -> {}, v6 {} -> {})",
        stats.before,
        stats.after,
        stats.v4_before,
        stats.v4_after,
        stats.v6_before,
        stats.v6_after
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_rules, ParseMode};

    fn texts(set: &BlockSet) -> Vec<String> {
        set.iter().map(|b| b.to_string()).collect()
    }

    #[test]
    fn duplicates_collapse() {
        let mut set =
            parse_rules(["10.0.0.0/8", "10.0.0.0/8", "10.1.0.0/16", "::1", "::1"], ParseMode::Strict)
                .unwrap();
        let stats = optimize_blocks(&mut set);
        assert_eq!(texts(&set), vec!["10.0.0.0/8", "::1/128"]);
        assert_eq!(stats.before, 5);
        assert_eq!(stats.after, 2);
        assert_eq!(stats.removed(), 3);
    }

    #[test]
    fn adjacent_halves_coalesce() {
        let set = parse_rules(["192.168.0.0/17", "192.168.128.0/17"], ParseMode::Strict).unwrap();
        assert_eq!(texts(&normalize(&set)), vec!["192.168.0.0/16"]);

        let set = parse_rules(["::/1", "8000::/1"], ParseMode::Strict).unwrap();
        assert_eq!(texts(&normalize(&set)), vec!["::/0"]);
    }

    #[test]
    fn empty_stays_empty() {
        let mut set = BlockSet::new();
        let stats = optimize_blocks(&mut set);
        assert!(set.is_empty());
        assert_eq!(stats.before, 0);
        assert_eq!(stats.after, 0);
    }
}
