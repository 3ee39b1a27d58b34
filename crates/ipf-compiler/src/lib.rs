//! IPFence rule compiler
//!
//! Turns address rules (CIDR literals, presets, exclusions) into the
//! query index defined in `ipf-core`: parse, convert to intervals, merge,
//! subtract, decompose back into minimal CIDR blocks, then bucket.

pub mod algebra;
pub mod builder;
pub mod decompose;
pub mod lazy;
pub mod optimizer;
pub mod parser;
pub mod policy;
pub mod presets;
pub mod ranges;
pub mod subset;

pub use algebra::{combine, difference, merge, union, Overlap};
pub use builder::build_index;
pub use decompose::{decompose, decompose_range, decompose_range_text};
pub use lazy::LazyFilter;
pub use optimizer::{normalize, optimize_blocks, OptimizeStats};
pub use parser::{parse_address, parse_rule, parse_rule_list, parse_rules, ParseError, ParseMode};
pub use policy::{BuildError, ExcludeMode, Filter, FilterConfig, FilterStats, RuleKind, RuleNode, Verdict};
pub use presets::{load_preset, Preset};
pub use ranges::{block_set_intervals, FamilyBlock, Interval};
pub use subset::{subset_of_any, subtract_subset};
