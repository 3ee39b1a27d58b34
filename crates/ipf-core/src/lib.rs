//! IPFence Core Library
//!
//! This crate provides the address-set model and the membership query of the
//! IPFence engine.
//!
//! # Architecture
//!
//! Blocks are stored pre-shifted (`base >> host_bits`) so a membership test is
//! one shift and one compare. A finished block collection is turned into an
//! immutable [`IpIndex`]: IPv4 blocks bucketed by common prefix length, IPv6
//! blocks kept flat. The hot path does no allocations and takes no locks.
//!
//! # Modules
//!
//! - `wide`: two-lane 128-bit arithmetic for IPv6
//! - `domain`: integer domain abstraction shared by both families
//! - `types`: families, blocks, block collections
//! - `index`: bucketed query index
//! - `matcher`: membership query

pub mod domain;
pub mod index;
pub mod matcher;
pub mod types;
pub mod wide;

// Re-export commonly used types
pub use domain::AddressDomain;
pub use index::{IndexStats, IpIndex, V4Buckets};
pub use types::{Block, BlockSet, Family, PrefixError, V4Block, V6Block};
pub use wide::U128;
