use ipf_core::index::IpIndex;
use ipf_core::types::BlockSet;

use crate::policy::BuildError;

/// Build the query index for a finished block collection.
///
/// Every block is canonical by construction, so this currently always
/// succeeds; it returns the policy build's error type so callers compose it
/// with `?` alongside the other build steps.
pub fn build_index(set: &BlockSet) -> Result<IpIndex, BuildError> {
    let index = IpIndex::build(set);
    log::debug!(
        "index ready: {} blocks ({} v4, {} v6)",
        index.len(),
        index.v4().len(),
        index.v6().len()
    );
    Ok(index)
}
