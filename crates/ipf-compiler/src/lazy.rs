//! Build-on-first-use filter
//!
//! The filter is built by whichever caller queries first; concurrent callers
//! wait for that one build and then share its result. A failed build is
//! cached like a successful one and never retried.

use std::net::IpAddr;
use std::sync::OnceLock;

use crate::policy::{BuildError, Filter, FilterConfig, Verdict};

pub struct LazyFilter {
    config: FilterConfig,
    built: OnceLock<Result<Filter, BuildError>>,
}

impl LazyFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            built: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Whether the build has already run (successfully or not).
    pub fn is_built(&self) -> bool {
        self.built.get().is_some()
    }

    /// The filter, building it on first call.
    pub fn get(&self) -> Result<&Filter, &BuildError> {
        self.built
            .get_or_init(|| {
                let result = self.config.build();
                match &result {
                    Ok(filter) => {
                        let stats = filter.stats();
                        log::debug!(
                            "filter built: {} blocked entries, allowlist {}",
                            stats.block.v4_total() + stats.block.v6,
                            if stats.allow.is_some() { "present" } else { "absent" }
                        );
                    }
                    Err(e) => log::error!("filter build failed, every query will pass: {e}"),
                }
                result
            })
            .as_ref()
    }

    /// Verdict for `ip`, or [`Verdict::Pass`] when the build failed.
    pub fn matches_or_pass(&self, ip: IpAddr) -> Verdict {
        match self.get() {
            Ok(filter) => filter.verdict(ip),
            Err(_) => Verdict::Pass,
        }
    }

    /// Group form of [`LazyFilter::matches_or_pass`].
    pub fn verdict_any_or_pass<I>(&self, addrs: I) -> Verdict
    where
        I: IntoIterator<Item = IpAddr>,
    {
        match self.get() {
            Ok(filter) => filter.verdict_any(addrs),
            Err(_) => Verdict::Pass,
        }
    }
}
