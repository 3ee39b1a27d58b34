use std::cmp::Ordering;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::time::Instant;

use ipf_compiler::{Filter, Verdict};
use ipf_core::types::{V4Block, V6Block};
use ipf_core::wide::U128;

use crate::config;

pub struct BenchOptions {
    pub config_path: String,
    pub iterations: usize,
    pub addresses: usize,
    pub warmup_ops: usize,
    pub sample_batch_ops: usize,
    pub seed: u32,
}

pub fn run(opts: BenchOptions) -> Result<(), String> {
    println!("============================================================");
    println!("IPFence Benchmark");
    println!("============================================================");

    let (filter, stats) = config::build_filter(Path::new(&opts.config_path), false)?;
    println!(
        "Built filter: {} rule(s), {} blocked entries, {} allowed entries in {:.1}ms",
        stats.rules,
        stats.filter.block.v4_total() + stats.filter.block.v6,
        stats
            .filter
            .allow
            .map(|a| a.v4_total() + a.v6)
            .unwrap_or(0),
        stats.total_ms
    );

    let workload = generate_workload(&filter, opts.addresses, opts.seed);
    let v6_count = workload.iter().filter(|ip| ip.is_ipv6()).count();
    println!(
        "Workload: {} addresses ({} v4, {} v6), seed {:#x}",
        workload.len(),
        workload.len() - v6_count,
        v6_count,
        opts.seed
    );

    println!("Warmup...");
    warmup(&filter, &workload, opts.warmup_ops);

    println!("------------------------------------------------------------");
    let result = run_bench_batched(&filter, &workload, opts.iterations, opts.sample_batch_ops);
    println!("{}", format_result(&result));
    println!();

    println!("Notes:");
    println!("- p50/p95/p99 computed from per-batch wall-time samples divided by batch size.");
    println!("- Half the workload is drawn from inside the configured blocks.");

    Ok(())
}

struct BenchResult {
    op_count: usize,
    total_ms: f64,
    avg_us: f64,
    p50_us: f64,
    p95_us: f64,
    p99_us: f64,
    ops_per_sec: u64,
    blocked_pct: f64,
    allowed_pct: f64,
}

fn run_bench_batched(
    filter: &Filter,
    addrs: &[IpAddr],
    iterations: usize,
    sample_batch_ops: usize,
) -> BenchResult {
    let sample_batch_ops = sample_batch_ops.max(1);
    let mut samples_us = Vec::new();
    let mut blocked = 0usize;
    let mut allowed = 0usize;
    let total_ops = addrs.len() * iterations.max(1);

    let mut batch_ops = 0usize;
    let mut batch_start = Instant::now();
    let start = Instant::now();

    for _ in 0..iterations.max(1) {
        for &ip in addrs {
            match filter.verdict(ip) {
                Verdict::Block => blocked += 1,
                Verdict::Allow => allowed += 1,
                Verdict::Pass => {}
            }
            batch_ops += 1;
            if batch_ops == sample_batch_ops {
                let dt = batch_start.elapsed();
                let us_per_op = dt.as_secs_f64() * 1_000_000.0 / sample_batch_ops as f64;
                samples_us.push(us_per_op);
                batch_ops = 0;
                batch_start = Instant::now();
            }
        }
    }

    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
    samples_us.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let avg_us = if total_ops == 0 { 0.0 } else { total_ms * 1000.0 / total_ops as f64 };
    let pct = |n: usize| if total_ops > 0 { (n as f64 / total_ops as f64) * 100.0 } else { 0.0 };

    BenchResult {
        op_count: total_ops,
        total_ms,
        avg_us,
        p50_us: percentile(&samples_us, 0.50),
        p95_us: percentile(&samples_us, 0.95),
        p99_us: percentile(&samples_us, 0.99),
        ops_per_sec: if total_ms > 0.0 { (total_ops as f64 / (total_ms / 1000.0)) as u64 } else { 0 },
        blocked_pct: pct(blocked),
        allowed_pct: pct(allowed),
    }
}

fn format_result(result: &BenchResult) -> String {
    format!(
        "verdict:\n  Ops: {}\n  Total: {:.2} ms\n  Avg: {:.3} us\n  P50: {:.3} us\n  P95: {:.3} us\n  P99: {:.3} us\n  Throughput: {} ops/sec\n  Blocked: {:.1}%\n  Allowed: {:.1}%",
        result.op_count,
        result.total_ms,
        result.avg_us,
        result.p50_us,
        result.p95_us,
        result.p99_us,
        result.ops_per_sec,
        result.blocked_pct,
        result.allowed_pct,
    )
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((values.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(values.len() - 1);
    values[idx]
}

fn warmup(filter: &Filter, addrs: &[IpAddr], warmup_ops: usize) {
    let mut sink = 0usize;
    for &ip in addrs.iter().cycle().take(warmup_ops) {
        sink += filter.is_blocked(ip) as usize;
    }
    log::debug!("warmup: {warmup_ops} ops, {sink} blocked");
}

pub const DEFAULT_SEED: u32 = 0xc0ffee;

fn create_rng(seed: u32) -> impl FnMut() -> u32 {
    let mut state = seed;
    move || {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        state
    }
}

fn rand_u64(rand: &mut impl FnMut() -> u32) -> u64 {
    ((rand() as u64) << 32) | rand() as u64
}

fn pick<T: Copy>(items: &[T], rand: &mut impl FnMut() -> u32) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    Some(items[rand() as usize % items.len()])
}

fn random_in_v4(block: V4Block, rand: &mut impl FnMut() -> u32) -> Ipv4Addr {
    let host_mask = 1u32.checked_shl(block.shift() as u32).map_or(u32::MAX, |size| size - 1);
    Ipv4Addr::from(block.network() | (rand() & host_mask))
}

fn random_in_v6(block: V6Block, rand: &mut impl FnMut() -> u32) -> Ipv6Addr {
    let mask = U128::low_mask(128 - block.prefix() as u32);
    let host = U128::new(rand_u64(rand) & mask.hi, rand_u64(rand) & mask.lo);
    Ipv6Addr::from(block.network().bitor(host))
}

/// Deterministic address mix: 70% IPv4, and half of each family drawn from
/// inside the filter's own blocks so both verdict paths get exercised.
fn generate_workload(filter: &Filter, count: usize, seed: u32) -> Vec<IpAddr> {
    let mut rand = create_rng(seed);
    let listed = filter.block_index().to_block_set();

    (0..count)
        .map(|_| {
            let v6 = rand() % 10 >= 7;
            let inside = rand() % 2 == 0;
            if v6 {
                match pick(&listed.v6, &mut rand).filter(|_| inside) {
                    Some(block) => IpAddr::V6(random_in_v6(block, &mut rand)),
                    None => IpAddr::V6(Ipv6Addr::from(U128::new(rand_u64(&mut rand), rand_u64(&mut rand)))),
                }
            } else {
                match pick(&listed.v4, &mut rand).filter(|_| inside) {
                    Some(block) => IpAddr::V4(random_in_v4(block, &mut rand)),
                    None => IpAddr::V4(Ipv4Addr::from(rand())),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipf_compiler::{FilterConfig, RuleNode};

    #[test]
    fn percentile_picks_ceiling_rank() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.50), 2.0);
        assert_eq!(percentile(&values, 0.99), 4.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn workload_is_deterministic() {
        let filter = FilterConfig::new()
            .rule(RuleNode::block("10.0.0.0/8"))
            .rule(RuleNode::block("2001:db8::/32"))
            .build()
            .unwrap();
        let a = generate_workload(&filter, 200, DEFAULT_SEED);
        let b = generate_workload(&filter, 200, DEFAULT_SEED);
        assert_eq!(a, b);
        assert!(a.iter().any(|&ip| filter.is_blocked(ip)));
        assert!(a.iter().any(|ip| ip.is_ipv6()));
    }

    #[test]
    fn sampled_addresses_stay_in_block() {
        let mut rand = create_rng(1);
        let block = V4Block::new(0xc0a8_0000, 16).unwrap();
        for _ in 0..100 {
            assert!(block.contains(u32::from(random_in_v4(block, &mut rand))));
        }
        let block = V6Block::new(U128::new(0x2001_0db8 << 32, 0), 32).unwrap();
        for _ in 0..100 {
            assert!(block.contains(U128::from(random_in_v6(block, &mut rand))));
        }
    }
}
