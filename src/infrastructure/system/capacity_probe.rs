use serde::Serialize;

use super::ThreadTuningPlan;

pub const MAX_CONCURRENT_JOBS_VAR: &str = "RAG_MAX_CONCURRENT_JOBS";
pub const MAX_QUEUE_DEPTH_VAR: &str = "RAG_MAX_QUEUE_DEPTH";

const CPUS_PER_WORKER: usize = 32;
const MAX_AUTO_WORKERS: usize = 4;
const QUEUE_SLOTS_PER_WORKER: usize = 4;
const MAX_AUTO_QUEUE_DEPTH: usize = 16;
const MAX_THREADS_PER_WORKER: usize = 16;

const ONLINE_CPUS_PATH: &str = "/sys/devices/system/cpu/online";
const PROC_STATUS_PATH: &str = "/proc/self/status";
const CGROUP_V2_CPU_MAX: &str = "/sys/fs/cgroup/cpu.max";
const CGROUP_V1_QUOTA: &str = "/sys/fs/cgroup/cpu/cpu.cfs_quota_us";
const CGROUP_V1_PERIOD: &str = "/sys/fs/cgroup/cpu/cpu.cfs_period_us";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CgroupSource {
    CgroupV2,
    CgroupV1,
    None,
}

impl CgroupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CgroupSource::CgroupV2 => "cgroup-v2",
            CgroupSource::CgroupV1 => "cgroup-v1",
            CgroupSource::None => "none",
        }
    }
}

/// Raw OS readings the probe works from. Kept separate from the detection
/// logic so it can be fed canned values.
#[derive(Debug, Clone, Default)]
pub struct CpuReadings {
    pub online_cpus: Option<String>,
    pub proc_status: Option<String>,
    pub cgroup_v2_cpu_max: Option<String>,
    pub cgroup_v1_quota: Option<String>,
    pub cgroup_v1_period: Option<String>,
    pub available_parallelism: Option<usize>,
}

impl CpuReadings {
    pub fn from_system() -> Self {
        Self {
            online_cpus: read_trimmed(ONLINE_CPUS_PATH),
            proc_status: read_trimmed(PROC_STATUS_PATH),
            cgroup_v2_cpu_max: read_trimmed(CGROUP_V2_CPU_MAX),
            cgroup_v1_quota: read_trimmed(CGROUP_V1_QUOTA),
            cgroup_v1_period: read_trimmed(CGROUP_V1_PERIOD),
            available_parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .ok(),
        }
    }
}

fn read_trimmed(path: &str) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuBudget {
    pub host_cpu_count: usize,
    pub affinity_cpu_count: Option<usize>,
    pub cgroup_cpu_limit: Option<usize>,
    pub cgroup_source: CgroupSource,
    pub effective_cpu_count: usize,
    pub effective_cpu_source: String,
}

impl CpuBudget {
    pub fn detect() -> Self {
        Self::from_readings(&CpuReadings::from_system())
    }

    pub fn from_readings(readings: &CpuReadings) -> Self {
        let host_cpu_count = readings
            .online_cpus
            .as_deref()
            .and_then(count_cpu_list)
            .or(readings.available_parallelism)
            .unwrap_or(1)
            .max(1);

        let affinity_cpu_count = readings
            .proc_status
            .as_deref()
            .and_then(affinity_from_status);

        let (cgroup_cpu_limit, cgroup_source) = cgroup_limit(readings);

        let mut effective = host_cpu_count;
        let mut source = String::from("cpu_count");
        if let Some(affinity) = affinity_cpu_count {
            effective = effective.min(affinity);
            source.push_str("+affinity");
        }
        if let Some(limit) = cgroup_cpu_limit {
            effective = effective.min(limit);
            source.push('+');
            source.push_str(cgroup_source.as_str());
        }

        Self {
            host_cpu_count,
            affinity_cpu_count,
            cgroup_cpu_limit,
            cgroup_source,
            effective_cpu_count: effective.max(1),
            effective_cpu_source: source,
        }
    }
}

/// Counts entries in a kernel CPU list such as `0-3,8,10-11`.
pub fn count_cpu_list(list: &str) -> Option<usize> {
    let mut total = 0usize;
    for part in list.trim().split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: usize = start.trim().parse().ok()?;
                let end: usize = end.trim().parse().ok()?;
                if end < start {
                    return None;
                }
                total += end - start + 1;
            }
            None => {
                part.parse::<usize>().ok()?;
                total += 1;
            }
        }
    }
    (total > 0).then_some(total)
}

fn affinity_from_status(status: &str) -> Option<usize> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Cpus_allowed_list:"))
        .and_then(count_cpu_list)
}

/// Parses cgroup v2 `cpu.max` ("quota period" or "max period").
pub fn parse_cgroup_v2_cpu_max(raw: &str) -> Option<usize> {
    let mut fields = raw.split_whitespace();
    let quota = fields.next()?;
    let period = fields.next().unwrap_or("100000");
    if quota == "max" {
        return None;
    }
    quota_to_cpus(quota.parse().ok()?, period.parse().ok()?)
}

pub fn parse_cgroup_v1_quota(quota: &str, period: &str) -> Option<usize> {
    quota_to_cpus(quota.trim().parse().ok()?, period.trim().parse().ok()?)
}

fn quota_to_cpus(quota: i64, period: i64) -> Option<usize> {
    if quota <= 0 || period <= 0 {
        return None;
    }
    let cpus = (quota + period - 1) / period;
    Some(usize::try_from(cpus).ok()?.max(1))
}

fn cgroup_limit(readings: &CpuReadings) -> (Option<usize>, CgroupSource) {
    if let Some(limit) = readings
        .cgroup_v2_cpu_max
        .as_deref()
        .and_then(parse_cgroup_v2_cpu_max)
    {
        return (Some(limit), CgroupSource::CgroupV2);
    }

    if let (Some(quota), Some(period)) = (&readings.cgroup_v1_quota, &readings.cgroup_v1_period)
        && let Some(limit) = parse_cgroup_v1_quota(quota, period)
    {
        return (Some(limit), CgroupSource::CgroupV1);
    }

    (None, CgroupSource::None)
}

/// Document parsing saturates many cores per job, so workers stay few.
pub fn auto_worker_count(effective_cpus: usize) -> usize {
    (effective_cpus / CPUS_PER_WORKER).clamp(1, MAX_AUTO_WORKERS)
}

pub fn auto_queue_depth(workers: usize) -> usize {
    (QUEUE_SLOTS_PER_WORKER * workers.max(1)).min(MAX_AUTO_QUEUE_DEPTH)
}

pub fn auto_cpu_threads(effective_cpus: usize, workers: usize) -> usize {
    (effective_cpus / workers.max(1)).clamp(1, MAX_THREADS_PER_WORKER)
}

pub fn auto_interop_threads(threads: usize) -> usize {
    (threads / 8).clamp(1, 4)
}

/// Worker pool and queue sizing plus the thread plan derived from them.
#[derive(Debug, Clone, Serialize)]
pub struct CapacityPlan {
    #[serde(flatten)]
    pub cpu: CpuBudget,
    pub max_concurrent_jobs: usize,
    pub max_concurrent_jobs_source: String,
    pub max_queue_depth: usize,
    pub max_queue_depth_source: String,
    pub thread_tuning: ThreadTuningPlan,
}

impl CapacityPlan {
    /// Explicit overrides win; values that are not positive integers are
    /// ignored with a warning.
    pub fn resolve(cpu: CpuBudget, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let (max_concurrent_jobs, max_concurrent_jobs_source) =
            match positive_override(&lookup, MAX_CONCURRENT_JOBS_VAR) {
                Some(n) => (n, format!("env:{MAX_CONCURRENT_JOBS_VAR}")),
                None => (
                    auto_worker_count(cpu.effective_cpu_count),
                    "auto:cpu-discovery".to_string(),
                ),
            };

        let (max_queue_depth, max_queue_depth_source) =
            match positive_override(&lookup, MAX_QUEUE_DEPTH_VAR) {
                Some(n) => (n, format!("env:{MAX_QUEUE_DEPTH_VAR}")),
                None => (
                    auto_queue_depth(max_concurrent_jobs),
                    "auto:4x-workers".to_string(),
                ),
            };

        let thread_tuning =
            ThreadTuningPlan::plan(cpu.effective_cpu_count, max_concurrent_jobs, &lookup);

        Self {
            cpu,
            max_concurrent_jobs,
            max_concurrent_jobs_source,
            max_queue_depth,
            max_queue_depth_source,
            thread_tuning,
        }
    }

    pub fn from_env() -> Self {
        Self::resolve(CpuBudget::detect(), |key| std::env::var(key).ok())
    }
}

fn positive_override(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let raw = lookup(key)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => {
            tracing::warn!(variable = key, value = raw, "Ignoring invalid capacity override");
            None
        }
    }
}
