mod capacity_probe;
mod thread_tuning;

pub use capacity_probe::{
    CapacityPlan, CgroupSource, CpuBudget, CpuReadings, MAX_CONCURRENT_JOBS_VAR,
    MAX_QUEUE_DEPTH_VAR, auto_cpu_threads, auto_interop_threads, auto_queue_depth,
    auto_worker_count, count_cpu_list, parse_cgroup_v1_quota, parse_cgroup_v2_cpu_max,
};
pub use thread_tuning::{THREAD_TUNING_VAR, ThreadTuningPlan, parse_flag};
