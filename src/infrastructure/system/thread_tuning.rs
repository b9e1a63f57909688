use std::collections::BTreeMap;

use serde::Serialize;

use super::{auto_cpu_threads, auto_interop_threads};

pub const THREAD_TUNING_VAR: &str = "RAG_AUTO_CPU_THREAD_TUNING";

const THREAD_COUNT_KEYS: [&str; 5] = [
    "OMP_NUM_THREADS",
    "MKL_NUM_THREADS",
    "OPENBLAS_NUM_THREADS",
    "NUMEXPR_NUM_THREADS",
    "TORCH_NUM_THREADS",
];
const INTEROP_KEY: &str = "TORCH_NUM_INTEROP_THREADS";
const FIXED_KEYS: [(&str, &str); 4] = [
    ("OMP_DYNAMIC", "FALSE"),
    ("MKL_DYNAMIC", "FALSE"),
    ("OMP_WAIT_POLICY", "PASSIVE"),
    ("TOKENIZERS_PARALLELISM", "false"),
];

/// Numeric-library thread settings for the document engine, sized so that
/// workers times threads stays within the CPU budget. Keys already present
/// in the environment are reported as preserved and never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThreadTuningPlan {
    pub enabled: bool,
    pub source: String,
    pub recommended_threads: usize,
    pub recommended_torch_interop_threads: usize,
    pub applied_env: BTreeMap<String, String>,
    pub preserved_env: BTreeMap<String, String>,
}

impl ThreadTuningPlan {
    pub fn plan(
        effective_cpus: usize,
        workers: usize,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Self {
        let threads = auto_cpu_threads(effective_cpus, workers);
        let interop = auto_interop_threads(threads);

        if lookup(THREAD_TUNING_VAR).is_some_and(|raw| parse_flag(&raw) == Some(false)) {
            return Self {
                enabled: false,
                source: format!("env:{THREAD_TUNING_VAR}=false"),
                recommended_threads: threads,
                recommended_torch_interop_threads: interop,
                ..Self::default()
            };
        }

        let threads_value = threads.to_string();
        let interop_value = interop.to_string();
        let wanted = THREAD_COUNT_KEYS
            .iter()
            .map(|key| (*key, threads_value.as_str()))
            .chain(std::iter::once((INTEROP_KEY, interop_value.as_str())))
            .chain(FIXED_KEYS.iter().copied());

        let mut applied_env = BTreeMap::new();
        let mut preserved_env = BTreeMap::new();
        for (key, value) in wanted {
            match lookup(key).filter(|existing| !existing.trim().is_empty()) {
                Some(existing) => {
                    preserved_env.insert(key.to_string(), existing);
                }
                None => {
                    applied_env.insert(key.to_string(), value.to_string());
                }
            }
        }

        Self {
            enabled: true,
            source: "auto:cpu-budget".to_string(),
            recommended_threads: threads,
            recommended_torch_interop_threads: interop,
            applied_env,
            preserved_env,
        }
    }

    /// Exports `applied_env` into the process environment.
    ///
    /// # Safety
    ///
    /// Must run before any other thread exists (in particular before the
    /// async runtime is built), since `std::env::set_var` is not safe to
    /// call while other threads may read the environment.
    pub unsafe fn apply(&self) {
        for (key, value) in &self.applied_env {
            // SAFETY: upheld by the caller; the process is still single-threaded.
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Accepts the usual spellings; anything else is treated as unset.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
