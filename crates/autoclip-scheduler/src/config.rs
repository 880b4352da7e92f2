//! Admission concurrency computation (§4.7, §5): `autoConcurrency = min(cap,
//! floor((totalMemoryMB - reserveMB) / perJobMB), floor(CPU / cpuPerJob))`,
//! with an explicit override taking precedence when set.

use sysinfo::System;

/// Inputs to the `autoConcurrency` formula for a single queue (export,
/// transcribe, or render).
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyInputs {
    /// Hard ceiling regardless of detected resources.
    pub cap: u32,
    pub cpu_per_job: u32,
    pub memory_per_job_mb: u32,
    pub memory_reserve_mb: u32,
}

impl ConcurrencyInputs {
    /// Resolve to a concurrency limit, honoring an explicit override if
    /// present and clamping the result to at least 1.
    pub fn resolve(&self, explicit_override: Option<u32>, system: &System) -> u32 {
        if let Some(n) = explicit_override {
            return n.max(1);
        }

        let cpu_count = system.physical_core_count().unwrap_or(1).max(1) as u32;
        let total_memory_mb = (system.total_memory() / (1024 * 1024)) as u32;

        let by_cpu = cpu_count / self.cpu_per_job.max(1);
        let by_memory = total_memory_mb.saturating_sub(self.memory_reserve_mb) / self.memory_per_job_mb.max(1);

        [self.cap, by_cpu, by_memory].into_iter().min().unwrap_or(1).max(1)
    }
}

/// Resolved concurrency limits for all three admission points, computed once
/// at process start from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub export_concurrency: u32,
    pub transcribe_concurrency: u32,
    pub render_concurrency: u32,
    pub job_retention: std::time::Duration,
    pub transient_retry_limit: u32,
    pub transient_retry_base_delay: std::time::Duration,
}

const DEFAULT_JOB_RETENTION_MS: u64 = 60 * 60 * 1000;
const DEFAULT_TRANSIENT_RETRY_LIMIT: u32 = 3;
const DEFAULT_TRANSIENT_RETRY_DELAY_MS: u64 = 1_000;
const TRANSIENT_RETRY_MAX_DELAY: std::time::Duration = std::time::Duration::from_secs(180);

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_usage();

        let export_inputs = ConcurrencyInputs {
            cap: env_u32("EDITOR_EXPORT_MAX_CONCURRENCY", 4),
            cpu_per_job: env_u32("EDITOR_EXPORT_CPU_PER_JOB", 2),
            memory_per_job_mb: env_u32("EDITOR_EXPORT_MEMORY_PER_JOB_MB", 512),
            memory_reserve_mb: env_u32("EDITOR_EXPORT_MEMORY_RESERVE_MB", 1024),
        };
        let export_override = std::env::var("EDITOR_EXPORT_CONCURRENCY").ok().and_then(|v| v.parse().ok());

        Self {
            export_concurrency: export_inputs.resolve(export_override, &system),
            transcribe_concurrency: env_u32("AUTOCLIP_TRANSCRIBE_CONCURRENCY", 4),
            render_concurrency: env_u32("AUTOCLIP_RENDER_CONCURRENCY", 2),
            job_retention: std::time::Duration::from_millis(env_u64("AUTOCLIP_TRANSCRIBE_JOB_RETENTION_MS", DEFAULT_JOB_RETENTION_MS)),
            transient_retry_limit: env_u32("AUTOCLIP_TRANSCRIBE_JOB_TRANSIENT_RETRY_LIMIT", DEFAULT_TRANSIENT_RETRY_LIMIT),
            transient_retry_base_delay: std::time::Duration::from_millis(env_u64("AUTOCLIP_TRANSCRIBE_JOB_TRANSIENT_RETRY_DELAY_MS", DEFAULT_TRANSIENT_RETRY_DELAY_MS)),
        }
    }

    /// `base * 2^attempt`, capped at 180s (§4.7).
    pub fn transient_retry_delay(&self, attempt: u32) -> std::time::Duration {
        let scaled = self.transient_retry_base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        scaled.min(TRANSIENT_RETRY_MAX_DELAY)
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_explicit_override() {
        let inputs = ConcurrencyInputs { cap: 10, cpu_per_job: 1, memory_per_job_mb: 1, memory_reserve_mb: 0 };
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_usage();
        assert_eq!(inputs.resolve(Some(7), &system), 7);
    }

    #[test]
    fn resolve_never_returns_zero() {
        let inputs = ConcurrencyInputs { cap: 4, cpu_per_job: 1000, memory_per_job_mb: 1_000_000, memory_reserve_mb: 0 };
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_usage();
        assert!(inputs.resolve(None, &system) >= 1);
    }

    #[test]
    fn transient_retry_delay_caps_at_180_seconds() {
        let config = SchedulerConfig {
            export_concurrency: 1,
            transcribe_concurrency: 1,
            render_concurrency: 1,
            job_retention: std::time::Duration::from_secs(3600),
            transient_retry_limit: 3,
            transient_retry_base_delay: std::time::Duration::from_secs(1),
        };
        assert_eq!(config.transient_retry_delay(0), std::time::Duration::from_secs(1));
        assert_eq!(config.transient_retry_delay(20), std::time::Duration::from_secs(180));
    }
}
