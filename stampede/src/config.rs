use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use envconfig::Envconfig;
use stampede_core::{BenchConfig, ConnectionConfig, PoolSettings, Protocol, WorkloadConfig};
use stampede_report::{ReportConfig, ReportFormat};

/// Environment-driven configuration, one variable per knob.
///
/// Everything maps into the validated core config trees before anything
/// else runs; this struct itself never travels past `main`.
#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "simulation")]
    pub protocol: Protocol,

    /// Comma-separated target addresses.
    #[envconfig(default = "")]
    pub addresses: String,

    pub username: Option<String>,
    pub password: Option<String>,

    #[envconfig(default = "false")]
    pub tls: bool,

    #[envconfig(default = "5000")]
    pub operation_timeout_ms: u64,

    #[envconfig(default = "1000")]
    pub total: u64,

    #[envconfig(default = "8")]
    pub parallels: usize,

    #[envconfig(default = "64")]
    pub data_size: usize,

    /// 0 means count-bounded.
    #[envconfig(default = "0")]
    pub duration_ms: u64,

    #[envconfig(default = "0")]
    pub ramp_up_ms: u64,

    #[envconfig(default = "echo_test")]
    pub test_case: String,

    #[envconfig(default = "50")]
    pub read_percent: u8,

    #[envconfig(default = "256")]
    pub job_buffer_size: usize,

    #[envconfig(default = "256")]
    pub result_buffer_size: usize,

    #[envconfig(default = "10")]
    pub pool_size: usize,

    #[envconfig(default = "2")]
    pub pool_min_idle: usize,

    #[envconfig(default = "10")]
    pub pool_max_idle: usize,

    #[envconfig(default = "5000")]
    pub pool_connection_timeout_ms: u64,

    /// Comma-separated subset of console,json,csv,html.
    #[envconfig(default = "console")]
    pub report_formats: String,

    #[envconfig(default = ".")]
    pub report_output_dir: String,

    #[envconfig(default = "benchmark_report")]
    pub report_file_prefix: String,

    #[envconfig(default = "true")]
    pub report_include_timestamp: bool,

    /// Simulation adapter: fraction of operations that succeed.
    #[envconfig(default = "0.9")]
    pub simulate_success_ratio: f64,

    #[envconfig(default = "50")]
    pub simulate_min_latency_ms: u64,

    #[envconfig(default = "200")]
    pub simulate_max_latency_ms: u64,
}

impl Config {
    pub fn bench_config(&self) -> BenchConfig {
        BenchConfig {
            protocol: self.protocol,
            connection: ConnectionConfig {
                addresses: self
                    .addresses
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect(),
                username: self.username.clone(),
                password: self.password.clone(),
                pool: PoolSettings {
                    pool_size: self.pool_size,
                    min_idle: self.pool_min_idle,
                    max_idle: self.pool_max_idle,
                    idle_timeout: Duration::from_secs(300),
                    connection_timeout: Duration::from_millis(self.pool_connection_timeout_ms),
                },
                timeout: Duration::from_millis(self.operation_timeout_ms),
                tls: self.tls,
            },
            workload: WorkloadConfig {
                total: self.total,
                parallels: self.parallels,
                data_size: self.data_size,
                duration: Duration::from_millis(self.duration_ms),
                ramp_up: Duration::from_millis(self.ramp_up_ms),
                test_case: self.test_case.clone(),
                read_percent: self.read_percent,
                job_buffer_size: self.job_buffer_size,
                result_buffer_size: self.result_buffer_size,
            },
        }
    }

    pub fn report_config(&self) -> Result<ReportConfig, String> {
        let mut formats = HashSet::new();
        for part in self.report_formats.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            formats.insert(part.parse::<ReportFormat>()?);
        }
        Ok(ReportConfig {
            formats,
            output_dir: PathBuf::from(&self.report_output_dir),
            file_prefix: self.report_file_prefix.clone(),
            include_timestamp: self.report_include_timestamp,
        })
    }
}
