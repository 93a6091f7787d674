use stampede_core::factory::{is_read_index, payload_for};
use stampede_core::{Operation, OperationFactory, Protocol, WorkloadConfig};

/// Keys cycle through a bounded space so read-style operations can hit
/// data written earlier in the same run.
const KEY_SPACE: u64 = 1024;

/// Maps (job index, test case) to a concrete operation for the configured
/// protocol. Deterministic and allocation-light; this runs in the
/// dispatcher's hot path.
pub struct DefaultOperationFactory {
    protocol: Protocol,
}

impl DefaultOperationFactory {
    pub fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }

    fn key(job_index: u64) -> String {
        format!("bench:{}", job_index % KEY_SPACE)
    }
}

impl OperationFactory for DefaultOperationFactory {
    fn create(&self, job_index: u64, config: &WorkloadConfig) -> Operation {
        let read = is_read_index(job_index, config.read_percent);
        match config.test_case.as_str() {
            "echo_test" => Operation::new("echo", Self::key(job_index))
                .with_value(payload_for(job_index, config.data_size)),
            "ping_test" => Operation::new("ping", Self::key(job_index))
                .with_value(payload_for(job_index, config.data_size)),
            // Default mixed workload, shaped per protocol.
            _ => match self.protocol {
                Protocol::Http => {
                    if read {
                        Operation::new("get", Self::key(job_index))
                    } else {
                        Operation::new("post", Self::key(job_index))
                            .with_value(payload_for(job_index, config.data_size))
                    }
                }
                Protocol::Tcp | Protocol::Udp => Operation::new("echo", Self::key(job_index))
                    .with_value(payload_for(job_index, config.data_size)),
                _ => {
                    if read {
                        Operation::new("get", Self::key(job_index))
                    } else {
                        Operation::new("set", Self::key(job_index))
                            .with_value(payload_for(job_index, config.data_size))
                    }
                }
            },
        }
    }
}
