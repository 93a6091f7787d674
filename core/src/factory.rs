use bytes::Bytes;

use crate::config::WorkloadConfig;
use crate::operation::Operation;

/// Produces the operation for a given job index.
///
/// Called in the dispatcher's hot path: implementations must be cheap,
/// deterministic in `(job_index, config)`, and side-effect free. The
/// read/write mix must be reproducible across runs with the same config.
pub trait OperationFactory: Send + Sync {
    fn create(&self, job_index: u64, config: &WorkloadConfig) -> Operation;
}

/// The canonical read/write split: job `i` is a read iff `i % 100` falls
/// under `read_percent`. Deterministic, uniform over any window of 100
/// consecutive indices.
pub fn is_read_index(job_index: u64, read_percent: u8) -> bool {
    (job_index % 100) < u64::from(read_percent)
}

/// Deterministic payload of `data_size` bytes for job `job_index`.
/// Cycles through the printable ASCII range so payloads are recognizable
/// in packet captures without being compressible to nothing.
pub fn payload_for(job_index: u64, data_size: usize) -> Bytes {
    let offset = (job_index % 64) as u8;
    let mut buf = Vec::with_capacity(data_size);
    for i in 0..data_size {
        buf.push(b'!' + ((offset as usize + i) % 94) as u8);
    }
    Bytes::from(buf)
}

impl<F> OperationFactory for F
where
    F: Fn(u64, &WorkloadConfig) -> Operation + Send + Sync,
{
    fn create(&self, job_index: u64, config: &WorkloadConfig) -> Operation {
        self(job_index, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_mix_is_deterministic_and_proportional() {
        let reads = (0..1000).filter(|i| is_read_index(*i, 30)).count();
        assert_eq!(reads, 300);

        // Same index, same answer, every time.
        for i in 0..200 {
            assert_eq!(is_read_index(i, 70), is_read_index(i, 70));
        }
    }

    #[test]
    fn read_percent_extremes() {
        assert!((0..500).all(|i| is_read_index(i, 100)));
        assert!((0..500).all(|i| !is_read_index(i, 0)));
    }

    #[test]
    fn payload_is_sized_and_deterministic() {
        let a = payload_for(7, 64);
        let b = payload_for(7, 64);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.iter().all(|b| b.is_ascii_graphic()));
    }

    #[test]
    fn closures_are_factories() {
        let factory = |i: u64, config: &WorkloadConfig| {
            Operation::new("echo", format!("k{i}")).with_value(payload_for(i, config.data_size))
        };
        let config = WorkloadConfig::default();
        let op = factory.create(3, &config);
        assert_eq!(op.key, "k3");
        assert_eq!(op.value.unwrap().len(), config.data_size);
    }
}
