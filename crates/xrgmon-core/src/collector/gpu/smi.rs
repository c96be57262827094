//! Invocation and output parsing of the vendor diagnostic tool.
//!
//! The tool is queried in CSV mode without header or units, so every line is
//! one GPU and every column is one requested field in request order.

use crate::collector::CollectError;
use crate::collector::traits::CommandRunner;

/// Arguments for the one-time capability probe.
pub const PROBE_ARGS: &[&str] = &[
    "--query-gpu=name,memory.total",
    "--format=csv,noheader,nounits",
];

/// Arguments for the per-tick query. Column order matches `SmiSample`.
pub const SAMPLE_ARGS: &[&str] = &[
    "--query-gpu=utilization.gpu,memory.used,memory.total,temperature.gpu,power.draw",
    "--format=csv,noheader,nounits",
];

/// One per-tick reading. A `None` field was reported as `[N/A]` or garbage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmiSample {
    pub utilization: Option<f64>,
    pub memory_used_mb: Option<f64>,
    pub memory_total_mb: Option<f64>,
    pub temperature: Option<f64>,
    pub power_watts: Option<f64>,
}

/// Parses the probe output into device name and total memory (MB).
///
/// Only the first line matters. An empty name is a failed probe; an
/// unparsable memory figure is reported as 0.
pub fn parse_probe(output: &str) -> Option<(String, f64)> {
    let line = output.lines().next()?.trim();
    let (name, memory) = match line.split_once(',') {
        Some((name, memory)) => (name.trim(), memory.trim().parse().unwrap_or(0.0)),
        None => (line, 0.0),
    };
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), memory))
}

/// Parses line `index` of the per-tick query output.
pub fn parse_sample(output: &str, index: usize) -> Option<SmiSample> {
    let line = output.lines().nth(index)?;
    let mut fields = line.split(',').map(|f| f.trim().parse::<f64>().ok());
    let mut next = || fields.next().flatten();
    Some(SmiSample {
        utilization: next(),
        memory_used_mb: next(),
        memory_total_mb: next(),
        temperature: next(),
        power_watts: next(),
    })
}

/// Runs the capability probe.
///
/// A tool that runs but names no device is a `CollectError::Command`.
pub fn query_probe<R: CommandRunner>(runner: &R, tool: &str) -> Result<(String, f64), CollectError> {
    let output = runner.run(tool, PROBE_ARGS)?;
    parse_probe(&output)
        .ok_or_else(|| CollectError::Command(format!("{} reported no device", tool)))
}

/// Runs the per-tick query and returns the line for device `index`.
pub fn query_sample<R: CommandRunner>(
    runner: &R,
    tool: &str,
    index: usize,
) -> Result<SmiSample, CollectError> {
    let output = runner.run(tool, SAMPLE_ARGS)?;
    parse_sample(&output, index)
        .ok_or_else(|| CollectError::Command(format!("{} has no output line for device {}", tool, index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockRunner;

    #[test]
    fn test_parse_probe() {
        assert_eq!(
            parse_probe("NVIDIA GeForce RTX 3090, 24576\n"),
            Some(("NVIDIA GeForce RTX 3090".to_string(), 24576.0))
        );
        assert_eq!(
            parse_probe("Tesla T4, [N/A]\n"),
            Some(("Tesla T4".to_string(), 0.0))
        );
        assert_eq!(parse_probe(""), None);
        assert_eq!(parse_probe("  \n"), None);
    }

    #[test]
    fn test_parse_sample() {
        let out = "37, 1024, 8192, 61, 123.45\n5, 10, 4096, 40, [N/A]\n";

        let first = parse_sample(out, 0).unwrap();
        assert_eq!(first.utilization, Some(37.0));
        assert_eq!(first.memory_used_mb, Some(1024.0));
        assert_eq!(first.memory_total_mb, Some(8192.0));
        assert_eq!(first.temperature, Some(61.0));
        assert_eq!(first.power_watts, Some(123.45));

        let second = parse_sample(out, 1).unwrap();
        assert_eq!(second.power_watts, None);
        assert!(parse_sample(out, 2).is_none());
    }

    #[test]
    fn test_parse_sample_short_line() {
        let sample = parse_sample("42\n", 0).unwrap();
        assert_eq!(sample.utilization, Some(42.0));
        assert_eq!(sample.temperature, None);
    }

    #[test]
    fn test_query_errors_distinguish_spawn_and_output() {
        let empty = MockRunner::new().respond("nvidia-smi", "name", "\n");
        assert!(matches!(
            query_probe(&empty, "nvidia-smi"),
            Err(CollectError::Command(_))
        ));

        let missing = MockRunner::new();
        assert!(matches!(
            query_probe(&missing, "nvidia-smi"),
            Err(CollectError::Io(_))
        ));

        let one_gpu = MockRunner::new().respond("nvidia-smi", "utilization.gpu", "10, 1, 2, 3, 4\n");
        assert!(query_sample(&one_gpu, "nvidia-smi", 0).is_ok());
        let err = query_sample(&one_gpu, "nvidia-smi", 1).unwrap_err();
        assert!(matches!(err, CollectError::Command(_)));
        assert!(err.to_string().contains("device 1"));
    }
}
