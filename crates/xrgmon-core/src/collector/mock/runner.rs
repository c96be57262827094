//! Scripted `CommandRunner` for testing the GPU backend probe.

use crate::collector::traits::CommandRunner;
use std::io;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    needle: String,
    output: Option<String>,
}

/// Command runner that answers from a list of scripted rules.
///
/// A rule matches when the program name is equal and one of the arguments
/// contains the rule's needle. The first matching rule wins. Unmatched
/// invocations fail as if the program were not installed. Every invocation
/// is recorded so tests can assert on what was (or was not) spawned.
#[derive(Debug, Default)]
pub struct MockRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `program` with `output` when an argument contains `needle`.
    pub fn respond(
        mut self,
        program: impl Into<String>,
        needle: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        self.rules.push(Rule {
            program: program.into(),
            needle: needle.into(),
            output: Some(output.into()),
        });
        self
    }

    /// Makes `program` fail (non-zero exit) when an argument contains `needle`.
    pub fn fail(mut self, program: impl Into<String>, needle: impl Into<String>) -> Self {
        self.rules.push(Rule {
            program: program.into(),
            needle: needle.into(),
            output: None,
        });
        self
    }

    /// Command lines run so far, program and arguments joined by spaces.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            let mut line = program.to_string();
            for arg in args {
                line.push(' ');
                line.push_str(arg);
            }
            calls.push(line);
        }

        let rule = self
            .rules
            .iter()
            .find(|r| r.program == program && args.iter().any(|a| a.contains(&r.needle)));

        match rule {
            Some(Rule {
                output: Some(output),
                ..
            }) => Ok(output.clone()),
            Some(_) => Err(io::Error::other(format!("{} exited with 1", program))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("program not found: {}", program),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_matches_by_argument() {
        let runner = MockRunner::new()
            .respond("nvidia-smi", "name,memory.total", "GeForce GTX 680, 2048\n")
            .fail("nvidia-smi", "utilization.gpu");

        let probe = runner
            .run("nvidia-smi", &["--query-gpu=name,memory.total"])
            .unwrap();
        assert_eq!(probe, "GeForce GTX 680, 2048\n");

        assert!(
            runner
                .run("nvidia-smi", &["--query-gpu=utilization.gpu"])
                .is_err()
        );
        assert_eq!(
            runner.run("rocm-smi", &[]).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(runner.calls().len(), 3);
        assert_eq!(runner.calls()[0], "nvidia-smi --query-gpu=name,memory.total");
    }
}
