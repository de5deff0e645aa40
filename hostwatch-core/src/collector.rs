use crate::command::{run_captured, CommandSpec};
use crate::error::CaptureError;
use async_trait::async_trait;
use std::time::Duration;

/// Resource-specific filtering applied before two captures are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Compare the raw text.
    Identity,
    /// Drop every line that starts with `#`.
    ///
    /// Every kept line is terminated with `\n`, so a missing final newline
    /// or one left dangling by a dropped trailing comment is not drift.
    StripComments,
}

impl Normalizer {
    pub fn apply(self, raw: &str) -> String {
        match self {
            Normalizer::Identity => raw.to_string(),
            Normalizer::StripComments => {
                let mut out = String::with_capacity(raw.len());
                for line in raw.lines().filter(|line| !line.starts_with('#')) {
                    out.push_str(line);
                    out.push('\n');
                }
                out
            }
        }
    }
}

/// Captures the full current state of one monitored resource as text.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short identifier used in task names and log fields.
    fn name(&self) -> &str;

    /// Human readable description, e.g. "iptables rules".
    fn subject(&self) -> &str;

    async fn capture(&self) -> Result<String, CaptureError>;

    fn normalize(&self, raw: &str) -> String;
}

/// A collector backed by a fixed external command.
#[derive(Debug, Clone)]
pub struct CommandCollector {
    name: String,
    subject: String,
    command: CommandSpec,
    normalizer: Normalizer,
    timeout: Duration,
}

impl CommandCollector {
    pub fn new(
        name: impl Into<String>,
        subject: impl Into<String>,
        command: CommandSpec,
        normalizer: Normalizer,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            subject: subject.into(),
            command,
            normalizer,
            timeout,
        }
    }

    /// Firewall rules as printed by `iptables-save`.
    ///
    /// Comment lines carry generation timestamps and are ignored.
    pub fn firewall(timeout: Duration) -> Self {
        Self::new(
            "iptables",
            "iptables rules",
            CommandSpec::new("iptables-save", Vec::<String>::new()),
            Normalizer::StripComments,
            timeout,
        )
    }

    /// The account database as printed by `getent passwd`, compared verbatim.
    pub fn accounts(timeout: Duration) -> Self {
        Self::new(
            "users",
            "users or their permissions",
            CommandSpec::new("getent", ["passwd"]),
            Normalizer::Identity,
            timeout,
        )
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }
}

#[async_trait]
impl Collector for CommandCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    async fn capture(&self) -> Result<String, CaptureError> {
        run_captured(&self.command, self.timeout).await
    }

    fn normalize(&self, raw: &str) -> String {
        self.normalizer.apply(raw)
    }
}
