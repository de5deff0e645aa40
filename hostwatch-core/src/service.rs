use crate::command::{run_captured, CommandSpec};
use crate::error::CaptureError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::error;

/// Source of the currently running service identifiers.
#[async_trait]
pub trait ServiceSource: Send + Sync {
    /// Running services, or an empty list if the manager is unavailable.
    async fn list_active(&self) -> Vec<String>;
}

/// Queries systemd for running service units.
pub struct SystemctlServices {
    command: CommandSpec,
    timeout: Duration,
}

impl SystemctlServices {
    pub fn new(timeout: Duration) -> Self {
        Self::with_command(
            CommandSpec::new(
                "systemctl",
                [
                    "list-units",
                    "--type=service",
                    "--state=running",
                    "--no-pager",
                    "--plain",
                    "--no-legend",
                ],
            ),
            timeout,
        )
    }

    pub(crate) fn with_command(command: CommandSpec, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    async fn query(&self) -> Result<Vec<String>, CaptureError> {
        let stdout = run_captured(&self.command, self.timeout).await?;
        Ok(parse_service_units(&stdout))
    }
}

#[async_trait]
impl ServiceSource for SystemctlServices {
    async fn list_active(&self) -> Vec<String> {
        match self.query().await {
            Ok(services) => services,
            Err(e) => {
                error!(error = %e, "Error retrieving active services");
                Vec::new()
            }
        }
    }
}

/// Extract unit names from `systemctl list-units` output.
///
/// Format: UNIT LOAD ACTIVE SUB DESCRIPTION. Only lines mentioning a
/// `.service` unit count; the identifier is the first token.
pub fn parse_service_units(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains(".service"))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_listing() {
        let output = "\
cron.service           loaded active running Regular background program processing daemon
dbus.service           loaded active running D-Bus System Message Bus
ssh.service            loaded active running OpenBSD Secure Shell server
";
        assert_eq!(
            parse_service_units(output),
            vec!["cron.service", "dbus.service", "ssh.service"]
        );
    }

    #[test]
    fn skips_header_and_legend_lines() {
        let output = "\
  UNIT                LOAD   ACTIVE SUB     DESCRIPTION
  nginx.service       loaded active running A high performance web server

LOAD   = Reflects whether the unit definition was properly loaded.
1 loaded units listed.
";
        assert_eq!(parse_service_units(output), vec!["nginx.service"]);
    }

    #[test]
    fn empty_output_yields_nothing() {
        assert!(parse_service_units("").is_empty());
    }

    fn services_from(program: &str, args: &[&str]) -> SystemctlServices {
        SystemctlServices::with_command(
            CommandSpec::new(program, args.iter().copied()),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn missing_service_manager_lists_nothing() {
        let services = services_from("hostwatch-no-such-binary", &[]);
        assert!(services.list_active().await.is_empty());
    }

    #[tokio::test]
    async fn failing_service_manager_lists_nothing() {
        let services = services_from(
            "sh",
            &["-c", "echo 'Failed to connect to bus' >&2; exit 1"],
        );
        assert!(services.list_active().await.is_empty());
    }

    #[tokio::test]
    async fn hung_service_manager_lists_nothing() {
        let services = SystemctlServices::with_command(
            CommandSpec::new("sh", ["-c", "sleep 5"]),
            Duration::from_millis(100),
        );
        assert!(services.list_active().await.is_empty());
    }

    #[tokio::test]
    async fn listing_is_parsed_from_command_output() {
        let services = services_from(
            "sh",
            &["-c", "printf 'sshd.service loaded active running OpenSSH\n'"],
        );
        assert_eq!(services.list_active().await, vec!["sshd.service"]);
    }
}
