use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("POWERD_GIT_SHA"),
    ")"
);

#[derive(Parser)]
#[command(name = "powerd")]
#[command(about = "Wake lock arbiter and power management client")]
#[command(version, long_version = LONG_VERSION)]
pub struct Cli {
    /// Config file (default: <home>/powerd.yaml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the arbiter until SIGINT or SIGTERM
    Daemon,

    /// Hold a wake lock for a while, then release it
    Example {
        /// Number of seconds to hold the lock
        #[arg(long, default_value = "5")]
        sleep_sec: u64,

        #[arg(long, default_value = "power_example")]
        tag: String,

        #[arg(long, default_value = "power")]
        package: String,
    },

    /// Ask the arbiter to reboot
    Reboot {
        /// Empty or "recovery"
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Ask the arbiter to power off
    Shutdown {
        /// Empty or "userrequested"
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Print the arbiter's wake lock state
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_example_defaults() {
        let cli = Cli::try_parse_from(["powerd", "example"]).unwrap();
        match cli.command {
            Command::Example {
                sleep_sec,
                tag,
                package,
            } => {
                assert_eq!(sleep_sec, 5);
                assert_eq!(tag, "power_example");
                assert_eq!(package, "power");
            }
            _ => panic!("expected example command"),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_reboot_reason_and_global_config() {
        let cli =
            Cli::try_parse_from(["powerd", "reboot", "--reason", "recovery", "--config", "c.yaml"])
                .unwrap();
        assert!(matches!(cli.command, Command::Reboot { ref reason } if reason == "recovery"));
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
    }

    #[test]
    fn requires_a_command() {
        assert!(Cli::try_parse_from(["powerd"]).is_err());
    }
}
