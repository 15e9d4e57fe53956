use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "petvault",
    about = "Keeps your virtual pet's progress in an encrypted local save",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to `status` when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load the save and print the pet with its latest messages.
    Status,
    /// Say something to the pet and save right away.
    Say {
        /// Message text; multiple words are joined with spaces.
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Delete the saved game. The next run starts a fresh pet.
    Reset,
    /// Seal and re-open a probe record through the configured store.
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_status_when_missing_subcommand() {
        let cli = Cli::try_parse_from(["petvault"]).expect("parse should succeed");
        assert_eq!(cli.command, None);
    }

    #[test]
    fn parses_say_with_multiple_words() {
        let cli = Cli::try_parse_from(["petvault", "say", "good", "boy"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Some(Command::Say {
                text: vec!["good".into(), "boy".into()]
            })
        );
    }

    #[test]
    fn say_requires_text() {
        assert!(Cli::try_parse_from(["petvault", "say"]).is_err());
    }

    #[test]
    fn parses_reset_and_health() {
        let reset = Cli::try_parse_from(["petvault", "reset"]).expect("parse should succeed");
        assert_eq!(reset.command, Some(Command::Reset));
        let health = Cli::try_parse_from(["petvault", "health"]).expect("parse should succeed");
        assert_eq!(health.command, Some(Command::Health));
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli =
            Cli::try_parse_from(["petvault", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::Config(ConfigCommand::Init)));
    }
}
