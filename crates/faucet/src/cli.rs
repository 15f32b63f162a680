use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::workflow::Operation;

#[derive(Parser, Debug)]
#[command(
    name = "faucet",
    version,
    about = "Ship tagged source to droplets, build it with docker and run it"
)]
pub(crate) struct Args {
    /// Credentials file (defaults to ./faucet.json).
    ///
    /// Must come before the first machine/tag/image word; anything after
    /// that word is passed through to the operation.
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: CommandKind,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CommandKind {
    /// copy code at a given tag to a machine
    Load(Positional),
    /// show which code has been copied to a machine
    Loaded(Positional),
    /// build an image from loaded code on a machine
    Build(Positional),
    /// show built images
    Built(Positional),
    /// run a container on a machine
    Up(Positional),
    /// stop a container on a machine
    Down(Positional),
    /// show containers running on a machine
    Status(Positional),
}

/// Raw positional words; arity is checked by the operation itself.
#[derive(clap::Args, Debug)]
pub(crate) struct Positional {
    #[arg(
        value_name = "ARGS",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) args: Vec<String>,
}

impl CommandKind {
    pub(crate) fn into_parts(self) -> (Operation, Vec<String>) {
        match self {
            Self::Load(p) => (Operation::Load, p.args),
            Self::Loaded(p) => (Operation::Loaded, p.args),
            Self::Build(p) => (Operation::Build, p.args),
            Self::Built(p) => (Operation::Built, p.args),
            Self::Up(p) => (Operation::Up, p.args),
            Self::Down(p) => (Operation::Down, p.args),
            Self::Status(p) => (Operation::Status, p.args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn up_keeps_hyphenated_trailing_words() {
        let args = Args::try_parse_from([
            "faucet", "up", "web-1", "acme/app:3", "serve", "--port", "8080",
        ])
        .unwrap();
        let (operation, words) = args.command.into_parts();
        assert_eq!(operation, Operation::Up);
        assert_eq!(words, vec!["web-1", "acme/app:3", "serve", "--port", "8080"]);
    }

    #[test]
    fn wrong_arity_still_parses() {
        let args = Args::try_parse_from(["faucet", "down", "web-1"]).unwrap();
        let (operation, words) = args.command.into_parts();
        assert_eq!(operation, Operation::Down);
        assert_eq!(words, vec!["web-1"]);
    }

    #[test]
    fn config_flag_before_subcommand() {
        let args =
            Args::try_parse_from(["faucet", "--config", "/etc/faucet.json", "status", "web-1"])
                .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/faucet.json")));
    }

    #[test]
    fn config_flag_before_first_word() {
        let args =
            Args::try_parse_from(["faucet", "status", "--config", "/etc/faucet.json", "web-1"])
                .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/faucet.json")));
        let (_, words) = args.command.into_parts();
        assert_eq!(words, vec!["web-1"]);
    }

    #[test]
    fn config_flag_after_first_word_is_a_positional() {
        let args =
            Args::try_parse_from(["faucet", "status", "web-1", "--config", "/etc/faucet.json"])
                .unwrap();
        assert_eq!(args.config, None);
        let (operation, words) = args.command.into_parts();
        assert_eq!(operation, Operation::Status);
        assert_eq!(words, vec!["web-1", "--config", "/etc/faucet.json"]);
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Args::try_parse_from(["faucet", "deploy", "web-1"]).is_err());
    }
}
