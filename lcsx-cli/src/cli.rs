use clap::{ArgGroup, Parser, ValueEnum};
use lcsx::config::validation;
use lcsx::{Credential, CredentialChoice, Distro, RunOptions, TerminalKind};
use std::path::PathBuf;

const HEADING_SETUP: &str = "Setup";
const HEADING_TERMINAL: &str = "Terminal";
const HEADING_LOGGING: &str = "Logging";

/// LCSX - unprivileged Linux environments under proot
#[derive(Parser, Debug)]
#[command(name = "lcsx", author, version, about, long_about = None)]
#[command(group(ArgGroup::new("distro").args(["debian", "alpine", "arch", "void"])))]
#[command(group(ArgGroup::new("terminal").args(["gotty", "sshx", "native"])))]
pub struct Cli {
    /// Data directory (default: `data` next to the executable)
    #[arg(value_name = "DATA_DIR", value_parser = validation::resolve_data_dir)]
    pub data_dir: Option<PathBuf>,

    /// Run setup with default answers instead of prompting
    #[arg(long, help_heading = HEADING_SETUP)]
    pub auto: bool,

    /// Install Debian on a fresh setup
    #[arg(long, help_heading = HEADING_SETUP)]
    pub debian: bool,

    /// Install Alpine on a fresh setup
    #[arg(long, help_heading = HEADING_SETUP)]
    pub alpine: bool,

    /// Install Arch Linux on a fresh setup
    #[arg(long, help_heading = HEADING_SETUP)]
    pub arch: bool,

    /// Install Void on a fresh setup
    #[arg(long, help_heading = HEADING_SETUP)]
    pub void: bool,

    /// Serve the shell over HTTP with gotty
    #[arg(long, help_heading = HEADING_TERMINAL)]
    pub gotty: bool,

    /// Share the shell with sshx
    #[arg(long, help_heading = HEADING_TERMINAL)]
    pub sshx: bool,

    /// Use the local terminal
    #[arg(long, help_heading = HEADING_TERMINAL)]
    pub native: bool,

    /// Listen port for gotty
    #[arg(
        long,
        requires = "gotty",
        value_parser = validation::parse_port,
        help_heading = HEADING_TERMINAL
    )]
    pub port: Option<u16>,

    /// Basic-auth credential for gotty
    #[arg(
        long,
        value_name = "USER:PASS",
        requires = "gotty",
        value_parser = validation::parse_credential,
        help_heading = HEADING_TERMINAL
    )]
    pub gotty_credential: Option<Credential>,

    /// Require the system user and password for gotty (yes) or serve without auth (no)
    #[arg(
        long,
        value_enum,
        requires = "gotty",
        conflicts_with = "gotty_credential",
        help_heading = HEADING_TERMINAL
    )]
    pub credential: Option<Toggle>,

    /// Log verbosity (RUST_LOG takes precedence)
    #[arg(
        long,
        value_enum,
        ignore_case = true,
        default_value = "INFO",
        help_heading = HEADING_LOGGING
    )]
    pub log_level: LogLevel,

    /// Log to this file instead of ~/.lcsx/logs/lcsx.log
    #[arg(long, value_name = "PATH", help_heading = HEADING_LOGGING)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    #[value(name = "DEBUG")]
    Debug,
    #[value(name = "INFO")]
    Info,
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "ERROR")]
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Cli {
    pub fn distro(&self) -> Option<Distro> {
        [
            (self.debian, Distro::Debian),
            (self.alpine, Distro::Alpine),
            (self.arch, Distro::ArchLinux),
            (self.void, Distro::Void),
        ]
        .into_iter()
        .find_map(|(set, distro)| set.then_some(distro))
    }

    pub fn terminal(&self) -> Option<TerminalKind> {
        [
            (self.gotty, TerminalKind::Gotty),
            (self.sshx, TerminalKind::Sshx),
            (self.native, TerminalKind::Native),
        ]
        .into_iter()
        .find_map(|(set, kind)| set.then_some(kind))
    }

    pub fn credential_choice(&self) -> CredentialChoice {
        match (&self.gotty_credential, self.credential) {
            (Some(credential), _) => CredentialChoice::Explicit(credential.clone()),
            (None, Some(Toggle::Yes)) => CredentialChoice::System,
            (None, Some(Toggle::No)) => CredentialChoice::Disabled,
            (None, None) => CredentialChoice::Unspecified,
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            data_dir: self.data_dir.clone(),
            distro: self.distro(),
            terminal: self.terminal(),
            port: self.port,
            credential: self.credential_choice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("lcsx").chain(args.iter().copied()))
    }

    #[test]
    fn test_command_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.run_options(), RunOptions::default());
        assert_eq!(cli.log_level, LogLevel::Info);
        assert!(!cli.auto);
    }

    #[test]
    fn test_gotty_options() {
        let cli = parse(&["--gotty", "--port", "7681", "--gotty-credential", "ops:s3cret"]).unwrap();
        let options = cli.run_options();

        assert_eq!(options.terminal, Some(TerminalKind::Gotty));
        assert_eq!(options.port, Some(7681));
        assert!(matches!(
            options.credential,
            CredentialChoice::Explicit(ref c) if c.to_arg() == "ops:s3cret"
        ));
    }

    #[rstest]
    #[case(&["--gotty", "--credential", "yes"], CredentialChoice::System)]
    #[case(&["--gotty", "--credential", "no"], CredentialChoice::Disabled)]
    #[case(&["--gotty"], CredentialChoice::Unspecified)]
    fn test_credential_toggle(#[case] args: &[&str], #[case] expected: CredentialChoice) {
        assert_eq!(parse(args).unwrap().credential_choice(), expected);
    }

    #[rstest]
    #[case(&["--alpine"], Distro::Alpine)]
    #[case(&["--arch"], Distro::ArchLinux)]
    #[case(&["--void", "--auto"], Distro::Void)]
    fn test_distro_flags(#[case] args: &[&str], #[case] expected: Distro) {
        assert_eq!(parse(args).unwrap().distro(), Some(expected));
    }

    #[rstest]
    #[case(&["--port", "7681"], ErrorKind::MissingRequiredArgument)]
    #[case(&["--sshx", "--port", "7681"], ErrorKind::MissingRequiredArgument)]
    #[case(&["--gotty-credential", "a:b"], ErrorKind::MissingRequiredArgument)]
    #[case(&["--credential", "yes"], ErrorKind::MissingRequiredArgument)]
    #[case(&["--gotty", "--credential", "yes", "--gotty-credential", "a:b"], ErrorKind::ArgumentConflict)]
    #[case(&["--debian", "--alpine"], ErrorKind::ArgumentConflict)]
    #[case(&["--gotty", "--native"], ErrorKind::ArgumentConflict)]
    #[case(&["--gotty", "--port", "80"], ErrorKind::ValueValidation)]
    #[case(&["--gotty", "--gotty-credential", "nopass"], ErrorKind::ValueValidation)]
    #[case(&["--credential", "maybe", "--gotty"], ErrorKind::InvalidValue)]
    fn test_rejected_combinations(#[case] args: &[&str], #[case] kind: ErrorKind) {
        assert_eq!(parse(args).unwrap_err().kind(), kind);
    }

    #[rstest]
    #[case("DEBUG", LogLevel::Debug)]
    #[case("warning", LogLevel::Warning)]
    #[case("Error", LogLevel::Error)]
    fn test_log_level_is_case_insensitive(#[case] value: &str, #[case] expected: LogLevel) {
        assert_eq!(parse(&["--log-level", value]).unwrap().log_level, expected);
    }

    #[test]
    fn test_data_dir_is_made_absolute() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("store");
        let cli = parse(&[dir.to_str().unwrap()]).unwrap();
        assert_eq!(cli.data_dir, Some(dir));
    }
}
