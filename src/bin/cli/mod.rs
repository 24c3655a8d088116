use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use regru_dns_authenticator::{
    authenticator::{Challenge, DEFAULT_PROPAGATION_SECONDS},
    config::DEFAULT_CREDENTIALS_PATH,
    provider::DEFAULT_API_URL,
};

macro_rules! env_prefix {
    () => {
        "REGRU_DNS_"
    };
}

/// Complete ACME DNS-01 challenges with TXT records managed through the Reg.ru API.
///
/// Meant to be used as certbot `--manual-auth-hook` (perform) and `--manual-cleanup-hook` (cleanup).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub phase: Phase,

    /// Path to the Reg.ru credentials INI file
    #[arg(
        short = 'c',
        long,
        global = true,
        default_value = DEFAULT_CREDENTIALS_PATH,
        value_name = "PATH",
        env = concat!(env_prefix!(), "CREDENTIALS")
    )]
    pub credentials: PathBuf,

    /// Time to wait for DNS changes to propagate before the CA is asked to validate, in seconds
    #[arg(
        short = 'w',
        long,
        global = true,
        default_value_t = DEFAULT_PROPAGATION_SECONDS,
        value_name = "SECONDS",
        env = concat!(env_prefix!(), "PROPAGATION_SECONDS")
    )]
    pub propagation_seconds: u64,

    /// Zone the records are created in.
    /// Derived from the last two labels of the record name if not specified
    #[arg(
        long,
        global = true,
        value_name = "ZONE",
        env = concat!(env_prefix!(), "ZONE")
    )]
    pub zone: Option<String>,

    /// Do not make any changes to the DNS records, only show what would happen
    #[arg(long, short = 'd', global = true, action, default_value_t = false)]
    pub dry_run: bool,

    /// Set the loglevel of the application
    #[arg(
        value_enum,
        short = 'l',
        long,
        global = true,
        default_value_t = Loglevel::Info,
        value_name = "LEVEL",
        env = concat!(env_prefix!(), "LOGLEVEL")
    )]
    pub loglevel: Loglevel,

    /// Base URL of the Reg.ru API
    #[arg(
        long,
        global = true,
        hide = true,
        default_value = DEFAULT_API_URL,
        value_name = "URL",
        env = concat!(env_prefix!(), "API_URL")
    )]
    pub api_url: String,
}

/// Which half of the challenge lifecycle to run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Subcommand)]
pub enum Phase {
    /// Create the validation record and wait for it to propagate
    #[command(visible_alias = "auth")]
    Perform(ChallengeArgs),
    /// Delete the validation record. Never fails the run
    Cleanup(ChallengeArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Args)]
pub struct ChallengeArgs {
    /// Domain being validated
    #[arg(long, value_name = "DOMAIN", env = "CERTBOT_DOMAIN")]
    pub domain: String,

    /// Validation string to put into the TXT record
    #[arg(long, value_name = "VALUE", env = "CERTBOT_VALIDATION")]
    pub validation: String,

    /// Full name of the TXT record. Defaults to `_acme-challenge.<DOMAIN>`
    #[arg(long, value_name = "NAME")]
    pub validation_name: Option<String>,
}

impl ChallengeArgs {
    pub fn challenge(&self) -> Challenge {
        match &self.validation_name {
            Some(name) => Challenge::with_validation_name(&self.domain, name, &self.validation),
            None => Challenge::new(&self.domain, &self.validation),
        }
    }
}

/// Used to set the applications loglevel
// This is essentially a re-creation of log:Level. However, that enum doesn't derive ValueEnum, so we have to do it manually here
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ValueEnum)]
pub enum Loglevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
impl From<Loglevel> for LevelFilter {
    fn from(ll: Loglevel) -> Self {
        match ll {
            Loglevel::Error => LevelFilter::Error,
            Loglevel::Warn => LevelFilter::Warn,
            Loglevel::Info => LevelFilter::Info,
            Loglevel::Debug => LevelFilter::Debug,
            Loglevel::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn should_have_valid_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn should_parse_perform_with_defaults() {
        let cli = Cli::try_parse_from([
            "regru-dns-authenticator",
            "perform",
            "--domain",
            "sub.example.com",
            "--validation",
            "abc123",
        ])
        .unwrap();
        assert_eq!(cli.credentials, PathBuf::from(DEFAULT_CREDENTIALS_PATH));
        assert_eq!(cli.propagation_seconds, DEFAULT_PROPAGATION_SECONDS);
        assert!(!cli.dry_run);
        match cli.phase {
            Phase::Perform(args) => {
                let challenge = args.challenge();
                assert_eq!(challenge.validation_name, "_acme-challenge.sub.example.com");
                assert_eq!(challenge.validation, "abc123");
            }
            Phase::Cleanup(_) => panic!("parsed wrong phase"),
        }
    }

    #[test]
    fn should_parse_cleanup_with_options() {
        let cli = Cli::try_parse_from([
            "regru-dns-authenticator",
            "cleanup",
            "--domain",
            "example.com",
            "--validation",
            "abc123",
            "--validation-name",
            "_acme-challenge.example.com",
            "--propagation-seconds",
            "10",
            "--credentials",
            "/tmp/regru.ini",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.propagation_seconds, 10);
        assert_eq!(cli.credentials, PathBuf::from("/tmp/regru.ini"));
        assert!(cli.dry_run);
        assert!(matches!(cli.phase, Phase::Cleanup(_)));
    }

    #[test]
    fn should_accept_auth_alias() {
        let cli = Cli::try_parse_from([
            "regru-dns-authenticator",
            "auth",
            "--domain",
            "example.com",
            "--validation",
            "abc123",
        ])
        .unwrap();
        assert!(matches!(cli.phase, Phase::Perform(_)));
    }
}
