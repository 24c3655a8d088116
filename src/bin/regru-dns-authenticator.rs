mod cli;

use std::{process::ExitCode, time::Duration};

use clap::Parser;
use env_logger::Builder;
use log::{error, info, warn};

use regru_dns_authenticator::{
    authenticator::{AuthError, Authenticator, DnsAuthenticator, DnsAuthenticatorConfig},
    config,
    provider::{self, RegRuProvider, RegRuProviderConfig},
};

use cli::{Cli, Phase};

fn main() -> ExitCode {
    let cli = Cli::parse();

    Builder::new().filter_level(cli.loglevel.into()).init();

    run(&cli)
}

/// Run the requested phase. Perform reports every failure through the exit code, cleanup never fails
fn run(cli: &Cli) -> ExitCode {
    if cli.dry_run {
        info!("Running in dry-run mode, no changes to the DNS provider will be made");
    }

    match &cli.phase {
        Phase::Perform(args) => {
            let challenge = args.challenge();
            let result =
                get_authenticator(cli).and_then(|mut auth| auth.perform(&challenge));
            match result {
                Ok(_) => {
                    info!("Challenge for {} is ready for validation", challenge.domain);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("Unable to set up challenge for {}: {}", challenge.domain, e);
                    ExitCode::FAILURE
                }
            }
        }
        Phase::Cleanup(args) => {
            let challenge = args.challenge();
            match get_authenticator(cli) {
                Ok(mut auth) => auth.cleanup(&challenge),
                Err(e) => warn!(
                    "Unable to clean up challenge for {}: {}",
                    challenge.domain, e
                ),
            }
            ExitCode::SUCCESS
        }
    }
}

fn get_authenticator(cli: &Cli) -> Result<DnsAuthenticator, AuthError> {
    let credentials = config::load_credentials(&cli.credentials)?;
    let mut provider = RegRuProvider::from_config(&RegRuProviderConfig {
        credentials: &credentials,
        api_url: &cli.api_url,
    })?;
    if cli.dry_run {
        provider::enable_dry_run(provider.as_mut())?;
    }
    info!("Created Reg.ru provider");

    Ok(DnsAuthenticator::new(
        provider,
        DnsAuthenticatorConfig {
            propagation: Duration::from_secs(cli.propagation_seconds),
            zone: cli.zone.to_owned(),
        },
    ))
}
