//! The perform/cleanup lifecycle of DNS-01 challenges.
//!
//! An ACME client hands each challenge to an [`Authenticator`] twice: [`Authenticator::perform()`] before it asks
//! the CA to validate the domain and [`Authenticator::cleanup()`] once validation is over, whatever its outcome.
//! [`DnsAuthenticator`] implements both phases on top of any [`Provider`].

use std::{collections::HashMap, fmt::Display, thread, time::Duration};

use itertools::Itertools;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    config::ConfigError,
    provider::{Provider, ProviderError, RecordRef},
};

/// Label prepended to a domain to form its validation record name
pub const CHALLENGE_LABEL: &str = "_acme-challenge";
/// Time to wait for new records to propagate if nothing else is configured
pub const DEFAULT_PROPAGATION_SECONDS: u64 = 120;
/// Subdomain used by Reg.ru for records at the zone apex
pub const APEX: &str = "@";

/// Implemented by anything that can satisfy DNS-01 challenges for an ACME client.
pub trait Authenticator {
    /// Publish the validation record and wait until it should be visible to the CA.
    /// Errors are fatal for the issuance of the challenge's domain.
    fn perform(&mut self, challenge: &Challenge) -> Result<(), AuthError>;
    /// Remove the validation record again. Best effort, failures are only logged.
    fn cleanup(&mut self, challenge: &Challenge);
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Provider(#[from] ProviderError),
    #[error("`{0}` is not a valid record name")]
    InvalidName(String),
    #[error("record name `{name}` is not part of zone `{zone}`")]
    ZoneMismatch { name: String, zone: String },
}

/// A single DNS-01 challenge as supplied by the ACME client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Challenge {
    /// Domain being validated, without wildcard prefix
    pub domain: String,
    /// Fully qualified name of the TXT record, usually `_acme-challenge.<domain>`
    pub validation_name: String,
    /// Content of the TXT record
    pub validation: String,
}

impl Challenge {
    /// Create a challenge for `domain`, deriving the usual validation record name.
    /// A leading wildcard label is dropped, as wildcard certificates are validated through their base domain.
    pub fn new(domain: &str, validation: &str) -> Self {
        let domain = domain.strip_prefix("*.").unwrap_or(domain);
        Challenge {
            domain: domain.to_owned(),
            validation_name: format!("{}.{}", CHALLENGE_LABEL, domain),
            validation: validation.to_owned(),
        }
    }

    /// Create a challenge with a validation record name chosen by the ACME client
    pub fn with_validation_name(domain: &str, validation_name: &str, validation: &str) -> Self {
        Challenge {
            domain: domain.strip_prefix("*.").unwrap_or(domain).to_owned(),
            validation_name: validation_name.to_owned(),
            validation: validation.to_owned(),
        }
    }
}

impl Display for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (TXT {})", self.validation_name, self.validation)
    }
}

/// A record name split into the zone managed at the provider and the subdomain within it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordName {
    pub zone: String,
    pub subdomain: String,
}

impl RecordName {
    /// Split a fully qualified `name` into zone and subdomain.
    ///
    /// Without an explicit `zone`, the last two labels are assumed to form the zone.
    /// This does not hold for registrations below multi-label suffixes such as `msk.ru`, which need `zone` to be set.
    pub fn split(name: &str, zone: Option<&str>) -> Result<RecordName, AuthError> {
        let name = name.trim_end_matches('.');
        let labels = name.split('.').collect::<Vec<_>>();
        if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
            return Err(AuthError::InvalidName(name.to_owned()));
        }

        let zone_len = match zone {
            Some(z) => {
                let z = z.trim_end_matches('.').to_ascii_lowercase();
                let lower = name.to_ascii_lowercase();
                if lower != z && !lower.ends_with(&format!(".{}", z)) {
                    return Err(AuthError::ZoneMismatch {
                        name: name.to_owned(),
                        zone: z,
                    });
                }
                z.split('.').count()
            }
            None => 2,
        };

        let split_at = labels.len() - zone_len;
        let subdomain = match labels[..split_at].iter().join(".") {
            s if s.is_empty() => APEX.to_owned(),
            s => s,
        };
        Ok(RecordName {
            zone: labels[split_at..].iter().join(".").to_ascii_lowercase(),
            subdomain,
        })
    }
}

/// Lifecycle position of a challenge handled by a [`DnsAuthenticator`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChallengeState {
    /// The validation record exists at the provider
    RecordCreated(RecordRef),
    /// The validation record has been removed, or cleanup was attempted
    CleanedUp,
}

/// Settings for a [`DnsAuthenticator`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsAuthenticatorConfig {
    /// How long to wait after creating a record. Zero skips the wait
    pub propagation: Duration,
    /// Zone to create records in. Derived from the record name if unset
    pub zone: Option<String>,
}

impl Default for DnsAuthenticatorConfig {
    fn default() -> Self {
        DnsAuthenticatorConfig {
            propagation: Duration::from_secs(DEFAULT_PROPAGATION_SECONDS),
            zone: None,
        }
    }
}

/// An [`Authenticator`] that publishes validation records through a [`Provider`].
///
/// Cleanup only needs the challenge itself to find its record, so perform and cleanup may run in different processes.
pub struct DnsAuthenticator {
    provider: Box<dyn Provider>,
    config: DnsAuthenticatorConfig,
    challenges: HashMap<(String, String), ChallengeState>,
}

impl DnsAuthenticator {
    pub fn new(provider: Box<dyn Provider>, config: DnsAuthenticatorConfig) -> Self {
        DnsAuthenticator {
            provider,
            config,
            challenges: HashMap::new(),
        }
    }

    /// Current state of `challenge`, `None` if it was never performed or cleaned up by this authenticator
    pub fn state(&self, challenge: &Challenge) -> Option<&ChallengeState> {
        self.challenges.get(&Self::key(challenge))
    }

    fn key(challenge: &Challenge) -> (String, String) {
        (
            challenge.validation_name.to_ascii_lowercase(),
            challenge.validation.to_owned(),
        )
    }

    fn record_name(&self, challenge: &Challenge) -> Result<RecordName, AuthError> {
        RecordName::split(&challenge.validation_name, self.config.zone.as_deref())
    }

    fn wait_for_propagation(&self) {
        if self.config.propagation.is_zero() {
            debug!("Propagation delay disabled, not waiting");
            return;
        }
        info!(
            "Waiting {} seconds for DNS changes to propagate",
            self.config.propagation.as_secs()
        );
        thread::sleep(self.config.propagation);
    }
}

impl Authenticator for DnsAuthenticator {
    fn perform(&mut self, challenge: &Challenge) -> Result<(), AuthError> {
        let name = self.record_name(challenge)?;
        debug!(
            "Challenge {} maps to subdomain {} in zone {}",
            challenge, name.subdomain, name.zone
        );

        let rec = self
            .provider
            .add_txt_record(&name.zone, &name.subdomain, &challenge.validation)
            .map_err(|e| {
                if e.is_transient() {
                    warn!(
                        "Creating record for {} failed, retrying the run later might help",
                        challenge.domain
                    );
                }
                e
            })?;
        info!("Created validation record {}", rec);
        self.challenges
            .insert(Self::key(challenge), ChallengeState::RecordCreated(rec));

        self.wait_for_propagation();
        Ok(())
    }

    fn cleanup(&mut self, challenge: &Challenge) {
        let name = match self.record_name(challenge) {
            Ok(n) => n,
            Err(e) => {
                warn!("Unable to clean up challenge {}: {}", challenge, e);
                return;
            }
        };

        match self
            .provider
            .remove_txt_record(&name.zone, &name.subdomain, &challenge.validation)
        {
            Ok(_) => info!("Removed validation record for {}", challenge),
            Err(e) => warn!(
                "Encountered error deleting TXT record for {}, it might need to be removed manually: {}",
                challenge, e
            ),
        }
        self.challenges
            .insert(Self::key(challenge), ChallengeState::CleanedUp);
    }
}
