//! DNS providers that host the zones challenge records are written to.
//! Each provider implements the [`Provider`] trait.
//!
//! The following providers are currently available:
//! - [`RegRuProvider`]: Manages TXT records through the Reg.ru API v2

mod regru;

#[cfg(test)]
use mockall::automock;

// Re-exports for convenience
pub use self::regru::{RegRuProvider, RegRuProviderConfig, DEFAULT_API_URL};

use std::fmt::Display;

use thiserror::Error;

/// A provider is any DNS service provider, such as Reg.ru.
/// They implement a few basic methods to find, add and remove TXT records within a zone.
#[cfg_attr(test, automock)]
pub trait Provider {
    /// Returns whether this provider supports running in dry-run mode, with no changes being made
    fn supports_dry_run(&self) -> bool;
    fn set_dry_run(&mut self, dry_run: bool);

    /// Get all TXT records currently stored in `zone`
    fn txt_records(&self, zone: &str) -> Result<Vec<TxtRecord>, ProviderError>;

    /// Add a TXT record with content `value` under `subdomain` in `zone`.
    /// Succeeds without changes if an identical record already exists.
    fn add_txt_record(
        &self,
        zone: &str,
        subdomain: &str,
        value: &str,
    ) -> Result<RecordRef, ProviderError>;

    /// Remove the TXT record matching both `subdomain` and `value`.
    /// Other TXT records with the same name are left alone.
    /// Succeeds without changes if no such record exists.
    fn remove_txt_record(&self, zone: &str, subdomain: &str, value: &str)
        -> Result<(), ProviderError>;
}

/// Switch `provider` into dry-run mode.
/// Fails if the provider cannot run without making changes, instead of silently making them.
pub fn enable_dry_run(provider: &mut dyn Provider) -> Result<(), ProviderError> {
    if !provider.supports_dry_run() {
        return Err(ProviderError::Permanent(
            "provider does not support dry-run mode".to_string(),
        ));
    }
    provider.set_dry_run(true);
    Ok(())
}

/// Error returned by a provider action.
///
/// Transient errors (rate limits, timeouts, outages) might succeed if the whole run is repeated later,
/// permanent errors (rejected credentials, unknown zone, malformed requests) won't.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderError {
    #[error("permanent provider error: {0}")]
    Permanent(String),
    #[error("transient provider error: {0}")]
    Transient(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// A TXT record as stored by a provider. `subdomain` is relative to the zone, `@` denotes the apex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxtRecord {
    pub subdomain: String,
    pub content: String,
}

impl TxtRecord {
    /// Whether this record is the one identified by `subdomain` and `value`.
    /// Names compare case-insensitively, contents exactly.
    pub fn matches(&self, subdomain: &str, value: &str) -> bool {
        self.subdomain.eq_ignore_ascii_case(subdomain) && self.content == value
    }
}

/// Everything needed to locate a record created by [`Provider::add_txt_record()`] again
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub zone: String,
    pub subdomain: String,
    pub value: String,
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in zone {}: TXT {}", self.subdomain, self.zone, self.value)
    }
}

#[cfg(test)]
mod tests {
    use totems::assert_ok;

    use super::*;

    #[test]
    fn should_match_by_name_and_content() {
        let rec = TxtRecord {
            subdomain: "_acme-challenge.Sub".to_string(),
            content: "abc123".to_string(),
        };
        assert!(rec.matches("_acme-challenge.sub", "abc123"));
        assert!(!rec.matches("_acme-challenge.sub", "ABC123"));
        assert!(!rec.matches("_acme-challenge", "abc123"));
    }

    #[test]
    fn should_enable_dry_run_if_supported() {
        let mut provider = MockProvider::new();
        provider.expect_supports_dry_run().return_const(true);
        provider
            .expect_set_dry_run()
            .withf(|dry_run| *dry_run)
            .times(1)
            .return_const(());

        let enabled = enable_dry_run(&mut provider);
        assert_ok!(enabled);
    }

    #[test]
    fn should_refuse_dry_run_if_unsupported() {
        let mut provider = MockProvider::new();
        provider.expect_supports_dry_run().return_const(false);
        provider.expect_set_dry_run().never();

        let err = enable_dry_run(&mut provider).unwrap_err();
        assert!(matches!(err, ProviderError::Permanent(_)), "{:?}", err);
    }

    #[test]
    fn should_classify_transient_errors() {
        assert!(ProviderError::Transient("rate limited".to_string()).is_transient());
        assert!(!ProviderError::Permanent("bad password".to_string()).is_transient());
    }
}
