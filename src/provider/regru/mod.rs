mod response;
mod traits;
mod wrapper;

use log::{debug, info, trace};
use mockall_double::double;

use super::{Provider, ProviderError, RecordRef, TxtRecord};
use crate::config::Credentials;

#[double]
use self::wrapper::RegRuWrapper;

/// Production endpoint of the Reg.ru API v2
pub const DEFAULT_API_URL: &str = "https://api.reg.ru/api/regru2/";

/// A [`Provider`] connecting to the Reg.ru API for creating, retrieving and deleting TXT records.
///
/// Reg.ru does not hand out record identifiers, records are always addressed by zone, subdomain and content.
///
/// To create a provider, use the [`RegRuProvider::from_config()`] function.
#[non_exhaustive]
pub struct RegRuProvider {
    api: RegRuWrapper,
    dry_run: bool,
}

/// Configuration object for a [`RegRuProvider`]. Must be supplied when creating a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegRuProviderConfig<'a> {
    /// Account to authenticate with
    pub credentials: &'a Credentials,
    /// Base URL of the API, usually [`DEFAULT_API_URL`]
    pub api_url: &'a str,
}

impl RegRuProvider {
    /// Dry-run mode starts disabled, see [`super::enable_dry_run()`].
    pub fn from_config(config: &RegRuProviderConfig) -> Result<Box<dyn Provider>, ProviderError> {
        let api = RegRuWrapper::try_new(config.credentials, config.api_url)?;

        Ok(Box::new(RegRuProvider {
            api,
            dry_run: false,
        }))
    }

    fn find_txt_record(
        &self,
        zone: &str,
        subdomain: &str,
        value: &str,
    ) -> Result<Option<TxtRecord>, ProviderError> {
        Ok(self
            .txt_records(zone)?
            .into_iter()
            .find(|r| r.matches(subdomain, value)))
    }
}

impl Provider for RegRuProvider {
    fn supports_dry_run(&self) -> bool {
        true
    }

    fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    fn txt_records(&self, zone: &str) -> Result<Vec<TxtRecord>, ProviderError> {
        debug!("Reading records of zone {} from Reg.ru API", zone);
        let records = self
            .api
            .list_records(zone)?
            .iter()
            .filter_map(|r| TxtRecord::try_from(r).ok())
            .collect::<Vec<TxtRecord>>();
        trace!("Collected TXT records: {:?}", records);
        Ok(records)
    }

    fn add_txt_record(
        &self,
        zone: &str,
        subdomain: &str,
        value: &str,
    ) -> Result<RecordRef, ProviderError> {
        let rec = RecordRef {
            zone: zone.to_owned(),
            subdomain: subdomain.to_owned(),
            value: value.to_owned(),
        };

        if self.find_txt_record(zone, subdomain, value)?.is_some() {
            info!("Record {} already exists, not adding it again", rec);
            return Ok(rec);
        }

        if self.dry_run {
            info!("Dry run: would create record {}", rec);
        } else {
            self.api.add_txt(zone, subdomain, value)?;
            debug!("Created record {}", rec);
        }
        Ok(rec)
    }

    fn remove_txt_record(
        &self,
        zone: &str,
        subdomain: &str,
        value: &str,
    ) -> Result<(), ProviderError> {
        if self.find_txt_record(zone, subdomain, value)?.is_none() {
            info!(
                "No TXT record {} with content {} in zone {}, nothing to delete",
                subdomain, value, zone
            );
            return Ok(());
        }

        if self.dry_run {
            info!(
                "Dry run: would delete TXT record {} with content {} from zone {}",
                subdomain, value, zone
            );
        } else {
            self.api.remove_txt(zone, subdomain, value)?;
            debug!(
                "Deleted TXT record {} with content {} from zone {}",
                subdomain, value, zone
            );
        }
        Ok(())
    }
}
