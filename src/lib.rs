//! Main crate for the `regru_dns_authenticator` application.
//!
//! The crate completes ACME DNS-01 challenges by creating and deleting TXT records
//! through the Reg.ru API. The `regru-dns-authenticator` binary wraps it for use as
//! a certbot manual hook.
//!
//! For more information, choose one of the modules below.
//! The following modules might be of interest if you want to add new functionality:
//! - [`config`] loads the credentials file and enforces its permissions
//! - [`provider`]s are DNS providers such as Reg.ru that ultimately serve the TXT records to the CA
//! - [`authenticator`] drives the perform/cleanup lifecycle of a single challenge

#![allow(clippy::uninlined_format_args)]

pub mod authenticator;
pub mod config;
pub mod provider;
