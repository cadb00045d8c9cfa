//! Address resolution.
//!
//! An address is either a bare local bind (`:8080`, optionally `:8080#secret`)
//! or a relay URL whose query string tunes the run and whose fragment carries
//! the password. [`AddressForm::classify`] picks the form; [`resolve`] turns it
//! into a validated [`ServerConfig`].

use url::Url;

use crate::config::client_info;
use crate::config::params::{self, QueryParams};
use crate::config::schema::{
    ServerConfig, Target, DEFAULT_DIAL_TIMEOUT, DEFAULT_HEALTH_CHECK_INTERVAL,
    DEFAULT_HEALTH_CHECK_RETRY,
};
use crate::error::ServeError;

/// Environment variable that enables verbose client annotation.
pub const DEBUG_ENV: &str = "WTF_DEBUG";

const BIND_PREFIX: char = ':';

/// The two accepted address shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressForm<'a> {
    Bind {
        addr: &'a str,
        password: Option<&'a str>,
    },
    Relay(&'a str),
}

impl<'a> AddressForm<'a> {
    pub fn classify(raw: &'a str) -> Result<Self, ServeError> {
        if raw.is_empty() {
            return Err(invalid_address(raw, "empty address"));
        }
        if !raw.starts_with(BIND_PREFIX) {
            return Ok(AddressForm::Relay(raw));
        }

        let (addr, password) = match raw.split_once('#') {
            Some((addr, password)) => (addr, Some(password).filter(|p| !p.is_empty())),
            None => (raw, None),
        };

        let port = &addr[BIND_PREFIX.len_utf8()..];
        if port.parse::<u16>().is_err() {
            return Err(invalid_address(raw, "bare bind needs a numeric port"));
        }

        Ok(AddressForm::Bind { addr, password })
    }
}

/// Resolve `raw` into a configuration using the process environment for the
/// debug annotation switch.
pub fn resolve(raw: &str) -> Result<ServerConfig, ServeError> {
    resolve_with(raw, std::env::var_os(DEBUG_ENV).is_some())
}

/// Resolve `raw`; `debug` controls whether the outgoing query also carries
/// process arguments and environment.
pub fn resolve_with(raw: &str, debug: bool) -> Result<ServerConfig, ServeError> {
    match AddressForm::classify(raw)? {
        AddressForm::Bind { addr, password } => {
            let mut config = ServerConfig::with_defaults(Target::Bind(addr.to_string()));
            config.password = password.map(str::to_string);
            Ok(config)
        }
        AddressForm::Relay(raw) => resolve_relay(raw, debug),
    }
}

fn resolve_relay(raw: &str, debug: bool) -> Result<ServerConfig, ServeError> {
    let mut url = Url::parse(raw).map_err(|e| invalid_address(raw, e))?;

    client_info::annotate(&mut url, debug);

    let query = QueryParams::new(&url);
    let quiet = query.flag(params::QUIET, false)?;
    let dial_timeout = query.duration(params::TIMEOUT, DEFAULT_DIAL_TIMEOUT)?;
    let health_check_interval = query.duration(params::GC, DEFAULT_HEALTH_CHECK_INTERVAL)?;
    let health_check_retry = query.count(params::RETRY, DEFAULT_HEALTH_CHECK_RETRY)?;
    let persist = query.flag(params::PERSIST, false)?;

    if dial_timeout.is_zero() {
        return Err(ServeError::invalid_config(params::TIMEOUT, "0", "dial timeout must be positive"));
    }

    // The parsed fragment is percent-encoded; the password is what was typed.
    let password = raw
        .split_once('#')
        .map(|(_, fragment)| fragment)
        .filter(|f| !f.is_empty())
        .map(str::to_string);
    url.set_fragment(None);

    Ok(ServerConfig {
        address: Target::Relay(url),
        dial_timeout,
        health_check_interval,
        health_check_retry,
        quiet,
        persist,
        password,
    })
}

fn invalid_address(raw: &str, reason: impl std::fmt::Display) -> ServeError {
    ServeError::InvalidAddress {
        address: raw.to_string(),
        reason: reason.to_string(),
    }
}
