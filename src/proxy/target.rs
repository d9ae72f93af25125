//! The single backend every proxied request is sent to.

use axum::http::{
    uri::{Authority, Scheme},
    HeaderValue,
};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::config::{BackendConfig, ValidationError};

/// Parsed backend base URL.
///
/// Only the scheme and authority are kept; requests keep their own path.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    base_url: Url,
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
}

impl BackendTarget {
    pub fn from_config(config: &BackendConfig) -> Result<Self, ValidationError> {
        Self::parse(&config.target)
    }

    /// Parse a base URL such as `http://10.0.0.5:8000`.
    pub fn parse(target: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::BackendTarget {
            value: target.to_string(),
            reason: reason.to_string(),
        };

        let base_url = Url::parse(target).map_err(|e| invalid(&e.to_string()))?;

        // The connector speaks plain HTTP only.
        if base_url.scheme() != "http" {
            return Err(invalid("only the http scheme is supported"));
        }
        let host = base_url
            .host_str()
            .ok_or_else(|| invalid("missing host"))?;
        if base_url.path() != "/" {
            return Err(invalid("must not contain a path"));
        }
        if base_url.query().is_some() || base_url.fragment().is_some() {
            return Err(invalid("must not contain a query or fragment"));
        }
        if !base_url.username().is_empty() || base_url.password().is_some() {
            return Err(invalid("must not contain credentials"));
        }

        let authority_str = match base_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority =
            Authority::from_str(&authority_str).map_err(|e| invalid(&e.to_string()))?;
        let host_header =
            HeaderValue::from_str(authority.as_str()).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            base_url,
            scheme: Scheme::HTTP,
            authority,
            host_header,
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Value for the outbound `Host` header, so the backend sees itself as
    /// the intended host.
    pub fn host_header(&self) -> &HeaderValue {
        &self.host_header
    }
}

impl fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url.as_str().trim_end_matches('/'))
    }
}
