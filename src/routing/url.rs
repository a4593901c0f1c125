//! URL generation and signed-URL verification.
//!
//! # Responsibilities
//! - Substitute params into a route pattern (and its domain pattern)
//! - Render a deterministic query string
//! - Sign the canonical `path?query` form and verify it later
//!
//! # Design Decisions
//! - Query keys are rendered sorted so a parsed-then-rerendered query is
//!   byte-identical to the signed one
//! - The signature covers path and query, never the domain or the signature
//! - `expires_at` is a unix timestamp in milliseconds

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::error::RegistrationError;
use crate::routing::matcher::{parse_pattern, ParamKind, Segment};
use crate::routing::route::RouteDefinition;
use crate::security::Encrypter;

/// Query key carrying the signature.
pub const SIGNATURE_KEY: &str = "signature";

/// Query key carrying the expiry timestamp.
pub const EXPIRES_AT_KEY: &str = "expires_at";

/// Bytes escaped in a rendered path segment: everything but unreserved
/// characters, so `/` inside a single-segment value becomes `%2F`.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode one path segment value.
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT_ENCODE_SET).to_string()
}

/// Decode a captured path value back to the form `url_for` was given.
pub fn decode_segment(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Errors raised while rendering a URL.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("missing route param value `{param}` for `{pattern}`")]
    MissingRouteParam { param: String, pattern: String },

    #[error(transparent)]
    InvalidPattern(#[from] RegistrationError),
}

/// Inputs for `url_for` / `url_for_signed`.
#[derive(Debug, Clone, Default)]
pub struct UrlOptions {
    params: BTreeMap<String, String>,
    qs: BTreeMap<String, String>,
    domain: Option<String>,
    expires_in: Option<Duration>,
}

impl UrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.qs.insert(key.into(), value.to_string());
        self
    }

    /// Select among routes sharing an identifier by their domain.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Signed URLs only: reject the URL after this duration.
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expires_in = Some(duration);
        self
    }

    pub fn get_domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}

/// Substitute params into a path pattern.
pub fn render_path(pattern: &str, params: &BTreeMap<String, String>) -> Result<String, UrlError> {
    let mut path = String::new();
    for segment in parse_pattern(pattern)? {
        match segment {
            Segment::Static(value) => {
                path.push('/');
                path.push_str(&value);
            }
            Segment::Param { name, kind } => match (params.get(&name), kind) {
                (Some(value), ParamKind::ZeroOrMore | ParamKind::OneOrMore)
                    if !value.trim_matches('/').is_empty() =>
                {
                    // Catch-alls keep their `/` separators.
                    for part in value.trim_matches('/').split('/') {
                        path.push('/');
                        path.push_str(&encode_segment(part));
                    }
                }
                (Some(value), ParamKind::Required | ParamKind::Optional) if !value.is_empty() => {
                    path.push('/');
                    path.push_str(&encode_segment(value));
                }
                (_, ParamKind::Optional | ParamKind::ZeroOrMore) => {}
                _ => {
                    return Err(UrlError::MissingRouteParam {
                        param: name,
                        pattern: pattern.to_string(),
                    })
                }
            },
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    Ok(path)
}

/// Substitute params into a domain pattern (`:tenant.example.com`).
pub fn render_domain(domain: &str, params: &BTreeMap<String, String>) -> Result<String, UrlError> {
    domain
        .split('.')
        .map(|label| match label.strip_prefix(':') {
            Some(name) => params
                .get(name)
                .cloned()
                .ok_or_else(|| UrlError::MissingRouteParam {
                    param: name.to_string(),
                    pattern: domain.to_string(),
                }),
            None => Ok(label.to_string()),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|labels| labels.join("."))
}

/// Render a query string with keys in sorted order.
pub fn build_query(qs: &BTreeMap<String, String>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(qs.iter())
        .finish()
}

fn join_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

fn with_domain(
    route: &RouteDefinition,
    options: &UrlOptions,
    url: String,
) -> Result<String, UrlError> {
    match route.get_domain() {
        Some(domain) => Ok(format!("//{}{}", render_domain(domain, &options.params)?, url)),
        None => Ok(url),
    }
}

/// Render the URL for a route.
pub fn make_url(route: &RouteDefinition, options: &UrlOptions) -> Result<String, UrlError> {
    let path = render_path(route.pattern(), &options.params)?;
    let url = join_query(&path, &build_query(&options.qs));
    with_domain(route, options, url)
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Render and sign the URL for a route.
pub fn make_signed_url(
    route: &RouteDefinition,
    options: &UrlOptions,
    encrypter: &dyn Encrypter,
) -> Result<String, UrlError> {
    let path = render_path(route.pattern(), &options.params)?;

    let mut qs = options.qs.clone();
    qs.remove(SIGNATURE_KEY);
    if let Some(expires_in) = options.expires_in {
        let expires_at = now_millis() + expires_in.as_millis();
        qs.insert(EXPIRES_AT_KEY.to_string(), expires_at.to_string());
    }

    let canonical = join_query(&path, &build_query(&qs));
    let signature = encrypter.encrypt(&canonical);
    qs.insert(SIGNATURE_KEY.to_string(), signature);

    with_domain(route, options, join_query(&path, &build_query(&qs)))
}

/// Check a signed URL. Never errors: any problem yields `false`.
pub fn verify_signed_url(path: &str, query: &str, encrypter: &dyn Encrypter) -> bool {
    let mut qs = BTreeMap::new();
    let mut signature = None;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == SIGNATURE_KEY {
            signature = Some(value.into_owned());
        } else {
            qs.insert(key.into_owned(), value.into_owned());
        }
    }

    let Some(signature) = signature else {
        return false;
    };
    let Some(decrypted) = encrypter.decrypt(&signature) else {
        return false;
    };

    let canonical = join_query(path, &build_query(&qs));
    if !bool::from(decrypted.as_bytes().ct_eq(canonical.as_bytes())) {
        return false;
    }

    match qs.get(EXPIRES_AT_KEY) {
        Some(expires_at) => expires_at
            .parse::<u128>()
            .map(|at| at > now_millis())
            .unwrap_or(false),
        None => true,
    }
}
