//! Route pattern compilation and matching.
//!
//! # Responsibilities
//! - Parse route patterns (`/users/:id`, `/users/:id?`, `/files/*`)
//! - Compile path patterns into anchored regexes with per-parameter constraints
//! - Compile domain patterns (`:tenant.example.com`, `admin`) into host matchers
//!
//! # Design Decisions
//! - Compiled once per route at commit, never per request
//! - Path matching is case-sensitive, host matching is not
//! - Captures use generated group names so constraint regexes containing their
//!   own groups cannot shift parameter alignment
//! - An optional trailing slash is accepted on every path

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::RegistrationError;

/// Default character class for a single path segment.
const SEGMENT_CLASS: &str = "[^/]+";

/// Default character class for a single domain label.
const LABEL_CLASS: &str = "[^.]+";

/// Name bound to a bare `*` segment.
pub const WILDCARD_PARAM: &str = "*";

/// How a parameter segment consumes the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// `:id`
    Required,
    /// `:id?`
    Optional,
    /// `:path*` or `*`, zero or more segments joined by `/`.
    ZeroOrMore,
    /// `:path+`, one or more segments joined by `/`.
    OneOrMore,
}

/// One `/`-separated piece of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Param { name: String, kind: ParamKind },
}

/// Normalize a pattern: leading slash, no trailing slash (except root).
pub fn normalize_pattern(pattern: &str) -> String {
    let trimmed = pattern.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Join a prefix and a pattern into one normalized pattern.
pub fn join_patterns(prefix: &str, pattern: &str) -> String {
    let prefix = normalize_pattern(prefix);
    let pattern = normalize_pattern(pattern);
    match (prefix.as_str(), pattern.as_str()) {
        ("/", p) => p.to_string(),
        (p, "/") => p.to_string(),
        (a, b) => format!("{}{}", a, b),
    }
}

/// Split a path pattern into segments.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, RegistrationError> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|raw| parse_segment(pattern, raw))
        .collect()
}

fn parse_segment(pattern: &str, raw: &str) -> Result<Segment, RegistrationError> {
    if raw == WILDCARD_PARAM {
        return Ok(Segment::Param {
            name: WILDCARD_PARAM.to_string(),
            kind: ParamKind::ZeroOrMore,
        });
    }

    let Some(spec) = raw.strip_prefix(':') else {
        return Ok(Segment::Static(raw.to_string()));
    };

    let (name, kind) = if let Some(name) = spec.strip_suffix('?') {
        (name, ParamKind::Optional)
    } else if let Some(name) = spec.strip_suffix('*') {
        (name, ParamKind::ZeroOrMore)
    } else if let Some(name) = spec.strip_suffix('+') {
        (name, ParamKind::OneOrMore)
    } else {
        (spec, ParamKind::Required)
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RegistrationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: format!("invalid parameter name in segment `{}`", raw),
        });
    }

    Ok(Segment::Param {
        name: name.to_string(),
        kind,
    })
}

/// Strip anchors from a user constraint so it can be embedded.
fn constraint_body(constraint: &str) -> &str {
    let body = constraint.strip_prefix('^').unwrap_or(constraint);
    match body.strip_suffix('$') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => body,
    }
}

/// Compiled path matcher for one route.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    regex: Regex,
    params: Vec<String>,
    groups: Vec<String>,
}

impl PathMatcher {
    /// Compile a path pattern, applying per-parameter constraints.
    pub fn compile(
        pattern: &str,
        constraints: &BTreeMap<String, String>,
    ) -> Result<Self, RegistrationError> {
        let segments = parse_pattern(pattern)?;
        let mut source = String::from("^");
        let mut params = Vec::new();
        let mut groups = Vec::new();

        for segment in &segments {
            match segment {
                Segment::Static(value) => {
                    source.push('/');
                    source.push_str(&regex::escape(value));
                }
                Segment::Param { name, kind } => {
                    let group = format!("p{}", params.len());
                    let class = constraints
                        .get(name)
                        .map(|c| format!("(?:{})", constraint_body(c)))
                        .unwrap_or_else(|| SEGMENT_CLASS.to_string());
                    let piece = match kind {
                        ParamKind::Required => format!("/(?P<{}>{})", group, class),
                        ParamKind::Optional => format!("(?:/(?P<{}>{}))?", group, class),
                        ParamKind::ZeroOrMore => {
                            format!("(?:/(?P<{}>{}(?:/{})*))?", group, class, class)
                        }
                        ParamKind::OneOrMore => {
                            format!("/(?P<{}>{}(?:/{})*)", group, class, class)
                        }
                    };
                    source.push_str(&piece);
                    params.push(name.clone());
                    groups.push(group);
                }
            }
        }
        source.push_str("/?$");

        let regex = Regex::new(&source).map_err(|e| RegistrationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            regex,
            params,
            groups,
        })
    }

    /// Parameter names in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Match a request path. Captures are aligned with [`Self::params`];
    /// optional parameters that were not supplied are `None`.
    pub fn captures<'p>(&self, path: &'p str) -> Option<Vec<Option<&'p str>>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.groups
                .iter()
                .map(|group| caps.name(group).map(|m| m.as_str()))
                .collect(),
        )
    }
}

/// Compiled host matcher for routes declaring a domain.
///
/// A domain without dots (`admin`, `:tenant`) names the leading subdomain
/// label of any host. A dotted domain must match the whole host.
#[derive(Debug, Clone)]
pub struct DomainMatcher {
    regex: Regex,
    params: Vec<String>,
    groups: Vec<String>,
}

impl DomainMatcher {
    pub fn compile(domain: &str) -> Result<Self, RegistrationError> {
        let labels: Vec<&str> = domain.split('.').collect();
        let mut params = Vec::new();
        let mut groups = Vec::new();
        let mut pieces = Vec::with_capacity(labels.len());

        for label in &labels {
            match label.strip_prefix(':') {
                Some(name) => {
                    if name.is_empty()
                        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        return Err(RegistrationError::InvalidPattern {
                            pattern: domain.to_string(),
                            reason: format!("invalid domain parameter `{}`", label),
                        });
                    }
                    let group = format!("d{}", params.len());
                    pieces.push(format!("(?P<{}>{})", group, LABEL_CLASS));
                    params.push(name.to_string());
                    groups.push(group);
                }
                None => pieces.push(regex::escape(label)),
            }
        }

        let tail = if labels.len() == 1 { r"\..+" } else { "" };
        let source = format!("(?i)^{}{}$", pieces.join(r"\."), tail);
        let regex = Regex::new(&source).map_err(|e| RegistrationError::InvalidPattern {
            pattern: domain.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            regex,
            params,
            groups,
        })
    }

    /// Match a `Host` header value. The port, if any, is ignored.
    pub fn captures(&self, host: &str) -> Option<Vec<(String, String)>> {
        let host = strip_port(host);
        let caps = self.regex.captures(host)?;
        Some(
            self.params
                .iter()
                .zip(&self.groups)
                .filter_map(|(name, group)| {
                    caps.name(group)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: `[::1]:8080`. Without `]` the host is kept as is.
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
        .map_or(host, |(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pattern: &str) -> PathMatcher {
        PathMatcher::compile(pattern, &BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_static_and_params() {
        let matcher = compile("/a/:x/b/:y");
        assert_eq!(matcher.params(), ["x", "y"]);
        assert_eq!(
            matcher.captures("/a/foo/b/bar"),
            Some(vec![Some("foo"), Some("bar")])
        );
        assert_eq!(matcher.captures("/a/foo/b"), None);
        assert_eq!(matcher.captures("/A/foo/b/bar"), None); // Case sensitive
    }

    #[test]
    fn test_optional_param() {
        let matcher = compile("/users/:id?");
        assert_eq!(matcher.captures("/users"), Some(vec![None]));
        assert_eq!(matcher.captures("/users/"), Some(vec![None]));
        assert_eq!(matcher.captures("/users/7"), Some(vec![Some("7")]));
    }

    #[test]
    fn test_catch_all_joins_segments() {
        let matcher = compile("/files/*");
        assert_eq!(matcher.params(), [WILDCARD_PARAM]);
        assert_eq!(
            matcher.captures("/files/a/b/c.txt"),
            Some(vec![Some("a/b/c.txt")])
        );
        assert_eq!(matcher.captures("/files"), Some(vec![None]));

        let plus = compile("/docs/:path+");
        assert_eq!(plus.captures("/docs"), None);
        assert_eq!(plus.captures("/docs/x/y"), Some(vec![Some("x/y")]));
    }

    #[test]
    fn test_constraint_is_enforced() {
        let mut constraints = BTreeMap::new();
        constraints.insert("id".to_string(), r"^\d+$".to_string());
        let matcher = PathMatcher::compile("/users/:id", &constraints).unwrap();
        assert_eq!(matcher.captures("/users/42"), Some(vec![Some("42")]));
        assert_eq!(matcher.captures("/users/abc"), None);
    }

    #[test]
    fn test_constraint_groups_do_not_shift_captures() {
        let mut constraints = BTreeMap::new();
        constraints.insert("slug".to_string(), "(draft|live)-[a-z]+".to_string());
        let matcher = PathMatcher::compile("/posts/:slug/:id", &constraints).unwrap();
        assert_eq!(
            matcher.captures("/posts/live-hello/3"),
            Some(vec![Some("live-hello"), Some("3")])
        );
    }

    #[test]
    fn test_root_and_static_escaping() {
        let root = compile("/");
        assert!(root.captures("/").is_some());
        assert!(root.captures("/x").is_none());

        let dotted = compile("/v1.0/status");
        assert!(dotted.captures("/v1.0/status").is_some());
        assert!(dotted.captures("/v1x0/status").is_none());
    }

    #[test]
    fn test_invalid_param_name() {
        assert!(matches!(
            PathMatcher::compile("/users/:", &BTreeMap::new()),
            Err(RegistrationError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_join_patterns() {
        assert_eq!(join_patterns("/admin", "/dashboard"), "/admin/dashboard");
        assert_eq!(join_patterns("admin/", "/"), "/admin");
        assert_eq!(join_patterns("/", "users"), "/users");
    }

    #[test]
    fn test_domain_matcher() {
        let tenant = DomainMatcher::compile(":tenant.example.com").unwrap();
        assert_eq!(
            tenant.captures("Acme.Example.com:8080"),
            Some(vec![("tenant".to_string(), "Acme".to_string())])
        );
        assert_eq!(tenant.captures("acme.example.com.evil.org"), None);

        let admin = DomainMatcher::compile("admin").unwrap();
        assert_eq!(admin.captures("admin.example.com"), Some(vec![]));
        assert_eq!(admin.captures("admin"), None);
        assert_eq!(admin.captures("www.example.com"), None);

        let exact = DomainMatcher::compile("example.com").unwrap();
        assert_eq!(exact.captures("EXAMPLE.COM"), Some(vec![])); // Case insensitive
    }

    #[test]
    fn test_strip_port_handles_bracketed_hosts() {
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
        assert_eq!(strip_port("[abc"), "[abc");
        assert_eq!(strip_port("example.com:80"), "example.com");

        let tenant = DomainMatcher::compile(":tenant.example.com").unwrap();
        assert_eq!(tenant.captures("[abc"), None);
        assert_eq!(tenant.captures("[::1]:8080"), None);
    }
}
