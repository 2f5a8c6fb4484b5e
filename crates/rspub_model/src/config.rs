//! Run configuration value objects.
//!
//! A [`Configuration`] is created by an operator, persisted by an external
//! loader/saver and read by the engine at run start. The engine never
//! mutates it.

use crate::document::DocumentKind;
use crate::strategy::Strategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::{Host, Url};

/// Default and maximum number of entries per document.
pub const DEFAULT_MAX_ENTRIES: usize = 50_000;

/// Hard upper bound for `max_entries_per_document`.
pub const MAX_ENTRIES_LIMIT: usize = 50_000;

/// Default zero padding of sequence numbers in file names.
pub const DEFAULT_ZERO_FILL: usize = 4;

/// Errors in a configuration, detected before any scanning starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The configuration id is not a usable name.
    #[error("invalid configuration id '{0}'")]
    InvalidId(String),

    /// No root locations were given.
    #[error("configuration has no root locations")]
    NoRoots,

    /// A root location does not exist.
    #[error("root location does not exist: {0}")]
    MissingRoot(PathBuf),

    /// The URL prefix is not an absolute http(s) URL.
    #[error("invalid url prefix '{value}': {reason}")]
    InvalidUrlPrefix {
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A numeric setting is out of range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Name of the setting.
        field: &'static str,
        /// Given value.
        value: usize,
        /// Inclusive minimum.
        min: usize,
        /// Inclusive maximum.
        max: usize,
    },

    /// The gate definition selects nothing to build from.
    #[error("configuration has no gate definition")]
    MissingGate,

    /// A named gate builder is not registered.
    #[error("unknown gate builder '{0}'")]
    UnknownGateBuilder(String),

    /// A selection pattern failed to compile.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The pattern text.
        pattern: String,
        /// Compiler message.
        message: String,
    },

    /// A selector line could not be parsed.
    #[error("invalid selector line {line}: '{content}'")]
    InvalidSelectorLine {
        /// 1-based line number.
        line: usize,
        /// The line content.
        content: String,
    },

    /// Unknown strategy name.
    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),
}

/// Name of a configuration.
///
/// Used as a directory name by file-backed stores, so it is restricted to
/// ASCII alphanumerics, `-`, `_` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigId(String);

impl ConfigId {
    /// Maximum length of a configuration id.
    pub const MAX_LEN: usize = 128;

    /// Creates a validated configuration id.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigurationError> {
        let id = id.into();
        let valid_chars = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if id.is_empty() || id.len() > Self::MAX_LEN || !valid_chars || id == "." || id == ".." {
            return Err(ConfigurationError::InvalidId(id));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ConfigId {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConfigId> for String {
    fn from(id: ConfigId) -> Self {
        id.0
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Include/exclude path globs.
///
/// Persisted as lines of `+ pattern` and `- pattern`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    includes: BTreeSet<String>,
    excludes: BTreeSet<String>,
}

impl Selector {
    /// Creates an empty selector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds include patterns.
    pub fn include<I, S>(&mut self, patterns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Adds exclude patterns.
    pub fn exclude<I, S>(&mut self, patterns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Removes an include pattern.
    pub fn discard_include(&mut self, pattern: &str) -> bool {
        self.includes.remove(pattern)
    }

    /// Removes an exclude pattern.
    pub fn discard_exclude(&mut self, pattern: &str) -> bool {
        self.excludes.remove(pattern)
    }

    /// Merges another selector into this one.
    pub fn merge(&mut self, other: &Selector) {
        self.includes.extend(other.includes.iter().cloned());
        self.excludes.extend(other.excludes.iter().cloned());
    }

    /// Removes every include pattern.
    pub fn clear_includes(&mut self) {
        self.includes.clear();
    }

    /// Removes every exclude pattern.
    pub fn clear_excludes(&mut self) {
        self.excludes.clear();
    }

    /// Include patterns in sorted order.
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.includes.iter().map(String::as_str)
    }

    /// Exclude patterns in sorted order.
    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.excludes.iter().map(String::as_str)
    }

    /// Returns true if the selector has no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// Renders the line format.
    #[must_use]
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for pattern in &self.includes {
            out.push_str("+ ");
            out.push_str(pattern);
            out.push('\n');
        }
        for pattern in &self.excludes {
            out.push_str("- ");
            out.push_str(pattern);
            out.push('\n');
        }
        out
    }

    /// Parses the line format. Blank lines and `#` comments are skipped.
    pub fn parse_lines(text: &str) -> Result<Self, ConfigurationError> {
        let mut selector = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invalid = || ConfigurationError::InvalidSelectorLine {
                line: index + 1,
                content: raw.to_string(),
            };
            let (sign, pattern) = line.split_at(1);
            let pattern = pattern.trim();
            if pattern.is_empty() {
                return Err(invalid());
            }
            match sign {
                "+" => {
                    selector.includes.insert(pattern.to_string());
                }
                "-" => {
                    selector.excludes.insert(pattern.to_string());
                }
                _ => return Err(invalid()),
            }
        }
        Ok(selector)
    }
}

/// Describes how the resource gate of a run is assembled.
///
/// Builders are chained in order: the default builder (if enabled), the
/// selector (if any), then named builders registered with the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDefinition {
    /// Use the default builder (resource dir, hidden files, metadata dir).
    pub defaults: bool,
    /// Glob selector.
    pub selector: Option<Selector>,
    /// Names of custom builders.
    pub builders: Vec<String>,
}

impl GateDefinition {
    /// A definition with no builders at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            defaults: false,
            selector: None,
            builders: Vec::new(),
        }
    }

    /// Returns true if the definition names no builder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.defaults && self.selector.is_none() && self.builders.is_empty()
    }
}

impl Default for GateDefinition {
    fn default() -> Self {
        Self {
            defaults: true,
            selector: None,
            builders: Vec::new(),
        }
    }
}

/// A named bundle of everything a run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Configuration id.
    pub id: ConfigId,
    /// Files and directories to scan.
    pub roots: Vec<PathBuf>,
    /// Directory identities and URIs are relative to.
    pub resource_dir: PathBuf,
    /// URL prefix of published resources; absolute paths are used when unset.
    pub url_prefix: Option<String>,
    /// Output location of documents (the metadata directory).
    pub output_dir: PathBuf,
    /// Gate definition.
    pub gate: GateDefinition,
    /// Default publishing strategy.
    pub strategy: Strategy,
    /// Maximum number of entries per document.
    pub max_entries_per_document: usize,
    /// Zero padding of ids in document file names.
    pub zero_fill: usize,
}

impl Configuration {
    /// Creates a configuration scanning `resource_dir` with default settings.
    ///
    /// Documents go to `<resource_dir>/metadata`.
    pub fn new(id: ConfigId, resource_dir: impl Into<PathBuf>) -> Self {
        let resource_dir = resource_dir.into();
        Self {
            id,
            roots: vec![resource_dir.clone()],
            output_dir: resource_dir.join("metadata"),
            resource_dir,
            url_prefix: None,
            gate: GateDefinition::default(),
            strategy: Strategy::default(),
            max_entries_per_document: DEFAULT_MAX_ENTRIES,
            zero_fill: DEFAULT_ZERO_FILL,
        }
    }

    /// Sets the root locations.
    #[must_use]
    pub fn with_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the URL prefix. A trailing slash is dropped.
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.url_prefix = Some(prefix.trim_end_matches('/').to_string());
        self
    }

    /// Sets the output location.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the gate definition.
    #[must_use]
    pub fn with_gate(mut self, gate: GateDefinition) -> Self {
        self.gate = gate;
        self
    }

    /// Sets the glob selector, keeping the rest of the gate definition.
    #[must_use]
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.gate.selector = Some(selector);
        self
    }

    /// Sets the default strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the maximum entries per document.
    #[must_use]
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries_per_document = max;
        self
    }

    /// Sets the zero fill of file names.
    #[must_use]
    pub fn with_zero_fill(mut self, zero_fill: usize) -> Self {
        self.zero_fill = zero_fill;
        self
    }

    /// Checks the configuration for structural errors.
    ///
    /// Filesystem checks (roots exist) are left to the engine.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.roots.is_empty() {
            return Err(ConfigurationError::NoRoots);
        }
        if self.gate.is_empty() {
            return Err(ConfigurationError::MissingGate);
        }
        check_range(
            "max_entries_per_document",
            self.max_entries_per_document,
            1,
            MAX_ENTRIES_LIMIT,
        )?;
        check_range("zero_fill", self.zero_fill, 1, 10)?;
        if let Some(prefix) = &self.url_prefix {
            validate_url_prefix(prefix)?;
        }
        Ok(())
    }

    /// Identity of a resource at `path`.
    ///
    /// With a URL prefix and a path under the resource directory this is the
    /// published URI; otherwise the path itself.
    #[must_use]
    pub fn identity_for(&self, path: &Path) -> String {
        self.uri_for(path)
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    }

    /// Published URI of a path under the resource directory.
    ///
    /// Each path segment is percent-encoded and appended to the prefix.
    #[must_use]
    pub fn uri_for(&self, path: &Path) -> Option<String> {
        let mut url = Url::parse(self.url_prefix.as_ref()?).ok()?;
        let relative = path.strip_prefix(&self.resource_dir).ok()?;
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(&segments);
        Some(url.into())
    }

    /// File name of a document, e.g. `changelist_0001_0002.xml`.
    #[must_use]
    pub fn document_file_name(&self, kind: DocumentKind, generation: u64, sequence: u64) -> String {
        let width = self.zero_fill;
        format!("{kind}_{generation:0width$}_{sequence:0width$}.xml")
    }

    /// URI of a file in the output location.
    #[must_use]
    pub fn output_uri(&self, file_name: &str) -> String {
        let path = self.output_dir.join(file_name);
        self.uri_for(&path)
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    }

    /// URI of the capability list document.
    #[must_use]
    pub fn capabilitylist_uri(&self) -> String {
        self.output_uri("capabilitylist.xml")
    }
}

fn check_range(
    field: &'static str,
    value: usize,
    min: usize,
    max: usize,
) -> Result<(), ConfigurationError> {
    if value < min || value > max {
        return Err(ConfigurationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn validate_url_prefix(prefix: &str) -> Result<(), ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidUrlPrefix {
        value: prefix.to_string(),
        reason,
    };

    let url = Url::parse(prefix).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https".into()));
    }
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.strip_suffix('.').unwrap_or(domain);
            if domain.split('.').any(str::is_empty) {
                return Err(invalid(format!("invalid domain '{domain}'")));
            }
        }
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => {}
        None => return Err(invalid("missing host".into())),
    }
    if url.cannot_be_a_base() {
        return Err(invalid("cannot hold a path".into()));
    }
    if url.query().is_some() {
        return Err(invalid("query strings are not allowed".into()));
    }
    if url.fragment().is_some() {
        return Err(invalid("fragments are not allowed".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration::new(ConfigId::new("collection_1").unwrap(), "/data/resources")
            .with_url_prefix("http://example.com/rs/")
    }

    #[test]
    fn config_id_validation() {
        assert!(ConfigId::new("collection-1.v2").is_ok());
        assert!(ConfigId::new("").is_err());
        assert!(ConfigId::new("..").is_err());
        assert!(ConfigId::new("a/b").is_err());
        assert!(ConfigId::new("x".repeat(129)).is_err());
    }

    #[test]
    fn config_id_deserialization_validates() {
        let ok: ConfigId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(ok.as_str(), "abc");
        assert!(serde_json::from_str::<ConfigId>("\"a b\"").is_err());
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.roots, vec![PathBuf::from("/data/resources")]);
        assert_eq!(config.output_dir, PathBuf::from("/data/resources/metadata"));
        assert_eq!(config.url_prefix.as_deref(), Some("http://example.com/rs"));
        assert_eq!(config.max_entries_per_document, DEFAULT_MAX_ENTRIES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_errors() {
        let no_roots = config().with_roots(Vec::<PathBuf>::new());
        assert_eq!(no_roots.validate(), Err(ConfigurationError::NoRoots));

        let no_gate = config().with_gate(GateDefinition::empty());
        assert_eq!(no_gate.validate(), Err(ConfigurationError::MissingGate));

        let too_many = config().with_max_entries(50_001);
        assert!(matches!(
            too_many.validate(),
            Err(ConfigurationError::OutOfRange {
                field: "max_entries_per_document",
                ..
            })
        ));

        let zero = config().with_max_entries(0);
        assert!(zero.validate().is_err());

        let fill = config().with_zero_fill(11);
        assert!(fill.validate().is_err());
    }

    #[test]
    fn url_prefix_validation() {
        for bad in [
            "ftp://example.com",
            "http://",
            "http://example.com/?q=1",
            "https://e.com/#x",
            "http://exa mple..com/r",
            "http://example..com/r",
            "not a url",
        ] {
            let config = config().with_url_prefix(bad);
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigurationError::InvalidUrlPrefix { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn identities() {
        let config = config();
        assert_eq!(
            config.identity_for(Path::new("/data/resources/dir/a.txt")),
            "http://example.com/rs/dir/a.txt"
        );
        // Outside the resource directory the path is used.
        assert_eq!(config.identity_for(Path::new("/elsewhere/b.txt")), "/elsewhere/b.txt");

        let mut no_prefix = config.clone();
        no_prefix.url_prefix = None;
        assert_eq!(
            no_prefix.identity_for(Path::new("/data/resources/a.txt")),
            "/data/resources/a.txt"
        );
    }

    #[test]
    fn identities_are_percent_encoded() {
        let config = Configuration::new(ConfigId::new("c").unwrap(), "/r")
            .with_url_prefix("http://e.com/r");
        assert_eq!(
            config.identity_for(Path::new("/r/a b#c?.txt")),
            "http://e.com/r/a%20b%23c%3F.txt"
        );
        assert_eq!(
            config.identity_for(Path::new("/r/dir 1/100%.txt")),
            "http://e.com/r/dir%201/100%25.txt"
        );

        let root = Configuration::new(ConfigId::new("c").unwrap(), "/r")
            .with_url_prefix("https://e.com");
        assert!(root.validate().is_ok());
        assert_eq!(root.identity_for(Path::new("/r/x.txt")), "https://e.com/x.txt");
    }

    #[test]
    fn document_names_and_uris() {
        let config = config();
        assert_eq!(
            config.document_file_name(DocumentKind::Changelist, 1, 2),
            "changelist_0001_0002.xml"
        );
        assert_eq!(
            config.output_uri("resourcelist-index.xml"),
            "http://example.com/rs/metadata/resourcelist-index.xml"
        );
        assert_eq!(
            config.capabilitylist_uri(),
            "http://example.com/rs/metadata/capabilitylist.xml"
        );
    }

    #[test]
    fn selector_lines() {
        let mut selector = Selector::new();
        selector.include(["**/*.xml", "docs/**"]).exclude(["**/draft/**"]);
        let text = selector.to_lines();
        assert_eq!(text, "+ **/*.xml\n+ docs/**\n- **/draft/**\n");

        let parsed = Selector::parse_lines(&format!("# comment\n\n{text}")).unwrap();
        assert_eq!(parsed, selector);
    }

    #[test]
    fn selector_bad_line() {
        let err = Selector::parse_lines("+ a\n* b\n").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidSelectorLine {
                line: 2,
                content: "* b".into()
            }
        );
        assert!(Selector::parse_lines("+\n").is_err());
    }

    #[test]
    fn selector_edit() {
        let mut selector = Selector::new();
        selector.include(["a", "b"]).exclude(["c"]);
        assert!(selector.discard_include("a"));
        assert!(!selector.discard_include("zzz"));
        assert!(selector.discard_exclude("c"));

        let mut other = Selector::new();
        other.exclude(["d"]);
        selector.merge(&other);
        assert_eq!(selector.excludes().collect::<Vec<_>>(), vec!["d"]);

        selector.clear_includes();
        selector.clear_excludes();
        assert!(selector.is_empty());
    }
}
