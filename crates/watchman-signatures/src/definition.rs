//! Signature types and structures.
//!
//! A signature pairs cheap substring search terms with a regular expression
//! that confirms a hit, and declares where it applies: which kinds of post
//! (its scope) and which classes of conversation (its locations).

use crate::error::{Expectation, Result, SignatureError};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Test case value that is skipped by self-tests.
pub const BLANK_CASE: &str = "blank";

/// Complete signature loaded from a YAML or TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// File name recorded inside the signature
    #[serde(default)]
    pub filename: String,

    /// Disabled signatures are parsed but never returned by the loader
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Identity and severity
    pub meta: SignatureMeta,

    /// Post categories this signature applies to
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scope: Vec<Scope>,

    /// Conversation classes this signature may report from
    #[serde(default = "Location::all", deserialize_with = "null_as_all_locations")]
    pub locations: Vec<Location>,

    /// Optional file type allow-list (empty means no restriction)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_types: Vec<String>,

    /// Substrings used as the case-insensitive pre-filter
    #[serde(default, deserialize_with = "null_as_empty")]
    pub search_strings: Vec<String>,

    /// Regular expression that confirms a match
    pub pattern: String,

    /// Embedded self-test cases
    #[serde(default)]
    pub test_cases: TestCases,
}

fn default_enabled() -> bool {
    true
}

impl Signature {
    /// Get the signature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Get the signature severity.
    #[must_use]
    pub fn severity(&self) -> u32 {
        self.meta.severity
    }

    /// Whether the signature applies to the given post category.
    #[must_use]
    pub fn applies_to(&self, scope: Scope) -> bool {
        self.scope.contains(&scope)
    }

    /// Whether the signature may report from the given conversation class.
    #[must_use]
    pub fn allows_location(&self, location: Location) -> bool {
        self.locations.contains(&location)
    }

    /// Validate the signature for completeness and correctness.
    pub fn validate(&self) -> Result<()> {
        if self.meta.name.trim().is_empty() {
            return Err(SignatureError::ValidationError {
                signature: self.filename.clone(),
                reason: "signature name cannot be empty".to_string(),
            });
        }

        if self.meta.severity == 0 {
            return Err(SignatureError::ValidationError {
                signature: self.meta.name.clone(),
                reason: "severity must be at least 1".to_string(),
            });
        }

        if self.scope.is_empty() {
            return Err(SignatureError::ValidationError {
                signature: self.meta.name.clone(),
                reason: "scope must list at least one of messages, files, drafts".to_string(),
            });
        }

        if self.search_strings.iter().all(|s| s.trim().is_empty()) {
            return Err(SignatureError::ValidationError {
                signature: self.meta.name.clone(),
                reason: "at least one search string is required".to_string(),
            });
        }

        self.compile().map(|_| ())
    }

    /// Compile the pattern and pre-filter terms.
    pub fn compile(&self) -> Result<CompiledSignature> {
        CompiledSignature::new(Arc::new(self.clone()))
    }

    /// Check every embedded test case against the pattern.
    ///
    /// Match cases must match and fail cases must not; the `"blank"` sentinel
    /// is skipped on both sides.
    pub fn self_test(&self) -> Result<()> {
        let compiled = self.compile()?;

        let cases = self
            .test_cases
            .match_cases
            .iter()
            .map(|case| (case, Expectation::Match))
            .chain(
                self.test_cases
                    .fail_cases
                    .iter()
                    .map(|case| (case, Expectation::NoMatch)),
            );

        for (case, expectation) in cases {
            if case == BLANK_CASE {
                continue;
            }

            let matched = compiled.regex.is_match(case);
            if matched != (expectation == Expectation::Match) {
                return Err(SignatureError::SelfTestFailed {
                    signature: self.meta.name.clone(),
                    case: case.clone(),
                    expectation,
                });
            }
        }

        Ok(())
    }
}

/// Signature identity and severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureMeta {
    /// Human-readable name, also used as the detection type
    pub name: String,

    /// Author of the signature
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,

    /// Date the signature was written
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,

    /// Signature version
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,

    /// What the signature detects
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Severity, 1 and up
    pub severity: u32,
}

/// Self-test cases embedded in a signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCases {
    /// Inputs the pattern must match
    #[serde(default, deserialize_with = "null_as_empty")]
    pub match_cases: Vec<String>,

    /// Inputs the pattern must not match
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fail_cases: Vec<String>,
}

/// Post category a signature applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Channel and direct messages
    Messages,
    /// Uploaded files
    Files,
    /// Unsent drafts
    Drafts,
}

impl Scope {
    /// Lowercase name as used in signature files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Files => "files",
            Self::Drafts => "drafts",
        }
    }
}

/// Conversation visibility class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Public channel
    Public,
    /// Private channel
    Private,
    /// Direct message
    Im,
    /// Multi-party direct message
    Mpim,
}

impl Location {
    /// Every location; the default when a signature lists none.
    #[must_use]
    pub fn all() -> Vec<Self> {
        vec![Self::Public, Self::Private, Self::Im, Self::Mpim]
    }
}

/// A signature with its pattern compiled and search terms lower-cased.
#[derive(Debug, Clone)]
pub struct CompiledSignature {
    signature: Arc<Signature>,
    regex: Regex,
    /// Non-blank search strings paired with their lower-cased form.
    needles: Vec<(String, String)>,
}

impl CompiledSignature {
    /// Compile a shared signature.
    pub fn new(signature: Arc<Signature>) -> Result<Self> {
        let regex = Regex::new(&signature.pattern).map_err(|source| {
            SignatureError::InvalidPattern {
                signature: signature.meta.name.clone(),
                source,
            }
        })?;

        let needles = signature
            .search_strings
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| (s.clone(), s.to_lowercase()))
            .collect();

        Ok(Self {
            signature,
            regex,
            needles,
        })
    }

    /// The underlying signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Case-insensitive substring pre-filter over any of `texts`.
    #[must_use]
    pub fn prefilter<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> bool {
        texts.into_iter().any(|text| {
            let text = text.to_lowercase();
            self.needles
                .iter()
                .any(|(_, needle)| text.contains(needle.as_str()))
        })
    }

    /// First search string contained in `text`, case-insensitively.
    #[must_use]
    pub fn matching_search_string(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.needles
            .iter()
            .find(|(_, needle)| text.contains(needle.as_str()))
            .map(|(original, _)| original.as_str())
    }

    /// First pattern match across `texts`, in order.
    #[must_use]
    pub fn confirm<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Option<String> {
        texts
            .into_iter()
            .find_map(|text| self.regex.find(text).map(|m| m.as_str().to_string()))
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_all_locations<'de, D>(deserializer: D) -> std::result::Result<Vec<Location>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Location>>::deserialize(deserializer)?.unwrap_or_else(Location::all))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(pattern: &str) -> Signature {
        serde_yaml::from_str(&format!(
            r#"
filename: api_keys.yaml
enabled: true
meta:
  name: Generic API Key
  author: watchman
  date: "2024-01-01"
  version: "1.0"
  description: Detects generic API keys
  severity: 70
scope:
  - messages
locations:
  - public
search_strings:
  - api_key
pattern: '{pattern}'
test_cases:
  match_cases:
    - api_key=abcdef0123456789
  fail_cases:
    - api_key=short
    - blank
"#
        ))
        .expect("parse signature YAML")
    }

    #[test]
    fn test_parse_and_accessors() {
        let sig = signature("api_key=[A-Za-z0-9]{16}");
        assert_eq!(sig.name(), "Generic API Key");
        assert_eq!(sig.severity(), 70);
        assert!(sig.applies_to(Scope::Messages));
        assert!(!sig.applies_to(Scope::Files));
        assert!(sig.allows_location(Location::Public));
        assert!(!sig.allows_location(Location::Im));
        assert!(sig.file_types.is_empty());
    }

    #[test]
    fn test_missing_locations_default_to_all() {
        let sig: Signature = serde_yaml::from_str(
            r"
meta:
  name: Anything
  severity: 1
scope: [files]
search_strings: [x]
pattern: x
file_types:
",
        )
        .expect("parse signature YAML");

        assert_eq!(sig.locations, Location::all());
        assert!(sig.enabled);
        assert!(sig.file_types.is_empty());
        assert!(sig.test_cases.match_cases.is_empty());
    }

    #[test]
    fn test_validate_and_self_test_pass() {
        let sig = signature("api_key=[A-Za-z0-9]{16}");
        sig.validate().expect("valid signature");
        sig.self_test().expect("self-test passes");
    }

    #[test]
    fn test_self_test_reports_failing_match_case() {
        let sig = signature("api_key=[0-9]{16}");
        let err = sig.self_test().unwrap_err();
        assert!(matches!(
            err,
            SignatureError::SelfTestFailed {
                expectation: Expectation::Match,
                ..
            }
        ));
    }

    #[test]
    fn test_self_test_reports_failing_fail_case() {
        let sig = signature("api_key=");
        let err = sig.self_test().unwrap_err();
        assert!(matches!(
            err,
            SignatureError::SelfTestFailed { ref case, expectation: Expectation::NoMatch, .. }
                if case == "api_key=short"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let sig = signature("api_key=(");
        assert!(matches!(
            sig.validate(),
            Err(SignatureError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_scope_and_search_strings() {
        let mut sig = signature("api_key");
        sig.scope.clear();
        assert!(matches!(
            sig.validate(),
            Err(SignatureError::ValidationError { .. })
        ));

        let mut sig = signature("api_key");
        sig.search_strings = vec![" ".to_string()];
        assert!(matches!(
            sig.validate(),
            Err(SignatureError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_prefilter_is_case_insensitive() {
        let compiled = signature("api_key=[A-Za-z0-9]{16}")
            .compile()
            .expect("compile");
        assert!(compiled.prefilter(["Here is my API_KEY"]));
        assert!(!compiled.prefilter(["nothing to see", "still nothing"]));
        assert_eq!(compiled.matching_search_string("API_KEY=1"), Some("api_key"));
    }

    #[test]
    fn test_blank_search_strings_do_not_shift_matches() {
        let mut sig = signature("zzz");
        sig.search_strings = vec![String::new(), "Password".to_string()];
        let compiled = sig.compile().expect("compile");

        assert_eq!(
            compiled.matching_search_string("my password.txt"),
            Some("Password")
        );
        assert!(compiled.prefilter(["my PASSWORD.txt"]));
        assert_eq!(compiled.matching_search_string("notes.txt"), None);
    }

    #[test]
    fn test_confirm_returns_first_match() {
        let compiled = signature("api_key=[A-Za-z0-9]{16}")
            .compile()
            .expect("compile");

        let found = compiled.confirm(["api_key=short", "x api_key=abcdef0123456789 y"]);
        assert_eq!(found.as_deref(), Some("api_key=abcdef0123456789"));
        assert_eq!(compiled.confirm(["api_key=short"]), None);
    }
}
