#![forbid(unsafe_code)]

//! Core validator trait and the built-in validators.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

// ---------------------------------------------------------------------------
// Validator names
// ---------------------------------------------------------------------------

/// Non-empty value.
pub const VALIDATOR_TEXT: &str = "text";
/// `local@domain.tld` address.
pub const VALIDATOR_EMAIL: &str = "email";
/// Personal or company name.
pub const VALIDATOR_NAME: &str = "name";
/// Absolute URL with a known scheme.
pub const VALIDATOR_URL: &str = "url";
/// ASCII letters only.
pub const VALIDATOR_ALPHA: &str = "alpha";
/// Word characters only.
pub const VALIDATOR_ALPHANUMERIC: &str = "alphanumeric";
/// Signed integer or decimal.
pub const VALIDATOR_NUMERIC: &str = "numeric";
/// US ZIP or ZIP+4.
pub const VALIDATOR_ZIPCODE: &str = "zipcode";
/// US state, territory, or armed-forces code.
pub const VALIDATOR_STATE: &str = "state";

// ---------------------------------------------------------------------------
// MatchResult
// ---------------------------------------------------------------------------

/// What a successful test matched.
///
/// Pattern validators fill `groups` with their capture groups; plain
/// predicate validators report the whole value with no groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    /// The matched text.
    pub matched: String,
    /// Capture groups, index 0 is the first group.
    pub groups: Vec<Option<String>>,
}

impl MatchResult {
    /// A match covering the whole value.
    #[must_use]
    pub fn whole(value: &str) -> Self {
        Self {
            matched: value.to_string(),
            groups: Vec::new(),
        }
    }

    /// Build from regex captures.
    #[must_use]
    pub fn from_captures(caps: &Captures<'_>) -> Self {
        Self {
            matched: caps
                .get(0)
                .map_or_else(String::new, |m| m.as_str().to_string()),
            groups: caps
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    /// A capture group by index (0 is the first group).
    #[must_use]
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }
}

// ---------------------------------------------------------------------------
// FieldValidator trait
// ---------------------------------------------------------------------------

/// A named test applied to a field value.
///
/// # Implementing a Custom Validator
///
/// ```rust
/// use formwatch_core::validators::{FieldValidator, MatchResult};
///
/// struct Lowercase;
///
/// impl FieldValidator for Lowercase {
///     fn test(&self, value: &str) -> Option<MatchResult> {
///         (!value.is_empty() && value.chars().all(|c| c.is_ascii_lowercase()))
///             .then(|| MatchResult::whole(value))
///     }
/// }
///
/// assert!(Lowercase.test("abc").is_some());
/// assert!(Lowercase.test("Abc").is_none());
/// ```
pub trait FieldValidator: Send + Sync {
    /// Test the value. `Some` means the value passes.
    fn test(&self, value: &str) -> Option<MatchResult>;

    /// Normalize the value after a successful test.
    ///
    /// Returning `Some` replaces the field's stored value. Only called when
    /// [`test`](Self::test) passed.
    fn post_match(&self, _matched: &MatchResult, _value: &str) -> Option<String> {
        None
    }
}

fn pattern_match(re: &Regex, value: &str) -> Option<MatchResult> {
    re.captures(value).map(|caps| MatchResult::from_captures(&caps))
}

// Patterns are fixed literals; a failure to compile is a bug in this file.
fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("built-in validator pattern {pattern:?} is invalid: {e}"),
    }
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,4}$"));
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[A-Za-z '&-]+$"));
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)^(https?|ftp|rtmp|mms)://(([A-Z0-9][A-Z0-9_-]*)(\.[A-Z0-9][A-Z0-9_-]*)+)(:([0-9]+))?/?",
    )
});
static ALPHA_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-zA-Z]+$"));
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[-+]?[0-9]+(\.[0-9]+)?$"));
static ZIPCODE_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^([0-9]{5})(-([0-9]{4}))?$"));

/// US states, DC, territories, and armed-forces codes.
pub const US_STATE_CODES: &[&str] = &[
    "AL", "AK", "AS", "AZ", "AR", "AA", "AE", "AP", "CA", "CO", "CT", "DE", "DC", "FM", "FL", "GA",
    "GU", "HI", "ID", "IL", "IN", "IA", "KS", "KY", "LA", "ME", "MH", "MD", "MA", "MI", "MN", "MS",
    "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY", "NC", "ND", "MP", "OH", "OK", "OR", "PW", "PA",
    "PR", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VI", "VA", "WA", "WV", "WI", "WY",
];

// ---------------------------------------------------------------------------
// Built-in Validators
// ---------------------------------------------------------------------------

/// Passes when the value is non-empty. Whitespace counts as content.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl FieldValidator for Text {
    fn test(&self, value: &str) -> Option<MatchResult> {
        (!value.is_empty()).then(|| MatchResult::whole(value))
    }
}

/// Passes for `local@domain.tld` with a 2–4 letter TLD, any case.
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl FieldValidator for Email {
    fn test(&self, value: &str) -> Option<MatchResult> {
        pattern_match(&EMAIL_RE, value)
    }
}

/// Passes for ASCII letters, spaces, hyphens, apostrophes, and ampersands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Name;

impl FieldValidator for Name {
    fn test(&self, value: &str) -> Option<MatchResult> {
        pattern_match(&NAME_RE, value)
    }
}

/// Passes for `scheme://host.tld[:port]` with an http, https, ftp, rtmp, or
/// mms scheme. Anything after the host and port is accepted.
///
/// Groups: 0 scheme, 1 host, 5 port.
#[derive(Debug, Clone, Copy, Default)]
pub struct Url;

impl FieldValidator for Url {
    fn test(&self, value: &str) -> Option<MatchResult> {
        pattern_match(&URL_RE, value)
    }
}

/// Passes for one or more ASCII letters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Alpha;

impl FieldValidator for Alpha {
    fn test(&self, value: &str) -> Option<MatchResult> {
        pattern_match(&ALPHA_RE, value)
    }
}

/// Passes for a non-empty value of ASCII letters, digits, and underscores.
#[derive(Debug, Clone, Copy, Default)]
pub struct Alphanumeric;

impl FieldValidator for Alphanumeric {
    fn test(&self, value: &str) -> Option<MatchResult> {
        let word_only = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        (!value.is_empty() && word_only).then(|| MatchResult::whole(value))
    }
}

/// Passes for an optionally signed integer or decimal (`12`, `-3`, `12.5`).
///
/// A fractional part needs digits on both sides of the dot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Numeric;

impl FieldValidator for Numeric {
    fn test(&self, value: &str) -> Option<MatchResult> {
        pattern_match(&NUMERIC_RE, value)
    }
}

/// Passes for `12345` or `12345-6789`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zipcode;

impl FieldValidator for Zipcode {
    fn test(&self, value: &str) -> Option<MatchResult> {
        pattern_match(&ZIPCODE_RE, value)
    }
}

/// Passes when the cleaned, upper-cased value is a code in [`US_STATE_CODES`].
///
/// Cleaning trims the value and collapses inner whitespace runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsState;

impl UsState {
    fn clean(value: &str) -> String {
        value
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase()
    }
}

impl FieldValidator for UsState {
    fn test(&self, value: &str) -> Option<MatchResult> {
        let cleaned = Self::clean(value);
        US_STATE_CODES
            .contains(&cleaned.as_str())
            .then(|| MatchResult::whole(&cleaned))
    }
}

// ---------------------------------------------------------------------------
// Closure-backed validator
// ---------------------------------------------------------------------------

type TestFn = dyn Fn(&str) -> Option<MatchResult> + Send + Sync;
type PostMatchFn = dyn Fn(&MatchResult, &str) -> Option<String> + Send + Sync;

/// A validator built from closures.
pub struct FnValidator {
    test: Box<TestFn>,
    post_match: Option<Box<PostMatchFn>>,
}

impl FnValidator {
    /// A validator from a boolean predicate.
    #[must_use]
    pub fn predicate<T>(test: T) -> Self
    where
        T: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Box::new(move |value: &str| test(value).then(|| MatchResult::whole(value))),
            post_match: None,
        }
    }

    /// A validator from a matching function.
    #[must_use]
    pub fn matcher<T>(test: T) -> Self
    where
        T: Fn(&str) -> Option<MatchResult> + Send + Sync + 'static,
    {
        Self {
            test: Box::new(test),
            post_match: None,
        }
    }

    /// Attach a normalization step run after a successful test.
    #[must_use]
    pub fn with_post_match<P>(mut self, post_match: P) -> Self
    where
        P: Fn(&MatchResult, &str) -> Option<String> + Send + Sync + 'static,
    {
        self.post_match = Some(Box::new(post_match));
        self
    }
}

impl FieldValidator for FnValidator {
    fn test(&self, value: &str) -> Option<MatchResult> {
        (self.test)(value)
    }

    fn post_match(&self, matched: &MatchResult, value: &str) -> Option<String> {
        self.post_match.as_ref().and_then(|f| f(matched, value))
    }
}

impl fmt::Debug for FnValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidator")
            .field("post_match", &self.post_match.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
