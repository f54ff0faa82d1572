//! Signals read from credentials and response bodies.
//!
//! Nothing here verifies anything. The expiry claim is read from the token
//! payload as-is and only drives proactive refresh scheduling; body
//! classification is substring matching against a fixed rule table.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde_json::{Map, Value as JsonValue};

/// What a response body says about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The access credential is expired, invalid or missing.
    SessionExpired,
    /// The backend refuses to continue until the latest terms are accepted.
    TermsRequired,
}

/// Phrase the backend uses to demand terms acceptance.
pub const TERMS_REQUIRED_PHRASE: &str = "must accept the latest terms and conditions";

/// Which body field a rule reads.
#[derive(Debug, Clone, Copy)]
enum Field {
    /// `message` only.
    Message,
    /// First present of `message`, `error`, `detail`.
    AnyMessage,
}

/// A rule fires when the lower-cased field contains every `all` substring,
/// at least one `any` substring (if `any` is non-empty), and `ok` is `false`
/// when `needs_ok_false` is set.
#[derive(Debug)]
struct Rule {
    signal: Signal,
    field: Field,
    all: &'static [&'static str],
    any: &'static [&'static str],
    needs_ok_false: bool,
}

// Evaluated in order; the first match wins. The terms rule comes first so a
// body can never classify as both.
const RULES: &[Rule] = &[
    Rule {
        signal: Signal::TermsRequired,
        field: Field::Message,
        all: &[TERMS_REQUIRED_PHRASE],
        any: &[],
        needs_ok_false: false,
    },
    Rule {
        signal: Signal::SessionExpired,
        field: Field::AnyMessage,
        all: &["token"],
        any: &["expire", "expirado"],
        needs_ok_false: false,
    },
    Rule {
        signal: Signal::SessionExpired,
        field: Field::AnyMessage,
        all: &[],
        any: &["unauthenticated", "não autenticado"],
        needs_ok_false: false,
    },
    Rule {
        signal: Signal::SessionExpired,
        field: Field::AnyMessage,
        all: &[],
        any: &["invalid token", "invalid signature"],
        needs_ok_false: false,
    },
    Rule {
        signal: Signal::SessionExpired,
        field: Field::AnyMessage,
        all: &[],
        any: &["token", "sess"],
        needs_ok_false: true,
    },
];

impl Rule {
    fn matches(&self, obj: &Map<String, JsonValue>) -> bool {
        if self.needs_ok_false && obj.get("ok").and_then(JsonValue::as_bool) != Some(false) {
            return false;
        }
        let text = match self.field {
            Field::Message => field_text(obj, &["message"]),
            Field::AnyMessage => field_text(obj, &["message", "error", "detail"]),
        };
        if text.is_empty() {
            return false;
        }
        self.all.iter().all(|s| text.contains(s))
            && (self.any.is_empty() || self.any.iter().any(|s| text.contains(s)))
    }
}

/// Lower-cased text of the first present (non-null) key.
fn field_text(obj: &Map<String, JsonValue>, keys: &[&str]) -> String {
    let value = keys
        .iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()));
    match value {
        Some(JsonValue::String(s)) => s.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
        None => String::new(),
    }
}

/// Classify a response body. Non-object bodies carry no signal.
#[must_use]
pub fn classify(body: &JsonValue) -> Option<Signal> {
    let obj = body.as_object()?;
    RULES.iter().find(|r| r.matches(obj)).map(|r| r.signal)
}

/// Whether the body reports an expired or invalid session.
#[must_use]
pub fn looks_expired(body: &JsonValue) -> bool {
    classify(body) == Some(Signal::SessionExpired)
}

/// Whether the body demands acceptance of the latest terms.
#[must_use]
pub fn looks_terms_required(body: &JsonValue) -> bool {
    classify(body) == Some(Signal::TermsRequired)
}

/// Read the `exp` claim from a dot-separated token without verifying it.
///
/// Returns `None` for anything malformed: fewer than two segments, a payload
/// that is not base64 JSON, or a missing or non-numeric `exp`.
#[must_use]
pub fn decode_expiry(token: &str) -> Option<i64> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?.trim_end_matches('=');

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let claims: JsonValue = serde_json::from_slice(&bytes).ok()?;

    match claims.get("exp")? {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// Whether `exp` falls within `lookahead_secs` of `now` (inclusive).
#[must_use]
pub fn expires_within(exp: i64, now: i64, lookahead_secs: i64) -> bool {
    exp.saturating_sub(now) <= lookahead_secs
}

/// Current Unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
