use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const WORD_LIMIT_MIN: i64 = 5;
pub const WORD_LIMIT_MAX: i64 = 100;
pub const WORD_LIMIT_DEFAULT: i64 = 20;

/// Word limit as the user entered it. Only the rendered value is clamped;
/// the raw value is what goes over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WordLimit(i64);

impl WordLimit {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// `None` for input a number field would submit as empty or garbage.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<i64>().ok().map(Self)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn display(self) -> i64 {
        self.0.clamp(WORD_LIMIT_MIN, WORD_LIMIT_MAX)
    }
}

impl Default for WordLimit {
    fn default() -> Self {
        Self(WORD_LIMIT_DEFAULT)
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
pub struct AltTextResponse {
    #[serde(default)]
    pub alt_text: Option<Value>,
}

impl AltTextResponse {
    /// Text to show for `alt_text`. Falsy values (missing, null, false, 0,
    /// empty string) yield `None`; other scalars are shown as written.
    pub fn text(&self) -> Option<String> {
        match self.alt_text.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            other => Some(other.to_string()),
        }
    }
}

/// Body the generation service sends alongside a failing status.
#[derive(Debug, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub file_name: Option<String>,
    pub word_limit: WordLimit,
    pub word_limit_display: i64,
    pub alt_text: String,
    pub loading: bool,
    pub phase: Phase,
    pub last_outcome: Option<Outcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_limit_defaults_to_twenty() {
        assert_eq!(WordLimit::default().value(), 20);
    }

    #[test]
    fn display_clamps_but_value_does_not() {
        let low = WordLimit::new(2);
        assert_eq!(low.display(), 5);
        assert_eq!(low.value(), 2);

        let high = WordLimit::new(250);
        assert_eq!(high.display(), 100);
        assert_eq!(high.value(), 250);

        assert_eq!(WordLimit::new(42).display(), 42);
    }

    #[test]
    fn parse_rejects_empty_and_non_numeric() {
        assert_eq!(WordLimit::parse(" 35 "), Some(WordLimit::new(35)));
        assert_eq!(WordLimit::parse(""), None);
        assert_eq!(WordLimit::parse("twenty"), None);
        assert_eq!(WordLimit::parse("-3"), Some(WordLimit::new(-3)));
    }

    #[test]
    fn response_without_alt_text_field_decodes() {
        let parsed: AltTextResponse = serde_json::from_str(r#"{"caption": "x"}"#).unwrap();
        assert_eq!(parsed.text(), None);

        let parsed: AltTextResponse = serde_json::from_str(r#"{"alt_text": null}"#).unwrap();
        assert_eq!(parsed.text(), None);
    }

    #[test]
    fn non_string_alt_text_is_shown_unless_falsy() {
        let text = |body: &str| serde_json::from_str::<AltTextResponse>(body).unwrap().text();

        assert_eq!(text(r#"{"alt_text": 42}"#).as_deref(), Some("42"));
        assert_eq!(text(r#"{"alt_text": true}"#).as_deref(), Some("true"));
        assert_eq!(text(r#"{"alt_text": 0}"#), None);
        assert_eq!(text(r#"{"alt_text": false}"#), None);
        assert_eq!(text(r#"{"alt_text": ""}"#), None);
        assert_eq!(text(r#"{"alt_text": "A dog"}"#).as_deref(), Some("A dog"));
    }

    #[test]
    fn view_serializes_lowercase_phase() {
        let view = FormView {
            file_name: None,
            word_limit: WordLimit::new(3),
            word_limit_display: 5,
            alt_text: String::new(),
            loading: false,
            phase: Phase::Idle,
            last_outcome: Some(Outcome::Failure),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["last_outcome"], "failure");
        assert_eq!(json["word_limit"], 3);
    }
}
