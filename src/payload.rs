//! Request payload parsing and validation
//!
//! Turns a raw JSON body into a typed [`CaptureRequest`]. Validation is
//! short-circuiting: fields are checked in a fixed order and the first
//! failing field's message is returned. A request that fails any field
//! constraint is never constructed.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Color scheme emulated for the page before capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorScheme {
    Light,
    Dark,
    NoPreference,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
            ColorScheme::NoPreference => "no-preference",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "light" => Some(ColorScheme::Light),
            "dark" => Some(ColorScheme::Dark),
            "no-preference" => Some(ColorScheme::NoPreference),
            _ => None,
        }
    }
}

/// Page viewport, clamped to sane bounds at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

const VIEWPORT_MIN: f64 = 1.0;
const VIEWPORT_MAX: f64 = 10_000.0;

fn clamp_dimension(value: f64) -> u32 {
    value.round().clamp(VIEWPORT_MIN, VIEWPORT_MAX) as u32
}

/// A validated, immutable description of one capture.
///
/// Only the parser (or the CLI, which performs its own pre-validation)
/// constructs these. `selector` always has a value; absent optional fields
/// stay `None` rather than defaulting to empty values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub url: String,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<ColorScheme>,
}

impl CaptureRequest {
    /// Minimal request for a URL, everything else defaulted.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selector: "body".to_string(),
            timeout: None,
            args: None,
            user_agent: None,
            viewport: None,
            wait_for: None,
            color_scheme: None,
        }
    }
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Parse and validate a raw request body.
///
/// An empty body parses as `{}` (and then fails on the missing url).
/// Unknown fields are ignored. Field order: url, selector, args,
/// userAgent, viewport, waitFor, colorScheme, timeout.
pub fn parse(raw: &str) -> Result<CaptureRequest, String> {
    let value: Value = if raw.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(raw).map_err(|_| "Invalid JSON".to_string())?
    };

    let body = match value.as_object() {
        Some(body) => body,
        None => return Err("Body must be JSON object".to_string()),
    };

    let url = match body.get("url").and_then(Value::as_str) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => return Err("Missing url".to_string()),
    };
    if !has_http_scheme(&url) {
        return Err("url must start with http(s)://".to_string());
    }

    let selector = match body.get("selector").and_then(Value::as_str) {
        Some(selector) if !selector.trim().is_empty() => selector.trim().to_string(),
        _ => "body".to_string(),
    };

    let args = match body.get("args") {
        None => None,
        Some(Value::Array(items)) => {
            let mut args = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(arg) => args.push(arg.to_string()),
                    None => return Err("args must be an array of strings".to_string()),
                }
            }
            Some(args)
        }
        Some(_) => return Err("args must be an array of strings".to_string()),
    };

    let user_agent = match body.get("userAgent") {
        None => None,
        Some(Value::String(user_agent)) => Some(user_agent.clone()),
        Some(_) => return Err("userAgent must be string".to_string()),
    };

    let viewport = match body.get("viewport") {
        None => None,
        Some(Value::Object(candidate)) => {
            let width = candidate.get("width").and_then(Value::as_f64);
            let height = candidate.get("height").and_then(Value::as_f64);
            match (width, height) {
                (Some(width), Some(height)) => Some(Viewport {
                    width: clamp_dimension(width),
                    height: clamp_dimension(height),
                }),
                _ => return Err("viewport.width/height must be numbers".to_string()),
            }
        }
        Some(_) => return Err("viewport must be object".to_string()),
    };

    let wait_for = match body.get("waitFor") {
        None => None,
        Some(Value::String(wait_for)) => Some(wait_for.clone()),
        Some(_) => return Err("waitFor must be string (CSS selector)".to_string()),
    };

    let color_scheme = match body.get("colorScheme") {
        None => None,
        Some(Value::String(name)) => match ColorScheme::from_name(name) {
            Some(scheme) => Some(scheme),
            None => {
                return Err(
                    "colorScheme must be one of: light | dark | no-preference".to_string()
                )
            }
        },
        Some(_) => {
            return Err("colorScheme must be one of: light | dark | no-preference".to_string())
        }
    };

    let timeout = match body.get("timeout") {
        None => None,
        Some(value) => match value.as_f64() {
            Some(ms) if ms.is_finite() && ms > 0.0 => {
                Some(Duration::from_millis(ms.round() as u64))
            }
            _ => return Err("timeout must be a positive number".to_string()),
        },
    };

    Ok(CaptureRequest {
        url,
        selector,
        timeout,
        args,
        user_agent,
        viewport,
        wait_for,
        color_scheme,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https_urls() {
        for url in ["http://example.com", "https://example.com", "HTTPS://EXAMPLE.COM"] {
            let parsed = parse(&format!(r#"{{"url":"{url}"}}"#)).unwrap();
            assert_eq!(parsed.url, url);
        }
    }

    #[test]
    fn test_rejects_missing_or_invalid_urls() {
        assert_eq!(parse("{}"), Err("Missing url".to_string()));
        assert_eq!(parse(r#"{"url":""}"#), Err("Missing url".to_string()));
        assert_eq!(parse(r#"{"url":42}"#), Err("Missing url".to_string()));
        assert_eq!(
            parse(r#"{"url":"ftp://example.com"}"#),
            Err("url must start with http(s)://".to_string())
        );
        assert_eq!(
            parse(r#"{"url":"not-a-url"}"#),
            Err("url must start with http(s)://".to_string())
        );
    }

    #[test]
    fn test_empty_body_parses_as_empty_object() {
        assert_eq!(parse(""), Err("Missing url".to_string()));
    }

    #[test]
    fn test_malformed_json_and_non_object_bodies() {
        assert_eq!(parse("{nope"), Err("Invalid JSON".to_string()));
        assert_eq!(parse("[1,2]"), Err("Body must be JSON object".to_string()));
        assert_eq!(parse("null"), Err("Body must be JSON object".to_string()));
        assert_eq!(parse("\"text\""), Err("Body must be JSON object".to_string()));
    }

    #[test]
    fn test_selector_defaults_to_body() {
        let absent = parse(r#"{"url":"http://example.com"}"#).unwrap();
        assert_eq!(absent.selector, "body");

        let blank = parse(r#"{"url":"http://example.com","selector":"   "}"#).unwrap();
        assert_eq!(blank.selector, "body");

        let non_string = parse(r#"{"url":"http://example.com","selector":7}"#).unwrap();
        assert_eq!(non_string.selector, "body");

        let trimmed = parse(r#"{"url":"http://example.com","selector":" h1 "}"#).unwrap();
        assert_eq!(trimmed.selector, "h1");
    }

    #[test]
    fn test_viewport_is_clamped_and_rounded() {
        let cases = [
            (800.4, 600.6, 800, 601),
            (0.0, -50.0, 1, 1),
            (20_000.0, 10_000.0, 10_000, 10_000),
        ];
        for (width, height, expect_width, expect_height) in cases {
            let parsed = parse(&format!(
                r#"{{"url":"http://example.com","viewport":{{"width":{width},"height":{height}}}}}"#
            ))
            .unwrap();
            let viewport = parsed.viewport.unwrap();
            assert_eq!(viewport.width, expect_width);
            assert_eq!(viewport.height, expect_height);
        }
    }

    #[test]
    fn test_viewport_validation_messages() {
        assert_eq!(
            parse(r#"{"url":"http://example.com","viewport":"big"}"#),
            Err("viewport must be object".to_string())
        );
        assert_eq!(
            parse(r#"{"url":"http://example.com","viewport":{"width":"a","height":2}}"#),
            Err("viewport.width/height must be numbers".to_string())
        );
        assert_eq!(
            parse(r#"{"url":"http://example.com","viewport":{"width":3}}"#),
            Err("viewport.width/height must be numbers".to_string())
        );
    }

    #[test]
    fn test_args_must_be_all_strings_and_keep_order() {
        let parsed = parse(
            r#"{"url":"http://example.com","args":["--disable-gpu","--lang=en","--no-sandbox"]}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.args.unwrap(),
            vec!["--disable-gpu", "--lang=en", "--no-sandbox"]
        );

        for bad in [r#"["--ok",3]"#, r#""--flag""#, "null"] {
            assert_eq!(
                parse(&format!(r#"{{"url":"http://example.com","args":{bad}}}"#)),
                Err("args must be an array of strings".to_string())
            );
        }
    }

    #[test]
    fn test_optional_string_fields() {
        assert_eq!(
            parse(r#"{"url":"http://example.com","userAgent":9}"#),
            Err("userAgent must be string".to_string())
        );
        assert_eq!(
            parse(r#"{"url":"http://example.com","waitFor":false}"#),
            Err("waitFor must be string (CSS selector)".to_string())
        );

        let parsed = parse(
            r#"{"url":"http://example.com","userAgent":"probe/1.0","waitFor":".ready"}"#,
        )
        .unwrap();
        assert_eq!(parsed.user_agent.as_deref(), Some("probe/1.0"));
        assert_eq!(parsed.wait_for.as_deref(), Some(".ready"));
    }

    #[test]
    fn test_color_scheme_is_a_closed_set() {
        let parsed = parse(r#"{"url":"http://example.com","colorScheme":"dark"}"#).unwrap();
        assert_eq!(parsed.color_scheme, Some(ColorScheme::Dark));

        for bad in [r#""sepia""#, "1"] {
            assert_eq!(
                parse(&format!(r#"{{"url":"http://example.com","colorScheme":{bad}}}"#)),
                Err("colorScheme must be one of: light | dark | no-preference".to_string())
            );
        }
    }

    #[test]
    fn test_timeout_must_be_positive_and_rounds() {
        let parsed = parse(r#"{"url":"http://example.com","timeout":2500.4}"#).unwrap();
        assert_eq!(parsed.timeout, Some(Duration::from_millis(2500)));

        for bad in ["0", "-5", r#""1000""#] {
            assert_eq!(
                parse(&format!(r#"{{"url":"http://example.com","timeout":{bad}}}"#)),
                Err("timeout must be a positive number".to_string())
            );
        }
    }

    #[test]
    fn test_first_failing_field_wins() {
        // Both url and timeout are invalid; url is validated first.
        assert_eq!(
            parse(r#"{"url":"nope","timeout":-1}"#),
            Err("url must start with http(s)://".to_string())
        );
        // args is validated before viewport.
        assert_eq!(
            parse(r#"{"url":"http://example.com","args":3,"viewport":"x"}"#),
            Err("args must be an array of strings".to_string())
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let parsed =
            parse(r#"{"url":"http://example.com","fullPage":true,"quality":80}"#).unwrap();
        assert_eq!(parsed, CaptureRequest::for_url("http://example.com"));
    }
}
