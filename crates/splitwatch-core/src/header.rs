//! `Server-Timing` header rendering.
//!
//! Multi-append mode: each metric becomes one header value, and the caller
//! appends every value as its own `Server-Timing` field. Values already on the
//! response stay where they are; no merge step is needed.
//!
//! Value grammar: `name;dur=<ms>[;desc="<name>: <description>"]`.
//! See <https://w3c.github.io/server-timing>.

use std::fmt::{self, Write};

use crate::metric::Metric;

/// Lowercase field name, suitable for `HeaderName::from_static`.
pub const SERVER_TIMING: &str = "server-timing";

/// RFC 7230 `token`: one or more tchars. Metric names must be tokens to be
/// emitted; anything else could inject extra parameters or entries.
pub fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

/// Display adapter rendering one metric as a header value.
///
/// The name is written as-is; check it with `is_token` first.
#[derive(Debug, Clone, Copy)]
pub struct TimingEntry<'a>(pub &'a Metric);

impl fmt::Display for TimingEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metric = self.0;
        let name = metric.name();
        write!(f, "{name};dur={}", format_millis(metric.duration().unwrap_or(0.0)))?;
        if let Some(description) = metric.description().filter(|d| !d.is_empty()) {
            f.write_str(";desc=")?;
            write_quoted(f, &format!("{name}: {description}"))?;
        }
        Ok(())
    }
}

/// Render one value per metric, in snapshot order, skipping metrics whose
/// name is not a token. Empty in, empty out.
pub fn render_values(metrics: &[Metric]) -> Vec<String> {
    metrics
        .iter()
        .filter(|m| is_token(m.name()))
        .map(|m| TimingEntry(m).to_string())
        .collect()
}

/// Shortest decimal form of a 3-dp millisecond value: `12.345`, `12.3`, `12`.
pub fn format_millis(ms: f64) -> String {
    let fixed = format!("{:.3}", ms.max(0.0));
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

/// HTTP quoted-string: wrap in quotes, backslash-escape `"` and `\`.
fn write_quoted(out: &mut impl Write, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.write_char('\\')?;
        }
        out.write_char(c)?;
    }
    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_are_trimmed() {
        assert_eq!(format_millis(12.345), "12.345");
        assert_eq!(format_millis(12.3), "12.3");
        assert_eq!(format_millis(10.0), "10");
        assert_eq!(format_millis(100.0), "100");
        assert_eq!(format_millis(0.0), "0");
        assert_eq!(format_millis(0.001), "0.001");
        assert_eq!(format_millis(-1.0), "0");
    }

    #[test]
    fn quoting_escapes_specials() {
        let mut out = String::new();
        write_quoted(&mut out, r#"say "hi" \o/"#).unwrap_or_default();
        assert_eq!(out, r#""say \"hi\" \\o/""#);
    }

    #[test]
    fn token_rule() {
        assert!(is_token("db"));
        assert!(is_token("cache.hit_ratio~2"));
        assert!(!is_token(""));
        assert!(!is_token("db query"));
        assert!(!is_token("db, evil;dur=999"));
        assert!(!is_token("a=b"));
        assert!(!is_token("café"));
    }

    #[test]
    fn names_outside_token_rule_are_not_rendered() {
        use crate::clock::ManualClock;
        use crate::store::{SnapshotOptions, TimingStore};
        use std::sync::Arc;

        let mut store = TimingStore::new(Arc::new(ManualClock::new()));
        for name in ["db, evil;dur=999", "cache"] {
            assert!(store.start(name, None, None).is_ok());
        }
        let metrics = store.snapshot(SnapshotOptions::finalize());
        assert_eq!(render_values(&metrics), ["cache;dur=0"]);
    }

    #[test]
    fn empty_snapshot_renders_nothing() {
        assert!(render_values(&[]).is_empty());
    }
}
