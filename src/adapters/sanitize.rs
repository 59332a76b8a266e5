//! Log sanitization: Redacts patient identifiers and secrets from log lines.
//!
//! Applied to every formatted line through [`SanitizingMakeWriter`]. Covers:
//! - `Patient_Name` / `Patient_ID` fields, JSON or `key=value` style
//! - UUIDs, SSNs, MRNs, emails, phone numbers
//! - Bearer tokens, JWTs, keyed secrets, long hex key material, PEM blocks
//!
//! The pipeline never logs names on purpose; this is the backstop for input
//! echoed by a library or an error message.
//!
//! Input is capped at `TRIAGE_SANITIZE_MAX_BYTES` (default 16 KiB) per call.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// Ordered redaction rules: `(pattern, replacement)`.
///
/// Field rules come first so their keys survive in the output.
const RULES: &[(&str, &str)] = &[
    (
        r#"(?i)("?patient[_ ]?name"?\s*[:=]\s*)(?:"[^"]{0,256}"|[^\s,"}]+)"#,
        "${1}[REDACTED-NAME]",
    ),
    (
        r#"(?i)("?patient[_ ]?id"?\s*[:=]\s*)"?[0-9]+(?:\.[0-9]+)?"?"#,
        "${1}[REDACTED-ID]",
    ),
    (
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        "[REDACTED-UUID]",
    ),
    (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
    (r"\bMRN[:\s]?\d{6,10}\b", "[REDACTED-MRN]"),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (
        r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
        "[REDACTED-PHONE]",
    ),
    (
        r"\beyJ[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\b",
        "[REDACTED-JWT]",
    ),
    (r"(?i)\bbearer\s+[A-Za-z0-9._~+/-]{16,}=*", "Bearer [REDACTED-TOKEN]"),
    (
        r"(?i)\b(?:api[_-]?key|access[_-]?token|secret|password|private[_-]?key|seed|signature|token|key)\b\s*[:=]\s*[A-Za-z0-9+/]{32,}={0,2}",
        "[REDACTED-SECRET]",
    ),
    (r"\b[0-9a-fA-F]{32,}\b", "[REDACTED-KEY]"),
];

/// PEM blocks are matched separately: the bounded multi-line pattern is
/// large and only worth running when the header is present.
const PEM_RULE: (&str, &str) = (
    r"(?s)-----BEGIN [A-Z0-9 ]{0,40}KEY-----.{0,8192}?-----END [A-Z0-9 ]{0,40}KEY-----",
    "[REDACTED-PEM-KEY]",
);

struct Patterns {
    any: RegexSet,
    rules: Vec<(Regex, &'static str)>,
    pem: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        any: RegexSet::new(RULES.iter().map(|(p, _)| *p)).expect("Valid regex set"),
        rules: RULES
            .iter()
            .map(|(p, r)| (Regex::new(p).expect("Valid regex"), *r))
            .collect(),
        pem: Regex::new(PEM_RULE.0).expect("Valid regex"),
    })
}

static MAX_BYTES: OnceLock<usize> = OnceLock::new();

/// Cap from `TRIAGE_SANITIZE_MAX_BYTES`, read on first use.
fn max_sanitize_bytes() -> usize {
    *MAX_BYTES.get_or_init(|| {
        std::env::var("TRIAGE_SANITIZE_MAX_BYTES")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
    })
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Redact every known PII and secret pattern in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.any.matches(prefix).into_iter() {
        let (regex, replacement) = &patterns.rules[idx];
        result = regex.replace_all(&result, *replacement).into_owned();
    }
    if result.contains("-----BEGIN ") {
        result = patterns.pem.replace_all(&result, PEM_RULE.1).into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Whether `input` contains anything [`sanitize`] would redact.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let patterns = patterns();
    let (prefix, _) = truncate_to_char_boundary(input, max_sanitize_bytes());
    patterns.any.is_match(prefix) || (prefix.contains("-----BEGIN ") && patterns.pem.is_match(prefix))
}

/// `MakeWriter` wrapper that sanitizes each formatted log line.
///
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
    max_bytes: usize,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self::with_max_bytes(inner, max_sanitize_bytes())
    }

    #[must_use]
    pub fn with_max_bytes(inner: M, max_bytes: usize) -> Self {
        Self {
            inner,
            max_bytes: max_bytes.max(1),
        }
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
            max_bytes: self.max_bytes,
        }
    }
}

/// Buffers bytes until a newline, then writes the sanitized line.
pub struct SanitizingWriter<W> {
    inner: W,
    pending: Vec<u8>,
    max_bytes: usize,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let sanitized = sanitize_with_limit(&String::from_utf8_lossy(bytes), self.max_bytes);
        self.inner.write_all(sanitized.as_bytes())
    }

    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);

        // A single huge line without newlines is cut instead of buffered forever.
        if self.pending.len() > self.max_bytes.saturating_mul(2) {
            let line = std::mem::take(&mut self.pending);
            self.write_sanitized(&line)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.drain_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.write_sanitized(&rest)?;
        }
        self.inner.flush()
    }
}
