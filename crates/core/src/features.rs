//! Feature registry: named scalar feature functions over lines and spans.
//!
//! A [`Feature`] is a pure function of a [`FeatureContext`] — it reads only
//! the lines (and, for span features, the candidate span) it is handed, and
//! returns a bounded signal. Dynamic features synthesised from file-level
//! discovery (out of scope here) are constructed as the same interface with
//! an id prefixed `dyn:` (see [`crate::dynamic`]).

use crate::span::{Span, is_whitespace_only};

/// The span half of a [`FeatureContext`], present only when evaluating a
/// span-level feature.
pub struct SpanContext<'a> {
    /// The candidate span being scored.
    pub span: Span,
    /// The span's text, sliced from its line.
    pub text: &'a str,
}

/// Everything a [`Feature::apply`] call can read.
///
/// Line features read only `lines`/`line_index`; span features additionally
/// read `span`. A feature that reads a context field it doesn't expect
/// (e.g. a line feature checking `span`) gets `None`/`0`, never a panic —
/// "unknown context fields yield 0" per the feature contract.
pub struct FeatureContext<'a> {
    /// All document lines (no trailing newline per element).
    pub lines: &'a [String],
    /// The line this feature is being evaluated for.
    pub line_index: usize,
    /// `Some` only for span-level feature evaluation.
    pub span: Option<SpanContext<'a>>,
}

impl<'a> FeatureContext<'a> {
    /// Build a line-level context (no candidate span).
    pub fn line(lines: &'a [String], line_index: usize) -> Self {
        Self {
            lines,
            line_index,
            span: None,
        }
    }

    /// Build a span-level context.
    pub fn span(lines: &'a [String], line_index: usize, span: Span, text: &'a str) -> Self {
        Self {
            lines,
            line_index,
            span: Some(SpanContext { span, text }),
        }
    }

    /// The text of the line currently being evaluated, or `""` if out of range.
    pub fn current_line(&self) -> &'a str {
        self.lines
            .get(self.line_index)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// The text of the line at `line_index + offset` (may be negative),
    /// or `None` if out of range.
    pub fn line_at(&self, offset: isize) -> Option<&'a str> {
        let idx = self.line_index as isize + offset;
        if idx < 0 {
            return None;
        }
        self.lines.get(idx as usize).map(String::as_str)
    }
}

/// A named, pure scalar feature function.
///
/// Implementations are small value types; the registry holds them as trait
/// objects so dynamic (`dyn:`-prefixed) features synthesised at runtime can
/// sit in the same `Vec` as the built-in ones.
pub trait Feature {
    /// The feature's stable id, e.g. `"segment.is_email"`.
    fn id(&self) -> &str;

    /// Evaluate the feature against `ctx`.
    fn apply(&self, ctx: &FeatureContext<'_>) -> f64;
}

fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

fn leading_indent(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

const ROLE_KEYWORDS: &[&str] = &[
    "Parent",
    "Guardian",
    "Grandparent",
    "Aunt/Uncle",
    "Foster",
    "Emergency Contact",
];

fn contains_role_keyword(line: &str) -> bool {
    let lower = line.to_lowercase();
    ROLE_KEYWORDS
        .iter()
        .any(|kw| lower.contains(&kw.to_lowercase()))
}

fn digit_only_len(text: &str) -> usize {
    text.chars().filter(char::is_ascii_digit).count()
}

fn looks_like_birthdate(text: &str) -> bool {
    let bytes = text.trim().as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    let is_digit = |b: u8| b.is_ascii_digit();
    bytes[0..4].iter().all(|b| is_digit(*b))
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(|b| is_digit(*b))
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(|b| is_digit(*b))
}

fn looks_like_email(text: &str) -> bool {
    let text = text.trim();
    let Some(at) = text.find('@') else {
        return false;
    };
    let (local, domain) = (&text[..at], &text[at + 1..]);
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn looks_like_phone(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || looks_like_email(text) {
        return false;
    }
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ' | '.');
    if !text.chars().all(allowed) {
        return false;
    }
    let digits = digit_only_len(text);
    (7..=11).contains(&digits)
}

fn looks_like_name(text: &str) -> bool {
    let words = tokens(text);
    if words.len() < 2 {
        return false;
    }
    words.iter().all(|w| {
        let mut chars = w.chars();
        matches!(chars.next(), Some(c) if c.is_uppercase()) && w.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-')
    })
}

fn looks_like_preferred_name(text: &str) -> bool {
    let text = text.trim();
    let stripped = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .or_else(|| text.strip_prefix('(').and_then(|s| s.strip_suffix(')')));
    match stripped {
        Some(inner) => !inner.is_empty() && tokens(inner).len() <= 2,
        None => false,
    }
}

fn looks_like_extid(text: &str) -> bool {
    let text = text.trim();
    if text.len() < 5 || text.len() > 12 {
        return false;
    }
    if !text.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let has_alpha = text.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    has_alpha && has_digit
}

macro_rules! line_feature {
    ($name:ident, $id:expr, |$line_ctx:ident| $body:expr) => {
        /// Line feature.
        pub struct $name;
        impl Feature for $name {
            fn id(&self) -> &str {
                $id
            }
            fn apply(&self, $line_ctx: &FeatureContext<'_>) -> f64 {
                $body
            }
        }
    };
}

line_feature!(IndentationDelta, "line.indentation_delta", |ctx| {
    let cur = leading_indent(ctx.current_line()) as f64;
    let prev = ctx
        .line_at(-1)
        .map(|l| leading_indent(l) as f64)
        .unwrap_or(cur);
    clamp((cur - prev) / 8.0, -1.0, 1.0)
});

line_feature!(LexicalJaccardDrop, "line.lexical_jaccard_drop", |ctx| {
    let Some(prev) = ctx.line_at(-1) else {
        return 0.0;
    };
    let a: std::collections::HashSet<&str> = tokens(prev).into_iter().collect();
    let b: std::collections::HashSet<&str> = tokens(ctx.current_line()).into_iter().collect();
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(&b).count() as f64;
    let union = a.union(&b).count().max(1) as f64;
    1.0 - inter / union
});

line_feature!(BlankLine, "line.blank", |ctx| {
    if is_whitespace_only(ctx.current_line()) {
        1.0
    } else {
        0.0
    }
});

line_feature!(OutlineBullet, "line.outline_bullet", |ctx| {
    let trimmed = ctx.current_line().trim_start();
    let starts_with_bullet = trimmed.starts_with(['-', '*', '\u{2022}', '\u{00b7}'])
        || trimmed
            .split_once('.')
            .is_some_and(|(prefix, _)| !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()));
    if starts_with_bullet {
        1.0
    } else {
        0.0
    }
});

line_feature!(RoleKeyword, "line.role_keyword", |ctx| {
    if contains_role_keyword(ctx.current_line()) {
        1.0
    } else {
        0.0
    }
});

line_feature!(HasName, "line.has_name", |ctx| {
    let line = ctx.current_line();
    if tokens(line).windows(2).any(|w| {
        let joined = format!("{} {}", w[0], w[1]);
        looks_like_name(&joined)
    }) {
        1.0
    } else {
        0.0
    }
});

line_feature!(HasPreferred, "line.has_preferred", |ctx| {
    let line = ctx.current_line();
    if line.contains('"') || (line.contains('(') && line.contains(')')) {
        1.0
    } else {
        0.0
    }
});

line_feature!(HasBirthdate, "line.has_birthdate", |ctx| {
    let line = ctx.current_line();
    if tokens(line).iter().any(|t| looks_like_birthdate(t)) {
        1.0
    } else {
        0.0
    }
});

line_feature!(HasLabel, "line.has_label", |ctx| {
    if ctx.current_line().contains(':') {
        1.0
    } else {
        0.0
    }
});

line_feature!(NextHasContact, "line.next_has_contact", |ctx| {
    match ctx.line_at(1) {
        Some(next) => {
            if tokens(next)
                .iter()
                .any(|t| looks_like_email(t) || looks_like_phone(t))
            {
                1.0
            } else {
                0.0
            }
        }
        None => 0.0,
    }
});

line_feature!(ShortTokenCount, "line.short_token_count", |ctx| {
    if tokens(ctx.current_line()).len() <= 3 {
        1.0
    } else {
        0.0
    }
});

line_feature!(LeadingStructural, "line.leading_structural", |ctx| {
    let line = ctx.current_line();
    let outline = OutlineBullet.apply(ctx) > 0.0;
    if outline || line.starts_with('\t') || line.starts_with("  ") {
        1.0
    } else {
        0.0
    }
});

line_feature!(LeadingExtId, "line.leading_extid", |ctx| {
    match tokens(ctx.current_line()).first() {
        Some(tok) if looks_like_extid(tok) => 1.0,
        _ => 0.0,
    }
});

line_feature!(PrimaryLikely, "line.primary_likely", |ctx| {
    let leading_extid = LeadingExtId.apply(ctx) > 0.0;
    let has_name = HasName.apply(ctx) > 0.0;
    let role_keyword = RoleKeyword.apply(ctx) > 0.0;
    let not_indented = IndentationDelta.apply(ctx) <= 0.0;
    if (leading_extid || has_name) && !role_keyword && not_indented {
        1.0
    } else {
        0.0
    }
});

line_feature!(GuardianLikely, "line.guardian_likely", |ctx| {
    let role_keyword = RoleKeyword.apply(ctx) > 0.0;
    let not_indented = IndentationDelta.apply(ctx) <= 0.0;
    if role_keyword && not_indented {
        1.0
    } else {
        0.0
    }
});

/// The default set of line-level (boundary) features.
pub fn default_boundary_features() -> Vec<Box<dyn Feature>> {
    vec![
        Box::new(IndentationDelta),
        Box::new(LexicalJaccardDrop),
        Box::new(BlankLine),
        Box::new(OutlineBullet),
        Box::new(RoleKeyword),
        Box::new(HasName),
        Box::new(HasPreferred),
        Box::new(HasBirthdate),
        Box::new(HasLabel),
        Box::new(NextHasContact),
        Box::new(ShortTokenCount),
        Box::new(LeadingStructural),
        Box::new(LeadingExtId),
        Box::new(PrimaryLikely),
        Box::new(GuardianLikely),
    ]
}

macro_rules! span_feature {
    ($name:ident, $id:expr, |$ctx:ident, $span_ctx:ident| $body:expr) => {
        /// Span feature.
        pub struct $name;
        impl Feature for $name {
            fn id(&self) -> &str {
                $id
            }
            fn apply(&self, $ctx: &FeatureContext<'_>) -> f64 {
                match &$ctx.span {
                    Some($span_ctx) => $body,
                    None => 0.0,
                }
            }
        }
    };
}

span_feature!(TokenCountBucket, "token.count_bucket", |_ctx, sc| {
    clamp(tokens(sc.text).len() as f64 / 5.0, 0.0, 1.0)
});

span_feature!(NumericRatio, "segment.numeric_ratio", |_ctx, sc| {
    let len = sc.text.chars().filter(|c| !c.is_whitespace()).count();
    if len == 0 {
        0.0
    } else {
        clamp(digit_only_len(sc.text) as f64 / len as f64, 0.0, 1.0)
    }
});

span_feature!(IsEmail, "segment.is_email", |_ctx, sc| {
    if looks_like_email(sc.text) { 1.0 } else { 0.0 }
});

span_feature!(IsPhone, "segment.is_phone", |_ctx, sc| {
    if looks_like_phone(sc.text) { 1.0 } else { 0.0 }
});

span_feature!(IsBirthdate, "segment.is_birthdate", |_ctx, sc| {
    if looks_like_birthdate(sc.text) { 1.0 } else { 0.0 }
});

span_feature!(IsName, "segment.is_name", |_ctx, sc| {
    if looks_like_name(sc.text) { 1.0 } else { 0.0 }
});

span_feature!(IsPreferredName, "segment.is_preferred_name", |_ctx, sc| {
    if looks_like_preferred_name(sc.text) {
        1.0
    } else {
        0.0
    }
});

span_feature!(IsExtId, "segment.is_extid", |_ctx, sc| {
    if looks_like_extid(sc.text) { 1.0 } else { 0.0 }
});

span_feature!(ContextualIsolation, "segment.contextual_isolation", |ctx, sc| {
    let line = ctx.current_line();
    let before = sc.span.start.checked_sub(1).and_then(|i| line.as_bytes().get(i));
    if matches!(before, Some(b'\t') | None) {
        1.0
    } else {
        0.0
    }
});

span_feature!(
    RelativePositionConsistency,
    "segment.relative_position_consistency",
    |ctx, sc| {
        let line_len = ctx.current_line().len().max(1) as f64;
        clamp(1.0 - (sc.span.start as f64 / line_len), 0.0, 1.0)
    }
);

/// The default set of span-level (segment/token) features.
pub fn default_segment_features() -> Vec<Box<dyn Feature>> {
    vec![
        Box::new(TokenCountBucket),
        Box::new(NumericRatio),
        Box::new(IsEmail),
        Box::new(IsPhone),
        Box::new(IsBirthdate),
        Box::new(IsName),
        Box::new(IsPreferredName),
        Box::new(IsExtId),
        Box::new(ContextualIsolation),
        Box::new(RelativePositionConsistency),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn blank_line_feature() {
        let lines = lines(&["", "text"]);
        let ctx = FeatureContext::line(&lines, 0);
        assert_eq!(BlankLine.id(), "line.blank");
        assert_eq!(BlankLine.apply(&ctx), 1.0);
        let ctx = FeatureContext::line(&lines, 1);
        assert_eq!(BlankLine.apply(&ctx), 0.0);
    }

    #[test]
    fn indentation_delta_clamped() {
        let lines = lines(&["a", "                b"]);
        let ctx = FeatureContext::line(&lines, 1);
        assert_eq!(IndentationDelta.apply(&ctx), 1.0);
    }

    #[test]
    fn is_email_detects_basic_address() {
        let lines = lines(&["contact: a@b.com"]);
        let ctx = FeatureContext::span(&lines, 0, Span::new(9, 16), "a@b.com");
        assert_eq!(IsEmail.apply(&ctx), 1.0);
    }

    #[test]
    fn is_phone_handles_separators() {
        let lines = lines(&["555-123-4567"]);
        let ctx = FeatureContext::span(&lines, 0, Span::new(0, 12), "555-123-4567");
        assert_eq!(IsPhone.apply(&ctx), 1.0);
    }

    #[test]
    fn is_extid_requires_letters_and_digits() {
        let lines = lines(&["45NUMBEU"]);
        let ctx = FeatureContext::span(&lines, 0, Span::new(0, 8), "45NUMBEU");
        assert_eq!(IsExtId.apply(&ctx), 1.0);
        let ctx2 = FeatureContext::span(&lines, 0, Span::new(0, 8), "12345678");
        assert_eq!(IsExtId.apply(&ctx2), 0.0);
    }

    #[test]
    fn is_birthdate_exact_format() {
        let lines = lines(&["2014-05-04"]);
        let ctx = FeatureContext::span(&lines, 0, Span::new(0, 10), "2014-05-04");
        assert_eq!(IsBirthdate.apply(&ctx), 1.0);
    }

    #[test]
    fn span_feature_on_line_context_yields_zero() {
        let lines = lines(&["x"]);
        let ctx = FeatureContext::line(&lines, 0);
        assert_eq!(IsEmail.apply(&ctx), 0.0);
    }

    #[test]
    fn role_keyword_matches_case_insensitively() {
        let lines = lines(&["  * emergency contact: Jane"]);
        let ctx = FeatureContext::line(&lines, 0);
        assert_eq!(RoleKeyword.apply(&ctx), 1.0);
    }
}
