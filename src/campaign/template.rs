use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::Bindings;

/// Any `{key}` without nested braces.
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]+)\}").unwrap());

/// Replace {key} with values from `bindings`; leave unknown {key} intact.
///
/// The text is scanned once, so a substituted value is never read back as a
/// placeholder.
pub fn render<B: Bindings + ?Sized>(text: &str, bindings: &B) -> String {
    if text.is_empty() {
        return String::new();
    }
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures| {
            bindings
                .binding(&caps[1])
                .map(str::to_owned)
                .unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

/// Like [`render`], but every literal occurrence of `preserved` is copied
/// through untouched.
pub fn render_preserving<B: Bindings + ?Sized>(
    text: &str,
    bindings: &B,
    preserved: &str,
) -> String {
    if preserved.is_empty() {
        return render(text, bindings);
    }
    text.split(preserved)
        .map(|part| render(part, bindings))
        .collect::<Vec<_>>()
        .join(preserved)
}
