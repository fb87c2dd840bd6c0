use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Default unsubscribe URL template.
pub const DEFAULT_UNSUBSCRIBE_URL: &str = "https://example.com/unsubscribe?email={email}";

/// Token inside the URL template replaced by the recipient address.
const ADDRESS_TOKEN: &str = "{email}";

/// Characters left as-is in the query value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// Unsubscribe link with an `{email}` slot for the recipient address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeLink {
    template: String,
}

impl Default for UnsubscribeLink {
    fn default() -> Self {
        Self::new(DEFAULT_UNSUBSCRIBE_URL)
    }
}

impl UnsubscribeLink {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The literal text searched for in message bodies.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The link for one recipient.
    pub fn url_for(&self, address: &str) -> String {
        let encoded = utf8_percent_encode(address, QUERY_VALUE).to_string();
        self.template.replace(ADDRESS_TOKEN, &encoded)
    }

    /// Rewrites the generic link in both bodies to point at `address`.
    ///
    /// Must run after placeholder rendering; absent bodies pass through.
    pub fn personalize(
        &self,
        html: Option<String>,
        text: Option<String>,
        address: &str,
    ) -> (Option<String>, Option<String>) {
        let url = self.url_for(address);
        let rewrite = |body: String| {
            if body.is_empty() {
                body
            } else {
                body.replace(&self.template, &url)
            }
        };
        (html.map(rewrite), text.map(rewrite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_address_in_both_bodies() {
        let link = UnsubscribeLink::default();
        let html = format!("<a href=\"{DEFAULT_UNSUBSCRIBE_URL}\">unsubscribe</a>");
        let text = format!("Unsubscribe: {DEFAULT_UNSUBSCRIBE_URL}");

        let (html, text) = link.personalize(Some(html), Some(text), "a@x.com");

        assert_eq!(
            html.as_deref(),
            Some("<a href=\"https://example.com/unsubscribe?email=a@x.com\">unsubscribe</a>")
        );
        assert_eq!(
            text.as_deref(),
            Some("Unsubscribe: https://example.com/unsubscribe?email=a@x.com")
        );
    }

    #[test]
    fn missing_bodies_pass_through() {
        let link = UnsubscribeLink::default();
        assert_eq!(link.personalize(None, None, "a@x.com"), (None, None));
        assert_eq!(
            link.personalize(Some(String::new()), None, "a@x.com"),
            (Some(String::new()), None)
        );
    }

    #[test]
    fn escapes_reserved_characters() {
        let link = UnsubscribeLink::default();
        assert_eq!(
            link.url_for("ann+news@x.com"),
            "https://example.com/unsubscribe?email=ann%2Bnews@x.com"
        );
    }

    #[test]
    fn custom_template() {
        let link = UnsubscribeLink::new("https://lists.example.org/out/{email}");
        assert_eq!(link.url_for("b@y.org"), "https://lists.example.org/out/b@y.org");
    }
}
