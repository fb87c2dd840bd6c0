use mail_send::mail_builder::{
    MessageBuilder,
    headers::{HeaderType, url::URL},
};
use mail_send::smtp::message::Message;

use crate::errors::Error;

/// A fully rendered message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    /// Visible recipient.
    pub to: String,
    /// Envelope-only recipients, never written to the headers.
    pub bcc: Vec<String>,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
    pub list_unsubscribe: Option<String>,
}

impl OutgoingEmail {
    /// Every address the transport delivers to.
    pub fn envelope_recipients(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.to.as_str()).chain(self.bcc.iter().map(String::as_str))
    }
}

/// Builds the SMTP envelope and MIME body for `email`.
///
/// Blind-copy recipients only appear in the envelope so that they cannot
/// see one another.
pub fn build_message(email: &OutgoingEmail) -> Result<Message<'static>, Error> {
    let mut message = MessageBuilder::new()
        .from(email.from.as_str())
        .to(email.to.as_str())
        .subject(email.subject.as_str());

    if let Some(html) = email.html.as_deref() {
        message = message.html_body(html);
    }
    match email.text.as_deref() {
        Some(text) => message = message.text_body(text),
        None if email.html.is_none() => message = message.text_body(""),
        None => {}
    }
    if let Some(url) = email.list_unsubscribe.as_ref() {
        message = message.header(
            "List-Unsubscribe",
            HeaderType::from(URL::new(url.clone())),
        );
    }

    let body = message.write_to_vec()?;
    let recipients: Vec<String> = email.envelope_recipients().map(str::to_owned).collect();

    Ok(Message::new(email.from.clone(), recipients, body))
}
