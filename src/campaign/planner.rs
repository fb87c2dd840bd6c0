//! Turns the recipient list into delivery units and renders each unit.
//!
//! Blind-copy units share one body between many recipients, so only the
//! campaign-wide fields of the group's representative are substituted and
//! personal placeholders fall back to neutral values. Individual units are
//! rendered with every field of their recipient plus a personal unsubscribe
//! link.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use crate::domain::{CampaignOptions, EMAIL_FIELD, Recipient, Template};

use super::message_builder::OutgoingEmail;
use super::template::{render, render_preserving};
use super::unsubscribe::UnsubscribeLink;

/// Fields that identify a single person and cannot be shared by a batch.
const IDENTITY_FIELDS: [&str; 3] = [EMAIL_FIELD, "first_name", "last_name"];

/// Values used for identity placeholders in blind-copy messages.
const NEUTRAL_FALLBACKS: [(&str, &str); 3] = [
    ("first_name", "Valued Customer"),
    ("last_name", ""),
    (EMAIL_FIELD, ""),
];

/// Who may receive the campaign.
#[derive(Debug, Clone)]
pub enum Eligibility {
    /// Subscription checks are disabled.
    Everyone,
    /// Result of a registry lookup; missing addresses are not eligible.
    Checked(HashMap<String, bool>),
}

impl Eligibility {
    pub fn allows(&self, address: &str) -> bool {
        match self {
            Eligibility::Everyone => true,
            Eligibility::Checked(status) => status.get(address).copied().unwrap_or(false),
        }
    }
}

/// One transport send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryUnit {
    /// One message to the sender with the group in blind copy.
    Batch {
        representative: Recipient,
        blind_copy: Vec<String>,
    },
    /// One message addressed to a single recipient.
    Individual { recipient: Recipient, address: String },
}

impl DeliveryUnit {
    /// Number of recipients this unit accounts for in the tally.
    pub fn weight(&self) -> usize {
        match self {
            DeliveryUnit::Batch { blind_copy, .. } => blind_copy.len(),
            DeliveryUnit::Individual { .. } => 1,
        }
    }
}

/// Planned units plus the number of recipients removed by eligibility.
#[derive(Debug, Default)]
pub struct Plan {
    pub units: Vec<DeliveryUnit>,
    pub skipped: usize,
}

/// Groups recipients according to the campaign mode.
pub struct BatchPlanner<'a> {
    options: &'a CampaignOptions,
}

impl<'a> BatchPlanner<'a> {
    pub fn new(options: &'a CampaignOptions) -> Self {
        Self { options }
    }

    pub fn plan(&self, recipients: &[Recipient], eligibility: &Eligibility) -> Plan {
        if self.options.use_blind_copy {
            plan_blind_copy(recipients, eligibility, self.options.batch_size)
        } else {
            plan_individual(recipients, eligibility)
        }
    }
}

/// Slices addressable recipients into windows of `batch_size` in source
/// order, then keeps the eligible members of each window.
///
/// A window without eligible members produces no unit. Recipients without
/// an address are ignored entirely.
pub fn plan_blind_copy(
    recipients: &[Recipient],
    eligibility: &Eligibility,
    batch_size: NonZeroUsize,
) -> Plan {
    let addressable: Vec<(&Recipient, &str)> = recipients
        .iter()
        .filter_map(|recipient| recipient.address().map(|address| (recipient, address)))
        .collect();

    let mut plan = Plan::default();
    for window in addressable.chunks(batch_size.get()) {
        let eligible: Vec<&(&Recipient, &str)> = window
            .iter()
            .filter(|(_, address)| eligibility.allows(address))
            .collect();
        plan.skipped += window.len() - eligible.len();

        let Some((representative, _)) = eligible.first() else {
            continue;
        };
        plan.units.push(DeliveryUnit::Batch {
            representative: (*representative).clone(),
            blind_copy: eligible
                .iter()
                .map(|(_, address)| (*address).to_owned())
                .collect(),
        });
    }
    plan
}

/// One unit per eligible recipient.
pub fn plan_individual(recipients: &[Recipient], eligibility: &Eligibility) -> Plan {
    let mut plan = Plan::default();
    for recipient in recipients {
        let Some(address) = recipient.address() else {
            continue;
        };
        if !eligibility.allows(address) {
            plan.skipped += 1;
            continue;
        }
        plan.units.push(DeliveryUnit::Individual {
            recipient: recipient.clone(),
            address: address.to_owned(),
        });
    }
    plan
}

/// Renders delivery units into outgoing messages.
pub struct Composer<'a> {
    template: &'a Template,
    link: &'a UnsubscribeLink,
    options: &'a CampaignOptions,
    sender: &'a str,
}

impl<'a> Composer<'a> {
    pub fn new(
        template: &'a Template,
        link: &'a UnsubscribeLink,
        options: &'a CampaignOptions,
        sender: &'a str,
    ) -> Self {
        Self {
            template,
            link,
            options,
            sender,
        }
    }

    fn subject_template(&self) -> &str {
        self.template
            .subject
            .as_deref()
            .unwrap_or(self.options.default_subject.as_str())
    }

    #[must_use]
    pub fn compose(&self, unit: &DeliveryUnit) -> OutgoingEmail {
        match unit {
            DeliveryUnit::Batch {
                representative,
                blind_copy,
            } => self.compose_batch(representative, blind_copy),
            DeliveryUnit::Individual { recipient, address } => {
                self.compose_individual(recipient, address)
            }
        }
    }

    fn compose_batch(&self, representative: &Recipient, blind_copy: &[String]) -> OutgoingEmail {
        let mut bindings: HashMap<String, String> = representative
            .fields()
            .iter()
            .filter(|(key, _)| !IDENTITY_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, value) in NEUTRAL_FALLBACKS {
            bindings.insert(key.to_owned(), value.to_owned());
        }

        OutgoingEmail {
            from: self.sender.to_owned(),
            to: self.sender.to_owned(),
            bcc: blind_copy.to_vec(),
            subject: render(self.subject_template(), &bindings),
            html: self.template.html.as_deref().map(|t| render(t, &bindings)),
            text: self.template.text.as_deref().map(|t| render(t, &bindings)),
            list_unsubscribe: None,
        }
    }

    fn compose_individual(&self, recipient: &Recipient, address: &str) -> OutgoingEmail {
        let preserved = self.link.template();
        let html = self
            .template
            .html
            .as_deref()
            .map(|t| render_preserving(t, recipient, preserved));
        let text = self
            .template
            .text
            .as_deref()
            .map(|t| render_preserving(t, recipient, preserved));
        let (html, text) = self.link.personalize(html, text, address);

        OutgoingEmail {
            from: self.sender.to_owned(),
            to: address.to_owned(),
            bcc: self.options.individual_bcc.clone(),
            subject: render(self.subject_template(), recipient),
            html,
            text,
            list_unsubscribe: Some(self.link.url_for(address)),
        }
    }
}
