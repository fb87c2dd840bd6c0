//! Bulk campaign dispatch.
//!
//! A run reads the recipient list, drops everyone who opted out, groups
//! the rest into delivery units, renders each unit and hands it to a
//! [`Transport`]. Failures never abort a run halfway: they end up in the
//! returned [`RunTally`] and in the log.

pub mod executor;
pub mod filter;
pub mod message_builder;
pub mod planner;
pub mod template;
pub mod unsubscribe;

use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use mail_send::{SmtpClient, SmtpClientBuilder};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use crate::domain::{CampaignOptions, Recipient, RunContext, RunTally, Template};
use crate::errors::Error;
use crate::recipients::{CsvRecipientSource, RecipientSource};
use crate::repository::{DieselRepository, SubscriptionReader, establish_connection_pool};
use crate::settings::{Settings, SmtpSettings};

use executor::{DispatchExecutor, Transport};
use filter::SubscriptionFilter;
use message_builder::{OutgoingEmail, build_message};
use planner::{BatchPlanner, Composer, Eligibility};
use unsubscribe::UnsubscribeLink;

/// SMTP transport that leverages [`mail_send`].
///
/// One authenticated session is kept open across sends.
pub struct SmtpTransport {
    settings: SmtpSettings,
    client: Option<SmtpClient<TlsStream<TcpStream>>>,
}

impl SmtpTransport {
    pub fn new(settings: SmtpSettings) -> Self {
        Self {
            settings,
            client: None,
        }
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn connect(&mut self) -> Result<(), Error> {
        let client = SmtpClientBuilder::new(self.settings.server.as_str(), self.settings.port)
            .implicit_tls(self.settings.implicit_tls)
            .credentials((
                self.settings.login.as_str(),
                self.settings.password.as_str(),
            ))
            .timeout(Duration::from_secs(self.settings.timeout_seconds))
            .connect()
            .await
            .map_err(|e| {
                Error::Connection(format!(
                    "{}:{}: {}",
                    self.settings.server, self.settings.port, e
                ))
            })?;
        self.client = Some(client);
        Ok(())
    }

    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), Error> {
        let client = self.client.as_mut().ok_or(Error::NotConnected)?;
        let message = build_message(email)?;
        client.send(message).await?;
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(client) = self.client.take()
            && let Err(e) = client.quit().await
        {
            log::warn!("Error closing SMTP session: {e}");
        }
    }
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub template: Template,
    pub options: CampaignOptions,
    pub unsubscribe: UnsubscribeLink,
    /// Visible sender, also the visible recipient of blind-copy messages.
    pub sender: String,
}

/// Runs one campaign and returns its tally.
///
/// Never fails: an unreachable transport or an unreadable recipient list
/// yields an all-zero tally, everything else is counted per recipient.
/// The transport is disconnected before returning.
pub async fn run_campaign<S, R, T>(
    source: &S,
    registry: &R,
    transport: &mut T,
    campaign: &Campaign,
    ctx: &RunContext,
) -> RunTally
where
    S: RecipientSource + ?Sized,
    R: SubscriptionReader + ?Sized,
    T: Transport + ?Sized,
{
    let delay = Duration::from_secs(campaign.options.delay_seconds);
    let mut executor = DispatchExecutor::new(transport, ctx, delay);

    if executor.open().await.is_err() {
        return RunTally::default();
    }

    let recipients = match source.read() {
        Ok(recipients) => recipients,
        Err(e) => {
            log::error!("{ctx}: batch processing error: {e}");
            executor.close().await;
            return RunTally::default();
        }
    };
    log::info!("{ctx}: loaded {} recipients", recipients.len());

    let eligibility = eligibility(&recipients, registry, campaign, ctx);
    let plan = BatchPlanner::new(&campaign.options).plan(&recipients, &eligibility);
    log::info!(
        "{ctx}: {} delivery units planned, {} recipients skipped",
        plan.units.len(),
        plan.skipped
    );
    executor.record_skipped(plan.skipped);

    let composer = Composer::new(
        &campaign.template,
        &campaign.unsubscribe,
        &campaign.options,
        campaign.sender.as_str(),
    );
    let messages: Vec<(OutgoingEmail, usize)> = plan
        .units
        .iter()
        .map(|unit| (composer.compose(unit), unit.weight()))
        .collect();

    let tally = executor.run(messages).await;
    log::info!("{ctx}: finished with {tally}");
    tally
}

fn eligibility<R>(
    recipients: &[Recipient],
    registry: &R,
    campaign: &Campaign,
    ctx: &RunContext,
) -> Eligibility
where
    R: SubscriptionReader + ?Sized,
{
    if !campaign.options.check_subscription {
        return Eligibility::Everyone;
    }

    let addresses: Vec<String> = recipients
        .iter()
        .filter_map(Recipient::address)
        .map(str::to_owned)
        .collect();
    Eligibility::Checked(SubscriptionFilter::new(registry, ctx).status(&addresses))
}

fn read_optional(path: Option<&Path>) -> Result<Option<String>, Error> {
    path.map(fs::read_to_string).transpose().map_err(Error::from)
}

/// Builds the campaign described by `settings`.
pub fn load_campaign(settings: &Settings) -> Result<Campaign, Error> {
    let campaign = &settings.campaign;
    let template = Template {
        html: read_optional(campaign.html_template.as_deref())?,
        text: read_optional(campaign.text_template.as_deref())?,
        subject: campaign.subject.clone(),
    };
    if template.html.is_none() && template.text.is_none() {
        return Err(Error::Config(
            "either html_template or text_template must be set".to_owned(),
        ));
    }

    Ok(Campaign {
        template,
        options: campaign.delivery.clone(),
        unsubscribe: UnsubscribeLink::new(campaign.unsubscribe_url.as_str()),
        sender: settings.smtp.sender_address().to_owned(),
    })
}

/// Entry point for the campaign sender.
pub async fn run(settings: &Settings, name: &str) -> Result<RunTally, Error> {
    let campaign = load_campaign(settings)?;
    let repo = DieselRepository::new(establish_connection_pool(&settings.database_url)?);
    let source = CsvRecipientSource::new(&settings.campaign.recipients);
    let mut transport = SmtpTransport::new(settings.smtp.clone());
    let ctx = RunContext::new(name);

    log::info!(
        "{ctx}: sending {} to {} via {}",
        if campaign.options.use_blind_copy {
            "blind-copy batches"
        } else {
            "individual emails"
        },
        settings.campaign.recipients.display(),
        settings.smtp.server
    );

    Ok(run_campaign(&source, &repo, &mut transport, &campaign, &ctx).await)
}
