mod common;

use std::collections::HashSet;
use std::num::NonZeroUsize;

use common::{BrokenSource, MemoryRegistry, RecordingTransport, recipient};
use pushkind_campaign::campaign::unsubscribe::{DEFAULT_UNSUBSCRIBE_URL, UnsubscribeLink};
use pushkind_campaign::campaign::{Campaign, run_campaign};
use pushkind_campaign::domain::{CampaignOptions, Recipient, RunContext, RunTally, Template};

const SENDER: &str = "news@shop.com";

fn campaign(use_blind_copy: bool) -> Campaign {
    Campaign {
        template: Template {
            html: Some(format!(
                "<h2>Hello {{first_name}}!</h2><p>Campaign ID: {{campaign_id}}</p>\
                 <a href=\"{DEFAULT_UNSUBSCRIBE_URL}\">click here</a>"
            )),
            text: Some(format!(
                "Hello {{first_name}}!\nCampaign ID: {{campaign_id}}\n\
                 To unsubscribe, visit: {DEFAULT_UNSUBSCRIBE_URL}"
            )),
            subject: Some("Special Offer Inside! {campaign_id}".to_owned()),
        },
        options: CampaignOptions {
            delay_seconds: 0,
            use_blind_copy,
            ..CampaignOptions::default()
        },
        unsubscribe: UnsubscribeLink::default(),
        sender: SENDER.to_owned(),
    }
}

fn subscribed_list(count: usize) -> (Vec<Recipient>, MemoryRegistry) {
    let list: Vec<Recipient> = (0..count)
        .map(|i| recipient(&format!("user{i}@x.com"), &format!("User{i}")))
        .collect();
    let registry = MemoryRegistry(Some(
        list.iter()
            .filter_map(Recipient::address)
            .map(|a| (a.to_owned(), true))
            .collect(),
    ));
    (list, registry)
}

#[tokio::test]
async fn blind_copy_batches_cover_every_recipient() {
    let (list, registry) = subscribed_list(120);
    let mut transport = RecordingTransport::default();
    let ctx = RunContext::new("spring");

    let tally = run_campaign(&list, &registry, &mut transport, &campaign(true), &ctx).await;

    assert_eq!(
        tally,
        RunTally {
            success: 120,
            failed: 0,
            skipped: 0
        }
    );
    let sizes: Vec<usize> = transport.sent.iter().map(|e| e.bcc.len()).collect();
    assert_eq!(sizes, vec![50, 50, 20]);
    for email in &transport.sent {
        assert_eq!(email.to, SENDER);
        assert_eq!(email.subject, "Special Offer Inside! SPRING25");
        let html = email.html.as_deref().unwrap();
        assert!(html.contains("Hello Valued Customer!"));
        assert!(html.contains("unsubscribe?email=\""));
    }
    assert_eq!(transport.sent[2].bcc[0], "user100@x.com");
    assert_eq!(transport.connects, 1);
    assert_eq!(transport.disconnects, 1);
    assert!(!transport.connected);
}

#[tokio::test]
async fn failed_batch_is_counted_as_a_whole() {
    let (list, registry) = subscribed_list(120);
    let mut transport = RecordingTransport {
        failing_sends: HashSet::from([1]),
        ..RecordingTransport::default()
    };
    let ctx = RunContext::new("spring");

    let tally = run_campaign(&list, &registry, &mut transport, &campaign(true), &ctx).await;

    assert_eq!(tally.success, 70);
    assert_eq!(tally.failed, 50);
    assert_eq!(tally.total(), 120);
    // one reconnect after the failed batch
    assert_eq!(transport.connects, 2);
    assert!(!transport.connected);
}

#[tokio::test]
async fn opted_out_and_unknown_addresses_are_skipped() {
    let registry = MemoryRegistry::with(&[("a@x.com", true), ("b@x.com", false)]);
    let list = vec![
        recipient("a@x.com", "Ann"),
        recipient("b@x.com", "Bob"),
        recipient("c@x.com", "Cid"),
        recipient("   ", "Nobody"),
    ];
    let mut transport = RecordingTransport::default();
    let ctx = RunContext::new("spring");

    for use_blind_copy in [false, true] {
        transport.sent.clear();
        let tally = run_campaign(
            &list,
            &registry,
            &mut transport,
            &campaign(use_blind_copy),
            &ctx,
        )
        .await;

        assert_eq!(
            tally,
            RunTally {
                success: 1,
                failed: 0,
                skipped: 2
            }
        );
        let delivered: Vec<&str> = transport
            .sent
            .iter()
            .flat_map(|e| e.envelope_recipients())
            .filter(|a| *a != SENDER)
            .collect();
        assert_eq!(delivered, vec!["a@x.com"]);
    }
}

#[tokio::test]
async fn individual_emails_are_personalized() {
    let registry = MemoryRegistry::with(&[("a@x.com", true)]);
    let list = vec![recipient("a@x.com", "Ann")];
    let mut transport = RecordingTransport::default();
    let ctx = RunContext::new("spring");

    let tally = run_campaign(&list, &registry, &mut transport, &campaign(false), &ctx).await;

    assert_eq!(tally.success, 1);
    let email = &transport.sent[0];
    assert_eq!(email.to, "a@x.com");
    assert!(email.bcc.is_empty());
    for body in [email.html.as_deref().unwrap(), email.text.as_deref().unwrap()] {
        assert!(body.contains("Hello Ann!"));
        assert!(body.contains("https://example.com/unsubscribe?email=a@x.com"));
        assert!(!body.contains("{email}"));
    }
    assert_eq!(
        email.list_unsubscribe.as_deref(),
        Some("https://example.com/unsubscribe?email=a@x.com")
    );
}

#[tokio::test]
async fn unreachable_registry_sends_nothing() {
    let (list, _) = subscribed_list(10);
    let registry = MemoryRegistry::unreachable();
    let mut transport = RecordingTransport::default();
    let ctx = RunContext::new("spring");

    let tally = run_campaign(&list, &registry, &mut transport, &campaign(true), &ctx).await;

    assert_eq!(
        tally,
        RunTally {
            success: 0,
            failed: 0,
            skipped: 10
        }
    );
    assert!(transport.sent.is_empty());
}

#[tokio::test]
async fn disabled_subscription_check_sends_to_everyone() {
    let (list, _) = subscribed_list(5);
    let registry = MemoryRegistry::unreachable();
    let mut transport = RecordingTransport::default();
    let ctx = RunContext::new("spring");
    let mut campaign = campaign(true);
    campaign.options.check_subscription = false;
    campaign.options.batch_size = NonZeroUsize::new(2).unwrap();

    let tally = run_campaign(&list, &registry, &mut transport, &campaign, &ctx).await;

    assert_eq!(tally.success, 5);
    assert_eq!(transport.sent.len(), 3);
}

#[tokio::test]
async fn connection_failure_returns_zero_tally() {
    let (list, registry) = subscribed_list(3);
    let mut transport = RecordingTransport {
        refuse_connect: true,
        ..RecordingTransport::default()
    };
    let ctx = RunContext::new("spring");

    let tally = run_campaign(&list, &registry, &mut transport, &campaign(false), &ctx).await;

    assert_eq!(tally, RunTally::default());
    assert_eq!(transport.attempts, 0);
    assert_eq!(transport.connects, 1);
}

#[tokio::test]
async fn read_failure_closes_the_connection() {
    let (list, registry) = subscribed_list(2);
    let mut transport = RecordingTransport::default();
    let ctx = RunContext::new("spring");

    let tally = run_campaign(
        &BrokenSource,
        &registry,
        &mut transport,
        &campaign(false),
        &ctx,
    )
    .await;

    assert_eq!(tally, RunTally::default());
    assert!(!transport.connected);
    assert_eq!(transport.disconnects, 1);

    let tally = run_campaign(&list, &registry, &mut transport, &campaign(false), &ctx).await;
    assert_eq!(tally.success, 2);
    assert_eq!(transport.connects, 2);
    assert!(!transport.connected);
}
