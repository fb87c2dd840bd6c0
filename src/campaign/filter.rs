use std::collections::HashMap;

use crate::domain::RunContext;
use crate::repository::SubscriptionReader;

/// Decides who may receive a campaign.
///
/// Unknown addresses and failed lookups count as unsubscribed: the run
/// would rather miss a recipient than mail someone who opted out.
pub struct SubscriptionFilter<'a, R: ?Sized> {
    registry: &'a R,
    ctx: &'a RunContext,
}

impl<'a, R> SubscriptionFilter<'a, R>
where
    R: SubscriptionReader + ?Sized,
{
    pub fn new(registry: &'a R, ctx: &'a RunContext) -> Self {
        Self { registry, ctx }
    }

    /// Subscription flag for every queried address.
    pub fn status(&self, addresses: &[String]) -> HashMap<String, bool> {
        let known = match self.registry.get_status(addresses) {
            Ok(known) => known,
            Err(e) => {
                log::error!("{}: error checking subscription status: {}", self.ctx, e);
                return addresses
                    .iter()
                    .map(|address| (address.clone(), false))
                    .collect();
            }
        };

        addresses
            .iter()
            .map(|address| {
                let subscribed = known.get(address).copied().unwrap_or_else(|| {
                    log::warn!(
                        "{}: email not found in subscriber database: {}",
                        self.ctx,
                        address
                    );
                    false
                });
                (address.clone(), subscribed)
            })
            .collect()
    }

    /// Subscribed addresses, in input order.
    pub fn allowed(&self, addresses: &[String]) -> Vec<String> {
        let status = self.status(addresses);
        addresses
            .iter()
            .filter(|address| status.get(*address).copied().unwrap_or(false))
            .cloned()
            .collect()
    }
}
