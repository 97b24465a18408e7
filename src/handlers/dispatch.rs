//! Dispatch engine
//!
//! Fans a freshly created order out to every provider with the requested
//! specialization and routes a provider's response back to the customer.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::templates;
use crate::channel::Notifier;
use crate::error::{DispatchError, DispatchResult};
use crate::events::{OrderPlaced, ResponseRecorded};
use crate::repository::DomainStore;
use crate::settings::DispatchSettings;
use crate::value_objects::{ChatId, NewOrder, Order, OrderId};

pub struct DispatchEngine<S, N>
where
    S: DomainStore,
    N: Notifier,
{
    store: Arc<S>,
    notifier: Arc<N>,
    settings: DispatchSettings,
}

impl<S, N> DispatchEngine<S, N>
where
    S: DomainStore,
    N: Notifier,
{
    /// Create a new dispatch engine
    pub fn new(store: Arc<S>, notifier: Arc<N>, settings: DispatchSettings) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    /// Persist the order, then notify matching providers.
    ///
    /// Only the persistence step can fail; delivery problems are logged and
    /// counted in the returned event.
    pub async fn create_order(&self, draft: NewOrder) -> DispatchResult<OrderPlaced> {
        let order = self.store.create_order(draft).await?;
        info!(order_id = %order.id, specialization = ?order.specialization, "order stored");

        let (providers_notified, delivery_failures) = self.notify_providers(&order).await;
        Ok(OrderPlaced {
            order,
            providers_notified,
            delivery_failures,
        })
    }

    /// Send the new-order notice to every matching provider; returns (delivered, failed)
    async fn notify_providers(&self, order: &Order) -> (usize, usize) {
        let providers = match self
            .store
            .get_providers_by_specialization(order.specialization)
            .await
        {
            Ok(providers) => providers,
            Err(e) => {
                error!(order_id = %order.id, error = %e, "failed to load providers");
                return (0, 0);
            }
        };

        let mut delivered = 0;
        let mut failed = 0;
        for provider in &providers {
            let notice =
                templates::provider_notification(order, provider, &self.settings.timestamp_format);
            match self.notifier.send(notice).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    warn!(
                        order_id = %order.id,
                        provider = %provider.chat_id,
                        error = %e,
                        "failed to notify provider"
                    );
                }
            }
        }

        info!(order_id = %order.id, delivered, failed, "providers notified");
        (delivered, failed)
    }

    /// Record a provider's interest and send their profile to the customer.
    ///
    /// Lookup, persistence and acknowledgement failures are returned. Once the
    /// provider has been acknowledged, a missing order or an undeliverable
    /// customer notice is only logged.
    pub async fn handle_response(
        &self,
        provider_chat_id: &ChatId,
        order_id: OrderId,
    ) -> DispatchResult<ResponseRecorded> {
        let provider = self
            .store
            .get_user_by_chat_id(provider_chat_id)
            .await?
            .ok_or_else(|| DispatchError::NotRegistered(provider_chat_id.clone()))?;

        let response = self.store.create_response(order_id, provider.id).await?;
        info!(%order_id, provider = %provider_chat_id, "response stored");

        self.notifier
            .send(templates::response_acknowledged(provider_chat_id.clone()))
            .await?;

        let order = match self.store.get_order(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(error = %DispatchError::order_not_found(order_id), "customer not notified");
                return Ok(ResponseRecorded {
                    provider_chat_id: provider_chat_id.clone(),
                    response,
                    customer_notified: false,
                });
            }
            Err(e) => {
                error!(%order_id, error = %e, "failed to load order for response");
                return Ok(ResponseRecorded {
                    provider_chat_id: provider_chat_id.clone(),
                    response,
                    customer_notified: false,
                });
            }
        };

        let customer_notified = match self
            .notifier
            .send(templates::profile_exchange(&order, &provider))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(
                    %order_id,
                    customer = %order.customer.chat_id,
                    error = %e,
                    "failed to notify customer"
                );
                false
            }
        };

        Ok(ResponseRecorded {
            provider_chat_id: provider_chat_id.clone(),
            response,
            customer_notified,
        })
    }
}
