//! Cancellable fetch gateway
//!
//! Holds at most one pending request per channel. Dispatching on a channel
//! cancels whatever that channel still had in flight. Every dispatch
//! reports exactly one [`Completion`], and a cancelled dispatch always
//! reports [`FetchOutcome::Cancelled`] even if its response arrived.

use crate::controller::channel::{Channel, DispatchId};
use crate::error::{ClientError, ClientResult};
use crate::query::QuerySignature;
use crate::types::{Product, SearchResponse, Suggestion};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Data a channel fetch produces
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelPayload {
    Results(SearchResponse),
    Suggestions(Vec<Suggestion>),
    Preview(Vec<Product>),
}

#[derive(Debug)]
pub enum FetchOutcome {
    Resolved(ChannelPayload),
    /// Superseded or aborted. Never surfaced as an error.
    Cancelled,
    Failed(ClientError),
}

/// Result of one dispatch, delivered to the controller loop
#[derive(Debug)]
pub struct Completion {
    pub channel: Channel,
    pub id: DispatchId,
    pub signature: QuerySignature,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub channel: Channel,
    pub id: DispatchId,
    pub signature: QuerySignature,
    pub token: CancellationToken,
}

pub struct FetchGateway {
    pending: HashMap<Channel, PendingRequest>,
    next_id: DispatchId,
    completions: mpsc::UnboundedSender<Completion>,
}

impl FetchGateway {
    pub fn new(completions: mpsc::UnboundedSender<Completion>) -> Self {
        Self {
            pending: HashMap::new(),
            next_id: 1,
            completions,
        }
    }

    /// Start `fetch` on `channel`, cancelling the channel's previous
    /// request. Must be called inside a tokio runtime.
    pub fn dispatch<F>(&mut self, channel: Channel, signature: QuerySignature, fetch: F) -> DispatchId
    where
        F: Future<Output = ClientResult<ChannelPayload>> + Send + 'static,
    {
        self.cancel(channel);

        let id = self.next_id;
        self.next_id += 1;
        let token = CancellationToken::new();
        self.pending.insert(
            channel,
            PendingRequest {
                channel,
                id,
                signature: signature.clone(),
                token: token.clone(),
            },
        );

        let completions = self.completions.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => FetchOutcome::Cancelled,
                result = fetch => {
                    if token.is_cancelled() {
                        FetchOutcome::Cancelled
                    } else {
                        match result {
                            Ok(payload) => FetchOutcome::Resolved(payload),
                            Err(e) => FetchOutcome::Failed(e),
                        }
                    }
                }
            };
            let completion = Completion {
                channel,
                id,
                signature,
                outcome,
            };
            if completions.send(completion).is_err() {
                log::debug!("Controller gone, dropping {} completion {}", channel, id);
            }
        });

        log::debug!("Dispatched {} request {}", channel, id);
        id
    }

    /// Cancel the channel's pending request, if any. Returns its id.
    pub fn cancel(&mut self, channel: Channel) -> Option<DispatchId> {
        let pending = self.pending.remove(&channel)?;
        pending.token.cancel();
        log::debug!("Cancelled {} request {}", channel, pending.id);
        Some(pending.id)
    }

    pub fn cancel_all(&mut self) {
        for channel in Channel::ALL {
            self.cancel(channel);
        }
    }

    /// Release the pending slot for a finished dispatch. Returns false when
    /// `id` is no longer the channel's pending request.
    pub fn settle(&mut self, channel: Channel, id: DispatchId) -> bool {
        match self.pending.get(&channel) {
            Some(pending) if pending.id == id => {
                self.pending.remove(&channel);
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self, channel: Channel) -> Option<&PendingRequest> {
        self.pending.get(&channel)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for FetchGateway {
    fn drop(&mut self) {
        for pending in self.pending.values() {
            pending.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gateway() -> (FetchGateway, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FetchGateway::new(tx), rx)
    }

    async fn slow_suggestions(delay_ms: u64, name: &str) -> ClientResult<ChannelPayload> {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(ChannelPayload::Suggestions(vec![Suggestion {
            id: name.to_string(),
            name: name.to_string(),
        }]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_dispatch_cancels_previous() {
        let (mut gateway, mut rx) = gateway();
        let first = gateway.dispatch(
            Channel::Suggest,
            QuerySignature::for_term("ch"),
            slow_suggestions(500, "chair"),
        );
        let second = gateway.dispatch(
            Channel::Suggest,
            QuerySignature::for_term("cha"),
            slow_suggestions(100, "chart"),
        );
        assert_eq!(gateway.pending_count(), 1);

        let cancelled = rx.recv().await.unwrap();
        assert_eq!(cancelled.id, first);
        assert!(matches!(cancelled.outcome, FetchOutcome::Cancelled));

        let resolved = rx.recv().await.unwrap();
        assert_eq!(resolved.id, second);
        assert!(gateway.settle(Channel::Suggest, second));
        match resolved.outcome {
            FetchOutcome::Resolved(ChannelPayload::Suggestions(list)) => {
                assert_eq!(list[0].name, "chart")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(gateway.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channels_are_independent() {
        let (mut gateway, mut rx) = gateway();
        gateway.dispatch(Channel::Suggest, QuerySignature::for_term("ch"), slow_suggestions(50, "a"));
        gateway.dispatch(Channel::Instant, QuerySignature::for_term("ch"), slow_suggestions(50, "b"));
        assert_eq!(gateway.pending_count(), 2);

        for _ in 0..2 {
            let completion = rx.recv().await.unwrap();
            assert!(matches!(completion.outcome, FetchOutcome::Resolved(_)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_once() {
        let (mut gateway, mut rx) = gateway();
        let id = gateway.dispatch(Channel::Main, QuerySignature::for_term("x"), async {
            Err(ClientError::Status { status: 503 })
        });

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.id, id);
        assert!(matches!(
            completion.outcome,
            FetchOutcome::Failed(ClientError::Status { status: 503 })
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_settle_rejects_superseded_id() {
        let (mut gateway, _rx) = gateway();
        let first = gateway.dispatch(Channel::Main, QuerySignature::for_term("a"), slow_suggestions(10, "a"));
        gateway.cancel(Channel::Main);
        assert!(!gateway.settle(Channel::Main, first));
        assert!(gateway.pending(Channel::Main).is_none());
    }
}
