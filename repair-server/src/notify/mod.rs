//! Client notifications
//!
//! Listens to the orchestrator's event broadcast after commit and tells the
//! client when an order is ready, delivered or cancelled. Delivery is
//! fire-and-forget: a failed notification is logged and never touches the
//! order.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use shared::order::{EventPayload, OrderEvent, OrderState};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::orders::OrderOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    ReadyForDelivery,
    Delivered,
    Cancelled,
}

impl NotificationKind {
    /// Which state changes the client hears about
    pub fn for_state(state: OrderState) -> Option<Self> {
        match state {
            OrderState::ReadyForDelivery => Some(Self::ReadyForDelivery),
            OrderState::PaidAndDelivered => Some(Self::Delivered),
            OrderState::Cancelled => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Message handed to a [`Notifier`]
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub order_id: String,
    pub folio: String,
    pub client_id: String,
    pub branch: String,
    /// Outstanding balance at the time of the change
    pub balance: f64,
    pub timestamp: i64,
}

/// Outbound channel to clients (SMS, e-mail, push...)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        tracing::info!(
            kind = ?notification.kind,
            folio = %notification.folio,
            client_id = %notification.client_id,
            balance = notification.balance,
            "Client notification"
        );
        Ok(())
    }
}

/// Background task turning committed events into notifications
pub struct NotificationWorker {
    orchestrator: OrderOrchestrator,
    event_rx: broadcast::Receiver<OrderEvent>,
    notifier: Arc<dyn Notifier>,
    shutdown: CancellationToken,
}

impl NotificationWorker {
    pub fn new(
        orchestrator: OrderOrchestrator,
        notifier: Arc<dyn Notifier>,
        shutdown: CancellationToken,
    ) -> Self {
        // 构造时订阅，启动前提交的事件也不会丢
        let event_rx = orchestrator.subscribe();
        Self {
            orchestrator,
            event_rx,
            notifier,
            shutdown,
        }
    }

    /// 主循环：订阅事件广播直到关闭
    pub async fn run(mut self) {
        tracing::info!("NotificationWorker started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                received = self.event_rx.recv() => match received {
                    Ok(event) => self.handle_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "NotificationWorker lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event channel closed");
                        break;
                    }
                },
            }
        }

        tracing::info!("NotificationWorker stopped");
    }

    fn handle_event(&self, event: &OrderEvent) {
        let Some(notification) = self.build_notification(event) else {
            return;
        };

        // 不等待结果，失败只记录
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&notification).await {
                tracing::warn!(
                    folio = %notification.folio,
                    kind = ?notification.kind,
                    error = %e,
                    "Notification dispatch failed"
                );
            }
        });
    }

    /// Map a committed event to a notification, if the client cares about it
    pub fn build_notification(&self, event: &OrderEvent) -> Option<Notification> {
        let EventPayload::StateChanged { to, .. } = &event.payload else {
            return None;
        };
        let kind = NotificationKind::for_state(*to)?;

        let order = match self.orchestrator.get_order(&event.order_id) {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!(order_id = %event.order_id, "Notified order has no snapshot");
                return None;
            }
            Err(e) => {
                tracing::error!(order_id = %event.order_id, error = %e, "Failed to load order for notification");
                return None;
            }
        };

        Some(Notification {
            kind,
            order_id: order.order_id.clone(),
            folio: order.folio.clone(),
            client_id: order.client_id.clone(),
            branch: order.branch.clone(),
            balance: order.balance,
            timestamp: event.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{NewOrder, OrderStorage};
    use shared::order::{Actor, Role, ServiceKind, TransitionPayload};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct ChannelNotifier(mpsc::UnboundedSender<Notification>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
            self.0.send(notification.clone())?;
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _notification: &Notification) -> anyhow::Result<()> {
            anyhow::bail!("gateway down")
        }
    }

    fn orchestrator() -> OrderOrchestrator {
        OrderOrchestrator::with_storage(OrderStorage::open_in_memory().unwrap()).unwrap()
    }

    fn open_order(orchestrator: &OrderOrchestrator) -> String {
        let reception = Actor::new("r-1", "Ana", Role::Reception);
        let outcome = orchestrator
            .create_order(
                &reception,
                NewOrder {
                    branch: "centro".to_string(),
                    service_kind: ServiceKind::Diagnosis,
                    reported_problem: "won't boot".to_string(),
                    client_id: "client-1".to_string(),
                    equipment_id: "eq-1".to_string(),
                    technician_id: None,
                    items: vec![],
                },
            )
            .unwrap();
        outcome.order.order_id
    }

    #[test]
    fn test_for_state() {
        assert_eq!(
            NotificationKind::for_state(OrderState::PaidAndDelivered),
            Some(NotificationKind::Delivered)
        );
        assert_eq!(NotificationKind::for_state(OrderState::InRepair), None);
    }

    #[tokio::test]
    async fn test_cancel_notifies_client() {
        let orchestrator = orchestrator();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let worker = NotificationWorker::new(
            orchestrator.clone(),
            Arc::new(ChannelNotifier(tx)),
            shutdown.clone(),
        );
        let handle = tokio::spawn(worker.run());

        let order_id = open_order(&orchestrator);
        let admin = Actor::new("a-1", "Root", Role::Admin);
        orchestrator
            .apply_transition(
                &order_id,
                &admin,
                OrderState::Cancelled,
                TransitionPayload::default(),
                None,
            )
            .unwrap();

        let notification = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notification.kind, NotificationKind::Cancelled);
        assert_eq!(notification.folio, "CENTRO-000001");
        assert_eq!(notification.client_id, "client-1");

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_non_notifying_events_are_skipped() {
        let orchestrator = orchestrator();
        let worker = NotificationWorker::new(
            orchestrator.clone(),
            Arc::new(LogNotifier),
            CancellationToken::new(),
        );
        let mut rx = orchestrator.subscribe();
        open_order(&orchestrator);
        let created = rx.recv().await.unwrap();
        assert!(worker.build_notification(&created).is_none());
    }

    #[tokio::test]
    async fn test_failed_dispatch_does_not_stop_worker() {
        let orchestrator = orchestrator();
        let shutdown = CancellationToken::new();
        let worker =
            NotificationWorker::new(orchestrator.clone(), Arc::new(FailingNotifier), shutdown.clone());
        let handle = tokio::spawn(worker.run());

        let order_id = open_order(&orchestrator);
        let admin = Actor::new("a-1", "Root", Role::Admin);
        orchestrator
            .apply_transition(&order_id, &admin, OrderState::Cancelled, TransitionPayload::default(), None)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The order change stands regardless of the failed dispatch
        let order = orchestrator.get_order(&order_id).unwrap().unwrap();
        assert_eq!(order.state, OrderState::Cancelled);
        assert!(!handle.is_finished());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
