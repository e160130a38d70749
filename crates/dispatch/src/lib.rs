mod audit;
pub mod events;

use std::sync::Arc;

use config::SmsSettings;
use gateway::{GatewayError, SmsGateway, SmsMessage};
use ordersms_core::order::{format_order_summary, OrderNote, OrderStore, ORDER_PLACED_NOTE};
use thiserror::Error;
use uuid::Uuid;

pub use audit::{AuditEvent, AuditLog};

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub message_text: String,
    pub order_id: Option<u64>,
}

impl DispatchRequest {
    /// Admin "send test message" action: free text, no order attached.
    pub fn test(message_text: impl Into<String>) -> Self {
        Self {
            message_text: message_text.into(),
            order_id: None,
        }
    }

    /// Host "order placed" event: the text is generated from the order.
    pub fn order_placed(order_id: u64) -> Self {
        Self {
            message_text: String::new(),
            order_id: Some(order_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub success: bool,
    pub diagnostic: Option<String>,
}

impl DispatchResult {
    fn sent() -> Self {
        Self {
            success: true,
            diagnostic: None,
        }
    }

    fn skipped() -> Self {
        Self {
            success: false,
            diagnostic: None,
        }
    }

    fn rejected(diagnostic: String) -> Self {
        Self {
            success: false,
            diagnostic: Some(diagnostic),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Network or protocol fault talking to the gateway. Distinct from a
    /// gateway rejection, which becomes a failed result instead.
    #[error("sms gateway transport failure")]
    Transport(#[source] GatewayError),

    #[error("order store failure")]
    OrderStore(#[source] anyhow::Error),
}

/// Formats an order-placed message, submits it through the SMS gateway and
/// records the outcome. Holds no mutable state between calls; concurrent
/// dispatches for the same order are not deduplicated.
pub struct NotificationDispatcher {
    gateway: Arc<dyn SmsGateway>,
    orders: Arc<dyn OrderStore>,
    audit: AuditLog,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn SmsGateway>, orders: Arc<dyn OrderStore>, audit: AuditLog) -> Self {
        Self {
            gateway,
            orders,
            audit,
        }
    }

    fn record_audit(&self, event: AuditEvent) {
        if let Err(err) = self.audit.record(&event) {
            tracing::warn!(error = %err, event_type = %event.event_type, "failed to write audit event");
        }
    }

    /// One complete dispatch: resolve the order, authenticate and send,
    /// then note the outcome on the order.
    ///
    /// Gateway rejections come back as a failed `DispatchResult` plus an
    /// error log line; only transport-class faults are returned as errors.
    /// A disabled configuration is a normal state, not an error.
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
        settings: &SmsSettings,
    ) -> Result<DispatchResult, DispatchError> {
        if !settings.enabled {
            tracing::debug!("sms notifications disabled, skipping dispatch");
            return Ok(DispatchResult::skipped());
        }

        let dispatch_id = Uuid::new_v4().to_string();

        let order = match request.order_id {
            Some(id) => self
                .orders
                .order_by_id(id)
                .await
                .map_err(DispatchError::OrderStore)?,
            None => None,
        };
        let text = match &order {
            Some(order) => format_order_summary(order),
            None => request.message_text.clone(),
        };

        let message = SmsMessage {
            text,
            recipient: settings.phone_number.clone(),
        };

        let message_id = match self.gateway.submit(&message).await {
            Ok(id) => id,
            Err(err) if err.is_transport() => {
                self.record_audit(
                    AuditEvent::new("dispatch_failed", &dispatch_id)
                        .with_order(request.order_id)
                        .with_diagnostic(err.to_string()),
                );
                return Err(DispatchError::Transport(err));
            }
            Err(err) => {
                let diagnostic = err.diagnostic();
                tracing::error!("Clickatell SMS error: {diagnostic}");
                self.record_audit(
                    AuditEvent::new("dispatch_rejected", &dispatch_id)
                        .with_order(request.order_id)
                        .with_diagnostic(diagnostic.clone()),
                );
                return Ok(DispatchResult::rejected(diagnostic));
            }
        };

        if let Some(mut order) = order {
            order.notes.push(OrderNote::internal(ORDER_PLACED_NOTE));
            self.orders
                .update_order(&order)
                .await
                .map_err(DispatchError::OrderStore)?;
        }

        self.record_audit(
            AuditEvent::new("sms_sent", &dispatch_id)
                .with_order(request.order_id)
                .with_message_id(message_id),
        );
        Ok(DispatchResult::sent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gateway::mock::MockGateway;
    use ordersms_core::memory::InMemoryOrderStore;
    use ordersms_core::order::Order;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    enum FailureMode {
        AuthRejected,
        SendRejected,
        Transport,
    }

    struct FailingGateway {
        mode: FailureMode,
        calls: AtomicUsize,
    }

    impl FailingGateway {
        fn new(mode: FailureMode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SmsGateway for FailingGateway {
        async fn submit(&self, _message: &SmsMessage) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                FailureMode::AuthRejected => Err(GatewayError::AuthRejected {
                    response: "ERR: 001, Authentication failed".into(),
                }),
                FailureMode::SendRejected => Err(GatewayError::SendRejected {
                    response: "ERR: 105, Invalid destination address".into(),
                }),
                FailureMode::Transport => {
                    Err(GatewayError::Protocol("connection reset by peer".into()))
                }
            }
        }
    }

    fn settings(enabled: bool) -> SmsSettings {
        SmsSettings {
            enabled,
            api_id: "12345".into(),
            username: "owner".into(),
            password: "pw".into(),
            phone_number: "15551234567".into(),
        }
    }

    fn audit_log(dir: &TempDir) -> AuditLog {
        AuditLog::new(dir.path().join("audit.jsonl"))
    }

    #[tokio::test]
    async fn disabled_settings_skip_the_gateway_entirely() {
        let dir = TempDir::new().unwrap();
        let mock = MockGateway::new();
        let dispatcher = NotificationDispatcher::new(
            mock.clone(),
            InMemoryOrderStore::new(),
            audit_log(&dir),
        );

        let result = dispatcher
            .dispatch(DispatchRequest::test("hello"), &settings(false))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.diagnostic.is_none());
        assert!(mock.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn success_with_order_appends_exactly_one_hidden_note() {
        let dir = TempDir::new().unwrap();
        let orders = InMemoryOrderStore::new();
        orders
            .insert(Order {
                id: 42,
                total: 19.5,
                notes: Vec::new(),
            })
            .await;
        let dispatcher =
            NotificationDispatcher::new(MockGateway::new(), orders.clone(), audit_log(&dir));

        let result = dispatcher
            .dispatch(DispatchRequest::order_placed(42), &settings(true))
            .await
            .unwrap();

        assert!(result.success);
        let order = orders.order_by_id(42).await.unwrap().unwrap();
        assert_eq!(order.notes.len(), 1);
        assert_eq!(order.notes[0].text, ORDER_PLACED_NOTE);
        assert!(!order.notes[0].display_to_customer);
    }

    #[tokio::test]
    async fn order_summary_replaces_the_request_text() {
        let dir = TempDir::new().unwrap();
        let mock = MockGateway::new();
        let orders = InMemoryOrderStore::new();
        orders
            .insert(Order {
                id: 42,
                total: 19.5,
                notes: Vec::new(),
            })
            .await;
        let dispatcher = NotificationDispatcher::new(mock.clone(), orders, audit_log(&dir));

        dispatcher
            .dispatch(
                DispatchRequest {
                    message_text: "ignored".into(),
                    order_id: Some(42),
                },
                &settings(true),
            )
            .await
            .unwrap();

        let submitted = mock.submitted().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(
            submitted[0].text,
            "New order #42 was placed for the total amount 19.50"
        );
        assert_eq!(submitted[0].recipient, "15551234567");
    }

    #[tokio::test]
    async fn unresolvable_order_keeps_the_request_text() {
        let dir = TempDir::new().unwrap();
        let mock = MockGateway::new();
        let dispatcher =
            NotificationDispatcher::new(mock.clone(), InMemoryOrderStore::new(), audit_log(&dir));

        let result = dispatcher
            .dispatch(
                DispatchRequest {
                    message_text: "test message".into(),
                    order_id: Some(999),
                },
                &settings(true),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(mock.submitted().await[0].text, "test message");
    }

    #[tokio::test]
    async fn success_without_order_appends_no_note() {
        let dir = TempDir::new().unwrap();
        let orders = InMemoryOrderStore::new();
        orders
            .insert(Order {
                id: 1,
                total: 5.0,
                notes: Vec::new(),
            })
            .await;
        let dispatcher =
            NotificationDispatcher::new(MockGateway::new(), orders.clone(), audit_log(&dir));

        let result = dispatcher
            .dispatch(DispatchRequest::test("ping"), &settings(true))
            .await
            .unwrap();

        assert!(result.success);
        let order = orders.order_by_id(1).await.unwrap().unwrap();
        assert!(order.notes.is_empty());
    }

    #[tokio::test]
    async fn auth_rejection_is_a_failed_result_without_a_note() {
        let dir = TempDir::new().unwrap();
        let orders = InMemoryOrderStore::new();
        orders
            .insert(Order {
                id: 42,
                total: 19.5,
                notes: Vec::new(),
            })
            .await;
        let gw = FailingGateway::new(FailureMode::AuthRejected);
        let dispatcher = NotificationDispatcher::new(gw.clone(), orders.clone(), audit_log(&dir));

        let result = dispatcher
            .dispatch(DispatchRequest::order_placed(42), &settings(true))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(
            result.diagnostic.as_deref(),
            Some("ERR: 001, Authentication failed")
        );
        assert_eq!(gw.calls.load(Ordering::SeqCst), 1);
        let order = orders.order_by_id(42).await.unwrap().unwrap();
        assert!(order.notes.is_empty());
    }

    #[tokio::test]
    async fn send_rejection_is_a_failed_result() {
        let dir = TempDir::new().unwrap();
        let gw = FailingGateway::new(FailureMode::SendRejected);
        let dispatcher =
            NotificationDispatcher::new(gw, InMemoryOrderStore::new(), audit_log(&dir));

        let result = dispatcher
            .dispatch(DispatchRequest::test("hello"), &settings(true))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(
            result.diagnostic.as_deref(),
            Some("ERR: 105, Invalid destination address")
        );
    }

    #[tokio::test]
    async fn transport_faults_surface_as_typed_errors() {
        let dir = TempDir::new().unwrap();
        let gw = FailingGateway::new(FailureMode::Transport);
        let dispatcher =
            NotificationDispatcher::new(gw, InMemoryOrderStore::new(), audit_log(&dir));

        let err = dispatcher
            .dispatch(DispatchRequest::test("hello"), &settings(true))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Transport(_)));
    }

    #[tokio::test]
    async fn unwritable_audit_path_never_fails_the_dispatch() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::new(dir.path().join("missing").join("audit.jsonl"));
        let dispatcher =
            NotificationDispatcher::new(MockGateway::new(), InMemoryOrderStore::new(), audit);

        let result = dispatcher
            .dispatch(DispatchRequest::test("ping"), &settings(true))
            .await
            .unwrap();

        assert!(result.success);
    }

    #[tokio::test]
    async fn concurrent_dispatches_for_one_order_are_not_deduplicated() {
        let dir = TempDir::new().unwrap();
        let mock = MockGateway::new();
        let orders = InMemoryOrderStore::new();
        orders
            .insert(Order {
                id: 42,
                total: 19.5,
                notes: Vec::new(),
            })
            .await;
        let dispatcher = Arc::new(NotificationDispatcher::new(
            mock.clone(),
            orders.clone(),
            audit_log(&dir),
        ));

        let enabled = settings(true);
        let (a, b) = tokio::join!(
            dispatcher.dispatch(DispatchRequest::order_placed(42), &enabled),
            dispatcher.dispatch(DispatchRequest::order_placed(42), &enabled),
        );
        assert!(a.unwrap().success);
        assert!(b.unwrap().success);
        // Both messages go out; the note count is racy but never zero.
        assert_eq!(mock.submitted().await.len(), 2);
        let order = orders.order_by_id(42).await.unwrap().unwrap();
        assert!(!order.notes.is_empty());
    }
}
