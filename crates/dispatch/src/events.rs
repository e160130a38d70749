//! Hook for the host application's "order placed" event.

use config::SmsSettings;

use crate::{DispatchRequest, NotificationDispatcher};

/// Fire-and-forget consumer for the host's order-placed event. A gateway
/// rejection was already logged by the dispatcher and a disabled
/// configuration is silent; transport faults are logged here so the event
/// pipeline never sees an error.
pub async fn on_order_placed(
    dispatcher: &NotificationDispatcher,
    settings: &SmsSettings,
    order_id: u64,
) {
    match dispatcher
        .dispatch(DispatchRequest::order_placed(order_id), settings)
        .await
    {
        Ok(result) if result.success => {
            tracing::info!(order_id, "order placed SMS alert sent");
        }
        Ok(_) => {}
        Err(err) => {
            tracing::error!(order_id, error = %err, "order placed SMS dispatch failed");
        }
    }
}
