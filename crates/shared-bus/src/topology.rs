//! Broker topology: fixed exchange, queue and routing-key names.

use crate::broker::{BrokerError, ExchangeKind, MessageBroker, QueueOptions};
use tracing::info;

/// The default exchange, which routes by queue name.
pub const DEFAULT_EXCHANGE: &str = "";

/// Exchange carrying document notifications.
pub const DOCUMENTS_EXCHANGE: &str = "documents";

/// Routing key (and bound queue) of document-created events.
pub const DOCUMENT_CREATED_KEY: &str = "documents.created";

/// Durable queue bound to [`DOCUMENTS_EXCHANGE`].
pub const DOCUMENT_CREATED_QUEUE: &str = "documents.created";

/// Queue the remote verifier consumes signature requests from.
pub const VERIFY_REQUEST_QUEUE: &str = "verify.request";

/// Declare the durable document topology. Idempotent.
pub async fn declare_topology(broker: &dyn MessageBroker) -> Result<(), BrokerError> {
    broker
        .declare_exchange(DOCUMENTS_EXCHANGE, ExchangeKind::Direct, true)
        .await?;
    broker
        .declare_queue(DOCUMENT_CREATED_QUEUE, QueueOptions::durable())
        .await?;
    broker
        .bind_queue(DOCUMENT_CREATED_QUEUE, DOCUMENTS_EXCHANGE, DOCUMENT_CREATED_KEY)
        .await?;

    info!(
        exchange = DOCUMENTS_EXCHANGE,
        queue = DOCUMENT_CREATED_QUEUE,
        "Broker topology declared"
    );
    Ok(())
}
