//! In-process stand-in for the remote signature verifier.
//!
//! Consumes `verify.request` on an [`InMemoryBroker`] and answers each request
//! on its `reply_to` queue with the request's correlation token, the way the
//! deployed verifier does. Each request gets its own task, so replies to
//! concurrent requests can be delayed into any order.

use parking_lot::Mutex;
use serde_json::json;
use shared_bus::topology::{DEFAULT_EXCHANGE, VERIFY_REQUEST_QUEUE};
use shared_bus::{InMemoryBroker, MessageBroker, MessageProperties, QueueOptions};
use shared_types::VerificationRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How the fake answers one request.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Reply after `delay`.
    Reply {
        valid: bool,
        message: String,
        delay: Duration,
    },
    /// Send a reply with a foreign correlation token, then the real one.
    StrayFirst { valid: bool },
    /// Reply with a body that is not a verification reply.
    Garbage,
    /// Never reply.
    Silent,
}

impl Behaviour {
    pub fn answer(valid: bool) -> Self {
        Self::after(valid, Duration::ZERO)
    }

    pub fn after(valid: bool, delay: Duration) -> Self {
        Self::Reply {
            valid,
            message: String::new(),
            delay,
        }
    }
}

/// Running fake verifier. Stops when dropped.
pub struct FakeVerifier {
    requests: Arc<Mutex<Vec<VerificationRequest>>>,
    task: JoinHandle<()>,
}

impl FakeVerifier {
    /// Start answering with a behaviour chosen per request.
    pub async fn start<F>(broker: &InMemoryBroker, decide: F) -> Self
    where
        F: Fn(&VerificationRequest) -> Behaviour + Send + Sync + 'static,
    {
        broker
            .declare_queue(VERIFY_REQUEST_QUEUE, QueueOptions::durable())
            .await
            .expect("declare verify.request");
        let mut consumer = broker
            .consume(VERIFY_REQUEST_QUEUE)
            .await
            .expect("consume verify.request");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let broker = broker.clone();

        let task = tokio::spawn(async move {
            while let Some(delivery) = consumer.recv().await {
                let Ok(request) = serde_json::from_slice::<VerificationRequest>(&delivery.body)
                else {
                    continue;
                };
                let behaviour = decide(&request);
                seen.lock().push(request);

                let (Some(reply_to), Some(correlation_id)) = (
                    delivery.properties.reply_to.clone(),
                    delivery.properties.correlation_id.clone(),
                ) else {
                    continue;
                };
                let broker = broker.clone();
                tokio::spawn(async move {
                    respond(&broker, &reply_to, &correlation_id, behaviour).await;
                });
            }
        });

        Self { requests, task }
    }

    /// Answer every request the same way.
    pub async fn always(broker: &InMemoryBroker, behaviour: Behaviour) -> Self {
        Self::start(broker, move |_| behaviour.clone()).await
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().clone()
    }
}

impl Drop for FakeVerifier {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn respond(broker: &InMemoryBroker, reply_to: &str, correlation_id: &str, behaviour: Behaviour) {
    match behaviour {
        Behaviour::Silent => {}
        Behaviour::Garbage => {
            publish(broker, reply_to, correlation_id, b"not a reply".to_vec()).await;
        }
        Behaviour::StrayFirst { valid } => {
            let stray = uuid::Uuid::new_v4().to_string();
            publish(broker, reply_to, &stray, reply_body(!valid, "")).await;
            publish(broker, reply_to, correlation_id, reply_body(valid, "")).await;
        }
        Behaviour::Reply {
            valid,
            message,
            delay,
        } => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            publish(broker, reply_to, correlation_id, reply_body(valid, &message)).await;
        }
    }
}

/// Reply body as the deployed verifier writes it.
fn reply_body(valid: bool, message: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({ "valido": valid, "mensaje": message }))
        .expect("serialize reply")
}

async fn publish(broker: &InMemoryBroker, reply_to: &str, correlation_id: &str, body: Vec<u8>) {
    // The caller may have given up and its reply queue is gone.
    let _ = broker
        .publish(
            DEFAULT_EXCHANGE,
            reply_to,
            MessageProperties::json().with_correlation_id(correlation_id),
            body,
        )
        .await;
}
