//! Supervisor — owns the bus receiver and routes requests to subsystems.

pub mod bus;
pub mod dispatch;

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bus::{BusError, BusMessage, ERR_METHOD_NOT_FOUND, SupervisorBus};
use dispatch::BusHandler;

/// Run the supervisor loop until `shutdown` is cancelled or every bus
/// handle is dropped.
///
/// # Panics
///
/// Panics on startup if two handlers share the same prefix.
pub async fn run(
    bus: SupervisorBus,
    shutdown: CancellationToken,
    handlers: Vec<Box<dyn BusHandler>>,
) {
    let mut table: HashMap<String, Box<dyn BusHandler>> = HashMap::new();
    for h in handlers {
        let prefix = h.prefix().to_string();
        if table.insert(prefix.clone(), h).is_some() {
            panic!("duplicate BusHandler prefix registered: {prefix:?}");
        }
    }

    let mut prefixes: Vec<&String> = table.keys().collect();
    prefixes.sort();
    info!(handlers = ?prefixes, "supervisor ready");

    // The supervisor keeps a clone of the handle inside `bus`; drop it so the
    // loop ends once every subsystem has let go of theirs.
    let SupervisorBus { mut rx, handle } = bus;
    drop(handle);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("supervisor shutting down");
                break;
            }

            msg = rx.recv() => {
                match msg {
                    Some(BusMessage::Request { id, method, payload, reply_tx }) => {
                        let prefix = method.split('/').next().unwrap_or_default();
                        match table.get(prefix) {
                            Some(handler) => {
                                debug!(%id, %method, "routing request");
                                handler.handle_request(&method, payload, reply_tx);
                            }
                            None => {
                                warn!(%method, "unhandled request method");
                                let _ = reply_tx.send(Err(BusError::new(
                                    ERR_METHOD_NOT_FOUND,
                                    format!("method not found: {method}"),
                                )));
                            }
                        }
                    }
                    None => {
                        info!("bus closed, supervisor exiting");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::{BusPayload, BusResult};
    use tokio::sync::oneshot;

    struct Fixed(&'static str);

    impl BusHandler for Fixed {
        fn prefix(&self) -> &str {
            self.0
        }

        fn handle_request(&self, method: &str, _payload: BusPayload, reply_tx: oneshot::Sender<BusResult>) {
            let _ = reply_tx.send(Ok(BusPayload::JsonResponse { data: method.to_string() }));
        }
    }

    fn ping() -> BusPayload {
        BusPayload::JsonResponse { data: String::new() }
    }

    #[tokio::test]
    async fn routes_on_first_segment() {
        let bus = SupervisorBus::new(8);
        let handle = bus.handle.clone();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(bus, shutdown.clone(), vec![Box::new(Fixed("tools"))]));

        match handle.request("tools/execute", ping()).await.unwrap() {
            Ok(BusPayload::JsonResponse { data }) => assert_eq!(data, "tools/execute"),
            other => panic!("unexpected reply: {other:?}"),
        }

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_prefix_is_method_not_found() {
        let bus = SupervisorBus::new(8);
        let handle = bus.handle.clone();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(bus, shutdown.clone(), vec![Box::new(Fixed("tools"))]));

        let err = handle.request("weather/today", ping()).await.unwrap().unwrap_err();
        assert_eq!(err.code, ERR_METHOD_NOT_FOUND);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    #[should_panic(expected = "duplicate BusHandler prefix")]
    async fn duplicate_prefix_panics() {
        let bus = SupervisorBus::new(1);
        run(bus, CancellationToken::new(), vec![Box::new(Fixed("llm")), Box::new(Fixed("llm"))]).await;
    }
}
