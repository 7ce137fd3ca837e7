use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use iotscape::prelude::*;
use serde_json::json;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Service definition
// ---------------------------------------------------------------------------

const DEFINITION: &str = r#"{
    "Light": {
        "version": "1",
        "description": "A simulated light switch",
        "methods": {
            "turnOn": {"documentation": "Turn the light on", "params": [], "returns": {"documentation": "", "type": ["void"]}},
            "turnOff": {"documentation": "Turn the light off", "params": [], "returns": {"documentation": "", "type": ["void"]}},
            "getState": {"documentation": "Whether the light is on", "params": [], "returns": {"documentation": "", "type": ["boolean"]}}
        },
        "events": {
            "stateChanged": {"params": ["on"]}
        }
    }
}"#;

/// Builds the Light service. Every state change is reported on `changes`
/// so the main loop can turn it into an event.
fn light_service(
    on: Arc<AtomicBool>,
    changes: mpsc::UnboundedSender<bool>,
) -> Result<Service, IotScapeError> {
    let mut service = Service::new(DEFINITION)?;

    let switch = |state: bool| {
        let on = Arc::clone(&on);
        let changes = changes.clone();
        move |_: &[Value]| {
            if on.swap(state, Ordering::SeqCst) != state {
                let _ = changes.send(state);
            }
            Ok::<_, HandlerError>(json!([]))
        }
    };
    service
        .add_handler("turnOn", switch(true))
        .add_handler("turnOff", switch(false));

    let state = Arc::clone(&on);
    service.add_handler("getState", move |_| Ok(json!([state.load(Ordering::SeqCst)])));
    Ok(service)
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn env_addr(name: &str) -> Result<Option<SocketAddr>, Box<dyn std::error::Error>> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value.parse::<SocketAddr>().map_err(|e| format!("{name}: {e}"))?)),
        Err(_) => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    iotscape::logging::init();

    let mut builder = IotScape::builder();
    if let Some(server) = env_addr("IOTSCAPE_SERVER")? {
        builder = builder.server(server);
    }
    if let Some(local) = env_addr("IOTSCAPE_LOCAL")? {
        builder = builder.bind(local);
    }
    let mac = std::env::var("IOTSCAPE_MAC").unwrap_or_else(|_| "02:00:00:00:00:01".into());
    let mut engine = builder.build(&FixedIdentity::from_hex(&mac)?)?;

    let on = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let light = engine.add_service(light_service(on, tx)?);
    engine.announce(light)?;

    let mut ticker = tokio::time::interval(Duration::from_millis(10));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                engine.pump_once();
                while let Ok(state) = rx.try_recv() {
                    let mut args = Map::new();
                    args.insert("on".into(), json!(state));
                    if let Err(e) = engine.send_event(light, "stateChanged", args) {
                        tracing::warn!(error = %e, "failed to send state event");
                    }
                }
            }
        }
    }

    tracing::info!("light switch shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(function: &str) -> String {
        json!({
            "service": "Light",
            "device": "020000000001",
            "id": "1",
            "function": function,
        })
        .to_string()
    }

    fn engine() -> (IotScape<MemoryTransport, JsonCodec>, MemoryTransport) {
        let server = MemoryTransport::new();
        let engine = IotScape::new(
            server.clone(),
            JsonCodec,
            &FixedIdentity::from_hex("02:00:00:00:00:01").unwrap(),
            EngineConfig::default(),
        )
        .unwrap();
        (engine, server)
    }

    #[test]
    fn test_definition_declares_all_handlers() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let service = light_service(Arc::new(AtomicBool::new(false)), tx).unwrap();
        let declared: Vec<_> = service.definition().methods().collect();
        for name in ["turnOn", "turnOff", "getState"] {
            assert!(declared.contains(&name));
            assert!(service.handlers().contains(name));
        }
    }

    #[test]
    fn test_switching_reports_changes_once() {
        let (mut engine, server) = engine();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let light = engine.add_service(light_service(Arc::new(AtomicBool::new(false)), tx).unwrap());
        engine.announce(light).unwrap();
        server.take_outbound();

        server.push_inbound(call("turnOn"));
        server.push_inbound(call("turnOn"));
        server.push_inbound(call("getState"));
        engine.pump_once();
        engine.pump_once();
        engine.pump_once();

        assert_eq!(rx.try_recv().ok(), Some(true));
        assert!(rx.try_recv().is_err());

        let replies = server.take_outbound();
        let last: Value = serde_json::from_slice(replies.last().unwrap()).unwrap();
        assert_eq!(last["response"], json!([true]));
    }
}
