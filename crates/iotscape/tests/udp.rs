//! End-to-end run over real loopback UDP sockets.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use iotscape::{FixedIdentity, InboundOutcome, IotScape, Service};
use serde_json::{Value, json};

fn recv_json(server: &UdpSocket) -> (Value, SocketAddr) {
    let mut buf = [0u8; 4096];
    let (len, from) = server.recv_from(&mut buf).expect("datagram should arrive");
    (serde_json::from_slice(&buf[..len]).unwrap(), from)
}

#[test]
fn test_announce_and_call_round_trip() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    server
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    let mut engine = IotScape::builder()
        .server(server.local_addr().unwrap())
        .bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .build(&FixedIdentity::from_hex("aa:bb:cc").unwrap())
        .unwrap();

    let mut light = Service::new(r#"{"Light":{"methods":{"turnOn":{}}}}"#).unwrap();
    light.add_handler("turnOn", |_| Ok(json!([true])));
    let light = engine.add_service(light);
    engine.announce(light).unwrap();

    let (announce, device_addr) = recv_json(&server);
    assert_eq!(announce["Light"]["id"], "AABBCC");

    let call = json!({
        "service": "Light",
        "device": "AABBCC",
        "id": "42",
        "function": "turnOn",
        "params": [],
    });
    server
        .send_to(call.to_string().as_bytes(), device_addr)
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut outcome = None;
    while outcome.is_none() && Instant::now() < deadline {
        outcome = engine.pump_once().inbound;
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(outcome, Some(InboundOutcome::Replied));

    let (reply, _) = recv_json(&server);
    assert_eq!(
        reply,
        json!({"id": "AABBCC", "request": "42", "service": "Light", "response": [true]})
    );
}
