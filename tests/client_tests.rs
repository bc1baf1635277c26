//! End-to-end client tests over the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use sinric_client::codec::{MAX_HEADER_LEN, Opcode, decode_frame, encode_frame_with_key};
use sinric_client::{
    ActionRequest, ActionValue, Cause, Client, ClientBuilder, ConnectionState, ManualClock,
    MemoryHandle, MemoryTransport, Signer, ValueType,
};

// ============================================================================
// Harness
// ============================================================================

const SECRET: &str = "5f36xxxx-x3x7-4x3x-xexe-e86724a9xxxx";

const UPGRADE: &[u8] =
    b"HTTP/1.1 101 Switching Protocols\r\nConnection: upgrade\r\nUpgrade: websocket\r\n\r\n";

const REQUEST: &str = r#"{"deviceId":"d1","clientId":"c1","replyToken":"r1","createdAt":1700000000,"action":"setPowerState","value":{"state":"On"}}"#;

type Seen = Arc<Mutex<Vec<ActionRequest>>>;

struct Harness {
    client: Client<MemoryTransport>,
    server: MemoryHandle,
    clock: ManualClock,
    seen: Seen,
}

fn builder(clock: &ManualClock) -> ClientBuilder {
    ClientBuilder::new()
        .app_key("de0bxxxx-1x3x-4x3x-ax2x-5dabxxxxxxxx")
        .app_secret(SECRET)
        .device_id("d1")
        .local_ip("192.168.1.20")
        .local_mac("28:CD:C1:00:00:01")
        .clock(Arc::new(clock.clone()))
}

fn harness_with(configure: impl FnOnce(ClientBuilder) -> ClientBuilder) -> Harness {
    let clock = ManualClock::new(1_000);
    let (transport, server) = MemoryTransport::new();
    let mut client = configure(builder(&clock))
        .build_with_transport(transport)
        .unwrap();

    let seen: Seen = Arc::default();
    let sink = Arc::clone(&seen);
    client
        .connect(move |request: &ActionRequest| {
            sink.lock().push(request.clone());
            true
        })
        .unwrap();

    Harness {
        client,
        server,
        clock,
        seen,
    }
}

fn upgraded() -> Harness {
    upgraded_with(|b| b)
}

fn upgraded_with(configure: impl FnOnce(ClientBuilder) -> ClientBuilder) -> Harness {
    let mut h = harness_with(configure);
    h.server.accept();
    h.server.push_bytes(UPGRADE);
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Upgraded);
    h.server.take_written();
    h
}

/// Decodes every frame the client wrote, asserting each is masked.
fn sent_frames(server: &MemoryHandle) -> Vec<(Opcode, Vec<u8>)> {
    server
        .take_written()
        .into_iter()
        .map(|mut bytes| {
            let header = decode_frame(&mut bytes).unwrap();
            assert!(header.mask_key.is_some(), "client frames must be masked");
            (header.opcode, header.payload(&bytes).to_vec())
        })
        .collect()
}

fn sent_texts(server: &MemoryHandle) -> Vec<String> {
    sent_frames(server)
        .into_iter()
        .filter(|(opcode, _)| *opcode == Opcode::Text)
        .map(|(_, payload)| String::from_utf8(payload).unwrap())
        .collect()
}

/// Returns the parsed payload after checking the envelope signature.
fn verified_payload(envelope: &str) -> Value {
    let start = envelope.find(r#""payload":"#).unwrap() + r#""payload":"#.len();
    let end = envelope.rfind(r#","signature":"#).unwrap();
    let raw = &envelope[start..end];

    let parsed: Value = serde_json::from_str(envelope).unwrap();
    assert_eq!(parsed["header"]["payloadVersion"], 2);
    assert_eq!(parsed["header"]["signatureVersion"], 1);
    Signer::new(SECRET)
        .verify(raw.as_bytes(), parsed["signature"]["HMAC"].as_str().unwrap())
        .unwrap();

    serde_json::from_str(raw).unwrap()
}

// ============================================================================
// Handshake
// ============================================================================

#[test]
fn test_upgrade_request_carries_identity() {
    let mut h = harness_with(|b| b);
    assert_eq!(h.client.state(), ConnectionState::Connecting);

    h.server.accept();
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Connected);

    let written = h.server.take_written();
    let request = std::str::from_utf8(&written[0]).unwrap();
    assert!(request.starts_with("GET / HTTP/1.1\r\nHost: ws.sinric.pro:80\r\n"));
    assert!(request.contains("Sec-WebSocket-Key: x3JJHMbDL1EzLkh9GBhXDw==\r\n"));
    assert!(request.contains(
        "appkey: de0bxxxx-1x3x-4x3x-ax2x-5dabxxxxxxxx\r\n\
         deviceids: d1\r\n\
         restoredevicestates: true\r\n\
         platform: Raspberry Pi Pico\r\n\
         mac: 28:CD:C1:00:00:01\r\n\
         ip: 192.168.1.20\r\n\
         firmwareVersion: 0.1.1\r\n\r\n"
    ));
}

#[test]
fn test_handshake_byte_by_byte() {
    let mut h = harness_with(|b| b);
    h.server.accept();
    h.client.poll();
    h.server.take_written();

    let marker_end = UPGRADE.len() - b"\r\n\r\n".len();
    for (i, byte) in UPGRADE[..marker_end].iter().enumerate() {
        assert_eq!(h.client.state(), ConnectionState::Connected, "upgraded early at byte {i}");
        h.server.push_bytes(vec![*byte]);
        h.client.poll();
    }
    assert_eq!(h.client.state(), ConnectionState::Upgraded);
    assert!(h.server.take_written().is_empty());
}

#[test]
fn test_handshake_waits_for_all_markers() {
    let mut h = harness_with(|b| b);
    h.server.accept();
    h.client.poll();

    h.server.push_bytes(&b"HTTP/1.1 101 Switching Protocols\r\nConnection: upgrade\r\n"[..]);
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Connected);

    h.server.push_bytes(&b"Upgrade: websocket\r\n\r\n"[..]);
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Upgraded);
}

#[test]
fn test_response_headers_after_markers_not_framed() {
    let mut h = harness_with(|b| b);
    h.server.accept();
    h.server.push_bytes(
        &b"HTTP/1.1 101 Switching Protocols\r\nConnection: upgrade\r\nUpgrade: websocket\r\n"[..],
    );
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Upgraded);
    h.server.take_written();

    h.server
        .push_bytes(&b"Sec-WebSocket-Accept: HSmrc0sMlYUkAGmm5OPpG2HaGWk=\r\n\r\n"[..]);
    h.server.push_text(REQUEST);
    h.client.poll();

    assert_eq!(h.seen.lock().len(), 1);
    assert_eq!(sent_texts(&h.server).len(), 1);
}

#[test]
fn test_rejected_upgrade_stays_connected() {
    let mut h = harness_with(|b| b);
    h.server.accept();
    h.server
        .push_bytes(&b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\n\r\n"[..]);
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Connected);
    assert!(!h.client.is_connected());
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_action_dispatch_sends_signed_response() {
    let mut h = upgraded();
    h.server.push_text(r#"{"timestamp":1700000050}"#);
    h.server.push_text(REQUEST);
    h.client.poll();

    let seen = h.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].device_id, "d1");
    assert_eq!(seen[0].action(), "setPowerState");
    assert_eq!(seen[0].value, ActionValue::text("On"));
    assert_eq!(seen[0].value_type(), ValueType::Text);

    let texts = sent_texts(&h.server);
    assert_eq!(texts.len(), 1);
    let payload = verified_payload(&texts[0]);
    assert_eq!(payload["action"], "setPowerState");
    assert_eq!(payload["deviceId"], "d1");
    assert_eq!(payload["clientId"], "c1");
    assert_eq!(payload["replyToken"], "r1");
    assert_eq!(payload["value"]["state"], "On");
    assert_eq!(payload["success"], true);
    assert_eq!(payload["message"], "OK");
    assert_eq!(payload["createdAt"], 1_700_000_050);
}

#[test]
fn test_integer_action() {
    let mut h = upgraded();
    let request = REQUEST
        .replace("setPowerState", "setPowerLevel")
        .replace(r#"{"state":"On"}"#, r#"{"powerLevel":42}"#);
    h.server.push_text(&request);
    h.client.poll();

    assert_eq!(h.seen.lock()[0].value, ActionValue::Integer(42));
    let payload = verified_payload(&sent_texts(&h.server)[0]);
    assert_eq!(payload["value"]["powerLevel"], 42);
}

#[test]
fn test_unknown_action_produces_nothing() {
    let mut h = upgraded();
    h.server.push_text(&REQUEST.replace("setPowerState", "launchRocket"));
    h.client.poll();

    assert!(h.seen.lock().is_empty());
    assert!(h.server.take_written().is_empty());
}

#[test]
fn test_invalid_messages_dropped() {
    let mut h = upgraded();
    h.server.push_text(r#"{"deviceId":"d1"}"#);
    h.server.push_text(r#"{"broken":"#);
    h.server.push_text("hello");
    h.client.poll();

    assert!(h.seen.lock().is_empty());
    assert!(h.server.take_written().is_empty());
    assert!(h.client.is_connected());
}

#[test]
fn test_signature_verification_enabled() -> anyhow::Result<()> {
    let mut h = upgraded_with(|b| b.verify_signatures(true));

    let forged = format!(r#"{{"payload":{REQUEST},"signature":{{"HMAC":"AAAA"}}}}"#);
    h.server.push_text(&forged);
    h.client.poll();
    assert!(h.server.take_written().is_empty());

    let hmac = Signer::new(SECRET).sign(REQUEST.as_bytes())?;
    let signed = format!(r#"{{"payload":{REQUEST},"signature":{{"HMAC":"{hmac}"}}}}"#);
    h.server.push_text(&signed);
    h.client.poll();
    assert_eq!(sent_texts(&h.server).len(), 1);
    Ok(())
}

// ============================================================================
// Clock
// ============================================================================

#[test]
fn test_clock_sync() {
    let mut h = upgraded();
    h.server.push_text(r#"{"timestamp":1700000000}"#);
    h.client.poll();
    assert!(h.server.take_written().is_empty());

    h.clock.advance(Duration::from_millis(5_000));
    assert_eq!(h.client.server_time(), 1_700_000_005);
}

#[test]
fn test_server_time_before_sync_is_local() {
    let h = harness_with(|b| b);
    h.clock.set(42_500);
    assert_eq!(h.client.server_time(), 42);
}

// ============================================================================
// Notify
// ============================================================================

#[test]
fn test_notify_event() -> anyhow::Result<()> {
    let mut h = upgraded();
    h.server.push_text(r#"{"timestamp":1700000000}"#);
    h.client.poll();
    h.clock.advance(Duration::from_secs(2));

    h.client
        .notify("d1", "setPowerLevel", Cause::PeriodicPoll, "powerLevel", 77i64)?;

    let texts = sent_texts(&h.server);
    assert_eq!(texts.len(), 1);
    let payload = verified_payload(&texts[0]);
    assert_eq!(payload["action"], "setPowerLevel");
    assert_eq!(payload["cause"]["type"], "PERIODIC_POLL");
    assert_eq!(payload["createdAt"], 1_700_000_002);
    assert_eq!(payload["deviceId"], "d1");
    assert_eq!(payload["replyToken"], "d1");
    assert_eq!(payload["type"], "event");
    assert_eq!(payload["value"]["powerLevel"], 77);
    Ok(())
}

#[test]
fn test_notify_before_upgrade_fails() {
    let mut h = harness_with(|b| b);
    let err = h
        .client
        .notify("d1", "setPowerState", Cause::PhysicalInteraction, "state", "On")
        .unwrap_err();
    assert!(err.is_connection_error());
    assert!(h.server.take_written().is_empty());
}

#[test]
fn test_notify_write_queue_full() {
    let mut h = upgraded();
    h.server.set_reject_writes(true);
    let err = h
        .client
        .notify("d1", "setPowerState", Cause::PhysicalInteraction, "state", "On")
        .unwrap_err();
    assert!(err.is_recoverable());
    assert!(h.client.is_connected());
}

// ============================================================================
// Keepalive and reconnect
// ============================================================================

#[test]
fn test_ping_answered() {
    let mut h = upgraded();
    h.server.push_frame(Opcode::Ping, b"");
    h.client.poll();

    let frames = sent_frames(&h.server);
    assert_eq!(frames, vec![(Opcode::Pong, Vec::new())]);
}

#[test]
fn test_keepalive_timeout_reconnects() {
    let mut h = upgraded();

    h.clock.advance(Duration::from_secs(299));
    h.server.push_frame(Opcode::Ping, b"");
    h.client.poll();
    h.server.take_written();

    h.clock.advance(Duration::from_secs(300));
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Upgraded);

    h.clock.advance(Duration::from_secs(1));
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Connecting);
    assert_eq!(h.server.close_count(), 1);
    assert_eq!(h.server.connect_count(), 2);
}

#[test]
fn test_reconnect_after_peer_close() {
    let mut h = upgraded();
    h.server.hang_up();
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Connecting);
    assert_eq!(h.server.connect_count(), 2);

    h.server.accept();
    h.server.push_bytes(UPGRADE);
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Upgraded);

    let written = h.server.take_written();
    assert!(written[0].starts_with(b"GET / HTTP/1.1\r\n"));

    h.server.push_text(REQUEST);
    h.client.poll();
    assert_eq!(sent_texts(&h.server).len(), 1);
}

#[test]
fn test_no_reconnect_when_disabled() {
    let mut h = upgraded_with(|b| b.auto_reconnect(false));
    h.server.hang_up();
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Disconnected);
    assert_eq!(h.server.connect_count(), 1);
}

#[test]
fn test_disconnect_is_final() {
    let mut h = upgraded();
    h.client.disconnect();
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Disconnected);
    assert_eq!(h.server.connect_count(), 1);
    assert!(!h.server.is_open());
}

// ============================================================================
// Framing
// ============================================================================

#[test]
fn test_oversized_inbound_frame_skipped() {
    let mut h = upgraded_with(|b| b.buffer_capacity(1_024));

    let padding = "x".repeat(2_000);
    let big = REQUEST.replace("\"c1\"", &format!("\"{padding}\""));
    let mut frame = vec![0u8; big.len() + MAX_HEADER_LEN];
    let len = encode_frame_with_key(Opcode::Text, big.as_bytes(), None, &mut frame).unwrap();
    frame.truncate(len);
    for chunk in frame.chunks(256) {
        h.server.push_bytes(chunk);
    }
    h.server.push_text(REQUEST);
    h.client.poll();

    let seen = h.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].client_id, "c1");
    assert_eq!(sent_texts(&h.server).len(), 1);
}

#[test]
fn test_max_declared_length_recovers_on_reconnect() {
    let mut h = upgraded();
    let mut bytes = vec![0x81, 0x7F];
    bytes.extend_from_slice(&u64::MAX.to_be_bytes());
    h.server.push_bytes(bytes);
    h.client.poll();
    assert_eq!(h.client.state(), ConnectionState::Upgraded);
    assert!(h.server.take_written().is_empty());

    h.clock.advance(Duration::from_secs(301));
    h.client.poll();
    h.server.accept();
    h.server.push_bytes(UPGRADE);
    h.server.push_text(REQUEST);
    h.client.poll();

    assert_eq!(h.client.state(), ConnectionState::Upgraded);
    assert_eq!(h.seen.lock().len(), 1);
}

#[test]
fn test_frames_coalesced_in_one_chunk() {
    let mut h = upgraded();
    let mut bytes = Vec::new();
    for text in [r#"{"timestamp":1700000000}"#, REQUEST] {
        let mut frame = vec![0u8; text.len() + MAX_HEADER_LEN];
        let len = encode_frame_with_key(Opcode::Text, text.as_bytes(), None, &mut frame).unwrap();
        bytes.extend_from_slice(&frame[..len]);
    }
    h.server.push_bytes(bytes);
    h.client.poll();

    assert_eq!(h.seen.lock().len(), 1);
    let payload = verified_payload(&sent_texts(&h.server)[0]);
    assert_eq!(payload["createdAt"], 1_700_000_000);
}
