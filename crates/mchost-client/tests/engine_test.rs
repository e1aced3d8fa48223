//! Engine behaviour against a scripted in-process radio.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::*;
use mchost_client::{
    CancelToken, ChunkProgress, Companion, CompanionConfig, ConnectionState, Error, Event,
    RequestOptions,
};
use mchost_protocol::*;

const RECIPIENT: [u8; 6] = [1, 2, 3, 4, 5, 6];
/// Offset of the text in an encoded direct send.
const DIRECT_TEXT_AT: usize = 13;
/// Offset of the text in an encoded channel send.
const CHANNEL_TEXT_AT: usize = 7;

fn test_config() -> CompanionConfig {
    CompanionConfig {
        connect_timeout_ms: 1_000,
        command_timeout_ms: 500,
        join_timeout_ms: 500,
        message_chunk_delay_ms: 0,
        ..Default::default()
    }
}

fn defaults() -> RequestOptions {
    RequestOptions::default()
}

/// Connect over a fresh mock link whose device answers the handshake and
/// hands every other command to `script`.
fn connected<F>(framing: Framing, mut script: F) -> (Companion, ScriptedDevice)
where
    F: FnMut(&[u8], &Device) + Send + 'static,
{
    let (transport, device) = pair(framing);
    let device = spawn_device(device, move |cmd, dev| {
        if !answer_handshake(cmd, dev) {
            script(cmd, dev);
        }
    });
    let companion = Companion::new(transport, test_config());
    companion.connect(&defaults()).expect("connect");
    (companion, device)
}

fn commands_with(seen: &[Vec<u8>], code: u8) -> Vec<Vec<u8>> {
    seen.iter().filter(|c| c[0] == code).cloned().collect()
}

fn wait_for_event(rx: &crossbeam_channel::Receiver<Event>, pred: impl Fn(&Event) -> bool) -> Option<Event> {
    let deadline = Instant::now() + Duration::from_secs(2);
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(event) if pred(&event) => return Some(event),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_connect_both_framings() {
    for framing in [Framing::Delimited, Framing::SelfFraming] {
        let (companion, device) = connected(framing, |_, _| {});
        assert_eq!(companion.state(), ConnectionState::Connected);
        let info = companion.self_info().expect("self info cached");
        assert_eq!(info.node_name, "TestNode");
        assert_eq!(info.public_key, PublicKey(NODE_KEY));
        assert_eq!(info.freq_khz, 910_525);

        companion.close().unwrap();
        assert_eq!(companion.state(), ConnectionState::Disconnected);

        let seen = device.finish();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0], CMD_APP_START);
        assert_eq!(&seen[0][1..8], &[0u8; 7]);
        assert_eq!(&seen[0][8..], b"mchost");
    }
}

#[test]
fn test_connect_timeout_leaves_disconnected() {
    let (transport, device) = pair(Framing::SelfFraming);
    let device = spawn_device(device, |_, _| {});
    let companion = Companion::new(transport, test_config());

    let started = Instant::now();
    let err = companion
        .connect(&RequestOptions::new().with_timeout(Duration::from_millis(100)))
        .unwrap_err();
    assert!(matches!(err, Error::Connect(ref inner) if matches!(**inner, Error::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(companion.state(), ConnectionState::Disconnected);
    assert!(companion.self_info().is_none());
    drop(device);
}

#[test]
fn test_connect_open_failure() {
    let companion = Companion::new(MockTransport::failing(Framing::Delimited), test_config());
    let err = companion.connect(&defaults()).unwrap_err();
    assert!(matches!(err, Error::Connect(ref inner) if matches!(**inner, Error::Transport(_))));
    assert_eq!(companion.state(), ConnectionState::Disconnected);
}

#[test]
fn test_connect_twice_rejected() {
    let (companion, _device) = connected(Framing::SelfFraming, |_, _| {});
    let err = companion.connect(&defaults()).unwrap_err();
    assert!(matches!(err, Error::InvalidState(ConnectionState::Connected)));
    assert!(companion.is_connected());
}

#[test]
fn test_commands_require_connection() {
    let (transport, _device) = pair(Framing::SelfFraming);
    let companion = Companion::new(transport, test_config());
    assert!(matches!(companion.get_battery(&defaults()), Err(Error::NotConnected)));
    assert!(matches!(companion.get_contacts(None, &defaults()), Err(Error::NotConnected)));
    assert!(matches!(companion.reboot(), Err(Error::NotConnected)));
}

#[test]
fn test_close_fires_disconnected_once() {
    let (companion, _device) = connected(Framing::Delimited, |_, _| {});
    let events = companion.subscribe();

    companion.close().unwrap();
    companion.close().unwrap();

    let disconnects = events
        .try_iter()
        .filter(|e| matches!(e, Event::Disconnected))
        .count();
    assert_eq!(disconnects, 1);
}

#[test]
fn test_close_without_connect_is_silent() {
    let (transport, _device) = pair(Framing::SelfFraming);
    let companion = Companion::new(transport, test_config());
    let events = companion.subscribe();
    companion.close().unwrap();
    assert!(events.try_recv().is_err());
}

#[test]
fn test_link_loss_wakes_waiter() {
    let (companion, device) = connected(Framing::Delimited, |_, _| {});
    let events = companion.subscribe();

    let killer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        device.finish()
    });

    let started = Instant::now();
    let err = companion
        .get_battery(&RequestOptions::new().with_timeout(Duration::from_secs(5)))
        .unwrap_err();
    assert!(matches!(err, Error::Disconnected), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(3));
    killer.join().unwrap();

    assert!(wait_for_event(&events, |e| matches!(e, Event::Error(_))).is_some());
    assert_eq!(companion.state(), ConnectionState::Disconnected);
    assert!(matches!(companion.get_battery(&defaults()), Err(Error::NotConnected)));

    companion.close().unwrap();
    assert!(wait_for_event(&events, |e| matches!(e, Event::Disconnected)).is_some());
}

// ============================================================================
// Request/response
// ============================================================================

#[test]
fn test_push_interleaved_with_reply() {
    let (companion, device) = connected(Framing::Delimited, |cmd, dev| {
        if cmd[0] == CMD_GET_DEVICE_TIME {
            dev.send(&direct_push_frame(RECIPIENT, "in between"));
            dev.send(&current_time_frame(1_700_000_000));
        }
    });

    assert_eq!(companion.get_device_time(&defaults()).unwrap(), 1_700_000_000);
    let msg = companion
        .next_direct_message(Duration::from_secs(1))
        .expect("pushed message");
    assert_eq!(msg.text, "in between");
    assert_eq!(msg.sender_prefix, PublicKeyPrefix(RECIPIENT));
    assert_eq!(msg.generation, WireGeneration::V3);
    drop(device);
}

#[test]
fn test_timeout_keeps_session_usable() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (companion, _device) = connected(Framing::SelfFraming, move |cmd, dev| {
        if cmd[0] == CMD_GET_BATT_AND_STORAGE && counter.fetch_add(1, Ordering::SeqCst) > 0 {
            dev.send(&battery_frame(3_700));
        }
    });

    let err = companion
        .get_battery(&RequestOptions::new().with_timeout(Duration::from_millis(80)))
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(companion.is_connected());

    let status = companion.get_battery(&defaults()).unwrap();
    assert_eq!(status.battery_millivolts, 3_700);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_late_reply_not_taken_by_next_command() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (companion, _device) = connected(Framing::Delimited, move |cmd, dev| {
        if cmd[0] == CMD_GET_DEVICE_TIME {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                thread::sleep(Duration::from_millis(150));
                dev.send(&current_time_frame(111));
            } else {
                dev.send(&current_time_frame(222));
            }
        }
    });

    let err = companion
        .get_device_time(&RequestOptions::new().with_timeout(Duration::from_millis(50)))
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));

    // Let the late answer land in the queue before the next command.
    thread::sleep(Duration::from_millis(300));
    assert_eq!(companion.get_device_time(&defaults()).unwrap(), 222);
}

#[test]
fn test_error_frame_fails_waiter() {
    let (companion, _device) = connected(Framing::SelfFraming, |cmd, dev| {
        if cmd[0] == CMD_REMOVE_CONTACT {
            dev.send(&err_frame(ERR_CODE_NOT_FOUND));
        }
    });

    let err = companion
        .remove_contact(&[0x11; PUB_KEY_SIZE], &defaults())
        .unwrap_err();
    assert!(matches!(err, Error::Device(FirmwareErrorCode::NotFound)));
    assert!(companion.is_connected());
}

#[test]
fn test_cancel_interrupts_wait() {
    let (companion, _device) = connected(Framing::SelfFraming, |_, _| {});
    let token = CancelToken::new();
    let canceller = token.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let started = Instant::now();
    let err = companion
        .get_battery(
            &RequestOptions::new()
                .with_timeout(Duration::from_secs(5))
                .with_cancel(token),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_validation_happens_before_io() {
    let (companion, device) = connected(Framing::Delimited, |_, _| {});

    let err = companion
        .send_text_message(&[1, 2, 3], "hi", &defaults())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::PrefixTooShort { expected: 6, actual: 3 })
    ));
    let err = companion.remove_contact(&[0u8; 31], &defaults()).unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::InvalidKeyLength { .. })));

    companion.close().unwrap();
    assert_eq!(device.finish().len(), 1);
}

#[test]
fn test_undecodable_frame_dropped() {
    let (companion, _device) = connected(Framing::Delimited, |cmd, dev| {
        if cmd[0] == CMD_GET_DEVICE_TIME {
            dev.send(&[0x7F, 1, 2]);
            dev.send(&[RESP_CODE_CURR_TIME, 1]);
            dev.send(&current_time_frame(42));
        }
    });
    let events = companion.subscribe();

    assert_eq!(companion.get_device_time(&defaults()).unwrap(), 42);
    let received: Vec<Vec<u8>> = events
        .try_iter()
        .filter_map(|e| match e {
            Event::PacketReceived(frame) => Some(frame),
            _ => None,
        })
        .collect();
    assert_eq!(received[0], vec![0x7F, 1, 2]);
    assert_eq!(received.len(), 3);
}

#[test]
fn test_packet_events_carry_unframed_bytes() {
    let (transport, device) = pair(Framing::Delimited);
    let _device = spawn_device(device, |cmd, dev| {
        answer_handshake(cmd, dev);
    });
    let companion = Companion::new(transport, test_config());
    let events = companion.subscribe();
    companion.connect(&defaults()).unwrap();

    let sent = wait_for_event(&events, |e| matches!(e, Event::PacketSent(_)));
    let Some(Event::PacketSent(payload)) = sent else {
        panic!("no packet sent event");
    };
    assert_eq!(payload[0], CMD_APP_START);

    let received = wait_for_event(&events, |e| matches!(e, Event::PacketReceived(_)));
    let Some(Event::PacketReceived(frame)) = received else {
        panic!("no packet received event");
    };
    assert_eq!(frame, self_info_frame("TestNode"));

    assert!(wait_for_event(&events, |e| matches!(e, Event::Connected(_))).is_some());
}

#[test]
fn test_empty_frame_reaches_packet_observers() {
    let (companion, device) = connected(Framing::SelfFraming, |cmd, dev| {
        if cmd[0] == CMD_GET_DEVICE_TIME {
            dev.send(&[]);
            dev.send(&current_time_frame(11));
        }
    });
    let events = companion.subscribe();

    assert_eq!(companion.get_device_time(&defaults()).unwrap(), 11);
    let empty = wait_for_event(&events, |e| matches!(e, Event::PacketReceived(f) if f.is_empty()));
    assert!(empty.is_some());
    drop(device);
}

// ============================================================================
// Operations
// ============================================================================

#[test]
fn test_contacts_skip_malformed_frames() {
    let (companion, device) = connected(Framing::Delimited, |cmd, dev| {
        if cmd[0] == CMD_GET_CONTACTS {
            dev.send(&contacts_start_frame(3));
            dev.send(&contact_frame(0xA1, "Alice"));
            let truncated = contact_frame(0xB2, "Broken");
            dev.send(&truncated[..40]);
            dev.send(&contact_frame(0xC3, "Carol"));
            dev.send(&end_of_contacts_frame());
        }
    });

    let contacts = companion.get_contacts(Some(1_000), &defaults()).unwrap();
    let names: Vec<&str> = contacts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Carol"]);
    assert_eq!(contacts[1].public_key, PublicKey([0xC3; PUB_KEY_SIZE]));

    companion.close().unwrap();
    let requests = commands_with(&device.finish(), CMD_GET_CONTACTS);
    assert_eq!(requests, vec![vec![CMD_GET_CONTACTS, 0xE8, 0x03, 0, 0]]);
}

#[test]
fn test_pushed_messages_reach_events_and_queue() {
    let (companion, device) = connected(Framing::SelfFraming, |cmd, dev| {
        if cmd[0] == CMD_GET_DEVICE_TIME {
            dev.send(&direct_push_frame(RECIPIENT, "hello"));
            let mut channel = vec![RESP_CODE_CHANNEL_MSG_RECV_V3 | PUSH_FLAG, 4, 0, 0, 2, 0, TXT_TYPE_PLAIN];
            channel.extend_from_slice(&5u32.to_le_bytes());
            channel.extend_from_slice(b"Bob: hey all");
            dev.send(&channel);
            dev.send(&[PUSH_CODE_MSG_WAITING]);
            dev.send(&current_time_frame(7));
        }
    });
    let events = companion.subscribe();

    assert_eq!(companion.get_device_time(&defaults()).unwrap(), 7);

    let direct = wait_for_event(&events, |e| matches!(e, Event::DirectMessage(_)));
    assert!(matches!(direct, Some(Event::DirectMessage(ref m)) if m.text == "hello"));
    let channel = wait_for_event(&events, |e| matches!(e, Event::ChannelMessage(_)));
    assert!(matches!(
        channel,
        Some(Event::ChannelMessage(ref m)) if m.sender.as_deref() == Some("Bob") && m.text == "hey all"
    ));
    assert!(wait_for_event(&events, |e| matches!(e, Event::MessageWaiting)).is_some());

    assert_eq!(companion.try_next_direct_message().map(|m| m.text), Some("hello".into()));
    let queued = companion.next_channel_message(Duration::from_secs(1)).unwrap();
    assert_eq!(queued.channel_idx, 2);
    assert!(companion.try_next_channel_message().is_none());
    drop(device);
}

#[test]
fn test_events_only_consumer_can_empty_queues() {
    let (companion, device) = connected(Framing::Delimited, |cmd, dev| {
        if cmd[0] == CMD_GET_DEVICE_TIME {
            dev.send(&direct_push_frame(RECIPIENT, "one"));
            dev.send(&direct_push_frame(RECIPIENT, "two"));
            dev.send(&current_time_frame(9));
        }
    });
    let events = companion.subscribe();

    assert_eq!(companion.get_device_time(&defaults()).unwrap(), 9);
    let mut seen = 0;
    while seen < 2 && wait_for_event(&events, |e| matches!(e, Event::DirectMessage(_))).is_some() {
        seen += 1;
    }
    assert_eq!(seen, 2);

    assert_eq!(companion.discard_queued_messages(), 2);
    assert!(companion.try_next_direct_message().is_none());
    assert_eq!(companion.discard_queued_messages(), 0);
    drop(device);
}

#[test]
fn test_sync_next_message() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (companion, _device) = connected(Framing::Delimited, move |cmd, dev| {
        if cmd[0] == CMD_SYNC_NEXT_MESSAGE {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => dev.send(&direct_v2_frame(RECIPIENT, "queued")),
                1 => dev.send(&channel_v3_frame(1, "Eve: on channel")),
                _ => dev.send(&[RESP_CODE_NO_MORE_MESSAGES]),
            }
        }
    });

    match companion.sync_next_message(&defaults()).unwrap() {
        Some(IncomingMessage::Direct(msg)) => {
            assert_eq!(msg.text, "queued");
            assert_eq!(msg.generation, WireGeneration::V2);
            assert_eq!(msg.path_len, 1);
        }
        other => panic!("expected direct message, got {other:?}"),
    }
    match companion.sync_next_message(&defaults()).unwrap() {
        Some(IncomingMessage::Channel(msg)) => {
            assert_eq!(msg.sender.as_deref(), Some("Eve"));
            assert_eq!(msg.snr(), Some(2.0));
        }
        other => panic!("expected channel message, got {other:?}"),
    }
    assert!(companion.sync_next_message(&defaults()).unwrap().is_none());
    // Queued messages are not re-broadcast to the pull queues.
    assert!(companion.try_next_direct_message().is_none());
}

#[test]
fn test_reboot_does_not_wait() {
    let (companion, device) = connected(Framing::SelfFraming, |_, _| {});
    let started = Instant::now();
    companion.reboot().unwrap();
    assert!(started.elapsed() < Duration::from_millis(400));

    thread::sleep(Duration::from_millis(50));
    companion.close().unwrap();
    let reboots = commands_with(&device.finish(), CMD_REBOOT);
    assert_eq!(reboots, vec![b"\x13reboot".to_vec()]);
}

#[test]
fn test_query_device_caches_info() {
    let (companion, _device) = connected(Framing::Delimited, |cmd, dev| {
        if cmd == [CMD_DEVICE_QUERY, APP_PROTOCOL_VERSION] {
            let mut frame = vec![RESP_CODE_DEVICE_INFO, 8, 50, 8];
            frame.extend_from_slice(&0u32.to_le_bytes());
            frame.extend_from_slice(b"01 Jan 2025\0");
            dev.send(&frame);
        }
    });

    assert!(companion.device_info().is_none());
    let info = companion.query_device(&defaults()).unwrap();
    assert_eq!(info.max_contacts(), 100);
    assert_eq!(info.build_date, "01 Jan 2025");
    assert_eq!(companion.device_info(), Some(info));
}

#[test]
fn test_set_device_time_and_channel() {
    let (companion, device) = connected(Framing::SelfFraming, |cmd, dev| {
        match cmd[0] {
            CMD_SET_DEVICE_TIME | CMD_SET_CHANNEL => dev.send(&ok_frame()),
            _ => {}
        }
    });

    companion.set_device_time(0x0102_0304, &defaults()).unwrap();
    companion
        .set_channel(1, "Ops", &[0xAA; 4], &defaults())
        .unwrap();

    companion.close().unwrap();
    let seen = device.finish();
    assert_eq!(
        commands_with(&seen, CMD_SET_DEVICE_TIME),
        vec![vec![CMD_SET_DEVICE_TIME, 0x04, 0x03, 0x02, 0x01]]
    );
    let set = &commands_with(&seen, CMD_SET_CHANNEL)[0];
    assert_eq!(set[1], 1);
    assert_eq!(&set[2..5], b"Ops");
}

// ============================================================================
// Chunked messages
// ============================================================================

#[test]
fn test_long_direct_message_sent_in_chunks() {
    let (companion, device) = connected(Framing::Delimited, |cmd, dev| {
        if cmd[0] == CMD_SEND_TXT_MSG {
            dev.send(&sent_frame(0xABCD));
        }
    });

    let mut progress = Vec::new();
    let ok = companion
        .message_sender()
        .with_limit(10)
        .send_direct(&RECIPIENT, "hello world again", |p| progress.push(p))
        .unwrap();
    assert!(ok);
    assert_eq!(progress.first(), Some(&ChunkProgress::Sending { index: 0, total: 3 }));
    assert_eq!(
        progress.last(),
        Some(&ChunkProgress::Complete {
            total: 3,
            success: true
        })
    );

    companion.close().unwrap();
    let texts: Vec<Vec<u8>> = commands_with(&device.finish(), CMD_SEND_TXT_MSG)
        .iter()
        .map(|c| {
            assert_eq!(&c[7..13], &RECIPIENT);
            c[DIRECT_TEXT_AT..].to_vec()
        })
        .collect();
    assert_eq!(texts, vec![b"hello".to_vec(), b"world".to_vec(), b"again".to_vec()]);
}

#[test]
fn test_failed_chunk_reported_and_rest_sent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (companion, device) = connected(Framing::SelfFraming, move |cmd, dev| {
        if cmd[0] == CMD_SEND_TXT_MSG {
            if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                dev.send(&err_frame(ERR_CODE_TABLE_FULL));
            } else {
                dev.send(&sent_frame(1));
            }
        }
    });

    let mut progress = Vec::new();
    let ok = companion
        .message_sender()
        .with_limit(4)
        .send_direct(&RECIPIENT, "aaaa bbbb cccc", |p| progress.push(p))
        .unwrap();
    assert!(!ok);
    assert!(progress.contains(&ChunkProgress::Sent {
        index: 1,
        total: 3,
        success: false
    }));
    assert!(progress.contains(&ChunkProgress::Sent {
        index: 2,
        total: 3,
        success: true
    }));
    assert_eq!(
        progress.last(),
        Some(&ChunkProgress::Complete {
            total: 3,
            success: false
        })
    );

    companion.close().unwrap();
    assert_eq!(commands_with(&device.finish(), CMD_SEND_TXT_MSG).len(), 3);
}

#[test]
fn test_chunked_send_rejects_bad_recipient() {
    let (companion, device) = connected(Framing::SelfFraming, |_, _| {});
    let mut progress = Vec::new();
    let err = companion
        .message_sender()
        .send_direct(&[9, 9], "hello", |p| progress.push(p))
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(progress.is_empty());

    companion.close().unwrap();
    assert!(commands_with(&device.finish(), CMD_SEND_TXT_MSG).is_empty());
}

#[test]
fn test_channel_message_chunks() {
    let (companion, device) = connected(Framing::Delimited, |cmd, dev| {
        if cmd[0] == CMD_SEND_CHANNEL_TXT_MSG {
            dev.send(&ok_frame());
        }
    });

    let ok = companion
        .message_sender()
        .with_limit(8)
        .send_channel(3, "line one\nline two", |_| {})
        .unwrap();
    assert!(ok);

    companion.close().unwrap();
    let sends = commands_with(&device.finish(), CMD_SEND_CHANNEL_TXT_MSG);
    assert_eq!(sends.len(), 2);
    assert!(sends.iter().all(|c| c[2] == 3));
    assert_eq!(&sends[0][CHANNEL_TEXT_AT..], b"line one");
    assert_eq!(&sends[1][CHANNEL_TEXT_AT..], b"line two");
}

#[test]
fn test_binary_payload_sent_as_exact_slices() {
    let (companion, device) = connected(Framing::Delimited, |cmd, dev| {
        if cmd[0] == CMD_SEND_TXT_MSG {
            dev.send(&sent_frame(7));
        }
    });

    // Zeros, spaces and newlines must survive untouched.
    let data: Vec<u8> = (0..25u8).map(|i| [0x00, b' ', b'\n', i][usize::from(i % 4)]).collect();
    let mut progress = Vec::new();
    let ok = companion
        .message_sender()
        .with_limit(10)
        .send_direct_exact(&RECIPIENT, &data, |p| progress.push(p))
        .unwrap();
    assert!(ok);
    assert_eq!(progress.len(), 3 * 2 + 1);
    assert_eq!(
        progress.last(),
        Some(&ChunkProgress::Complete {
            total: 3,
            success: true
        })
    );

    companion.close().unwrap();
    let slices: Vec<Vec<u8>> = commands_with(&device.finish(), CMD_SEND_TXT_MSG)
        .iter()
        .map(|c| c[DIRECT_TEXT_AT..].to_vec())
        .collect();
    assert_eq!(slices.len(), 3);
    assert_eq!(slices[0], &data[..10]);
    assert_eq!(slices[1], &data[10..20]);
    assert_eq!(slices[2], &data[20..]);
}

#[test]
fn test_channel_binary_payload_exact_slices() {
    let (companion, device) = connected(Framing::SelfFraming, |cmd, dev| {
        if cmd[0] == CMD_SEND_CHANNEL_TXT_MSG {
            dev.send(&ok_frame());
        }
    });

    let data = b"ab cd\nef gh";
    let ok = companion
        .message_sender()
        .with_limit(4)
        .send_channel_exact(2, data, |_| {})
        .unwrap();
    assert!(ok);

    companion.close().unwrap();
    let sends = commands_with(&device.finish(), CMD_SEND_CHANNEL_TXT_MSG);
    let slices: Vec<&[u8]> = sends.iter().map(|c| &c[CHANNEL_TEXT_AT..]).collect();
    assert_eq!(slices, vec![&b"ab c"[..], b"d\nef", b" gh"]);
    assert!(sends.iter().all(|c| c[2] == 2));
}

#[test]
fn test_chunk_delay_only_between_chunks() {
    const DELAY: Duration = Duration::from_millis(150);
    let (companion, device) = connected(Framing::SelfFraming, |cmd, dev| {
        if cmd[0] == CMD_SEND_TXT_MSG {
            dev.send(&sent_frame(1));
        }
    });

    let mut progress = Vec::new();
    let started = Instant::now();
    let ok = companion
        .message_sender()
        .with_limit(5)
        .with_delay(DELAY)
        .send_direct(&RECIPIENT, "aaaaa bbbbb ccccc", |p| progress.push((p, Instant::now())))
        .unwrap();
    let elapsed = started.elapsed();
    assert!(ok);

    assert!(elapsed >= DELAY * 2, "elapsed {elapsed:?}");
    assert!(elapsed < DELAY * 3, "elapsed {elapsed:?}");

    let (last, complete) = (&progress[progress.len() - 2], &progress[progress.len() - 1]);
    assert_eq!(
        last.0,
        ChunkProgress::Sent {
            index: 2,
            total: 3,
            success: true
        }
    );
    assert!(matches!(complete.0, ChunkProgress::Complete { total: 3, success: true }));
    assert!(complete.1 - last.1 < DELAY / 2);

    companion.close().unwrap();
    assert_eq!(commands_with(&device.finish(), CMD_SEND_TXT_MSG).len(), 3);
}
