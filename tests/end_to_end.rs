//! End-to-end tests through the umbrella crate (requires the "sim" feature).
//!
//! Run with:
//! ```bash
//! cargo test -p usbh-midi --test end_to_end
//! ```

#![cfg(feature = "sim")]

use std::sync::{Arc, Mutex};

use usbh_midi::prelude::*;
use usbh_midi::SystemRealTimeMsg;

/// Route tracing output through the test harness. Safe to call from every test.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Build a registry from a JSON config, the way firmware settings would be loaded.
#[test]
fn test_registry_from_json_config() -> usbh_midi::Result<()> {
    init_tracing();
    let config: HostConfig = serde_json::from_str(
        r#"{ "max_devices": 2, "in_cable_buffer_size": 64, "parser": { "sysex_max_size": 32 } }"#,
    )
    .expect("valid JSON");
    assert_eq!(config.max_cables, 16);
    assert_eq!(config.tx_buffer_size(), 48);

    let registry = RegistryBuilder::new()
        .config(config)
        .build(SimulatedHost::new())?;
    assert_eq!(registry.capacity(), 2);
    Ok(())
}

#[test]
fn test_invalid_config_surfaces_as_umbrella_error() {
    let result = RegistryBuilder::new()
        .in_cable_buffer_size(0)
        .build(SimulatedHost::new())
        .map_err(usbh_midi::Error::from);
    assert!(matches!(result, Err(usbh_midi::Error::Host(_))));
}

/// A keyboard and a clock source share the bus; each cable keeps its own stream.
#[test]
fn test_keyboard_and_clock_session() -> usbh_midi::Result<()> {
    init_tracing();
    let host = SimulatedHost::new();
    let mut registry = RegistryBuilder::new().max_devices(2).build(host.clone())?;

    let mounted = Arc::new(Mutex::new(Vec::new()));
    let sink = mounted.clone();
    registry.set_on_connect(move |dev, _, _| sink.lock().unwrap().push(dev));

    registry.mount_cb(5, 0x81, 0x01, 2, 1);
    registry.mount_cb(7, 0x82, 0x02, 1, 1);
    assert_eq!(mounted.lock().unwrap().as_slice(), &[5, 7]);

    let notes = Arc::new(Mutex::new(Vec::new()));
    let sink = notes.clone();
    registry
        .interface_from_device_and_cable(5, 0)
        .unwrap()
        .parser_mut()
        .set_handle_message(move |msg| sink.lock().unwrap().push(msg.clone()));

    host.push_rx(5, 0, &[0x90, 60, 100, 0x80, 60, 0]);
    host.push_rx(7, 0, &[0xF8, 0xF8]);
    registry.rx_cb(5, 2);
    registry.rx_cb(7, 1);

    // merged bitmap cannot tell the two devices apart; the per-device view can
    let ready = registry.read_all();
    assert_eq!(ready.bitmap(), 0b1);
    assert_eq!(ready.iter().count(), 2);

    while !registry.read_all().is_empty() {}

    assert_eq!(notes.lock().unwrap().len(), 2);
    assert_eq!(
        registry.interface(7, 0).unwrap().parser().last_message(),
        Some(&MidiMsg::SystemRealTime {
            msg: SystemRealTimeMsg::TimingClock
        })
    );

    // echo a note back to the keyboard
    let keyboard = registry.interface_from_device_and_cable(5, 0).unwrap();
    assert!(keyboard.send(&MidiMsg::ChannelVoice {
        channel: Channel::Ch1,
        msg: ChannelVoiceMsg::NoteOn {
            note: 72,
            velocity: 64
        },
    }));
    registry.write_flush_all();
    assert_eq!(host.sent(5, 0), vec![0x90, 72, 64]);

    registry.umount_cb(5);
    assert_eq!(registry.connected_devices().collect::<Vec<_>>(), vec![7]);
    Ok(())
}
