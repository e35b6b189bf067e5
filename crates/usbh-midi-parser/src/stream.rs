//! MIDI 1.0 byte-stream parser.
//!
//! Handles running status, system common messages, real-time bytes interleaved
//! anywhere in the stream, and bounded SysEx accumulation. Complete messages are
//! decoded with `midi-msg`; SysEx payloads are handed out as raw bytes.

use midi_msg::{Channel, ChannelVoiceMsg, MidiMsg};

use crate::error::Error;
use crate::parser::MessageParser;
use crate::settings::ParserSettings;
use crate::transport::MidiTransport;

type MessageHandler = Box<dyn FnMut(&MidiMsg) + Send>;
type SysExHandler = Box<dyn FnMut(&[u8]) + Send>;
type ErrorHandler = Box<dyn FnMut(&Error) + Send>;

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

/// Length in bytes (status included) of a channel voice message.
#[inline]
fn channel_message_len(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 2,
        _ => 3,
    }
}

/// Length in bytes of a system common message, `None` for undefined statuses.
#[inline]
fn system_common_len(status: u8) -> Option<usize> {
    match status {
        0xF1 | 0xF3 => Some(2),
        0xF2 => Some(3),
        0xF6 => Some(1),
        _ => None,
    }
}

pub struct StreamParser {
    settings: ParserSettings,
    input_channel: Option<Channel>,
    running_status: Option<u8>,
    pending: [u8; 3],
    pending_len: usize,
    expected_len: usize,
    sysex: Vec<u8>,
    in_sysex: bool,
    last_sysex: Vec<u8>,
    last_message: Option<MidiMsg>,
    error_count: u32,
    on_message: Option<MessageHandler>,
    on_sysex: Option<SysExHandler>,
    on_error: Option<ErrorHandler>,
}

impl StreamParser {
    pub fn new(settings: ParserSettings) -> Self {
        let sysex_max = settings.sysex_max_size;
        Self {
            settings,
            input_channel: None,
            running_status: None,
            pending: [0; 3],
            pending_len: 0,
            expected_len: 0,
            sysex: Vec::with_capacity(sysex_max),
            in_sysex: false,
            last_sysex: Vec::with_capacity(sysex_max),
            last_message: None,
            error_count: 0,
            on_message: None,
            on_sysex: None,
            on_error: None,
        }
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Only dispatch channel messages for `channel`; `None` listens on all channels.
    pub fn set_input_channel(&mut self, channel: Option<Channel>) {
        self.input_channel = channel;
    }

    pub fn input_channel(&self) -> Option<Channel> {
        self.input_channel
    }

    pub fn set_handle_message(&mut self, handler: impl FnMut(&MidiMsg) + Send + 'static) {
        self.on_message = Some(Box::new(handler));
    }

    pub fn set_handle_sysex(&mut self, handler: impl FnMut(&[u8]) + Send + 'static) {
        self.on_sysex = Some(Box::new(handler));
    }

    pub fn set_handle_error(&mut self, handler: impl FnMut(&Error) + Send + 'static) {
        self.on_error = Some(Box::new(handler));
    }

    pub fn clear_handlers(&mut self) {
        self.on_message = None;
        self.on_sysex = None;
        self.on_error = None;
    }

    /// Most recently dispatched non-SysEx message.
    pub fn last_message(&self) -> Option<&MidiMsg> {
        self.last_message.as_ref()
    }

    /// Most recently completed SysEx message, F0 and F7 included.
    pub fn last_sysex(&self) -> &[u8] {
        &self.last_sysex
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Feed one byte. Returns `true` if it completed a dispatched message.
    pub fn feed(&mut self, byte: u8) -> bool {
        match byte {
            0xF8..=0xFF => self.real_time(byte),
            SYSEX_START => {
                self.start_sysex();
                false
            }
            SYSEX_END => self.end_sysex(),
            0x80..=0xEF => {
                self.abort_sysex(byte);
                self.running_status = Some(byte);
                self.start_message(byte, channel_message_len(byte))
            }
            0xF1..=0xF6 => {
                self.abort_sysex(byte);
                self.running_status = None;
                match system_common_len(byte) {
                    Some(len) => self.start_message(byte, len),
                    None => {
                        self.pending_len = 0;
                        false
                    }
                }
            }
            _ => self.data_byte(byte),
        }
    }

    fn real_time(&mut self, byte: u8) -> bool {
        // 0xF9 and 0xFD are undefined
        if byte == 0xF9 || byte == 0xFD {
            return false;
        }
        self.decode(&[byte])
    }

    fn start_message(&mut self, status: u8, len: usize) -> bool {
        self.pending[0] = status;
        self.pending_len = 1;
        self.expected_len = len;
        if len == 1 {
            return self.complete();
        }
        false
    }

    fn data_byte(&mut self, byte: u8) -> bool {
        if self.in_sysex {
            // keep one byte free for the terminating F7
            if self.sysex.len() + 1 >= self.settings.sysex_max_size {
                self.in_sysex = false;
                self.sysex.clear();
                self.report(Error::SysExOverflow {
                    max: self.settings.sysex_max_size,
                });
            } else {
                self.sysex.push(byte);
            }
            return false;
        }

        if self.pending_len == 0 {
            match self.running_status {
                Some(status) => {
                    self.pending[0] = status;
                    self.pending_len = 1;
                    self.expected_len = channel_message_len(status);
                }
                None => return false,
            }
        }

        self.pending[self.pending_len] = byte;
        self.pending_len += 1;
        if self.pending_len == self.expected_len {
            return self.complete();
        }
        false
    }

    fn complete(&mut self) -> bool {
        let len = self.expected_len;
        self.pending_len = 0;
        let bytes = self.pending;
        self.decode(&bytes[..len])
    }

    fn decode(&mut self, bytes: &[u8]) -> bool {
        match MidiMsg::from_midi(bytes) {
            Ok((msg, _)) => self.dispatch(msg),
            Err(e) => {
                self.report(e.into());
                false
            }
        }
    }

    fn dispatch(&mut self, msg: MidiMsg) -> bool {
        let msg = match msg {
            MidiMsg::ChannelVoice {
                channel,
                msg: ChannelVoiceMsg::NoteOn { note, velocity: 0 },
            } if self.settings.null_velocity_note_on_as_note_off => MidiMsg::ChannelVoice {
                channel,
                msg: ChannelVoiceMsg::NoteOff { note, velocity: 0 },
            },
            other => other,
        };

        if let (Some(wanted), MidiMsg::ChannelVoice { channel, .. }) = (self.input_channel, &msg) {
            if *channel != wanted {
                return false;
            }
        }

        if let Some(handler) = self.on_message.as_mut() {
            handler(&msg);
        }
        self.last_message = Some(msg);
        true
    }

    fn start_sysex(&mut self) {
        if self.in_sysex {
            self.report(Error::SysExInterrupted { status: SYSEX_START });
        }
        self.running_status = None;
        self.pending_len = 0;
        self.sysex.clear();
        self.sysex.push(SYSEX_START);
        self.in_sysex = true;
    }

    fn end_sysex(&mut self) -> bool {
        if !self.in_sysex {
            return false;
        }
        self.in_sysex = false;
        self.sysex.push(SYSEX_END);
        std::mem::swap(&mut self.sysex, &mut self.last_sysex);
        self.sysex.clear();
        if let Some(handler) = self.on_sysex.as_mut() {
            handler(&self.last_sysex);
        }
        true
    }

    fn abort_sysex(&mut self, status: u8) {
        if self.in_sysex {
            self.in_sysex = false;
            self.sysex.clear();
            self.report(Error::SysExInterrupted { status });
        }
    }

    fn report(&mut self, error: Error) {
        tracing::debug!("MIDI stream error: {}", error);
        self.error_count = self.error_count.saturating_add(1);
        if let Some(handler) = self.on_error.as_mut() {
            handler(&error);
        }
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new(ParserSettings::default())
    }
}

impl MessageParser for StreamParser {
    fn reset(&mut self) {
        self.running_status = None;
        self.pending_len = 0;
        self.expected_len = 0;
        self.in_sysex = false;
        self.sysex.clear();
    }

    fn parse<T: MidiTransport>(&mut self, transport: &mut T) -> bool {
        while transport.available() > 0 {
            let byte = transport.read();
            if self.feed(byte) {
                return true;
            }
            if self.settings.one_byte_parsing {
                return false;
            }
        }
        false
    }
}

impl std::fmt::Debug for StreamParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamParser")
            .field("settings", &self.settings)
            .field("running_status", &self.running_status)
            .field("in_sysex", &self.in_sysex)
            .field("error_count", &self.error_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SliceTransport;
    use midi_msg::SystemRealTimeMsg;
    use std::sync::{Arc, Mutex};

    /// Route the parser's debug events through the test harness.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn note_on(channel: Channel, note: u8, velocity: u8) -> MidiMsg {
        MidiMsg::ChannelVoice {
            channel,
            msg: ChannelVoiceMsg::NoteOn { note, velocity },
        }
    }

    /// Parse everything in `bytes`, collecting each dispatched message.
    fn parse_all(parser: &mut StreamParser, bytes: &[u8]) -> Vec<MidiMsg> {
        let mut transport = SliceTransport::new(bytes);
        let mut out = Vec::new();
        while transport.available() > 0 {
            if parser.parse(&mut transport) {
                out.push(parser.last_message().cloned().unwrap());
            }
        }
        out
    }

    #[test]
    fn test_note_on() {
        let mut parser = StreamParser::default();
        let msgs = parse_all(&mut parser, &[0x90, 0x3C, 0x7F]);
        assert_eq!(msgs, vec![note_on(Channel::Ch1, 0x3C, 0x7F)]);
    }

    #[test]
    fn test_running_status() {
        let mut parser = StreamParser::default();
        let msgs = parse_all(&mut parser, &[0x91, 60, 100, 62, 101, 64, 102]);
        assert_eq!(
            msgs,
            vec![
                note_on(Channel::Ch2, 60, 100),
                note_on(Channel::Ch2, 62, 101),
                note_on(Channel::Ch2, 64, 102),
            ]
        );
    }

    #[test]
    fn test_program_change_is_two_bytes() {
        let mut parser = StreamParser::default();
        let msgs = parse_all(&mut parser, &[0xC0, 5, 6]);
        assert_eq!(msgs.len(), 2);
        assert_eq!(
            msgs[1],
            MidiMsg::ChannelVoice {
                channel: Channel::Ch1,
                msg: ChannelVoiceMsg::ProgramChange { program: 6 },
            }
        );
    }

    #[test]
    fn test_real_time_inside_message() {
        let mut parser = StreamParser::default();
        let msgs = parse_all(&mut parser, &[0x90, 60, 0xF8, 100]);
        assert_eq!(
            msgs,
            vec![
                MidiMsg::SystemRealTime {
                    msg: SystemRealTimeMsg::TimingClock
                },
                note_on(Channel::Ch1, 60, 100),
            ]
        );
    }

    #[test]
    fn test_stray_data_ignored() {
        let mut parser = StreamParser::default();
        let msgs = parse_all(&mut parser, &[0x10, 0x20, 0x90, 60, 100]);
        assert_eq!(msgs, vec![note_on(Channel::Ch1, 60, 100)]);
    }

    #[test]
    fn test_undefined_status_ignored() {
        let mut parser = StreamParser::default();
        let msgs = parse_all(&mut parser, &[0xF9, 0xFD, 0xF4, 0x01]);
        assert!(msgs.is_empty());
        assert_eq!(parser.error_count(), 0);
    }

    #[test]
    fn test_sysex_complete() {
        let mut parser = StreamParser::default();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        parser.set_handle_sysex(move |bytes| sink.lock().unwrap().push(bytes.to_vec()));

        let mut transport = SliceTransport::new(&[0xF0, 0x7E, 0x01, 0x02, 0xF7]);
        assert!(parser.parse(&mut transport));
        assert_eq!(parser.last_sysex(), &[0xF0, 0x7E, 0x01, 0x02, 0xF7]);
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_sysex_overflow_discards() {
        init_tracing();
        let mut parser = StreamParser::new(ParserSettings {
            sysex_max_size: 4,
            ..Default::default()
        });
        let mut transport = SliceTransport::new(&[0xF0, 1, 2, 3, 4, 0xF7]);
        assert!(!parser.parse(&mut transport));
        assert_eq!(parser.error_count(), 1);
        assert!(parser.last_sysex().is_empty());
    }

    #[test]
    fn test_sysex_interrupted_by_status() {
        init_tracing();
        let mut parser = StreamParser::default();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        parser.set_handle_error(move |e| sink.lock().unwrap().push(e.clone()));

        let msgs = parse_all(&mut parser, &[0xF0, 0x01, 0x90, 60, 100]);
        assert_eq!(msgs, vec![note_on(Channel::Ch1, 60, 100)]);
        assert_eq!(
            errors.lock().unwrap().as_slice(),
            &[Error::SysExInterrupted { status: 0x90 }]
        );
    }

    #[test]
    fn test_one_byte_parsing() {
        let mut parser = StreamParser::new(ParserSettings {
            one_byte_parsing: true,
            ..Default::default()
        });
        let mut transport = SliceTransport::new(&[0x90, 60, 100]);
        assert!(!parser.parse(&mut transport));
        assert_eq!(transport.available(), 2);
        assert!(!parser.parse(&mut transport));
        assert!(parser.parse(&mut transport));
        assert_eq!(transport.available(), 0);
    }

    #[test]
    fn test_stops_after_one_message() {
        let mut parser = StreamParser::default();
        let mut transport = SliceTransport::new(&[0x90, 60, 100, 0x80, 60, 0]);
        assert!(parser.parse(&mut transport));
        assert_eq!(transport.available(), 3);
    }

    #[test]
    fn test_input_channel_filter() {
        let mut parser = StreamParser::default();
        parser.set_input_channel(Some(Channel::Ch3));
        let msgs = parse_all(&mut parser, &[0x90, 60, 100, 0x92, 61, 100]);
        assert_eq!(msgs, vec![note_on(Channel::Ch3, 61, 100)]);
    }

    #[test]
    fn test_null_velocity_conversion() {
        let mut parser = StreamParser::new(ParserSettings {
            null_velocity_note_on_as_note_off: true,
            ..Default::default()
        });
        let msgs = parse_all(&mut parser, &[0x90, 60, 0]);
        assert_eq!(
            msgs,
            vec![MidiMsg::ChannelVoice {
                channel: Channel::Ch1,
                msg: ChannelVoiceMsg::NoteOff {
                    note: 60,
                    velocity: 0
                },
            }]
        );
    }

    #[test]
    fn test_reset_drops_partial_message() {
        let mut parser = StreamParser::default();
        parser.feed(0x90);
        parser.feed(60);
        parser.reset();
        assert!(!parser.feed(100));
        assert!(parser.last_message().is_none());
    }

    #[test]
    fn test_message_handler_called() {
        let mut parser = StreamParser::default();
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        parser.set_handle_message(move |_| *sink.lock().unwrap() += 1);
        parse_all(&mut parser, &[0x90, 60, 100, 0xFA]);
        assert_eq!(*count.lock().unwrap(), 2);
    }
}
