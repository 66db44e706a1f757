//! Feedback dispatch
//!
//! Every outbound feedback processor caches the last payload it actually sent.
//! A new value produces a protocol message only when it differs from the cache,
//! or when the configured refresh interval has elapsed since the last send.
//! The refresh path exists for hardware that forgets state after inactivity
//! (motorized faders, LED rings); the dedupe path keeps chatty update passes
//! off the wire.

use crate::midi::{convert, MidiMsg};

/// Destination for encoded feedback, implemented by the engine per surface and
/// by a recording sink in tests.
pub trait FeedbackSink {
    fn midi(&mut self, bytes: &[u8]);
    fn osc_float(&mut self, address: &str, value: f32);
    fn osc_string(&mut self, address: &str, value: &str);
}

/// Recording sink used by the test suite.
#[derive(Debug, Default)]
pub struct VecSink {
    pub midi: Vec<Vec<u8>>,
    pub osc_floats: Vec<(String, f32)>,
    pub osc_strings: Vec<(String, String)>,
}

impl FeedbackSink for VecSink {
    fn midi(&mut self, bytes: &[u8]) {
        self.midi.push(bytes.to_vec());
    }

    fn osc_float(&mut self, address: &str, value: f32) {
        self.osc_floats.push((address.to_string(), value));
    }

    fn osc_string(&mut self, address: &str, value: &str) {
        self.osc_strings.push((address.to_string(), value.to_string()));
    }
}

/// The dedupe/refresh gate. `send iff changed || (refresh && now - last >= interval)`.
#[derive(Debug, Clone, Default)]
struct SendGate {
    refresh_interval_ms: Option<u64>,
    last_sent_ms: Option<u64>,
}

impl SendGate {
    fn new(refresh_interval_ms: Option<u64>) -> Self {
        Self {
            refresh_interval_ms,
            last_sent_ms: None,
        }
    }

    fn should_send(&mut self, changed: bool, now_ms: u64) -> bool {
        let due = match (self.last_sent_ms, self.refresh_interval_ms) {
            (None, _) => true,
            (Some(last), Some(interval)) => now_ms.saturating_sub(last) >= interval,
            (Some(_), None) => false,
        };
        if changed || due {
            self.last_sent_ms = Some(now_ms);
            true
        } else {
            false
        }
    }

    fn clear(&mut self) {
        self.last_sent_ms = None;
    }
}

/// Protocol-specific encoding for one feedback output of a widget.
#[derive(Debug, Clone)]
pub enum FeedbackKind {
    /// Two fixed messages, `on` for any non-zero value.
    TwoState { on: MidiMsg, off: MidiMsg },
    /// Pitch-bend style 14-bit position on the template's status byte.
    Fader14Bit { status: u8 },
    /// 7-bit position in data2.
    Fader7Bit { msg: MidiMsg },
    /// Encoder ring position in data2.
    Encoder { msg: MidiMsg },
    /// Meter level in data2.
    VuMeter { msg: MidiMsg },
    /// Gain reduction meter; level is inverted (full scale = no reduction).
    GainReductionMeter { msg: MidiMsg },
    /// MCU master time display: one CC per seven-segment digit.
    McuTimeDisplay,
    /// MCU channel meter via channel pressure, high nibble selects the strip.
    McuVuMeter { index: u8 },
    /// MCU-family scribble strip cell (7 chars) addressed over SysEx.
    McuDisplay {
        /// 0 = upper row, 1 = lower row.
        row: u8,
        /// SysEx device id: 0x14 MCU, 0x15 extender, 0x17 C4.
        device: u8,
        /// Second header byte; 0x12 for MCU/XT, 0x30 + row block for C4.
        header: u8,
        /// Cell index within the row.
        index: u8,
    },
    /// OSC address; floats and strings are cached independently.
    Osc { address: String },
}

/// Cached last-sent payload, matching the kind's comparison unit. OSC caches
/// float and string payloads independently.
#[derive(Debug, Clone, Default)]
enum SentPayload {
    #[default]
    None,
    Bytes([u8; 3]),
    Short([u8; 2]),
    Text(String),
    Osc {
        float: Option<f32>,
        text: Option<String>,
    },
}

/// One feedback output: encoding, send gate and last-sent cache.
#[derive(Debug, Clone)]
pub struct FeedbackProcessor {
    kind: FeedbackKind,
    gate: SendGate,
    sent: SentPayload,
}

impl FeedbackProcessor {
    pub fn new(kind: FeedbackKind, refresh_interval_ms: Option<u64>) -> Self {
        Self {
            kind,
            gate: SendGate::new(refresh_interval_ms),
            sent: SentPayload::None,
        }
    }

    /// Forget the last-sent payload so the next value goes out unconditionally.
    pub fn clear_cache(&mut self) {
        self.sent = SentPayload::None;
        self.gate.clear();
    }

    /// Deliver a numeric value.
    pub fn set_value(&mut self, value: f64, sink: &mut dyn FeedbackSink, now_ms: u64) {
        match &self.kind {
            FeedbackKind::TwoState { on, off } => {
                let msg = if value != 0.0 { on } else { off };
                self.send_triple(msg.bytes(), sink, now_ms);
            }
            FeedbackKind::Fader14Bit { status } => {
                let (lsb, msb) = convert::split_14bit(convert::to_14bit(value));
                self.send_triple([*status, lsb, msb], sink, now_ms);
            }
            FeedbackKind::Fader7Bit { msg }
            | FeedbackKind::Encoder { msg }
            | FeedbackKind::VuMeter { msg } => {
                let bytes = [msg.status, msg.data1, convert::to_7bit(value)];
                self.send_triple(bytes, sink, now_ms);
            }
            FeedbackKind::GainReductionMeter { msg } => {
                let bytes = [msg.status, msg.data1, convert::to_7bit(1.0 - value.clamp(0.0, 1.0))];
                self.send_triple(bytes, sink, now_ms);
            }
            FeedbackKind::McuVuMeter { index } => {
                let level = (value.clamp(0.0, 1.0) * 0x0F as f64).round() as u8;
                let bytes = [0xD0, (index << 4) | level];
                let changed = !matches!(self.sent, SentPayload::Short(prev) if prev == bytes);
                if self.gate.should_send(changed, now_ms) {
                    self.sent = SentPayload::Short(bytes);
                    sink.midi(&bytes);
                }
            }
            FeedbackKind::Osc { address } => {
                let v = value as f32;
                let (float, text) = match &self.sent {
                    SentPayload::Osc { float, text } => (*float, text.clone()),
                    _ => (None, None),
                };
                let changed = float != Some(v);
                if self.gate.should_send(changed, now_ms) {
                    self.sent = SentPayload::Osc {
                        float: Some(v),
                        text,
                    };
                    sink.osc_float(address, v);
                }
            }
            FeedbackKind::McuTimeDisplay | FeedbackKind::McuDisplay { .. } => {
                // Text-driven outputs ignore numeric values except the forced
                // zero used by ActivateNoAction, which blanks them.
                if value == 0.0 {
                    self.set_text("", sink, now_ms);
                }
            }
        }
    }

    /// Deliver a text value.
    pub fn set_text(&mut self, text: &str, sink: &mut dyn FeedbackSink, now_ms: u64) {
        match &self.kind {
            FeedbackKind::McuDisplay {
                row,
                device,
                header,
                index,
            } => {
                let cell = format!("{:<7.7}", text);
                let changed = !matches!(&self.sent, SentPayload::Text(prev) if *prev == cell);
                if self.gate.should_send(changed, now_ms) {
                    let offset = index * 7 + row * 56;
                    let mut sysex = vec![0xF0, 0x00, 0x00, 0x66, *device, *header, offset];
                    sysex.extend(cell.bytes());
                    sysex.push(0xF7);
                    self.sent = SentPayload::Text(cell);
                    sink.midi(&sysex);
                }
            }
            FeedbackKind::McuTimeDisplay => {
                // Ten 7-segment digits, one CC each, addressed right to left.
                let digits = format!("{:>10.10}", text);
                let changed = !matches!(&self.sent, SentPayload::Text(prev) if *prev == digits);
                if self.gate.should_send(changed, now_ms) {
                    for (i, ch) in digits.chars().rev().enumerate() {
                        sink.midi(&[0xB0, 0x40 + i as u8, ch as u8 & 0x7F]);
                    }
                    self.sent = SentPayload::Text(digits);
                }
            }
            FeedbackKind::Osc { address } => {
                let (float, prev_text) = match &self.sent {
                    SentPayload::Osc { float, text } => (*float, text.clone()),
                    _ => (None, None),
                };
                let changed = prev_text.as_deref() != Some(text);
                if self.gate.should_send(changed, now_ms) {
                    self.sent = SentPayload::Osc {
                        float,
                        text: Some(text.to_string()),
                    };
                    sink.osc_string(address, text);
                }
            }
            // Byte-oriented outputs have no text representation.
            _ => {}
        }
    }

    fn send_triple(&mut self, bytes: [u8; 3], sink: &mut dyn FeedbackSink, now_ms: u64) {
        let changed = !matches!(self.sent, SentPayload::Bytes(prev) if prev == bytes);
        if self.gate.should_send(changed, now_ms) {
            self.sent = SentPayload::Bytes(bytes);
            sink.midi(&bytes);
        }
    }
}

/// Render a playback position in seconds as the `h:mm:ss:ff` string the time
/// display shows (30 frames per second).
pub fn format_time_display(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let h = (seconds / 3600.0) as u64;
    let m = ((seconds / 60.0) as u64) % 60;
    let s = (seconds as u64) % 60;
    let f = ((seconds - seconds.floor()) * 30.0) as u64;
    format!("{}:{:02}:{:02}:{:02}", h, m, s, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fader() -> FeedbackProcessor {
        FeedbackProcessor::new(FeedbackKind::Fader14Bit { status: 0xE0 }, None)
    }

    #[test]
    fn identical_values_send_once() {
        let mut fp = fader();
        let mut sink = VecSink::default();

        fp.set_value(0.5, &mut sink, 0);
        fp.set_value(0.5, &mut sink, 10);
        fp.set_value(0.5, &mut sink, 20);

        assert_eq!(sink.midi.len(), 1);
    }

    #[test]
    fn changed_value_sends_again() {
        let mut fp = fader();
        let mut sink = VecSink::default();

        fp.set_value(0.25, &mut sink, 0);
        fp.set_value(0.75, &mut sink, 1);

        assert_eq!(sink.midi.len(), 2);
    }

    #[test]
    fn refresh_interval_resends_identical_value() {
        let mut fp = FeedbackProcessor::new(FeedbackKind::Fader14Bit { status: 0xE0 }, Some(100));
        let mut sink = VecSink::default();

        fp.set_value(0.5, &mut sink, 0);
        fp.set_value(0.5, &mut sink, 50); // within interval, deduped
        fp.set_value(0.5, &mut sink, 100); // interval elapsed, resent

        assert_eq!(sink.midi.len(), 2);
    }

    #[test]
    fn clear_cache_forces_next_send() {
        let mut fp = fader();
        let mut sink = VecSink::default();

        fp.set_value(0.5, &mut sink, 0);
        fp.clear_cache();
        fp.set_value(0.5, &mut sink, 1);

        assert_eq!(sink.midi.len(), 2);
    }

    #[test]
    fn two_state_picks_message_by_value() {
        let on = MidiMsg::new(0x90, 0x10, 0x7F);
        let off = MidiMsg::new(0x90, 0x10, 0x00);
        let mut fp = FeedbackProcessor::new(FeedbackKind::TwoState { on, off }, None);
        let mut sink = VecSink::default();

        fp.set_value(1.0, &mut sink, 0);
        fp.set_value(0.0, &mut sink, 1);

        assert_eq!(sink.midi, vec![vec![0x90, 0x10, 0x7F], vec![0x90, 0x10, 0x00]]);
    }

    #[test]
    fn osc_float_and_string_cached_independently() {
        let mut fp = FeedbackProcessor::new(
            FeedbackKind::Osc {
                address: "/track/1/volume".into(),
            },
            None,
        );
        let mut sink = VecSink::default();

        fp.set_value(0.5, &mut sink, 0);
        fp.set_text("Vox", &mut sink, 1);
        fp.set_value(0.5, &mut sink, 2); // deduped against the float cache
        fp.set_text("Vox", &mut sink, 3); // deduped against the string cache

        assert_eq!(sink.osc_floats.len(), 1);
        assert_eq!(sink.osc_strings.len(), 1);
    }

    #[test]
    fn mcu_display_pads_cell_to_seven_chars() {
        let mut fp = FeedbackProcessor::new(
            FeedbackKind::McuDisplay {
                row: 1,
                device: 0x14,
                header: 0x12,
                index: 2,
            },
            None,
        );
        let mut sink = VecSink::default();
        fp.set_text("Kick", &mut sink, 0);

        let sysex = &sink.midi[0];
        assert_eq!(&sysex[..7], &[0xF0, 0x00, 0x00, 0x66, 0x14, 0x12, 2 * 7 + 56]);
        assert_eq!(&sysex[7..14], b"Kick   ");
        assert_eq!(*sysex.last().unwrap(), 0xF7);
    }

    #[test]
    fn time_display_renders_digits_once_per_change() {
        let mut fp = FeedbackProcessor::new(FeedbackKind::McuTimeDisplay, None);
        let mut sink = VecSink::default();

        fp.set_text(&format_time_display(61.5), &mut sink, 0);
        assert_eq!(sink.midi.len(), 10);
        fp.set_text(&format_time_display(61.5), &mut sink, 1);
        assert_eq!(sink.midi.len(), 10);
    }

    #[test]
    fn format_time_display_fields() {
        assert_eq!(format_time_display(0.0), "0:00:00:00");
        assert_eq!(format_time_display(3723.5), "1:02:03:15");
    }
}
