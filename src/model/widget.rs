//! Widgets: named logical controls on a surface
//!
//! A widget owns its feedback processors and caches the last value it showed;
//! input routing (raw protocol pattern to widget) lives on the surface as
//! match tables built while parsing the template file.

use super::ManagerId;
use crate::feedback::{FeedbackProcessor, FeedbackSink};

/// How a (status, data1)-keyed MIDI generator interprets data2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcGenKind {
    /// Absolute 7-bit position.
    Fader7Bit,
    /// Signed relative delta applied to the widget's cached value.
    Encoder,
}

/// OSC input generator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscGenKind {
    /// Every message delivers its float payload.
    Control,
    /// Only non-zero payloads fire, as a 1.0 press.
    PressOnly,
}

/// A named logical control.
#[derive(Debug)]
pub struct Widget {
    name: String,
    is_modifier: bool,
    last_value: f64,
    manager: Option<ManagerId>,
    feedback: Vec<FeedbackProcessor>,
}

impl Widget {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_modifier: false,
            last_value: 0.0,
            manager: None,
            feedback: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Modifier widgets participate in modifier-key resolution instead of
    /// normal dispatch and always resolve to the NoModifiers binding list.
    pub fn is_modifier(&self) -> bool {
        self.is_modifier
    }

    pub fn set_is_modifier(&mut self) {
        self.is_modifier = true;
    }

    pub fn last_value(&self) -> f64 {
        self.last_value
    }

    /// The widget-action manager currently bound to this widget, if any.
    pub fn manager(&self) -> Option<ManagerId> {
        self.manager
    }

    pub fn bind_manager(&mut self, manager: Option<ManagerId>) {
        self.manager = manager;
    }

    pub fn add_feedback(&mut self, processor: FeedbackProcessor) {
        self.feedback.push(processor);
    }

    /// Push a numeric feedback value through every processor.
    pub fn set_value(&mut self, value: f64, sink: &mut dyn FeedbackSink, now_ms: u64) {
        self.last_value = value;
        for processor in &mut self.feedback {
            processor.set_value(value, sink, now_ms);
        }
    }

    /// Push a text feedback value through every processor.
    pub fn set_text(&mut self, text: &str, sink: &mut dyn FeedbackSink, now_ms: u64) {
        for processor in &mut self.feedback {
            processor.set_text(text, sink, now_ms);
        }
    }

    /// Force the neutral display used by ActivateNoAction and surface resets.
    pub fn force_zero(&mut self, sink: &mut dyn FeedbackSink, now_ms: u64) {
        self.set_value(0.0, sink, now_ms);
        self.set_text("", sink, now_ms);
    }

    /// Forget every processor's last-sent payload so the next pass re-sends.
    pub fn clear_feedback_caches(&mut self) {
        for processor in &mut self.feedback {
            processor.clear_cache();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackKind, VecSink};
    use crate::midi::MidiMsg;

    #[test]
    fn set_value_updates_cache_and_fans_out() {
        let mut widget = Widget::new("Fader1");
        widget.add_feedback(FeedbackProcessor::new(
            FeedbackKind::Fader14Bit { status: 0xE0 },
            None,
        ));
        widget.add_feedback(FeedbackProcessor::new(
            FeedbackKind::Osc {
                address: "/fader1".into(),
            },
            None,
        ));

        let mut sink = VecSink::default();
        widget.set_value(0.5, &mut sink, 0);

        assert_eq!(widget.last_value(), 0.5);
        assert_eq!(sink.midi.len(), 1);
        assert_eq!(sink.osc_floats.len(), 1);
    }

    #[test]
    fn force_zero_sends_value_and_blank_text() {
        let mut widget = Widget::new("RotaryA1");
        widget.add_feedback(FeedbackProcessor::new(
            FeedbackKind::TwoState {
                on: MidiMsg::new(0x90, 0x10, 0x7F),
                off: MidiMsg::new(0x90, 0x10, 0x00),
            },
            None,
        ));

        let mut sink = VecSink::default();
        widget.set_value(1.0, &mut sink, 0);
        widget.force_zero(&mut sink, 1);

        assert_eq!(sink.midi.last().unwrap(), &vec![0x90, 0x10, 0x00]);
        assert_eq!(widget.last_value(), 0.0);
    }
}
