//! Transport, automation and generic host-command actions

use super::{ActionCx, ActionRegistry, Behavior};
use crate::feedback::format_time_display;
use crate::host::PlayState;

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("Play", |_| Ok(Box::new(Play)));
    registry.register("Stop", |_| Ok(Box::new(Stop)));
    registry.register("Record", |_| Ok(Box::new(Record)));
    registry.register("Rewind", |_| Ok(Box::new(Rewind)));
    registry.register("FastForward", |_| Ok(Box::new(FastForward)));
    registry.register("CycleTimeline", |_| Ok(Box::new(CycleTimeline)));
    registry.register("TimeDisplay", |_| Ok(Box::new(TimeDisplay)));
    registry.register("CycleTimeDisplayModes", |_| Ok(Box::new(CycleTimeDisplayModes)));
    registry.register("TrackAutoMode", |params| {
        let mode = super::int_param("TrackAutoMode", params, 0)?;
        Ok(Box::new(TrackAutoMode { mode: mode as i32 }))
    });
    registry.register("GlobalAutoMode", |params| {
        let mode = super::int_param("GlobalAutoMode", params, 0)?;
        Ok(Box::new(GlobalAutoMode { mode: mode as i32 }))
    });
    registry.register("Reaper", |params| {
        let command = super::int_param("Reaper", params, 0)?;
        Ok(Box::new(HostCommand {
            command: command as i32,
        }))
    });
}

struct Play;

impl Behavior for Play {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let lit = cx.host.play_state().shows_play();
        cx.set_value(if lit { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.host.play();
        }
    }
}

struct Stop;

impl Behavior for Stop {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let lit = matches!(
            cx.host.play_state(),
            PlayState::Stopped | PlayState::Paused | PlayState::RecordPaused
        );
        cx.set_value(if lit { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.host.stop();
        }
    }
}

struct Record;

impl Behavior for Record {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let lit = matches!(
            cx.host.play_state(),
            PlayState::Recording | PlayState::RecordPaused
        );
        cx.set_value(if lit { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.host.record();
        }
    }
}

struct Rewind;

impl Behavior for Rewind {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.host.rewind();
        }
    }
}

struct FastForward;

impl Behavior for FastForward {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.host.fast_forward();
        }
    }
}

/// Toggle the transport repeat (loop) flag.
struct CycleTimeline;

impl Behavior for CycleTimeline {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        cx.set_value(if cx.host.repeat() { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            let repeat = cx.host.repeat();
            cx.host.set_repeat(!repeat);
        }
    }
}

struct TimeDisplay;

impl Behavior for TimeDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let text = format_time_display(cx.host.playback_position_seconds());
        cx.set_text(&text);
    }
}

struct CycleTimeDisplayModes;

impl Behavior for CycleTimeDisplayModes {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.host.cycle_time_display_mode();
        }
    }
}

struct TrackAutoMode {
    mode: i32,
}

impl Behavior for TrackAutoMode {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let Some(selected) = cx.host.selected_track() else {
            return;
        };
        let lit = cx.host.automation_mode(selected) == self.mode;
        cx.set_value(if lit { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        if let Some(selected) = cx.host.selected_track() {
            cx.host.set_automation_mode(selected, self.mode);
        }
    }
}

struct GlobalAutoMode {
    mode: i32,
}

impl Behavior for GlobalAutoMode {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let lit = cx.host.global_automation_override() == self.mode;
        cx.set_value(if lit { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.host.set_global_automation_override(self.mode);
        }
    }
}

/// Pass-through to a numbered host command, with the command's toggle state as
/// feedback.
struct HostCommand {
    command: i32,
}

impl Behavior for HostCommand {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let on = cx.host.command_state(self.command);
        cx.set_value(if on { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.host.run_command(self.command);
        }
    }
}
