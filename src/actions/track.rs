//! Track actions: mixer controls, selection, touch and channel displays

use super::{ActionCx, ActionRegistry, Behavior, Effect};
use crate::host::TrackRef;

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("TrackVolume", |_| Ok(Box::new(TrackVolume)));
    registry.register("TrackPan", |_| Ok(Box::new(TrackPan)));
    registry.register("TrackPanWidth", |_| Ok(Box::new(TrackPanWidth)));
    registry.register("TrackMute", |_| Ok(Box::new(TrackMute)));
    registry.register("TrackSolo", |_| Ok(Box::new(TrackSolo)));
    registry.register("TrackRecordArm", |_| Ok(Box::new(TrackRecordArm)));
    registry.register("TrackSelect", |_| Ok(Box::new(TrackSelect)));
    registry.register("TrackUniqueSelect", |_| Ok(Box::new(TrackUniqueSelect)));
    registry.register("TrackRangeSelect", |_| Ok(Box::new(TrackRangeSelect)));
    registry.register("TrackTouch", |_| Ok(Box::new(SetTrackTouch)));
    registry.register("TrackNameDisplay", |_| Ok(Box::new(TrackNameDisplay)));
    registry.register("TrackVolumeDisplay", |_| Ok(Box::new(TrackVolumeDisplay)));
    registry.register("TrackPanDisplay", |_| Ok(Box::new(TrackPanDisplay)));
    registry.register("TrackPanWidthDisplay", |_| Ok(Box::new(TrackPanWidthDisplay)));
    registry.register("TrackOutputMeter", |params| {
        let channel = super::int_param("TrackOutputMeter", params, 0).unwrap_or(0);
        Ok(Box::new(TrackOutputMeter {
            channel: channel.max(0) as usize,
        }))
    });
    registry.register("MasterTrackVolume", |_| Ok(Box::new(MasterTrackVolume)));
    registry.register("MasterTrackUniqueSelect", |_| {
        Ok(Box::new(MasterTrackUniqueSelect))
    });
    registry.register("MasterTrackTouch", |_| Ok(Box::new(SetMasterTrackTouch)));
    registry.register("MasterTrackOutputMeter", |params| {
        let channel = super::int_param("MasterTrackOutputMeter", params, 0).unwrap_or(0);
        Ok(Box::new(MasterTrackOutputMeter {
            channel: channel.max(0) as usize,
        }))
    });
}

struct TrackVolume;

impl Behavior for TrackVolume {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let value = cx.track.map(|t| cx.host.volume(t)).unwrap_or(0.0);
        cx.set_value(value);
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if let Some(track) = cx.track {
            cx.host.set_volume(track, value);
        }
    }
}

struct TrackPan;

impl Behavior for TrackPan {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let value = cx.track.map(|t| cx.host.pan(t)).unwrap_or(0.5);
        cx.set_value(value);
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if let Some(track) = cx.track {
            cx.host.set_pan(track, value);
        }
    }
}

struct TrackPanWidth;

impl Behavior for TrackPanWidth {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let value = cx.track.map(|t| cx.host.pan_width(t)).unwrap_or(1.0);
        cx.set_value(value);
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if let Some(track) = cx.track {
            cx.host.set_pan_width(track, value);
        }
    }
}

struct TrackMute;

impl Behavior for TrackMute {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let muted = cx.track.map(|t| cx.host.mute(t)).unwrap_or(false);
        cx.set_value(if muted { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return; // act on press only
        }
        if let Some(track) = cx.track {
            let muted = cx.host.mute(track);
            cx.host.set_mute(track, !muted);
        }
    }
}

struct TrackSolo;

impl Behavior for TrackSolo {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let solo = cx.track.map(|t| cx.host.solo(t)).unwrap_or(false);
        cx.set_value(if solo { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        if let Some(track) = cx.track {
            let solo = cx.host.solo(track);
            cx.host.set_solo(track, !solo);
        }
    }
}

struct TrackRecordArm;

impl Behavior for TrackRecordArm {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let armed = cx.track.map(|t| cx.host.record_arm(t)).unwrap_or(false);
        cx.set_value(if armed { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        if let Some(track) = cx.track {
            let armed = cx.host.record_arm(track);
            cx.host.set_record_arm(track, !armed);
        }
    }
}

struct TrackSelect;

impl Behavior for TrackSelect {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let selected = cx.track.map(|t| cx.host.is_selected(t)).unwrap_or(false);
        cx.set_value(if selected { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        if let Some(track) = cx.track {
            let selected = cx.host.is_selected(track);
            cx.host.set_selected(track, !selected);
            cx.effects.push(Effect::TrackSelected);
        }
    }
}

struct TrackUniqueSelect;

impl Behavior for TrackUniqueSelect {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let selected = cx.track.map(|t| cx.host.is_selected(t)).unwrap_or(false);
        cx.set_value(if selected { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        if let Some(track) = cx.track {
            cx.host.select_only(track);
            cx.effects.push(Effect::TrackSelected);
        }
    }
}

/// Select the contiguous range between the single currently selected track and
/// this channel's track. A no-op unless exactly one track is selected.
struct TrackRangeSelect;

impl Behavior for TrackRangeSelect {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let selected = cx.track.map(|t| cx.host.is_selected(t)).unwrap_or(false);
        cx.set_value(if selected { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        let Some(track) = cx.track else {
            return;
        };

        let mut selected_indices = Vec::new();
        for i in 0..cx.host.track_count() {
            if let Some(t) = cx.host.track_at(i) {
                if cx.host.is_selected(t) {
                    selected_indices.push(i);
                }
            }
        }
        let (Some(&anchor), 1) = (selected_indices.first(), selected_indices.len()) else {
            return;
        };
        let Some(target) = cx.host.track_index(track) else {
            return;
        };

        let (lo, hi) = (anchor.min(target), anchor.max(target));
        for i in lo..=hi {
            if let Some(t) = cx.host.track_at(i) {
                cx.host.set_selected(t, true);
            }
        }
        cx.effects.push(Effect::TrackSelected);
    }
}

/// Report fader touch for the bound channel to the page.
struct SetTrackTouch;

impl Behavior for SetTrackTouch {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if let Some(navigator) = cx.navigator {
            cx.page.navigators.set_touched(navigator, value != 0.0);
        }
    }
}

struct SetMasterTrackTouch;

impl Behavior for SetMasterTrackTouch {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        cx.page.master_touched = value != 0.0;
    }
}

struct TrackNameDisplay;

impl Behavior for TrackNameDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let name = cx.track.map(|t| cx.host.track_name(t)).unwrap_or_default();
        cx.set_text(&name);
    }
}

struct TrackVolumeDisplay;

impl Behavior for TrackVolumeDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let text = match cx.track {
            Some(track) => format!("{:7.2}", cx.host.volume_db(track)),
            None => String::new(),
        };
        cx.set_text(&text);
    }
}

/// Pan position as the classic scribble-strip arrows: "<  63", "  <C>  ",
/// " 42  >".
fn format_pan(pan_normalized: f64) -> String {
    let signed = pan_normalized * 2.0 - 1.0;
    let percent = (signed.abs() * 100.0).round() as i32;
    if percent == 0 {
        return "  <C>  ".to_string();
    }
    if signed < 0.0 {
        format!("<{:>4}  ", percent)
    } else {
        format!("  {:<4}>", percent)
    }
}

struct TrackPanDisplay;

impl Behavior for TrackPanDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let text = match cx.track {
            Some(track) => format_pan(cx.host.pan(track)),
            None => String::new(),
        };
        cx.set_text(&text);
    }
}

struct TrackPanWidthDisplay;

impl Behavior for TrackPanWidthDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let text = match cx.track {
            Some(track) => {
                let width = (cx.host.pan_width(track) * 100.0).round() as i32;
                if width == 0 {
                    " <Mno> ".to_string()
                } else {
                    format!("{}", width)
                }
            }
            None => String::new(),
        };
        cx.set_text(&text);
    }
}

struct TrackOutputMeter {
    channel: usize,
}

impl Behavior for TrackOutputMeter {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let level = match (cx.track, cx.host.play_state().is_rolling()) {
            (Some(track), true) => cx.host.track_peak(track, self.channel),
            _ => 0.0,
        };
        cx.set_value(level);
    }
}

fn master(cx: &ActionCx<'_>) -> TrackRef {
    cx.host.master_track()
}

struct MasterTrackVolume;

impl Behavior for MasterTrackVolume {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let value = cx.host.volume(master(cx));
        cx.set_value(value);
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        let track = master(cx);
        cx.host.set_volume(track, value);
    }
}

struct MasterTrackUniqueSelect;

impl Behavior for MasterTrackUniqueSelect {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        let track = master(cx);
        cx.host.select_only(track);
        cx.effects.push(Effect::TrackSelected);
    }
}

struct MasterTrackOutputMeter {
    channel: usize,
}

impl Behavior for MasterTrackOutputMeter {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let level = if cx.host.play_state().is_rolling() {
            cx.host.track_peak(master(cx), self.channel)
        } else {
            0.0
        };
        cx.set_value(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_display_formats() {
        assert_eq!(format_pan(0.5), "  <C>  ");
        assert!(format_pan(0.0).starts_with('<'));
        assert!(format_pan(1.0).ends_with('>'));
    }
}
