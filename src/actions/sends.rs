//! Send actions: slot controls and send mapping control
//!
//! Send actions address the send at the binding zone's activation slot, which
//! the sends activation manager assigned when it mapped `Send<n>` zones.

use super::{ActionCx, ActionRegistry, Behavior, Effect};

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("TrackSendVolume", |_| Ok(Box::new(SendVolume)));
    registry.register("TrackSendPan", |_| Ok(Box::new(SendPan)));
    registry.register("TrackSendMute", |_| Ok(Box::new(SendMute)));
    registry.register("TrackSendNameDisplay", |_| Ok(Box::new(SendNameDisplay)));
    registry.register("TrackSendVolumeDisplay", |_| Ok(Box::new(SendVolumeDisplay)));
    registry.register("MapSelectedTrackSendsToWidgets", |_| {
        Ok(Box::new(MapSelectedTrackSends))
    });
    registry.register("ToggleMapSelectedTrackSends", |_| Ok(Box::new(ToggleMapSends)));
}

struct SendVolume;

impl Behavior for SendVolume {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let value = cx
            .track
            .map(|t| cx.host.send_volume(t, cx.slot))
            .unwrap_or(0.0);
        cx.set_value(value);
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if let Some(track) = cx.track {
            cx.host.set_send_volume(track, cx.slot, value);
        }
    }
}

struct SendPan;

impl Behavior for SendPan {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let value = cx
            .track
            .map(|t| cx.host.send_pan(t, cx.slot))
            .unwrap_or(0.5);
        cx.set_value(value);
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if let Some(track) = cx.track {
            cx.host.set_send_pan(track, cx.slot, value);
        }
    }
}

struct SendMute;

impl Behavior for SendMute {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let muted = cx
            .track
            .map(|t| cx.host.send_mute(t, cx.slot))
            .unwrap_or(false);
        cx.set_value(if muted { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        if let Some(track) = cx.track {
            let muted = cx.host.send_mute(track, cx.slot);
            cx.host.set_send_mute(track, cx.slot, !muted);
        }
    }
}

struct SendNameDisplay;

impl Behavior for SendNameDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let text = cx
            .track
            .map(|t| cx.host.send_name(t, cx.slot))
            .unwrap_or_default();
        cx.set_text(&text);
    }
}

struct SendVolumeDisplay;

impl Behavior for SendVolumeDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let text = match cx.track {
            Some(track) => format!("{:5.2}", cx.host.send_volume(track, cx.slot)),
            None => String::new(),
        };
        cx.set_text(&text);
    }
}

struct MapSelectedTrackSends;

impl Behavior for MapSelectedTrackSends {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.effects.push(Effect::MapSelectedTrackSends {
                surface: cx.surface_name.to_string(),
            });
        }
    }
}

struct ToggleMapSends;

impl Behavior for ToggleMapSends {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.effects.push(Effect::ToggleMapSends {
                surface: cx.surface_name.to_string(),
            });
        }
    }
}
