//! Navigation, paging, zone and modifier actions

use super::{ActionCx, ActionRegistry, Behavior, Effect};
use crate::model::page::modifier_slot;

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("TrackBank", |params| {
        let stride = super::int_param("TrackBank", params, 0)?;
        Ok(Box::new(TrackBank { stride }))
    });
    registry.register("SelectTrackRelative", |params| {
        let stride = super::int_param("SelectTrackRelative", params, 0)?;
        Ok(Box::new(SelectTrackRelative { stride }))
    });
    registry.register("NextPage", |_| Ok(Box::new(NextPage)));
    registry.register("GoPage", |params| {
        let page = super::str_param("GoPage", params, 0)?;
        Ok(Box::new(GoPage { page }))
    });
    registry.register("GoZone", |params| {
        let zone = super::str_param("GoZone", params, 0)?;
        Ok(Box::new(GoZone { zone }))
    });
    registry.register("ToggleScrollLink", |params| {
        let target = super::int_param("ToggleScrollLink", params, 0).unwrap_or(0);
        Ok(Box::new(ToggleScrollLink {
            target: target.max(0) as usize,
        }))
    });
    registry.register("TogglePin", |_| Ok(Box::new(TogglePin)));

    // Binding one of these marks the widget as a modifier widget; the parser
    // recognizes the action names.
    registry.register("Shift", |_| Ok(Box::new(SetModifier { slot: 0 })));
    registry.register("Option", |_| Ok(Box::new(SetModifier { slot: 1 })));
    registry.register("Control", |_| Ok(Box::new(SetModifier { slot: 2 })));
    registry.register("Alt", |_| Ok(Box::new(SetModifier { slot: 3 })));
}

/// True when an action-type name is one of the four modifier keys.
pub fn is_modifier_action(name: &str) -> bool {
    modifier_slot(name).is_some()
}

struct TrackBank {
    stride: i64,
}

impl Behavior for TrackBank {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.page.navigators.adjust_track_bank(self.stride, cx.host);
        }
    }
}

/// Move the single selected track up or down the track list.
struct SelectTrackRelative {
    stride: i64,
}

impl Behavior for SelectTrackRelative {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        let Some(selected) = cx.host.selected_track() else {
            return;
        };
        let Some(index) = cx.host.track_index(selected) else {
            return;
        };
        let top = cx.host.track_count().saturating_sub(1) as i64;
        let target = (index as i64 + self.stride).clamp(0, top) as usize;
        if let Some(track) = cx.host.track_at(target) {
            cx.host.select_only(track);
            cx.effects.push(Effect::TrackSelected);
        }
    }
}

struct NextPage;

impl Behavior for NextPage {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.effects.push(Effect::NextPage);
        }
    }
}

struct GoPage {
    page: String,
}

impl Behavior for GoPage {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.effects.push(Effect::GoPage {
                page: self.page.clone(),
            });
        }
    }
}

struct GoZone {
    zone: String,
}

impl Behavior for GoZone {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.effects.push(Effect::GoZone {
                surface: cx.surface_name.to_string(),
                zone: self.zone.clone(),
            });
        }
    }
}

struct ToggleScrollLink {
    target: usize,
}

impl Behavior for ToggleScrollLink {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let on = cx.page.navigators.scroll_link();
        cx.set_value(if on { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        let on = !cx.page.navigators.scroll_link();
        cx.page.navigators.set_scroll_link(on);
        cx.page.navigators.set_target_scroll_link_channel(self.target);
        cx.effects.push(Effect::TrackSelected);
    }
}

/// Freeze or release this channel's track mapping.
struct TogglePin;

impl Behavior for TogglePin {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let pinned = cx
            .navigator
            .map(|id| cx.page.navigators.is_pinned(id))
            .unwrap_or(false);
        cx.set_value(if pinned { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value == 0.0 {
            return;
        }
        if let Some(id) = cx.navigator {
            cx.page.navigators.toggle_pin(id, cx.host);
        }
    }
}

/// Press-and-hold modifier key; feedback mirrors the held state.
struct SetModifier {
    slot: usize,
}

impl Behavior for SetModifier {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let held = cx.page.modifier_held(self.slot);
        cx.set_value(if held { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        cx.page.set_modifier(self.slot, value != 0.0);
    }
}
