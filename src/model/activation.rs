//! FX and send zone activation policy
//!
//! These managers decide which zones are live whenever the selected or focused
//! track changes: send slots map to `Send<n>` zones, FX menus to `FXMenu<n>`
//! zones, and plugin zones are named after the FX they control. Slots past the
//! real host object count activate in the NoAction state so the hardware shows
//! a neutral display.

use super::surface::Surface;
use crate::config::SurfaceDef;
use crate::feedback::FeedbackSink;
use crate::host::{Host, TrackRef};

/// Send-slot activation state for one surface.
#[derive(Debug, Default)]
pub struct SendsActivation {
    should_map: bool,
    num_slots: usize,
    active_zones: Vec<String>,
}

impl SendsActivation {
    pub fn from_def(def: &SurfaceDef) -> Self {
        Self {
            should_map: def.auto_map_sends,
            num_slots: 0,
            active_zones: Vec::new(),
        }
    }

    pub fn set_num_slots(&mut self, slots: usize) {
        self.num_slots = slots;
    }

    pub fn add_slot(&mut self) {
        self.num_slots += 1;
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn should_map(&self) -> bool {
        self.should_map
    }

    pub fn active_zones(&self) -> &[String] {
        &self.active_zones
    }
}

/// FX activation state for one surface: selected-track FX zones, FX menu
/// slots, menu-launched FX zones and the focused-FX zone.
#[derive(Debug, Default)]
pub struct FxActivation {
    should_map_selected: bool,
    should_map_menus: bool,
    should_map_focused: bool,
    num_menu_slots: usize,
    active_selected_zones: Vec<String>,
    active_menu_zones: Vec<String>,
    active_menu_fx_zones: Vec<String>,
    active_focused_zones: Vec<String>,
    open_windows: Vec<(TrackRef, usize)>,
}

impl FxActivation {
    pub fn from_def(def: &SurfaceDef) -> Self {
        Self {
            should_map_selected: def.auto_map_fx,
            should_map_menus: def.auto_map_fx_menu,
            should_map_focused: def.auto_map_focused_fx,
            ..Self::default()
        }
    }

    pub fn set_num_menu_slots(&mut self, slots: usize) {
        self.num_menu_slots = slots;
    }

    pub fn add_menu_slot(&mut self) {
        self.num_menu_slots += 1;
    }

    pub fn num_menu_slots(&self) -> usize {
        self.num_menu_slots
    }

    pub fn should_map_selected(&self) -> bool {
        self.should_map_selected
    }

    pub fn should_map_focused(&self) -> bool {
        self.should_map_focused
    }

    /// Every FX-related zone currently active, for parent-slot resolution.
    pub fn active_zones(&self) -> Vec<String> {
        let mut zones = self.active_selected_zones.clone();
        zones.extend(self.active_menu_zones.iter().cloned());
        zones.extend(self.active_menu_fx_zones.iter().cloned());
        zones.extend(self.active_focused_zones.iter().cloned());
        zones
    }
}

impl Surface {
    // ------------------------------------------------------------------
    // Sends
    // ------------------------------------------------------------------

    /// (Re)activate the `Send<n>` slot zones for the selected track. Slots
    /// past the track's real send count activate NoAction with zeroed widgets.
    pub fn map_selected_track_sends(
        &mut self,
        host: &dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
    ) {
        let active = std::mem::take(&mut self.sends.active_zones);
        for zone in &active {
            self.deactivate_zone(zone);
        }

        let Some(track) = host.selected_track() else {
            return;
        };
        if !self.sends.should_map {
            return;
        }

        let num_sends = host.send_count(track);
        for slot in 0..self.sends.num_slots {
            let zone_name = format!("Send{}", slot + 1);
            if self.zone(&zone_name).is_none() {
                continue;
            }
            if slot < num_sends {
                self.activate_zone(&zone_name, slot, sink, now_ms);
            } else {
                self.activate_zone_no_action(&zone_name, slot, sink, now_ms);
            }
            self.sends.active_zones.push(zone_name);
        }
    }

    /// Flip send mapping; turning it off deactivates every live send zone.
    pub fn toggle_map_sends(&mut self) {
        self.sends.should_map = !self.sends.should_map;
        if !self.sends.should_map {
            let active = std::mem::take(&mut self.sends.active_zones);
            for zone in &active {
                self.deactivate_zone(zone);
            }
        }
    }

    // ------------------------------------------------------------------
    // Selected-track FX
    // ------------------------------------------------------------------

    /// (Re)activate the zones named after the selected track's FX. Zones with
    /// a FocusedFXNavigator belong to focused-FX mapping and are skipped.
    pub fn map_selected_track_fx(
        &mut self,
        host: &mut dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
        show_windows: bool,
    ) {
        let active = std::mem::take(&mut self.fx.active_selected_zones);
        for zone in &active {
            self.deactivate_zone(zone);
        }
        self.close_fx_windows(host);

        let Some(track) = host.selected_track() else {
            return;
        };
        if !self.fx.should_map_selected {
            return;
        }

        for fx in 0..host.fx_count(track) {
            let fx_name = host.fx_name(track, fx);
            let Some(zone) = self.zone(&fx_name) else {
                continue;
            };
            if zone.has_focused_fx_navigator {
                continue;
            }
            self.activate_zone(&fx_name, fx, sink, now_ms);
            self.fx.active_selected_zones.push(fx_name);
            self.fx.open_windows.push((track, fx));
        }

        if show_windows {
            let windows = self.fx.open_windows.clone();
            for (track, fx) in windows {
                host.open_fx_window(track, fx);
            }
        }
    }

    pub fn toggle_map_fx(&mut self, host: &mut dyn Host) {
        self.fx.should_map_selected = !self.fx.should_map_selected;
        if !self.fx.should_map_selected {
            let active = std::mem::take(&mut self.fx.active_selected_zones);
            for zone in &active {
                self.deactivate_zone(zone);
            }
            self.close_fx_windows(host);
        }
    }

    fn close_fx_windows(&mut self, host: &mut dyn Host) {
        for (track, fx) in std::mem::take(&mut self.fx.open_windows) {
            host.close_fx_window(track, fx);
        }
    }

    // ------------------------------------------------------------------
    // FX menu
    // ------------------------------------------------------------------

    /// (Re)activate the `FXMenu<n>` slot zones for the selected track, and
    /// drop any FX zone a menu selection had launched.
    pub fn map_selected_track_fx_menu(
        &mut self,
        host: &dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
    ) {
        for list in [
            std::mem::take(&mut self.fx.active_menu_zones),
            std::mem::take(&mut self.fx.active_menu_fx_zones),
        ] {
            for zone in &list {
                self.deactivate_zone(zone);
            }
        }

        let Some(track) = host.selected_track() else {
            return;
        };
        if !self.fx.should_map_menus {
            return;
        }

        let num_fx = host.fx_count(track);
        for slot in 0..self.fx.num_menu_slots {
            let zone_name = format!("FXMenu{}", slot + 1);
            if self.zone(&zone_name).is_none() {
                continue;
            }
            if slot < num_fx {
                self.activate_zone(&zone_name, slot, sink, now_ms);
            } else {
                self.activate_zone_no_action(&zone_name, slot, sink, now_ms);
            }
            self.fx.active_menu_zones.push(zone_name);
        }
    }

    pub fn toggle_map_fx_menu(&mut self) {
        self.fx.should_map_menus = !self.fx.should_map_menus;
        if !self.fx.should_map_menus {
            let active = std::mem::take(&mut self.fx.active_menu_zones);
            for zone in &active {
                self.deactivate_zone(zone);
            }
        }
    }

    /// Activate the FX zone for one menu slot selection (GoFXSlot).
    pub fn map_fx_slot(
        &mut self,
        host: &dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
        fx_slot: usize,
    ) {
        let Some(track) = host.selected_track() else {
            return;
        };
        if fx_slot >= host.fx_count(track) {
            return;
        }
        let fx_name = host.fx_name(track, fx_slot);
        let Some(zone) = self.zone(&fx_name) else {
            return;
        };
        if zone.has_focused_fx_navigator {
            return;
        }
        self.activate_zone(&fx_name, fx_slot, sink, now_ms);
        self.fx.active_menu_fx_zones.push(fx_name);
    }

    // ------------------------------------------------------------------
    // Focused FX
    // ------------------------------------------------------------------

    /// (Re)activate the zone for the plugin editor holding keyboard focus.
    /// Only zones declaring a FocusedFXNavigator participate.
    pub fn map_focused_fx(
        &mut self,
        host: &dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
    ) {
        let active = std::mem::take(&mut self.fx.active_focused_zones);
        for zone in &active {
            self.deactivate_zone(zone);
        }

        if !self.fx.should_map_focused {
            return;
        }
        let Some((track, fx)) = host.focused_fx() else {
            return;
        };

        let fx_name = host.fx_name(track, fx);
        let Some(zone) = self.zone(&fx_name) else {
            return;
        };
        if !zone.has_focused_fx_navigator {
            return;
        }
        self.activate_zone(&fx_name, fx, sink, now_ms);
        self.fx.active_focused_zones.push(fx_name);
    }

    pub fn toggle_map_focused_fx(&mut self) {
        self.fx.should_map_focused = !self.fx.should_map_focused;
    }
}
