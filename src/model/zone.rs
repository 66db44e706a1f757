//! Zones and their activation lifecycle
//!
//! A zone is a named bundle of widget-action managers with an optional parent
//! link and a list of included zones resolved after the whole folder has been
//! parsed. Lifecycle: Inactive -> Active(slot) -> Inactive, plus the transient
//! ActivateNoAction(slot) state for slots that exist structurally but have no
//! live host object behind them.

use super::manager::Suppression;
use super::surface::Surface;
use super::ManagerId;
use crate::feedback::FeedbackSink;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneState {
    #[default]
    Inactive,
    Active(usize),
    /// Bound structurally at a slot, feedback forced to zero, Do unwired.
    NoAction(usize),
}

impl ZoneState {
    pub fn slot(&self) -> Option<usize> {
        match self {
            ZoneState::Inactive => None,
            ZoneState::Active(slot) | ZoneState::NoAction(slot) => Some(*slot),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, ZoneState::Inactive)
    }
}

#[derive(Debug)]
pub struct Zone {
    pub name: String,
    pub alias: String,
    pub source_file: PathBuf,
    pub parent_zone: Option<String>,
    /// Zones activated and deactivated together with this one. Filled with
    /// raw names during parsing; resolved (existing, non-self) afterwards.
    pub includes: Vec<String>,
    pub managers: Vec<ManagerId>,
    pub state: ZoneState,
    /// Set when the zone declared FocusedFXNavigator; focused-FX mapping only
    /// considers such zones and selected-FX mapping skips them.
    pub has_focused_fx_navigator: bool,
}

impl Zone {
    pub fn new(name: &str, alias: &str, source_file: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.to_string(),
            source_file,
            parent_zone: None,
            includes: Vec::new(),
            managers: Vec::new(),
            state: ZoneState::Inactive,
            has_focused_fx_navigator: false,
        }
    }
}

impl Surface {
    /// Activate a zone at a slot, cascading through its included zones.
    pub fn activate_zone(
        &mut self,
        name: &str,
        slot: usize,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
    ) {
        let mut visited = HashSet::new();
        self.activate_zone_inner(name, slot, false, sink, now_ms, &mut visited);
    }

    /// Activate a zone for a slot with no live host object: widgets bind
    /// structurally and show a neutral display, Do is not wired.
    pub fn activate_zone_no_action(
        &mut self,
        name: &str,
        slot: usize,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
    ) {
        let mut visited = HashSet::new();
        self.activate_zone_inner(name, slot, true, sink, now_ms, &mut visited);
    }

    fn activate_zone_inner(
        &mut self,
        name: &str,
        slot: usize,
        no_action: bool,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
        visited: &mut HashSet<String>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let Some(zone) = self.zones.get_mut(name) else {
            return;
        };

        zone.state = if no_action {
            ZoneState::NoAction(slot)
        } else {
            ZoneState::Active(slot)
        };
        let members = zone.managers.clone();
        let includes = zone.includes.clone();

        let suppression = if no_action {
            self.no_action_suppression()
        } else {
            Suppression::None
        };

        for mid in members {
            let widget = self.managers[mid.0].widget();
            self.managers[mid.0].on_zone_activated(slot, suppression);
            self.widgets[widget.0].bind_manager(Some(mid));
            if no_action {
                self.widgets[widget.0].force_zero(sink, now_ms);
            }
        }

        for included in includes {
            self.activate_zone_inner(&included, slot, no_action, sink, now_ms, visited);
        }
    }

    /// Deactivate a zone and its included zones. Every affected widget falls
    /// back to its Home-zone binding (if the Home zone defines one) and every
    /// pending delayed fire in the zone is cancelled before returning.
    pub fn deactivate_zone(&mut self, name: &str) {
        let mut visited = HashSet::new();
        self.deactivate_zone_inner(name, &mut visited);
    }

    fn deactivate_zone_inner(&mut self, name: &str, visited: &mut HashSet<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let Some(zone) = self.zones.get_mut(name) else {
            return;
        };
        if !zone.state.is_active() {
            return;
        }

        zone.state = ZoneState::Inactive;
        let members = zone.managers.clone();
        let includes = zone.includes.clone();

        for mid in members {
            self.managers[mid.0].on_zone_deactivated();
            let widget = self.managers[mid.0].widget();
            let home = self.home_manager_for(widget);
            self.widgets[widget.0].bind_manager(home);
        }

        for included in includes {
            self.deactivate_zone_inner(&included, visited);
        }
    }

    /// Force every widget bound by a zone to the neutral display.
    pub fn set_zone_widgets_to_zero(
        &mut self,
        name: &str,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
    ) {
        let Some(zone) = self.zones.get(name) else {
            return;
        };
        let members = zone.managers.clone();
        for mid in members {
            let widget = self.managers[mid.0].widget();
            self.widgets[widget.0].force_zero(sink, now_ms);
        }
    }

    /// The Home zone's manager for a widget, searching through Home's
    /// included zones the way activation does.
    fn home_manager_for(&self, widget: super::WidgetId) -> Option<ManagerId> {
        let mut visited = HashSet::new();
        self.manager_in_zone_tree("Home", widget, &mut visited)
    }

    fn manager_in_zone_tree(
        &self,
        zone_name: &str,
        widget: super::WidgetId,
        visited: &mut HashSet<String>,
    ) -> Option<ManagerId> {
        if !visited.insert(zone_name.to_string()) {
            return None;
        }
        let zone = self.zones.get(zone_name)?;
        if let Some(mid) = zone
            .managers
            .iter()
            .copied()
            .find(|mid| self.managers[mid.0].widget() == widget)
        {
            return Some(mid);
        }
        zone.includes
            .iter()
            .find_map(|included| self.manager_in_zone_tree(included, widget, visited))
    }

    /// Menu-hierarchy slot for a zone: the slot of the active FX or send zone
    /// named as its parent, or the zone's own activation slot when no parent
    /// link exists.
    pub fn parent_zone_slot(&self, zone_name: &str) -> usize {
        let Some(zone) = self.zones.get(zone_name) else {
            return 0;
        };
        let Some(parent_name) = zone.parent_zone.as_deref() else {
            return zone.state.slot().unwrap_or(0);
        };

        for active in self
            .fx
            .active_zones()
            .iter()
            .chain(self.sends.active_zones().iter())
        {
            if active.as_str() == parent_name {
                if let Some(slot) = self.zones.get(active).and_then(|z| z.state.slot()) {
                    return slot;
                }
            }
        }
        0
    }
}
