//! Surfaces: one physical or virtual controller instance
//!
//! A surface owns its widget and manager arenas, its zone registry, the
//! protocol match tables built from the template file, and the FX/sends
//! activation managers. All dispatch entry points live here: raw protocol
//! input in, widget feedback out.

use super::activation::{FxActivation, SendsActivation};
use super::manager::{Suppression, WidgetActionManager};
use super::navigator::NavigatorRef;
use super::widget::{CcGenKind, OscGenKind, Widget};
use super::zone::Zone;
use super::{ManagerId, WidgetId};
use crate::actions::{ActionCx, Effect};
use crate::config::{SurfaceDef, SurfaceProtocol};
use crate::feedback::FeedbackSink;
use crate::host::Host;
use crate::midi::MidiMsg;
use crate::model::page::PageState;
use std::collections::HashMap;
use tracing::warn;

/// Per-surface settings carried from the master configuration.
#[derive(Debug, Clone)]
pub struct SurfaceSettings {
    pub protocol: SurfaceProtocol,
    pub in_port: u16,
    pub out_port: u16,
    /// GoZone issued on any zone-linked surface follows to this one.
    pub zone_link: bool,
    /// Whether ActivateNoAction suppresses Do for every modifier combination
    /// or only the NoModifiers list.
    pub no_action_suppresses_all_modifiers: bool,
}

#[derive(Debug)]
pub struct Surface {
    pub name: String,
    pub settings: SurfaceSettings,
    pub(crate) widgets: Vec<Widget>,
    widget_ids: HashMap<String, WidgetId>,
    pub(crate) managers: Vec<WidgetActionManager>,
    pub(crate) zones: HashMap<String, Zone>,
    pub(crate) fx: FxActivation,
    pub(crate) sends: SendsActivation,
    // MIDI input match tables, most specific first.
    midi_exact: HashMap<[u8; 3], (WidgetId, f64)>,
    midi_cc: HashMap<[u8; 2], (WidgetId, CcGenKind)>,
    midi_14bit: HashMap<u8, WidgetId>,
    osc_gens: HashMap<String, (WidgetId, OscGenKind)>,
}

impl Surface {
    pub fn new(def: &SurfaceDef) -> Self {
        let mut surface = Self {
            name: def.name.clone(),
            settings: SurfaceSettings {
                protocol: def.protocol.clone(),
                in_port: def.in_port,
                out_port: def.out_port,
                zone_link: def.zone_link,
                no_action_suppresses_all_modifiers: true,
            },
            widgets: Vec::new(),
            widget_ids: HashMap::new(),
            managers: Vec::new(),
            zones: HashMap::new(),
            fx: FxActivation::from_def(def),
            sends: SendsActivation::from_def(def),
            midi_exact: HashMap::new(),
            midi_cc: HashMap::new(),
            midi_14bit: HashMap::new(),
            osc_gens: HashMap::new(),
        };

        // Virtual widgets fired from host events rather than hardware input.
        surface.add_widget("OnTrackSelection");
        surface.add_widget("OnFXFocus");
        surface
    }

    pub(crate) fn no_action_suppression(&self) -> Suppression {
        if self.settings.no_action_suppresses_all_modifiers {
            Suppression::All
        } else {
            Suppression::DefaultOnly
        }
    }

    // ------------------------------------------------------------------
    // Registries
    // ------------------------------------------------------------------

    /// Add a widget. Duplicate names keep the first definition.
    pub fn add_widget(&mut self, name: &str) -> Option<WidgetId> {
        if self.widget_ids.contains_key(name) {
            warn!(
                "surface '{}': widget '{}' already defined, keeping the first",
                self.name, name
            );
            return None;
        }
        let id = WidgetId(self.widgets.len());
        self.widgets.push(Widget::new(name));
        self.widget_ids.insert(name.to_string(), id);
        Some(id)
    }

    pub fn widget_id(&self, name: &str) -> Option<WidgetId> {
        self.widget_ids.get(name).copied()
    }

    pub fn widget(&self, id: WidgetId) -> &Widget {
        &self.widgets[id.0]
    }

    pub fn widget_mut(&mut self, id: WidgetId) -> &mut Widget {
        &mut self.widgets[id.0]
    }

    /// Add a zone. Duplicate names keep the first definition.
    pub fn add_zone(&mut self, zone: Zone) -> bool {
        if let Some(existing) = self.zones.get(&zone.name) {
            warn!(
                "surface '{}': zone '{}' already defined in {}, dropping the definition from {}",
                self.name,
                zone.name,
                existing.source_file.display(),
                zone.source_file.display()
            );
            return false;
        }
        self.zones.insert(zone.name.clone(), zone);
        true
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    pub fn zone_mut(&mut self, name: &str) -> Option<&mut Zone> {
        self.zones.get_mut(name)
    }

    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    /// Alias of a zone, used by display actions that label menu slots.
    pub fn zone_alias(&self, name: &str) -> Option<&str> {
        self.zones.get(name).map(|z| z.alias.as_str())
    }

    pub fn add_manager(&mut self, manager: WidgetActionManager) -> ManagerId {
        let id = ManagerId(self.managers.len());
        self.managers.push(manager);
        id
    }

    pub fn manager(&self, id: ManagerId) -> &WidgetActionManager {
        &self.managers[id.0]
    }

    // ------------------------------------------------------------------
    // Input generator registration (template parsing)
    // ------------------------------------------------------------------

    pub fn add_press_generator(&mut self, widget: WidgetId, msg: MidiMsg, value: f64) {
        self.midi_exact.insert(msg.bytes(), (widget, value));
    }

    pub fn add_cc_generator(&mut self, widget: WidgetId, msg: MidiMsg, kind: CcGenKind) {
        self.midi_cc.insert([msg.status, msg.data1], (widget, kind));
    }

    pub fn add_14bit_generator(&mut self, widget: WidgetId, msg: MidiMsg) {
        self.midi_14bit.insert(msg.status, widget);
    }

    pub fn add_osc_generator(&mut self, widget: WidgetId, address: &str, kind: OscGenKind) {
        self.osc_gens.insert(address.to_string(), (widget, kind));
    }

    // ------------------------------------------------------------------
    // Input dispatch
    // ------------------------------------------------------------------

    /// Route one raw MIDI message from this surface's input port. Matching is
    /// most-specific-first: full 3-byte match (press edges), then
    /// status+data1 (7-bit faders, encoders), then status alone (14-bit).
    #[allow(clippy::too_many_arguments)]
    pub fn handle_midi(
        &mut self,
        raw: &[u8],
        page: &mut PageState,
        host: &mut dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) {
        let Some(msg) = MidiMsg::from_raw(raw) else {
            return;
        };

        if let Some(&(widget, value)) = self.midi_exact.get(&msg.bytes()) {
            self.dispatch_widget(widget, value, page, host, sink, now_ms, effects);
            return;
        }

        if let Some(&(widget, kind)) = self.midi_cc.get(&[msg.status, msg.data1]) {
            let value = match kind {
                CcGenKind::Fader7Bit => crate::midi::convert::from_7bit(msg.data2),
                CcGenKind::Encoder => {
                    let delta = crate::midi::convert::encoder_delta(msg.data2);
                    (self.widgets[widget.0].last_value() + delta).clamp(0.0, 1.0)
                }
            };
            self.dispatch_widget(widget, value, page, host, sink, now_ms, effects);
            return;
        }

        if let Some(&widget) = self.midi_14bit.get(&msg.status) {
            let value = crate::midi::convert::from_14bit(msg.value_14bit());
            self.dispatch_widget(widget, value, page, host, sink, now_ms, effects);
        }
    }

    /// Route one decoded OSC message addressed to this surface.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_osc(
        &mut self,
        address: &str,
        value: f64,
        page: &mut PageState,
        host: &mut dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) {
        let Some(&(widget, kind)) = self.osc_gens.get(address) else {
            return;
        };
        let value = match kind {
            OscGenKind::Control => value,
            OscGenKind::PressOnly => {
                if value == 0.0 {
                    return;
                }
                1.0
            }
        };
        self.dispatch_widget(widget, value, page, host, sink, now_ms, effects);
    }

    /// Fire a virtual widget (OnTrackSelection, OnFXFocus) with a press.
    pub fn fire_virtual(
        &mut self,
        name: &str,
        page: &mut PageState,
        host: &mut dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) {
        if let Some(widget) = self.widget_id(name) {
            self.dispatch_widget(widget, 1.0, page, host, sink, now_ms, effects);
        }
    }

    /// Deliver an input value to the widget's active binding list.
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch_widget(
        &mut self,
        widget: WidgetId,
        value: f64,
        page: &mut PageState,
        host: &mut dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) {
        let Some(mid) = self.widgets[widget.0].manager() else {
            return;
        };

        let manager = &self.managers[mid.0];
        let key = manager.resolve_key(self.widgets[widget.0].is_modifier(), &page.modifier_key());
        match manager.suppression() {
            Suppression::All => return,
            Suppression::DefaultOnly if key == super::page::NO_MODIFIERS => return,
            _ => {}
        }

        let (track, navigator) = resolve_navigator(manager.navigator(), page, host);
        let slot = manager.slot();
        let parent_slot = self.parent_zone_slot(manager.zone());
        let surface_name = self.name.clone();

        let widget_ref = &mut self.widgets[widget.0];
        let manager = &mut self.managers[mid.0];
        let Some(actions) = manager.actions_mut(&key) else {
            return;
        };

        for action in actions {
            let mut cx = ActionCx {
                host: &mut *host,
                page: &mut *page,
                widget: &mut *widget_ref,
                sink: &mut *sink,
                effects: &mut *effects,
                now_ms,
                surface_name: &surface_name,
                track,
                navigator,
                slot,
                parent_slot,
            };
            action.deliver(&mut cx, value);
        }
    }

    // ------------------------------------------------------------------
    // Feedback pass
    // ------------------------------------------------------------------

    /// Run the RequestUpdate pass over every bound widget. With a non-empty
    /// touch-override list and the bound channel under touch, only that list
    /// runs; otherwise the list under the current modifier key runs.
    pub fn request_updates(
        &mut self,
        page: &mut PageState,
        host: &mut dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) {
        let page_key = page.modifier_key();

        for wid in 0..self.widgets.len() {
            let Some(mid) = self.widgets[wid].manager() else {
                continue;
            };

            let manager = &self.managers[mid.0];
            if manager.suppression() != Suppression::None {
                continue; // neutral display was forced at activation
            }

            let key = manager.resolve_key(self.widgets[wid].is_modifier(), &page_key);
            let (track, navigator) = resolve_navigator(manager.navigator(), page, host);
            let touched = navigator.is_some_and(|id| page.navigators.touched(id));
            let slot = manager.slot();
            let parent_slot = self.parent_zone_slot(manager.zone());
            let surface_name = self.name.clone();

            let widget_ref = &mut self.widgets[wid];
            let manager = &mut self.managers[mid.0];

            let actions = if manager.has_touch_actions() && touched {
                Some(manager.touch_actions_mut())
            } else {
                manager.actions_mut(&key)
            };
            let Some(actions) = actions else {
                continue;
            };

            for action in actions.iter() {
                let mut cx = ActionCx {
                    host: &mut *host,
                    page: &mut *page,
                    widget: &mut *widget_ref,
                    sink: &mut *sink,
                    effects: &mut *effects,
                    now_ms,
                    surface_name: &surface_name,
                    track,
                    navigator,
                    slot,
                    parent_slot,
                };
                action.request_update(&mut cx);
            }
        }
    }

    /// Fire every Hold binding whose deadline has passed.
    pub fn fire_due_holds(
        &mut self,
        page: &mut PageState,
        host: &mut dyn Host,
        sink: &mut dyn FeedbackSink,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) {
        for mid in 0..self.managers.len() {
            let manager = &self.managers[mid];
            if manager.suppression() == Suppression::All {
                continue;
            }
            let wid = manager.widget();
            let (track, navigator) = resolve_navigator(manager.navigator(), page, host);
            let slot = manager.slot();
            let parent_slot = self.parent_zone_slot(manager.zone());
            let surface_name = self.name.clone();

            let widget_ref = &mut self.widgets[wid.0];
            let manager = &mut self.managers[mid];

            for action in manager.all_actions_mut() {
                if let Some(value) = action.take_due(now_ms) {
                    let mut cx = ActionCx {
                        host: &mut *host,
                        page: &mut *page,
                        widget: &mut *widget_ref,
                        sink: &mut *sink,
                        effects: &mut *effects,
                        now_ms,
                        surface_name: &surface_name,
                        track,
                        navigator,
                        slot,
                        parent_slot,
                    };
                    action.fire_held(&mut cx, value);
                }
            }
        }
    }

    /// Reset every widget to the neutral display and drop feedback caches,
    /// typically on startup and page switches.
    pub fn reset_all_widgets(&mut self, sink: &mut dyn FeedbackSink, now_ms: u64) {
        for widget in &mut self.widgets {
            widget.clear_feedback_caches();
            widget.force_zero(sink, now_ms);
        }
    }
}

/// Resolve a navigator reference to its current track and channel id.
fn resolve_navigator(
    navigator: NavigatorRef,
    page: &PageState,
    host: &dyn Host,
) -> (Option<crate::host::TrackRef>, Option<super::NavigatorId>) {
    match navigator {
        NavigatorRef::None => (None, None),
        NavigatorRef::Channel(id) => (page.navigators.track_for(id, host), Some(id)),
        NavigatorRef::Selected => (host.selected_track(), None),
        NavigatorRef::FocusedFx => (host.focused_fx().map(|(track, _)| track), None),
    }
}
