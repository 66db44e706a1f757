//! The engine: single dispatch authority over pages, surfaces and effects
//!
//! All zone/widget/action state transitions happen here, on one control
//! thread. Hardware input arrives as queued [`InputEvent`]s, the host drives
//! [`Engine::tick`], and outbound feedback accumulates in a buffer the I/O
//! layer drains after each call. The engine itself never touches a socket or
//! a MIDI port.

use crate::actions::{ActionRegistry, Effect};
use crate::config::{Config, PageDef, SurfaceDef, SurfaceProtocol};
use crate::feedback::FeedbackSink;
use crate::host::Host;
use crate::model::page::{Page, PageState};
use crate::model::Surface;
use crate::zones;
use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::{debug, info, warn};

/// Decoded hardware or host event handed to the dispatch authority.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Raw MIDI bytes from an input port.
    Midi { port: u16, bytes: Vec<u8> },
    /// Decoded OSC control message for a named surface.
    Osc {
        surface: String,
        address: String,
        value: f64,
    },
    /// Host notified a track-selection change.
    TrackSelected,
    /// Host notified a focused-FX change.
    FxFocused,
}

/// One outbound feedback message, tagged for routing by the I/O layer.
#[derive(Debug, Clone, PartialEq)]
pub enum OutMessage {
    Midi(Vec<u8>),
    OscFloat(String, f32),
    OscString(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub surface: String,
    pub out_port: u16,
    pub message: OutMessage,
}

/// Feedback sink that buffers outbound messages tagged with their surface.
struct BufferSink<'a> {
    surface: String,
    out_port: u16,
    buf: &'a mut Vec<Outbound>,
}

impl<'a> BufferSink<'a> {
    fn new(surface: &str, out_port: u16, buf: &'a mut Vec<Outbound>) -> Self {
        Self {
            surface: surface.to_string(),
            out_port,
            buf,
        }
    }

    fn push(&mut self, message: OutMessage) {
        self.buf.push(Outbound {
            surface: self.surface.clone(),
            out_port: self.out_port,
            message,
        });
    }
}

impl FeedbackSink for BufferSink<'_> {
    fn midi(&mut self, bytes: &[u8]) {
        self.push(OutMessage::Midi(bytes.to_vec()));
    }

    fn osc_float(&mut self, address: &str, value: f32) {
        self.push(OutMessage::OscFloat(address.to_string(), value));
    }

    fn osc_string(&mut self, address: &str, value: &str) {
        self.push(OutMessage::OscString(address.to_string(), value.to_string()));
    }
}

/// Cascades triggered from inside a dispatch can enqueue further cascades;
/// anything deeper than this is a configuration cycle.
const MAX_EFFECT_ROUNDS: usize = 8;

pub struct Engine {
    host: Box<dyn Host>,
    registry: ActionRegistry,
    pages: Vec<Page>,
    active_page: usize,
    outbound: Vec<Outbound>,
    effects: Vec<Effect>,
    midi_in_monitor: bool,
    midi_out_monitor: bool,
    osc_in_monitor: bool,
}

impl Engine {
    pub fn new(host: Box<dyn Host>) -> Self {
        Self {
            host,
            registry: ActionRegistry::new(),
            pages: Vec::new(),
            active_page: 0,
            outbound: Vec::new(),
            effects: Vec::new(),
            midi_in_monitor: false,
            midi_out_monitor: false,
            osc_in_monitor: false,
        }
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    /// Build every page and surface from a parsed configuration. Surface
    /// templates load from `<base>/Surfaces/<template>`, zone folders from
    /// `<base>/Zones/<folder>`. Existing pages are torn down first, so this
    /// doubles as the reload path.
    pub fn load_config(&mut self, config: &Config, base_dir: &Path) -> Result<()> {
        self.pages.clear();
        self.active_page = 0;
        self.outbound.clear();
        self.effects.clear();
        self.midi_in_monitor = config.midi_in_monitor;
        self.midi_out_monitor = config.midi_out_monitor;
        self.osc_in_monitor = config.osc_in_monitor;

        if config.pages.is_empty() {
            return Err(anyhow!("configuration defines no pages"));
        }

        for page_def in &config.pages {
            let page = self.build_page(page_def, base_dir);
            self.pages.push(page);
        }

        // Every surface starts in its Home zone with a neutral display.
        let now_ms = 0;
        for page_index in 0..self.pages.len() {
            let page = &mut self.pages[page_index];
            for surface in &mut page.surfaces {
                let mut sink =
                    BufferSink::new(&surface.name, surface.settings.out_port, &mut self.outbound);
                surface.reset_all_widgets(&mut sink, now_ms);
                surface.activate_zone("Home", 0, &mut sink, now_ms);
            }
        }

        info!(
            "configuration loaded: {} page(s), active page '{}'",
            self.pages.len(),
            self.pages[0].state.name
        );
        Ok(())
    }

    fn build_page(&mut self, def: &PageDef, base_dir: &Path) -> Page {
        let mut page = Page::new(PageState::from_def(def));

        for surface_def in &def.surfaces {
            let surface = self.build_surface(surface_def, base_dir, &mut page.state);
            page.surfaces.push(surface);
        }
        page
    }

    fn build_surface(
        &mut self,
        def: &SurfaceDef,
        base_dir: &Path,
        state: &mut PageState,
    ) -> Surface {
        let mut surface = Surface::new(def);

        let template_path = base_dir.join("Surfaces").join(&def.template);
        if let Err(err) =
            zones::parse_file(&template_path, &mut surface, &mut state.navigators, &self.registry)
        {
            warn!("surface '{}': {}", def.name, err);
        }

        let zone_folder = base_dir.join("Zones").join(&def.zone_folder);
        zones::load_zone_folder(&zone_folder, &mut surface, &mut state.navigators, &self.registry);
        surface
    }

    // ------------------------------------------------------------------
    // Event handling and ticking
    // ------------------------------------------------------------------

    /// Handle one queued event, then run any cascades it produced.
    pub fn handle_event(&mut self, event: InputEvent, now_ms: u64) {
        match event {
            InputEvent::Midi { port, bytes } => {
                if self.midi_in_monitor {
                    debug!("MIDI in  port {}: {}", port, crate::midi::format_hex(&bytes));
                }
                let (page, host, outbound, effects) = self.active_parts();
                for surface in &mut page.surfaces {
                    if surface.settings.in_port != port
                        || surface.settings.protocol != SurfaceProtocol::Midi
                    {
                        continue;
                    }
                    let mut sink =
                        BufferSink::new(&surface.name, surface.settings.out_port, outbound);
                    surface.handle_midi(&bytes, &mut page.state, host, &mut sink, now_ms, effects);
                }
            }
            InputEvent::Osc {
                surface: surface_name,
                address,
                value,
            } => {
                if self.osc_in_monitor {
                    debug!("OSC in  {}: {} {}", surface_name, address, value);
                }
                let (page, host, outbound, effects) = self.active_parts();
                if let Some(surface) = page
                    .surfaces
                    .iter_mut()
                    .find(|s| s.name == surface_name)
                {
                    let mut sink =
                        BufferSink::new(&surface.name, surface.settings.out_port, outbound);
                    surface.handle_osc(
                        &address,
                        value,
                        &mut page.state,
                        host,
                        &mut sink,
                        now_ms,
                        effects,
                    );
                }
            }
            InputEvent::TrackSelected => self.on_track_selection(now_ms),
            InputEvent::FxFocused => self.on_fx_focus(now_ms),
        }
        self.apply_effects(now_ms);
    }

    /// One dispatch tick: fire matured Hold bindings, then run the
    /// RequestUpdate pass over the active page.
    pub fn tick(&mut self, now_ms: u64) {
        let (page, host, outbound, effects) = self.active_parts();
        for surface in &mut page.surfaces {
            let mut sink = BufferSink::new(&surface.name, surface.settings.out_port, outbound);
            surface.fire_due_holds(&mut page.state, host, &mut sink, now_ms, effects);
            surface.request_updates(&mut page.state, host, &mut sink, now_ms, effects);
        }
        self.apply_effects(now_ms);
    }

    /// Drain the outbound feedback buffer for the I/O layer.
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        if self.midi_out_monitor {
            for out in &self.outbound {
                if let OutMessage::Midi(bytes) = &out.message {
                    debug!(
                        "MIDI out port {}: {}",
                        out.out_port,
                        crate::midi::format_hex(bytes)
                    );
                }
            }
        }
        std::mem::take(&mut self.outbound)
    }

    // ------------------------------------------------------------------
    // Pages and zones
    // ------------------------------------------------------------------

    pub fn active_page_name(&self) -> &str {
        self.pages
            .get(self.active_page)
            .map(|p| p.state.name.as_str())
            .unwrap_or("")
    }

    pub fn active_page(&self) -> &Page {
        &self.pages[self.active_page]
    }

    pub fn active_page_mut(&mut self) -> &mut Page {
        &mut self.pages[self.active_page]
    }

    /// Switch to the next page (circular).
    pub fn next_page(&mut self, now_ms: u64) {
        if self.pages.is_empty() {
            return;
        }
        let next = (self.active_page + 1) % self.pages.len();
        self.switch_page(next, now_ms);
        self.apply_effects(now_ms);
    }

    /// Switch to a named page.
    pub fn go_page(&mut self, name: &str, now_ms: u64) {
        let Some(index) = self
            .pages
            .iter()
            .position(|p| p.state.name.eq_ignore_ascii_case(name))
        else {
            warn!("page '{}' not found", name);
            return;
        };
        self.switch_page(index, now_ms);
        self.apply_effects(now_ms);
    }

    fn switch_page(&mut self, index: usize, now_ms: u64) {
        if index == self.active_page || index >= self.pages.len() {
            return;
        }
        let previous = self.active_page;
        self.active_page = index;

        // SynchPages: the incoming page adopts the outgoing bank state.
        if self.pages[previous].state.synch_pages && self.pages[index].state.synch_pages {
            let (a, b) = if previous < index {
                let (left, right) = self.pages.split_at_mut(index);
                (&left[previous], &mut right[0])
            } else {
                let (left, right) = self.pages.split_at_mut(previous);
                (&right[0], &mut left[index])
            };
            b.state.navigators.adopt_from(&a.state.navigators);
        }

        info!("active page: {}", self.pages[index].state.name);

        // Repaint the incoming page from scratch.
        let page = &mut self.pages[index];
        for surface in &mut page.surfaces {
            let mut sink =
                BufferSink::new(&surface.name, surface.settings.out_port, &mut self.outbound);
            surface.reset_all_widgets(&mut sink, now_ms);
        }
        self.on_track_selection(now_ms);
    }

    /// Activate a named zone. On a zone-linked surface the activation follows
    /// to every other zone-linked surface of the page.
    pub fn go_zone(&mut self, surface_name: &str, zone_name: &str, now_ms: u64) {
        let (page, _host, outbound, _effects) = self.active_parts();
        let linked = page
            .surfaces
            .iter()
            .find(|s| s.name == surface_name)
            .map(|s| s.settings.zone_link)
            .unwrap_or(false);

        for surface in &mut page.surfaces {
            let targeted = surface.name == surface_name || (linked && surface.settings.zone_link);
            if !targeted || surface.zone(zone_name).is_none() {
                continue;
            }
            let mut sink = BufferSink::new(&surface.name, surface.settings.out_port, outbound);
            surface.activate_zone(zone_name, 0, &mut sink, now_ms);
        }
    }

    // ------------------------------------------------------------------
    // Host event cascades
    // ------------------------------------------------------------------

    /// Track-selection cascade: scroll-link follow, then each surface's
    /// OnTrackSelection bindings (which request the auto-map effects).
    pub fn on_track_selection(&mut self, now_ms: u64) {
        let (page, host, outbound, effects) = self.active_parts();
        page.state.navigators.on_track_selection(&*host);
        for surface in &mut page.surfaces {
            let mut sink = BufferSink::new(&surface.name, surface.settings.out_port, outbound);
            surface.fire_virtual(
                "OnTrackSelection",
                &mut page.state,
                host,
                &mut sink,
                now_ms,
                effects,
            );
        }
    }

    /// Focused-FX cascade: each surface's OnFXFocus bindings.
    pub fn on_fx_focus(&mut self, now_ms: u64) {
        let (page, host, outbound, effects) = self.active_parts();
        for surface in &mut page.surfaces {
            let mut sink = BufferSink::new(&surface.name, surface.settings.out_port, outbound);
            surface.fire_virtual(
                "OnFXFocus",
                &mut page.state,
                host,
                &mut sink,
                now_ms,
                effects,
            );
        }
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Apply queued structural effects until the queue drains.
    pub fn apply_effects(&mut self, now_ms: u64) {
        for _ in 0..MAX_EFFECT_ROUNDS {
            if self.effects.is_empty() {
                return;
            }
            let drained = std::mem::take(&mut self.effects);
            for effect in drained {
                self.apply_effect(effect, now_ms);
            }
        }
        if !self.effects.is_empty() {
            warn!(
                "effect cascade did not settle after {} rounds, dropping {} effect(s)",
                MAX_EFFECT_ROUNDS,
                self.effects.len()
            );
            self.effects.clear();
        }
    }

    fn apply_effect(&mut self, effect: Effect, now_ms: u64) {
        match effect {
            Effect::GoZone { surface, zone } => self.go_zone(&surface, &zone, now_ms),
            Effect::NextPage => self.next_page(now_ms),
            Effect::GoPage { page } => self.go_page(&page, now_ms),
            Effect::TrackSelected => self.on_track_selection(now_ms),
            Effect::MapSelectedTrackSends { surface } => {
                let (page, host, outbound, _) = self.active_parts();
                if let Some(s) = page.surfaces.iter_mut().find(|s| s.name == surface) {
                    let mut sink = BufferSink::new(&s.name, s.settings.out_port, outbound);
                    s.map_selected_track_sends(&*host, &mut sink, now_ms);
                }
            }
            Effect::ToggleMapSends { surface } => {
                let (page, _, _, effects) = self.active_parts();
                if let Some(s) = page.surfaces.iter_mut().find(|s| s.name == surface) {
                    s.toggle_map_sends();
                    effects.push(Effect::TrackSelected);
                }
            }
            Effect::MapSelectedTrackFx { surface } => {
                let (page, host, outbound, _) = self.active_parts();
                let show_windows = page.state.show_fx_windows;
                if let Some(s) = page.surfaces.iter_mut().find(|s| s.name == surface) {
                    let mut sink = BufferSink::new(&s.name, s.settings.out_port, outbound);
                    s.map_selected_track_fx(host, &mut sink, now_ms, show_windows);
                }
            }
            Effect::ToggleMapFx { surface } => {
                let (page, host, _, effects) = self.active_parts();
                if let Some(s) = page.surfaces.iter_mut().find(|s| s.name == surface) {
                    s.toggle_map_fx(host);
                    effects.push(Effect::TrackSelected);
                }
            }
            Effect::MapSelectedTrackFxMenu { surface } => {
                let (page, host, outbound, _) = self.active_parts();
                if let Some(s) = page.surfaces.iter_mut().find(|s| s.name == surface) {
                    let mut sink = BufferSink::new(&s.name, s.settings.out_port, outbound);
                    s.map_selected_track_fx_menu(&*host, &mut sink, now_ms);
                }
            }
            Effect::ToggleMapFxMenu { surface } => {
                let (page, _, _, effects) = self.active_parts();
                if let Some(s) = page.surfaces.iter_mut().find(|s| s.name == surface) {
                    s.toggle_map_fx_menu();
                    effects.push(Effect::TrackSelected);
                }
            }
            Effect::MapFocusedFx { surface } => {
                let (page, host, outbound, _) = self.active_parts();
                if let Some(s) = page.surfaces.iter_mut().find(|s| s.name == surface) {
                    let mut sink = BufferSink::new(&s.name, s.settings.out_port, outbound);
                    s.map_focused_fx(&*host, &mut sink, now_ms);
                }
            }
            Effect::ToggleMapFocusedFx { surface } => {
                let (page, host, outbound, _) = self.active_parts();
                if let Some(s) = page.surfaces.iter_mut().find(|s| s.name == surface) {
                    s.toggle_map_focused_fx();
                    let mut sink = BufferSink::new(&s.name, s.settings.out_port, outbound);
                    s.map_focused_fx(&*host, &mut sink, now_ms);
                }
            }
            Effect::MapFxSlot { surface, slot } => {
                let (page, host, outbound, _) = self.active_parts();
                if let Some(s) = page.surfaces.iter_mut().find(|s| s.name == surface) {
                    let mut sink = BufferSink::new(&s.name, s.settings.out_port, outbound);
                    s.map_fx_slot(&*host, &mut sink, now_ms, slot);
                }
            }
        }
    }

    /// Split the engine into the active page and the shared resources, so a
    /// surface call can borrow all of them at once.
    #[allow(clippy::type_complexity)]
    fn active_parts(
        &mut self,
    ) -> (
        &mut Page,
        &mut dyn Host,
        &mut Vec<Outbound>,
        &mut Vec<Effect>,
    ) {
        let page = &mut self.pages[self.active_page];
        (
            page,
            self.host.as_mut(),
            &mut self.outbound,
            &mut self.effects,
        )
    }
}

#[cfg(test)]
mod tests;
