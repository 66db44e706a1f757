//! Pages and the modifier state machine
//!
//! A page groups the surfaces that share one track-navigation bank and one set
//! of held modifier keys. Switching pages swaps the whole surface/zone/navigator
//! state; with SynchPages the incoming page adopts the outgoing bank offset.

use super::navigator::NavigatorBank;
use super::surface::Surface;
use crate::config::PageDef;

/// The four modifier keys in canonical slot order.
pub const MODIFIER_NAMES: [&str; 4] = ["Shift", "Option", "Control", "Alt"];

/// Lookup key used when no modifier is held.
pub const NO_MODIFIERS: &str = "NoModifiers";

/// Slot index for a modifier name, if it is one.
pub fn modifier_slot(name: &str) -> Option<usize> {
    MODIFIER_NAMES.iter().position(|&m| m == name)
}

/// Canonical binding-table key for a set of held modifier slots: the names of
/// the held keys concatenated in slot order, or [`NO_MODIFIERS`].
pub fn canonical_modifier_key(held: &[bool; 4]) -> String {
    let mut key = String::new();
    for (slot, &on) in held.iter().enumerate() {
        if on {
            key.push_str(MODIFIER_NAMES[slot]);
        }
    }
    if key.is_empty() {
        key.push_str(NO_MODIFIERS);
    }
    key
}

/// Mutable page-scoped state shared by every surface on the page.
#[derive(Debug, Default)]
pub struct PageState {
    pub name: String,
    pub follow_mixer: bool,
    pub synch_pages: bool,
    pub track_coloring: bool,
    pub color: (u8, u8, u8),
    pub navigators: NavigatorBank,
    /// Policy flag consumed when FX zones are mapped.
    pub show_fx_windows: bool,
    /// Touch state of the master fader; channel touch lives on the navigators.
    pub master_touched: bool,
    modifiers: [bool; 4],
}

impl PageState {
    pub fn from_def(def: &PageDef) -> Self {
        Self {
            name: def.name.clone(),
            follow_mixer: def.follow_mixer,
            synch_pages: def.synch_pages,
            track_coloring: def.track_coloring,
            color: def.color,
            navigators: NavigatorBank::new(def.scroll_link),
            show_fx_windows: false,
            master_touched: false,
            modifiers: [false; 4],
        }
    }

    /// Press or release one modifier key. Changing a modifier never re-fires
    /// bound actions; it only changes which binding list later dispatches
    /// resolve to.
    pub fn set_modifier(&mut self, slot: usize, held: bool) {
        if let Some(m) = self.modifiers.get_mut(slot) {
            *m = held;
        }
    }

    pub fn modifier_held(&self, slot: usize) -> bool {
        self.modifiers.get(slot).copied().unwrap_or(false)
    }

    /// The current canonical binding-table key.
    pub fn modifier_key(&self) -> String {
        canonical_modifier_key(&self.modifiers)
    }
}

/// A page: shared state plus the surfaces it drives.
#[derive(Debug, Default)]
pub struct Page {
    pub state: PageState,
    pub surfaces: Vec<Surface>,
}

impl Page {
    pub fn new(state: PageState) -> Self {
        Self {
            state,
            surfaces: Vec::new(),
        }
    }

    pub fn surface_mut(&mut self, name: &str) -> Option<&mut Surface> {
        self.surfaces.iter_mut().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_modifiers_sentinel() {
        let state = PageState::default();
        assert_eq!(state.modifier_key(), NO_MODIFIERS);
    }

    #[test]
    fn key_is_order_independent_canonical() {
        let mut state = PageState::default();

        // Press Control then Shift; the key is still slot-ordered.
        state.set_modifier(modifier_slot("Control").unwrap(), true);
        state.set_modifier(modifier_slot("Shift").unwrap(), true);
        assert_eq!(state.modifier_key(), "ShiftControl");

        // Same keys pressed in the opposite order resolve identically.
        let mut other = PageState::default();
        other.set_modifier(modifier_slot("Shift").unwrap(), true);
        other.set_modifier(modifier_slot("Control").unwrap(), true);
        assert_eq!(other.modifier_key(), state.modifier_key());
    }

    #[test]
    fn all_four_held() {
        let mut state = PageState::default();
        for slot in 0..4 {
            state.set_modifier(slot, true);
        }
        assert_eq!(state.modifier_key(), "ShiftOptionControlAlt");
    }

    #[test]
    fn release_restores_sentinel() {
        let mut state = PageState::default();
        state.set_modifier(0, true);
        state.set_modifier(0, false);
        assert_eq!(state.modifier_key(), NO_MODIFIERS);
    }
}
