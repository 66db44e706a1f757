//! WidgetActionManager: the per-widget binding table
//!
//! Maps a canonical modifier-combination key to an ordered action list, plus a
//! separate touch-override list that takes priority while the bound channel is
//! under touch. The manager also carries its zone's activation slot, copied in
//! when the zone activates.

use super::navigator::NavigatorRef;
use super::page::NO_MODIFIERS;
use super::WidgetId;
use crate::actions::Action;
use std::collections::HashMap;

/// How `ActivateNoAction` suppresses dispatch for this manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Suppression {
    /// Normal activation: nothing suppressed.
    #[default]
    None,
    /// Do suppressed for every modifier combination.
    All,
    /// Do suppressed only for the NoModifiers list.
    DefaultOnly,
}

/// Binding table for one widget within one zone.
#[derive(Debug)]
pub struct WidgetActionManager {
    widget: WidgetId,
    zone: String,
    navigator: NavigatorRef,
    bindings: HashMap<String, Vec<Action>>,
    touch_actions: Vec<Action>,
    slot: usize,
    suppression: Suppression,
}

impl WidgetActionManager {
    pub fn new(widget: WidgetId, zone: &str, navigator: NavigatorRef) -> Self {
        Self {
            widget,
            zone: zone.to_string(),
            navigator,
            bindings: HashMap::new(),
            touch_actions: Vec::new(),
            slot: 0,
            suppression: Suppression::None,
        }
    }

    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn navigator(&self) -> NavigatorRef {
        self.navigator
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn suppression(&self) -> Suppression {
        self.suppression
    }

    /// Append an action under a modifier key; insertion order is dispatch
    /// order and the tie-break when several actions feed one output.
    pub fn add_action(&mut self, modifier_key: &str, action: Action) {
        self.bindings
            .entry(modifier_key.to_string())
            .or_default()
            .push(action);
    }

    /// Append to the touch-override list.
    pub fn add_touch_action(&mut self, action: Action) {
        self.touch_actions.push(action);
    }

    pub fn has_touch_actions(&self) -> bool {
        !self.touch_actions.is_empty()
    }

    /// Resolve the binding key for a dispatch: modifier widgets cannot
    /// themselves be modified, so they always use the NoModifiers list.
    pub fn resolve_key(&self, widget_is_modifier: bool, page_key: &str) -> String {
        if widget_is_modifier {
            NO_MODIFIERS.to_string()
        } else {
            page_key.to_string()
        }
    }

    pub fn actions_mut(&mut self, key: &str) -> Option<&mut Vec<Action>> {
        self.bindings.get_mut(key)
    }

    pub fn actions(&self, key: &str) -> Option<&Vec<Action>> {
        self.bindings.get(key)
    }

    pub fn touch_actions_mut(&mut self) -> &mut Vec<Action> {
        &mut self.touch_actions
    }

    /// Iterate every action in every list (used for Hold scheduling scans).
    pub fn all_actions_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.bindings
            .values_mut()
            .flatten()
            .chain(self.touch_actions.iter_mut())
    }

    /// Called when the owning zone activates: adopt the slot, set the
    /// suppression mode and drop stale transient state.
    pub fn on_zone_activated(&mut self, slot: usize, suppression: Suppression) {
        self.slot = slot;
        self.suppression = suppression;
        for action in self.all_actions_mut() {
            action.reset_transients();
        }
    }

    /// Called when the owning zone deactivates: cancel any pending delayed
    /// fire so no binding dangles past deactivation.
    pub fn on_zone_deactivated(&mut self) {
        self.suppression = Suppression::None;
        for action in self.all_actions_mut() {
            action.reset_transients();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionRegistry;
    use crate::model::page::NO_MODIFIERS;

    fn manager_with_binding(key: &str) -> WidgetActionManager {
        let registry = ActionRegistry::new();
        let mut manager = WidgetActionManager::new(WidgetId(0), "Home", NavigatorRef::None);
        manager.add_action(key, registry.create(&["NoAction".to_string()]).unwrap());
        manager
    }

    #[test]
    fn modifier_widgets_resolve_no_modifiers() {
        let manager = manager_with_binding(NO_MODIFIERS);
        assert_eq!(manager.resolve_key(true, "ShiftControl"), NO_MODIFIERS);
        assert_eq!(manager.resolve_key(false, "ShiftControl"), "ShiftControl");
    }

    #[test]
    fn insertion_order_is_preserved() {
        let registry = ActionRegistry::new();
        let mut manager = WidgetActionManager::new(WidgetId(0), "Home", NavigatorRef::None);
        for name in ["TrackVolume", "TrackMute", "NoAction"] {
            manager.add_action(NO_MODIFIERS, registry.create(&[name.to_string()]).unwrap());
        }
        let names: Vec<&str> = manager
            .actions(NO_MODIFIERS)
            .unwrap()
            .iter()
            .map(|a| a.name())
            .collect();
        assert_eq!(names, vec!["TrackVolume", "TrackMute", "NoAction"]);
    }

    #[test]
    fn zone_activation_adopts_slot_and_clears_transients() {
        let mut manager = manager_with_binding(NO_MODIFIERS);
        manager.on_zone_activated(3, Suppression::None);
        assert_eq!(manager.slot(), 3);

        manager.on_zone_activated(5, Suppression::All);
        assert_eq!(manager.slot(), 5);
        assert_eq!(manager.suppression(), Suppression::All);

        manager.on_zone_deactivated();
        assert_eq!(manager.suppression(), Suppression::None);
    }
}
