//! Actions: the unit of host-state read/write logic bound to a widget
//!
//! An action couples a behavior (one entry of the registered catalog) with the
//! per-binding flags from the zone file: `Invert`, `Toggle` and `Hold`. The
//! behavior reads and writes host state through [`ActionCx`]; structural
//! operations (zone activation, paging, mapping cascades) are queued as
//! [`Effect`]s and applied by the engine after dispatch returns, so an action
//! never re-enters the registries that own it.

mod fx;
mod navigation;
mod sends;
mod track;
mod transport;

pub use navigation::is_modifier_action;

use crate::feedback::FeedbackSink;
use crate::host::{Host, TrackRef};
use crate::model::page::PageState;
use crate::model::widget::Widget;
use crate::model::NavigatorId;
use std::collections::HashMap;
use thiserror::Error;

/// Structural operations requested from inside an action, applied by the
/// engine once dispatch has returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    GoZone { surface: String, zone: String },
    NextPage,
    GoPage { page: String },
    /// Re-run the track-selection cascade (scroll-link + auto-mapping).
    TrackSelected,
    MapSelectedTrackSends { surface: String },
    ToggleMapSends { surface: String },
    MapSelectedTrackFx { surface: String },
    ToggleMapFx { surface: String },
    MapSelectedTrackFxMenu { surface: String },
    ToggleMapFxMenu { surface: String },
    MapFocusedFx { surface: String },
    ToggleMapFocusedFx { surface: String },
    MapFxSlot { surface: String, slot: usize },
}

/// Everything a behavior may touch during one dispatch.
pub struct ActionCx<'a> {
    pub host: &'a mut dyn Host,
    pub page: &'a mut PageState,
    pub widget: &'a mut Widget,
    pub sink: &'a mut dyn FeedbackSink,
    pub effects: &'a mut Vec<Effect>,
    pub now_ms: u64,
    pub surface_name: &'a str,
    /// Track resolved through the binding's navigator, if any.
    pub track: Option<TrackRef>,
    /// The binding's channel navigator, if it uses one.
    pub navigator: Option<NavigatorId>,
    /// Activation slot of the binding's zone (FX index, send index).
    pub slot: usize,
    /// Activation slot of the zone's parent zone (menu addressing).
    pub parent_slot: usize,
}

impl ActionCx<'_> {
    /// Write a numeric feedback value to the bound widget.
    pub fn set_value(&mut self, value: f64) {
        self.widget.set_value(value, self.sink, self.now_ms);
    }

    /// Write a text feedback value to the bound widget.
    pub fn set_text(&mut self, text: &str) {
        self.widget.set_text(text, self.sink, self.now_ms);
    }
}

/// The action capability set. `request_update` reads host/context state and
/// writes widget feedback; `do_action` reads the delivered value and writes
/// host/context state. Both default to no-ops: feedback-only actions skip
/// `do_action`, trigger-only actions skip `request_update`.
pub trait Behavior: Send {
    fn request_update(&self, _cx: &mut ActionCx<'_>) {}
    fn do_action(&mut self, _cx: &mut ActionCx<'_>, _value: f64) {}
}

/// One bound action: a behavior plus the binding flags.
pub struct Action {
    name: String,
    behavior: Box<dyn Behavior>,
    inverted: bool,
    toggled: bool,
    hold_ms: Option<u64>,
    /// Last delivered (post-invert) value, for the Toggle edge detector.
    last_edge: Option<f64>,
    /// Scheduled Hold fire: (deadline, value).
    pending: Option<(u64, f64)>,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("inverted", &self.inverted)
            .field("toggled", &self.toggled)
            .field("hold_ms", &self.hold_ms)
            .finish()
    }
}

impl Action {
    pub fn new(name: &str, behavior: Box<dyn Behavior>) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            inverted: false,
            toggled: false,
            hold_ms: None,
            last_edge: None,
            pending: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_inverted(&mut self) {
        self.inverted = true;
    }

    pub fn set_toggled(&mut self) {
        self.toggled = true;
    }

    pub fn set_hold_ms(&mut self, ms: u64) {
        self.hold_ms = Some(ms);
    }

    pub fn request_update(&self, cx: &mut ActionCx<'_>) {
        self.behavior.request_update(cx);
    }

    /// Deliver an input value. Inversion applies first, then `Hold`
    /// scheduling, then the `Toggle` edge detector.
    pub fn deliver(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        let value = if self.inverted { 1.0 - value } else { value };

        if let Some(hold) = self.hold_ms {
            if value != 0.0 {
                self.pending = Some((cx.now_ms + hold, value));
            } else {
                // Release before the deadline cancels the fire.
                self.pending = None;
            }
            return;
        }

        self.fire(cx, value);
    }

    /// A delivered value reaches the behavior. With `Toggle`, the control acts
    /// as a latching switch: only a change in the delivered value fires, and
    /// it fires the quantized 0/1 value rather than the raw one.
    fn fire(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if self.toggled {
            if self.last_edge == Some(value) {
                return;
            }
            self.last_edge = Some(value);
            let quantized = if value == 0.0 { 0.0 } else { 1.0 };
            self.behavior.do_action(cx, quantized);
        } else {
            self.behavior.do_action(cx, value);
        }
    }

    /// Take the pending Hold fire if its deadline has passed.
    pub fn take_due(&mut self, now_ms: u64) -> Option<f64> {
        match self.pending {
            Some((deadline, value)) if now_ms >= deadline => {
                self.pending = None;
                Some(value)
            }
            _ => None,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fire a value that already went through `deliver`'s invert/hold stages.
    pub fn fire_held(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        self.fire(cx, value);
    }

    /// Drop transient dispatch state (pending Hold fires, toggle edges).
    /// Called when the owning zone is (re)activated or deactivated.
    pub fn reset_transients(&mut self) {
        self.pending = None;
        self.last_edge = None;
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action type '{0}'")]
    Unknown(String),
    #[error("action '{name}': invalid parameter '{param}'")]
    BadParam { name: String, param: String },
}

type Factory = fn(&[String]) -> Result<Box<dyn Behavior>, ActionError>;

/// Registered action-type table: name to constructor. Open for extension via
/// [`ActionRegistry::register`].
pub struct ActionRegistry {
    table: HashMap<&'static str, Factory>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRegistry {
    /// The full built-in catalog.
    pub fn new() -> Self {
        let mut registry = Self {
            table: HashMap::new(),
        };
        track::register(&mut registry);
        transport::register(&mut registry);
        fx::register(&mut registry);
        sends::register(&mut registry);
        navigation::register(&mut registry);
        registry.register("NoAction", |_| Ok(Box::new(NoAction)));
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: Factory) {
        self.table.insert(name, factory);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Construct an action. `params[0]` is the action-type name, the rest are
    /// its parameters, exactly as tokenized from the binding line.
    pub fn create(&self, params: &[String]) -> Result<Action, ActionError> {
        let name = params.first().map(String::as_str).unwrap_or("");
        let factory = self
            .table
            .get(name)
            .ok_or_else(|| ActionError::Unknown(name.to_string()))?;
        let behavior = factory(&params[1..])?;
        Ok(Action::new(name, behavior))
    }
}

/// Placeholder binding that swallows input and feedback.
struct NoAction;

impl Behavior for NoAction {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        cx.set_value(0.0);
    }
}

/// Parse an integer parameter, reporting the action name on failure.
pub(crate) fn int_param(name: &str, params: &[String], index: usize) -> Result<i64, ActionError> {
    let token = params.get(index).ok_or_else(|| ActionError::BadParam {
        name: name.to_string(),
        param: format!("<missing #{}>", index + 1),
    })?;
    token.parse().map_err(|_| ActionError::BadParam {
        name: name.to_string(),
        param: token.clone(),
    })
}

/// Parse a string parameter.
pub(crate) fn str_param(name: &str, params: &[String], index: usize) -> Result<String, ActionError> {
    params
        .get(index)
        .cloned()
        .ok_or_else(|| ActionError::BadParam {
            name: name.to_string(),
            param: format!("<missing #{}>", index + 1),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::VecSink;
    use crate::host::MockHost;
    use crate::model::widget::Widget;

    use std::sync::{Arc, Mutex};

    /// Records every value its `do_action` receives.
    struct Recorder(Arc<Mutex<Vec<f64>>>);

    impl Behavior for Recorder {
        fn do_action(&mut self, _cx: &mut ActionCx<'_>, value: f64) {
            self.0.lock().unwrap().push(value);
        }
    }

    fn recording_action(configure: impl FnOnce(&mut Action)) -> (Action, Arc<Mutex<Vec<f64>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut action = Action::new("Recorder", Box::new(Recorder(log.clone())));
        configure(&mut action);
        (action, log)
    }

    fn deliver_all(action: &mut Action, values: &[f64]) {
        let mut host = MockHost::with_tracks(1);
        let mut page = PageState::default();
        let mut widget = Widget::new("Test");
        let mut sink = VecSink::default();
        let mut effects = Vec::new();

        for (i, &v) in values.iter().enumerate() {
            let mut cx = ActionCx {
                host: &mut host,
                page: &mut page,
                widget: &mut widget,
                sink: &mut sink,
                effects: &mut effects,
                now_ms: i as u64,
                surface_name: "Test",
                track: None,
                navigator: None,
                slot: 0,
                parent_slot: 0,
            };
            action.deliver(&mut cx, v);
        }
    }

    #[test]
    fn invert_is_applied_before_toggle() {
        // Uninverted toggled press fires 1.0.
        let (mut plain, log) = recording_action(|a| a.set_toggled());
        deliver_all(&mut plain, &[1.0]);
        assert_eq!(*log.lock().unwrap(), vec![1.0]);

        // Inverted toggled press fires the logical NOT: 0.0.
        let (mut inverted, log) = recording_action(|a| {
            a.set_toggled();
            a.set_inverted();
        });
        deliver_all(&mut inverted, &[1.0]);
        assert_eq!(*log.lock().unwrap(), vec![0.0]);
    }

    #[test]
    fn toggle_fires_on_edges_only() {
        let (mut action, log) = recording_action(|a| a.set_toggled());
        deliver_all(&mut action, &[1.0, 1.0, 1.0, 0.0, 0.5]);
        // Repeats are swallowed; each change fires the quantized value.
        assert_eq!(*log.lock().unwrap(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn untoggled_actions_pass_values_through() {
        let (mut action, log) = recording_action(|_| {});
        deliver_all(&mut action, &[0.25, 0.25, 0.75]);
        assert_eq!(*log.lock().unwrap(), vec![0.25, 0.25, 0.75]);
    }

    #[test]
    fn hold_schedules_and_release_cancels() {
        let (mut action, log) = recording_action(|a| a.set_hold_ms(500));

        // Press at t=0 schedules; release at t=1 cancels.
        deliver_all(&mut action, &[1.0, 0.0]);
        assert!(!action.has_pending());
        assert_eq!(action.take_due(10_000), None);
        assert!(log.lock().unwrap().is_empty());

        // Press again and let it mature.
        deliver_all(&mut action, &[1.0]);
        assert!(action.has_pending());
        assert_eq!(action.take_due(100), None); // deadline not reached
        assert_eq!(action.take_due(500), Some(1.0));
        assert!(!action.has_pending());
    }

    #[test]
    fn registry_rejects_unknown_names() {
        let registry = ActionRegistry::new();
        let err = registry.create(&["DefinitelyNotAnAction".to_string()]);
        assert!(matches!(err, Err(ActionError::Unknown(_))));
    }

    #[test]
    fn registry_builds_catalog_entries() {
        let registry = ActionRegistry::new();
        for name in [
            "TrackVolume",
            "TrackMute",
            "Play",
            "FXParam",
            "TrackSendVolume",
            "TrackBank",
            "GoZone",
            "Shift",
            "NoAction",
        ] {
            assert!(registry.is_registered(name), "{} missing", name);
        }

        let action = registry
            .create(&["TrackBank".to_string(), "8".to_string()])
            .unwrap();
        assert_eq!(action.name(), "TrackBank");
    }
}
