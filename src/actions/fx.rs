//! FX actions: parameters, plugin displays and FX mapping control
//!
//! Parameter actions address the FX at the binding zone's activation slot;
//! menu navigation (GoFXSlot) addresses the slot of the zone's parent, which
//! is how `FXMenu<n>` child zones know which plugin they were opened for.

use super::{ActionCx, ActionRegistry, Behavior, Effect};

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("FXParam", |params| {
        let param = super::int_param("FXParam", params, 0)?;
        Ok(Box::new(FxParam {
            param: param.max(0) as usize,
        }))
    });
    registry.register("FXParamRelative", |params| {
        let param = super::int_param("FXParamRelative", params, 0)?;
        Ok(Box::new(FxParamRelative {
            param: param.max(0) as usize,
        }))
    });
    registry.register("FXNameDisplay", |_| Ok(Box::new(FxNameDisplay)));
    registry.register("FXParamNameDisplay", |params| {
        let param = super::int_param("FXParamNameDisplay", params, 0)?;
        // An optional display-name override follows the parameter index.
        let alias = params.get(1).cloned();
        Ok(Box::new(FxParamNameDisplay {
            param: param.max(0) as usize,
            alias,
        }))
    });
    registry.register("FXParamValueDisplay", |params| {
        let param = super::int_param("FXParamValueDisplay", params, 0)?;
        Ok(Box::new(FxParamValueDisplay {
            param: param.max(0) as usize,
        }))
    });
    registry.register("FXGainReductionMeter", |_| Ok(Box::new(GainReductionMeter)));
    registry.register("SetShowFXWindows", |_| Ok(Box::new(SetShowFxWindows)));
    registry.register("GoFXSlot", |_| Ok(Box::new(GoFxSlot)));
    registry.register("MapSelectedTrackFXToWidgets", |_| {
        Ok(Box::new(MapSelectedTrackFx))
    });
    registry.register("MapSelectedTrackFXToMenu", |_| {
        Ok(Box::new(MapSelectedTrackFxMenu))
    });
    registry.register("MapFocusedFXToWidgets", |_| Ok(Box::new(MapFocusedFx)));
    registry.register("ToggleMapSelectedTrackFX", |_| Ok(Box::new(ToggleMapFx)));
    registry.register("ToggleMapSelectedTrackFXMenu", |_| {
        Ok(Box::new(ToggleMapFxMenu))
    });
    registry.register("ToggleMapFocusedFX", |_| Ok(Box::new(ToggleMapFocusedFx)));
}

struct FxParam {
    param: usize,
}

impl Behavior for FxParam {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let value = cx
            .track
            .map(|t| cx.host.fx_param(t, cx.slot, self.param))
            .unwrap_or(0.0);
        cx.set_value(value);
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if let Some(track) = cx.track {
            cx.host.set_fx_param(track, cx.slot, self.param, value);
        }
    }
}

/// Encoder-friendly variant: the delivered value is already the new absolute
/// position (the widget applied the delta), clamped here for safety.
struct FxParamRelative {
    param: usize,
}

impl Behavior for FxParamRelative {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let value = cx
            .track
            .map(|t| cx.host.fx_param(t, cx.slot, self.param))
            .unwrap_or(0.0);
        cx.set_value(value);
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if let Some(track) = cx.track {
            cx.host
                .set_fx_param(track, cx.slot, self.param, value.clamp(0.0, 1.0));
        }
    }
}

struct FxNameDisplay;

impl Behavior for FxNameDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let text = cx
            .track
            .map(|t| cx.host.fx_name(t, cx.slot))
            .unwrap_or_default();
        cx.set_text(&text);
    }
}

struct FxParamNameDisplay {
    param: usize,
    alias: Option<String>,
}

impl Behavior for FxParamNameDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        if let Some(alias) = &self.alias {
            cx.set_text(alias);
            return;
        }
        let text = cx
            .track
            .map(|t| cx.host.fx_param_name(t, cx.slot, self.param))
            .unwrap_or_default();
        cx.set_text(&text);
    }
}

struct FxParamValueDisplay {
    param: usize,
}

impl Behavior for FxParamValueDisplay {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        let text = match cx.track {
            Some(track) => {
                let value = cx.host.fx_param(track, cx.slot, self.param);
                format!("{:5.2}", value)
            }
            None => String::new(),
        };
        cx.set_text(&text);
    }
}

/// Gain reduction as a meter value: no reduction shows full scale, 20 dB of
/// reduction bottoms out. Idle transport parks the meter at full scale.
struct GainReductionMeter;

impl Behavior for GainReductionMeter {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        if !cx.host.play_state().is_rolling() {
            cx.set_value(1.0);
            return;
        }
        let value = cx
            .track
            .map(|t| {
                let reduction = cx.host.gain_reduction_db(t, cx.slot).abs();
                1.0 - (reduction / 20.0).clamp(0.0, 1.0)
            })
            .unwrap_or(1.0);
        cx.set_value(value);
    }
}

struct SetShowFxWindows;

impl Behavior for SetShowFxWindows {
    fn request_update(&self, cx: &mut ActionCx<'_>) {
        cx.set_value(if cx.page.show_fx_windows { 1.0 } else { 0.0 });
    }

    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        cx.page.show_fx_windows = value != 0.0;
    }
}

/// Open the FX zone for the menu slot this binding's parent zone represents.
struct GoFxSlot;

impl Behavior for GoFxSlot {
    fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
        if value != 0.0 {
            cx.effects.push(Effect::MapFxSlot {
                surface: cx.surface_name.to_string(),
                slot: cx.parent_slot,
            });
        }
    }
}

macro_rules! surface_effect_action {
    ($name:ident, $effect:ident) => {
        struct $name;

        impl Behavior for $name {
            fn do_action(&mut self, cx: &mut ActionCx<'_>, value: f64) {
                if value != 0.0 {
                    cx.effects.push(Effect::$effect {
                        surface: cx.surface_name.to_string(),
                    });
                }
            }
        }
    };
}

surface_effect_action!(MapSelectedTrackFx, MapSelectedTrackFx);
surface_effect_action!(MapSelectedTrackFxMenu, MapSelectedTrackFxMenu);
surface_effect_action!(MapFocusedFx, MapFocusedFx);
surface_effect_action!(ToggleMapFx, ToggleMapFx);
surface_effect_action!(ToggleMapFxMenu, ToggleMapFxMenu);
surface_effect_action!(ToggleMapFocusedFx, ToggleMapFocusedFx);
