//! Zone and surface-template file parsing
//!
//! Zone files (`.zon`) declare named bundles of widget bindings; surface
//! template files declare each widget's raw protocol triggers and feedback
//! processors. Both share the line grammar: quoted whitespace tokens, blank
//! and `/`-comment lines skipped, `X` ... `XEnd` block structure.
//!
//! Range syntax `Base|lo-hi` expands one zone template into `hi-lo+1` concrete
//! zones; within the block every `|` is substituted with the zone's id, so one
//! template describes eight near-identical channel strips.
//!
//! Error policy: every diagnostic names the file and line; the offending line
//! or file is skipped and parsing continues. A bad configuration line must not
//! disable an entire surface.

use crate::actions::ActionRegistry;
use crate::config::SurfaceProtocol;
use crate::feedback::{FeedbackKind, FeedbackProcessor};
use crate::midi::{parse_hex_byte, MidiMsg};
use crate::model::manager::WidgetActionManager;
use crate::model::navigator::{NavigatorBank, NavigatorRef};
use crate::model::page::{canonical_modifier_key, modifier_slot};
use crate::model::widget::{CcGenKind, OscGenKind};
use crate::model::zone::Zone;
use crate::model::{Surface, WidgetId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ZoneFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Default delay for the bare `Hold` flag, in milliseconds.
const DEFAULT_HOLD_MS: u64 = 1000;

/// Recursively discover zone files under a folder, iteratively (explicit
/// stack) and sorted for deterministic load order.
pub fn discover_zone_files(folder: &Path) -> Vec<PathBuf> {
    let mut results = Vec::new();
    let mut pending = vec![folder.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
            {
                continue;
            }
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("zon") {
                results.push(path);
            }
        }
    }

    results.sort();
    results
}

/// Parse every zone file under a folder into a surface, then resolve the
/// included-zone links (a zone may be included before it is defined).
pub fn load_zone_folder(
    folder: &Path,
    surface: &mut Surface,
    bank: &mut NavigatorBank,
    registry: &ActionRegistry,
) {
    for path in discover_zone_files(folder) {
        if let Err(err) = parse_file(&path, surface, bank, registry) {
            warn!("{}", err);
        }
    }
    resolve_included_zones(surface);
}

/// Parse one file: any mix of `Zone` and `Widget` blocks.
pub fn parse_file(
    path: &Path,
    surface: &mut Surface,
    bank: &mut NavigatorBank,
    registry: &ActionRegistry,
) -> Result<(), ZoneFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ZoneFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_text(&contents, path, surface, bank, registry);
    Ok(())
}

/// Parse file contents. `source` is only used in diagnostics.
pub fn parse_text(
    contents: &str,
    source: &Path,
    surface: &mut Surface,
    bank: &mut NavigatorBank,
    registry: &ActionRegistry,
) {
    let lines: Vec<&str> = contents.lines().collect();
    let mut cursor = 0usize;

    while cursor < lines.len() {
        let line = lines[cursor];
        cursor += 1;
        if crate::tokenize::is_skippable(line) {
            continue;
        }
        let tokens = crate::tokenize::tokenize(line);
        match tokens.first().map(String::as_str) {
            Some("Zone") => {
                process_zone_block(&lines, &mut cursor, &tokens, source, surface, bank, registry);
            }
            Some("Widget") => {
                process_widget_block(&lines, &mut cursor, &tokens, source, surface);
            }
            _ => {}
        }
    }
}

/// Second pass after all files are parsed: keep only includes that resolve to
/// a defined zone, and filter self-references so activation cannot recurse.
pub fn resolve_included_zones(surface: &mut Surface) {
    let defined: Vec<String> = surface.zone_names().map(String::from).collect();
    for name in &defined {
        let Some(zone) = surface.zone_mut(name) else {
            continue;
        };
        let own_name = zone.name.clone();
        zone.includes
            .retain(|included| *included != own_name && defined.contains(included));
    }
}

/// `Base|lo-hi` range syntax: returns the expanded names and their ids, or a
/// single (name, "") pair for plain names.
fn expand_range(token: &str) -> Vec<(String, String)> {
    let Some((base, range)) = token.split_once('|') else {
        return vec![(token.to_string(), String::new())];
    };
    let Some((lo, hi)) = range.split_once('-') else {
        return vec![(token.to_string(), String::new())];
    };
    let (Ok(lo), Ok(hi)) = (lo.parse::<i64>(), hi.parse::<i64>()) else {
        return vec![(token.to_string(), String::new())];
    };
    if lo > hi {
        return vec![(token.to_string(), String::new())];
    }
    (lo..=hi)
        .map(|i| (format!("{}{}", base, i), i.to_string()))
        .collect()
}

/// Widget-name token decoration: `Name[+Modifier...]` with the four modifier
/// keys canonicalized to slot order plus the `TrackTouch`/`Invert`/`Toggle`/
/// `Hold` flags.
#[derive(Debug, Default, PartialEq)]
struct BindingDecoration {
    widget_name: String,
    modifier_key: String,
    is_track_touch: bool,
    is_inverted: bool,
    should_toggle: bool,
    hold_ms: Option<u64>,
}

fn parse_binding_decoration(token: &str) -> BindingDecoration {
    let mut decoration = BindingDecoration::default();
    let mut held = [false; 4];

    let mut parts = token.split('+');
    decoration.widget_name = parts.next().unwrap_or_default().to_string();

    for part in parts {
        if let Some(slot) = modifier_slot(part) {
            held[slot] = true;
        } else {
            match part {
                "TrackTouch" => decoration.is_track_touch = true,
                "Invert" => decoration.is_inverted = true,
                "Toggle" => decoration.should_toggle = true,
                "Hold" => decoration.hold_ms = Some(DEFAULT_HOLD_MS),
                _ => {}
            }
        }
    }

    decoration.modifier_key = canonical_modifier_key(&held);
    decoration
}

#[allow(clippy::too_many_arguments)]
fn process_zone_block(
    lines: &[&str],
    cursor: &mut usize,
    header: &[String],
    source: &Path,
    surface: &mut Surface,
    bank: &mut NavigatorBank,
    registry: &ActionRegistry,
) {
    if header.len() < 2 {
        return;
    }
    let base_name = header[1].split('|').next().unwrap_or("");
    let alias_base = header
        .get(2)
        .cloned()
        .unwrap_or_else(|| base_name.to_string());

    let expanded = expand_range(&header[1]);
    let is_range = expanded.len() > 1;

    // Send / FXMenu zones size the slot pools of the activation managers.
    if is_range {
        if base_name == "Send" {
            surface.sends.set_num_slots(expanded.len());
        } else if base_name == "FXMenu" {
            surface.fx.set_num_menu_slots(expanded.len());
        }
    } else {
        if header[1].starts_with("Send") {
            surface.sends.add_slot();
        }
        if header[1].starts_with("FXMenu") {
            surface.fx.add_menu_slot();
        }
    }

    // Create the concrete zones; duplicates keep the first definition and the
    // duplicate name drops out of this block entirely.
    let mut zones: Vec<(String, String)> = Vec::new();
    for (name, id) in &expanded {
        let alias = if is_range {
            format!("{}{}", alias_base, id)
        } else {
            alias_base.clone()
        };
        let zone = Zone::new(name, &alias, source.to_path_buf());
        if surface.add_zone(zone) {
            zones.push((name.clone(), id.clone()));
        }
    }

    let mut navigator = ZoneNavigator::None;
    let mut channel_navigators: Vec<NavigatorRef> = Vec::new();
    let mut managers: Vec<HashMap<WidgetId, usize>> = vec![HashMap::new(); zones.len()];

    while *cursor < lines.len() {
        let line_no = *cursor + 1;
        let line = lines[*cursor];
        *cursor += 1;
        if crate::tokenize::is_skippable(line) {
            continue;
        }
        let tokens = crate::tokenize::tokenize(line);
        let Some(first) = tokens.first().map(String::as_str) else {
            continue;
        };

        match first {
            "ZoneEnd" => return,
            "TrackNavigator" => {
                for i in 0..zones.len() {
                    let channel_name = format!("{}{}", surface.name, i);
                    channel_navigators
                        .push(NavigatorRef::Channel(bank.navigator_for(&channel_name)));
                }
                navigator = ZoneNavigator::Channel;
            }
            "SelectedTrackNavigator" => navigator = ZoneNavigator::Selected,
            "FocusedFXNavigator" => {
                navigator = ZoneNavigator::FocusedFx;
                for (name, _) in &zones {
                    if let Some(zone) = surface.zone_mut(name) {
                        zone.has_focused_fx_navigator = true;
                    }
                }
            }
            "ParentZone" if tokens.len() == 2 => {
                for (name, id) in &zones {
                    if let Some(zone) = surface.zone_mut(name) {
                        zone.parent_zone = Some(tokens[1].replace('|', id));
                    }
                }
            }
            "IncludedZones" => {
                let included = collect_included_zones(lines, cursor);
                for (name, id) in &zones {
                    if let Some(zone) = surface.zone_mut(name) {
                        for raw in &included {
                            for (expanded_name, _) in expand_range(&raw.replace('|', id)) {
                                zone.includes.push(expanded_name);
                            }
                        }
                    }
                }
            }
            _ => {
                for (index, (zone_name, id)) in zones.iter().enumerate() {
                    process_binding_line(
                        &line.replace('|', id),
                        line_no,
                        source,
                        zone_name,
                        index,
                        surface,
                        registry,
                        navigator,
                        &channel_navigators,
                        &mut managers[index],
                    );
                }
            }
        }
    }
}

/// Collect the names inside an `IncludedZones` ... `IncludedZonesEnd` block.
fn collect_included_zones(lines: &[&str], cursor: &mut usize) -> Vec<String> {
    let mut included = Vec::new();
    while *cursor < lines.len() {
        let line = lines[*cursor];
        *cursor += 1;
        if crate::tokenize::is_skippable(line) {
            continue;
        }
        let tokens = crate::tokenize::tokenize(line);
        match tokens.first().map(String::as_str) {
            Some("IncludedZonesEnd") => break,
            Some(name) => included.push(name.to_string()),
            None => {}
        }
    }
    included
}

/// Which navigator policy the zone block declared, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZoneNavigator {
    None,
    Channel,
    Selected,
    FocusedFx,
}

#[allow(clippy::too_many_arguments)]
fn process_binding_line(
    line: &str,
    line_no: usize,
    source: &Path,
    zone_name: &str,
    zone_index: usize,
    surface: &mut Surface,
    registry: &ActionRegistry,
    navigator: ZoneNavigator,
    channel_navigators: &[NavigatorRef],
    managers: &mut HashMap<WidgetId, usize>,
) {
    let tokens = crate::tokenize::tokenize(line);
    if tokens.len() < 2 {
        return;
    }

    let decoration = parse_binding_decoration(&tokens[0]);
    let Some(widget) = surface.widget_id(&decoration.widget_name) else {
        return; // widget may belong to another surface's template
    };

    let action_tokens = &tokens[1..];
    let action_name = action_tokens[0].as_str();
    if !registry.is_registered(action_name) {
        warn!(
            "{}:{}: unknown action type '{}', binding dropped",
            source.display(),
            line_no,
            action_name
        );
        return;
    }

    let manager_id = *managers.entry(widget).or_insert_with(|| {
        let nav = match navigator {
            ZoneNavigator::Selected => NavigatorRef::Selected,
            ZoneNavigator::FocusedFx => NavigatorRef::FocusedFx,
            ZoneNavigator::Channel => channel_navigators
                .get(zone_index)
                .copied()
                .unwrap_or(NavigatorRef::None),
            ZoneNavigator::None => NavigatorRef::None,
        };
        let id = surface.add_manager(WidgetActionManager::new(widget, zone_name, nav));
        if let Some(zone) = surface.zone_mut(zone_name) {
            zone.managers.push(id);
        }
        id.0
    });

    let mut action = match registry.create(action_tokens) {
        Ok(action) => action,
        Err(err) => {
            warn!("{}:{}: {}, binding dropped", source.display(), line_no, err);
            return;
        }
    };

    if decoration.is_inverted {
        action.set_inverted();
    }
    if decoration.should_toggle {
        action.set_toggled();
    }
    if let Some(ms) = decoration.hold_ms {
        action.set_hold_ms(ms);
    }

    let manager = &mut surface.managers[manager_id];
    if decoration.is_track_touch {
        manager.add_touch_action(action);
    } else {
        manager.add_action(&decoration.modifier_key, action);
    }

    if crate::actions::is_modifier_action(action_name) {
        surface.widget_mut(widget).set_is_modifier();
    }
}

fn process_widget_block(
    lines: &[&str],
    cursor: &mut usize,
    header: &[String],
    source: &Path,
    surface: &mut Surface,
) {
    if header.len() < 2 {
        return;
    }
    // A duplicate widget name keeps the first definition; the block is still
    // consumed so its lines are not misread as top-level records.
    let widget = surface.add_widget(&header[1]);
    let is_osc = matches!(surface.settings.protocol, SurfaceProtocol::Osc { .. });

    while *cursor < lines.len() {
        let line_no = *cursor + 1;
        let line = lines[*cursor];
        *cursor += 1;
        if crate::tokenize::is_skippable(line) {
            continue;
        }
        let tokens = crate::tokenize::tokenize(line);
        let Some(first) = tokens.first().map(String::as_str) else {
            continue;
        };
        if first == "WidgetEnd" {
            return;
        }
        let Some(widget) = widget else {
            continue;
        };

        let handled = if is_osc {
            process_osc_capability(&tokens, surface, widget)
        } else {
            process_midi_capability(&tokens, surface, widget)
        };
        if !handled {
            warn!(
                "{}:{}: unknown widget capability '{}', line skipped",
                source.display(),
                line_no,
                first
            );
        }
    }
}

/// Parse `count` hex byte tokens starting at `tokens[from]`.
fn hex_bytes(tokens: &[String], from: usize, count: usize) -> Option<Vec<u8>> {
    if tokens.len() < from + count {
        return None;
    }
    tokens[from..from + count]
        .iter()
        .map(|t| parse_hex_byte(t))
        .collect()
}

/// Optional trailing refresh-interval token (milliseconds).
fn refresh_interval(tokens: &[String], at: usize) -> Option<u64> {
    tokens.get(at).and_then(|t| t.parse::<f64>().ok()).map(|ms| ms as u64)
}

fn process_midi_capability(tokens: &[String], surface: &mut Surface, widget: WidgetId) -> bool {
    let kind = tokens[0].as_str();
    match kind {
        // Control signal generators
        "Press" => {
            if let Some(b) = hex_bytes(tokens, 1, 3) {
                surface.add_press_generator(widget, MidiMsg::new(b[0], b[1], b[2]), 1.0);
                return true;
            }
        }
        "PressRelease" => {
            if let Some(b) = hex_bytes(tokens, 1, 6) {
                surface.add_press_generator(widget, MidiMsg::new(b[0], b[1], b[2]), 1.0);
                surface.add_press_generator(widget, MidiMsg::new(b[3], b[4], b[5]), 0.0);
                return true;
            }
        }
        "Fader14Bit" => {
            if let Some(b) = hex_bytes(tokens, 1, 3) {
                surface.add_14bit_generator(widget, MidiMsg::new(b[0], b[1], b[2]));
                return true;
            }
        }
        "Fader7Bit" => {
            if let Some(b) = hex_bytes(tokens, 1, 3) {
                surface.add_cc_generator(widget, MidiMsg::new(b[0], b[1], b[2]), CcGenKind::Fader7Bit);
                return true;
            }
        }
        "Encoder" => {
            if let Some(b) = hex_bytes(tokens, 1, 3) {
                surface.add_cc_generator(widget, MidiMsg::new(b[0], b[1], b[2]), CcGenKind::Encoder);
                return true;
            }
        }

        // Feedback processors
        "FB_TwoState" => {
            if let Some(b) = hex_bytes(tokens, 1, 6) {
                let kind = FeedbackKind::TwoState {
                    on: MidiMsg::new(b[0], b[1], b[2]),
                    off: MidiMsg::new(b[3], b[4], b[5]),
                };
                surface
                    .widget_mut(widget)
                    .add_feedback(FeedbackProcessor::new(kind, refresh_interval(tokens, 7)));
                return true;
            }
        }
        "FB_Fader14Bit" | "FB_Fader7Bit" | "FB_Encoder" | "FB_VUMeter"
        | "FB_GainReductionMeter" => {
            if let Some(b) = hex_bytes(tokens, 1, 3) {
                let msg = MidiMsg::new(b[0], b[1], b[2]);
                let fb = match kind {
                    "FB_Fader14Bit" => FeedbackKind::Fader14Bit { status: msg.status },
                    "FB_Fader7Bit" => FeedbackKind::Fader7Bit { msg },
                    "FB_Encoder" => FeedbackKind::Encoder { msg },
                    "FB_VUMeter" => FeedbackKind::VuMeter { msg },
                    _ => FeedbackKind::GainReductionMeter { msg },
                };
                surface
                    .widget_mut(widget)
                    .add_feedback(FeedbackProcessor::new(fb, refresh_interval(tokens, 4)));
                return true;
            }
        }
        "FB_MCUTimeDisplay" => {
            surface
                .widget_mut(widget)
                .add_feedback(FeedbackProcessor::new(
                    FeedbackKind::McuTimeDisplay,
                    refresh_interval(tokens, 1),
                ));
            return true;
        }
        "FB_MCUVUMeter" => {
            if let Some(index) = tokens.get(1).and_then(|t| t.parse::<u8>().ok()) {
                surface
                    .widget_mut(widget)
                    .add_feedback(FeedbackProcessor::new(
                        FeedbackKind::McuVuMeter { index },
                        refresh_interval(tokens, 2),
                    ));
                return true;
            }
        }
        "FB_MCUDisplayUpper" | "FB_MCUDisplayLower" | "FB_MCUXTDisplayUpper"
        | "FB_MCUXTDisplayLower" => {
            if let Some(index) = tokens.get(1).and_then(|t| t.parse::<u8>().ok()) {
                let row = if kind.ends_with("Lower") { 1 } else { 0 };
                let device = if kind.contains("XT") { 0x15 } else { 0x14 };
                surface
                    .widget_mut(widget)
                    .add_feedback(FeedbackProcessor::new(
                        FeedbackKind::McuDisplay {
                            row,
                            device,
                            header: 0x12,
                            index,
                        },
                        refresh_interval(tokens, 2),
                    ));
                return true;
            }
        }
        "FB_C4DisplayUpper" | "FB_C4DisplayLower" => {
            let row_block = tokens.get(1).and_then(|t| t.parse::<u8>().ok());
            let index = tokens.get(2).and_then(|t| t.parse::<u8>().ok());
            if let (Some(row_block), Some(index)) = (row_block, index) {
                let row = if kind.ends_with("Lower") { 1 } else { 0 };
                surface
                    .widget_mut(widget)
                    .add_feedback(FeedbackProcessor::new(
                        FeedbackKind::McuDisplay {
                            row,
                            device: 0x17,
                            header: 0x30 + row_block,
                            index,
                        },
                        refresh_interval(tokens, 3),
                    ));
                return true;
            }
        }
        _ => {}
    }
    false
}

fn process_osc_capability(tokens: &[String], surface: &mut Surface, widget: WidgetId) -> bool {
    if tokens.len() < 2 {
        return false;
    }
    let address = tokens[1].as_str();
    match tokens[0].as_str() {
        "Control" => {
            surface.add_osc_generator(widget, address, OscGenKind::Control);
            true
        }
        "PressOnly" => {
            surface.add_osc_generator(widget, address, OscGenKind::PressOnly);
            true
        }
        "FB_Processor" => {
            surface
                .widget_mut(widget)
                .add_feedback(FeedbackProcessor::new(
                    FeedbackKind::Osc {
                        address: address.to_string(),
                    },
                    refresh_interval(tokens, 2),
                ));
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests;
