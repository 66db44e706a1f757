//! Parser and expansion tests

use super::*;
use crate::config::SurfaceDef;
use crate::model::page::NO_MODIFIERS;
use std::io::Write;

fn midi_surface_def(name: &str) -> SurfaceDef {
    SurfaceDef {
        name: name.to_string(),
        protocol: SurfaceProtocol::Midi,
        in_port: 1,
        out_port: 1,
        template: "test.mst".to_string(),
        zone_folder: "Test".to_string(),
        zone_link: false,
        auto_map_sends: true,
        auto_map_fx: true,
        auto_map_fx_menu: true,
        auto_map_focused_fx: true,
    }
}

fn parse(surface: &mut Surface, bank: &mut NavigatorBank, text: &str) {
    let registry = ActionRegistry::new();
    parse_text(text, Path::new("test.zon"), surface, bank, &registry);
    resolve_included_zones(surface);
}

const TEMPLATE: &str = r#"
Widget Fader1
	Fader14Bit e0 00 00
	FB_Fader14Bit e0 00 00
WidgetEnd

Widget Fader2
	Fader14Bit e1 00 00
	FB_Fader14Bit e1 00 00
WidgetEnd

Widget Mute1
	PressRelease 90 10 7f 90 10 00
	FB_TwoState 90 10 7f 90 10 00
WidgetEnd

Widget RotaryA1
	Encoder b0 10 7f
	FB_Encoder b0 10 7f
WidgetEnd

Widget Shift
	PressRelease 90 46 7f 90 46 00
	FB_TwoState 90 46 7f 90 46 00
WidgetEnd

Widget DisplayUpper1
	FB_MCUDisplayUpper 0
WidgetEnd
"#;

fn surface_with_template(name: &str) -> (Surface, NavigatorBank) {
    let mut surface = Surface::new(&midi_surface_def(name));
    let mut bank = NavigatorBank::new(false);
    parse(&mut surface, &mut bank, TEMPLATE);
    (surface, bank)
}

#[test]
fn range_expansion_yields_concrete_zones() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(
        &mut surface,
        &mut bank,
        "Zone Channel|1-8\n\tTrackNavigator\n\tFader1 TrackVolume\nZoneEnd\n",
    );

    for i in 1..=8 {
        let name = format!("Channel{}", i);
        assert!(surface.zone(&name).is_some(), "{} missing", name);
    }
    assert!(surface.zone("Channel0").is_none());
    assert!(surface.zone("Channel9").is_none());
    assert!(surface.zone("Channel|1-8").is_none());
}

#[test]
fn range_expansion_allocates_one_navigator_per_zone() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(
        &mut surface,
        &mut bank,
        "Zone Channel|1-4\n\tTrackNavigator\n\tFader1 TrackVolume\nZoneEnd\n",
    );
    assert_eq!(bank.window_size(), 4);
}

#[test]
fn pipe_substitution_rewrites_block_lines() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    // The template binds Fader| so each expanded zone addresses its own
    // widget; only Fader1 and Fader2 exist in the template.
    parse(
        &mut surface,
        &mut bank,
        "Zone Strip|1-2\n\tTrackNavigator\n\tFader| TrackVolume\nZoneEnd\n",
    );

    let strip1 = surface.zone("Strip1").unwrap();
    let strip2 = surface.zone("Strip2").unwrap();
    assert_eq!(strip1.managers.len(), 1);
    assert_eq!(strip2.managers.len(), 1);

    let w1 = surface.manager(strip1.managers[0]).widget();
    let w2 = surface.manager(strip2.managers[0]).widget();
    assert_eq!(surface.widget(w1).name(), "Fader1");
    assert_eq!(surface.widget(w2).name(), "Fader2");
}

#[test]
fn modifier_tokens_canonicalize_regardless_of_order() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    // Control listed before Shift; the stored key must be slot-ordered.
    parse(
        &mut surface,
        &mut bank,
        "Zone Home\n\tMute1+Control+Shift TrackMute\nZoneEnd\n",
    );

    let home = surface.zone("Home").unwrap();
    let manager = surface.manager(home.managers[0]);
    assert!(manager.actions("ShiftControl").is_some());
    assert!(manager.actions("ControlShift").is_none());
    assert!(manager.actions(NO_MODIFIERS).is_none());
}

#[test]
fn flags_are_parsed_from_decorations() {
    let decoration = parse_binding_decoration("Fader1+Shift+Invert+Toggle+Hold");
    assert_eq!(decoration.widget_name, "Fader1");
    assert_eq!(decoration.modifier_key, "Shift");
    assert!(decoration.is_inverted);
    assert!(decoration.should_toggle);
    assert_eq!(decoration.hold_ms, Some(1000));
    assert!(!decoration.is_track_touch);

    let touch = parse_binding_decoration("Fader1+TrackTouch");
    assert!(touch.is_track_touch);
    assert_eq!(touch.modifier_key, NO_MODIFIERS);
}

#[test]
fn unknown_action_drops_binding_and_continues() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(
        &mut surface,
        &mut bank,
        "Zone Home\n\tFader1 FlyToTheMoon\n\tMute1 TrackMute\nZoneEnd\n",
    );

    let home = surface.zone("Home").unwrap();
    // The bogus binding is gone but the next line still parsed.
    assert_eq!(home.managers.len(), 1);
    let manager = surface.manager(home.managers[0]);
    assert_eq!(surface.widget(manager.widget()).name(), "Mute1");
}

#[test]
fn duplicate_zone_keeps_first_definition() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(
        &mut surface,
        &mut bank,
        "Zone Home\n\tFader1 TrackVolume\nZoneEnd\nZone Home\n\tFader1 TrackPan\n\tMute1 TrackMute\nZoneEnd\n",
    );

    let home = surface.zone("Home").unwrap();
    assert_eq!(home.managers.len(), 1);
    let manager = surface.manager(home.managers[0]);
    let names: Vec<&str> = manager
        .actions(NO_MODIFIERS)
        .unwrap()
        .iter()
        .map(|a| a.name())
        .collect();
    assert_eq!(names, vec!["TrackVolume"]);
}

#[test]
fn included_zones_resolve_forward_references() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    // Home includes Channel|1-2 before those zones are defined.
    parse(
        &mut surface,
        &mut bank,
        "Zone Home\n\tIncludedZones\n\t\tChannel|1-2\n\t\tNotDefinedAnywhere\n\tIncludedZonesEnd\nZoneEnd\n\
         Zone Channel|1-2\n\tTrackNavigator\n\tFader| TrackVolume\nZoneEnd\n",
    );

    let home = surface.zone("Home").unwrap();
    assert_eq!(home.includes, vec!["Channel1", "Channel2"]);
}

#[test]
fn self_inclusion_is_filtered() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(
        &mut surface,
        &mut bank,
        "Zone Home\n\tIncludedZones\n\t\tHome\n\tIncludedZonesEnd\n\tFader1 TrackVolume\nZoneEnd\n",
    );
    assert!(surface.zone("Home").unwrap().includes.is_empty());
}

#[test]
fn send_and_fx_menu_ranges_size_slot_pools() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(
        &mut surface,
        &mut bank,
        "Zone Send|1-4\n\tSelectedTrackNavigator\n\tFader1 TrackSendVolume\nZoneEnd\n\
         Zone FXMenu|1-6\n\tSelectedTrackNavigator\n\tMute1 GoFXSlot\nZoneEnd\n",
    );
    assert_eq!(surface.sends.num_slots(), 4);
    assert_eq!(surface.fx.num_menu_slots(), 6);
}

#[test]
fn parent_zone_records_link() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(
        &mut surface,
        &mut bank,
        "Zone FXMenu|1-2\n\tSelectedTrackNavigator\n\tParentZone Home\n\tMute1 GoFXSlot\nZoneEnd\n",
    );
    assert_eq!(
        surface.zone("FXMenu1").unwrap().parent_zone.as_deref(),
        Some("Home")
    );
}

#[test]
fn modifier_action_marks_widget() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(&mut surface, &mut bank, "Zone Home\n\tShift Shift\nZoneEnd\n");

    let shift = surface.widget_id("Shift").unwrap();
    assert!(surface.widget(shift).is_modifier());
}

#[test]
fn focused_fx_navigator_flags_zone() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(
        &mut surface,
        &mut bank,
        "Zone \"VST: ReaComp\"\n\tFocusedFXNavigator\n\tFader1 FXParam 0\nZoneEnd\n",
    );
    assert!(surface.zone("VST: ReaComp").unwrap().has_focused_fx_navigator);
}

#[test]
fn alias_defaults_to_name_and_expands_with_range() {
    let (mut surface, mut bank) = surface_with_template("MCU");
    parse(
        &mut surface,
        &mut bank,
        "Zone Send|1-2 Aux\n\tSelectedTrackNavigator\n\tFader1 TrackSendVolume\nZoneEnd\nZone Home\nZoneEnd\n",
    );
    assert_eq!(surface.zone_alias("Send1"), Some("Aux1"));
    assert_eq!(surface.zone_alias("Send2"), Some("Aux2"));
    assert_eq!(surface.zone_alias("Home"), Some("Home"));
}

#[test]
fn template_registers_generators_and_feedback() {
    let (surface, _) = surface_with_template("MCU");
    assert!(surface.widget_id("Fader1").is_some());
    assert!(surface.widget_id("Mute1").is_some());
    assert!(surface.widget_id("RotaryA1").is_some());
    // Virtual widgets registered by the surface itself.
    assert!(surface.widget_id("OnTrackSelection").is_some());
    assert!(surface.widget_id("OnFXFocus").is_some());
}

#[test]
fn duplicate_widget_keeps_first_and_consumes_block() {
    let mut surface = Surface::new(&midi_surface_def("MCU"));
    let mut bank = NavigatorBank::new(false);
    parse(
        &mut surface,
        &mut bank,
        "Widget Fader1\n\tFader14Bit e0 00 00\nWidgetEnd\nWidget Fader1\n\tFader14Bit e5 00 00\nWidgetEnd\nWidget Other\n\tPress 90 20 7f\nWidgetEnd\n",
    );
    // The duplicate block was consumed without clobbering Fader1, and the
    // parser carried on to the next widget.
    assert!(surface.widget_id("Fader1").is_some());
    assert!(surface.widget_id("Other").is_some());
}

#[test]
fn expand_range_handles_plain_and_malformed_tokens() {
    assert_eq!(
        expand_range("Channel1"),
        vec![("Channel1".to_string(), String::new())]
    );
    assert_eq!(expand_range("Channel|3-5").len(), 3);
    assert_eq!(
        expand_range("Channel|8-1"),
        vec![("Channel|8-1".to_string(), String::new())]
    );
    assert_eq!(
        expand_range("Channel|x-y"),
        vec![("Channel|x-y".to_string(), String::new())]
    );
}

#[test]
fn discovery_walks_nested_folders_for_zon_files() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("mcu").join("channel");
    std::fs::create_dir_all(&nested).unwrap();

    for (path, contents) in [
        (dir.path().join("home.zon"), "Zone Home\nZoneEnd\n"),
        (nested.join("strips.zon"), "Zone Channel|1-2\nZoneEnd\n"),
        (dir.path().join("notes.txt"), "not a zone file\n"),
        (dir.path().join(".hidden.zon"), "Zone Ghost\nZoneEnd\n"),
    ] {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    let files = discover_zone_files(dir.path());
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.extension().unwrap() == "zon"));
}

#[test]
fn load_zone_folder_parses_and_resolves() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("home.zon"),
        "Zone Home\n\tIncludedZones\n\t\tChannel|1-2\n\tIncludedZonesEnd\nZoneEnd\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("strips.zon"),
        "Zone Channel|1-2\n\tTrackNavigator\n\tFader| TrackVolume\nZoneEnd\n",
    )
    .unwrap();

    let (mut surface, mut bank) = surface_with_template("MCU");
    let registry = ActionRegistry::new();
    load_zone_folder(dir.path(), &mut surface, &mut bank, &registry);

    assert_eq!(
        surface.zone("Home").unwrap().includes,
        vec!["Channel1", "Channel2"]
    );
    assert_eq!(bank.window_size(), 2);
}
