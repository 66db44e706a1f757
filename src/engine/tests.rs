//! End-to-end engine tests: config + template + zones through dispatch

use super::*;
use crate::host::{MockFx, MockHost, MockSend, MockTrack};
use crate::midi::convert;
use crate::model::zone::ZoneState;
use std::path::PathBuf;

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

Widget Mute2
	PressRelease 90 11 7f 90 11 00
	FB_TwoState 90 11 7f 90 11 00
WidgetEnd

Widget Shift1
	PressRelease 90 46 7f 90 46 00
WidgetEnd

Widget BankRight
	Press 90 2e 7f
WidgetEnd

Widget Play
	Press 90 5e 7f
	FB_TwoState 90 5e 7f 90 5e 00
WidgetEnd
"#;

const HOME_ZONE: &str = r#"
Zone Home
	IncludedZones
		Channel|1-2
	IncludedZonesEnd
	BankRight TrackBank 1
	Shift1 Shift
	Play Play
	OnTrackSelection MapSelectedTrackSendsToWidgets
ZoneEnd
"#;

const CHANNEL_ZONE: &str = r#"
Zone Channel|1-2
	TrackNavigator
	Fader| TrackVolume
	Mute| TrackMute
	Mute|+Shift TrackSolo
	Mute|+Hold TrackRecordArm
ZoneEnd
"#;

const SEND_ZONE: &str = r#"
Zone Send|1-2
	SelectedTrackNavigator
	Fader| TrackSendVolume
ZoneEnd
"#;

fn write_fixture(pages: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_path_buf();
    std::fs::create_dir_all(base.join("Surfaces")).unwrap();
    std::fs::create_dir_all(base.join("Zones").join("MCU")).unwrap();

    std::fs::write(base.join("Surfaces").join("MCU.mst"), TEMPLATE).unwrap();
    std::fs::write(
        base.join("Zones").join("MCU").join("home.zon"),
        format!("{}{}{}", HOME_ZONE, CHANNEL_ZONE, SEND_ZONE),
    )
    .unwrap();

    std::fs::write(base.join("zonewire.ini"), pages).unwrap();
    (dir, base)
}

const ONE_PAGE: &str = "\
Page HomePage FollowMCP NoSynchPages NoScrollLink NoTrackColoring 0 0 0
MidiSurface MCU 1 1 MCU.mst MCU UseZoneLink AutoMapSends AutoMapFX AutoMapFXMenu AutoMapFocusedFX
";

fn test_host(tracks: usize) -> MockHost {
    let mut host = MockHost::new();
    for i in 0..tracks {
        let mut track = MockTrack::named(&format!("Track {}", i + 1));
        track.sends.push(MockSend::named("Bus A"));
        if i == 1 {
            track.sends.push(MockSend::named("Bus B"));
        }
        track.fx.push(MockFx::named("VST: ReaComp", &[("Threshold", 0.5)]));
        host.add_track(track);
    }
    host
}

fn build_engine(pages: &str, tracks: usize) -> (tempfile::TempDir, Engine) {
    let (dir, base) = write_fixture(pages);
    let config = Config::load(base.join("zonewire.ini")).unwrap();
    let mut engine = Engine::new(Box::new(test_host(tracks)));
    engine.load_config(&config, &base).unwrap();
    engine.take_outbound(); // discard the initial reset burst
    (dir, engine)
}

fn pitch_bend(channel: u8, normalized: f64) -> Vec<u8> {
    let (lsb, msb) = convert::split_14bit(convert::to_14bit(normalized));
    vec![0xE0 | channel, lsb, msb]
}

#[test]
fn fader_input_moves_track_volume() {
    let (_dir, mut engine) = build_engine(ONE_PAGE, 8);

    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: pitch_bend(0, 1.0),
        },
        0,
    );

    let track = engine.host().track_at(0).unwrap();
    assert!((engine.host().volume(track) - 1.0).abs() < 1e-6);
}

#[test]
fn request_update_pass_reports_volume_once() {
    let (_dir, mut engine) = build_engine(ONE_PAGE, 8);

    let track = engine.host().track_at(0).unwrap();
    engine.host_mut().set_volume(track, 0.25);

    engine.tick(0);
    let expected = pitch_bend(0, 0.25);
    let sent: Vec<_> = engine
        .take_outbound()
        .into_iter()
        .filter(|o| matches!(&o.message, OutMessage::Midi(bytes) if *bytes == expected))
        .collect();
    assert_eq!(sent.len(), 1);

    // Unchanged state dedupes on the next pass.
    engine.tick(50);
    let resent = engine
        .take_outbound()
        .into_iter()
        .any(|o| matches!(&o.message, OutMessage::Midi(bytes) if *bytes == expected));
    assert!(!resent);
}

#[test]
fn banking_rebinds_fader_to_next_track() {
    let (_dir, mut engine) = build_engine(ONE_PAGE, 8);

    // Press the bank button, then move fader 1.
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x2E, 0x7F],
        },
        0,
    );
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: pitch_bend(0, 1.0),
        },
        1,
    );

    let first = engine.host().track_at(0).unwrap();
    let second = engine.host().track_at(1).unwrap();
    assert!(engine.host().volume(first) < 1.0);
    assert!((engine.host().volume(second) - 1.0).abs() < 1e-6);
}

#[test]
fn held_modifier_reroutes_button_binding() {
    let (_dir, mut engine) = build_engine(ONE_PAGE, 8);
    let track = engine.host().track_at(0).unwrap();

    // Shift held: Mute1 binds TrackSolo instead of TrackMute.
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x46, 0x7F],
        },
        0,
    );
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x10, 0x7F],
        },
        1,
    );

    assert!(engine.host().solo(track));
    assert!(!engine.host().mute(track));

    // Release Shift; the plain binding mutes.
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x46, 0x00],
        },
        2,
    );
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x10, 0x7F],
        },
        3,
    );
    assert!(engine.host().mute(track));
}

#[test]
fn hold_binding_fires_after_delay_and_not_on_tap() {
    let (_dir, mut engine) = build_engine(ONE_PAGE, 8);
    let track = engine.host().track_at(0).unwrap();

    // Tap: press and release before the deadline.
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x10, 0x7F],
        },
        0,
    );
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x10, 0x00],
        },
        200,
    );
    engine.tick(2_000);
    assert!(!engine.host().record_arm(track));

    // Hold past the deadline: the record-arm binding fires once.
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x10, 0x7F],
        },
        3_000,
    );
    engine.tick(3_500);
    assert!(!engine.host().record_arm(track));
    engine.tick(4_000);
    assert!(engine.host().record_arm(track));
}

#[test]
fn track_selection_maps_send_slots_with_no_action_padding() {
    let (_dir, mut engine) = build_engine(ONE_PAGE, 8);

    let track = engine.host().track_at(2).unwrap();
    engine.host_mut().select_only(track);
    engine.handle_event(InputEvent::TrackSelected, 0);

    let surface = &engine.active_page().surfaces[0];
    // One real send: Send1 live at slot 0, Send2 padded structurally.
    assert_eq!(surface.zone("Send1").unwrap().state, ZoneState::Active(0));
    assert_eq!(surface.zone("Send2").unwrap().state, ZoneState::NoAction(1));
}

#[test]
fn send_zone_reactivation_leaves_no_residue() {
    let (_dir, mut engine) = build_engine(ONE_PAGE, 8);

    // Track 1 has one send, track 2 has two.
    let one_send = engine.host().track_at(0).unwrap();
    let two_sends = engine.host().track_at(1).unwrap();

    engine.host_mut().select_only(one_send);
    engine.handle_event(InputEvent::TrackSelected, 0);

    // Fader2 drives send slot 1 structurally; it has no live send, so input
    // must not reach the host.
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: pitch_bend(1, 0.9),
        },
        1,
    );
    assert!((engine.host().send_volume(one_send, 1) - 0.0).abs() < 1e-9);

    // Reselecting a track with two sends makes slot 1 live and drives its
    // send, proving the NoAction binding was fully replaced.
    engine.host_mut().select_only(two_sends);
    engine.handle_event(InputEvent::TrackSelected, 2);

    let surface = &engine.active_page().surfaces[0];
    assert_eq!(surface.zone("Send2").unwrap().state, ZoneState::Active(1));

    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: pitch_bend(1, 0.9),
        },
        3,
    );
    assert!((engine.host().send_volume(two_sends, 1) - 0.9).abs() < 1e-6);
}

#[test]
fn deactivated_send_zone_falls_back_to_home_binding() {
    let (_dir, mut engine) = build_engine(ONE_PAGE, 8);

    let track = engine.host().track_at(0).unwrap();
    engine.host_mut().select_only(track);
    engine.handle_event(InputEvent::TrackSelected, 0);

    // Send1 owns Fader1 while mapped.
    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: pitch_bend(0, 0.8),
        },
        1,
    );
    assert!((engine.host().send_volume(track, 0) - 0.8).abs() < 1e-6);

    // Deselect everything and remap: send zones deactivate and Fader1 falls
    // back to the channel strip inherited from Home's included zones.
    for i in 0..engine.host().track_count() {
        let t = engine.host().track_at(i).unwrap();
        engine.host_mut().set_selected(t, false);
    }
    engine.handle_event(InputEvent::TrackSelected, 2);

    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: pitch_bend(0, 0.3),
        },
        3,
    );
    assert!((engine.host().volume(track) - 0.3).abs() < 1e-6);
}

const TWO_SURFACES: &str = "\
Page HomePage FollowMCP NoSynchPages NoScrollLink NoTrackColoring 0 0 0
MidiSurface MCU 1 1 MCU.mst MCU UseZoneLink AutoMapSends AutoMapFX AutoMapFXMenu AutoMapFocusedFX
MidiSurface XT 2 2 MCU.mst MCU UseZoneLink NoAutoMapSends NoAutoMapFX NoAutoMapFXMenu NoAutoMapFocusedFX
";

#[test]
fn zone_link_follows_to_linked_surfaces() {
    let (_dir, mut engine) = build_engine(TWO_SURFACES, 8);

    engine.go_zone("MCU", "Send1", 0);
    let page = engine.active_page();
    assert!(page.surfaces[0].zone("Send1").unwrap().state.is_active());
    assert!(page.surfaces[1].zone("Send1").unwrap().state.is_active());
}

const TWO_PAGES_SYNCH: &str = "\
Page PageA FollowMCP SynchPages NoScrollLink NoTrackColoring 0 0 0
MidiSurface MCU 1 1 MCU.mst MCU UseZoneLink AutoMapSends AutoMapFX AutoMapFXMenu AutoMapFocusedFX
Page PageB FollowMCP SynchPages NoScrollLink NoTrackColoring 0 0 0
MidiSurface MCU 1 1 MCU.mst MCU UseZoneLink AutoMapSends AutoMapFX AutoMapFXMenu AutoMapFocusedFX
";

const TWO_PAGES_FREE: &str = "\
Page PageA FollowMCP NoSynchPages NoScrollLink NoTrackColoring 0 0 0
MidiSurface MCU 1 1 MCU.mst MCU UseZoneLink AutoMapSends AutoMapFX AutoMapFXMenu AutoMapFocusedFX
Page PageB FollowMCP NoSynchPages NoScrollLink NoTrackColoring 0 0 0
MidiSurface MCU 1 1 MCU.mst MCU UseZoneLink AutoMapSends AutoMapFX AutoMapFXMenu AutoMapFocusedFX
";

#[test]
fn synch_pages_carries_bank_offset_across_switch() {
    let (_dir, mut engine) = build_engine(TWO_PAGES_SYNCH, 8);

    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x2E, 0x7F],
        },
        0,
    );
    assert_eq!(engine.active_page().state.navigators.track_offset(), 1);

    engine.next_page(1);
    assert_eq!(engine.active_page_name(), "PageB");
    assert_eq!(engine.active_page().state.navigators.track_offset(), 1);
}

#[test]
fn unsynched_pages_keep_their_own_offsets() {
    let (_dir, mut engine) = build_engine(TWO_PAGES_FREE, 8);

    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x2E, 0x7F],
        },
        0,
    );
    engine.next_page(1);
    assert_eq!(engine.active_page().state.navigators.track_offset(), 0);
}

#[test]
fn play_button_feedback_follows_transport() {
    let (_dir, mut engine) = build_engine(ONE_PAGE, 4);

    engine.handle_event(
        InputEvent::Midi {
            port: 1,
            bytes: vec![0x90, 0x5E, 0x7F],
        },
        0,
    );
    assert!(engine.host().play_state().is_rolling());

    engine.tick(1);
    let lit = engine
        .take_outbound()
        .into_iter()
        .any(|o| matches!(&o.message, OutMessage::Midi(bytes) if bytes == &vec![0x90, 0x5E, 0x7F]));
    assert!(lit);
}

#[test]
fn go_page_by_name_is_case_insensitive() {
    let (_dir, mut engine) = build_engine(TWO_PAGES_FREE, 4);
    engine.go_page("pageb", 0);
    assert_eq!(engine.active_page_name(), "PageB");
    engine.go_page("PAGEA", 1);
    assert_eq!(engine.active_page_name(), "PageA");
}
