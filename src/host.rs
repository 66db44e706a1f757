//! Host capability interface
//!
//! Everything the binding core needs from the host audio application, expressed
//! as one trait with an opaque track handle. All calls are synchronous and
//! immediately consistent. A missing track, FX or send yields neutral values
//! (zero, false, empty string) rather than an error, so a stale binding can
//! never crash the surface.
//!
//! [`MockHost`] is the in-crate implementation used by the standalone binary
//! and the test suite.

use std::collections::HashMap;

/// Opaque, stable handle to a host track. Handles survive track reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackRef(pub u64);

/// Transport state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
    Recording,
    RecordPaused,
}

impl PlayState {
    /// Playing or recording (transport is rolling).
    pub fn is_rolling(self) -> bool {
        matches!(self, PlayState::Playing | PlayState::Recording)
    }

    /// Anything the Play button lights up for.
    pub fn shows_play(self) -> bool {
        !matches!(self, PlayState::Stopped)
    }
}

/// The host capability set consumed by actions.
pub trait Host {
    // Tracks
    fn track_count(&self) -> usize;
    fn track_at(&self, index: usize) -> Option<TrackRef>;
    fn track_index(&self, track: TrackRef) -> Option<usize>;
    fn master_track(&self) -> TrackRef;
    fn track_name(&self, track: TrackRef) -> String;

    // Selection
    fn selected_track(&self) -> Option<TrackRef>;
    fn is_selected(&self, track: TrackRef) -> bool;
    fn set_selected(&mut self, track: TrackRef, selected: bool);
    fn select_only(&mut self, track: TrackRef);

    // Mixer
    fn volume(&self, track: TrackRef) -> f64;
    fn set_volume(&mut self, track: TrackRef, value: f64);
    fn volume_db(&self, track: TrackRef) -> f64;
    fn pan(&self, track: TrackRef) -> f64;
    fn set_pan(&mut self, track: TrackRef, value: f64);
    fn pan_width(&self, track: TrackRef) -> f64;
    fn set_pan_width(&mut self, track: TrackRef, value: f64);
    fn mute(&self, track: TrackRef) -> bool;
    fn set_mute(&mut self, track: TrackRef, mute: bool);
    fn solo(&self, track: TrackRef) -> bool;
    fn set_solo(&mut self, track: TrackRef, solo: bool);
    fn record_arm(&self, track: TrackRef) -> bool;
    fn set_record_arm(&mut self, track: TrackRef, arm: bool);

    // FX
    fn fx_count(&self, track: TrackRef) -> usize;
    fn fx_name(&self, track: TrackRef, fx: usize) -> String;
    fn fx_param_count(&self, track: TrackRef, fx: usize) -> usize;
    fn fx_param(&self, track: TrackRef, fx: usize, param: usize) -> f64;
    fn set_fx_param(&mut self, track: TrackRef, fx: usize, param: usize, value: f64);
    fn fx_param_name(&self, track: TrackRef, fx: usize, param: usize) -> String;
    fn open_fx_window(&mut self, track: TrackRef, fx: usize);
    fn close_fx_window(&mut self, track: TrackRef, fx: usize);
    /// Track and FX index of the plugin editor with keyboard focus, if any.
    fn focused_fx(&self) -> Option<(TrackRef, usize)>;
    /// Gain reduction reported by a dynamics plugin, in (negative) dB.
    fn gain_reduction_db(&self, track: TrackRef, fx: usize) -> f64;

    // Sends
    fn send_count(&self, track: TrackRef) -> usize;
    fn send_name(&self, track: TrackRef, send: usize) -> String;
    fn send_volume(&self, track: TrackRef, send: usize) -> f64;
    fn set_send_volume(&mut self, track: TrackRef, send: usize, value: f64);
    fn send_pan(&self, track: TrackRef, send: usize) -> f64;
    fn set_send_pan(&mut self, track: TrackRef, send: usize, value: f64);
    fn send_mute(&self, track: TrackRef, send: usize) -> bool;
    fn set_send_mute(&mut self, track: TrackRef, send: usize, mute: bool);

    // Transport
    fn play(&mut self);
    fn stop(&mut self);
    fn record(&mut self);
    fn rewind(&mut self);
    fn fast_forward(&mut self);
    fn play_state(&self) -> PlayState;
    fn repeat(&self) -> bool;
    fn set_repeat(&mut self, on: bool);
    fn playback_position_seconds(&self) -> f64;
    fn cycle_time_display_mode(&mut self);

    // Automation
    fn automation_mode(&self, track: TrackRef) -> i32;
    fn set_automation_mode(&mut self, track: TrackRef, mode: i32);
    fn global_automation_override(&self) -> i32;
    fn set_global_automation_override(&mut self, mode: i32);

    // Metering
    fn track_peak(&self, track: TrackRef, channel: usize) -> f64;

    // Generic numbered host command (pass-through)
    fn run_command(&mut self, command_id: i32);
    fn command_state(&self, command_id: i32) -> bool;
}

/// One mock track.
#[derive(Debug, Clone)]
pub struct MockTrack {
    pub name: String,
    pub volume: f64,
    pub pan: f64,
    pub pan_width: f64,
    pub mute: bool,
    pub solo: bool,
    pub record_arm: bool,
    pub selected: bool,
    pub automation_mode: i32,
    pub fx: Vec<MockFx>,
    pub sends: Vec<MockSend>,
    pub peaks: Vec<f64>,
}

impl MockTrack {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            volume: 0.716,
            pan: 0.5,
            pan_width: 1.0,
            mute: false,
            solo: false,
            record_arm: false,
            selected: false,
            automation_mode: 0,
            fx: Vec::new(),
            sends: Vec::new(),
            peaks: vec![0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockFx {
    pub name: String,
    pub params: Vec<(String, f64)>,
    pub window_open: bool,
    pub gain_reduction_db: f64,
}

impl MockFx {
    pub fn named(name: &str, params: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            params: params.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            window_open: false,
            gain_reduction_db: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockSend {
    pub name: String,
    pub volume: f64,
    pub pan: f64,
    pub mute: bool,
}

impl MockSend {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            volume: 0.716,
            pan: 0.5,
            mute: false,
        }
    }
}

/// In-memory host: a flat track list plus transport/automation state. Tracks
/// get stable ids at insertion so handles survive reordering.
#[derive(Debug, Default)]
pub struct MockHost {
    order: Vec<u64>,
    tracks: HashMap<u64, MockTrack>,
    next_id: u64,
    master: Option<u64>,
    play_state: PlayStateCell,
    repeat: bool,
    position_seconds: f64,
    focused_fx: Option<(TrackRef, usize)>,
    time_display_mode: u8,
    global_automation: i32,
    commands_on: HashMap<i32, bool>,
}

#[derive(Debug)]
struct PlayStateCell(PlayState);

impl Default for PlayStateCell {
    fn default() -> Self {
        Self(PlayState::Stopped)
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a host with `count` tracks named "Track 1".."Track N".
    pub fn with_tracks(count: usize) -> Self {
        let mut host = Self::new();
        for i in 0..count {
            host.add_track(MockTrack::named(&format!("Track {}", i + 1)));
        }
        host
    }

    pub fn add_track(&mut self, track: MockTrack) -> TrackRef {
        let id = self.next_id;
        self.next_id += 1;
        self.order.push(id);
        self.tracks.insert(id, track);
        TrackRef(id)
    }

    pub fn set_focused_fx(&mut self, focus: Option<(TrackRef, usize)>) {
        self.focused_fx = focus;
    }

    pub fn set_position_seconds(&mut self, seconds: f64) {
        self.position_seconds = seconds;
    }

    pub fn track_mut(&mut self, track: TrackRef) -> Option<&mut MockTrack> {
        self.tracks.get_mut(&track.0)
    }

    fn track(&self, track: TrackRef) -> Option<&MockTrack> {
        self.tracks.get(&track.0)
    }

    fn ensure_master(&mut self) -> u64 {
        if let Some(id) = self.master {
            return id;
        }
        let id = u64::MAX;
        self.tracks.insert(id, MockTrack::named("Master"));
        self.master = Some(id);
        id
    }
}

impl Host for MockHost {
    fn track_count(&self) -> usize {
        self.order.len()
    }

    fn track_at(&self, index: usize) -> Option<TrackRef> {
        self.order.get(index).copied().map(TrackRef)
    }

    fn track_index(&self, track: TrackRef) -> Option<usize> {
        self.order.iter().position(|&id| id == track.0)
    }

    fn master_track(&self) -> TrackRef {
        TrackRef(self.master.unwrap_or(u64::MAX))
    }

    fn track_name(&self, track: TrackRef) -> String {
        self.track(track).map(|t| t.name.clone()).unwrap_or_default()
    }

    fn selected_track(&self) -> Option<TrackRef> {
        self.order
            .iter()
            .find(|id| self.tracks[id].selected)
            .map(|&id| TrackRef(id))
    }

    fn is_selected(&self, track: TrackRef) -> bool {
        self.track(track).map(|t| t.selected).unwrap_or(false)
    }

    fn set_selected(&mut self, track: TrackRef, selected: bool) {
        if let Some(t) = self.tracks.get_mut(&track.0) {
            t.selected = selected;
        }
    }

    fn select_only(&mut self, track: TrackRef) {
        for t in self.tracks.values_mut() {
            t.selected = false;
        }
        self.set_selected(track, true);
    }

    fn volume(&self, track: TrackRef) -> f64 {
        self.track(track).map(|t| t.volume).unwrap_or(0.0)
    }

    fn set_volume(&mut self, track: TrackRef, value: f64) {
        if let Some(t) = self.tracks.get_mut(&track.0) {
            t.volume = value.clamp(0.0, 1.0);
        }
    }

    fn volume_db(&self, track: TrackRef) -> f64 {
        let v = self.volume(track);
        if v <= 0.0 {
            -150.0
        } else {
            20.0 * v.log10()
        }
    }

    fn pan(&self, track: TrackRef) -> f64 {
        self.track(track).map(|t| t.pan).unwrap_or(0.5)
    }

    fn set_pan(&mut self, track: TrackRef, value: f64) {
        if let Some(t) = self.tracks.get_mut(&track.0) {
            t.pan = value.clamp(0.0, 1.0);
        }
    }

    fn pan_width(&self, track: TrackRef) -> f64 {
        self.track(track).map(|t| t.pan_width).unwrap_or(1.0)
    }

    fn set_pan_width(&mut self, track: TrackRef, value: f64) {
        if let Some(t) = self.tracks.get_mut(&track.0) {
            t.pan_width = value.clamp(0.0, 1.0);
        }
    }

    fn mute(&self, track: TrackRef) -> bool {
        self.track(track).map(|t| t.mute).unwrap_or(false)
    }

    fn set_mute(&mut self, track: TrackRef, mute: bool) {
        if let Some(t) = self.tracks.get_mut(&track.0) {
            t.mute = mute;
        }
    }

    fn solo(&self, track: TrackRef) -> bool {
        self.track(track).map(|t| t.solo).unwrap_or(false)
    }

    fn set_solo(&mut self, track: TrackRef, solo: bool) {
        if let Some(t) = self.tracks.get_mut(&track.0) {
            t.solo = solo;
        }
    }

    fn record_arm(&self, track: TrackRef) -> bool {
        self.track(track).map(|t| t.record_arm).unwrap_or(false)
    }

    fn set_record_arm(&mut self, track: TrackRef, arm: bool) {
        if let Some(t) = self.tracks.get_mut(&track.0) {
            t.record_arm = arm;
        }
    }

    fn fx_count(&self, track: TrackRef) -> usize {
        self.track(track).map(|t| t.fx.len()).unwrap_or(0)
    }

    fn fx_name(&self, track: TrackRef, fx: usize) -> String {
        self.track(track)
            .and_then(|t| t.fx.get(fx))
            .map(|f| f.name.clone())
            .unwrap_or_default()
    }

    fn fx_param_count(&self, track: TrackRef, fx: usize) -> usize {
        self.track(track)
            .and_then(|t| t.fx.get(fx))
            .map(|f| f.params.len())
            .unwrap_or(0)
    }

    fn fx_param(&self, track: TrackRef, fx: usize, param: usize) -> f64 {
        self.track(track)
            .and_then(|t| t.fx.get(fx))
            .and_then(|f| f.params.get(param))
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }

    fn set_fx_param(&mut self, track: TrackRef, fx: usize, param: usize, value: f64) {
        if let Some(p) = self
            .tracks
            .get_mut(&track.0)
            .and_then(|t| t.fx.get_mut(fx))
            .and_then(|f| f.params.get_mut(param))
        {
            p.1 = value.clamp(0.0, 1.0);
        }
    }

    fn fx_param_name(&self, track: TrackRef, fx: usize, param: usize) -> String {
        self.track(track)
            .and_then(|t| t.fx.get(fx))
            .and_then(|f| f.params.get(param))
            .map(|(n, _)| n.clone())
            .unwrap_or_default()
    }

    fn open_fx_window(&mut self, track: TrackRef, fx: usize) {
        if let Some(f) = self.tracks.get_mut(&track.0).and_then(|t| t.fx.get_mut(fx)) {
            f.window_open = true;
        }
    }

    fn close_fx_window(&mut self, track: TrackRef, fx: usize) {
        if let Some(f) = self.tracks.get_mut(&track.0).and_then(|t| t.fx.get_mut(fx)) {
            f.window_open = false;
        }
    }

    fn focused_fx(&self) -> Option<(TrackRef, usize)> {
        self.focused_fx
    }

    fn gain_reduction_db(&self, track: TrackRef, fx: usize) -> f64 {
        self.track(track)
            .and_then(|t| t.fx.get(fx))
            .map(|f| f.gain_reduction_db)
            .unwrap_or(0.0)
    }

    fn send_count(&self, track: TrackRef) -> usize {
        self.track(track).map(|t| t.sends.len()).unwrap_or(0)
    }

    fn send_name(&self, track: TrackRef, send: usize) -> String {
        self.track(track)
            .and_then(|t| t.sends.get(send))
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    fn send_volume(&self, track: TrackRef, send: usize) -> f64 {
        self.track(track)
            .and_then(|t| t.sends.get(send))
            .map(|s| s.volume)
            .unwrap_or(0.0)
    }

    fn set_send_volume(&mut self, track: TrackRef, send: usize, value: f64) {
        if let Some(s) = self
            .tracks
            .get_mut(&track.0)
            .and_then(|t| t.sends.get_mut(send))
        {
            s.volume = value.clamp(0.0, 1.0);
        }
    }

    fn send_pan(&self, track: TrackRef, send: usize) -> f64 {
        self.track(track)
            .and_then(|t| t.sends.get(send))
            .map(|s| s.pan)
            .unwrap_or(0.5)
    }

    fn set_send_pan(&mut self, track: TrackRef, send: usize, value: f64) {
        if let Some(s) = self
            .tracks
            .get_mut(&track.0)
            .and_then(|t| t.sends.get_mut(send))
        {
            s.pan = value.clamp(0.0, 1.0);
        }
    }

    fn send_mute(&self, track: TrackRef, send: usize) -> bool {
        self.track(track)
            .and_then(|t| t.sends.get(send))
            .map(|s| s.mute)
            .unwrap_or(false)
    }

    fn set_send_mute(&mut self, track: TrackRef, send: usize, mute: bool) {
        if let Some(s) = self
            .tracks
            .get_mut(&track.0)
            .and_then(|t| t.sends.get_mut(send))
        {
            s.mute = mute;
        }
    }

    fn play(&mut self) {
        self.play_state.0 = PlayState::Playing;
    }

    fn stop(&mut self) {
        self.play_state.0 = PlayState::Stopped;
    }

    fn record(&mut self) {
        self.play_state.0 = PlayState::Recording;
    }

    fn rewind(&mut self) {
        self.position_seconds = (self.position_seconds - 1.0).max(0.0);
    }

    fn fast_forward(&mut self) {
        self.position_seconds += 1.0;
    }

    fn play_state(&self) -> PlayState {
        self.play_state.0
    }

    fn repeat(&self) -> bool {
        self.repeat
    }

    fn set_repeat(&mut self, on: bool) {
        self.repeat = on;
    }

    fn playback_position_seconds(&self) -> f64 {
        self.position_seconds
    }

    fn cycle_time_display_mode(&mut self) {
        self.time_display_mode = (self.time_display_mode + 1) % 6;
    }

    fn automation_mode(&self, track: TrackRef) -> i32 {
        self.track(track).map(|t| t.automation_mode).unwrap_or(0)
    }

    fn set_automation_mode(&mut self, track: TrackRef, mode: i32) {
        if let Some(t) = self.tracks.get_mut(&track.0) {
            t.automation_mode = mode;
        }
    }

    fn global_automation_override(&self) -> i32 {
        self.global_automation
    }

    fn set_global_automation_override(&mut self, mode: i32) {
        self.global_automation = mode;
    }

    fn track_peak(&self, track: TrackRef, channel: usize) -> f64 {
        self.track(track)
            .and_then(|t| t.peaks.get(channel))
            .copied()
            .unwrap_or(0.0)
    }

    fn run_command(&mut self, command_id: i32) {
        let state = self.commands_on.entry(command_id).or_insert(false);
        *state = !*state;
    }

    fn command_state(&self, command_id: i32) -> bool {
        self.commands_on.get(&command_id).copied().unwrap_or(false)
    }
}

impl MockHost {
    /// Ensure the master track exists before it is first addressed.
    pub fn init_master(&mut self) -> TrackRef {
        TrackRef(self.ensure_master())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_survive_reorder() {
        let mut host = MockHost::with_tracks(3);
        let second = host.track_at(1).unwrap();
        assert_eq!(host.track_name(second), "Track 2");

        host.order.swap(0, 1);
        assert_eq!(host.track_index(second), Some(0));
        assert_eq!(host.track_name(second), "Track 2");
    }

    #[test]
    fn missing_track_yields_neutral_values() {
        let host = MockHost::with_tracks(1);
        let ghost = TrackRef(999);
        assert_eq!(host.volume(ghost), 0.0);
        assert!(!host.mute(ghost));
        assert_eq!(host.track_name(ghost), "");
        assert_eq!(host.fx_count(ghost), 0);
    }

    #[test]
    fn select_only_clears_others() {
        let mut host = MockHost::with_tracks(3);
        let a = host.track_at(0).unwrap();
        let b = host.track_at(2).unwrap();
        host.set_selected(a, true);
        host.select_only(b);
        assert!(!host.is_selected(a));
        assert!(host.is_selected(b));
        assert_eq!(host.selected_track(), Some(b));
    }
}
