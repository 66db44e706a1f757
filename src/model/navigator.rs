//! Track navigation: channel navigators, banking, pinning, scroll-link
//!
//! A channel navigator maps a fixed logical channel number to whatever host
//! track is currently visible through the page's scroll window. Pinning a
//! channel freezes it to a snapshot track; pinned tracks leave the windowed
//! view, and channels above a pinned one are biased down so their neighbors
//! keep their tracks.

use super::NavigatorId;
use crate::host::{Host, TrackRef};
use std::collections::HashMap;

/// Which navigation policy a widget-action manager resolves tracks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigatorRef {
    /// Track-independent bindings (transport, paging, master).
    #[default]
    None,
    /// A fixed logical channel resolved through the bank window.
    Channel(NavigatorId),
    /// Always the host's selected track.
    Selected,
    /// The track owning the plugin editor with keyboard focus.
    FocusedFx,
}

#[derive(Debug, Clone)]
struct ChannelNavigator {
    channel: usize,
    /// Number of pinned channels below this one; subtracted at resolution.
    bias: usize,
    pinned: Option<TrackRef>,
    touched: bool,
}

/// Per-page bank of channel navigators plus the scroll window state.
#[derive(Debug, Default)]
pub struct NavigatorBank {
    navigators: Vec<ChannelNavigator>,
    by_name: HashMap<String, NavigatorId>,
    track_offset: usize,
    scroll_link: bool,
    target_scroll_link_channel: usize,
}

impl NavigatorBank {
    pub fn new(scroll_link: bool) -> Self {
        Self {
            scroll_link,
            ..Self::default()
        }
    }

    /// Navigator for a named channel, allocating the next sequential logical
    /// channel number on first request. Idempotent per channel name.
    pub fn navigator_for(&mut self, channel_name: &str) -> NavigatorId {
        if let Some(&id) = self.by_name.get(channel_name) {
            return id;
        }
        let id = NavigatorId(self.navigators.len());
        self.navigators.push(ChannelNavigator {
            channel: self.navigators.len(),
            bias: 0,
            pinned: None,
            touched: false,
        });
        self.by_name.insert(channel_name.to_string(), id);
        id
    }

    /// Number of channels in the bank; the scroll window size.
    pub fn window_size(&self) -> usize {
        self.navigators.len()
    }

    pub fn track_offset(&self) -> usize {
        self.track_offset
    }

    pub fn scroll_link(&self) -> bool {
        self.scroll_link
    }

    pub fn set_scroll_link(&mut self, on: bool) {
        self.scroll_link = on;
    }

    pub fn set_target_scroll_link_channel(&mut self, channel: usize) {
        self.target_scroll_link_channel = channel;
    }

    /// Adopt another bank's window origin (SynchPages).
    pub fn adopt_offset(&mut self, offset: usize) {
        self.track_offset = offset;
    }

    /// SynchPages hand-off: adopt the outgoing page's window origin and the
    /// touch state of the channels both banks share.
    pub fn adopt_from(&mut self, other: &NavigatorBank) {
        self.track_offset = other.track_offset;
        for (nav, theirs) in self.navigators.iter_mut().zip(other.navigators.iter()) {
            nav.touched = theirs.touched;
        }
    }

    /// Host tracks with every pinned track filtered out, in host order.
    fn unpinned_tracks(&self, host: &dyn Host) -> Vec<TrackRef> {
        let mut tracks = Vec::with_capacity(host.track_count());
        for i in 0..host.track_count() {
            if let Some(track) = host.track_at(i) {
                if !self.navigators.iter().any(|n| n.pinned == Some(track)) {
                    tracks.push(track);
                }
            }
        }
        tracks
    }

    /// Resolve a navigator to its current host track.
    pub fn track_for(&self, id: NavigatorId, host: &dyn Host) -> Option<TrackRef> {
        let nav = self.navigators.get(id.0)?;
        if let Some(pinned) = nav.pinned {
            return Some(pinned);
        }
        let index = (nav.channel + self.track_offset).checked_sub(nav.bias)?;
        self.unpinned_tracks(host).get(index).copied()
    }

    /// Shift the scroll window. The offset stays inside
    /// `[0, max(0, tracks - windowSize)]`; a no-op when everything fits.
    pub fn adjust_track_bank(&mut self, amount: i64, host: &dyn Host) {
        let total = self.unpinned_tracks(host).len();
        let window = self.navigators.len();
        if total <= window {
            return;
        }
        let top = (total - window) as i64;
        self.track_offset = (self.track_offset as i64 + amount).clamp(0, top) as usize;
    }

    /// Freeze a channel to its currently resolved track.
    pub fn pin(&mut self, id: NavigatorId, host: &dyn Host) {
        if self.navigators.get(id.0).is_none_or(|n| n.pinned.is_some()) {
            return;
        }
        let Some(track) = self.track_for(id, host) else {
            return;
        };
        let channel = self.navigators[id.0].channel;
        self.navigators[id.0].pinned = Some(track);
        for nav in &mut self.navigators {
            if nav.channel > channel {
                nav.bias += 1;
            }
        }
    }

    /// Release a pinned channel back to windowed resolution.
    pub fn unpin(&mut self, id: NavigatorId) {
        let Some(nav) = self.navigators.get_mut(id.0) else {
            return;
        };
        if nav.pinned.take().is_none() {
            return;
        }
        let channel = nav.channel;
        for nav in &mut self.navigators {
            if nav.channel > channel && nav.bias > 0 {
                nav.bias -= 1;
            }
        }
    }

    pub fn is_pinned(&self, id: NavigatorId) -> bool {
        self.navigators.get(id.0).is_some_and(|n| n.pinned.is_some())
    }

    pub fn toggle_pin(&mut self, id: NavigatorId, host: &dyn Host) {
        if self.is_pinned(id) {
            self.unpin(id);
        } else {
            self.pin(id, host);
        }
    }

    pub fn set_touched(&mut self, id: NavigatorId, touched: bool) {
        if let Some(nav) = self.navigators.get_mut(id.0) {
            nav.touched = touched;
        }
    }

    pub fn touched(&self, id: NavigatorId) -> bool {
        self.navigators.get(id.0).is_some_and(|n| n.touched)
    }

    /// Scroll-follow: move the window so the host's selected track is visible,
    /// biased toward the target scroll-link channel. The offset is computed
    /// first and re-clamped by the banking bounds afterwards.
    pub fn on_track_selection(&mut self, host: &dyn Host) {
        if !self.scroll_link {
            return;
        }
        let Some(selected) = host.selected_track() else {
            return;
        };
        for i in 0..self.navigators.len() {
            if self.track_for(NavigatorId(i), host) == Some(selected) {
                return; // already visible through a channel
            }
        }

        let unpinned = self.unpinned_tracks(host);
        let Some(index) = unpinned.iter().position(|&t| t == selected) else {
            return;
        };
        let offset = index.saturating_sub(self.target_scroll_link_channel);

        let window = self.navigators.len();
        let top = unpinned.len().saturating_sub(window);
        self.track_offset = offset.min(top);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockHost;
    use proptest::prelude::*;

    fn bank_with_channels(n: usize) -> NavigatorBank {
        let mut bank = NavigatorBank::new(false);
        for i in 0..n {
            bank.navigator_for(&format!("Surface{}", i));
        }
        bank
    }

    #[test]
    fn navigator_for_is_idempotent_per_name() {
        let mut bank = NavigatorBank::new(false);
        let a = bank.navigator_for("MCU0");
        let b = bank.navigator_for("MCU0");
        let c = bank.navigator_for("MCU1");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(bank.window_size(), 2);
    }

    #[test]
    fn windowed_resolution_follows_offset() {
        let host = MockHost::with_tracks(16);
        let mut bank = bank_with_channels(8);

        assert_eq!(bank.track_for(NavigatorId(0), &host), host.track_at(0));

        bank.adjust_track_bank(4, &host);
        assert_eq!(bank.track_for(NavigatorId(0), &host), host.track_at(4));
        assert_eq!(bank.track_for(NavigatorId(7), &host), host.track_at(11));
    }

    #[test]
    fn bank_is_noop_when_everything_fits() {
        let host = MockHost::with_tracks(4);
        let mut bank = bank_with_channels(8);
        bank.adjust_track_bank(3, &host);
        assert_eq!(bank.track_offset(), 0);
    }

    #[test]
    fn pin_freezes_track_across_banking() {
        let host = MockHost::with_tracks(16);
        let mut bank = bank_with_channels(8);

        let pinned_track = bank.track_for(NavigatorId(2), &host).unwrap();
        bank.pin(NavigatorId(2), &host);

        bank.adjust_track_bank(5, &host);
        assert_eq!(bank.track_for(NavigatorId(2), &host), Some(pinned_track));

        bank.unpin(NavigatorId(2));
        assert_ne!(bank.track_for(NavigatorId(2), &host), Some(pinned_track));
    }

    #[test]
    fn pinning_biases_higher_channels() {
        let host = MockHost::with_tracks(16);
        let mut bank = bank_with_channels(8);

        let track_at_3 = bank.track_for(NavigatorId(3), &host).unwrap();
        bank.pin(NavigatorId(2), &host);

        // Channel 3 keeps its track: the pinned track left the windowed view
        // and the bias compensates.
        assert_eq!(bank.track_for(NavigatorId(3), &host), Some(track_at_3));
    }

    #[test]
    fn scroll_link_centers_selected_track() {
        let mut host = MockHost::with_tracks(32);
        let mut bank = bank_with_channels(8);
        bank.set_scroll_link(true);
        bank.set_target_scroll_link_channel(2);

        let selected = host.track_at(20).unwrap();
        host.select_only(selected);
        bank.on_track_selection(&host);

        assert_eq!(bank.track_offset(), 18);
        assert_eq!(bank.track_for(NavigatorId(2), &host), Some(selected));
    }

    #[test]
    fn scroll_link_leaves_window_when_track_visible() {
        let mut host = MockHost::with_tracks(32);
        let mut bank = bank_with_channels(8);
        bank.set_scroll_link(true);

        let selected = host.track_at(3).unwrap();
        host.select_only(selected);
        bank.on_track_selection(&host);
        assert_eq!(bank.track_offset(), 0);
    }

    #[test]
    fn scroll_link_clamps_near_end_of_track_list() {
        let mut host = MockHost::with_tracks(10);
        let mut bank = bank_with_channels(8);
        bank.set_scroll_link(true);

        let selected = host.track_at(9).unwrap();
        host.select_only(selected);
        bank.on_track_selection(&host);
        assert_eq!(bank.track_offset(), 2); // clamped to tracks - window
    }

    proptest! {
        #[test]
        fn bank_offset_always_clamped(
            total in 0usize..64,
            window in 1usize..16,
            moves in proptest::collection::vec(-20i64..20, 0..32),
        ) {
            let host = MockHost::with_tracks(total);
            let mut bank = bank_with_channels(window);
            for amount in moves {
                bank.adjust_track_bank(amount, &host);
                let top = total.saturating_sub(window);
                prop_assert!(bank.track_offset() <= top);
            }
        }
    }
}
