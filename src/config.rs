//! Master configuration
//!
//! The top-level config file is an ini-like line grammar parsed with the shared
//! tokenizer: monitor toggles, `Page` records and `MidiSurface`/`OSCSurface`
//! records. Surfaces attach to the most recently declared page. Malformed
//! records are skipped with a diagnostic; loading never fails on content.

use crate::tokenize::{is_skippable, tokenize};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

pub const MIDI_IN_MONITOR: &str = "MidiInMonitor";
pub const MIDI_OUT_MONITOR: &str = "MidiOutMonitor";
pub const VST_MONITOR: &str = "VSTMonitor";
pub const OSC_IN_MONITOR: &str = "OSCInMonitor";
pub const OSC_OUT_MONITOR: &str = "OSCOutMonitor";
pub const PAGE: &str = "Page";
pub const MIDI_SURFACE: &str = "MidiSurface";
pub const OSC_SURFACE: &str = "OSCSurface";

/// Root configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub midi_in_monitor: bool,
    pub midi_out_monitor: bool,
    pub vst_monitor: bool,
    pub osc_in_monitor: bool,
    pub osc_out_monitor: bool,
    pub pages: Vec<PageDef>,
}

/// One `Page` record.
#[derive(Debug, Clone)]
pub struct PageDef {
    pub name: String,
    /// Follow the mixer track order rather than the arrange view.
    pub follow_mixer: bool,
    /// Carry bank offsets and touch state across page switches.
    pub synch_pages: bool,
    pub scroll_link: bool,
    pub track_coloring: bool,
    /// Base color channels used when track coloring is on.
    pub color: (u8, u8, u8),
    pub surfaces: Vec<SurfaceDef>,
}

/// Protocol-specific part of a surface record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceProtocol {
    Midi,
    Osc { remote_ip: String },
}

/// One `MidiSurface` / `OSCSurface` record.
#[derive(Debug, Clone)]
pub struct SurfaceDef {
    pub name: String,
    pub protocol: SurfaceProtocol,
    pub in_port: u16,
    pub out_port: u16,
    pub template: String,
    pub zone_folder: String,
    pub zone_link: bool,
    pub auto_map_sends: bool,
    pub auto_map_fx: bool,
    pub auto_map_fx_menu: bool,
    pub auto_map_focused_fx: bool,
}

impl Config {
    /// Load and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Ok(Self::parse(&contents, path))
    }

    /// Parse configuration text. `source` is only used in diagnostics.
    pub fn parse(contents: &str, source: &Path) -> Self {
        let mut config = Config::default();

        for (idx, line) in contents.lines().enumerate() {
            if is_skippable(line) {
                continue;
            }
            let tokens = tokenize(line);
            if tokens.is_empty() {
                continue;
            }

            let record = tokens[0].as_str();
            match record {
                MIDI_IN_MONITOR | MIDI_OUT_MONITOR | VST_MONITOR | OSC_IN_MONITOR
                | OSC_OUT_MONITOR => {
                    if tokens.len() != 2 {
                        continue;
                    }
                    let on = tokens[1] == "On";
                    match record {
                        MIDI_IN_MONITOR => config.midi_in_monitor = on,
                        MIDI_OUT_MONITOR => config.midi_out_monitor = on,
                        VST_MONITOR => config.vst_monitor = on,
                        OSC_IN_MONITOR => config.osc_in_monitor = on,
                        _ => config.osc_out_monitor = on,
                    }
                }
                PAGE => match parse_page(&tokens) {
                    Some(page) => config.pages.push(page),
                    None => {
                        warn!(
                            "{}:{}: malformed Page record, skipped",
                            source.display(),
                            idx + 1
                        );
                    }
                },
                MIDI_SURFACE | OSC_SURFACE => match parse_surface(&tokens) {
                    Some(surface) => match config.pages.last_mut() {
                        Some(page) => page.surfaces.push(surface),
                        None => {
                            warn!(
                                "{}:{}: surface '{}' declared before any Page, skipped",
                                source.display(),
                                idx + 1,
                                tokens.get(1).map(String::as_str).unwrap_or("?")
                            );
                        }
                    },
                    None => {
                        warn!(
                            "{}:{}: malformed surface record, skipped",
                            source.display(),
                            idx + 1
                        );
                    }
                },
                other => {
                    warn!(
                        "{}:{}: unknown record '{}', skipped",
                        source.display(),
                        idx + 1,
                        other
                    );
                }
            }
        }

        config
    }
}

fn parse_page(tokens: &[String]) -> Option<PageDef> {
    if tokens.len() != 9 {
        return None;
    }
    Some(PageDef {
        name: tokens[1].clone(),
        follow_mixer: tokens[2] == "FollowMCP",
        synch_pages: tokens[3] == "SynchPages",
        scroll_link: tokens[4] == "UseScrollLink",
        track_coloring: tokens[5] == "UseTrackColoring",
        color: (
            tokens[6].parse().ok()?,
            tokens[7].parse().ok()?,
            tokens[8].parse().ok()?,
        ),
        surfaces: Vec::new(),
    })
}

fn parse_surface(tokens: &[String]) -> Option<SurfaceDef> {
    let is_osc = tokens[0] == OSC_SURFACE;
    let expected = if is_osc { 12 } else { 11 };
    if tokens.len() != expected {
        return None;
    }

    let protocol = if is_osc {
        SurfaceProtocol::Osc {
            remote_ip: tokens[11].clone(),
        }
    } else {
        SurfaceProtocol::Midi
    };

    Some(SurfaceDef {
        name: tokens[1].clone(),
        protocol,
        in_port: tokens[2].parse().ok()?,
        out_port: tokens[3].parse().ok()?,
        template: tokens[4].clone(),
        zone_folder: tokens[5].clone(),
        zone_link: tokens[6] == "UseZoneLink",
        auto_map_sends: tokens[7] == "AutoMapSends",
        auto_map_fx: tokens[8] == "AutoMapFX",
        auto_map_fx_menu: tokens[9] == "AutoMapFXMenu",
        auto_map_focused_fx: tokens[10] == "AutoMapFocusedFX",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
/ Master configuration
MidiInMonitor On
MidiOutMonitor Off
VSTMonitor Off

Page HomePage FollowMCP SynchPages UseScrollLink NoTrackColoring 0 0 0
MidiSurface MCU 4 4 MCU.mst MCU UseZoneLink AutoMapSends AutoMapFX AutoMapFXMenu AutoMapFocusedFX
OSCSurface Tablet 8000 9000 Tablet.ost Tablet NoZoneLink NoAutoMapSends NoAutoMapFX NoAutoMapFXMenu NoAutoMapFocusedFX 192.168.1.40
"#;

    #[test]
    fn parses_monitors_pages_and_surfaces() {
        let config = Config::parse(SAMPLE, Path::new("test.ini"));

        assert!(config.midi_in_monitor);
        assert!(!config.midi_out_monitor);
        assert_eq!(config.pages.len(), 1);

        let page = &config.pages[0];
        assert_eq!(page.name, "HomePage");
        assert!(page.follow_mixer);
        assert!(page.synch_pages);
        assert!(page.scroll_link);
        assert!(!page.track_coloring);
        assert_eq!(page.surfaces.len(), 2);

        let mcu = &page.surfaces[0];
        assert_eq!(mcu.name, "MCU");
        assert_eq!(mcu.protocol, SurfaceProtocol::Midi);
        assert_eq!(mcu.in_port, 4);
        assert!(mcu.zone_link);
        assert!(mcu.auto_map_sends);

        let tablet = &page.surfaces[1];
        assert_eq!(
            tablet.protocol,
            SurfaceProtocol::Osc {
                remote_ip: "192.168.1.40".into()
            }
        );
        assert!(!tablet.zone_link);
    }

    #[test]
    fn surface_before_page_is_dropped() {
        let text = "MidiSurface X 1 1 a.mst A NoZoneLink N N N N\n";
        let config = Config::parse(text, Path::new("test.ini"));
        assert!(config.pages.is_empty());
    }

    #[test]
    fn malformed_records_do_not_abort() {
        let text = "Page OnlyAName\nPage Good FollowTCP NoSynchPages NoScrollLink NoTrackColoring 10 20 30\n";
        let config = Config::parse(text, Path::new("test.ini"));
        assert_eq!(config.pages.len(), 1);
        assert_eq!(config.pages[0].name, "Good");
        assert_eq!(config.pages[0].color, (10, 20, 30));
    }
}
