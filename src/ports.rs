//! MIDI port pool
//!
//! Ports are keyed by system port number, opened once on first use and shared
//! by every surface addressing that number. Input connections deliver raw
//! bytes on midir's callback thread; callers hand them straight into the
//! dispatch queue and never touch engine state from the callback.

use anyhow::{anyhow, Context, Result};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct MidiPortPool {
    inputs: HashMap<u16, MidiInputConnection<()>>,
    outputs: HashMap<u16, MidiOutputConnection>,
}

impl Default for MidiPortPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiPortPool {
    pub fn new() -> Self {
        Self {
            inputs: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    /// List (index, name) of the available input ports.
    pub fn list_inputs() -> Result<Vec<(usize, String)>> {
        let midi_in = MidiInput::new("zonewire-scan").context("failed to create MIDI input")?;
        Ok(midi_in
            .ports()
            .iter()
            .enumerate()
            .map(|(i, p)| (i, midi_in.port_name(p).unwrap_or_default()))
            .collect())
    }

    /// List (index, name) of the available output ports.
    pub fn list_outputs() -> Result<Vec<(usize, String)>> {
        let midi_out = MidiOutput::new("zonewire-scan").context("failed to create MIDI output")?;
        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .map(|(i, p)| (i, midi_out.port_name(p).unwrap_or_default()))
            .collect())
    }

    /// Open an input port (idempotent). `on_message` runs on the midir
    /// callback thread for every incoming message.
    pub fn open_input<F>(&mut self, port: u16, on_message: F) -> Result<()>
    where
        F: Fn(&[u8]) + Send + 'static,
    {
        if self.inputs.contains_key(&port) {
            return Ok(());
        }

        let midi_in = MidiInput::new("zonewire").context("failed to create MIDI input")?;
        let ports = midi_in.ports();
        let in_port = ports
            .get(port as usize)
            .ok_or_else(|| anyhow!("MIDI input port {} not found", port))?;
        let name = midi_in.port_name(in_port).unwrap_or_default();

        let connection = midi_in
            .connect(
                in_port,
                "zonewire-in",
                move |_timestamp, data, _| on_message(data),
                (),
            )
            .map_err(|e| anyhow!("failed to connect input port {}: {}", port, e))?;

        info!("opened MIDI input {} ({})", port, name);
        self.inputs.insert(port, connection);
        Ok(())
    }

    /// Open an output port (idempotent).
    pub fn open_output(&mut self, port: u16) -> Result<()> {
        if self.outputs.contains_key(&port) {
            return Ok(());
        }

        let midi_out = MidiOutput::new("zonewire").context("failed to create MIDI output")?;
        let ports = midi_out.ports();
        let out_port = ports
            .get(port as usize)
            .ok_or_else(|| anyhow!("MIDI output port {} not found", port))?;
        let name = midi_out.port_name(out_port).unwrap_or_default();

        let connection = midi_out
            .connect(out_port, "zonewire-out")
            .map_err(|e| anyhow!("failed to connect output port {}: {}", port, e))?;

        info!("opened MIDI output {} ({})", port, name);
        self.outputs.insert(port, connection);
        Ok(())
    }

    /// Send raw bytes to an opened output port.
    pub fn send(&mut self, port: u16, bytes: &[u8]) {
        match self.outputs.get_mut(&port) {
            Some(connection) => {
                if let Err(e) = connection.send(bytes) {
                    warn!("MIDI send on port {} failed: {}", port, e);
                }
            }
            None => debug!("MIDI output port {} not open, message dropped", port),
        }
    }

    /// Close every connection.
    pub fn shutdown(&mut self) {
        for (port, connection) in self.inputs.drain() {
            debug!("closing MIDI input {}", port);
            connection.close();
        }
        for (port, connection) in self.outputs.drain() {
            debug!("closing MIDI output {}", port);
            connection.close();
        }
    }
}
