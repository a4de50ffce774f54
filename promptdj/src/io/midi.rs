//! MIDI input: device discovery, active-device selection and control change
//! republishing.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use midir::{MidiInput, MidiInputConnection};

use crate::framework::prelude::*;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    /// `None` when the platform reports no name.
    pub name: Option<String>,
}

/// Bytes exactly as delivered by the platform, tagged with their source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawMidiMessage {
    pub device: DeviceId,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CcMessage {
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl CcMessage {
    pub fn new(channel: u8, controller: u8, value: u8) -> Self {
        Self {
            channel,
            controller,
            value,
        }
    }

    /// Decode a control change message. Anything else yields `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [status, controller, value, ..] if is_control_change(*status) => {
                Some(Self {
                    channel: status & 0x0F,
                    controller: controller & 0x7F,
                    value: value & 0x7F,
                })
            }
            _ => None,
        }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [0xB0 | (self.channel & 0x0F), self.controller, self.value]
    }
}

pub fn is_control_change(status: u8) -> bool {
    status & 0xF0 == 0xB0
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MidiEvent {
    Cc(CcMessage),
    DevicesChanged(Vec<DeviceId>),
    ActiveDeviceChanged(Option<DeviceId>),
    Error(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MidiError {
    PermissionDenied,
    Unsupported,
    Backend(String),
}

impl fmt::Display for MidiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "MIDI access was denied"),
            Self::Unsupported => {
                write!(f, "MIDI is not supported on this platform")
            }
            Self::Backend(message) => write!(f, "MIDI error: {}", message),
        }
    }
}

impl Error for MidiError {}

pub type RawSink = Arc<dyn Fn(RawMidiMessage) + Send + Sync>;

/// Platform MIDI capability. Implementations deliver raw input from the
/// device currently being listened to through the sink, typically from a
/// backend thread.
pub trait MidiAccess {
    fn devices(&mut self) -> Result<Vec<DeviceInfo>, MidiError>;
    fn listen(&mut self, device: &DeviceId, sink: RawSink)
    -> Result<(), MidiError>;
    fn unlisten(&mut self);
}

/// [`MidiAccess`] backed by `midir`. Holds at most one input connection.
pub struct MidirAccess {
    client_name: String,
    connection: Option<MidiInputConnection<()>>,
}

impl MidirAccess {
    pub fn new(client_name: &str) -> Result<Self, MidiError> {
        MidiInput::new(client_name).map_err(|err| {
            warn!("Unable to initialize MIDI input: {}", err);
            MidiError::Unsupported
        })?;

        Ok(Self {
            client_name: client_name.to_string(),
            connection: None,
        })
    }

    fn input(&self) -> Result<MidiInput, MidiError> {
        MidiInput::new(&self.client_name).map_err(|_| MidiError::Unsupported)
    }
}

impl MidiAccess for MidirAccess {
    fn devices(&mut self) -> Result<Vec<DeviceInfo>, MidiError> {
        let midi_in = self.input()?;
        Ok(midi_in
            .ports()
            .iter()
            .map(|port| DeviceInfo {
                id: DeviceId::new(port.id()),
                name: midi_in
                    .port_name(port)
                    .ok()
                    .filter(|name| !name.trim().is_empty()),
            })
            .collect())
    }

    fn listen(
        &mut self,
        device: &DeviceId,
        sink: RawSink,
    ) -> Result<(), MidiError> {
        self.unlisten();

        let midi_in = self.input()?;
        let port = midi_in
            .find_port_by_id(device.as_str().to_string())
            .ok_or_else(|| {
                MidiError::Backend(format!(
                    "Unable to find input port: {}",
                    device
                ))
            })?;

        let source = device.clone();
        let connection = midi_in
            .connect(
                &port,
                &self.client_name,
                move |stamp, message, _| {
                    trace!("MIDI message: {}, {:?}", stamp, message);
                    sink(RawMidiMessage {
                        device: source.clone(),
                        bytes: message.to_vec(),
                    });
                },
                (),
            )
            .map_err(|err| MidiError::Backend(err.to_string()))?;

        self.connection = Some(connection);
        Ok(())
    }

    fn unlisten(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            debug!("Closed MIDI input connection");
        }
    }
}

/// Owns device discovery and the single active device selection, and
/// republishes control changes from that device as [`MidiEvent::Cc`].
pub struct MidiLink<A: MidiAccess> {
    access: A,
    sink: RawSink,
    devices: Vec<DeviceInfo>,
    active_device: Option<DeviceId>,
    preferred_name: Option<String>,
    granted: bool,
    events: Publisher<MidiEvent>,
}

impl<A: MidiAccess> MidiLink<A> {
    pub fn new(access: A, sink: RawSink) -> Self {
        Self {
            access,
            sink,
            devices: Vec::new(),
            active_device: None,
            preferred_name: None,
            granted: false,
            events: Publisher::new(),
        }
    }

    /// Name of the port to select on first access instead of the first-seen
    /// device.
    pub fn set_preferred_device_name(&mut self, name: Option<String>) {
        self.preferred_name = name.filter(|n| !n.is_empty());
    }

    pub fn subscribe(&mut self) -> std::sync::mpsc::Receiver<MidiEvent> {
        self.events.subscribe()
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }

    /// Enumerate devices and begin listening. Calling again is safe and simply
    /// re-enumerates. When nothing is selected yet, the preferred device (or
    /// the first discovered one) becomes active.
    pub fn request_access(&mut self) -> Result<Vec<DeviceId>, MidiError> {
        let devices = match self.access.devices() {
            Ok(devices) => devices,
            Err(err) => {
                warn!("MIDI access failed: {}", err);
                self.granted = false;
                self.devices.clear();
                return Err(err);
            }
        };

        self.granted = true;
        self.devices = devices;
        info!("MIDI access granted; {} device(s)", self.devices.len());

        let ids = self.device_ids();
        self.events.publish(MidiEvent::DevicesChanged(ids.clone()));

        let active_missing = self
            .active_device
            .as_ref()
            .is_some_and(|id| !ids.contains(id));

        if active_missing {
            self.set_active_device(None);
        }

        if self.active_device.is_none() {
            let preferred = self.preferred_name.as_ref().and_then(|name| {
                self.devices
                    .iter()
                    .find(|d| d.name.as_deref() == Some(name.as_str()))
                    .map(|d| d.id.clone())
            });
            if let Some(id) = preferred.or_else(|| ids.first().cloned()) {
                self.set_active_device(Some(id));
            }
        }

        Ok(ids)
    }

    /// Re-enumerate after a possible connect/disconnect. An active device that
    /// disappeared is cleared and reported as an error; no other device is
    /// selected in its place.
    pub fn refresh_devices(&mut self) {
        if !self.granted {
            return;
        }

        let devices = match self.access.devices() {
            Ok(devices) => devices,
            Err(err) => {
                error!("Lost MIDI access: {}", err);
                self.granted = false;
                self.devices.clear();
                self.clear_active();
                self.events.publish(MidiEvent::Error(format!(
                    "Lost MIDI access: {}",
                    err
                )));
                self.events.publish(MidiEvent::DevicesChanged(vec![]));
                return;
            }
        };

        if devices == self.devices {
            return;
        }

        let lost = self
            .active_device
            .as_ref()
            .filter(|id| !devices.iter().any(|d| &d.id == *id))
            .map(|id| self.device_name(id));

        self.devices = devices;
        info!("MIDI devices changed: {:?}", self.device_ids());

        if let Some(name) = lost {
            warn!("Active MIDI device disconnected: {}", name);
            self.clear_active();
            self.events.publish(MidiEvent::Error(format!(
                "MIDI device '{}' disconnected",
                name
            )));
        }

        self.events
            .publish(MidiEvent::DevicesChanged(self.device_ids()));
    }

    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.iter().map(|d| d.id.clone()).collect()
    }

    pub fn device_name(&self, id: &DeviceId) -> String {
        match self.devices.iter().position(|d| &d.id == id) {
            Some(index) => match &self.devices[index].name {
                Some(name) => name.clone(),
                None => format!("Unnamed device {}", index + 1),
            },
            None => format!("Unnamed device {}", id),
        }
    }

    pub fn active_device(&self) -> Option<&DeviceId> {
        self.active_device.as_ref()
    }

    /// Select the device whose control changes are republished. The id is not
    /// checked against the discovered list; offering only discovered ids is
    /// the caller's job.
    pub fn set_active_device(&mut self, id: Option<DeviceId>) {
        if id == self.active_device {
            return;
        }

        self.access.unlisten();
        self.active_device = id.clone();

        if let Some(id) = id {
            if !self.devices.iter().any(|d| d.id == id) {
                debug!("Selecting undiscovered MIDI device {}", id);
            }
            match self.access.listen(&id, self.sink.clone()) {
                Ok(()) => {
                    info!("Listening to MIDI device: {}", self.device_name(&id))
                }
                Err(err) => {
                    error!("Unable to listen to {}: {}", id, err);
                    self.events.publish(MidiEvent::Error(err.to_string()));
                }
            }
        }

        self.events.publish(MidiEvent::ActiveDeviceChanged(
            self.active_device.clone(),
        ));
    }

    /// Filter and decode a raw message delivered through the sink. Only
    /// control changes from the active device are republished.
    pub fn handle_raw(&mut self, message: &RawMidiMessage) {
        if self.active_device.as_ref() != Some(&message.device) {
            trace!("Ignoring message from inactive device {}", message.device);
            return;
        }

        if let Some(cc) = CcMessage::from_bytes(&message.bytes) {
            self.events.publish(MidiEvent::Cc(cc));
        }
    }

    fn clear_active(&mut self) {
        if self.active_device.take().is_some() {
            self.access.unlisten();
            self.events.publish(MidiEvent::ActiveDeviceChanged(None));
        }
    }
}

impl<A: MidiAccess> Drop for MidiLink<A> {
    fn drop(&mut self) {
        self.access.unlisten();
    }
}
