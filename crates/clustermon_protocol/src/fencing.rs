//! Data shapes exchanged with the fencing subsystem.
//!
//! Only the records are modelled here. Registration, remote operations and
//! their state machine belong to the fencing daemon.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::time::{Duration, SystemTime};

/// Notification name for completed fencing operations.
pub const NOTIFY_FENCE: &str = "st_notify_fence";
/// Notification name for device registration.
pub const NOTIFY_DEVICE_ADD: &str = "st_device_register";
/// Notification name for device removal.
pub const NOTIFY_DEVICE_DEL: &str = "st_device_remove";
/// Notification name for fencing history changes.
pub const NOTIFY_HISTORY: &str = "st_notify_history";
/// Notification name for fencing history synchronisation.
pub const NOTIFY_HISTORY_SYNCED: &str = "st_notify_history_synced";

/// A registered fencing device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StonithDevice {
    /// Device identifier.
    pub id: String,
    /// Agent implementing the device.
    pub agent: String,
    /// Agent namespace (for example `stonith-ng` or `heartbeat`).
    pub namespace: String,
    /// Cached list of nodes this device can fence.
    #[serde(default)]
    pub targets: Vec<String>,
    /// When `targets` was last refreshed.
    #[serde(default)]
    pub targets_age: Option<SystemTime>,
    /// Agent parameters.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Node name to device-specific port aliases.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl StonithDevice {
    /// Creates a device with no cached targets.
    pub fn new(id: impl Into<String>, agent: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent: agent.into(),
            namespace: namespace.into(),
            targets: Vec::new(),
            targets_age: None,
            params: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    /// Replaces the cached target list.
    pub fn set_targets(&mut self, targets: Vec<String>, now: SystemTime) {
        self.targets = targets;
        self.targets_age = Some(now);
    }

    /// Returns true if the target cache was never filled or is older than `max_age`.
    pub fn targets_are_stale(&self, max_age: Duration, now: SystemTime) -> bool {
        match self.targets_age {
            None => true,
            Some(age) => now
                .duration_since(age)
                .map(|elapsed| elapsed > max_age)
                .unwrap_or(false),
        }
    }

    /// Maps a node name to the device's name for it.
    pub fn resolve_alias<'a>(&'a self, target: &'a str) -> &'a str {
        self.aliases.get(target).map(String::as_str).unwrap_or(target)
    }

    /// Returns true if the cached targets include `target` or its alias.
    pub fn can_fence(&self, target: &str) -> bool {
        let alias = self.resolve_alias(target);
        self.targets.iter().any(|t| t == target || t == alias)
    }
}

/// Capability flags of a fencing client connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientFlags(u64);

impl ClientFlags {
    /// No capabilities.
    pub const EMPTY: ClientFlags = ClientFlags(0);
    /// Receives fencing result notifications.
    pub const NOTIFY_FENCE: ClientFlags = ClientFlags(0x01);
    /// Receives device registration notifications.
    pub const DEVICE_ADD: ClientFlags = ClientFlags(0x04);
    /// Receives device removal notifications.
    pub const DEVICE_DEL: ClientFlags = ClientFlags(0x10);
    /// Receives history change notifications.
    pub const NOTIFY_HISTORY: ClientFlags = ClientFlags(0x20);
    /// Receives history synchronisation notifications.
    pub const NOTIFY_HISTORY_SYNCED: ClientFlags = ClientFlags(0x40);

    /// Returns the raw bits.
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Builds flags from raw bits.
    pub fn from_bits(bits: u64) -> Self {
        ClientFlags(bits)
    }

    /// Returns true if every bit of `other` is set.
    pub fn contains(self, other: ClientFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Clears the bits of `other`.
    pub fn remove(&mut self, other: ClientFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for ClientFlags {
    type Output = ClientFlags;

    fn bitor(self, rhs: ClientFlags) -> ClientFlags {
        ClientFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ClientFlags {
    fn bitor_assign(&mut self, rhs: ClientFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ClientFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Maps a notification name to the flag a client sets to receive it.
///
/// Unknown names map to [`ClientFlags::EMPTY`].
pub fn stonith_flag(name: &str) -> ClientFlags {
    match name {
        NOTIFY_FENCE => ClientFlags::NOTIFY_FENCE,
        NOTIFY_DEVICE_ADD => ClientFlags::DEVICE_ADD,
        NOTIFY_DEVICE_DEL => ClientFlags::DEVICE_DEL,
        NOTIFY_HISTORY => ClientFlags::NOTIFY_HISTORY,
        NOTIFY_HISTORY_SYNCED => ClientFlags::NOTIFY_HISTORY_SYNCED,
        _ => ClientFlags::EMPTY,
    }
}

/// A client connected to the fencing subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StonithClient {
    /// Connection identifier.
    pub id: String,
    /// Client name.
    pub name: String,
    /// Identifier the client uses for asynchronous callbacks.
    #[serde(default)]
    pub callback_id: Option<String>,
    /// Name of the channel the client is attached to.
    pub channel_name: String,
    /// Capabilities.
    #[serde(default)]
    pub flags: ClientFlags,
}

impl StonithClient {
    /// Creates a client with no capabilities.
    pub fn new(id: impl Into<String>, name: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            callback_id: None,
            channel_name: channel_name.into(),
            flags: ClientFlags::EMPTY,
        }
    }

    /// Enables the flag for a notification name. Returns false for unknown names.
    pub fn subscribe(&mut self, notification: &str) -> bool {
        let flag = stonith_flag(notification);
        self.flags |= flag;
        !flag.is_empty()
    }

    /// Returns true if the client wants the given notification.
    pub fn wants(&self, notification: &str) -> bool {
        let flag = stonith_flag(notification);
        !flag.is_empty() && self.flags.contains(flag)
    }
}
