//! # clustermon protocol
//!
//! Document model, patchsets and wire messages for clustermon.
//!
//! This crate provides:
//! - `ConfigNode` / `ConfigDocument`, the replicated configuration tree
//! - `NodePath` addressing and `Patchset` application
//! - `UpdateEvent` notifications from the configuration service
//! - Administrative request/reply messages and reply validation
//! - Length-prefixed CBOR frames
//! - Fencing device and client records
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod document;
mod error;
mod event;
mod fencing;
mod frame;
mod message;
mod patch;
mod path;
mod result;

pub use codec::{check_frame_len, frame, from_cbor, to_cbor, FRAME_HEADER_LEN, MAX_FRAME_LEN};
pub use document::{
    ConfigDocument, ConfigNode, Version, ATTR_ADMIN_EPOCH, ATTR_EPOCH, ATTR_ID, ATTR_NUM_UPDATES,
};
pub use error::{PatchError, ProtocolError, ProtocolResult};
pub use event::{UpdateEvent, DIFF_NOTIFY_TOPIC};
pub use fencing::{
    stonith_flag, ClientFlags, StonithClient, StonithDevice, NOTIFY_DEVICE_ADD, NOTIFY_DEVICE_DEL,
    NOTIFY_FENCE, NOTIFY_HISTORY, NOTIFY_HISTORY_SYNCED,
};
pub use frame::{ConnectMode, Frame, QueryScope};
pub use message::{
    AdminOperation, AdminReply, AdminRequest, HelloMessage, ReplyRejection, SystemRole,
    MSG_TYPE_REQUEST, MSG_TYPE_RESPONSE, PING_ATTR_STATE, PING_ATTR_STATUS, PING_ATTR_SYSFROM,
};
pub use patch::{apply_patch, Change, PatchApplier, Patchset, VersionedApplier};
pub use path::{NodePath, PathSegment};
pub use result::ResultCode;
