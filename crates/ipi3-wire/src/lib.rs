// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide IPI3 wire types and frame codec for the control plane.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![no_std]

//! IPI3 mailbox wire types and codec shared between the platform-management
//! controller and the application cores.
//!
//! Every message and response occupies exactly one 32-byte mailbox slot.
//! Payloads that do not fit inline are carried as a [`DdrPacket`] reference
//! into shared DRAM instead of being copied through the mailbox.

#[cfg(test)]
extern crate std;

mod frame;
mod types;

pub use frame::{Message, Payload, ReplyPayload, Response};
pub use types::{
    BootData, CpuSet, CpuWakeSleep, DdrPacket, InlineText, ResultCode, ServiceFunc, WireError,
    BOOT_DATA_LEN, FIRE_AND_FORGET_BIT, FRAME_LEN, HEADER_LEN, INLINE_TEXT_MAX,
};
