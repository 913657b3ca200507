// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define IPI3 wire types and constants shared across components.
// Author: Lukas Bower

//! IPI3 data model definitions shared across the mailbox codec and its users.

use bitflags::bitflags;

/// Size of one mailbox frame; messages and responses never exceed this.
pub const FRAME_LEN: usize = 32;
/// Bytes of header preceding the inline payload (function code + flags).
pub const HEADER_LEN: usize = 2;
/// Function-code bit marking a message as fire-and-forget.
pub const FIRE_AND_FORGET_BIT: u8 = 0x80;
/// Maximum text bytes carried by one inline print message.
pub const INLINE_TEXT_MAX: usize = 29;
/// Encoded size of [`BootData`] in bytes.
pub const BOOT_DATA_LEN: usize = 24;

const _: () = assert!(BOOT_DATA_LEN <= FRAME_LEN - HEADER_LEN);
const _: () = assert!(INLINE_TEXT_MAX + 1 <= FRAME_LEN - HEADER_LEN);

/// Errors surfaced while encoding or decoding mailbox frames.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// Frame carried a function code outside the known vocabulary.
    #[error("unknown service function {0:#04x}")]
    UnknownFunction(u8),
    /// Response carried a result code outside the known vocabulary.
    #[error("unknown result code {0:#04x}")]
    UnknownResult(u8),
    /// Inline text exceeded the mailbox capacity.
    #[error("inline text of {0} bytes exceeds {INLINE_TEXT_MAX}")]
    TextTooLong(usize),
    /// The function never travels with an inline payload.
    #[error("function {0:?} requires an indirect packet")]
    NotInline(ServiceFunc),
}

/// Service function vocabulary carried in byte 0 of every message.
///
/// Functions with [`FIRE_AND_FORGET_BIT`] set complete without a response;
/// the remainder block the caller until the peer posts one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceFunc {
    /// Debug print staged in shared DRAM; the reference must stay valid
    /// until the response arrives.
    PtrPrint = 0x00,
    /// Allocate 64 KiB blocks from the low DDR window.
    DdrLoBlockAlloc = 0x01,
    /// Allocate 64 KiB blocks from the high DDR window.
    DdrHiBlockAlloc = 0x02,
    /// Retrieve the boot data recorded by the boot loader.
    FetchBootData = 0x03,
    /// Inline debug print of at most [`INLINE_TEXT_MAX`] bytes.
    InlinePrint = FIRE_AND_FORGET_BIT,
    /// Free previously allocated low-window blocks.
    DdrLoBlockFree = FIRE_AND_FORGET_BIT | 0x01,
    /// Free previously allocated high-window blocks.
    DdrHiBlockFree = FIRE_AND_FORGET_BIT | 0x02,
    /// Boot loader is done; boot parameters ride along.
    BootComplete = FIRE_AND_FORGET_BIT | 0x04,
    /// Power application cores up or down.
    CpuWakeOrSleep = FIRE_AND_FORGET_BIT | 0x06,
}

impl ServiceFunc {
    /// Raw wire value of the function code.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// True when the function completes without a response.
    #[must_use]
    pub const fn fire_and_forget(self) -> bool {
        self.raw() & FIRE_AND_FORGET_BIT != 0
    }

    /// Decode a raw function code.
    pub fn from_raw(raw: u8) -> Result<Self, WireError> {
        Ok(match raw {
            0x00 => Self::PtrPrint,
            0x01 => Self::DdrLoBlockAlloc,
            0x02 => Self::DdrHiBlockAlloc,
            0x03 => Self::FetchBootData,
            0x80 => Self::InlinePrint,
            0x81 => Self::DdrLoBlockFree,
            0x82 => Self::DdrHiBlockFree,
            0x84 => Self::BootComplete,
            0x86 => Self::CpuWakeOrSleep,
            other => return Err(WireError::UnknownFunction(other)),
        })
    }
}

/// Result codes carried in byte 0 of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum ResultCode {
    /// The request completed.
    Success = 1,
    /// The peer failed without a more specific cause.
    UnknownFailure = 0,
    /// An allocation request could not be satisfied.
    OutOfMemory = -1,
    /// The request carried parameters the peer rejected.
    BadParameters = -2,
}

impl ResultCode {
    /// Raw wire value of the result code.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as i8 as u8
    }

    /// Decode a raw result code.
    pub fn from_raw(raw: u8) -> Result<Self, WireError> {
        Ok(match raw as i8 {
            1 => Self::Success,
            0 => Self::UnknownFailure,
            -1 => Self::OutOfMemory,
            -2 => Self::BadParameters,
            _ => return Err(WireError::UnknownResult(raw)),
        })
    }
}

bitflags! {
    /// Application-core selection mask used by wake and sleep requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CpuSet: u8 {
        /// First A53 core.
        const A53_0 = 1 << 0;
        /// Second A53 core.
        const A53_1 = 1 << 1;
        /// Third A53 core.
        const A53_2 = 1 << 2;
        /// Fourth A53 core.
        const A53_3 = 1 << 3;
        /// First R5F core.
        const R5F_0 = 1 << 4;
        /// Second R5F core.
        const R5F_1 = 1 << 5;
        /// All four A53 cores.
        const A53_CLUSTER = Self::A53_0.bits()
            | Self::A53_1.bits()
            | Self::A53_2.bits()
            | Self::A53_3.bits();
        /// Both R5F cores.
        const R5F_CLUSTER = Self::R5F_0.bits() | Self::R5F_1.bits();
    }
}

/// Wire order of the per-core flag bytes inside a wake-or-sleep payload.
pub(crate) const CPU_FLAG_ORDER: [CpuSet; 6] = [
    CpuSet::A53_0,
    CpuSet::A53_1,
    CpuSet::A53_2,
    CpuSet::A53_3,
    CpuSet::R5F_0,
    CpuSet::R5F_1,
];

/// CPU power transition request.
///
/// A single message only ever carries wake bits or sleep bits, never both;
/// the two constructors are the only way to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuWakeSleep {
    sleep: CpuSet,
    wake: CpuSet,
    wake_address: u64,
}

impl CpuWakeSleep {
    /// Request that the given cores power down.
    #[must_use]
    pub const fn sleep(cpus: CpuSet) -> Self {
        Self {
            sleep: cpus,
            wake: CpuSet::empty(),
            wake_address: 0,
        }
    }

    /// Request that the given cores power up and start at `wake_address`.
    #[must_use]
    pub const fn wake(cpus: CpuSet, wake_address: u64) -> Self {
        Self {
            sleep: CpuSet::empty(),
            wake: cpus,
            wake_address,
        }
    }

    /// Cores requested to power down.
    #[must_use]
    pub const fn sleep_set(&self) -> CpuSet {
        self.sleep
    }

    /// Cores requested to power up.
    #[must_use]
    pub const fn wake_set(&self) -> CpuSet {
        self.wake
    }

    /// Entry address handed to woken cores.
    #[must_use]
    pub const fn wake_address(&self) -> u64 {
        self.wake_address
    }

    /// Rebuild from raw wire fields, used by the frame decoder.
    pub(crate) const fn from_raw(sleep: CpuSet, wake: CpuSet, wake_address: u64) -> Self {
        Self {
            sleep,
            wake,
            wake_address,
        }
    }
}

/// Boot metadata exchanged between the boot loader and the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootData {
    /// Address of the MMU manager handed over by the boot loader.
    pub mmu_table: u64,
    /// Location where the boot program begins.
    pub boot_code_start: u32,
    /// Size of the boot program in bytes.
    pub boot_code_size: u32,
    /// Descriptor plus front-buffer block for the video console.
    pub video_block: u32,
}

/// Reference to a packet staged in shared DRAM.
///
/// `size` counts the staged copy including its 32-byte frame header. The
/// referenced region must be cache-line aligned and stay valid until the
/// peer responds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdrPacket {
    /// Physical address of the staged packet.
    pub address: u64,
    /// Total staged size in bytes, frame header included.
    pub size: u32,
}

/// Length-prefixed text fragment small enough to travel inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineText {
    len: u8,
    bytes: [u8; INLINE_TEXT_MAX],
}

impl InlineText {
    /// Wrap a text fragment, rejecting anything over [`INLINE_TEXT_MAX`].
    pub fn new(text: &[u8]) -> Result<Self, WireError> {
        if text.len() > INLINE_TEXT_MAX {
            return Err(WireError::TextTooLong(text.len()));
        }
        let mut bytes = [0u8; INLINE_TEXT_MAX];
        bytes[..text.len()].copy_from_slice(text);
        Ok(Self {
            len: text.len() as u8,
            bytes,
        })
    }

    /// The carried text bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// Rebuild from raw wire fields, used by the frame decoder. Trailing
    /// bytes past the length are normalized to zero.
    pub(crate) fn from_raw(len: u8, mut bytes: [u8; INLINE_TEXT_MAX]) -> Self {
        let len = len.min(INLINE_TEXT_MAX as u8);
        for byte in bytes.iter_mut().skip(usize::from(len)) {
            *byte = 0;
        }
        Self { len, bytes }
    }
}
