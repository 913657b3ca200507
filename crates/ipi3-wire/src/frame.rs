// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Encode and decode IPI3 mailbox frames without std dependencies.
// Author: Lukas Bower

//! Frame codec for the 32-byte IPI3 mailbox slots.
//!
//! Layout, message frames: byte 0 function code, byte 1 bit 0 indirect flag,
//! bytes 2..32 inline payload. Response frames: byte 0 result code, byte 1
//! reserved, bytes 2..32 payload. All multi-byte fields are little-endian.

use crate::types::{
    BootData, CpuSet, CpuWakeSleep, DdrPacket, InlineText, ResultCode, ServiceFunc, WireError,
    CPU_FLAG_ORDER, FIRE_AND_FORGET_BIT, FRAME_LEN, HEADER_LEN, INLINE_TEXT_MAX,
};

const INDIRECT_FLAG: u8 = 0x01;

// Inline payload field offsets, frame-relative.
const TEXT_LEN_OFF: usize = HEADER_LEN;
const TEXT_OFF: usize = HEADER_LEN + 1;
const PACKET_ADDR_OFF: usize = 8; // 64-bit aligned within the frame
const PACKET_SIZE_OFF: usize = 16;
const ALLOC_BLOCKS_OFF: usize = 4;
const ALLOC_TAG_OFF: usize = 8;
const FREE_COUNT_OFF: usize = 2;
const FREE_OFFSET_OFF: usize = 4;
const FREE_TAG_OFF: usize = 8;
const BOOT_DATA_OFF: usize = HEADER_LEN;
const WAKE_SLEEP_SLEEP_OFF: usize = 2;
const WAKE_SLEEP_WAKE_OFF: usize = 8;
const WAKE_SLEEP_ADDR_OFF: usize = 14;
const RESPONSE_PAYLOAD_OFF: usize = 2;

/// Inline payload, keyed by the function code it travels under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// Short debug text for the controller console.
    InlinePrint(InlineText),
    /// Allocate blocks from the low DDR window.
    DdrLoBlockAlloc {
        /// Number of 64 KiB blocks requested.
        blocks_64k: u32,
        /// Caller tag carried through for diagnostics.
        tag: u32,
    },
    /// Allocate blocks from the high DDR window.
    DdrHiBlockAlloc {
        /// Number of 64 KiB blocks requested.
        blocks_64k: u32,
        /// Caller tag carried through for diagnostics.
        tag: u32,
    },
    /// Free previously allocated low-window blocks.
    DdrLoBlockFree {
        /// Number of 64 KiB blocks to free.
        block_count: u16,
        /// Offset of the first block from the window base.
        offset: u32,
        /// Caller tag carried through for diagnostics.
        tag: u32,
    },
    /// Free previously allocated high-window blocks.
    DdrHiBlockFree {
        /// Number of 64 KiB blocks to free.
        block_count: u16,
        /// Offset of the first block from the window base.
        offset: u32,
        /// Caller tag carried through for diagnostics.
        tag: u32,
    },
    /// Ask the controller for the recorded boot data.
    FetchBootData,
    /// Hand the recorded boot data to the controller.
    BootComplete(BootData),
    /// Power application cores up or down.
    CpuWakeOrSleep(CpuWakeSleep),
}

impl Payload {
    /// Function code this payload travels under.
    #[must_use]
    pub fn function(&self) -> ServiceFunc {
        match self {
            Self::InlinePrint(_) => ServiceFunc::InlinePrint,
            Self::DdrLoBlockAlloc { .. } => ServiceFunc::DdrLoBlockAlloc,
            Self::DdrHiBlockAlloc { .. } => ServiceFunc::DdrHiBlockAlloc,
            Self::DdrLoBlockFree { .. } => ServiceFunc::DdrLoBlockFree,
            Self::DdrHiBlockFree { .. } => ServiceFunc::DdrHiBlockFree,
            Self::FetchBootData => ServiceFunc::FetchBootData,
            Self::BootComplete(_) => ServiceFunc::BootComplete,
            Self::CpuWakeOrSleep(_) => ServiceFunc::CpuWakeOrSleep,
        }
    }
}

/// One mailbox message: inline payload or a reference into shared DRAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Payload fits inside the frame.
    Inline(Payload),
    /// Payload is staged in shared DRAM; only the reference travels.
    Indirect {
        /// Function the staged packet carries.
        function: ServiceFunc,
        /// Location and size of the staged packet.
        packet: DdrPacket,
    },
}

impl Message {
    /// Function code carried in the frame header.
    #[must_use]
    pub fn function(&self) -> ServiceFunc {
        match self {
            Self::Inline(payload) => payload.function(),
            Self::Indirect { function, .. } => *function,
        }
    }

    /// True when no response will be produced for this message.
    #[must_use]
    pub fn fire_and_forget(&self) -> bool {
        self.function().fire_and_forget()
    }

    /// Encode into one mailbox slot.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = self.function().raw();
        match self {
            Self::Indirect { packet, .. } => {
                frame[1] = INDIRECT_FLAG;
                encode_packet(&mut frame, packet);
            }
            Self::Inline(payload) => encode_payload(&mut frame, payload),
        }
        frame
    }

    /// Decode one mailbox slot.
    pub fn decode(frame: &[u8; FRAME_LEN]) -> Result<Self, WireError> {
        let function = ServiceFunc::from_raw(frame[0])?;
        if frame[1] & INDIRECT_FLAG != 0 {
            return Ok(Self::Indirect {
                function,
                packet: decode_packet(frame),
            });
        }
        decode_payload(function, frame).map(Self::Inline)
    }
}

/// Response payload, decoded against the originating function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyPayload {
    /// The function returns no data.
    None,
    /// Byte offset of an allocation from its window base.
    BlockOffset(u32),
    /// Boot data recorded by the boot loader.
    BootData(BootData),
}

/// One mailbox response slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Outcome reported by the peer.
    pub result: ResultCode,
    /// Data accompanying a successful outcome.
    pub payload: ReplyPayload,
}

impl Response {
    /// Shorthand for a payload-free response.
    #[must_use]
    pub const fn status(result: ResultCode) -> Self {
        Self {
            result,
            payload: ReplyPayload::None,
        }
    }

    /// Encode into one mailbox slot.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = self.result.raw();
        match &self.payload {
            ReplyPayload::None => {}
            ReplyPayload::BlockOffset(offset) => {
                frame[RESPONSE_PAYLOAD_OFF..RESPONSE_PAYLOAD_OFF + 4]
                    .copy_from_slice(&offset.to_le_bytes());
            }
            ReplyPayload::BootData(data) => encode_boot_data(&mut frame, RESPONSE_PAYLOAD_OFF, data),
        }
        frame
    }

    /// Decode one mailbox slot against the function that was submitted.
    ///
    /// A non-success result never yields a payload; whatever the peer left
    /// in the frame is dropped rather than handed to the caller.
    pub fn decode(frame: &[u8; FRAME_LEN], function: ServiceFunc) -> Result<Self, WireError> {
        let result = ResultCode::from_raw(frame[0])?;
        if result != ResultCode::Success {
            return Ok(Self::status(result));
        }
        let payload = match function {
            ServiceFunc::FetchBootData => {
                ReplyPayload::BootData(decode_boot_data(frame, RESPONSE_PAYLOAD_OFF))
            }
            ServiceFunc::DdrLoBlockAlloc | ServiceFunc::DdrHiBlockAlloc => {
                ReplyPayload::BlockOffset(u32::from_le_bytes(
                    frame[RESPONSE_PAYLOAD_OFF..RESPONSE_PAYLOAD_OFF + 4]
                        .try_into()
                        .unwrap_or_default(),
                ))
            }
            _ => ReplyPayload::None,
        };
        Ok(Self { result, payload })
    }
}

fn encode_payload(frame: &mut [u8; FRAME_LEN], payload: &Payload) {
    match payload {
        Payload::InlinePrint(text) => {
            let bytes = text.as_bytes();
            frame[TEXT_LEN_OFF] = bytes.len() as u8;
            frame[TEXT_OFF..TEXT_OFF + bytes.len()].copy_from_slice(bytes);
        }
        Payload::DdrLoBlockAlloc { blocks_64k, tag }
        | Payload::DdrHiBlockAlloc { blocks_64k, tag } => {
            frame[ALLOC_BLOCKS_OFF..ALLOC_BLOCKS_OFF + 4]
                .copy_from_slice(&blocks_64k.to_le_bytes());
            frame[ALLOC_TAG_OFF..ALLOC_TAG_OFF + 4].copy_from_slice(&tag.to_le_bytes());
        }
        Payload::DdrLoBlockFree {
            block_count,
            offset,
            tag,
        }
        | Payload::DdrHiBlockFree {
            block_count,
            offset,
            tag,
        } => {
            frame[FREE_COUNT_OFF..FREE_COUNT_OFF + 2].copy_from_slice(&block_count.to_le_bytes());
            frame[FREE_OFFSET_OFF..FREE_OFFSET_OFF + 4].copy_from_slice(&offset.to_le_bytes());
            frame[FREE_TAG_OFF..FREE_TAG_OFF + 4].copy_from_slice(&tag.to_le_bytes());
        }
        Payload::FetchBootData => {}
        Payload::BootComplete(data) => encode_boot_data(frame, BOOT_DATA_OFF, data),
        Payload::CpuWakeOrSleep(request) => {
            for (index, cpu) in CPU_FLAG_ORDER.iter().enumerate() {
                frame[WAKE_SLEEP_SLEEP_OFF + index] = request.sleep_set().contains(*cpu) as u8;
                frame[WAKE_SLEEP_WAKE_OFF + index] = request.wake_set().contains(*cpu) as u8;
            }
            frame[WAKE_SLEEP_ADDR_OFF..WAKE_SLEEP_ADDR_OFF + 8]
                .copy_from_slice(&request.wake_address().to_le_bytes());
        }
    }
}

fn decode_payload(function: ServiceFunc, frame: &[u8; FRAME_LEN]) -> Result<Payload, WireError> {
    Ok(match function {
        ServiceFunc::PtrPrint => return Err(WireError::NotInline(function)),
        ServiceFunc::InlinePrint => {
            let len = frame[TEXT_LEN_OFF].min(INLINE_TEXT_MAX as u8);
            let mut bytes = [0u8; INLINE_TEXT_MAX];
            bytes.copy_from_slice(&frame[TEXT_OFF..TEXT_OFF + INLINE_TEXT_MAX]);
            Payload::InlinePrint(InlineText::from_raw(len, bytes))
        }
        ServiceFunc::DdrLoBlockAlloc | ServiceFunc::DdrHiBlockAlloc => {
            let blocks_64k = u32::from_le_bytes(
                frame[ALLOC_BLOCKS_OFF..ALLOC_BLOCKS_OFF + 4]
                    .try_into()
                    .unwrap_or_default(),
            );
            let tag = u32::from_le_bytes(
                frame[ALLOC_TAG_OFF..ALLOC_TAG_OFF + 4]
                    .try_into()
                    .unwrap_or_default(),
            );
            if function == ServiceFunc::DdrLoBlockAlloc {
                Payload::DdrLoBlockAlloc { blocks_64k, tag }
            } else {
                Payload::DdrHiBlockAlloc { blocks_64k, tag }
            }
        }
        ServiceFunc::DdrLoBlockFree | ServiceFunc::DdrHiBlockFree => {
            let block_count = u16::from_le_bytes(
                frame[FREE_COUNT_OFF..FREE_COUNT_OFF + 2]
                    .try_into()
                    .unwrap_or_default(),
            );
            let offset = u32::from_le_bytes(
                frame[FREE_OFFSET_OFF..FREE_OFFSET_OFF + 4]
                    .try_into()
                    .unwrap_or_default(),
            );
            let tag = u32::from_le_bytes(
                frame[FREE_TAG_OFF..FREE_TAG_OFF + 4]
                    .try_into()
                    .unwrap_or_default(),
            );
            if function == ServiceFunc::DdrLoBlockFree {
                Payload::DdrLoBlockFree {
                    block_count,
                    offset,
                    tag,
                }
            } else {
                Payload::DdrHiBlockFree {
                    block_count,
                    offset,
                    tag,
                }
            }
        }
        ServiceFunc::FetchBootData => Payload::FetchBootData,
        ServiceFunc::BootComplete => {
            Payload::BootComplete(decode_boot_data(frame, BOOT_DATA_OFF))
        }
        ServiceFunc::CpuWakeOrSleep => {
            let mut sleep = CpuSet::empty();
            let mut wake = CpuSet::empty();
            for (index, cpu) in CPU_FLAG_ORDER.iter().enumerate() {
                if frame[WAKE_SLEEP_SLEEP_OFF + index] != 0 {
                    sleep |= *cpu;
                }
                if frame[WAKE_SLEEP_WAKE_OFF + index] != 0 {
                    wake |= *cpu;
                }
            }
            let wake_address = u64::from_le_bytes(
                frame[WAKE_SLEEP_ADDR_OFF..WAKE_SLEEP_ADDR_OFF + 8]
                    .try_into()
                    .unwrap_or_default(),
            );
            Payload::CpuWakeOrSleep(CpuWakeSleep::from_raw(sleep, wake, wake_address))
        }
    })
}

fn encode_packet(frame: &mut [u8; FRAME_LEN], packet: &DdrPacket) {
    frame[PACKET_ADDR_OFF..PACKET_ADDR_OFF + 8].copy_from_slice(&packet.address.to_le_bytes());
    frame[PACKET_SIZE_OFF..PACKET_SIZE_OFF + 4].copy_from_slice(&packet.size.to_le_bytes());
}

fn decode_packet(frame: &[u8; FRAME_LEN]) -> DdrPacket {
    DdrPacket {
        address: u64::from_le_bytes(
            frame[PACKET_ADDR_OFF..PACKET_ADDR_OFF + 8]
                .try_into()
                .unwrap_or_default(),
        ),
        size: u32::from_le_bytes(
            frame[PACKET_SIZE_OFF..PACKET_SIZE_OFF + 4]
                .try_into()
                .unwrap_or_default(),
        ),
    }
}

fn encode_boot_data(frame: &mut [u8; FRAME_LEN], at: usize, data: &BootData) {
    frame[at..at + 8].copy_from_slice(&data.mmu_table.to_le_bytes());
    frame[at + 8..at + 12].copy_from_slice(&data.boot_code_start.to_le_bytes());
    frame[at + 12..at + 16].copy_from_slice(&data.boot_code_size.to_le_bytes());
    frame[at + 16..at + 20].copy_from_slice(&data.video_block.to_le_bytes());
}

fn decode_boot_data(frame: &[u8; FRAME_LEN], at: usize) -> BootData {
    BootData {
        mmu_table: u64::from_le_bytes(frame[at..at + 8].try_into().unwrap_or_default()),
        boot_code_start: u32::from_le_bytes(frame[at + 8..at + 12].try_into().unwrap_or_default()),
        boot_code_size: u32::from_le_bytes(frame[at + 12..at + 16].try_into().unwrap_or_default()),
        video_block: u32::from_le_bytes(frame[at + 16..at + 20].try_into().unwrap_or_default()),
    }
}

const _: () = assert!(WAKE_SLEEP_ADDR_OFF + 8 <= FRAME_LEN);
const _: () = assert!(PACKET_SIZE_OFF + 4 <= FRAME_LEN);
const _: () = assert!(RESPONSE_PAYLOAD_OFF + crate::types::BOOT_DATA_LEN <= FRAME_LEN);
const _: () = assert!(FIRE_AND_FORGET_BIT & INDIRECT_FLAG == 0);
