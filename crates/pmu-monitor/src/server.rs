// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Dispatch incoming IPI service requests on the controller side.
// Author: Lukas Bower

//! Controller-side dispatcher for the IPI service vocabulary.
//!
//! The doorbell interrupt hands each received frame to [`OsServer::handle`].
//! Fire-and-forget functions complete without a response; the rest produce
//! exactly one response frame for the sender's response slot. Everything
//! with a hardware side effect goes through the [`ServerEnv`] collaborator.

use ipi3_wire::{
    BootData, CpuWakeSleep, DdrPacket, Message, Payload, ReplyPayload, Response, ResultCode,
    ServiceFunc, FIRE_AND_FORGET_BIT, FRAME_LEN,
};

/// Collaborator hooks the dispatcher drives.
///
/// Register bring-up sequences, the DDR block allocator and the console
/// device live behind this seam; the dispatcher only decides which hook a
/// frame maps to and what response to post.
pub trait ServerEnv {
    /// Append text to the controller console.
    fn console_write(&mut self, text: &[u8]);

    /// Apply a CPU power transition.
    fn cpu_wake_or_sleep(&mut self, request: &CpuWakeSleep);

    /// Allocate 64 KiB blocks from the low DDR window; offset on success.
    fn ddr_lo_alloc(&mut self, blocks_64k: u32) -> Option<u32>;

    /// Free previously allocated low-window blocks.
    fn ddr_lo_free(&mut self, offset: u32, block_count: u16);

    /// Allocate 64 KiB blocks from the high DDR window; offset on success.
    fn ddr_hi_alloc(&mut self, blocks_64k: u32) -> Option<u32>;

    /// Free previously allocated high-window blocks.
    fn ddr_hi_free(&mut self, offset: u32, block_count: u16);

    /// Print a packet staged in shared DRAM.
    fn ptr_print(&mut self, packet: &DdrPacket) -> ResultCode;
}

/// Controller-side service state: the boot data recorded at boot time.
#[derive(Debug, Default)]
pub struct OsServer {
    boot_data: BootData,
}

impl OsServer {
    /// Create a server with zeroed boot data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Boot data most recently recorded via `BootComplete`.
    #[must_use]
    pub fn boot_data(&self) -> &BootData {
        &self.boot_data
    }

    /// Handle one received frame, returning the response frame if the
    /// function expects one.
    pub fn handle<E: ServerEnv>(
        &mut self,
        env: &mut E,
        frame: &[u8; FRAME_LEN],
    ) -> Option<[u8; FRAME_LEN]> {
        let message = match Message::decode(frame) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("ipi server: dropping undecodable frame: {err}");
                if frame[0] & FIRE_AND_FORGET_BIT != 0 {
                    return None;
                }
                return Some(Response::status(ResultCode::BadParameters).encode());
            }
        };

        match message {
            Message::Inline(payload) => self.handle_inline(env, payload),
            Message::Indirect { function, packet } => {
                Self::handle_indirect(env, function, &packet)
            }
        }
    }

    fn handle_inline<E: ServerEnv>(
        &mut self,
        env: &mut E,
        payload: Payload,
    ) -> Option<[u8; FRAME_LEN]> {
        match payload {
            Payload::InlinePrint(text) => {
                env.console_write(text.as_bytes());
                None
            }
            Payload::BootComplete(data) => {
                self.boot_data = data;
                None
            }
            Payload::CpuWakeOrSleep(request) => {
                env.cpu_wake_or_sleep(&request);
                None
            }
            Payload::DdrLoBlockFree {
                block_count,
                offset,
                ..
            } => {
                env.ddr_lo_free(offset, block_count);
                None
            }
            Payload::DdrHiBlockFree {
                block_count,
                offset,
                ..
            } => {
                env.ddr_hi_free(offset, block_count);
                None
            }
            Payload::FetchBootData => Some(
                Response {
                    result: ResultCode::Success,
                    payload: ReplyPayload::BootData(self.boot_data),
                }
                .encode(),
            ),
            Payload::DdrLoBlockAlloc { blocks_64k, .. } => {
                Some(Self::alloc_response(env.ddr_lo_alloc(blocks_64k), blocks_64k))
            }
            Payload::DdrHiBlockAlloc { blocks_64k, .. } => {
                Some(Self::alloc_response(env.ddr_hi_alloc(blocks_64k), blocks_64k))
            }
        }
    }

    fn handle_indirect<E: ServerEnv>(
        env: &mut E,
        function: ServiceFunc,
        packet: &DdrPacket,
    ) -> Option<[u8; FRAME_LEN]> {
        match function {
            ServiceFunc::PtrPrint => {
                Some(Response::status(env.ptr_print(packet)).encode())
            }
            other => {
                log::warn!("ipi server: function {other:?} cannot be indirect");
                if other.fire_and_forget() {
                    None
                } else {
                    Some(Response::status(ResultCode::BadParameters).encode())
                }
            }
        }
    }

    fn alloc_response(offset: Option<u32>, blocks_64k: u32) -> [u8; FRAME_LEN] {
        if blocks_64k == 0 {
            return Response::status(ResultCode::BadParameters).encode();
        }
        match offset {
            Some(offset) => Response {
                result: ResultCode::Success,
                payload: ReplyPayload::BlockOffset(offset),
            }
            .encode(),
            None => Response::status(ResultCode::OutOfMemory).encode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipi3_wire::{CpuSet, InlineText};

    #[derive(Default)]
    struct RecordingEnv {
        console: std::vec::Vec<u8>,
        transitions: std::vec::Vec<CpuWakeSleep>,
        lo_free: std::vec::Vec<(u32, u16)>,
        alloc_offset: Option<u32>,
    }

    impl ServerEnv for RecordingEnv {
        fn console_write(&mut self, text: &[u8]) {
            self.console.extend_from_slice(text);
        }

        fn cpu_wake_or_sleep(&mut self, request: &CpuWakeSleep) {
            self.transitions.push(*request);
        }

        fn ddr_lo_alloc(&mut self, _blocks_64k: u32) -> Option<u32> {
            self.alloc_offset
        }

        fn ddr_lo_free(&mut self, offset: u32, block_count: u16) {
            self.lo_free.push((offset, block_count));
        }

        fn ddr_hi_alloc(&mut self, _blocks_64k: u32) -> Option<u32> {
            self.alloc_offset
        }

        fn ddr_hi_free(&mut self, _offset: u32, _block_count: u16) {}

        fn ptr_print(&mut self, _packet: &DdrPacket) -> ResultCode {
            ResultCode::Success
        }
    }

    #[test]
    fn boot_complete_then_fetch_round_trips() {
        let mut env = RecordingEnv::default();
        let mut server = OsServer::new();
        let boot = BootData {
            mmu_table: 0xAA55,
            boot_code_start: 0xFFFC_0000,
            boot_code_size: 0x8000,
            video_block: 0x100,
        };

        let stored = Message::Inline(Payload::BootComplete(boot)).encode();
        assert!(server.handle(&mut env, &stored).is_none());

        let fetch = Message::Inline(Payload::FetchBootData).encode();
        let reply = server.handle(&mut env, &fetch).expect("response expected");
        let decoded = Response::decode(&reply, ServiceFunc::FetchBootData).unwrap();
        assert_eq!(decoded.result, ResultCode::Success);
        assert_eq!(decoded.payload, ReplyPayload::BootData(boot));
    }

    #[test]
    fn inline_print_reaches_the_console() {
        let mut env = RecordingEnv::default();
        let mut server = OsServer::new();
        let text = InlineText::new(b"hello pmu\n").unwrap();
        let frame = Message::Inline(Payload::InlinePrint(text)).encode();
        assert!(server.handle(&mut env, &frame).is_none());
        assert_eq!(env.console, b"hello pmu\n");
    }

    #[test]
    fn wake_request_is_forwarded_untouched() {
        let mut env = RecordingEnv::default();
        let mut server = OsServer::new();
        let request = CpuWakeSleep::wake(CpuSet::A53_CLUSTER, 0x8_0000_0000);
        let frame = Message::Inline(Payload::CpuWakeOrSleep(request)).encode();
        assert!(server.handle(&mut env, &frame).is_none());
        assert_eq!(env.transitions.as_slice(), &[request]);
    }

    #[test]
    fn failed_alloc_reports_out_of_memory() {
        let mut env = RecordingEnv {
            alloc_offset: None,
            ..RecordingEnv::default()
        };
        let mut server = OsServer::new();
        let frame = Message::Inline(Payload::DdrLoBlockAlloc {
            blocks_64k: 4,
            tag: 1,
        })
        .encode();
        let reply = server.handle(&mut env, &frame).expect("response expected");
        let decoded = Response::decode(&reply, ServiceFunc::DdrLoBlockAlloc).unwrap();
        assert_eq!(decoded.result, ResultCode::OutOfMemory);
    }

    #[test]
    fn zero_block_alloc_is_bad_parameters() {
        let mut env = RecordingEnv {
            alloc_offset: Some(0),
            ..RecordingEnv::default()
        };
        let mut server = OsServer::new();
        let frame = Message::Inline(Payload::DdrHiBlockAlloc {
            blocks_64k: 0,
            tag: 0,
        })
        .encode();
        let reply = server.handle(&mut env, &frame).expect("response expected");
        let decoded = Response::decode(&reply, ServiceFunc::DdrHiBlockAlloc).unwrap();
        assert_eq!(decoded.result, ResultCode::BadParameters);
    }

    #[test]
    fn undecodable_call_frame_gets_bad_parameters() {
        let mut env = RecordingEnv::default();
        let mut server = OsServer::new();
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = 0x7E; // unknown call-and-response function
        let reply = server.handle(&mut env, &frame).expect("response expected");
        assert_eq!(reply[0], ResultCode::BadParameters.raw());
    }

    #[test]
    fn undecodable_fire_and_forget_is_dropped() {
        let mut env = RecordingEnv::default();
        let mut server = OsServer::new();
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = 0xFF; // unknown fire-and-forget function
        assert!(server.handle(&mut env, &frame).is_none());
    }

    #[test]
    fn ptr_print_answers_with_the_env_result() {
        let mut env = RecordingEnv::default();
        let mut server = OsServer::new();
        let frame = Message::Indirect {
            function: ServiceFunc::PtrPrint,
            packet: DdrPacket {
                address: 0x8_0000_0000,
                size: 512,
            },
        }
        .encode();
        let reply = server.handle(&mut env, &frame).expect("response expected");
        let decoded = Response::decode(&reply, ServiceFunc::PtrPrint).unwrap();
        assert_eq!(decoded.result, ResultCode::Success);
    }
}
