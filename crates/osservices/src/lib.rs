// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Typed OS service facade used by application cores.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![no_std]

//! Typed OS service calls layered over the IPI3 mailbox transport.
//!
//! This is the only surface application code needs: CPU power transitions,
//! boot-data exchange, debug prints and DDR block accounting. Every call
//! builds one well-formed mailbox message; nothing here touches hardware
//! directly.

#[cfg(test)]
extern crate std;

use ipi3_transport::{Ipi3Transport, MailboxPort};
use ipi3_wire::{
    CpuWakeSleep, InlineText, Message, Payload, ReplyPayload, ResultCode, ServiceFunc,
    INLINE_TEXT_MAX,
};

pub use ipi3_transport::{CacheAligned, TransportError, WaitBudget};
pub use ipi3_wire::{BootData, CpuSet, DdrPacket};

/// OS service client bound to one mailbox port.
///
/// The wait budget chosen at construction applies to every blocking call;
/// the observed hardware design uses [`WaitBudget::unbounded`].
#[derive(Debug)]
pub struct OsService<P> {
    transport: Ipi3Transport<P>,
    budget: WaitBudget,
}

impl<P: MailboxPort> OsService<P> {
    /// Bind to a port with an unbounded wait budget.
    pub fn new(port: P) -> Self {
        Self::with_budget(port, WaitBudget::unbounded())
    }

    /// Bind to a port with a caller-chosen wait budget.
    pub fn with_budget(port: P, budget: WaitBudget) -> Self {
        Self {
            transport: Ipi3Transport::new(port),
            budget,
        }
    }

    /// Borrow the underlying mailbox port.
    pub fn port(&self) -> &P {
        self.transport.port()
    }

    /// Request that the given cores power down. Fire-and-forget.
    pub fn sleep_cpus(&mut self, cpus: CpuSet) -> Result<(), TransportError> {
        let request = CpuWakeSleep::sleep(cpus);
        self.transport.submit(
            &Message::Inline(Payload::CpuWakeOrSleep(request)),
            self.budget,
        )
    }

    /// Request that the given cores power up at `wake_address`. Fire-and-forget.
    pub fn wake_cpus(&mut self, cpus: CpuSet, wake_address: u64) -> Result<(), TransportError> {
        let request = CpuWakeSleep::wake(cpus, wake_address);
        self.transport.submit(
            &Message::Inline(Payload::CpuWakeOrSleep(request)),
            self.budget,
        )
    }

    /// Hand the boot metadata to the controller. Fire-and-forget.
    pub fn boot_complete(&mut self, data: &BootData) -> Result<(), TransportError> {
        self.transport
            .submit(&Message::Inline(Payload::BootComplete(*data)), self.budget)
    }

    /// Fetch the boot metadata recorded by the boot loader.
    ///
    /// Any failure, whether a non-success result or a transport fault,
    /// yields the all-zero record and a logged diagnostic. Callers always
    /// proceed with defined state; the peer's partial payload is never
    /// handed on.
    pub fn fetch_boot_data(&mut self) -> BootData {
        let message = Message::Inline(Payload::FetchBootData);
        match self.transport.submit_with_response(&message, self.budget) {
            Ok(response) => match (response.result, response.payload) {
                (ResultCode::Success, ReplyPayload::BootData(data)) => data,
                (result, _) => {
                    log::warn!("osservices: fetch boot data failed: {result:?}");
                    BootData::default()
                }
            },
            Err(err) => {
                log::warn!("osservices: fetch boot data failed: {err}");
                BootData::default()
            }
        }
    }

    /// Print text on the controller console, chunked through inline frames.
    pub fn print(&mut self, text: &str) -> Result<(), TransportError> {
        for chunk in text.as_bytes().chunks(INLINE_TEXT_MAX) {
            let inline = InlineText::new(chunk).map_err(TransportError::Wire)?;
            self.transport
                .submit(&Message::Inline(Payload::InlinePrint(inline)), self.budget)?;
        }
        Ok(())
    }

    /// Print text staged in shared DRAM by the caller.
    ///
    /// The staged region must hold a frame header followed by the text,
    /// stay cache-line aligned and remain valid until this call returns.
    pub fn ptr_print(&mut self, packet: DdrPacket) -> Result<(), TransportError> {
        let message = Message::Indirect {
            function: ServiceFunc::PtrPrint,
            packet,
        };
        let response = self.transport.submit_with_response(&message, self.budget)?;
        if response.result != ResultCode::Success {
            log::warn!("osservices: ptr print rejected: {:?}", response.result);
        }
        Ok(())
    }

    /// Allocate 64 KiB blocks from the low DDR window.
    ///
    /// Returns the block address, or `None` with a logged diagnostic when
    /// the controller refuses.
    pub fn ddr_lo_block_alloc(&mut self, blocks_64k: u32, tag: u32) -> Option<u64> {
        self.block_alloc(
            Payload::DdrLoBlockAlloc { blocks_64k, tag },
            platform_map::DDR_LO_BASE,
        )
    }

    /// Allocate 64 KiB blocks from the high DDR window.
    pub fn ddr_hi_block_alloc(&mut self, blocks_64k: u32, tag: u32) -> Option<u64> {
        self.block_alloc(
            Payload::DdrHiBlockAlloc { blocks_64k, tag },
            platform_map::DDR_HI_BASE,
        )
    }

    /// Return previously allocated low-window blocks. Fire-and-forget.
    pub fn ddr_lo_block_free(
        &mut self,
        address: u64,
        block_count: u16,
        tag: u32,
    ) -> Result<(), TransportError> {
        let offset = (address - platform_map::DDR_LO_BASE) as u32;
        self.transport.submit(
            &Message::Inline(Payload::DdrLoBlockFree {
                block_count,
                offset,
                tag,
            }),
            self.budget,
        )
    }

    /// Return previously allocated high-window blocks. Fire-and-forget.
    pub fn ddr_hi_block_free(
        &mut self,
        address: u64,
        block_count: u16,
        tag: u32,
    ) -> Result<(), TransportError> {
        let offset = (address - platform_map::DDR_HI_BASE) as u32;
        self.transport.submit(
            &Message::Inline(Payload::DdrHiBlockFree {
                block_count,
                offset,
                tag,
            }),
            self.budget,
        )
    }

    fn block_alloc(&mut self, payload: Payload, window_base: u64) -> Option<u64> {
        match self
            .transport
            .submit_with_response(&Message::Inline(payload), self.budget)
        {
            Ok(response) => match (response.result, response.payload) {
                (ResultCode::Success, ReplyPayload::BlockOffset(offset)) => {
                    Some(window_base + u64::from(offset))
                }
                (result, _) => {
                    log::warn!("osservices: block alloc failed: {result:?}");
                    None
                }
            },
            Err(err) => {
                log::warn!("osservices: block alloc failed: {err}");
                None
            }
        }
    }
}
