// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Volatile MMIO mailbox port over the platform doorbell block.
// Author: Lukas Bower
#![allow(unsafe_code)]

//! MMIO-backed [`MailboxPort`] for bare-metal targets.
//!
//! The buffer slots come from [`platform_map`]; the doorbell and observation
//! registers differ per core and are supplied at construction.

use ipi3_wire::FRAME_LEN;

use crate::MailboxPort;

/// Mailbox agents sharing the buffer block, in buffer-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Agent {
    /// First R5F core.
    R5f0 = 0,
    /// Second R5F core.
    R5f1 = 1,
    /// The A53 cluster (one shared channel).
    Apu = 2,
    /// Programmable-logic mailbox 0.
    Pl0 = 3,
    /// Programmable-logic mailbox 1.
    Pl1 = 4,
    /// Programmable-logic mailbox 2.
    Pl2 = 5,
    /// Programmable-logic mailbox 3.
    Pl3 = 6,
    /// The platform-management controller itself.
    Pmu = 7,
}

impl Agent {
    /// Message slot address for this agent.
    #[must_use]
    pub const fn message_slot(self) -> u64 {
        platform_map::ipi_message_slot(self as u64)
    }

    /// Response slot address for this agent.
    #[must_use]
    pub const fn response_slot(self) -> u64 {
        platform_map::ipi_response_slot(self as u64)
    }
}

/// One direction of a hardware mailbox.
///
/// `observation` and `trigger` are the doorbell block registers for the peer
/// channel; `mask` selects the channel bit inside them.
#[derive(Debug)]
pub struct MmioMailboxPort {
    message_slot: *mut u8,
    response_slot: *const u8,
    observation: *const u32,
    trigger: *mut u32,
    mask: u32,
}

impl MmioMailboxPort {
    /// Build a port for the given agent pair and doorbell registers.
    ///
    /// # Safety
    ///
    /// The register addresses must point at the live doorbell block and the
    /// agent slots must be mapped; the port performs volatile accesses to
    /// all four locations for its entire lifetime.
    #[must_use]
    pub const unsafe fn new(agent: Agent, observation: u64, trigger: u64, mask: u32) -> Self {
        Self {
            message_slot: agent.message_slot() as usize as *mut u8,
            response_slot: agent.response_slot() as usize as *const u8,
            observation: observation as usize as *const u32,
            trigger: trigger as usize as *mut u32,
            mask,
        }
    }
}

impl MailboxPort for MmioMailboxPort {
    fn busy(&mut self) -> bool {
        // SAFETY: construction guarantees a live, mapped observation register.
        unsafe { core::ptr::read_volatile(self.observation) & self.mask != 0 }
    }

    fn write_message(&mut self, frame: &[u8; FRAME_LEN]) {
        for (index, byte) in frame.iter().enumerate() {
            // SAFETY: the slot covers FRAME_LEN mapped bytes per construction.
            unsafe { core::ptr::write_volatile(self.message_slot.add(index), *byte) };
        }
    }

    fn ring_doorbell(&mut self) {
        // SAFETY: construction guarantees a live, mapped trigger register.
        unsafe { core::ptr::write_volatile(self.trigger, self.mask) };
    }

    fn read_response(&mut self, frame: &mut [u8; FRAME_LEN]) {
        for (index, byte) in frame.iter_mut().enumerate() {
            // SAFETY: the slot covers FRAME_LEN mapped bytes per construction.
            *byte = unsafe { core::ptr::read_volatile(self.response_slot.add(index)) };
        }
    }
}
