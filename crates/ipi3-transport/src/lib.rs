// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide the IPI3 mailbox doorbell transport for protocol users.
// Author: Lukas Bower
#![cfg_attr(not(feature = "mmio"), forbid(unsafe_code))]
#![cfg_attr(feature = "mmio", deny(unsafe_code))]
#![warn(missing_docs)]
#![no_std]

//! IPI3 mailbox transport shared between the platform-management controller
//! and the application cores.
//!
//! Two submission paths exist: [`Ipi3Transport::submit`] posts a message and
//! returns without waiting for the peer, while
//! [`Ipi3Transport::submit_with_response`] blocks until the peer consumes
//! the message and posts a response into the paired slot. There is no
//! preemptive scheduler underneath; the block is a doorbell-observation spin
//! bounded only by the caller's [`WaitBudget`].
//!
//! One request may be outstanding per mailbox at a time. The transport does
//! not lock; callers on the same port must serialize themselves.

#[cfg(test)]
extern crate std;

use ipi3_wire::{Message, Response, WireError, FRAME_LEN};

#[cfg(feature = "mmio")]
pub mod mmio;

/// Errors surfaced by the mailbox transport.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    /// The doorbell never cleared within the caller's wait budget.
    #[error("mailbox wait budget exhausted")]
    Timeout,
    /// The peer's response frame failed to decode.
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Hardware seam for one mailbox direction.
///
/// An implementation owns the message slot, the paired response slot and the
/// doorbell/observation registers for a single peer. Each method does exactly
/// what the doorbell block does; nothing here retries or sleeps.
pub trait MailboxPort {
    /// True while the peer has not consumed the previously rung doorbell.
    fn busy(&mut self) -> bool;

    /// Copy an encoded frame into the message slot.
    fn write_message(&mut self, frame: &[u8; FRAME_LEN]);

    /// Raise the peer's doorbell interrupt.
    fn ring_doorbell(&mut self);

    /// Copy the response slot into the caller's frame.
    fn read_response(&mut self, frame: &mut [u8; FRAME_LEN]);
}

impl<P: MailboxPort + ?Sized> MailboxPort for &mut P {
    fn busy(&mut self) -> bool {
        (**self).busy()
    }

    fn write_message(&mut self, frame: &[u8; FRAME_LEN]) {
        (**self).write_message(frame);
    }

    fn ring_doorbell(&mut self) {
        (**self).ring_doorbell();
    }

    fn read_response(&mut self, frame: &mut [u8; FRAME_LEN]) {
        (**self).read_response(frame);
    }
}

/// Spin budget for the blocking waits.
///
/// The observed hardware design waits forever; that stays available as
/// [`WaitBudget::unbounded`], but callers that cannot afford a hang can cap
/// the spin count and handle [`TransportError::Timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget(Option<u64>);

impl WaitBudget {
    /// Wait until the peer responds, however long that takes.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self(None)
    }

    /// Give up after `spins` doorbell observations.
    #[must_use]
    pub const fn spins(spins: u64) -> Self {
        Self(Some(spins))
    }

    fn consume(&mut self) -> bool {
        match &mut self.0 {
            None => true,
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                true
            }
        }
    }
}

impl Default for WaitBudget {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Mailbox transport over one [`MailboxPort`].
#[derive(Debug)]
pub struct Ipi3Transport<P> {
    port: P,
}

impl<P: MailboxPort> Ipi3Transport<P> {
    /// Wrap a mailbox port.
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Release the underlying port.
    pub fn into_inner(self) -> P {
        self.port
    }

    /// Borrow the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Post a message and return without awaiting any acknowledgment.
    ///
    /// Blocks only until the mailbox drains from any previous submission.
    pub fn submit(&mut self, message: &Message, budget: WaitBudget) -> Result<(), TransportError> {
        let mut budget = budget;
        self.wait_idle(&mut budget)?;
        self.port.write_message(&message.encode());
        self.port.ring_doorbell();
        Ok(())
    }

    /// Post a message, block until the peer responds, decode the response.
    ///
    /// The response is decoded against the submitted function code, so a
    /// peer that answers with garbage surfaces as a [`WireError`] rather
    /// than a misread payload.
    pub fn submit_with_response(
        &mut self,
        message: &Message,
        budget: WaitBudget,
    ) -> Result<Response, TransportError> {
        let mut budget = budget;
        self.wait_idle(&mut budget)?;
        self.port.write_message(&message.encode());
        self.port.ring_doorbell();
        self.wait_idle(&mut budget)?;

        let mut frame = [0u8; FRAME_LEN];
        self.port.read_response(&mut frame);
        Ok(Response::decode(&frame, message.function())?)
    }

    fn wait_idle(&mut self, budget: &mut WaitBudget) -> Result<(), TransportError> {
        while self.port.busy() {
            if !budget.consume() {
                log::warn!("ipi3: wait budget exhausted, abandoning mailbox wait");
                return Err(TransportError::Timeout);
            }
            core::hint::spin_loop();
        }
        Ok(())
    }
}

/// Cache-line-aligned storage for message and response staging.
///
/// Indirect packets live in DRAM shared between cores; aligning them to the
/// cache line keeps a flush or invalidate from clipping a neighbour's data.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C, align(64))]
pub struct CacheAligned<T>(pub T);

const _: () = assert!(core::mem::align_of::<CacheAligned<[u8; FRAME_LEN]>>()
    == platform_map::CACHE_LINE_SIZE);
