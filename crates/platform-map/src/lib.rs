// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: SoC address windows and IPI mailbox geometry shared across the control plane.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![no_std]

//! Address-map constants for the platform-management control plane.
//!
//! Every crate that needs to agree on where a window lives pulls the numbers
//! from here rather than repeating magic addresses.

/// Base of the 32-bit-reachable DDR window.
pub const DDR_LO_BASE: u64 = 0x0000_0000;
/// Size of the low DDR window in bytes.
pub const DDR_LO_SIZE: u64 = 0x8000_0000;

/// Base of the application-core DDR window above the 32-bit boundary.
///
/// Downloads and application-core boot images land here by default.
pub const DDR_HI_BASE: u64 = 0x8_0000_0000;
/// Size of the high DDR window in bytes.
pub const DDR_HI_SIZE: u64 = 0x8000_0000;

/// Base of the R5F on-chip RAM window.
pub const OCM_BASE: u64 = 0xFFFC_0000;
/// Size of the R5F on-chip RAM window in bytes.
pub const OCM_SIZE: u64 = 0x4_0000;

/// Cache-line size used for shared-DRAM packet alignment.
pub const CACHE_LINE_SIZE: usize = 64;

/// Base address of the IPI mailbox buffer block.
pub const IPI_BUFFER_BASE: u64 = 0xFF99_0000;
/// Byte stride between the buffer pairs of adjacent agents.
pub const IPI_BUFFER_STRIDE: u64 = 0x200;
/// Offset of the message half within an agent's buffer pair.
pub const IPI_MSG_OFFSET: u64 = 0x00;
/// Offset of the response half within an agent's buffer pair.
pub const IPI_RESPONSE_OFFSET: u64 = 0x20;
/// Size of one mailbox message or response slot in bytes.
pub const IPI_SLOT_LEN: usize = 32;

/// Compute the message slot address for the given agent buffer index.
#[must_use]
pub const fn ipi_message_slot(agent_index: u64) -> u64 {
    IPI_BUFFER_BASE + agent_index * IPI_BUFFER_STRIDE + IPI_MSG_OFFSET
}

/// Compute the response slot address for the given agent buffer index.
#[must_use]
pub const fn ipi_response_slot(agent_index: u64) -> u64 {
    IPI_BUFFER_BASE + agent_index * IPI_BUFFER_STRIDE + IPI_RESPONSE_OFFSET
}
