// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Volatile MMIO memory bus for bare-metal targets.
// Author: Lukas Bower
#![allow(unsafe_code)]

//! Direct physical-memory implementation of [`MemoryBus`].

use crate::bus::MemoryBus;

/// Memory bus that reads and writes physical addresses directly.
///
/// Only meaningful on the controller itself, where decoded addresses are
/// mapped one-to-one. Construction is unsafe because every later access
/// trusts the address decoder's range checks.
#[derive(Debug)]
pub struct PhysicalBus(());

impl PhysicalBus {
    /// Create the bus.
    ///
    /// # Safety
    ///
    /// The caller asserts that decoded addresses handed to this bus are
    /// mapped and side-effect-safe to access with volatile loads and
    /// stores.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

impl MemoryBus for PhysicalBus {
    fn read_word(&mut self, address: u64) -> u32 {
        // SAFETY: constructor contract; the decoder bounds every address.
        unsafe { core::ptr::read_volatile(address as usize as *const u32) }
    }

    fn write_bytes(&mut self, address: u64, bytes: &[u8]) {
        for (index, byte) in bytes.iter().enumerate() {
            // SAFETY: constructor contract; the decoder bounds every address.
            unsafe {
                core::ptr::write_volatile((address as usize + index) as *mut u8, *byte);
            }
        }
    }
}
