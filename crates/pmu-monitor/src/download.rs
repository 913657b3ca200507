// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Stage raw binary downloads into a decoded destination window.
// Author: Lukas Bower

//! Binary download staging.
//!
//! After `download_at` is accepted the host channel stops carrying text and
//! streams raw payload. The stager writes each caller-refilled chunk through
//! the memory bus, bounds-checking against the declared length before any
//! byte lands.

use crate::bus::MemoryBus;

/// Progress report from feeding the stager.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DownloadProgress {
    /// More payload is still expected.
    NeedMore,
    /// The declared length has arrived; the sub-mode is over.
    Complete,
}

/// A chunk would carry the download past its declared length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DownloadOverrun {
    /// Length the download declared.
    pub declared: u32,
    /// Bytes the rejected chunk would have reached.
    pub attempted: u64,
}

/// Write cursor for one binary download.
#[derive(Debug)]
pub struct DownloadStager {
    destination: u64,
    total: u32,
    written: u32,
}

impl DownloadStager {
    /// Start a download of `total` bytes at `destination`.
    #[must_use]
    pub fn new(destination: u64, total: u32) -> Self {
        Self {
            destination,
            total,
            written: 0,
        }
    }

    /// Destination address of the next byte.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.destination + u64::from(self.written)
    }

    /// Bytes still expected.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.total - self.written
    }

    /// Bytes written so far.
    #[must_use]
    pub fn written(&self) -> u32 {
        self.written
    }

    /// Feed the next refilled chunk.
    ///
    /// The whole chunk is rejected, and nothing of it written, if it would
    /// run past the declared length.
    pub fn feed<B: MemoryBus>(
        &mut self,
        bus: &mut B,
        chunk: &[u8],
    ) -> Result<DownloadProgress, DownloadOverrun> {
        let attempted = u64::from(self.written) + chunk.len() as u64;
        if attempted > u64::from(self.total) {
            return Err(DownloadOverrun {
                declared: self.total,
                attempted,
            });
        }
        if !chunk.is_empty() {
            bus.write_bytes(self.cursor(), chunk);
            self.written += chunk.len() as u32;
        }
        if self.written == self.total {
            Ok(DownloadProgress::Complete)
        } else {
            Ok(DownloadProgress::NeedMore)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MapBus(BTreeMap<u64, u8>);

    impl MemoryBus for MapBus {
        fn read_word(&mut self, address: u64) -> u32 {
            let mut bytes = [0u8; 4];
            for (index, byte) in bytes.iter_mut().enumerate() {
                *byte = *self.0.get(&(address + index as u64)).unwrap_or(&0);
            }
            u32::from_le_bytes(bytes)
        }

        fn write_bytes(&mut self, address: u64, bytes: &[u8]) {
            for (index, byte) in bytes.iter().enumerate() {
                self.0.insert(address + index as u64, *byte);
            }
        }
    }

    #[test]
    fn exact_length_completes_and_lands_every_byte() {
        let mut bus = MapBus::default();
        let mut stager = DownloadStager::new(0x100, 8);
        assert_eq!(
            stager.feed(&mut bus, &[1, 2, 3, 4, 5]),
            Ok(DownloadProgress::NeedMore)
        );
        assert_eq!(
            stager.feed(&mut bus, &[6, 7, 8]),
            Ok(DownloadProgress::Complete)
        );
        for offset in 0..8u64 {
            assert_eq!(bus.0.get(&(0x100 + offset)), Some(&(offset as u8 + 1)));
        }
        assert_eq!(stager.remaining(), 0);
    }

    #[test]
    fn excess_chunk_is_rejected_before_writing() {
        let mut bus = MapBus::default();
        let mut stager = DownloadStager::new(0x100, 4);
        assert_eq!(
            stager.feed(&mut bus, &[0xAA; 5]),
            Err(DownloadOverrun {
                declared: 4,
                attempted: 5,
            })
        );
        assert!(bus.0.is_empty());
        assert_eq!(stager.written(), 0);
    }

    #[test]
    fn byte_past_completion_is_rejected() {
        let mut bus = MapBus::default();
        let mut stager = DownloadStager::new(0x100, 2);
        assert_eq!(
            stager.feed(&mut bus, &[1, 2]),
            Ok(DownloadProgress::Complete)
        );
        assert!(stager.feed(&mut bus, &[3]).is_err());
        assert_eq!(bus.0.len(), 2);
    }

    #[test]
    fn empty_chunks_make_no_progress() {
        let mut bus = MapBus::default();
        let mut stager = DownloadStager::new(0x100, 1);
        assert_eq!(stager.feed(&mut bus, &[]), Ok(DownloadProgress::NeedMore));
        assert!(bus.0.is_empty());
    }
}
