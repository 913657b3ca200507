// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Resolve host-supplied address tokens against CPU address spaces.
// Author: Lukas Bower

//! Address decoding for the host channel.
//!
//! Address tokens are hexadecimal offsets interpreted against the currently
//! selected download target: A53 offsets land in the application-core DDR
//! window, R5F offsets in its on-chip RAM, and DATA passes the value through
//! untouched as a raw physical address.

use core::fmt;

/// Address space an address token is resolved against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DownloadTarget {
    /// Application-core DDR window.
    A53,
    /// R5F private on-chip RAM.
    R5f,
    /// Raw physical address, no mapping.
    Data,
}

impl DownloadTarget {
    /// Parse a target qualifier token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "A53" => Some(Self::A53),
            "R5F" => Some(Self::R5f),
            "DATA" => Some(Self::Data),
            _ => None,
        }
    }
}

/// A resolved physical address plus the target it was resolved against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DecodedAddress {
    /// Target the token was interpreted in.
    pub target: DownloadTarget,
    /// Resolved physical address.
    pub address: u64,
}

/// Reasons an address token fails to decode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressError {
    /// The token is not hexadecimal.
    NotHex,
    /// The offset falls outside the target's window.
    OutOfRange {
        /// Offset that was requested.
        offset: u64,
        /// Target whose window it missed.
        target: DownloadTarget,
    },
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotHex => write!(f, "address is not hexadecimal"),
            Self::OutOfRange { offset, target } => {
                write!(f, "offset {offset:#x} outside {target:?} window")
            }
        }
    }
}

/// Parse a hexadecimal token, with or without a `0x` prefix.
pub fn parse_hex(token: &str) -> Result<u64, AddressError> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u64::from_str_radix(digits, 16).map_err(|_| AddressError::NotHex)
}

/// Resolve an address token against the given target.
pub fn decode_address(
    token: &str,
    target: DownloadTarget,
) -> Result<DecodedAddress, AddressError> {
    let offset = parse_hex(token)?;
    let address = match target {
        DownloadTarget::A53 => {
            map_window(offset, platform_map::DDR_HI_BASE, platform_map::DDR_HI_SIZE, target)?
        }
        DownloadTarget::R5f => {
            map_window(offset, platform_map::OCM_BASE, platform_map::OCM_SIZE, target)?
        }
        DownloadTarget::Data => offset,
    };
    Ok(DecodedAddress { target, address })
}

/// Base and size of the window backing a target, if it has one.
#[must_use]
pub fn window(target: DownloadTarget) -> Option<(u64, u64)> {
    match target {
        DownloadTarget::A53 => Some((platform_map::DDR_HI_BASE, platform_map::DDR_HI_SIZE)),
        DownloadTarget::R5f => Some((platform_map::OCM_BASE, platform_map::OCM_SIZE)),
        DownloadTarget::Data => None,
    }
}

fn map_window(
    offset: u64,
    base: u64,
    size: u64,
    target: DownloadTarget,
) -> Result<u64, AddressError> {
    if offset >= size {
        return Err(AddressError::OutOfRange { offset, target });
    }
    Ok(base + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_token_resolves_per_target() {
        let a53 = decode_address("1000", DownloadTarget::A53).unwrap();
        let r5f = decode_address("1000", DownloadTarget::R5f).unwrap();
        assert_ne!(a53.address, r5f.address);
        assert_eq!(a53.address, platform_map::DDR_HI_BASE + 0x1000);
        assert_eq!(r5f.address, platform_map::OCM_BASE + 0x1000);
    }

    #[test]
    fn data_target_passes_through() {
        let raw = decode_address("FFFF0000", DownloadTarget::Data).unwrap();
        assert_eq!(raw.address, 0xFFFF_0000);
    }

    #[test]
    fn prefixed_hex_is_accepted() {
        assert_eq!(parse_hex("0x40"), Ok(0x40));
        assert_eq!(parse_hex("0X40"), Ok(0x40));
        assert_eq!(parse_hex("40"), Ok(0x40));
    }

    #[test]
    fn non_hex_is_a_decode_failure() {
        assert_eq!(
            decode_address("wibble", DownloadTarget::A53),
            Err(AddressError::NotHex)
        );
    }

    #[test]
    fn out_of_window_offsets_are_rejected() {
        let beyond_ocm = decode_address("40000", DownloadTarget::R5f);
        assert_eq!(
            beyond_ocm,
            Err(AddressError::OutOfRange {
                offset: platform_map::OCM_SIZE,
                target: DownloadTarget::R5f,
            })
        );
        assert!(decode_address("3FFFC", DownloadTarget::R5f).is_ok());
    }
}
