// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Host command interface and IPI service dispatch for the controller.
// Author: Lukas Bower
#![cfg_attr(not(feature = "mmio"), forbid(unsafe_code))]
#![cfg_attr(feature = "mmio", deny(unsafe_code))]
#![warn(missing_docs)]
#![no_std]

//! The platform-management monitor.
//!
//! Two halves share this crate. The host interface turns a raw serial byte
//! stream into commands: inspect memory, stage binary downloads, drive CPU
//! lifecycle. The service dispatcher answers mailbox requests arriving from
//! the application cores. Both are plain state machines over narrow hardware
//! seams and run unmodified against fakes in the test suites.

#[cfg(test)]
extern crate std;

pub mod addr;
pub mod bus;
pub mod command;
pub mod download;
pub mod monitor;
pub mod server;
pub mod verb;

#[cfg(feature = "mmio")]
pub mod mmio;

pub use addr::{decode_address, AddressError, DecodedAddress, DownloadTarget};
pub use bus::MemoryBus;
pub use command::{Command, CpuCluster, LineAssembler, LineEvent, MonitorError, CMD_BUF_SIZE};
pub use download::{DownloadProgress, DownloadStager};
pub use monitor::{HostState, Monitor, MONITOR_IDENT};
pub use server::{OsServer, ServerEnv};
pub use verb::{MonitorVerb, VerbSpec, ALL_VERBS, VERB_SPECS, VERB_SPEC_COUNT};
