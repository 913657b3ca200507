// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Host interface state machine and command dispatcher.
// Author: Lukas Bower

//! The monitor proper: receive/process state machine, command dispatch and
//! the read cursor used for streaming memory dumps.
//!
//! All mutable protocol state lives in [`Monitor`]; the hardware seams
//! (host channel, memory bus, mailbox) are arguments, which keeps the whole
//! machine runnable against fakes.

use core::fmt::Write;

use ipi3_transport::MailboxPort;
use ipi3_wire::{BootData, CpuSet};
use osservices::OsService;

use crate::addr::{decode_address, parse_hex, window, DownloadTarget};
use crate::bus::MemoryBus;
use crate::command::{Command, CpuCluster, LineAssembler, LineEvent, MonitorError, CMD_BUF_SIZE};
use crate::download::{DownloadProgress, DownloadStager};

/// Monitor identity reported by the `what` command.
pub const MONITOR_IDENT: &str = concat!("pmu-monitor ", env!("CARGO_PKG_VERSION"));

macro_rules! host {
    ($out:expr, $($arg:tt)*) => {
        let _ = writeln!($out, $($arg)*);
    };
}

/// Host interface state. The machine runs forever, cycling.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HostState {
    /// Accumulating command bytes.
    ReceivingCommand,
    /// A full line is waiting to be dispatched.
    ProcessingCommand,
    /// The channel is carrying raw download payload.
    Downloading,
}

/// Last-read bookkeeping enabling address-omitted "continue" reads.
#[derive(Debug, Default)]
struct ReadCursor {
    address: u64,
    span: u32,
    live: bool,
}

impl ReadCursor {
    /// An explicit address ignores the cursor and repositions it.
    fn reposition(&mut self, address: u64, span: u32) {
        self.address = address;
        self.span = span;
        self.live = true;
    }

    /// An omitted address continues right after the previous read.
    fn advance(&mut self, span: u32) -> u64 {
        let next = self.address + u64::from(self.span);
        self.address = next;
        self.span = span;
        self.live = true;
        next
    }

    fn invalidate(&mut self) {
        self.live = false;
    }

    fn live(&self) -> bool {
        self.live
    }
}

/// The platform-management monitor.
pub struct Monitor {
    state: HostState,
    assembler: LineAssembler,
    pending: Option<heapless::Vec<u8, CMD_BUF_SIZE>>,
    cursor: ReadCursor,
    target: DownloadTarget,
    download_address: u64,
    stager: Option<DownloadStager>,
    boot_data: BootData,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    /// Create a monitor in its initial state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: HostState::ReceivingCommand,
            assembler: LineAssembler::new(),
            pending: None,
            cursor: ReadCursor::default(),
            target: DownloadTarget::A53,
            download_address: platform_map::DDR_HI_BASE,
            stager: None,
            boot_data: BootData::default(),
        }
    }

    /// Current state of the host interface machine.
    #[must_use]
    pub fn state(&self) -> HostState {
        self.state
    }

    /// Currently selected download target.
    #[must_use]
    pub fn target(&self) -> DownloadTarget {
        self.target
    }

    /// Store boot data received from the boot loader.
    pub fn record_boot_data(&mut self, data: BootData) {
        self.boot_data = data;
    }

    /// Boot data the monitor would restart from.
    #[must_use]
    pub fn boot_data(&self) -> &BootData {
        &self.boot_data
    }

    /// Feed received host bytes into the machine, returning how many were
    /// consumed.
    ///
    /// In the command states this assembles (and echoes) text; in the
    /// download sub-mode the same bytes are raw payload, and a chunk that
    /// spans the end of a download has its tail interpreted as text again.
    /// Consumption stops once a full line is assembled; call [`Self::service`]
    /// to dispatch it, then pump the remainder.
    pub fn pump_input<W: Write, B: MemoryBus>(
        &mut self,
        out: &mut W,
        bus: &mut B,
        bytes: &[u8],
    ) -> usize {
        let total = bytes.len();
        let mut rest = bytes;
        while !rest.is_empty() {
            if self.state == HostState::ProcessingCommand {
                break;
            }
            if self.state == HostState::Downloading {
                rest = self.pump_download(out, bus, rest);
            } else {
                let byte = rest[0];
                rest = &rest[1..];
                self.pump_text_byte(out, byte);
            }
        }
        total - rest.len()
    }

    /// Process a pending command line, if one has been assembled.
    pub fn service<W: Write, B: MemoryBus, P: MailboxPort>(
        &mut self,
        out: &mut W,
        bus: &mut B,
        os: &mut OsService<P>,
    ) {
        if self.state != HostState::ProcessingCommand {
            return;
        }
        self.state = HostState::ReceivingCommand;

        let line = match self.pending.take() {
            Some(line) => line,
            None => return,
        };
        let text = match core::str::from_utf8(&line) {
            Ok(text) => text,
            Err(_) => {
                host!(out, "unknown command");
                return;
            }
        };

        if text.trim().is_empty() {
            // bare enter after a read keeps the dump rolling
            if self.cursor.live() {
                let address = self.cursor.advance(16);
                self.read16_at(out, bus, address);
            }
            return;
        }

        match Command::parse(text) {
            Ok(command) => {
                if let Err(err) = self.dispatch(out, bus, os, command) {
                    host!(out, "{err}");
                    log::debug!("monitor: command failed: {err}");
                }
            }
            Err(MonitorError::UnknownCommand) if !has_printable(text) => {}
            Err(err) => {
                host!(out, "{err}");
            }
        }
    }

    fn pump_text_byte<W: Write>(&mut self, out: &mut W, byte: u8) {
        match self.assembler.push_byte(byte) {
            LineEvent::Pending => {}
            LineEvent::Echo(echoed) => {
                let _ = out.write_char(echoed as char);
            }
            LineEvent::Line => {
                self.pending = Some(self.assembler.take_line());
                self.state = HostState::ProcessingCommand;
            }
            LineEvent::Overflow => {
                host!(out, "{}", MonitorError::LineTooLong);
            }
        }
    }

    fn pump_download<'a, W: Write, B: MemoryBus>(
        &mut self,
        out: &mut W,
        bus: &mut B,
        bytes: &'a [u8],
    ) -> &'a [u8] {
        let stager = match self.stager.as_mut() {
            Some(stager) => stager,
            None => {
                self.state = HostState::ReceivingCommand;
                return bytes;
            }
        };
        let take = (stager.remaining() as usize).min(bytes.len());
        match stager.feed(bus, &bytes[..take]) {
            Ok(DownloadProgress::Complete) => self.finish_download(out),
            Ok(DownloadProgress::NeedMore) => {}
            Err(overrun) => {
                host!(
                    out,
                    "{}",
                    MonitorError::DownloadOverrun {
                        declared: overrun.declared
                    }
                );
                self.stager = None;
                self.state = HostState::ReceivingCommand;
            }
        }
        &bytes[take..]
    }

    fn finish_download<W: Write>(&mut self, out: &mut W) {
        if let Some(stager) = self.stager.take() {
            host!(
                out,
                "download complete: {:#x} bytes at {:#018x}",
                stager.written(),
                self.download_address
            );
        }
        self.cursor.invalidate();
        self.state = HostState::ReceivingCommand;
    }

    fn dispatch<W: Write, B: MemoryBus, P: MailboxPort>(
        &mut self,
        out: &mut W,
        bus: &mut B,
        os: &mut OsService<P>,
        command: Command<'_>,
    ) -> Result<(), MonitorError> {
        match command {
            Command::Echo(text) => {
                host!(out, "{text}");
                self.cursor.invalidate();
            }
            Command::What => {
                host!(out, "{MONITOR_IDENT}");
                self.cursor.invalidate();
            }
            Command::Read4 { address } => {
                let address = self.resolve_read(address, 4)?;
                let word = bus.read_word(address);
                host!(out, "{address:#010x} {word:#010x}");
            }
            Command::Read16 { address } => {
                let address = self.resolve_read(address, 16)?;
                self.read16_at(out, bus, address);
            }
            Command::DownloadAt {
                target,
                address,
                length,
            } => {
                self.download_at(out, target, address, length)?;
            }
            Command::SleepCpu(cluster) => {
                os.sleep_cpus(cluster_set(cluster))?;
                host!(out, "{}s going to sleep", cluster_name(cluster));
                self.cursor.invalidate();
            }
            Command::WakeCpu(cluster) => {
                os.wake_cpus(cluster_set(cluster), self.download_address)?;
                host!(out, "{}s waking up", cluster_name(cluster));
                self.cursor.invalidate();
            }
            Command::BootCpu(cluster) => {
                os.sleep_cpus(cluster_set(cluster))?;
                os.wake_cpus(cluster_set(cluster), self.download_address)?;
                host!(
                    out,
                    "{}s booting from {:#018x}",
                    cluster_name(cluster),
                    self.download_address
                );
                self.cursor.invalidate();
            }
            Command::Reset => {
                os.sleep_cpus(CpuSet::A53_CLUSTER | CpuSet::R5F_CLUSTER)?;
                let restart = u64::from(self.boot_data.boot_code_start);
                os.wake_cpus(CpuSet::A53_0, restart)?;
                host!(out, "soft reset from {restart:#010x}");
                self.cursor.invalidate();
            }
        }
        Ok(())
    }

    fn resolve_read(
        &mut self,
        token: Option<&str>,
        span: u32,
    ) -> Result<u64, MonitorError> {
        match token {
            Some(token) => {
                let decoded = decode_address(token, self.target)?;
                let address = decoded.address & !0x3;
                self.cursor.reposition(address, span);
                Ok(address)
            }
            None => Ok(self.cursor.advance(span)),
        }
    }

    fn read16_at<W: Write, B: MemoryBus>(&mut self, out: &mut W, bus: &mut B, address: u64) {
        let words = [
            bus.read_word(address),
            bus.read_word(address + 4),
            bus.read_word(address + 8),
            bus.read_word(address + 12),
        ];
        host!(
            out,
            "{address:#010x}: {:#010x} {:#010x} {:#010x} {:#010x}",
            words[0],
            words[1],
            words[2],
            words[3]
        );
    }

    fn download_at<W: Write>(
        &mut self,
        out: &mut W,
        target: Option<DownloadTarget>,
        address: &str,
        length: &str,
    ) -> Result<(), MonitorError> {
        if let Some(target) = target {
            self.target = target;
        }
        let decoded = decode_address(address, self.target)?;
        let length = parse_hex(length).map_err(|_| MonitorError::BadLength)?;
        if length > u64::from(u32::MAX) {
            return Err(MonitorError::BadLength);
        }
        if let Some((base, size)) = window(self.target) {
            if decoded.address + length > base + size {
                return Err(MonitorError::BadLength);
            }
        }

        self.download_address = decoded.address;
        self.cursor.invalidate();
        host!(
            out,
            "download {:#x} bytes to {:#018x}",
            length,
            decoded.address
        );
        if length == 0 {
            return Ok(());
        }
        self.stager = Some(DownloadStager::new(decoded.address, length as u32));
        self.state = HostState::Downloading;
        Ok(())
    }
}

fn cluster_set(cluster: CpuCluster) -> CpuSet {
    match cluster {
        CpuCluster::A53 => CpuSet::A53_CLUSTER,
        CpuCluster::R5f => CpuSet::R5F_CLUSTER,
    }
}

fn cluster_name(cluster: CpuCluster) -> &'static str {
    match cluster {
        CpuCluster::A53 => "A53",
        CpuCluster::R5f => "R5F",
    }
}

fn has_printable(text: &str) -> bool {
    text.bytes().any(|byte| byte > b' ' && byte <= 0x7F)
}
