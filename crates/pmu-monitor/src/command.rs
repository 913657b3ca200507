// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Host command line assembly and grammar for the monitor.
// Author: Lukas Bower

//! Line assembly and command grammar for the monitor's host channel.

use core::fmt;

use heapless::Vec;

use crate::addr::{AddressError, DownloadTarget};
use crate::verb::MonitorVerb;

/// Capacity of the command line buffer.
pub const CMD_BUF_SIZE: usize = 1024;

const ASCII_ETX: u8 = 0x03;
const ASCII_BACKSPACE: u8 = 0x08;
const ASCII_LF: u8 = 0x0A;
const ASCII_CR: u8 = 0x0D;
const ASCII_DEL: u8 = 0x7F;

/// Errors surfaced while assembling or parsing a command line.
#[derive(Debug, PartialEq, Eq)]
pub enum MonitorError {
    /// The line outgrew the command buffer and was discarded.
    LineTooLong,
    /// The keyword matched no known verb.
    UnknownCommand,
    /// Wrong argument shape; carries the usage string to report.
    Usage(&'static str),
    /// CPU qualifier matched no known cluster.
    UnknownCpu,
    /// An address token failed to decode.
    Address(AddressError),
    /// A download length failed to parse or overruns its window.
    BadLength,
    /// Raw download bytes arrived past the declared length.
    DownloadOverrun {
        /// Length the download declared.
        declared: u32,
    },
    /// An IPI submission failed.
    Transport(ipi3_transport::TransportError),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineTooLong => write!(f, "command too long"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::Usage(usage) => write!(f, "ARG ERROR: {usage}"),
            Self::UnknownCpu => write!(f, "unknown CPU target"),
            Self::Address(err) => write!(f, "bad address: {err}"),
            Self::BadLength => write!(f, "bad download length"),
            Self::DownloadOverrun { declared } => {
                write!(f, "download exceeds declared length {declared:#x}")
            }
            Self::Transport(err) => write!(f, "ipi transport: {err}"),
        }
    }
}

impl From<AddressError> for MonitorError {
    fn from(err: AddressError) -> Self {
        Self::Address(err)
    }
}

impl From<ipi3_transport::TransportError> for MonitorError {
    fn from(err: ipi3_transport::TransportError) -> Self {
        Self::Transport(err)
    }
}

/// Outcome of feeding one byte to the assembler.
#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// Byte consumed, nothing to do yet.
    Pending,
    /// Byte consumed and should be echoed back to the host.
    Echo(u8),
    /// A terminator arrived; a full line is ready to take.
    Line,
    /// The buffer overflowed; the line was discarded.
    Overflow,
}

/// Accumulates host bytes into a bounded command line.
///
/// Backspace pops, ctrl-C clears, LF is ignored and CR terminates, matching
/// what the serial side of the monitor has always done. A line that outgrows
/// the buffer is discarded in full: the remainder up to the next terminator
/// is swallowed rather than dispatched as a truncated command.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8, CMD_BUF_SIZE>,
    discarding: bool,
}

impl LineAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Feed one received byte.
    pub fn push_byte(&mut self, byte: u8) -> LineEvent {
        if self.discarding {
            if byte == ASCII_CR {
                self.discarding = false;
            }
            return LineEvent::Pending;
        }
        match byte {
            ASCII_BACKSPACE | ASCII_DEL => {
                self.buffer.pop();
                LineEvent::Echo(ASCII_BACKSPACE)
            }
            ASCII_ETX => {
                self.buffer.clear();
                LineEvent::Pending
            }
            ASCII_LF => LineEvent::Pending,
            ASCII_CR => LineEvent::Line,
            _ => {
                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.discarding = true;
                    return LineEvent::Overflow;
                }
                LineEvent::Echo(byte)
            }
        }
    }

    /// Take the assembled line, leaving the buffer empty for the next one.
    #[must_use]
    pub fn take_line(&mut self) -> Vec<u8, CMD_BUF_SIZE> {
        core::mem::take(&mut self.buffer)
    }
}

/// CPU cluster qualifier accepted by the lifecycle commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CpuCluster {
    /// All four A53 cores.
    A53,
    /// Both R5F cores.
    R5f,
}

impl CpuCluster {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "A53" => Some(Self::A53),
            "R5F" => Some(Self::R5f),
            _ => None,
        }
    }
}

/// A parsed command line. Address tokens stay textual; they are resolved
/// against the dispatcher's current download target.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// Write the argument text back verbatim.
    Echo(&'a str),
    /// Report monitor identity and version.
    What,
    /// Read four bytes, optionally at an explicit address.
    Read4 {
        /// Explicit address token, or continue from the read cursor.
        address: Option<&'a str>,
    },
    /// Read sixteen bytes, optionally at an explicit address.
    Read16 {
        /// Explicit address token, or continue from the read cursor.
        address: Option<&'a str>,
    },
    /// Enter the binary download sub-mode.
    DownloadAt {
        /// Optional target qualifier; persists once given.
        target: Option<DownloadTarget>,
        /// Destination address token.
        address: &'a str,
        /// Expected length token (hex bytes).
        length: &'a str,
    },
    /// Power a CPU cluster down.
    SleepCpu(CpuCluster),
    /// Power a CPU cluster up.
    WakeCpu(CpuCluster),
    /// Release a held cluster at the current download address.
    BootCpu(CpuCluster),
    /// Put everything to sleep and restart the boot program.
    Reset,
}

impl Command<'_> {
    /// Parse a complete command line.
    pub fn parse(line: &str) -> Result<Command<'_>, MonitorError> {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().ok_or(MonitorError::UnknownCommand)?;
        let verb = MonitorVerb::from_token(keyword).ok_or(MonitorError::UnknownCommand)?;
        let usage = MonitorError::Usage(verb.usage());

        match verb {
            MonitorVerb::Echo => {
                let rest = line[keyword.len()..].trim();
                if rest.is_empty() {
                    return Err(usage);
                }
                Ok(Command::Echo(rest))
            }
            MonitorVerb::What => match tokens.next() {
                None => Ok(Command::What),
                Some(_) => Err(usage),
            },
            MonitorVerb::Read4 => {
                let address = tokens.next();
                if tokens.next().is_some() {
                    return Err(usage);
                }
                Ok(Command::Read4 { address })
            }
            MonitorVerb::Read16 => {
                let address = tokens.next();
                if tokens.next().is_some() {
                    return Err(usage);
                }
                Ok(Command::Read16 { address })
            }
            MonitorVerb::DownloadAt => {
                let first = tokens.next().ok_or(MonitorError::Usage(verb.usage()))?;
                let (target, address) = match DownloadTarget::from_token(first) {
                    Some(target) => (
                        Some(target),
                        tokens.next().ok_or(MonitorError::Usage(verb.usage()))?,
                    ),
                    None => (None, first),
                };
                let length = tokens.next().ok_or(MonitorError::Usage(verb.usage()))?;
                if tokens.next().is_some() {
                    return Err(usage);
                }
                Ok(Command::DownloadAt {
                    target,
                    address,
                    length,
                })
            }
            MonitorVerb::SleepCpu | MonitorVerb::WakeCpu | MonitorVerb::BootCpu => {
                let token = tokens.next().ok_or(MonitorError::Usage(verb.usage()))?;
                if tokens.next().is_some() {
                    return Err(usage);
                }
                let cluster = CpuCluster::from_token(token).ok_or(MonitorError::UnknownCpu)?;
                Ok(match verb {
                    MonitorVerb::SleepCpu => Command::SleepCpu(cluster),
                    MonitorVerb::WakeCpu => Command::WakeCpu(cluster),
                    _ => Command::BootCpu(cluster),
                })
            }
            MonitorVerb::Reset => match tokens.next() {
                None => Ok(Command::Reset),
                Some(_) => Err(usage),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(input: &[u8]) -> (LineAssembler, Option<std::vec::Vec<u8>>) {
        let mut assembler = LineAssembler::new();
        for byte in input {
            if assembler.push_byte(*byte) == LineEvent::Line {
                let line = assembler.take_line();
                return (assembler, Some(line.as_slice().to_vec()));
            }
        }
        (assembler, None)
    }

    #[test]
    fn line_bytes_are_reproduced_exactly() {
        let (_, line) = assemble(b"echo hello world\r");
        assert_eq!(line.as_deref(), Some(&b"echo hello world"[..]));
    }

    #[test]
    fn backspace_edits_the_line() {
        let (_, line) = assemble(b"echp\x08o hi\r");
        assert_eq!(line.as_deref(), Some(&b"echo hi"[..]));
    }

    #[test]
    fn ctrl_c_abandons_the_line() {
        let (_, line) = assemble(b"garbage\x03what\r");
        assert_eq!(line.as_deref(), Some(&b"what"[..]));
    }

    #[test]
    fn linefeed_is_ignored() {
        let (_, line) = assemble(b"what\n\r");
        assert_eq!(line.as_deref(), Some(&b"what"[..]));
    }

    #[test]
    fn overflow_discards_line_and_remainder() {
        let mut assembler = LineAssembler::new();
        let mut overflowed = false;
        for _ in 0..CMD_BUF_SIZE + 10 {
            match assembler.push_byte(b'x') {
                LineEvent::Overflow => overflowed = true,
                LineEvent::Line => panic!("overflowing line must not complete"),
                _ => {}
            }
        }
        assert!(overflowed);
        // remainder of the oversized line is swallowed up to the terminator
        assert_eq!(assembler.push_byte(b'y'), LineEvent::Pending);
        assert_eq!(assembler.push_byte(ASCII_CR), LineEvent::Pending);
        assert!(assembler.is_empty());
        // the next line assembles normally
        assert_eq!(assembler.push_byte(b'w'), LineEvent::Echo(b'w'));
    }

    #[test]
    fn capacity_line_still_fits() {
        let mut assembler = LineAssembler::new();
        for _ in 0..CMD_BUF_SIZE {
            assert_ne!(assembler.push_byte(b'a'), LineEvent::Overflow);
        }
        assert_eq!(assembler.push_byte(ASCII_CR), LineEvent::Line);
        assert_eq!(assembler.take_line().len(), CMD_BUF_SIZE);
    }

    #[test]
    fn echo_keeps_argument_text_verbatim() {
        assert_eq!(
            Command::parse("echo two  words").unwrap(),
            Command::Echo("two  words")
        );
    }

    #[test]
    fn echo_requires_an_argument() {
        assert!(matches!(
            Command::parse("echo"),
            Err(MonitorError::Usage(_))
        ));
    }

    #[test]
    fn reads_accept_optional_address() {
        assert_eq!(
            Command::parse("read4b 1000").unwrap(),
            Command::Read4 {
                address: Some("1000")
            }
        );
        assert_eq!(
            Command::parse("r").unwrap(),
            Command::Read16 { address: None }
        );
    }

    #[test]
    fn download_at_accepts_optional_target() {
        assert_eq!(
            Command::parse("download_at A53 1000 200").unwrap(),
            Command::DownloadAt {
                target: Some(DownloadTarget::A53),
                address: "1000",
                length: "200",
            }
        );
        assert_eq!(
            Command::parse("download_at 1000 200").unwrap(),
            Command::DownloadAt {
                target: None,
                address: "1000",
                length: "200",
            }
        );
    }

    #[test]
    fn download_at_rejects_missing_length() {
        assert!(matches!(
            Command::parse("download_at 1000"),
            Err(MonitorError::Usage(_))
        ));
    }

    #[test]
    fn lifecycle_commands_demand_a_known_cluster() {
        assert_eq!(
            Command::parse("sleep_cpu A53").unwrap(),
            Command::SleepCpu(CpuCluster::A53)
        );
        assert_eq!(
            Command::parse("wake_cpu R5F").unwrap(),
            Command::WakeCpu(CpuCluster::R5f)
        );
        assert_eq!(Command::parse("boot_cpu M4"), Err(MonitorError::UnknownCpu));
    }

    #[test]
    fn unknown_keyword_is_reported() {
        assert_eq!(
            Command::parse("frobnicate 1 2"),
            Err(MonitorError::UnknownCommand)
        );
    }

    #[test]
    fn surplus_arguments_are_usage_errors() {
        assert!(matches!(
            Command::parse("read4b 1000 2000"),
            Err(MonitorError::Usage(_))
        ));
        assert!(matches!(
            Command::parse("reset now"),
            Err(MonitorError::Usage(_))
        ));
    }
}
