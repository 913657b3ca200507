// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Canonical monitor verb inventory and usage grammar.
// Author: Lukas Bower

//! Canonical list of verbs understood by the monitor's host channel.

/// Verbs accepted by the monitor, in canonical order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MonitorVerb {
    /// `echo`
    Echo,
    /// `what`
    What,
    /// `read4b`
    Read4,
    /// `read16b`
    Read16,
    /// `download_at`
    DownloadAt,
    /// `sleep_cpu`
    SleepCpu,
    /// `wake_cpu`
    WakeCpu,
    /// `boot_cpu`
    BootCpu,
    /// `reset`
    Reset,
}

/// Number of monitor verbs known to the compiler.
pub const VERB_SPEC_COUNT: usize = 9;

/// All monitor verbs in canonical order.
pub const ALL_VERBS: [MonitorVerb; VERB_SPEC_COUNT] = [
    MonitorVerb::Echo,
    MonitorVerb::What,
    MonitorVerb::Read4,
    MonitorVerb::Read16,
    MonitorVerb::DownloadAt,
    MonitorVerb::SleepCpu,
    MonitorVerb::WakeCpu,
    MonitorVerb::BootCpu,
    MonitorVerb::Reset,
];

/// Grammar metadata for a monitor verb.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VerbSpec {
    /// Verb identifier.
    pub verb: MonitorVerb,
    /// Usage string in canonical grammar.
    pub usage: &'static str,
    /// Example command line matching the grammar.
    pub example: &'static str,
}

/// Monitor verb grammar specs (canonical order).
pub const VERB_SPECS: [VerbSpec; VERB_SPEC_COUNT] = [
    VerbSpec {
        verb: MonitorVerb::Echo,
        usage: "echo <text>",
        example: "echo hello",
    },
    VerbSpec {
        verb: MonitorVerb::What,
        usage: "what",
        example: "what",
    },
    VerbSpec {
        verb: MonitorVerb::Read4,
        usage: "read4b [address]",
        example: "read4b 1000",
    },
    VerbSpec {
        verb: MonitorVerb::Read16,
        usage: "read16b [address]",
        example: "read16b 1000",
    },
    VerbSpec {
        verb: MonitorVerb::DownloadAt,
        usage: "download_at [A53|R5F|DATA] <address> <length>",
        example: "download_at A53 0 40000",
    },
    VerbSpec {
        verb: MonitorVerb::SleepCpu,
        usage: "sleep_cpu <A53|R5F>",
        example: "sleep_cpu A53",
    },
    VerbSpec {
        verb: MonitorVerb::WakeCpu,
        usage: "wake_cpu <A53|R5F>",
        example: "wake_cpu A53",
    },
    VerbSpec {
        verb: MonitorVerb::BootCpu,
        usage: "boot_cpu <A53|R5F>",
        example: "boot_cpu A53",
    },
    VerbSpec {
        verb: MonitorVerb::Reset,
        usage: "reset",
        example: "reset",
    },
];

const _: [(); VERB_SPEC_COUNT] = [(); ALL_VERBS.len()];
const _: [(); VERB_SPEC_COUNT] = [(); VERB_SPECS.len()];

impl MonitorVerb {
    /// Return the canonical token used when parsing the verb.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::What => "what",
            Self::Read4 => "read4b",
            Self::Read16 => "read16b",
            Self::DownloadAt => "download_at",
            Self::SleepCpu => "sleep_cpu",
            Self::WakeCpu => "wake_cpu",
            Self::BootCpu => "boot_cpu",
            Self::Reset => "reset",
        }
    }

    /// Return the usage string reported on argument errors.
    #[must_use]
    pub fn usage(self) -> &'static str {
        VERB_SPECS[self as usize].usage
    }

    /// Parse a verb token, accepting the historical read aliases.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("echo") {
            Some(Self::Echo)
        } else if token.eq_ignore_ascii_case("what") {
            Some(Self::What)
        } else if token.eq_ignore_ascii_case("read4b") {
            Some(Self::Read4)
        } else if token.eq_ignore_ascii_case("r")
            || token.eq_ignore_ascii_case("read")
            || token.eq_ignore_ascii_case("read16b")
        {
            Some(Self::Read16)
        } else if token.eq_ignore_ascii_case("download_at") {
            Some(Self::DownloadAt)
        } else if token.eq_ignore_ascii_case("sleep_cpu") {
            Some(Self::SleepCpu)
        } else if token.eq_ignore_ascii_case("wake_cpu") {
            Some(Self::WakeCpu)
        } else if token.eq_ignore_ascii_case("boot_cpu") {
            Some(Self::BootCpu)
        } else if token.eq_ignore_ascii_case("reset") {
            Some(Self::Reset)
        } else {
            None
        }
    }
}
