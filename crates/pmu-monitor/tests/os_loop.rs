// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Close the loop between the service facade and the dispatcher.
// Author: Lukas Bower

use std::cell::RefCell;
use std::rc::Rc;

use ipi3_transport::MailboxPort;
use ipi3_wire::{BootData, CpuSet, CpuWakeSleep, DdrPacket, ResultCode, FRAME_LEN};
use osservices::OsService;
use pmu_monitor::{OsServer, ServerEnv};

#[derive(Default)]
struct PmuEnv {
    console: Vec<u8>,
    transitions: Vec<CpuWakeSleep>,
    next_lo_offset: u32,
}

impl ServerEnv for PmuEnv {
    fn console_write(&mut self, text: &[u8]) {
        self.console.extend_from_slice(text);
    }

    fn cpu_wake_or_sleep(&mut self, request: &CpuWakeSleep) {
        self.transitions.push(*request);
    }

    fn ddr_lo_alloc(&mut self, blocks_64k: u32) -> Option<u32> {
        let offset = self.next_lo_offset;
        self.next_lo_offset += blocks_64k * 0x1_0000;
        Some(offset)
    }

    fn ddr_lo_free(&mut self, _offset: u32, _block_count: u16) {}

    fn ddr_hi_alloc(&mut self, _blocks_64k: u32) -> Option<u32> {
        None
    }

    fn ddr_hi_free(&mut self, _offset: u32, _block_count: u16) {}

    fn ptr_print(&mut self, packet: &DdrPacket) -> ResultCode {
        if packet.size <= FRAME_LEN as u32 {
            return ResultCode::BadParameters;
        }
        ResultCode::Success
    }
}

/// Mailbox whose doorbell is wired straight into an [`OsServer`].
struct LoopPort {
    server: Rc<RefCell<OsServer>>,
    env: Rc<RefCell<PmuEnv>>,
    message: [u8; FRAME_LEN],
    response: [u8; FRAME_LEN],
}

impl LoopPort {
    fn new(server: Rc<RefCell<OsServer>>, env: Rc<RefCell<PmuEnv>>) -> Self {
        Self {
            server,
            env,
            message: [0u8; FRAME_LEN],
            response: [0u8; FRAME_LEN],
        }
    }
}

impl MailboxPort for LoopPort {
    fn busy(&mut self) -> bool {
        false
    }

    fn write_message(&mut self, frame: &[u8; FRAME_LEN]) {
        self.message = *frame;
    }

    fn ring_doorbell(&mut self) {
        let reply = self
            .server
            .borrow_mut()
            .handle(&mut *self.env.borrow_mut(), &self.message);
        if let Some(reply) = reply {
            self.response = reply;
        }
    }

    fn read_response(&mut self, frame: &mut [u8; FRAME_LEN]) {
        *frame = self.response;
    }
}

fn looped_service() -> (OsService<LoopPort>, Rc<RefCell<OsServer>>, Rc<RefCell<PmuEnv>>) {
    let server = Rc::new(RefCell::new(OsServer::new()));
    let env = Rc::new(RefCell::new(PmuEnv::default()));
    let service = OsService::new(LoopPort::new(Rc::clone(&server), Rc::clone(&env)));
    (service, server, env)
}

#[test]
fn boot_data_survives_the_full_round_trip() {
    let (mut service, server, _env) = looped_service();
    let boot = BootData {
        mmu_table: 0x0000_0008_4000_0000,
        boot_code_start: 0xFFFC_0040,
        boot_code_size: 0x0001_8000,
        video_block: 0x2100_0000,
    };

    service.boot_complete(&boot).expect("boot complete");
    assert_eq!(*server.borrow().boot_data(), boot);

    let fetched = service.fetch_boot_data();
    assert_eq!(fetched, boot);
}

#[test]
fn fetch_before_any_boot_complete_yields_zeroed_data() {
    let (mut service, _server, _env) = looped_service();
    assert_eq!(service.fetch_boot_data(), BootData::default());
}

#[test]
fn power_requests_arrive_at_the_controller_intact() {
    let (mut service, _server, env) = looped_service();
    service.sleep_cpus(CpuSet::R5F_CLUSTER).expect("sleep");
    service
        .wake_cpus(CpuSet::A53_0 | CpuSet::A53_1, 0x8_0010_0000)
        .expect("wake");

    let transitions = env.borrow().transitions.clone();
    assert_eq!(transitions.len(), 2);
    assert_eq!(transitions[0].sleep_set(), CpuSet::R5F_CLUSTER);
    assert!(transitions[0].wake_set().is_empty());
    assert_eq!(transitions[1].wake_set(), CpuSet::A53_0 | CpuSet::A53_1);
    assert_eq!(transitions[1].wake_address(), 0x8_0010_0000);
    assert!(transitions[1].sleep_set().is_empty());
}

#[test]
fn prints_accumulate_on_the_controller_console() {
    let (mut service, _server, env) = looped_service();
    let text = "boot stage two: clocks up, ddr trained, handing over\n";
    service.print(text).expect("print");
    assert_eq!(env.borrow().console, text.as_bytes());
}

#[test]
fn lo_alloc_returns_window_addresses_and_advances() {
    let (mut service, _server, _env) = looped_service();
    let first = service.ddr_lo_block_alloc(2, 0xB007).expect("first alloc");
    let second = service.ddr_lo_block_alloc(1, 0xB007).expect("second alloc");
    assert_eq!(first, platform_map::DDR_LO_BASE);
    assert_eq!(second, platform_map::DDR_LO_BASE + 2 * 0x1_0000);
}

#[test]
fn hi_alloc_failure_is_a_clean_none() {
    let (mut service, _server, _env) = looped_service();
    assert_eq!(service.ddr_hi_block_alloc(8, 0), None);
}

#[test]
fn undersized_ptr_print_packet_is_rejected() {
    let (mut service, _server, env) = looped_service();
    // size must cover the staged frame header
    service
        .ptr_print(DdrPacket {
            address: 0x8_0000_0000,
            size: 16,
        })
        .expect("transport ok even when rejected");
    assert!(env.borrow().console.is_empty());
}
