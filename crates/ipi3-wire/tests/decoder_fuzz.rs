// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Fuzz-style regression tests for IPI3 frame decoding.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use ipi3_wire::{
    BootData, CpuSet, CpuWakeSleep, DdrPacket, InlineText, Message, Payload, Response,
    ServiceFunc, FRAME_LEN,
};

#[test]
fn message_decoder_survives_mutated_frames() {
    let iterations = std::env::var("IPI3_FUZZ_ITERS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(2048);
    let mut rng = StdRng::seed_from_u64(0x1B1_0001);

    for _ in 0..iterations {
        let mut frame = random_message(&mut rng).encode();
        mutate_frame(&mut rng, &mut frame);
        // decode may reject, it must never panic or misreport length
        let _ = Message::decode(&frame);
    }
}

#[test]
fn response_decoder_survives_arbitrary_frames() {
    let mut rng = StdRng::seed_from_u64(0x1B1_0002);
    let functions = [
        ServiceFunc::PtrPrint,
        ServiceFunc::DdrLoBlockAlloc,
        ServiceFunc::DdrHiBlockAlloc,
        ServiceFunc::FetchBootData,
    ];
    for _ in 0..2048 {
        let mut frame = [0u8; FRAME_LEN];
        rng.fill_bytes(&mut frame);
        let function = functions[rng.random_range(0..functions.len())];
        let _ = Response::decode(&frame, function);
    }
}

#[test]
fn clean_messages_round_trip_after_fuzzing_runs() {
    let mut rng = StdRng::seed_from_u64(0x1B1_0003);
    for _ in 0..512 {
        let message = random_message(&mut rng);
        let decoded = Message::decode(&message.encode()).expect("clean frame decodes");
        assert_eq!(decoded, message);
    }
}

fn random_message<R: Rng>(rng: &mut R) -> Message {
    match rng.random_range(0..7) {
        0 => {
            let len = rng.random_range(0..=29);
            let mut text = vec![0u8; len];
            rng.fill_bytes(&mut text);
            Message::Inline(Payload::InlinePrint(
                InlineText::new(&text).expect("len bounded"),
            ))
        }
        1 => Message::Inline(Payload::DdrLoBlockAlloc {
            blocks_64k: rng.random(),
            tag: rng.random(),
        }),
        2 => Message::Inline(Payload::DdrLoBlockFree {
            block_count: rng.random(),
            offset: rng.random(),
            tag: rng.random(),
        }),
        3 => Message::Inline(Payload::FetchBootData),
        4 => Message::Inline(Payload::BootComplete(BootData {
            mmu_table: rng.random(),
            boot_code_start: rng.random(),
            boot_code_size: rng.random(),
            video_block: rng.random(),
        })),
        5 => {
            let cpus = CpuSet::from_bits_truncate(rng.random::<u8>() & 0x3F);
            let request = if rng.random_bool(0.5) {
                CpuWakeSleep::sleep(cpus)
            } else {
                CpuWakeSleep::wake(cpus, rng.random())
            };
            Message::Inline(Payload::CpuWakeOrSleep(request))
        }
        _ => Message::Indirect {
            function: ServiceFunc::PtrPrint,
            packet: DdrPacket {
                address: rng.random(),
                size: rng.random(),
            },
        },
    }
}

fn mutate_frame<R: Rng>(rng: &mut R, frame: &mut [u8; FRAME_LEN]) {
    for _ in 0..rng.random_range(1..4) {
        let index = rng.random_range(0..FRAME_LEN);
        frame[index] ^= rng.random_range(1..=0xFF);
    }
}
