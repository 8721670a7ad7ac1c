//! Allocation-free render path tests.
//!
//! These tests verify that `Engine::render` does not allocate once
//! playback is running. They render modules that exercise every effect,
//! pattern breaks and jumps, loops and sample edge cases for several
//! seconds, with observers attached.
//!
//! Runs under a plain `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tp_engine::{Command, Engine, EngineConfig, Frame, Subscription};
use tp_ir::{
    Cell, Effect, Envelope, Instrument, LoopType, Module, Note, OrderEntry, Pattern, Sample,
    SampleData,
};

/// Four channels cycling through every effect, with volume and panning
/// envelopes, both loop types, an empty sample and a missing instrument.
fn busy_module() -> Module {
    let mut m = Module::with_channels("alloc", 4);

    let mut looped = Sample::new("fwd");
    looped.data = SampleData::Mono16((0..2048).map(|i| ((i * 37) % 65536 - 32768) as i16).collect());
    looped.loop_start = 512;
    looped.loop_length = 1024;
    looped.loop_type = LoopType::Forward;
    let looped = m.samples.insert(looped);

    let mut bounce = Sample::new("pingpong");
    bounce.data = SampleData::Mono8((0..300).map(|i| ((i % 200) - 100) as i8).collect());
    bounce.loop_start = 100;
    bounce.loop_length = 150;
    bounce.loop_type = LoopType::PingPong;
    let bounce = m.samples.insert(bounce);

    let mut oneshot = Sample::new("oneshot");
    oneshot.data = SampleData::Mono8(vec![90; 400]);
    let oneshot = m.samples.insert(oneshot);

    let empty = m.samples.insert(Sample::new("empty"));

    for (name, key) in [("fwd", looped), ("pingpong", bounce), ("oneshot", oneshot), ("empty", empty)] {
        let mut inst = Instrument::new(name);
        inst.set_single_sample(key);
        let mut volume = Envelope::new();
        volume.add_point(0, 64);
        volume.add_point(10, 20);
        volume.add_point(20, 48);
        volume.sustain_point = Some(1);
        volume.loop_start = Some(1);
        volume.loop_end = Some(2);
        inst.volume_envelope = Some(volume);
        let mut pan = Envelope::new();
        pan.add_point(0, 0);
        pan.add_point(30, 64);
        inst.panning_envelope = Some(pan);
        m.instruments.push(inst);
    }

    for index in 0..3u8 {
        let mut p = Pattern::new(32, 4);
        for row in 0..32u16 {
            for ch in 0..4u8 {
                let code = (row as usize * 4 + ch as usize + index as usize * 7) % Effect::COUNT;
                let effect = Effect::ALL[code];
                let cell = p.cell_mut(row, ch);
                if (row + ch as u16) % 3 == 0 {
                    cell.note = if row % 11 == 10 {
                        Note::Off
                    } else {
                        Note::On(25 + ((row as u8 * 5 + ch) % 60))
                    };
                    // instruments 5 and 6 do not exist
                    cell.instrument = 1 + (row as u8 + ch) % 6;
                }
                if row % 5 == 2 {
                    cell.volume = Some(0x60 + (row as u8 % 10) * 0x10 + 3);
                }
                // keep the song moving forward and the tempo sane
                let param = match effect {
                    Effect::PositionJump => index + 2,
                    Effect::PatternBreak => 4,
                    Effect::SetSpeed => 3,
                    Effect::SetTempo => 140,
                    Effect::PatternDelay => 1,
                    Effect::PatternLoop => (row % 2) as u8,
                    _ => (row as u8).wrapping_mul(37) ^ ch,
                };
                cell.effect = effect;
                cell.param = param;
            }
        }
        m.patterns.push(p);
    }
    m.orders = vec![
        OrderEntry::Pattern(0),
        OrderEntry::Skip,
        OrderEntry::Pattern(1),
        OrderEntry::Pattern(2),
        OrderEntry::Pattern(0),
    ];
    m
}

/// Render `seconds` of audio in 512-frame blocks, aborting on any heap
/// allocation.
fn assert_render_alloc_free(mut engine: Engine, seconds: usize) {
    let rate = engine.sample_rate() as usize;
    let mut block = vec![Frame::silence(); 512];
    let mut interleaved = vec![0.0f32; 1024];

    assert_no_alloc(|| {
        for i in 0..(seconds * rate) / 512 {
            if i % 2 == 0 {
                engine.render(&mut block);
            } else {
                engine.render_interleaved(&mut interleaved);
            }
        }
    });
}

fn engine() -> Engine {
    Engine::with_module(busy_module(), EngineConfig::default())
}

#[test]
fn busy_module_alloc_free() {
    let mut engine = engine();
    engine.play();
    assert_render_alloc_free(engine, 5);
}

#[test]
fn observers_alloc_free() {
    let mut engine = engine();
    let count = Arc::new(AtomicUsize::new(0));
    for key in [Subscription::All, Subscription::RowChanged, Subscription::Effect(Effect::Vibrato)] {
        let count = Arc::clone(&count);
        engine.events().subscribe(key, move |_| {
            count.fetch_add(1, Ordering::Relaxed);
        });
    }
    engine.play();
    assert_render_alloc_free(engine, 3);
    assert!(count.load(Ordering::Relaxed) > 0);
}

#[test]
fn transport_between_blocks_alloc_free() {
    let mut engine = engine();
    engine.play();
    let mut block = vec![Frame::silence(); 256];
    let commands = [
        Command::NextOrder,
        Command::SetMute { channel: 2, muted: true },
        Command::SetPatternLoop(true),
        Command::PrevOrder,
        Command::RestartOrder,
        Command::Stop,
        Command::Play,
        Command::Rewind,
    ];
    // first calls register their log callsites
    for command in commands {
        engine.apply(command);
    }
    engine.apply(Command::SetPatternLoop(false));
    engine.apply(Command::SetMute { channel: 2, muted: false });

    assert_no_alloc(|| {
        for round in 0..200 {
            engine.apply(commands[round % commands.len()]);
            engine.render(&mut block);
        }
    });
}
