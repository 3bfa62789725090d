use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gb_engine::machines::{oscillator, passthrough};
use gb_engine::{AudioWire, EngineConfig, ParamGroup, Player, TransportState, WireParams};

/// `voices` oscillators, each through its own passthrough into the master,
/// playing a looping pattern.
fn player(voices: usize) -> Player {
    let p = Player::new(&EngineConfig::default()).unwrap();
    for v in 0..voices {
        let osc = p.create_machine(oscillator::INFO.uri, "Osc", &[]).unwrap();
        let fx = p.create_machine(passthrough::INFO.uri, "Fx", &[]).unwrap();
        p.connect(osc, fx, WireParams::Audio(AudioWire::default())).unwrap();
        p.connect(fx, p.master(), WireParams::Audio(AudioWire::default())).unwrap();
        let pattern = p.add_pattern(osc, "p", 16).unwrap();
        for row in (0..16u16).step_by(2) {
            let note = 40 + v as i32 + row as i32;
            p.set_pattern_value(osc, pattern, row, ParamGroup::Track, 0, oscillator::NOTE, note).unwrap();
        }
        let track = p.add_sequence_track(osc).unwrap();
        p.set_sequence_event(track, 0, Some(pattern as u16)).unwrap();
    }
    p.set_state(TransportState::Playing);
    p
}

fn bench_work_stereo(c: &mut Criterion) {
    let mut group = c.benchmark_group("work_stereo_256");
    for voices in [1, 8, 32] {
        let p = player(voices);
        let mut left = [0.0f32; 256];
        let mut right = [0.0f32; 256];
        group.bench_with_input(BenchmarkId::from_parameter(voices), &voices, |b, _| {
            b.iter(|| {
                p.work_stereo(&mut left, &mut right);
                black_box(left[0]);
            })
        });
    }
    group.finish();
}

fn bench_edit_round_trip(c: &mut Criterion) {
    let p = player(4);
    let osc = p.machine_by_name("Osc").unwrap();
    c.bench_function("set_pattern_value_idle", |b| {
        b.iter(|| {
            p.set_pattern_value(osc, 0, 1, ParamGroup::Track, 0, oscillator::NOTE, black_box(60)).unwrap();
        })
    });
}

criterion_group!(benches, bench_work_stereo, bench_edit_round_trip);
criterion_main!(benches);
