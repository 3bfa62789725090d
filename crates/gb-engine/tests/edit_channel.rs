//! Structural edits made while an audio thread is rendering.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use common::Rig;
use gb_engine::{AudioWire, WireParams, AMP_MAX, PAN_CENTER};

/// Renders small blocks until told to stop.
fn spawn_audio(rig: Arc<Rig>, running: Arc<AtomicBool>) -> thread::JoinHandle<usize> {
    rig.player.start_work();
    thread::spawn(move || {
        let mut left = [0.0f32; 64];
        let mut right = [0.0f32; 64];
        let mut blocks = 0;
        while running.load(Ordering::Acquire) {
            rig.player.work_stereo(&mut left, &mut right);
            blocks += 1;
            thread::yield_now();
        }
        blocks
    })
}

#[test]
fn concurrent_pattern_edits_are_all_kept() {
    let rig = Arc::new(Rig::new());
    let (id, _) = rig.probe("Target", 0);
    let running = Arc::new(AtomicBool::new(true));
    let audio = spawn_audio(rig.clone(), running.clone());

    let editors: Vec<_> = (0..4)
        .map(|t| {
            let rig = rig.clone();
            thread::spawn(move || {
                for i in 0..8 {
                    rig.player.add_pattern(id, &format!("t{t}-{i}"), 4).unwrap();
                }
            })
        })
        .collect();
    for editor in editors {
        editor.join().unwrap();
    }

    running.store(false, Ordering::Release);
    let blocks = audio.join().unwrap();
    rig.player.stop_work();

    assert!(blocks > 0);
    assert_eq!(rig.player.pattern_count(id).unwrap(), 32);
}

#[test]
fn connections_made_during_playback_are_visible_on_return() {
    let rig = Arc::new(Rig::new());
    let sources: Vec<_> = (0..6).map(|i| rig.probe(&format!("S{i}"), 100).0).collect();
    let master = rig.player.master();
    let running = Arc::new(AtomicBool::new(true));
    let audio = spawn_audio(rig.clone(), running.clone());

    let editors: Vec<_> = sources
        .iter()
        .map(|&from| {
            let rig = rig.clone();
            thread::spawn(move || {
                rig.player.connect(from, master, WireParams::Audio(AudioWire::default())).unwrap();
                let inputs = rig.player.inputs(master).unwrap();
                assert!(inputs.iter().any(|c| c.from == from));
                assert_eq!(rig.player.outputs(from).unwrap().len(), 1);
            })
        })
        .collect();
    for editor in editors {
        editor.join().unwrap();
    }

    running.store(false, Ordering::Release);
    audio.join().unwrap();
    rig.player.stop_work();

    assert_eq!(rig.player.inputs(master).unwrap().len(), sources.len());
    let (left, _) = rig.render(16, 16);
    assert!((left[0] - 0.6).abs() < 1e-5);
}

#[test]
fn stopping_work_releases_a_waiting_edit() {
    let rig = Arc::new(Rig::new());
    let (id, _) = rig.probe("Target", 0);
    rig.player.start_work();

    // no audio thread is running: the submitter waits until stop_work
    // applies the edit on its behalf
    let editor = {
        let rig = rig.clone();
        thread::spawn(move || rig.player.add_pattern(id, "late", 4).unwrap())
    };
    while !editor.is_finished() {
        rig.player.stop_work();
        thread::yield_now();
    }
    assert_eq!(editor.join().unwrap(), 0);
    assert_eq!(rig.player.pattern_count(id).unwrap(), 1);
}

#[test]
fn wire_changes_survive_a_waiting_connect() {
    let rig = Arc::new(Rig::new());
    let (a, _) = rig.probe("A", 100);
    let (b, _) = rig.probe("B", 100);
    let master = rig.player.master();
    rig.player.connect(b, master, WireParams::Audio(AudioWire::default())).unwrap();
    rig.player.start_work();

    let editor = {
        let rig = rig.clone();
        thread::spawn(move || rig.player.connect(a, master, WireParams::Audio(AudioWire::default())).unwrap())
    };
    while !rig.player.has_pending_edit() {
        thread::yield_now();
    }
    // changed after the connect edit was built, before it is applied
    rig.player.set_audio_wire(b, master, AudioWire::new(AMP_MAX / 4, PAN_CENTER)).unwrap();
    let mut left = [0.0f32; 16];
    let mut right = [0.0f32; 16];
    rig.player.work_stereo(&mut left, &mut right);
    editor.join().unwrap();
    rig.player.stop_work();

    let inputs = rig.player.inputs(master).unwrap();
    assert_eq!(inputs.len(), 2);
    let wire = inputs.iter().find(|c| c.from == b).and_then(|c| c.audio().copied()).unwrap();
    assert_eq!(wire.amp, AMP_MAX / 4);
}
