mod common;

use common::{Rig, BROKEN, LEVEL, PROBE};
use gb_engine::{
    AudioWire, ConnectionKind, EngineConfig, EngineError, EngineEvent, MidiMapping, ParamGroup,
    TransportState, WireParams,
};

fn audio() -> WireParams {
    WireParams::Audio(AudioWire::default())
}

#[test]
fn no_output_machines_are_wired_to_master() {
    let rig = Rig::new();
    let p = &rig.player;
    let (sink, _) = rig.sink("Rec");

    let inputs = p.inputs(p.master()).unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].from, sink);
    assert_eq!(inputs[0].kind(), ConnectionKind::Audio);

    let mut events = Vec::new();
    p.drain_notifications(|n| events.push(n.event));
    assert_eq!(
        events,
        vec![
            EngineEvent::MachineCreated,
            EngineEvent::Connected { from: sink, to: p.master(), kind: ConnectionKind::Audio },
        ]
    );

    p.delete_machine(sink).unwrap();
    assert!(p.inputs(p.master()).unwrap().is_empty());
}

#[test]
fn no_output_machines_tick_but_are_never_mixed() {
    let rig = Rig::new();
    let (_, seen) = rig.sink("Rec");
    let p = &rig.player;
    p.set_parameter(p.machine_by_name("Rec").unwrap(), ParamGroup::Global, 0, LEVEL, 1000).unwrap();

    let (left, _) = rig.render(64, 64);
    assert_eq!(seen.ticks(), 1);
    assert_eq!(seen.works(), 1);
    assert!(left.iter().all(|&s| s == 0.0));
}

#[test]
fn deleted_machine_leaves_nothing_behind() {
    let rig = Rig::new();
    let p = &rig.player;
    let (x, _) = rig.probe("X", 500);
    let (y, seen_y) = rig.probe("Y", 0);
    p.connect(x, y, audio()).unwrap();
    p.connect(y, p.master(), audio()).unwrap();
    p.add_pattern(y, "p", 4).unwrap();
    let track = p.add_sequence_track(x).unwrap();
    p.add_pattern(x, "p", 4).unwrap();
    p.set_sequence_event(track, 0, Some(0)).unwrap();
    p.add_midi_mapping(MidiMapping {
        machine: x,
        group: ParamGroup::Global,
        track: 0,
        column: LEVEL,
        channel: 0,
        controller: 7,
    })
    .unwrap();
    p.set_solo(Some(x)).unwrap();
    p.set_state(TransportState::Playing);
    rig.render(300, 256);

    p.delete_machine(x).unwrap();

    assert!(p.machine_name(x).is_none());
    assert!(p.machine_by_name("X").is_none());
    assert!(!p.machines().contains(&x));
    assert!(matches!(p.parameter(x, ParamGroup::Global, 0, LEVEL), Err(EngineError::MachineNotFound)));
    assert!(matches!(p.delete_machine(x), Err(EngineError::MachineNotFound)));
    assert!(p.sequence_tracks().is_empty());
    assert!(p.midi_mappings().is_empty());
    assert_eq!(p.solo(), None);
    assert!(p.inputs(y).unwrap().is_empty());
    assert!(seen_y.inputs.lock().is_empty());
    assert_eq!(p.pattern(y, 0).unwrap().layout().inputs, 0);

    let mut events = Vec::new();
    p.drain_notifications(|n| events.push(n));
    assert!(events.iter().all(|n| !n.names(x)));
    assert_eq!(events.last().unwrap().event, EngineEvent::MachineDeleted { machine: x });

    // rendering after the delete touches only live machines
    let (left, _) = rig.render(TICKS_WORTH, 256);
    assert!(left.iter().all(|&s| s == 0.0));
}

const TICKS_WORTH: usize = 5250 * 2;

#[test]
fn failed_init_registers_nothing() {
    let rig = Rig::new();
    let p = &rig.player;
    let before = p.machines();
    let err = p.create_machine(BROKEN.uri, "B", &[]).unwrap_err();
    assert!(matches!(err, EngineError::MachineInit { .. }));
    assert_eq!(p.machines(), before);
    assert!(p.notifications().is_empty());
}

#[test]
fn blacklisted_loaders_are_refused() {
    let config = EngineConfig { blacklist: vec!["@TEST/Probe".into()], ..EngineConfig::default() };
    let player = gb_engine::Player::new(&config).unwrap();
    assert!(!player.register_loader(common::ProbeLoader::new(&PROBE)));
    assert!(player.load_warnings().contains("@test/probe"));
    assert!(matches!(
        player.create_machine(PROBE.uri, "P", &[]),
        Err(EngineError::Blacklisted(_))
    ));
}

#[test]
fn loader_lookup_ignores_case() {
    let rig = Rig::new();
    assert!(rig.player.loader("@TEST/PROBE").is_some());
    assert!(rig.player.loader("@gearbox/oscillator").is_some());
    assert!(rig.player.loader("@test/none").is_none());
}

#[test]
fn removing_a_pattern_drops_its_sequence_events() {
    let rig = Rig::new();
    let p = &rig.player;
    let (x, _) = rig.probe("X", 0);
    p.add_pattern(x, "a", 4).unwrap();
    p.add_pattern(x, "b", 4).unwrap();
    let track = p.add_sequence_track(x).unwrap();
    p.set_sequence_event(track, 0, Some(0)).unwrap();
    p.set_sequence_event(track, 8, Some(1)).unwrap();

    p.remove_pattern(x, 0).unwrap();
    assert_eq!(p.pattern_count(x).unwrap(), 1);
    assert_eq!(p.pattern(x, 0).unwrap().name.as_str(), "b");
    let events = p.sequence_tracks()[0].events().to_vec();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tick, 8);
    assert_eq!(events[0].pattern, Some(0));

    assert!(matches!(p.remove_pattern(x, 4), Err(EngineError::PatternNotFound(4))));
    assert!(matches!(p.set_sequence_event(track, 1, Some(3)), Err(EngineError::PatternNotFound(3))));
    assert!(p.clear_sequence_event(track, 8).unwrap());
    assert!(!p.clear_sequence_event(track, 8).unwrap());
}

#[test]
fn midi_controller_drives_mapped_parameter() {
    let rig = Rig::new();
    let p = &rig.player;
    let (x, seen) = rig.probe("X", 0);
    let mapping = MidiMapping {
        machine: x,
        group: ParamGroup::Global,
        track: 0,
        column: LEVEL,
        channel: 2,
        controller: 74,
    };
    assert!(p.add_midi_mapping(mapping).unwrap());
    assert!(!p.add_midi_mapping(mapping).unwrap());

    p.midi_event(0xB2, 74, 127);
    assert_eq!(p.parameter(x, ParamGroup::Global, 0, LEVEL).unwrap(), 1000);
    assert_eq!(seen.controls.load(std::sync::atomic::Ordering::SeqCst), 1);

    // other channels do not reach the mapping
    p.midi_event(0xB3, 74, 0);
    assert_eq!(p.parameter(x, ParamGroup::Global, 0, LEVEL).unwrap(), 1000);

    p.midi_event(0x92, 60, 100);
    assert_eq!(seen.last_note.load(std::sync::atomic::Ordering::SeqCst), 60);

    assert!(p.remove_midi_mapping(&mapping));
    assert!(p.midi_mappings().is_empty());
}

#[test]
fn clear_returns_to_a_fresh_song() {
    let rig = Rig::new();
    let p = &rig.player;
    let (x, _) = rig.probe("X", 1000);
    p.connect(x, p.master(), audio()).unwrap();
    p.add_sequence_track(x).unwrap();
    p.set_tempo(90, 6).unwrap();
    p.set_state(TransportState::Playing);
    rig.render(1000, 256);

    p.clear().unwrap();

    assert_eq!(p.machines(), vec![p.master()]);
    assert_eq!(p.state(), TransportState::Stopped);
    assert!(p.sequence_tracks().is_empty());
    assert_eq!(p.position(), 0);
    assert_eq!(p.tempo(), (126.0, 4));
    assert_eq!(p.master_info().tick_position, 0);
    let (left, _) = rig.render(64, 64);
    assert!(left.iter().all(|&s| s == 0.0));
}

#[test]
fn config_loads_from_toml() {
    let config = EngineConfig::from_toml_str("beats_per_minute = 140\nticks_per_beat = 6\n").unwrap();
    let player = gb_engine::Player::new(&config).unwrap();
    assert_eq!(player.tempo(), (140.0, 6));
    assert!(EngineConfig::from_toml_str("sample_rate = \"fast\"").is_err());
}
