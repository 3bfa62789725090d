//! A live machine instance and its per-instance state.

use std::sync::Arc;

use gb_ir::{
    AudioBuffer, ConnectionKind, MachineId, ParamGroup, Pattern, PatternLayout, NO_VALUE,
};

use crate::connection::{Connection, OutputRef};
use crate::loader::MachineLoader;
use crate::machine::{Machine, MachineInfo, WorkMode};

/// Where a machine is in its current pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PatternCursor {
    pub pattern: u16,
    pub row: u16,
}

/// Evaluation state relative to the mixer's pass counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum EvalMark {
    #[default]
    Idle,
    InProgress(u64),
    Done(u64),
}

/// What the last evaluation of a machine looked like.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkStats {
    pub mode: WorkMode,
    /// Largest inbound audio amplitude, linear.
    pub max_input_amp: f32,
    /// Whether the machine reported output.
    pub active: bool,
}

pub struct Unit {
    pub(crate) name: String,
    pub(crate) loader: Arc<dyn MachineLoader>,
    pub(crate) info: &'static MachineInfo,
    pub(crate) machine: Box<dyn Machine>,
    pub(crate) buffer: AudioBuffer,
    pub(crate) inputs: Vec<Connection>,
    pub(crate) outputs: Vec<OutputRef>,
    pub(crate) tracks: u16,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) cursor: Option<PatternCursor>,
    pub(crate) mark: EvalMark,
    pub(crate) active: bool,
    pub(crate) stats: Option<WorkStats>,
}

impl Unit {
    pub(crate) fn new(name: String, loader: Arc<dyn MachineLoader>) -> Self {
        let machine = loader.create();
        let info = loader.info();
        Self {
            name,
            loader,
            info,
            machine,
            buffer: AudioBuffer::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            tracks: info.min_tracks,
            patterns: Vec::new(),
            cursor: None,
            mark: EvalMark::Idle,
            active: false,
            stats: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> &'static MachineInfo {
        self.info
    }

    pub fn no_output(&self) -> bool {
        self.info.no_output
    }

    pub(crate) fn input(&self, from: MachineId, kind: ConnectionKind) -> Option<usize> {
        self.inputs.iter().position(|c| c.from == from && c.kind() == kind)
    }

    /// Position of `from` among this machine's audio inputs.
    pub(crate) fn audio_input_index(&self, from: MachineId) -> Option<usize> {
        self.inputs.iter().filter(|c| c.kind() == ConnectionKind::Audio).position(|c| c.from == from)
    }

    pub(crate) fn audio_input_count(&self) -> u16 {
        self.inputs.iter().filter(|c| c.kind() == ConnectionKind::Audio).count() as u16
    }

    pub(crate) fn pattern_layout(&self) -> PatternLayout {
        PatternLayout {
            inputs: self.audio_input_count(),
            global_columns: self.info.global_params.len() as u16,
            track_columns: self.info.track_params.len() as u16,
            tracks: self.tracks,
        }
    }

    /// Set a parameter, clamped to its declared range. Returns false if
    /// the parameter does not exist or `value` is `NO_VALUE`.
    pub(crate) fn set_param(&mut self, group: ParamGroup, track: u16, column: u16, value: i32) -> bool {
        apply_param(
            &mut *self.machine,
            &mut self.inputs,
            self.info,
            self.tracks,
            group,
            track,
            column,
            value,
        )
    }

    pub(crate) fn param(&self, group: ParamGroup, track: u16, column: u16) -> Option<i32> {
        match group {
            ParamGroup::Input => {
                let wire = self.inputs.iter().filter_map(Connection::audio).nth(track as usize)?;
                match column {
                    0 => Some(wire.amp as i32),
                    1 => Some(wire.pan as i32),
                    _ => None,
                }
            }
            ParamGroup::Global => {
                self.info.param(group, column)?;
                Some(self.machine.param(group, track, column))
            }
            ParamGroup::Track if track < self.tracks => {
                self.info.param(group, column)?;
                Some(self.machine.param(group, track, column))
            }
            ParamGroup::Track => None,
        }
    }

    /// Start playing `pattern` from its first row, or stop on `None`.
    pub(crate) fn trigger(&mut self, pattern: Option<u16>) {
        self.cursor = pattern
            .filter(|&p| (p as usize) < self.patterns.len())
            .map(|pattern| PatternCursor { pattern, row: 0 });
    }

    /// Apply the current pattern row and move to the next one.
    pub(crate) fn play_row(&mut self) {
        let Unit { patterns, machine, inputs, info, tracks, cursor, .. } = self;
        let (info, tracks) = (*info, *tracks);
        let Some(at) = *cursor else { return };
        let Some(pattern) = patterns.get(at.pattern as usize) else {
            *cursor = None;
            return;
        };
        pattern.for_each_value(at.row, |group, track, column, value| {
            apply_param(&mut **machine, &mut inputs[..], info, tracks, group, track, column, value);
        });
        *cursor = (at.row + 1 < pattern.rows).then_some(PatternCursor { row: at.row + 1, ..at });
    }

    /// Reset mixer-facing state, as if freshly connected.
    pub(crate) fn reset_mixer(&mut self) {
        self.mark = EvalMark::Idle;
        self.active = false;
        self.stats = None;
        self.buffer.silence();
        for cx in &mut self.inputs {
            cx.reset();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_param(
    machine: &mut dyn Machine,
    inputs: &mut [Connection],
    info: &MachineInfo,
    tracks: u16,
    group: ParamGroup,
    track: u16,
    column: u16,
    value: i32,
) -> bool {
    if value == NO_VALUE {
        return false;
    }
    let Some(param) = info.param(group, column) else {
        return false;
    };
    let value = param.clamp(value);
    match group {
        ParamGroup::Input => {
            let Some(wire) = inputs.iter_mut().filter_map(Connection::audio_mut).nth(track as usize) else {
                return false;
            };
            if column == 0 {
                wire.amp = value as u16;
            } else {
                wire.pan = value as u16;
            }
            true
        }
        ParamGroup::Global if track == 0 => {
            machine.set_param(group, track, column, value);
            true
        }
        ParamGroup::Track if track < tracks => {
            machine.set_param(group, track, column, value);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machines::{master_loader, builtin_loaders};
    use gb_ir::{AudioWire, WireParams};
    use slotmap::SlotMap;

    fn ids() -> (MachineId, MachineId) {
        let mut map: SlotMap<MachineId, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    fn oscillator() -> Unit {
        let loader = builtin_loaders().into_iter().find(|l| l.uri() == "@gearbox/oscillator").unwrap();
        Unit::new("Osc".into(), loader)
    }

    #[test]
    fn input_params_drive_the_wire() {
        let (a, b) = ids();
        let mut unit = Unit::new("Master".into(), master_loader());
        unit.inputs.push(Connection::new(a, b, WireParams::Audio(AudioWire::default())));
        assert!(unit.set_param(ParamGroup::Input, 0, 0, 0x2000));
        assert!(unit.set_param(ParamGroup::Input, 0, 1, 0x9000));
        assert_eq!(unit.param(ParamGroup::Input, 0, 0), Some(0x2000));
        assert_eq!(unit.param(ParamGroup::Input, 0, 1), Some(0x8000));
        assert!(!unit.set_param(ParamGroup::Input, 1, 0, 1));
    }

    #[test]
    fn track_params_respect_track_count() {
        let mut unit = oscillator();
        assert_eq!(unit.tracks, 1);
        assert!(unit.set_param(ParamGroup::Track, 0, 0, 60));
        assert!(!unit.set_param(ParamGroup::Track, 1, 0, 60));
        assert!(!unit.set_param(ParamGroup::Track, 0, 0, NO_VALUE));
        assert_eq!(unit.param(ParamGroup::Track, 0, 0), Some(60));
        assert_eq!(unit.param(ParamGroup::Track, 3, 0), None);
    }

    #[test]
    fn play_row_applies_and_advances() {
        let mut unit = oscillator();
        let mut pattern = Pattern::new("p", 2, unit.pattern_layout());
        pattern.set_value(0, ParamGroup::Track, 0, 0, 64);
        pattern.set_value(1, ParamGroup::Global, 0, 1, 0x1000);
        unit.patterns.push(pattern);

        unit.trigger(Some(0));
        unit.play_row();
        assert_eq!(unit.param(ParamGroup::Track, 0, 0), Some(64));
        assert_eq!(unit.cursor, Some(PatternCursor { pattern: 0, row: 1 }));
        unit.play_row();
        assert_eq!(unit.param(ParamGroup::Global, 0, 1), Some(0x1000));
        assert_eq!(unit.cursor, None);
    }

    #[test]
    fn trigger_ignores_missing_patterns() {
        let mut unit = oscillator();
        unit.trigger(Some(3));
        assert_eq!(unit.cursor, None);
    }

    #[test]
    fn reset_mixer_clears_evaluation_state() {
        let mut unit = oscillator();
        unit.mark = EvalMark::Done(4);
        unit.active = true;
        unit.buffer.channel_mut(0)[0] = 1.0;
        unit.reset_mixer();
        assert_eq!(unit.mark, EvalMark::Idle);
        assert!(!unit.active);
        assert!(unit.buffer.is_silent(unit.buffer.capacity()));
    }
}
