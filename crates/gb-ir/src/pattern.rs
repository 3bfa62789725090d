//! Per-machine pattern grids of parameter values.

use alloc::vec::Vec;
use arrayvec::ArrayString;

/// Cell value meaning "leave the parameter untouched".
pub const NO_VALUE: i32 = i32::MIN;

/// Columns per input-connection track: amplitude, pan.
pub const INPUT_COLUMNS: u16 = 2;

/// Which block of a pattern row a column belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamGroup {
    /// Inbound audio connections (one track per input: amp, pan).
    Input,
    /// Machine-wide parameters.
    Global,
    /// Per-track parameters.
    Track,
}

impl ParamGroup {
    pub const fn index(self) -> u8 {
        match self {
            ParamGroup::Input => 0,
            ParamGroup::Global => 1,
            ParamGroup::Track => 2,
        }
    }

    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(ParamGroup::Input),
            1 => Some(ParamGroup::Global),
            2 => Some(ParamGroup::Track),
            _ => None,
        }
    }
}

/// Shape of a pattern row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternLayout {
    /// Number of input-connection tracks.
    pub inputs: u16,
    /// Global parameter columns.
    pub global_columns: u16,
    /// Columns in each track.
    pub track_columns: u16,
    /// Number of tracks.
    pub tracks: u16,
}

impl PatternLayout {
    /// Total columns in one row.
    pub fn row_width(&self) -> usize {
        self.inputs as usize * INPUT_COLUMNS as usize
            + self.global_columns as usize
            + self.tracks as usize * self.track_columns as usize
    }

    /// Offset of a column within a row, if it exists.
    pub fn column_offset(&self, group: ParamGroup, track: u16, column: u16) -> Option<usize> {
        let inputs_width = self.inputs as usize * INPUT_COLUMNS as usize;
        match group {
            ParamGroup::Input if track < self.inputs && column < INPUT_COLUMNS => {
                Some(track as usize * INPUT_COLUMNS as usize + column as usize)
            }
            ParamGroup::Global if track == 0 && column < self.global_columns => {
                Some(inputs_width + column as usize)
            }
            ParamGroup::Track if track < self.tracks && column < self.track_columns => Some(
                inputs_width
                    + self.global_columns as usize
                    + track as usize * self.track_columns as usize
                    + column as usize,
            ),
            _ => None,
        }
    }

    /// Map a row offset back to (group, track, column).
    pub fn locate(&self, offset: usize) -> Option<(ParamGroup, u16, u16)> {
        let inputs_width = self.inputs as usize * INPUT_COLUMNS as usize;
        if offset < inputs_width {
            let cols = INPUT_COLUMNS as usize;
            return Some((ParamGroup::Input, (offset / cols) as u16, (offset % cols) as u16));
        }
        let offset = offset - inputs_width;
        if offset < self.global_columns as usize {
            return Some((ParamGroup::Global, 0, offset as u16));
        }
        let offset = offset - self.global_columns as usize;
        let cols = self.track_columns as usize;
        if cols == 0 || offset >= self.tracks as usize * cols {
            return None;
        }
        Some((ParamGroup::Track, (offset / cols) as u16, (offset % cols) as u16))
    }
}

/// A grid of parameter values for one machine, `rows` long.
///
/// Stored row-major: `data[row * row_width + column_offset]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    pub name: ArrayString<32>,
    pub rows: u16,
    layout: PatternLayout,
    data: Vec<i32>,
}

impl Pattern {
    /// Create a pattern with every cell empty.
    pub fn new(name: &str, rows: u16, layout: PatternLayout) -> Self {
        let mut pattern_name = ArrayString::new();
        let _ = pattern_name.try_push_str(name);
        Self {
            name: pattern_name,
            rows,
            layout,
            data: alloc::vec![NO_VALUE; rows as usize * layout.row_width()],
        }
    }

    pub fn layout(&self) -> PatternLayout {
        self.layout
    }

    /// Read one cell. Out-of-range cells read as `NO_VALUE`.
    pub fn value(&self, row: u16, group: ParamGroup, track: u16, column: u16) -> i32 {
        if row >= self.rows {
            return NO_VALUE;
        }
        self.layout
            .column_offset(group, track, column)
            .map(|c| self.data[row as usize * self.layout.row_width() + c])
            .unwrap_or(NO_VALUE)
    }

    /// Write one cell. Returns false if the cell does not exist.
    pub fn set_value(&mut self, row: u16, group: ParamGroup, track: u16, column: u16, value: i32) -> bool {
        if row >= self.rows {
            return false;
        }
        let width = self.layout.row_width();
        match self.layout.column_offset(group, track, column) {
            Some(c) => {
                self.data[row as usize * width + c] = value;
                true
            }
            None => false,
        }
    }

    /// Raw cells of one row.
    pub fn row(&self, row: u16) -> &[i32] {
        let width = self.layout.row_width();
        let start = row as usize * width;
        &self.data[start..start + width]
    }

    /// Visit every non-empty cell of a row in column order.
    pub fn for_each_value(&self, row: u16, mut f: impl FnMut(ParamGroup, u16, u16, i32)) {
        if row >= self.rows {
            return;
        }
        for (offset, &value) in self.row(row).iter().enumerate() {
            if value == NO_VALUE {
                continue;
            }
            if let Some((group, track, column)) = self.layout.locate(offset) {
                f(group, track, column, value);
            }
        }
    }

    /// Copy of this pattern reshaped to `layout`, keeping every cell that
    /// still has a home.
    pub fn reshaped(&self, layout: PatternLayout) -> Pattern {
        let mut out = Pattern::new(&self.name, self.rows, layout);
        for row in 0..self.rows {
            self.for_each_value(row, |group, track, column, value| {
                out.set_value(row, group, track, column, value);
            });
        }
        out
    }

    /// Copy with `tracks` tracks.
    pub fn with_tracks(&self, tracks: u16) -> Pattern {
        self.reshaped(PatternLayout { tracks, ..self.layout })
    }

    /// Copy with one more (empty) input track appended.
    pub fn with_input_added(&self) -> Pattern {
        self.reshaped(PatternLayout { inputs: self.layout.inputs + 1, ..self.layout })
    }

    /// Copy with input track `index` removed; later inputs shift down.
    pub fn with_input_removed(&self, index: u16) -> Pattern {
        let layout = PatternLayout { inputs: self.layout.inputs.saturating_sub(1), ..self.layout };
        let mut out = Pattern::new(&self.name, self.rows, layout);
        for row in 0..self.rows {
            self.for_each_value(row, |group, track, column, value| {
                let track = match group {
                    ParamGroup::Input if track == index => return,
                    ParamGroup::Input if track > index => track - 1,
                    _ => track,
                };
                out.set_value(row, group, track, column, value);
            });
        }
        out
    }
}
