//! Song position and row-end resolution.
//!
//! The current pattern is never stored: it is always looked up from
//! `(order, module.orders)` so a jump can never leave it stale.

use tp_ir::{Module, Pattern};

/// Navigation requested by effects during a row, resolved at row end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlowFlags {
    /// Pending jump to this order
    pub order_jump: Option<u8>,
    /// Pending break to this row of the next pattern
    pub break_row: Option<u8>,
    /// Pending jump back to this row (pattern loop)
    pub row_jump: Option<u16>,
    /// Pattern delay counter (0 = none)
    pub pattern_delay: u8,
}

/// Outcome of resolving the end of a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowEnd {
    /// Moved to the next row (or held it)
    Advanced,
    /// Ran off the end of the song and wrapped to the restart position
    SongLooped,
    /// No pattern can be found for the new position
    Unresolvable,
}

/// Song position: order, row and tick, plus pending navigation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sequencer {
    pub order: usize,
    pub row: u16,
    pub tick: u32,
    /// The current row is being repeated by a pattern delay
    pub row_held: bool,
    pub flow: FlowFlags,
    /// Stay in the current pattern instead of advancing orders
    pub pattern_loop: bool,
}

impl Sequencer {
    /// Pattern at the current order.
    pub fn pattern<'a>(&self, module: &'a Module) -> Option<&'a Pattern> {
        module.pattern_at(self.order)
    }

    /// Move to the first row of the first playable order.
    pub fn rewind(&mut self, module: &Module) {
        self.order = module.next_playable_order(0).unwrap_or(0);
        self.row = 0;
        self.tick = 0;
        self.row_held = false;
        self.flow = FlowFlags::default();
    }

    /// Move to row 0 of `order` and drop pending navigation.
    pub fn jump_to_order(&mut self, order: usize) {
        self.order = order;
        self.row = 0;
        self.tick = 0;
        self.row_held = false;
        self.flow = FlowFlags::default();
    }

    /// Order playback continues from after the song ends.
    pub fn restart_order(module: &Module) -> usize {
        module
            .next_playable_order(module.restart_position)
            .or_else(|| module.next_playable_order(0))
            .unwrap_or(0)
    }

    /// Order following `order`, or the restart order at the end of the song.
    fn following_order(module: &Module, order: usize) -> Option<usize> {
        module.next_playable_order(order + 1)
    }

    /// Resolve pending navigation and advance to the next row.
    ///
    /// Precedence: an order jump beats a pattern break for the order (the
    /// break still picks the row), a break beats the natural end of rows,
    /// and a pattern delay holds the row before anything else is applied.
    pub fn end_row(&mut self, module: &Module) -> RowEnd {
        self.tick = 0;

        if self.flow.pattern_delay >= 2 {
            self.flow.pattern_delay -= 1;
            self.row_held = true;
            return RowEnd::Advanced;
        }
        self.row_held = false;

        let mut row = self.row as i32;
        let mut wrapped_song = false;

        if let Some(jump) = self.flow.order_jump {
            if !self.pattern_loop {
                let last = module.song_length().saturating_sub(1);
                self.order = (jump as usize).min(last);
                row = -1;
            }
        }

        if let Some(target) = self.flow.break_row {
            row = target as i32 - 1;
            if !self.pattern_loop && self.flow.order_jump.is_none() {
                // a break out of the last order continues at the restart
                // position without ending the song
                self.order = Self::following_order(module, self.order)
                    .unwrap_or_else(|| Self::restart_order(module));
            }
        }

        if let Some(target) = self.flow.row_jump.take() {
            row = target as i32 - 1;
        }

        self.flow.order_jump = None;
        self.flow.break_row = None;
        self.flow.pattern_delay = 0;
        row += 1;

        let Some(pattern) = self.pattern(module) else {
            return RowEnd::Unresolvable;
        };

        if row < 0 || row >= pattern.rows as i32 {
            row = 0;
            if !self.pattern_loop {
                match Self::following_order(module, self.order) {
                    Some(next) => self.order = next,
                    None => {
                        self.order = Self::restart_order(module);
                        wrapped_song = true;
                    }
                }
                if self.pattern(module).is_none() {
                    return RowEnd::Unresolvable;
                }
            }
        }
        self.row = row as u16;

        if wrapped_song {
            RowEnd::SongLooped
        } else {
            RowEnd::Advanced
        }
    }
}
