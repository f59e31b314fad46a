// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{TextConsole, COLUMNS, MAP_WIDTH, ROWS};
use crate::Bus;
use core::fmt;

const ESC: char = '\x1b';
const TAB_WIDTH: u16 = 4;

/// ANSI escape parser state, kept on the console so sequences may span
/// several `write_str` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) enum Escape {
    #[default]
    Ground,
    Esc,
    Csi {
        params: [u16; 2],
        count: usize,
    },
}

/// Streaming text output at the console cursor.
///
/// Understands `\n`, `\r`, `\t`, `ESC[<row>;<col>H` (also `f`) and `ESC[2J`.
/// Cursor rows and columns in escape sequences are 0-based, as on the
/// platform's stock console. Output wraps at the right edge and scrolls at
/// the bottom.
pub struct ConsoleWriter<'a> {
    console: &'a mut TextConsole,
    bus: &'a mut dyn Bus,
}

impl<'a> ConsoleWriter<'a> {
    pub(super) fn new(console: &'a mut TextConsole, bus: &'a mut dyn Bus) -> Self {
        Self { console, bus }
    }

    fn feed(&mut self, c: char) {
        let state = self.console.escape;
        match state {
            Escape::Ground => match c {
                ESC => self.console.escape = Escape::Esc,
                '\n' => self.newline(),
                '\r' => self.console.column = 0,
                '\t' => {
                    let next = (self.console.column / TAB_WIDTH + 1) * TAB_WIDTH;
                    while self.console.column < next.min(COLUMNS) {
                        self.print(' ');
                    }
                }
                c => self.print(c),
            },
            Escape::Esc => {
                self.console.escape = if c == '[' {
                    Escape::Csi {
                        params: [0; 2],
                        count: 0,
                    }
                } else {
                    Escape::Ground
                };
            }
            Escape::Csi { mut params, mut count } => {
                if let Some(digit) = c.to_digit(10) {
                    let slot = &mut params[count];
                    *slot = slot.saturating_mul(10).saturating_add(digit as u16);
                    self.console.escape = Escape::Csi { params, count };
                } else if c == ';' {
                    count = (count + 1).min(params.len() - 1);
                    self.console.escape = Escape::Csi { params, count };
                } else {
                    // Any other character terminates the sequence
                    self.console.escape = Escape::Ground;
                    self.dispatch(c, params);
                }
            }
        }
    }

    fn dispatch(&mut self, command: char, params: [u16; 2]) {
        match command {
            'H' | 'f' => {
                self.console.row = params[0].min(ROWS - 1);
                self.console.column = params[1].min(COLUMNS - 1);
            }
            'J' if params[0] == 2 => {
                self.console.clear_map(self.bus);
                self.console.row = 0;
                self.console.column = 0;
            }
            _ => {}
        }
    }

    fn print(&mut self, c: char) {
        if self.console.column >= COLUMNS {
            self.newline();
        }
        let cell = self.console.row as u32 * MAP_WIDTH as u32 + self.console.column as u32;
        self.console.put_cell(self.bus, cell, c);
        self.console.column += 1;
    }

    fn newline(&mut self) {
        self.console.column = 0;
        if self.console.row + 1 >= ROWS {
            self.console.scroll_up(self.bus);
            self.console.row = ROWS - 1;
        } else {
            self.console.row += 1;
        }
    }
}

impl fmt::Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            self.feed(c);
        }
        Ok(())
    }
}
