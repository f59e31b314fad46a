// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use gbajam_core::display::{font, COLUMNS, MAP_WIDTH, ROWS};
use gbajam_core::regs::{self, BgControl, DisplayControl, TILE_4BPP_SIZE};
use gbajam_core::Bus;
use std::collections::HashMap;
use std::fmt;

/// Shown for cells whose tile matches no glyph of the font.
pub const UNKNOWN_GLYPH: char = char::REPLACEMENT_CHARACTER;

/// The visible text grid of background 0, recovered from VRAM.
///
/// Each cell's tile is decoded back to an 8x8 bitmap and matched against the
/// font, so the screen reflects what the hardware would actually draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextScreen {
    rows: Vec<Vec<char>>,
}

impl TextScreen {
    pub fn capture(bus: &dyn Bus) -> Self {
        let blank = vec![vec![' '; COLUMNS as usize]; ROWS as usize];
        let dispcnt = DisplayControl::from_bits_retain(bus.read_u16(regs::DISPCNT));
        if dispcnt.mode() != 0
            || !dispcnt.contains(DisplayControl::BG0)
            || dispcnt.contains(DisplayControl::FORCED_BLANK)
        {
            return Self { rows: blank };
        }

        let bg = BgControl::from_bits(bus.read_u16(regs::BG0CNT));
        let glyphs = glyph_table();
        let mut rows = blank;
        for (row, cells) in rows.iter_mut().enumerate() {
            for (column, cell) in cells.iter_mut().enumerate() {
                let index = row as u32 * MAP_WIDTH as u32 + column as u32;
                let entry = bus.read_u16(bg.screen_base() + index * 2);
                let bitmap = decode_tile(bus, bg.char_base(), entry & 0x3FF);
                *cell = glyphs.get(&bitmap).copied().unwrap_or(UNKNOWN_GLYPH);
            }
        }
        Self { rows }
    }

    pub fn cell(&self, row: usize, column: usize) -> char {
        self.rows[row][column]
    }

    pub fn row(&self, row: usize) -> String {
        self.rows[row].iter().collect()
    }

    pub fn text_at(&self, row: usize, column: usize, len: usize) -> String {
        self.rows[row][column..column + len].iter().collect()
    }

    pub fn lines(&self) -> Vec<String> {
        (0..self.rows.len()).map(|row| self.row(row)).collect()
    }

    /// Cells that are not blank, as `(row, column, char)`.
    pub fn non_blank(&self) -> Vec<(usize, usize, char)> {
        let mut cells = Vec::new();
        for (row, line) in self.rows.iter().enumerate() {
            for (column, c) in line.iter().enumerate() {
                if *c != ' ' {
                    cells.push((row, column, *c));
                }
            }
        }
        cells
    }
}

impl fmt::Display for TextScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

/// Decode a 4bpp tile to row bitmaps, bit 0 being the leftmost pixel. Any
/// non-zero colour counts as a set pixel.
pub fn decode_tile(bus: &dyn Bus, char_base: u32, tile: u16) -> [u8; 8] {
    let mut bitmap = [0u8; 8];
    let addr = char_base + tile as u32 * TILE_4BPP_SIZE;
    for (row, bits) in bitmap.iter_mut().enumerate() {
        let word = bus.read_u32(addr + row as u32 * 4);
        for x in 0..8 {
            if (word >> (x * 4)) & 0xF != 0 {
                *bits |= 1 << x;
            }
        }
    }
    bitmap
}

fn glyph_table() -> HashMap<[u8; 8], char> {
    let mut table = HashMap::new();
    for c in (font::FIRST_CHAR..=font::LAST_CHAR).map(char::from) {
        table.entry(font::glyph(c)).or_insert(c);
    }
    table
}
