// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod font;
mod writer;

pub use writer::ConsoleWriter;

use crate::interrupt::InterruptController;
use crate::regs::{self, rgb8, BgControl, DisplayControl, SCREEN_BLOCK_SIZE, TILE_4BPP_SIZE};
use crate::Bus;
use log::debug;

/// Visible text columns (240 px / 8).
pub const COLUMNS: u16 = 30;
/// Visible text rows (160 px / 8).
pub const ROWS: u16 = 20;
/// Entries per row of a 256x256 screen map.
pub const MAP_WIDTH: u16 = 32;
pub const MAP_HEIGHT: u16 = 32;

/// Palette entry (within the console's bank) the font is drawn with.
const FONT_COLOR_INDEX: u8 = 1;

/// Placement and colours of the text console.
///
/// The screen block must not share VRAM with the font tiles at the start of
/// the char block. With char block 0 that rules out screen blocks 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Character block (0-3) holding the font tiles.
    pub char_block: u16,
    /// Screen block (0-31) holding the map.
    pub screen_block: u16,
    /// 16-colour palette bank used for text.
    pub palette_bank: u16,
    pub backdrop: u16,
    pub foreground: u16,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            char_block: 0,
            screen_block: 4,
            palette_bank: 15,
            backdrop: rgb8(58, 110, 165),
            foreground: rgb8(255, 255, 255),
        }
    }
}

impl ConsoleConfig {
    pub fn bg_control(&self) -> BgControl {
        BgControl {
            priority: 0,
            char_block: self.char_block,
            screen_block: self.screen_block,
        }
    }

    /// Whether the screen map would land on top of the font tiles.
    pub fn map_overlaps_font(&self) -> bool {
        let bg = self.bg_control();
        let font_start = bg.char_base();
        let font_end = font_start + font::GLYPH_COUNT as u32 * TILE_4BPP_SIZE;
        let map_start = bg.screen_base();
        let map_end = map_start + SCREEN_BLOCK_SIZE;
        map_start < font_end && font_start < map_end
    }
}

/// Text console on background 0 in tiled mode 0.
#[derive(Debug)]
pub struct TextConsole {
    config: ConsoleConfig,
    map_base: u32,
    row: u16,
    column: u16,
    escape: writer::Escape,
}

impl TextConsole {
    /// Configure the display for text output with the default font and
    /// palette. The surface starts blank.
    pub fn initialize_text_mode<B: Bus>(hw: &mut B, irq: &InterruptController) -> Self {
        Self::initialize_with(hw, irq, ConsoleConfig::default())
    }

    pub fn initialize_with<B: Bus>(
        hw: &mut B,
        _irq: &InterruptController,
        config: ConsoleConfig,
    ) -> Self {
        debug_assert!(
            !config.map_overlaps_font(),
            "screen block {} overlaps the font in char block {}",
            config.screen_block,
            config.char_block
        );
        let bg = config.bg_control();

        font::upload(hw, bg.char_base(), FONT_COLOR_INDEX);

        let console = Self {
            config,
            map_base: bg.screen_base(),
            row: 0,
            column: 0,
            escape: writer::Escape::default(),
        };
        console.clear_map(hw);

        hw.write_u16(regs::PALETTE_BASE, config.backdrop);
        let font_entry = (config.palette_bank & 0xF) * 16 + FONT_COLOR_INDEX as u16;
        hw.write_u16(regs::PALETTE_BASE + font_entry as u32 * 2, config.foreground);

        hw.write_u16(regs::BG0CNT, bg.to_bits());
        hw.write_u16(regs::BG0HOFS, 0);
        hw.write_u16(regs::BG0VOFS, 0);
        hw.write_u16(regs::DISPCNT, DisplayControl::BG0.with_mode(0).bits());

        debug!(
            "text console ready: char block {}, screen block {}",
            config.char_block, config.screen_block
        );
        console
    }

    /// Current cursor position as `(row, column)`.
    pub fn cursor(&self) -> (u16, u16) {
        (self.row, self.column)
    }

    pub fn set_cursor(&mut self, row: u16, column: u16) {
        self.row = row;
        self.column = column;
    }

    /// Place `text` starting at `(row, column)`, overwriting those cells.
    ///
    /// Characters go into consecutive map entries. Nothing wraps and nothing
    /// is bounds-checked: keeping `column + text.len()` within the row is up
    /// to the caller.
    pub fn write_at<B: Bus>(&mut self, hw: &mut B, row: u16, column: u16, text: &str) {
        let mut cell = row as u32 * MAP_WIDTH as u32 + column as u32;
        for c in text.chars() {
            self.put_cell(hw, cell, c);
            cell = cell.wrapping_add(1);
        }
        self.row = row;
        self.column = column.wrapping_add(text.chars().count() as u16);
    }

    /// Borrow the console as a `core::fmt::Write` stream at the cursor.
    pub fn writer<'a, B: Bus>(&'a mut self, hw: &'a mut B) -> ConsoleWriter<'a> {
        ConsoleWriter::new(self, hw)
    }

    /// Blank every cell and move the cursor home.
    pub fn clear<B: Bus>(&mut self, hw: &mut B) {
        self.clear_map(hw);
        self.row = 0;
        self.column = 0;
    }

    /// Screen map entry for `c`: tile number plus palette bank.
    pub fn map_entry(&self, c: char) -> u16 {
        font::tile_index(c) | ((self.config.palette_bank & 0xF) << 12)
    }

    fn clear_map(&self, hw: &mut dyn Bus) {
        for cell in 0..(MAP_WIDTH as u32 * MAP_HEIGHT as u32) {
            hw.write_u16(self.map_base + cell * 2, 0);
        }
    }

    fn put_cell(&self, hw: &mut dyn Bus, cell: u32, c: char) {
        hw.write_u16(self.map_base + cell * 2, self.map_entry(c));
    }

    fn scroll_up(&self, hw: &mut dyn Bus) {
        for row in 1..ROWS as u32 {
            for column in 0..MAP_WIDTH as u32 {
                let src = self.map_base + (row * MAP_WIDTH as u32 + column) * 2;
                let entry = hw.read_u16(src);
                hw.write_u16(src - MAP_WIDTH as u32 * 2, entry);
            }
        }
        let last = (ROWS as u32 - 1) * MAP_WIDTH as u32;
        for column in 0..MAP_WIDTH as u32 {
            hw.write_u16(self.map_base + (last + column) * 2, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHardware;

    fn console(hw: &mut MockHardware) -> TextConsole {
        let irq = InterruptController::initialize(hw);
        TextConsole::initialize_text_mode(hw, &irq)
    }

    fn cell(hw: &MockHardware, row: u32, column: u32) -> u16 {
        hw.read_u16(0x0600_2000 + (row * MAP_WIDTH as u32 + column) * 2)
    }

    #[test]
    fn test_initialize_text_mode_registers() {
        let mut hw = MockHardware::new();
        let _console = console(&mut hw);

        assert_eq!(hw.read_u16(regs::DISPCNT), 0x0100);
        assert_eq!(hw.read_u16(regs::BG0CNT), 0x0400);
        assert_eq!(hw.read_u16(regs::BG0HOFS), 0);
        assert_eq!(hw.read_u16(regs::PALETTE_BASE), rgb8(58, 110, 165));
        assert_eq!(hw.read_u16(regs::PALETTE_BASE + 241 * 2), 0x7FFF);
    }

    #[test]
    fn test_initialize_blanks_the_map() {
        let mut hw = MockHardware::new();
        for cell in 0..1024u32 {
            hw.write_u16(0x0600_2000 + cell * 2, 0xFFFF);
        }
        let _console = console(&mut hw);
        for cell in 0..1024u32 {
            assert_eq!(hw.read_u16(0x0600_2000 + cell * 2), 0);
        }
    }

    #[test]
    fn test_write_at_places_entries() {
        let mut hw = MockHardware::new();
        let mut console = console(&mut hw);
        hw.clear_log();

        console.write_at(&mut hw, 10, 10, "Hi!");

        assert_eq!(cell(&hw, 10, 10), 0xF000 | font::tile_index('H'));
        assert_eq!(cell(&hw, 10, 11), 0xF000 | font::tile_index('i'));
        assert_eq!(cell(&hw, 10, 12), 0xF000 | font::tile_index('!'));
        assert_eq!(hw.writes().len(), 3);
        assert_eq!(console.cursor(), (10, 13));
    }

    #[test]
    fn test_write_at_with_custom_config() {
        let mut hw = MockHardware::new();
        let irq = InterruptController::initialize(&mut hw);
        let config = ConsoleConfig {
            char_block: 1,
            screen_block: 30,
            palette_bank: 2,
            ..ConsoleConfig::default()
        };
        let mut console = TextConsole::initialize_with(&mut hw, &irq, config);
        console.write_at(&mut hw, 0, 0, "A");

        assert_eq!(hw.read_u16(regs::BG0CNT), (30 << 8) | (1 << 2));
        assert_eq!(hw.read_u16(0x0600_F000), 0x2000 | font::tile_index('A'));
        assert_eq!(hw.read_u16(regs::PALETTE_BASE + 33 * 2), 0x7FFF);
    }

    #[test]
    fn test_map_overlap_with_font() {
        assert!(!ConsoleConfig::default().map_overlaps_font());
        let at = |char_block, screen_block| ConsoleConfig {
            char_block,
            screen_block,
            ..ConsoleConfig::default()
        };
        assert!(at(0, 0).map_overlaps_font());
        assert!(at(0, 1).map_overlaps_font());
        assert!(!at(0, 2).map_overlaps_font());
        // Char block 1 starts at screen block 8
        assert!(at(1, 8).map_overlaps_font());
        assert!(!at(1, 7).map_overlaps_font());
    }

    #[test]
    #[should_panic(expected = "overlaps the font")]
    fn test_initialize_rejects_map_over_font() {
        let mut hw = MockHardware::new();
        let irq = InterruptController::initialize(&mut hw);
        let config = ConsoleConfig {
            char_block: 0,
            screen_block: 0,
            ..ConsoleConfig::default()
        };
        TextConsole::initialize_with(&mut hw, &irq, config);
    }

    #[test]
    fn test_clear_homes_cursor() {
        let mut hw = MockHardware::new();
        let mut console = console(&mut hw);
        console.write_at(&mut hw, 3, 4, "xyz");
        console.clear(&mut hw);
        assert_eq!(console.cursor(), (0, 0));
        assert_eq!(cell(&hw, 3, 4), 0);
    }
}
