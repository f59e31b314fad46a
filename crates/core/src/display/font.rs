// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! 8x8 ASCII font, stored as 4bpp tiles.
//!
//! Tile `n` holds the glyph for character `0x20 + n`, so tile 0 is the
//! (blank) space and a zeroed screen map reads as an empty screen.

use crate::regs::TILE_4BPP_SIZE;
use crate::Bus;
use font8x8::legacy::BASIC_LEGACY;

pub const FIRST_CHAR: u8 = 0x20;
pub const LAST_CHAR: u8 = 0x7E;
pub const GLYPH_COUNT: u16 = (LAST_CHAR - FIRST_CHAR + 1) as u16;
/// Drawn in place of characters the font does not cover.
pub const FALLBACK_CHAR: char = '?';

pub fn is_printable(c: char) -> bool {
    (FIRST_CHAR as char..=LAST_CHAR as char).contains(&c)
}

/// Row bitmaps of `c`, bit 0 being the leftmost pixel.
pub fn glyph(c: char) -> [u8; 8] {
    let c = if is_printable(c) { c } else { FALLBACK_CHAR };
    BASIC_LEGACY[c as usize]
}

pub fn tile_index(c: char) -> u16 {
    let c = if is_printable(c) { c } else { FALLBACK_CHAR };
    c as u16 - FIRST_CHAR as u16
}

pub fn char_for_tile(index: u16) -> Option<char> {
    if index < GLYPH_COUNT {
        Some((FIRST_CHAR + index as u8) as char)
    } else {
        None
    }
}

/// Expand one glyph row into a 4bpp tile row. Pixel `x` lands in nibble `x`.
pub fn expand_row(bits: u8, color: u8) -> u32 {
    let mut word = 0u32;
    for x in 0..8 {
        if bits & (1 << x) != 0 {
            word |= ((color & 0xF) as u32) << (x * 4);
        }
    }
    word
}

/// Write every glyph as a tile starting at `char_base`, drawing set pixels
/// with palette entry `color` of the tile's bank.
pub fn upload(bus: &mut dyn Bus, char_base: u32, color: u8) {
    for index in 0..GLYPH_COUNT {
        let c = (FIRST_CHAR + index as u8) as char;
        let tile = char_base + index as u32 * TILE_4BPP_SIZE;
        for (row, bits) in glyph(c).iter().enumerate() {
            // VRAM ignores byte writes, so rows go out as whole words
            bus.write_u32(tile + row as u32 * 4, expand_row(*bits, color));
        }
    }
}
