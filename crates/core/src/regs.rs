// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! GBA register map and register bit layouts used by the bring-up sequence.

use bitflags::bitflags;

pub const DISPCNT: u32 = 0x0400_0000;
pub const DISPSTAT: u32 = 0x0400_0004;
pub const VCOUNT: u32 = 0x0400_0006;
pub const BG0CNT: u32 = 0x0400_0008;
pub const BG0HOFS: u32 = 0x0400_0010;
pub const BG0VOFS: u32 = 0x0400_0012;

pub const IE: u32 = 0x0400_0200;
/// Interrupt request flags. Writing 1 to a bit acknowledges it.
pub const IF: u32 = 0x0400_0202;
pub const IME: u32 = 0x0400_0208;

/// Interrupt check word the BIOS wait routines poll, at the top of IWRAM.
pub const INTR_CHECK: u32 = 0x0300_7FF8;

pub const IWRAM_BASE: u32 = 0x0300_0000;
pub const IWRAM_SIZE: u32 = 0x8000;
pub const PALETTE_BASE: u32 = 0x0500_0000;
pub const PALETTE_SIZE: u32 = 0x400;
pub const VRAM_BASE: u32 = 0x0600_0000;
pub const VRAM_SIZE: u32 = 0x1_8000;

/// Size of one character (tile set) block in VRAM.
pub const CHAR_BLOCK_SIZE: u32 = 0x4000;
/// Size of one screen (map) block in VRAM.
pub const SCREEN_BLOCK_SIZE: u32 = 0x800;
/// Bytes per 8x8 tile at 4 bits per pixel.
pub const TILE_4BPP_SIZE: u32 = 32;

pub const SCREEN_WIDTH: u32 = 240;
pub const SCREEN_HEIGHT: u32 = 160;
pub const SCANLINES_PER_FRAME: u16 = 228;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DisplayControl: u16 {
        const FORCED_BLANK = 0x0080;
        const BG0 = 0x0100;
        const BG1 = 0x0200;
        const BG2 = 0x0400;
        const BG3 = 0x0800;
        const OBJ = 0x1000;
    }
}

impl DisplayControl {
    pub const MODE_MASK: u16 = 0x0007;

    /// Video mode number in bits 0-2.
    pub fn mode(self) -> u16 {
        self.bits() & Self::MODE_MASK
    }

    pub fn with_mode(self, mode: u16) -> Self {
        Self::from_bits_retain((self.bits() & !Self::MODE_MASK) | (mode & Self::MODE_MASK))
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DisplayStatus: u16 {
        const IN_VBLANK = 0x0001;
        const IN_HBLANK = 0x0002;
        const VCOUNT_MATCH = 0x0004;
        const VBLANK_IRQ = 0x0008;
        const HBLANK_IRQ = 0x0010;
        const VCOUNT_IRQ = 0x0020;
    }
}

impl DisplayStatus {
    /// Read-only status bits maintained by the LCD.
    pub const STATUS_MASK: u16 = 0x0007;
    pub const IRQ_MASK: u16 = 0x0038;

    /// Bits 8-15: scanline that triggers the vcount match.
    pub fn vcount_setting(self) -> u16 {
        self.bits() >> 8
    }
}

/// Background control register layout (BGxCNT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BgControl {
    pub priority: u16,
    pub char_block: u16,
    pub screen_block: u16,
}

impl BgControl {
    pub fn to_bits(self) -> u16 {
        // 4bpp, no mosaic, 256x256 map: all zero
        (self.priority & 0x3) | ((self.char_block & 0x3) << 2) | ((self.screen_block & 0x1F) << 8)
    }

    pub fn from_bits(bits: u16) -> Self {
        Self {
            priority: bits & 0x3,
            char_block: (bits >> 2) & 0x3,
            screen_block: (bits >> 8) & 0x1F,
        }
    }

    pub fn char_base(self) -> u32 {
        VRAM_BASE + self.char_block as u32 * CHAR_BLOCK_SIZE
    }

    pub fn screen_base(self) -> u32 {
        VRAM_BASE + self.screen_block as u32 * SCREEN_BLOCK_SIZE
    }
}

/// Pack an 8-bit-per-channel colour into the 15-bit BGR palette format.
pub const fn rgb8(r: u8, g: u8, b: u8) -> u16 {
    ((r >> 3) as u16) | (((g >> 3) as u16) << 5) | (((b >> 3) as u16) << 10)
}
