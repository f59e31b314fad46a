// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use gbajam_core::regs::{DisplayStatus, SCANLINES_PER_FRAME, SCREEN_HEIGHT};
use gbajam_core::IrqFlags;
use serde::Serialize;

/// First scanline of the vertical blank period.
pub const VBLANK_START: u16 = SCREEN_HEIGHT as u16;
/// The vblank status flag drops on the last line of the frame.
const VBLANK_FLAG_END: u16 = SCANLINES_PER_FRAME - 1;

/// Outcome of advancing the LCD by one scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcdTick {
    pub requests: IrqFlags,
    pub vblank_started: bool,
}

/// LCD controller: display control/status, scanline counter and the BG0
/// registers. Timing is modelled per scanline.
///
/// Offsets are relative to `0x0400_0000`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Lcd {
    dispcnt: u16,
    dispstat: u16,
    vcount: u16,
    bg0cnt: u16,
    bg0hofs: u16,
    bg0vofs: u16,
}

impl Lcd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, offset: u32) -> u16 {
        match offset {
            0x00 => self.dispcnt,
            0x04 => self.dispstat,
            0x06 => self.vcount,
            0x08 => self.bg0cnt,
            0x10 => self.bg0hofs,
            0x12 => self.bg0vofs,
            _ => 0,
        }
    }

    pub fn write(&mut self, offset: u32, value: u16) {
        match offset {
            0x00 => self.dispcnt = value,
            0x04 => {
                // Status bits are read-only
                self.dispstat = (self.dispstat & DisplayStatus::STATUS_MASK)
                    | (value & !DisplayStatus::STATUS_MASK);
            }
            0x08 => self.bg0cnt = value,
            0x10 => self.bg0hofs = value & 0x1FF,
            0x12 => self.bg0vofs = value & 0x1FF,
            _ => {}
        }
    }

    pub fn vcount(&self) -> u16 {
        self.vcount
    }

    pub fn status(&self) -> DisplayStatus {
        DisplayStatus::from_bits_retain(self.dispstat)
    }

    /// Advance to the next scanline, raising whichever LCD interrupt
    /// requests DISPSTAT enables.
    pub fn tick(&mut self) -> LcdTick {
        let mut status = self.status();
        let mut requests = IrqFlags::empty();

        // HBlank happens at the end of every line, visible or not
        if status.contains(DisplayStatus::HBLANK_IRQ) {
            requests |= IrqFlags::HBLANK;
        }

        self.vcount = (self.vcount + 1) % SCANLINES_PER_FRAME;
        let line = self.vcount;

        let vblank_started = line == VBLANK_START;
        status.set(
            DisplayStatus::IN_VBLANK,
            (VBLANK_START..VBLANK_FLAG_END).contains(&line),
        );
        if vblank_started && status.contains(DisplayStatus::VBLANK_IRQ) {
            requests |= IrqFlags::VBLANK;
        }

        let matched = line == status.vcount_setting();
        status.set(DisplayStatus::VCOUNT_MATCH, matched);
        if matched && status.contains(DisplayStatus::VCOUNT_IRQ) {
            requests |= IrqFlags::VCOUNT;
        }

        self.dispstat = status.bits();
        LcdTick {
            requests,
            vblank_started,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_lines(lcd: &mut Lcd, lines: u16) -> Vec<LcdTick> {
        (0..lines).map(|_| lcd.tick()).collect()
    }

    #[test]
    fn test_vblank_once_per_frame() {
        let mut lcd = Lcd::new();
        lcd.write(0x04, DisplayStatus::VBLANK_IRQ.bits());

        let ticks = run_lines(&mut lcd, SCANLINES_PER_FRAME * 3);
        let vblanks: Vec<usize> = ticks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.requests.contains(IrqFlags::VBLANK))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(vblanks.len(), 3);
        assert_eq!(vblanks[1] - vblanks[0], SCANLINES_PER_FRAME as usize);
    }

    #[test]
    fn test_vblank_without_irq_enable_raises_nothing() {
        let mut lcd = Lcd::new();
        let ticks = run_lines(&mut lcd, SCANLINES_PER_FRAME);
        assert!(ticks.iter().all(|t| t.requests.is_empty()));
        assert_eq!(ticks.iter().filter(|t| t.vblank_started).count(), 1);
    }

    #[test]
    fn test_vblank_status_flag() {
        let mut lcd = Lcd::new();
        run_lines(&mut lcd, VBLANK_START);
        assert_eq!(lcd.vcount(), VBLANK_START);
        assert!(lcd.status().contains(DisplayStatus::IN_VBLANK));

        run_lines(&mut lcd, SCANLINES_PER_FRAME - VBLANK_START);
        assert_eq!(lcd.vcount(), 0);
        assert!(!lcd.status().contains(DisplayStatus::IN_VBLANK));
    }

    #[test]
    fn test_status_bits_are_read_only() {
        let mut lcd = Lcd::new();
        lcd.write(0x04, 0xFFFF);
        assert_eq!(lcd.read(0x04) & DisplayStatus::STATUS_MASK, 0);
        assert_eq!(lcd.status().vcount_setting(), 0xFF);
    }

    #[test]
    fn test_vcount_match() {
        let mut lcd = Lcd::new();
        lcd.write(0x04, (100 << 8) | DisplayStatus::VCOUNT_IRQ.bits());
        let ticks = run_lines(&mut lcd, SCANLINES_PER_FRAME);
        let hits: Vec<usize> = ticks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.requests.contains(IrqFlags::VCOUNT))
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(hits, vec![100]);
    }

    #[test]
    fn test_hblank_every_line() {
        let mut lcd = Lcd::new();
        lcd.write(0x04, DisplayStatus::HBLANK_IRQ.bits());
        let ticks = run_lines(&mut lcd, 10);
        assert!(ticks.iter().all(|t| t.requests == IrqFlags::HBLANK));
    }
}
