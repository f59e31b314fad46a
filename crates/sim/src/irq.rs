// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use gbajam_core::IrqFlags;
use serde::Serialize;

/// Interrupt controller registers: IE, IF and IME.
///
/// Offsets are relative to `0x0400_0200`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IrqRegisters {
    ie: u16,
    #[serde(rename = "if")]
    requests: u16,
    ime: u16,
}

impl IrqRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, offset: u32) -> u16 {
        match offset {
            0x00 => self.ie,
            0x02 => self.requests,
            0x08 => self.ime,
            _ => 0,
        }
    }

    pub fn write(&mut self, offset: u32, value: u16) {
        match offset {
            0x00 => self.ie = value & IrqFlags::all().bits(),
            // IF: writing 1 acknowledges the request
            0x02 => self.requests &= !value,
            0x08 => self.ime = value & 1,
            _ => {}
        }
    }

    /// Latch requests raised by a peripheral.
    pub fn request(&mut self, flags: IrqFlags) {
        self.requests |= flags.bits();
    }

    pub fn acknowledge(&mut self, flags: IrqFlags) {
        self.requests &= !flags.bits();
    }

    /// Requests that are both raised and enabled. These wake a halted CPU
    /// whether or not IME is set.
    pub fn pending(&self) -> IrqFlags {
        IrqFlags::from_bits_retain(self.ie & self.requests)
    }

    pub fn master_enabled(&self) -> bool {
        self.ime & 1 != 0
    }

    pub fn enabled(&self) -> IrqFlags {
        IrqFlags::from_bits_retain(self.ie)
    }
}
