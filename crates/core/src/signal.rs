// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::interrupt::IrqFlags;
use crate::regs;
use crate::Bus;

/// Single-word completion signal shared between the interrupt context and
/// the main context.
///
/// The interrupt context only ever sets bits. The main context checks and
/// clears them with `IME` masked, so the two never race on the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionSignal {
    addr: u32,
}

impl CompletionSignal {
    /// The interrupt check word polled by the BIOS wait routines.
    pub const BIOS: Self = Self::at(regs::INTR_CHECK);

    pub const fn at(addr: u32) -> Self {
        Self { addr }
    }

    /// Mark `flags` as serviced. Called from the interrupt context.
    pub fn raise(&self, bus: &mut dyn Bus, flags: IrqFlags) {
        let current = bus.read_u16(self.addr);
        bus.write_u16(self.addr, current | flags.bits());
    }

    pub fn pending(&self, bus: &dyn Bus) -> IrqFlags {
        IrqFlags::from_bits_retain(bus.read_u16(self.addr))
    }

    /// Clear `flags`, returning whether any of them had been raised.
    pub fn take(&self, bus: &mut dyn Bus, flags: IrqFlags) -> bool {
        with_irqs_masked(bus, |bus| {
            let current = IrqFlags::from_bits_retain(bus.read_u16(self.addr));
            if current.intersects(flags) {
                bus.write_u16(self.addr, (current - flags).bits());
                true
            } else {
                false
            }
        })
    }

    pub fn clear(&self, bus: &mut dyn Bus, flags: IrqFlags) {
        self.take(bus, flags);
    }

    pub fn reset(&self, bus: &mut dyn Bus) {
        bus.write_u16(self.addr, 0);
    }
}

/// Run `f` with the interrupt master enable cleared, restoring it afterwards.
pub fn with_irqs_masked<R>(bus: &mut dyn Bus, f: impl FnOnce(&mut dyn Bus) -> R) -> R {
    let ime = bus.read_u16(regs::IME);
    bus.write_u16(regs::IME, 0);
    let result = f(bus);
    bus.write_u16(regs::IME, ime);
    result
}
