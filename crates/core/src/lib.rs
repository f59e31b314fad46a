// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![cfg_attr(not(test), no_std)]

pub mod display;
pub mod idle;
pub mod interrupt;
pub mod regs;
pub mod signal;
pub mod startup;

#[cfg(test)]
mod testing;

pub use display::{ConsoleConfig, TextConsole};
pub use idle::IdleLoop;
pub use interrupt::{InterruptController, IrqFlags, IrqSource, VBlankArmed};

/// Interrupt service routine signature.
///
/// The dispatcher acknowledges `IF` before the call; `flags` holds the
/// requests that were both raised and enabled.
pub type IrqHandler = fn(&mut dyn Bus, IrqFlags);

/// Trait representing the system bus as seen from the CPU.
///
/// Accesses are volatile and never fail: every address used by this crate is
/// either a register or memory that exists on the device.
pub trait Bus {
    fn read_u16(&self, addr: u32) -> u16;
    fn write_u16(&mut self, addr: u32, value: u16);

    fn read_u32(&self, addr: u32) -> u32 {
        let lo = self.read_u16(addr) as u32;
        let hi = self.read_u16(addr + 2) as u32;
        // Little Endian
        lo | (hi << 16)
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        self.write_u16(addr, (value & 0xFFFF) as u16);
        self.write_u16(addr + 2, (value >> 16) as u16);
    }

    /// Read-modify-write helper for 16-bit registers.
    fn modify_u16(&mut self, addr: u32, f: impl FnOnce(u16) -> u16)
    where
        Self: Sized,
    {
        let value = self.read_u16(addr);
        self.write_u16(addr, f(value));
    }
}

/// Hardware capability handle owned by the startup sequence.
///
/// Implemented by real memory-mapped I/O on the device and by the register
/// model on the host.
pub trait Hardware: Bus {
    /// Install (or remove) the routine the IRQ vector dispatches to.
    fn set_irq_handler(&mut self, handler: Option<IrqHandler>);

    /// Suspend the CPU until an enabled interrupt request is raised.
    ///
    /// If `IME` is set the installed handler has run by the time this
    /// returns.
    fn halt(&mut self);
}
