// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::regs::{self, DisplayStatus};
use crate::signal::{with_irqs_masked, CompletionSignal};
use crate::{Bus, Hardware};
use bitflags::bitflags;
use log::debug;

bitflags! {
    /// Interrupt request bits as laid out in `IE`, `IF` and the interrupt
    /// check word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IrqFlags: u16 {
        const VBLANK = 1 << 0;
        const HBLANK = 1 << 1;
        const VCOUNT = 1 << 2;
        const TIMER0 = 1 << 3;
        const TIMER1 = 1 << 4;
        const TIMER2 = 1 << 5;
        const TIMER3 = 1 << 6;
        const SERIAL = 1 << 7;
        const DMA0 = 1 << 8;
        const DMA1 = 1 << 9;
        const DMA2 = 1 << 10;
        const DMA3 = 1 << 11;
        const KEYPAD = 1 << 12;
        const GAMEPAK = 1 << 13;
    }
}

/// An interrupt line the hardware recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrqSource {
    VerticalBlank,
    HorizontalBlank,
    VCounter,
    Timer0,
    Timer1,
    Timer2,
    Timer3,
    Serial,
    Dma0,
    Dma1,
    Dma2,
    Dma3,
    Keypad,
    GamePak,
}

impl IrqSource {
    pub fn flag(self) -> IrqFlags {
        match self {
            IrqSource::VerticalBlank => IrqFlags::VBLANK,
            IrqSource::HorizontalBlank => IrqFlags::HBLANK,
            IrqSource::VCounter => IrqFlags::VCOUNT,
            IrqSource::Timer0 => IrqFlags::TIMER0,
            IrqSource::Timer1 => IrqFlags::TIMER1,
            IrqSource::Timer2 => IrqFlags::TIMER2,
            IrqSource::Timer3 => IrqFlags::TIMER3,
            IrqSource::Serial => IrqFlags::SERIAL,
            IrqSource::Dma0 => IrqFlags::DMA0,
            IrqSource::Dma1 => IrqFlags::DMA1,
            IrqSource::Dma2 => IrqFlags::DMA2,
            IrqSource::Dma3 => IrqFlags::DMA3,
            IrqSource::Keypad => IrqFlags::KEYPAD,
            IrqSource::GamePak => IrqFlags::GAMEPAK,
        }
    }

    /// Device-side enable bit in `DISPSTAT`, for the LCD sources.
    ///
    /// The other sources are enabled in their own peripheral's control
    /// register, which the owner of that peripheral configures.
    fn display_status_enable(self) -> Option<DisplayStatus> {
        match self {
            IrqSource::VerticalBlank => Some(DisplayStatus::VBLANK_IRQ),
            IrqSource::HorizontalBlank => Some(DisplayStatus::HBLANK_IRQ),
            IrqSource::VCounter => Some(DisplayStatus::VCOUNT_IRQ),
            _ => None,
        }
    }
}

/// Proof that the vertical-blank source has been armed.
///
/// Only [`InterruptController::enable_vblank`] hands these out; the idle loop
/// requires one.
#[derive(Debug)]
pub struct VBlankArmed {
    _private: (),
}

/// Owner of the interrupt enable state (`IME`, `IE`, and the LCD interrupt
/// enables in `DISPSTAT`).
///
/// Completions are reported through [`CompletionSignal::BIOS`], which is where
/// [`service`] records them and [`crate::IdleLoop`] looks for them.
#[derive(Debug)]
pub struct InterruptController {
    _private: (),
}

impl InterruptController {
    /// Bring the interrupt subsystem from its power-on state to "nothing
    /// armed, dispatcher installed, master enable on".
    pub fn initialize<H: Hardware>(hw: &mut H) -> Self {
        hw.write_u16(regs::IME, 0);
        hw.write_u16(regs::IE, 0);
        // Acknowledge whatever was left pending.
        hw.write_u16(regs::IF, 0xFFFF);
        hw.modify_u16(regs::DISPSTAT, |stat| stat & !DisplayStatus::IRQ_MASK);
        CompletionSignal::BIOS.reset(hw);
        hw.set_irq_handler(Some(service));
        hw.write_u16(regs::IME, 1);

        debug!("interrupt controller initialized");
        Self { _private: () }
    }

    /// Arm `source`. Enabling an already armed source changes nothing.
    pub fn enable<B: Bus>(&mut self, hw: &mut B, source: IrqSource) {
        with_irqs_masked(hw, |bus| {
            if let Some(enable) = source.display_status_enable() {
                let stat = bus.read_u16(regs::DISPSTAT);
                bus.write_u16(regs::DISPSTAT, stat | enable.bits());
            }
            let ie = bus.read_u16(regs::IE);
            bus.write_u16(regs::IE, ie | source.flag().bits());
        });
        debug!("interrupt source {:?} armed", source);
    }

    pub fn enable_vblank<B: Bus>(&mut self, hw: &mut B) -> VBlankArmed {
        self.enable(hw, IrqSource::VerticalBlank);
        VBlankArmed { _private: () }
    }

    /// The set of armed sources.
    pub fn armed(&self, hw: &dyn Bus) -> IrqFlags {
        IrqFlags::from_bits_retain(hw.read_u16(regs::IE))
    }
}

/// Interrupt service routine installed by [`InterruptController::initialize`].
///
/// Only records completion; it never touches the display.
pub fn service(bus: &mut dyn Bus, flags: IrqFlags) {
    CompletionSignal::BIOS.raise(bus, flags);
}
