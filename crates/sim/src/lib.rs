// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod irq;
pub mod lcd;
pub mod memory;
pub mod screen;

use gbajam_core::regs::{
    self, IWRAM_BASE, IWRAM_SIZE, PALETTE_BASE, PALETTE_SIZE, SCANLINES_PER_FRAME, VRAM_BASE,
    VRAM_SIZE,
};
use gbajam_core::{Bus, Hardware, IrqFlags, IrqHandler};
use irq::IrqRegisters;
use lcd::Lcd;
use memory::LinearMemory;
use serde::Serialize;
use tracing::{trace, warn};

pub use screen::TextScreen;

const IO_BASE: u32 = 0x0400_0000;
const LCD_IO_LAST: u32 = 0x0400_005F;
const IRQ_IO_BASE: u32 = 0x0400_0200;
const IRQ_IO_LAST: u32 = 0x0400_020B;
/// Scanlines a halt may go without any possible wake-up before the machine
/// is considered deadlocked.
const DEADLOCK_SCANLINES: u64 = 2 * SCANLINES_PER_FRAME as u64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimConfig {
    /// Stop after this many frames by unwinding with [`FrameLimitReached`].
    /// Lets code that never returns be driven for a bounded time.
    pub frame_limit: Option<u64>,
}

/// Panic payload used to stop the machine at [`SimConfig::frame_limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimitReached {
    pub frames: u64,
}

/// The parts of the GBA the firmware touches, at register level.
pub struct Machine {
    pub config: SimConfig,
    pub irq: IrqRegisters,
    pub lcd: Lcd,
    pub palette: LinearMemory,
    pub vram: LinearMemory,
    pub iwram: LinearMemory,
    handler: Option<IrqHandler>,
    scanlines: u64,
    frames: u64,
    serviced_irqs: u64,
    lines_since_wake: u64,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// A machine in its power-on state.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    pub fn with_config(config: SimConfig) -> Self {
        Self {
            config,
            irq: IrqRegisters::new(),
            lcd: Lcd::new(),
            palette: LinearMemory::new(PALETTE_SIZE as usize, PALETTE_BASE),
            vram: LinearMemory::new(VRAM_SIZE as usize, VRAM_BASE),
            // IWRAM repeats across its whole 16 MiB region
            iwram: LinearMemory::mirrored(IWRAM_SIZE as usize, IWRAM_BASE, 0x0100_0000),
            handler: None,
            scanlines: 0,
            frames: 0,
            serviced_irqs: 0,
            lines_since_wake: 0,
        }
    }

    /// Scanlines elapsed since power-on.
    pub fn scanlines(&self) -> u64 {
        self.scanlines
    }

    /// Vertical blank periods begun since power-on.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Interrupts dispatched to the installed handler.
    pub fn serviced_irqs(&self) -> u64 {
        self.serviced_irqs
    }

    pub fn has_irq_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn screen(&self) -> TextScreen {
        TextScreen::capture(self)
    }

    /// Advance the LCD by one scanline and latch the requests it raises.
    pub fn step_scanline(&mut self) {
        let tick = self.lcd.tick();
        self.scanlines += 1;
        if tick.vblank_started {
            self.frames += 1;
        }
        if !tick.requests.is_empty() {
            self.irq.request(tick.requests);
        }
    }

    fn check_frame_limit(&self) {
        if let Some(limit) = self.config.frame_limit {
            if self.frames >= limit {
                std::panic::panic_any(FrameLimitReached {
                    frames: self.frames,
                });
            }
        }
    }

    fn dispatch(&mut self, pending: IrqFlags) {
        // The dispatcher acknowledges before calling out, as the BIOS does
        self.irq.acknowledge(pending);
        self.serviced_irqs += 1;
        trace!("irq {:?} at scanline {}", pending, self.lcd.vcount());
        if let Some(handler) = self.handler {
            handler(self, pending);
        }
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            frames: self.frames,
            scanlines: self.scanlines,
            serviced_irqs: self.serviced_irqs,
            lcd: self.lcd.clone(),
            irq: self.irq.clone(),
            intr_check: self.read_u16(regs::INTR_CHECK),
            screen: self.screen().lines(),
        }
    }
}

impl Bus for Machine {
    fn read_u16(&self, addr: u32) -> u16 {
        let value = match addr {
            IO_BASE..=LCD_IO_LAST => Some(self.lcd.read(addr - IO_BASE)),
            IRQ_IO_BASE..=IRQ_IO_LAST => Some(self.irq.read(addr - IRQ_IO_BASE)),
            _ if self.iwram.contains(addr) => self.iwram.read_u16(addr),
            _ if self.palette.contains(addr) => self.palette.read_u16(addr),
            _ if self.vram.contains(addr) => self.vram.read_u16(addr),
            _ => None,
        };
        value.unwrap_or_else(|| {
            warn!("read from unmapped address {:#010x}", addr);
            0
        })
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        let mapped = match addr {
            IO_BASE..=LCD_IO_LAST => {
                self.lcd.write(addr - IO_BASE, value);
                true
            }
            IRQ_IO_BASE..=IRQ_IO_LAST => {
                self.irq.write(addr - IRQ_IO_BASE, value);
                true
            }
            _ if self.iwram.contains(addr) => self.iwram.write_u16(addr, value),
            _ if self.palette.contains(addr) => self.palette.write_u16(addr, value),
            _ if self.vram.contains(addr) => self.vram.write_u16(addr, value),
            _ => false,
        };
        if !mapped {
            warn!("write of {:#06x} to unmapped address {:#010x}", value, addr);
        }
    }
}

impl Hardware for Machine {
    fn set_irq_handler(&mut self, handler: Option<IrqHandler>) {
        self.handler = handler;
    }

    /// Runs scanlines until an enabled request is raised, servicing it if
    /// IME is set.
    ///
    /// Panics if no wake-up has been possible for two whole frames, which on
    /// hardware would be a permanent hang.
    fn halt(&mut self) {
        loop {
            self.check_frame_limit();
            self.step_scanline();

            let pending = self.irq.pending();
            if !pending.is_empty() && self.irq.master_enabled() {
                self.lines_since_wake = 0;
                self.dispatch(pending);
                return;
            }

            self.lines_since_wake += 1;
            if self.lines_since_wake > DEADLOCK_SCANLINES {
                panic!(
                    "CPU halted with no interrupt able to complete a wait \
                     (IE={:#06x}, IF={:#06x}, IME={}, DISPSTAT={:#06x})",
                    self.irq.enabled().bits(),
                    self.irq.read(0x02),
                    self.irq.master_enabled() as u8,
                    self.lcd.read(0x04),
                );
            }
            if !pending.is_empty() {
                // Halt ends on IE & IF even with IME off, without servicing
                return;
            }
        }
    }
}

/// Serialisable view of the machine for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct MachineSnapshot {
    pub frames: u64,
    pub scanlines: u64,
    pub serviced_irqs: u64,
    pub lcd: Lcd,
    pub irq: IrqRegisters,
    pub intr_check: u16,
    pub screen: Vec<String>,
}

impl MachineSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
