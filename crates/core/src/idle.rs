// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::interrupt::{IrqFlags, VBlankArmed};
use crate::signal::CompletionSignal;
use crate::Hardware;
use log::trace;

/// The terminal steady state: sleep until each vertical blank, forever.
///
/// Owns the hardware handle; nothing else runs once control is handed over.
pub struct IdleLoop<H: Hardware> {
    hw: H,
    signal: CompletionSignal,
    frames: u64,
    _armed: VBlankArmed,
}

impl<H: Hardware> IdleLoop<H> {
    pub fn new(hw: H, armed: VBlankArmed) -> Self {
        Self {
            hw,
            signal: CompletionSignal::BIOS,
            frames: 0,
            _armed: armed,
        }
    }

    /// Suspend until a vertical blank is serviced after this call begins.
    ///
    /// A completion left over from before the call is discarded, and
    /// wake-ups caused by other sources put the CPU straight back to sleep.
    pub fn wait_for_vertical_blank(&mut self) {
        self.signal.clear(&mut self.hw, IrqFlags::VBLANK);
        loop {
            self.hw.halt();
            if self.signal.take(&mut self.hw, IrqFlags::VBLANK) {
                break;
            }
        }
        self.frames += 1;
        trace!("vblank {}", self.frames);
    }

    /// Never returns.
    pub fn run(mut self) -> ! {
        loop {
            self.wait_for_vertical_blank();
        }
    }

    /// Vertical blanks observed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }
}
