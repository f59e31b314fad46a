// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The fixed bring-up sequence run from the entry point.

use crate::display::TextConsole;
use crate::idle::IdleLoop;
use crate::interrupt::InterruptController;
use crate::Hardware;
use log::info;

/// The one line written at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Greeting {
    pub row: u16,
    pub column: u16,
    pub text: &'static str,
}

pub const GREETING: Greeting = Greeting {
    row: 10,
    column: 10,
    text: "Hello From Bazel!",
};

/// Run every startup step and hand back the idle loop, which now owns the
/// hardware.
pub fn boot<H: Hardware>(mut hw: H) -> IdleLoop<H> {
    let mut irq = InterruptController::initialize(&mut hw);
    let vblank = irq.enable_vblank(&mut hw);

    let mut console = TextConsole::initialize_text_mode(&mut hw, &irq);
    console.write_at(&mut hw, GREETING.row, GREETING.column, GREETING.text);
    info!(
        "wrote {:?} at ({}, {}), entering idle loop",
        GREETING.text, GREETING.row, GREETING.column
    );

    IdleLoop::new(hw, vblank)
}

/// Entry point body: boot, then idle forever.
pub fn run<H: Hardware>(hw: H) -> ! {
    boot(hw).run()
}
