// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::interrupt::IrqFlags;
use crate::{Bus, Hardware, IrqHandler};
use std::collections::{HashMap, VecDeque};

/// Flat register/memory mock that records every write and replays a script
/// of interrupt requests on each `halt`.
#[derive(Default)]
pub struct MockHardware {
    mem: HashMap<u32, u16>,
    writes: Vec<(u32, u16)>,
    handler: Option<IrqHandler>,
    wakeups: VecDeque<IrqFlags>,
    pub halts: usize,
}

impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> &[(u32, u16)] {
        &self.writes
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
    }

    pub fn handler(&self) -> Option<IrqHandler> {
        self.handler
    }

    /// Queue the requests raised by the next `halt`.
    pub fn push_wakeup(&mut self, flags: IrqFlags) {
        self.wakeups.push_back(flags);
    }
}

impl Bus for MockHardware {
    fn read_u16(&self, addr: u32) -> u16 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        self.writes.push((addr, value));
        self.mem.insert(addr, value);
    }
}

impl Hardware for MockHardware {
    fn set_irq_handler(&mut self, handler: Option<IrqHandler>) {
        self.handler = handler;
    }

    fn halt(&mut self) {
        self.halts += 1;
        let flags = self
            .wakeups
            .pop_front()
            .expect("halt called with no scripted wakeup left");
        if self.read_u16(crate::regs::IME) & 1 != 0 {
            if let Some(handler) = self.handler {
                handler(self, flags);
            }
        }
    }
}
