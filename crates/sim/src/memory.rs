// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// A simple flat memory storage, optionally mirrored across a wider window.
pub struct LinearMemory {
    pub data: Vec<u8>,
    pub base_addr: u32,
    /// Size of the address window the memory repeats across.
    pub window: u32,
}

impl LinearMemory {
    pub fn new(size: usize, base_addr: u32) -> Self {
        Self {
            data: vec![0; size],
            base_addr,
            window: size as u32,
        }
    }

    pub fn mirrored(size: usize, base_addr: u32, window: u32) -> Self {
        Self {
            window,
            ..Self::new(size, base_addr)
        }
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base_addr && addr - self.base_addr < self.window
    }

    fn index(&self, addr: u32) -> Option<usize> {
        if self.contains(addr) {
            Some(((addr - self.base_addr) as usize) % self.data.len())
        } else {
            None
        }
    }

    pub fn read_u16(&self, addr: u32) -> Option<u16> {
        // Halfword accesses ignore address bit 0
        let i = self.index(addr & !1)?;
        Some(u16::from_le_bytes([self.data[i], self.data[i + 1]]))
    }

    pub fn write_u16(&mut self, addr: u32, value: u16) -> bool {
        match self.index(addr & !1) {
            Some(i) => {
                self.data[i..i + 2].copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }
}
