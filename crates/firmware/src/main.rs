#![no_std]
// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_main]
#![allow(clippy::empty_loop)]

use core::panic::PanicInfo;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};
use gba::asm_runtime::RUST_IRQ_HANDLER;
use gba::interrupts::IrqBits;
use gbajam_core::{startup, Bus, Hardware, IrqFlags, IrqHandler};

/// Memory-mapped I/O of the running console.
struct GbaMmio;

impl Bus for GbaMmio {
    fn read_u16(&self, addr: u32) -> u16 {
        // Every address the core touches is a halfword-accessible register or
        // memory region of the device
        unsafe { ptr::read_volatile(addr as *const u16) }
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        unsafe { ptr::write_volatile(addr as *mut u16, value) }
    }
}

/// Routine installed by the core, called from the runtime's IRQ hook.
static CORE_HANDLER: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

#[link_section = ".iwram"]
extern "C" fn irq_hook(bits: IrqBits) {
    let handler = CORE_HANDLER.load(Ordering::Relaxed);
    if handler.is_null() {
        return;
    }
    // Only ever stored from a valid `IrqHandler` below
    let handler = unsafe { core::mem::transmute::<*mut (), IrqHandler>(handler) };
    handler(&mut GbaMmio, IrqFlags::from_bits_truncate(bits.to_u16()));
}

impl Hardware for GbaMmio {
    fn set_irq_handler(&mut self, handler: Option<IrqHandler>) {
        match handler {
            Some(handler) => {
                CORE_HANDLER.store(handler as *mut (), Ordering::Relaxed);
                RUST_IRQ_HANDLER.write(Some(irq_hook));
            }
            None => {
                RUST_IRQ_HANDLER.write(None);
                CORE_HANDLER.store(ptr::null_mut(), Ordering::Relaxed);
            }
        }
    }

    fn halt(&mut self) {
        // BIOS Halt
        unsafe { core::arch::asm!("swi #0x02", clobber_abi("C")) }
    }
}

#[panic_handler]
fn panic_handler(info: &PanicInfo) -> ! {
    log::error!("{}", info);
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    // Fails outside mGBA; logging is then a no-op
    let _ = mgba_log::init();
    log::info!("gbajam firmware starting");

    startup::run(GbaMmio)
}
