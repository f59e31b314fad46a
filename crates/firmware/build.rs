// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=gba.ld");

    let target = env::var("TARGET").unwrap_or_default();
    if target.starts_with("thumbv4t") || target.starts_with("armv4t") {
        let dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
        println!("cargo:rustc-link-arg-bins=-T{}/gba.ld", dir);
    }
}
