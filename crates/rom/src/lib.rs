// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Cartridge image builder: lays out the loadable sections of a linked
//! firmware ELF at their ROM addresses and fills in the cartridge header.

use goblin::elf::header::{et_to_str, machine_to_str, EM_ARM, ET_EXEC};
use goblin::elf::section_header::{SHF_ALLOC, SHT_NOBITS};
use goblin::elf::Elf;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Address the cartridge ROM is mapped at.
pub const ROM_START: u32 = 0x0800_0000;
/// Largest image that fits the cartridge address space.
pub const MAX_SIZE: u32 = 32 * 1024 * 1024;
pub const HEADER_LENGTH: usize = 0xC0;
pub const TITLE_LENGTH: usize = 12;

const LOGO_OFFSET: usize = 0x04;
const TITLE_OFFSET: usize = 0xA0;
const MAKER_CODE_OFFSET: usize = 0xB0;
const FIXED_VALUE_OFFSET: usize = 0xB2;
const CHECKSUM_OFFSET: usize = 0xBD;

/// Boot logo the BIOS compares against before starting a cartridge.
pub const LOGO: [u8; 156] = [
    0x24, 0xFF, 0xAE, 0x51, 0x69, 0x9A, 0xA2, 0x21, 0x3D, 0x84, 0x82, 0x0A, 0x84, 0xE4, 0x09, 0xAD,
    0x11, 0x24, 0x8B, 0x98, 0xC0, 0x81, 0x7F, 0x21, 0xA3, 0x52, 0xBE, 0x19, 0x93, 0x09, 0xCE, 0x20,
    0x10, 0x46, 0x4A, 0x4A, 0xF8, 0x27, 0x31, 0xEC, 0x58, 0xC7, 0xE8, 0x33, 0x82, 0xE3, 0xCE, 0xBF,
    0x85, 0xF4, 0xDF, 0x94, 0xCE, 0x4B, 0x09, 0xC1, 0x94, 0x56, 0x8A, 0xC0, 0x13, 0x72, 0xA7, 0xFC,
    0x9F, 0x84, 0x4D, 0x73, 0xA3, 0xCA, 0x9A, 0x61, 0x58, 0x97, 0xA3, 0x27, 0xFC, 0x03, 0x98, 0x76,
    0x23, 0x1D, 0xC7, 0x61, 0x03, 0x04, 0xAE, 0x56, 0xBF, 0x38, 0x84, 0x00, 0x40, 0xA7, 0x0E, 0xFD,
    0xFF, 0x52, 0xFE, 0x03, 0x6F, 0x95, 0x30, 0xF1, 0x97, 0xFB, 0xC0, 0x85, 0x60, 0xD6, 0x80, 0x25,
    0xA9, 0x63, 0xBE, 0x03, 0x01, 0x4E, 0x38, 0xE2, 0xF9, 0xA2, 0x34, 0xFF, 0xBB, 0x3E, 0x03, 0x44,
    0x78, 0x00, 0x90, 0xCB, 0x88, 0x11, 0x3A, 0x94, 0x65, 0xC0, 0x7C, 0x63, 0x87, 0xF0, 0x3C, 0xAF,
    0xD6, 0x25, 0xE4, 0x8B, 0x38, 0x0A, 0xAC, 0x72, 0x21, 0xD4, 0xF8, 0x07,
];

#[derive(Debug, thiserror::Error)]
pub enum RomError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse ELF binary: {0}")]
    Parse(#[from] goblin::error::Error),
    #[error("program ELF class is 64-bit, expected 32-bit")]
    WrongClass,
    #[error("program byte order is not little-endian")]
    WrongByteOrder,
    #[error("program ELF type is {0}, expected ET_EXEC")]
    WrongType(&'static str),
    #[error("program machine is {0}, expected EM_ARM")]
    WrongMachine(&'static str),
    #[error("section {name:?}: could not map offset {offset:#010x} to a load address")]
    UnmappedSection { name: String, offset: u64 },
    #[error("section {name:?} lies outside the file")]
    SectionOutOfBounds { name: String },
    #[error("no program data")]
    NoProgramData,
    #[error("program contains data at address {start:#x}, but the minimum address is {min:#x}")]
    BelowRomStart { start: u64, min: u32 },
    #[error("program data is too large: size={size:#x}, maximum={max:#x}")]
    TooLarge { size: u64, max: u32 },
    #[error("required symbols do not exist: {0}")]
    MissingSymbols(String),
    #[error("symbol {name} has address {value:#x}, should be {expected:#x}")]
    MisplacedSymbol {
        name: String,
        value: u64,
        expected: u32,
    },
}

pub type RomResult<T> = Result<T, RomError>;

/// Symbols whose addresses pin the image layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredSymbols {
    /// Must sit at the very start of ROM.
    pub entry: String,
    /// Must sit right after the cartridge header.
    pub header_end: String,
}

impl Default for RequiredSymbols {
    fn default() -> Self {
        Self {
            entry: "_start".to_string(),
            header_end: "rom_header_end".to_string(),
        }
    }
}

/// Metadata written into the cartridge header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomInfo {
    pub title: String,
    pub symbols: RequiredSymbols,
}

/// An allocated section placed at its load address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedSection {
    pub name: String,
    pub lma: u64,
    pub offset: usize,
    pub size: usize,
}

pub fn make_rom_from_path(path: &Path, info: &RomInfo) -> RomResult<Vec<u8>> {
    let buffer = fs::read(path).map_err(|source| RomError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    make_rom(&buffer, info)
}

/// Create a cartridge image from the bytes of a linked ELF executable.
pub fn make_rom(buffer: &[u8], info: &RomInfo) -> RomResult<Vec<u8>> {
    let mut image = read_program(buffer, &info.symbols)?;
    patch_header(&mut image, &info.title);
    info!(
        "ROM image: {} bytes, title {:?}, checksum {:#04x}",
        image.len(),
        info.title,
        image[CHECKSUM_OFFSET]
    );
    Ok(image)
}

fn read_program(buffer: &[u8], symbols: &RequiredSymbols) -> RomResult<Vec<u8>> {
    let elf = Elf::parse(buffer)?;

    if elf.is_64 {
        return Err(RomError::WrongClass);
    }
    if !elf.little_endian {
        return Err(RomError::WrongByteOrder);
    }
    if elf.header.e_type != ET_EXEC {
        return Err(RomError::WrongType(et_to_str(elf.header.e_type)));
    }
    if elf.header.e_machine != EM_ARM {
        return Err(RomError::WrongMachine(machine_to_str(elf.header.e_machine)));
    }

    let sections = map_sections(&elf, buffer.len())?;
    let (start, size) = image_extent(&sections)?;
    check_symbols(&elf, symbols)?;

    let mut data = vec![0u8; size];
    for s in &sections {
        let at = (s.lma - start) as usize;
        data[at..at + s.size].copy_from_slice(&buffer[s.offset..s.offset + s.size]);
    }
    Ok(data)
}

/// Load address of a file offset, via the program header covering it.
fn load_address(elf: &Elf, offset: u64) -> Option<u64> {
    elf.program_headers
        .iter()
        .find(|ph| ph.p_offset <= offset && offset < ph.p_offset + ph.p_filesz)
        .map(|ph| offset - ph.p_offset + ph.p_paddr)
}

/// Allocated sections with file contents, placed at their load addresses.
pub fn map_sections(elf: &Elf, file_len: usize) -> RomResult<Vec<PlacedSection>> {
    let mut sections = Vec::new();
    for sh in &elf.section_headers {
        if sh.sh_flags & SHF_ALLOC as u64 == 0 || sh.sh_type == SHT_NOBITS || sh.sh_size == 0 {
            continue;
        }
        let name = elf
            .shdr_strtab
            .get_at(sh.sh_name)
            .unwrap_or("<unnamed>")
            .to_string();
        let lma = load_address(elf, sh.sh_offset).ok_or_else(|| RomError::UnmappedSection {
            name: name.clone(),
            offset: sh.sh_offset,
        })?;
        let offset = sh.sh_offset as usize;
        let size = sh.sh_size as usize;
        if offset.checked_add(size).map_or(true, |end| end > file_len) {
            return Err(RomError::SectionOutOfBounds { name });
        }
        debug!("section {}: LMA={:#x}, size={} bytes", name, lma, size);
        sections.push(PlacedSection {
            name,
            lma,
            offset,
            size,
        });
    }
    Ok(sections)
}

/// Lowest load address and total span of the sections.
pub fn image_extent(sections: &[PlacedSection]) -> RomResult<(u64, usize)> {
    let start = sections.iter().map(|s| s.lma).min();
    let end = sections.iter().map(|s| s.lma + s.size as u64).max();
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(RomError::NoProgramData),
    };
    if start < ROM_START as u64 {
        return Err(RomError::BelowRomStart {
            start,
            min: ROM_START,
        });
    }
    let size = end - start;
    if size > MAX_SIZE as u64 {
        return Err(RomError::TooLarge {
            size,
            max: MAX_SIZE,
        });
    }
    Ok((start, size as usize))
}

fn check_symbols(elf: &Elf, required: &RequiredSymbols) -> RomResult<()> {
    let expected = [
        (required.entry.as_str(), ROM_START),
        (required.header_end.as_str(), ROM_START + HEADER_LENGTH as u32),
    ];
    let mut found: [Option<u64>; 2] = [None; 2];
    for sym in elf.syms.iter() {
        let Some(name) = elf.strtab.get_at(sym.st_name) else {
            continue;
        };
        for (slot, (wanted, _)) in found.iter_mut().zip(expected.iter()) {
            if slot.is_none() && name == *wanted {
                *slot = Some(sym.st_value);
            }
        }
    }

    let missing: Vec<&str> = expected
        .iter()
        .zip(found.iter())
        .filter(|(_, value)| value.is_none())
        .map(|((name, _), _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(RomError::MissingSymbols(missing.join(", ")));
    }

    for ((name, want), value) in expected.iter().zip(found.iter()) {
        let value = value.unwrap_or_default();
        if value != *want as u64 {
            return Err(RomError::MisplacedSymbol {
                name: name.to_string(),
                value,
                expected: *want,
            });
        }
    }
    Ok(())
}

/// Fill in the cartridge header: logo, title, maker code, fixed value and
/// header checksum. Images shorter than the header are padded.
pub fn patch_header(image: &mut Vec<u8>, title: &str) {
    if image.len() < HEADER_LENGTH {
        image.resize(HEADER_LENGTH, 0);
    }
    // The first word is the branch to the entry point and is kept
    image[LOGO_OFFSET..HEADER_LENGTH].fill(0);
    image[LOGO_OFFSET..LOGO_OFFSET + LOGO.len()].copy_from_slice(&LOGO);

    let title = title.as_bytes();
    let len = title.len().min(TITLE_LENGTH);
    image[TITLE_OFFSET..TITLE_OFFSET + len].copy_from_slice(&title[..len]);

    // 0xAC..0xB0 game code stays blank; maker code "01"
    image[MAKER_CODE_OFFSET] = b'0';
    image[MAKER_CODE_OFFSET + 1] = b'1';
    image[FIXED_VALUE_OFFSET] = 0x96;
    image[CHECKSUM_OFFSET] = header_checksum(&image[TITLE_OFFSET..CHECKSUM_OFFSET]);
}

/// Complement check over header bytes 0xA0..0xBD.
pub fn header_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(!0x18u8, |acc, b| acc.wrapping_sub(*b))
}

/// Title derived from the program file name: stem, upper-cased.
pub fn default_title(program: &Path) -> String {
    program
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

/// Cut `title` to the header's field, never splitting a character.
/// Returns `None` when it already fits.
pub fn truncate_title(title: &str) -> Option<String> {
    if title.len() <= TITLE_LENGTH {
        return None;
    }
    let mut end = TITLE_LENGTH;
    while !title.is_char_boundary(end) {
        end -= 1;
    }
    Some(title[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestElf {
        machine: u16,
        /// Address the section runs at.
        vma: u32,
        /// Address the section is loaded from.
        lma: u32,
        text: Vec<u8>,
        symbols: Vec<(&'static str, u32)>,
    }

    impl TestElf {
        fn rom(text: Vec<u8>) -> Self {
            Self {
                machine: EM_ARM,
                vma: ROM_START,
                lma: ROM_START,
                text,
                symbols: vec![("_start", ROM_START), ("rom_header_end", ROM_START + 0xC0)],
            }
        }

        /// A minimal ELF32 executable: one PT_LOAD segment and the sections
        /// .text, .symtab, .strtab, .shstrtab.
        fn build(&self) -> Vec<u8> {
            fn align4(n: usize) -> usize {
                (n + 3) & !3
            }
            fn u16le(out: &mut Vec<u8>, v: u16) {
                out.extend_from_slice(&v.to_le_bytes());
            }
            fn u32le(out: &mut Vec<u8>, v: u32) {
                out.extend_from_slice(&v.to_le_bytes());
            }

            let mut strtab = vec![0u8];
            let mut symtab = vec![0u8; 16];
            for (name, value) in &self.symbols {
                let name_off = strtab.len() as u32;
                strtab.extend_from_slice(name.as_bytes());
                strtab.push(0);
                u32le(&mut symtab, name_off);
                u32le(&mut symtab, *value);
                u32le(&mut symtab, 0);
                symtab.push(0x10); // STB_GLOBAL, STT_NOTYPE
                symtab.push(0);
                u16le(&mut symtab, 1); // .text
            }
            let shstrtab = b"\0.text\0.symtab\0.strtab\0.shstrtab\0".to_vec();

            let text_off = 0x100usize;
            let symtab_off = align4(text_off + self.text.len());
            let strtab_off = symtab_off + symtab.len();
            let shstrtab_off = strtab_off + strtab.len();
            let shoff = align4(shstrtab_off + shstrtab.len());

            let mut out = Vec::new();
            out.extend_from_slice(&[0x7F, b'E', b'L', b'F', 1, 1, 1, 0]);
            out.extend_from_slice(&[0; 8]);
            u16le(&mut out, ET_EXEC);
            u16le(&mut out, self.machine);
            u32le(&mut out, 1);
            u32le(&mut out, self.vma);
            u32le(&mut out, 52); // e_phoff
            u32le(&mut out, shoff as u32);
            u32le(&mut out, 0x0500_0000);
            u16le(&mut out, 52);
            u16le(&mut out, 32);
            u16le(&mut out, 1);
            u16le(&mut out, 40);
            u16le(&mut out, 5);
            u16le(&mut out, 4);

            // PT_LOAD
            u32le(&mut out, 1);
            u32le(&mut out, text_off as u32);
            u32le(&mut out, self.vma);
            u32le(&mut out, self.lma);
            u32le(&mut out, self.text.len() as u32);
            u32le(&mut out, self.text.len() as u32);
            u32le(&mut out, 5);
            u32le(&mut out, 4);

            out.resize(text_off, 0);
            out.extend_from_slice(&self.text);
            out.resize(symtab_off, 0);
            out.extend_from_slice(&symtab);
            out.extend_from_slice(&strtab);
            out.extend_from_slice(&shstrtab);
            out.resize(shoff, 0);

            let mut section = |name: u32,
                               kind: u32,
                               flags: u32,
                               addr: u32,
                               offset: usize,
                               size: usize,
                               link: u32,
                               info: u32,
                               entsize: u32| {
                for v in [
                    name,
                    kind,
                    flags,
                    addr,
                    offset as u32,
                    size as u32,
                    link,
                    info,
                    4,
                    entsize,
                ] {
                    u32le(&mut out, v);
                }
            };
            section(0, 0, 0, 0, 0, 0, 0, 0, 0);
            section(1, 1, 0x6, self.vma, text_off, self.text.len(), 0, 0, 0);
            section(7, 2, 0, 0, symtab_off, symtab.len(), 3, 1, 16);
            section(15, 3, 0, 0, strtab_off, strtab.len(), 0, 0, 0);
            section(23, 3, 0, 0, shstrtab_off, shstrtab.len(), 0, 0, 0);
            out
        }
    }

    fn program(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    #[test]
    fn test_make_rom_lays_out_and_patches_header() {
        let text = program(0xD0);
        let elf = TestElf::rom(text.clone()).build();
        let info = RomInfo {
            title: "HELLO".to_string(),
            ..RomInfo::default()
        };

        let image = make_rom(&elf, &info).unwrap();

        assert_eq!(image.len(), 0xD0);
        // Entry branch and code past the header survive
        assert_eq!(&image[0..4], &text[0..4]);
        assert_eq!(&image[0xC0..], &text[0xC0..]);
        assert_eq!(&image[4..4 + LOGO.len()], &LOGO[..]);
        assert_eq!(&image[0xA0..0xA5], b"HELLO");
        assert_eq!(&image[0xA5..0xB0], &[0u8; 11]);
        assert_eq!(&image[0xB0..0xB3], &[b'0', b'1', 0x96]);
        assert_eq!(image[0xBD], header_checksum(&image[0xA0..0xBD]));
    }

    #[test]
    fn test_sections_are_placed_at_load_address() {
        let mut layout = TestElf::rom(program(0xC8));
        layout.vma = 0x0300_0000;
        let elf_bytes = layout.build();
        let elf = Elf::parse(&elf_bytes).unwrap();

        let sections = map_sections(&elf, elf_bytes.len()).unwrap();

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, ".text");
        assert_eq!(sections[0].lma, ROM_START as u64);
        assert_eq!(image_extent(&sections).unwrap(), (ROM_START as u64, 0xC8));
    }

    #[test]
    fn test_rejects_wrong_machine() {
        let mut layout = TestElf::rom(program(0xC8));
        layout.machine = 3; // EM_386
        let err = make_rom(&layout.build(), &RomInfo::default()).unwrap_err();
        assert!(matches!(err, RomError::WrongMachine(_)), "{err}");
    }

    #[test]
    fn test_rejects_data_below_rom() {
        let mut layout = TestElf::rom(program(0xC8));
        layout.lma = 0x0200_0000;
        let err = make_rom(&layout.build(), &RomInfo::default()).unwrap_err();
        assert!(matches!(err, RomError::BelowRomStart { .. }), "{err}");
    }

    #[test]
    fn test_reports_missing_symbols() {
        let mut layout = TestElf::rom(program(0xC8));
        layout.symbols = vec![("_start", ROM_START)];
        let err = make_rom(&layout.build(), &RomInfo::default()).unwrap_err();
        assert_eq!(err.to_string(), "required symbols do not exist: rom_header_end");
    }

    #[test]
    fn test_reports_misplaced_symbol() {
        let mut layout = TestElf::rom(program(0xC8));
        layout.symbols = vec![("_start", ROM_START), ("rom_header_end", ROM_START + 0xC4)];
        let err = make_rom(&layout.build(), &RomInfo::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "symbol rom_header_end has address 0x80000c4, should be 0x80000c0"
        );
    }

    #[test]
    fn test_custom_symbol_names() {
        let mut layout = TestElf::rom(program(0xC8));
        layout.symbols = vec![("__start", ROM_START), ("__header_end", ROM_START + 0xC0)];
        let info = RomInfo {
            title: String::new(),
            symbols: RequiredSymbols {
                entry: "__start".to_string(),
                header_end: "__header_end".to_string(),
            },
        };
        assert!(make_rom(&layout.build(), &info).is_ok());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            make_rom(b"not an elf", &RomInfo::default()),
            Err(RomError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_and_oversized_extent() {
        assert!(matches!(image_extent(&[]), Err(RomError::NoProgramData)));
        let huge = PlacedSection {
            name: ".rodata".to_string(),
            lma: ROM_START as u64,
            offset: 0,
            size: MAX_SIZE as usize + 1,
        };
        assert!(matches!(
            image_extent(&[huge]),
            Err(RomError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_patch_header_pads_short_images() {
        let mut image = vec![0xEA; 8];
        patch_header(&mut image, "A VERY LONG TITLE");
        assert_eq!(image.len(), HEADER_LENGTH);
        assert_eq!(&image[0..4], &[0xEA; 4]);
        assert_eq!(&image[0xA0..0xAC], b"A VERY LONG ");
        assert_eq!(image[0xAC], 0);
    }

    #[test]
    fn test_header_checksum() {
        let mut header = [0u8; 0x1D];
        header[0x10] = b'0';
        header[0x11] = b'1';
        header[0x12] = 0x96;
        assert_eq!(header_checksum(&header), 0xF0);
        assert_eq!(header_checksum(&[]), 0xE7);
    }

    #[test]
    fn test_titles() {
        assert_eq!(default_title(Path::new("out/hello.elf")), "HELLO");
        assert_eq!(default_title(Path::new("gbajam-firmware")), "GBAJAM-FIRMWARE");
        assert_eq!(truncate_title("SHORT"), None);
        assert_eq!(
            truncate_title("GBAJAM-FIRMWARE").as_deref(),
            Some("GBAJAM-FIRMW")
        );
        // 11 ASCII bytes then a two-byte character straddling the limit
        assert_eq!(truncate_title("ABCDEFGHIJKÉ").as_deref(), Some("ABCDEFGHIJK"));
    }
}
