use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Size of one ROM bank in bytes.
pub const BANK_SIZE: usize = 0x0800;
/// Size of the assembled ROM image (four banks).
pub const ROM_IMAGE_SIZE: usize = 4 * BANK_SIZE;

/// The four 2 KiB ROM banks and their load addresses, highest bank first
/// as they shipped on the board.
pub const BANKS: [(&str, usize); 4] = [
    ("invaders.h", 0x0000),
    ("invaders.g", 0x0800),
    ("invaders.f", 0x1000),
    ("invaders.e", 0x1800),
];

/// ROM set loading failures. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum RomError {
    #[error("failed to read ROM bank {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ROM bank {path:?} is {len} bytes, expected {expected}")]
    WrongSize {
        path: PathBuf,
        len: usize,
        expected: usize,
    },
}

/// Assemble the 8 KiB ROM image from the four bank files in `dir`.
pub fn load_rom_set(dir: &Path) -> Result<Vec<u8>, RomError> {
    let mut image = vec![0u8; ROM_IMAGE_SIZE];

    for (name, base) in BANKS {
        let path = dir.join(name);
        let data = fs::read(&path).map_err(|source| RomError::Io {
            path: path.clone(),
            source,
        })?;
        if data.len() != BANK_SIZE {
            return Err(RomError::WrongSize {
                path,
                len: data.len(),
                expected: BANK_SIZE,
            });
        }
        image[base..base + BANK_SIZE].copy_from_slice(&data);
        log::info!("loaded {} at {:#06x}", name, base);
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a scratch directory containing the four bank files, each
    /// filled with a distinct marker byte.
    fn write_rom_set(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("invaders_rom_{}_{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        for (index, (name, _)) in BANKS.iter().enumerate() {
            fs::write(dir.join(name), vec![index as u8 + 1; BANK_SIZE]).unwrap();
        }
        dir
    }

    #[test]
    fn assembles_banks_in_order() {
        let dir = write_rom_set("ok");
        let image = load_rom_set(&dir).unwrap();
        assert_eq!(image.len(), ROM_IMAGE_SIZE);
        assert_eq!(image[0x0000], 1); // invaders.h
        assert_eq!(image[0x0800], 2); // invaders.g
        assert_eq!(image[0x1000], 3); // invaders.f
        assert_eq!(image[0x1fff], 4); // invaders.e
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_bank_is_an_io_error() {
        let dir = write_rom_set("missing");
        fs::remove_file(dir.join("invaders.f")).unwrap();
        match load_rom_set(&dir) {
            Err(RomError::Io { path, .. }) => {
                assert!(path.ends_with("invaders.f"));
            }
            other => panic!("expected Io error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn short_bank_is_a_size_error() {
        let dir = write_rom_set("short");
        fs::write(dir.join("invaders.e"), vec![0u8; 100]).unwrap();
        match load_rom_set(&dir) {
            Err(RomError::WrongSize { len, expected, .. }) => {
                assert_eq!(len, 100);
                assert_eq!(expected, BANK_SIZE);
            }
            other => panic!("expected WrongSize error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&dir);
    }
}
