use std::fmt::Debug;
use std::io::{Read, Write};
use std::path::Path;

use log::debug;

use crate::structs::{DISK_BYTES, SECTOR_SIZE, TOTAL_SECTORS};
use crate::Error;

/// Simulated block device: the whole image lives in memory and is persisted
/// to the backstore file only on [`save`](Disk::save).
pub struct Disk {
    image: Vec<u8>,
}

impl Disk {
    /// Fresh zero-filled disk
    pub fn new() -> Self {
        Self {
            image: vec![0; DISK_BYTES],
        }
    }

    /// Load a disk image from the backstore file
    /// The file must be exactly [`DISK_BYTES`] long
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut file = std::fs::File::open(path.as_ref())?;
        let length = file.metadata()?.len();
        if length != DISK_BYTES as u64 {
            debug!(
                "Backstore is {length} bytes, expected {DISK_BYTES}: {}",
                path.as_ref().display()
            );
            return Err(Error::General);
        }
        let mut image = vec![0; DISK_BYTES];
        file.read_exact(&mut image)?;
        Ok(Self { image })
    }

    /// Save the disk image to the backstore file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut file = std::fs::File::create(path.as_ref())?;
        file.write_all(&self.image)?;
        file.sync_all()?;
        Ok(())
    }

    /// Read one whole sector
    pub fn read_sector(&self, sector: u32) -> Result<[u8; SECTOR_SIZE], Error> {
        let start = Self::position(sector)?;
        let mut buffer = [0u8; SECTOR_SIZE];
        buffer.copy_from_slice(&self.image[start..start + SECTOR_SIZE]);
        Ok(buffer)
    }

    /// Write one whole sector
    pub fn write_sector(&mut self, sector: u32, buffer: &[u8; SECTOR_SIZE]) -> Result<(), Error> {
        let start = Self::position(sector)?;
        self.image[start..start + SECTOR_SIZE].copy_from_slice(buffer);
        Ok(())
    }

    fn position(sector: u32) -> Result<usize, Error> {
        if (sector as usize) < TOTAL_SECTORS {
            Ok(sector as usize * SECTOR_SIZE)
        } else {
            Err(Error::General)
        }
    }
}

impl Default for Disk {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Disk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disk")
            .field("sectors", &TOTAL_SECTORS)
            .field("sector_size", &SECTOR_SIZE)
            .finish()
    }
}
