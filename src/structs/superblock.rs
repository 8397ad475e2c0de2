use super::*;
use crate::{Disk, Error};

impl Superblock {
    pub fn new() -> Self {
        Self { magic: MAGIC }
    }

    /// Decode the superblock sector; only the leading magic is meaningful
    pub fn load(disk: &Disk) -> Result<Self, Error> {
        let buffer = disk.read_sector(SUPERBLOCK_SECTOR)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&buffer[0..4]);
        Ok(Self {
            magic: u32::from_ne_bytes(raw),
        })
    }

    /// Write the superblock sector; bytes past the magic stay zero
    pub fn flush(&self, disk: &mut Disk) -> Result<(), Error> {
        let mut buffer = [0u8; SECTOR_SIZE];
        buffer[0..4].copy_from_slice(&self.magic.to_ne_bytes());
        disk.write_sector(SUPERBLOCK_SECTOR, &buffer)
    }

    pub fn verify(disk: &Disk) -> Result<(), Error> {
        if Self::load(disk)?.magic == MAGIC {
            Ok(())
        } else {
            Err(Error::General)
        }
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}
