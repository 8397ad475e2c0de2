use log::debug;

use super::*;
use crate::{Disk, Error};

/// Inode allocation bitmap: bit `i` set iff inode `i` is allocated
pub const INODE_BITMAP: Bitmap = Bitmap {
    start: INODE_BITMAP_START,
    sectors: INODE_BITMAP_SECTORS,
    capacity: MAX_FILES as u32,
};

/// Sector allocation bitmap: bit `s` set iff sector `s` is in use
pub const SECTOR_BITMAP: Bitmap = Bitmap {
    start: SECTOR_BITMAP_START,
    sectors: SECTOR_BITMAP_SECTORS,
    capacity: TOTAL_SECTORS as u32,
};

const BITS_PER_SECTOR: u32 = (SECTOR_SIZE * 8) as u32;
/// Leading-ones byte patterns, indexed by bit count
const HEAD_BITS: [u8; 8] = [0x00, 0x80, 0xc0, 0xe0, 0xf0, 0xf8, 0xfc, 0xfe];

impl Bitmap {
    /// Write the whole region so the first `reserved` bits are 1 and the
    /// rest are 0
    pub fn initialize(&self, disk: &mut Disk, reserved: u32) -> Result<(), Error> {
        debug!(
            "Initialize bitmap at sector {}, {} sectors, {reserved} bits reserved",
            self.start, self.sectors
        );
        let full_bytes = (reserved / 8) as usize;
        for index in 0..self.sectors {
            let mut buffer = [0u8; SECTOR_SIZE];
            let base = index as usize * SECTOR_SIZE;
            for (offset, byte) in buffer.iter_mut().enumerate() {
                let position = base + offset;
                if position < full_bytes {
                    *byte = 0xff;
                } else if position == full_bytes {
                    *byte = HEAD_BITS[(reserved % 8) as usize];
                }
            }
            disk.write_sector(self.start + index, &buffer)?;
        }
        Ok(())
    }

    /// Flip the first zero bit to one and return its index
    /// Fails with no-space when every valid bit is already set
    pub fn allocate(&self, disk: &mut Disk) -> Result<u32, Error> {
        for index in 0..self.sectors {
            let mut buffer = disk.read_sector(self.start + index)?;
            for (offset, byte) in buffer.iter_mut().enumerate() {
                if *byte == 0xff {
                    continue;
                }
                for bit in 0..8u32 {
                    let mask = 0x80u8 >> bit;
                    if *byte & mask != 0 {
                        continue;
                    }
                    let found = (index * BITS_PER_SECTOR) + (offset as u32 * 8) + bit;
                    // A zero past capacity lives in the rounded-up padding,
                    // which means every valid bit is taken
                    if found >= self.capacity {
                        return Err(Error::NoSpace);
                    }
                    *byte |= mask;
                    disk.write_sector(self.start + index, &buffer)?;
                    return Ok(found);
                }
            }
        }
        Err(Error::NoSpace)
    }

    /// Clear bit `index`
    pub fn free(&self, disk: &mut Disk, index: u32) -> Result<(), Error> {
        if index >= self.capacity {
            return Err(Error::General);
        }
        let sector = self.start + index / BITS_PER_SECTOR;
        let byte = (index / 8) as usize % SECTOR_SIZE;
        let mut buffer = disk.read_sector(sector)?;
        buffer[byte] &= !(0x80 >> (index % 8));
        disk.write_sector(sector, &buffer)
    }

    /// Read bit `index`
    pub fn get(&self, disk: &Disk, index: u32) -> Result<bool, Error> {
        if index >= self.capacity {
            return Err(Error::General);
        }
        let sector = self.start + index / BITS_PER_SECTOR;
        let byte = (index / 8) as usize % SECTOR_SIZE;
        let buffer = disk.read_sector(sector)?;
        Ok(buffer[byte] & (0x80 >> (index % 8)) != 0)
    }
}
