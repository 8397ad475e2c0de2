use super::*;
use crate::{Disk, Error};

const KIND_FILE: u32 = 0;
const KIND_DIRECTORY: u32 = 1;

impl Inode {
    pub fn empty(kind: u32) -> Self {
        Self {
            size: 0,
            kind,
            data: [0; MAX_SECTORS_PER_FILE],
        }
    }

    pub fn empty_file() -> Self {
        Self::empty(KIND_FILE)
    }

    pub fn empty_directory() -> Self {
        Self::empty(KIND_DIRECTORY)
    }

    pub fn is_file(&self) -> bool {
        self.kind == KIND_FILE
    }

    pub fn is_directory(&self) -> bool {
        self.kind == KIND_DIRECTORY
    }

    /// Data sectors currently referenced by a file of this size
    pub fn file_sectors(&self) -> usize {
        (self.size as usize + SECTOR_SIZE - 1) / SECTOR_SIZE
    }

    /// Backing sectors currently referenced by a directory of this size
    pub fn dirent_sectors(&self) -> usize {
        (self.size as usize + DIRENTS_PER_SECTOR - 1) / DIRENTS_PER_SECTOR
    }

    /// Inode table sector holding slot `id`
    pub fn table_sector(id: u32) -> u32 {
        INODE_TABLE_START + id / INODES_PER_SECTOR as u32
    }

    /// Byte offset of slot `id` inside its table sector
    pub fn sector_offset(id: u32) -> usize {
        (id as usize % INODES_PER_SECTOR) * INODE_SIZE
    }

    /// Decode slot `id` from a raw table sector
    pub fn decode(buffer: &[u8; SECTOR_SIZE], id: u32) -> Self {
        let offset = Self::sector_offset(id);
        bytemuck::pod_read_unaligned(&buffer[offset..offset + INODE_SIZE])
    }

    /// Read slot `id` straight from the table, no caching
    pub fn load(disk: &Disk, id: u32) -> Result<Self, Error> {
        let buffer = disk.read_sector(Self::table_sector(id))?;
        Ok(Self::decode(&buffer, id))
    }

    /// Write this record into slot `id`, read-modify-writing its sector
    pub fn store(&self, disk: &mut Disk, id: u32) -> Result<(), Error> {
        let sector = Self::table_sector(id);
        let mut buffer = disk.read_sector(sector)?;
        let offset = Self::sector_offset(id);
        buffer[offset..offset + INODE_SIZE].copy_from_slice(bytemuck::bytes_of(self));
        disk.write_sector(sector, &buffer)
    }
}

/// One-sector cache over the inode table. Path resolution descends through
/// many inodes that tend to share table sectors; the cache reloads only
/// when the wanted slot lives elsewhere. Writers bypass it entirely.
#[derive(Debug)]
pub struct InodeCache {
    sector: Option<u32>,
    buffer: [u8; SECTOR_SIZE],
}

impl InodeCache {
    pub fn new() -> Self {
        Self {
            sector: None,
            buffer: [0; SECTOR_SIZE],
        }
    }

    pub fn inode(&mut self, disk: &Disk, id: u32) -> Result<Inode, Error> {
        let sector = Inode::table_sector(id);
        if self.sector != Some(sector) {
            self.buffer = disk.read_sector(sector)?;
            self.sector = Some(sector);
        }
        Ok(Inode::decode(&self.buffer, id))
    }
}

impl Default for InodeCache {
    fn default() -> Self {
        Self::new()
    }
}
