mod bitmap;
mod dirent;
mod inode;
mod superblock;

pub use bitmap::{INODE_BITMAP, SECTOR_BITMAP};
pub use inode::InodeCache;

/// Sector size in bytes, the unit of disk I/O
pub const SECTOR_SIZE: usize = 512;
/// Total sector count of the virtual disk
pub const TOTAL_SECTORS: usize = 10_000;
/// Whole-image size in bytes
pub const DISK_BYTES: usize = TOTAL_SECTORS * SECTOR_SIZE;

/// Maximum number of files and directories (inode table slots)
pub const MAX_FILES: usize = 1_000;
/// Maximum data sectors per file
pub const MAX_SECTORS_PER_FILE: usize = 30;
/// Maximum file size in bytes
pub const MAX_FILE_BYTES: usize = MAX_SECTORS_PER_FILE * SECTOR_SIZE;
/// Maximum name length, including the terminating NUL
pub const MAX_NAME: usize = 16;
/// Maximum absolute path length, including the terminating NUL
pub const MAX_PATH: usize = 256;
/// Maximum simultaneously open files
pub const MAX_OPEN_FILES: usize = 256;

/// Magic integer at the start of the superblock
pub const MAGIC: u32 = 0xdead_beef;

// The disk is partitioned into five regions in this order: superblock,
// inode bitmap, sector bitmap, inode table, data. Offsets are fixed at
// build time from the parameters above.

pub const SUPERBLOCK_SECTOR: u32 = 0;

pub const INODE_BITMAP_START: u32 = 1;
pub const INODE_BITMAP_SECTORS: u32 = sectors_for((MAX_FILES + 7) / 8) as u32;

pub const SECTOR_BITMAP_START: u32 = INODE_BITMAP_START + INODE_BITMAP_SECTORS;
pub const SECTOR_BITMAP_SECTORS: u32 = sectors_for((TOTAL_SECTORS + 7) / 8) as u32;

pub const INODE_SIZE: usize = std::mem::size_of::<Inode>();
/// Inodes never straddle a sector boundary; the sector tail is padding
pub const INODES_PER_SECTOR: usize = SECTOR_SIZE / INODE_SIZE;
pub const INODE_TABLE_START: u32 = SECTOR_BITMAP_START + SECTOR_BITMAP_SECTORS;
pub const INODE_TABLE_SECTORS: u32 =
    ((MAX_FILES + INODES_PER_SECTOR - 1) / INODES_PER_SECTOR) as u32;

/// First sector of the data region; everything below is reserved metadata
pub const DATA_REGION_START: u32 = INODE_TABLE_START + INODE_TABLE_SECTORS;

pub const DIRENT_SIZE: usize = std::mem::size_of::<DirEntry>();
pub const DIRENTS_PER_SECTOR: usize = SECTOR_SIZE / DIRENT_SIZE;
/// Entry count ceiling for one directory
pub const MAX_DIRENTS: usize = MAX_SECTORS_PER_FILE * DIRENTS_PER_SECTOR;

/// Inode id of the root directory, allocated at format time
pub const ROOT_INODE: u32 = 0;

const fn sectors_for(bytes: usize) -> usize {
    (bytes + SECTOR_SIZE - 1) / SECTOR_SIZE
}

/// On-disk metadata record for one file or directory. `data` holds data
/// sector ids: `data[0..⌈size/SECTOR_SIZE⌉]` for files,
/// `data[0..⌈size/DIRENTS_PER_SECTOR⌉]` for directories.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Inode {
    /// Payload bytes for files, entry count for directories
    pub size: u32,
    /// 0 for a regular file, 1 for a directory
    pub kind: u32,
    pub data: [u32; MAX_SECTORS_PER_FILE],
}

/// Fixed-size entry inside a directory's data sectors
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirEntry {
    /// NUL-terminated name, at most `MAX_NAME - 1` bytes
    pub name: [u8; MAX_NAME],
    pub inode: u32,
}

/// A contiguous run of sectors interpreted as a flat MSB-first bit array
#[derive(Debug, Clone, Copy)]
pub struct Bitmap {
    pub start: u32,
    pub sectors: u32,
    /// Valid bit indexes are `0..capacity`; the rounded-up remainder is padding
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub magic: u32,
}
