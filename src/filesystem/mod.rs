use std::path::PathBuf;

use log::{debug, info};

use crate::structs::*;
use crate::{Disk, Error};

mod dir;
mod openfile;
mod resolver;

/// The metadata engine: one virtual disk, its backstore path, and the
/// process-wide open-file table
#[derive(Debug)]
pub struct Filesystem {
    pub(crate) disk: Disk,
    backstore: PathBuf,
    pub(crate) open_files: [OpenFile; MAX_OPEN_FILES],
}

/// One slot of the open-file table. `inode == 0` marks a free slot; inode 0
/// is the root directory and can never be opened as a regular file.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OpenFile {
    pub(crate) inode: u32,
    pub(crate) size: u32,
    pub(crate) pos: u32,
}

impl Filesystem {
    /// Load the image from the backstore, or format a fresh one if the
    /// file does not exist yet
    pub fn boot<P: Into<PathBuf>>(backstore: P) -> Result<Self, Error> {
        let backstore = backstore.into();
        info!("Booting from backstore '{}'", backstore.display());
        let disk = match Disk::load(&backstore) {
            Ok(disk) => {
                Superblock::verify(&disk)?;
                info!("Loaded existing image");
                disk
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Backstore missing, formatting a fresh image");
                let mut disk = Disk::new();
                Self::format(&mut disk)?;
                disk.save(&backstore)?;
                disk
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            disk,
            backstore,
            open_files: [OpenFile::default(); MAX_OPEN_FILES],
        })
    }

    /// Write the five regions of an empty file system: magic, the two
    /// bitmaps with their reserved prefixes, a zeroed inode table, and the
    /// root directory in slot 0
    pub(crate) fn format(disk: &mut Disk) -> Result<(), Error> {
        Superblock::new().flush(disk)?;
        INODE_BITMAP.initialize(disk, 1)?;
        SECTOR_BITMAP.initialize(disk, DATA_REGION_START)?;
        let zero = [0u8; SECTOR_SIZE];
        for index in 0..INODE_TABLE_SECTORS {
            disk.write_sector(INODE_TABLE_START + index, &zero)?;
        }
        Inode::empty_directory().store(disk, ROOT_INODE)?;
        Ok(())
    }

    /// Persist the whole image to the backstore file
    pub fn sync(&mut self) -> Result<(), Error> {
        debug!("Sync image to '{}'", self.backstore.display());
        self.disk.save(&self.backstore)
    }

    pub fn create_file(&mut self, path: &str) -> Result<(), Error> {
        debug!("Create file '{path}'");
        self.create_node(Inode::empty_file(), path)
    }

    pub fn create_dir(&mut self, path: &str) -> Result<(), Error> {
        debug!("Create directory '{path}'");
        self.create_node(Inode::empty_directory(), path)
    }

    /// Shared create: allocate an inode, persist it, then append a
    /// directory entry to the parent. The inode bit is released again if
    /// any later step fails.
    fn create_node(&mut self, inode: Inode, path: &str) -> Result<(), Error> {
        let resolution = self.resolve(path).map_err(|_| Error::Create)?;
        if resolution.child.is_some() {
            debug!("'{path}' already exists");
            return Err(Error::Create);
        }
        let id = self.acquire_inode().map_err(|_| Error::Create)?;
        let appended = inode
            .store(&mut self.disk, id)
            .and_then(|_| self.dir_append(resolution.parent, &resolution.name, id));
        if let Err(e) = appended {
            debug!("Create of '{path}' failed after allocating inode {id}: {e}");
            let _ = self.release_inode(id);
            return Err(Error::Create);
        }
        debug!("Created '{path}' as inode {id}");
        Ok(())
    }

    /// Remove a file: free its data sectors, zero its inode, tombstone the
    /// parent entry, release the inode bit
    pub fn unlink_file(&mut self, path: &str) -> Result<(), Error> {
        debug!("Unlink file '{path}'");
        let resolution = self.resolve(path).map_err(|_| Error::NoSuchFile)?;
        let child = resolution.child.ok_or(Error::NoSuchFile)?;
        if self.is_open(child) {
            return Err(Error::InUse);
        }
        let mut inode = Inode::load(&self.disk, child)?;
        if !inode.is_file() {
            return Err(Error::General);
        }
        for index in 0..inode.file_sectors() {
            self.release_sector(inode.data[index])?;
        }
        inode.size = 0;
        inode.store(&mut self.disk, child)?;
        self.dir_remove_entry(resolution.parent, child)?;
        self.release_inode(child)
    }

    /// Remove an empty directory. A directory whose entries were all
    /// tombstoned still counts them in `size` and is refused.
    pub fn unlink_dir(&mut self, path: &str) -> Result<(), Error> {
        debug!("Unlink directory '{path}'");
        if path == "/" {
            return Err(Error::RootDir);
        }
        let resolution = self.resolve(path).map_err(|_| Error::NoSuchDir)?;
        let child = resolution.child.ok_or(Error::NoSuchDir)?;
        let inode = Inode::load(&self.disk, child)?;
        if !inode.is_directory() {
            return Err(Error::General);
        }
        if inode.size > 0 {
            debug!("Directory '{path}' still counts {} entries", inode.size);
            return Err(Error::NotEmpty);
        }
        self.dir_remove_entry(resolution.parent, child)?;
        self.release_inode(child)
    }

    pub(crate) fn acquire_inode(&mut self) -> Result<u32, Error> {
        let id = INODE_BITMAP.allocate(&mut self.disk)?;
        debug!("Acquired inode {id}");
        Ok(id)
    }

    pub(crate) fn release_inode(&mut self, id: u32) -> Result<(), Error> {
        debug!("Released inode {id}");
        INODE_BITMAP.free(&mut self.disk, id)
    }

    pub(crate) fn acquire_sector(&mut self) -> Result<u32, Error> {
        let id = SECTOR_BITMAP.allocate(&mut self.disk)?;
        debug!("Acquired sector {id}");
        Ok(id)
    }

    pub(crate) fn release_sector(&mut self, id: u32) -> Result<(), Error> {
        debug!("Released sector {id}");
        SECTOR_BITMAP.free(&mut self.disk, id)
    }
}

#[cfg(test)]
impl Filesystem {
    /// In-memory file system with no backstore, for tests
    pub(crate) fn formatted() -> Self {
        let mut disk = Disk::new();
        Self::format(&mut disk).unwrap();
        Self {
            disk,
            backstore: PathBuf::new(),
            open_files: [OpenFile::default(); MAX_OPEN_FILES],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Filesystem, OpenFile};
    use crate::structs::{
        Inode, DATA_REGION_START, INODE_BITMAP, MAX_OPEN_FILES, ROOT_INODE, SECTOR_BITMAP,
    };
    use crate::{Disk, Error};

    #[test]
    fn format_reserves_metadata() {
        let fs = Filesystem::formatted();
        assert!(INODE_BITMAP.get(&fs.disk, ROOT_INODE).unwrap());
        assert!(!INODE_BITMAP.get(&fs.disk, 1).unwrap());
        for sector in 0..DATA_REGION_START {
            assert!(SECTOR_BITMAP.get(&fs.disk, sector).unwrap());
        }
        assert!(!SECTOR_BITMAP.get(&fs.disk, DATA_REGION_START).unwrap());
        let root = Inode::load(&fs.disk, ROOT_INODE).unwrap();
        assert!(root.is_directory());
        assert_eq!(root.size, 0);
    }

    #[test]
    fn fresh_root_is_empty() {
        let fs = Filesystem::formatted();
        assert_eq!(fs.dir_size("/").unwrap(), 0);
        let mut buffer = [0u8; 0];
        assert_eq!(fs.read_dir("/", &mut buffer).unwrap(), 0);
    }

    #[test]
    fn nested_create_and_sizes() {
        let mut fs = Filesystem::formatted();
        fs.create_dir("/a").unwrap();
        fs.create_dir("/a/b").unwrap();
        fs.create_file("/a/b/c").unwrap();
        assert_eq!(fs.dir_size("/a").unwrap(), 20);
        assert_eq!(fs.dir_size("/a/b").unwrap(), 20);
        assert_eq!(fs.dir_size("/").unwrap(), 20);
    }

    #[test]
    fn create_rejects_duplicates_and_missing_parents() {
        let mut fs = Filesystem::formatted();
        fs.create_dir("/a").unwrap();
        assert!(matches!(fs.create_dir("/a"), Err(Error::Create)));
        assert!(matches!(fs.create_file("/a"), Err(Error::Create)));
        assert!(matches!(fs.create_file("/missing/f"), Err(Error::Create)));
        assert!(matches!(fs.create_file("/bad*name"), Err(Error::Create)));
    }

    #[test]
    fn unlink_releases_the_inode_bit() {
        let mut fs = Filesystem::formatted();
        fs.create_file("/f").unwrap();
        assert!(INODE_BITMAP.get(&fs.disk, 1).unwrap());
        fs.unlink_file("/f").unwrap();
        assert!(!INODE_BITMAP.get(&fs.disk, 1).unwrap());
        assert!(matches!(fs.unlink_file("/f"), Err(Error::NoSuchFile)));
    }

    #[test]
    fn unlink_dir_guards() {
        let mut fs = Filesystem::formatted();
        assert!(matches!(fs.unlink_dir("/"), Err(Error::RootDir)));
        assert!(matches!(fs.unlink_dir("/nope"), Err(Error::NoSuchDir)));
        fs.create_file("/f").unwrap();
        assert!(matches!(fs.unlink_dir("/f"), Err(Error::General)));
    }

    #[test]
    fn populated_directory_is_not_removable() {
        let mut fs = Filesystem::formatted();
        fs.create_dir("/a").unwrap();
        fs.create_file("/a/f").unwrap();
        assert!(matches!(fs.unlink_dir("/a"), Err(Error::NotEmpty)));
        // tombstoning the last entry does not decrement size, so the
        // directory stays permanently non-empty
        fs.unlink_file("/a/f").unwrap();
        assert!(matches!(fs.unlink_dir("/a"), Err(Error::NotEmpty)));
        assert_eq!(fs.dir_size("/a").unwrap(), 20);
    }

    #[test]
    fn never_populated_directory_is_removable() {
        let mut fs = Filesystem::formatted();
        fs.create_dir("/a").unwrap();
        fs.create_dir("/a/b").unwrap();
        fs.unlink_dir("/a/b").unwrap();
        assert!(matches!(fs.dir_size("/a/b"), Err(Error::NoSuchDir)));
        assert!(!INODE_BITMAP.get(&fs.disk, 2).unwrap());
    }

    #[test]
    fn create_reuses_released_inodes() {
        let mut fs = Filesystem::formatted();
        fs.create_file("/f").unwrap();
        fs.create_file("/g").unwrap();
        fs.unlink_file("/f").unwrap();
        fs.create_file("/h").unwrap();
        // lowest free slot first
        let mut buffer = [0u8; 60];
        fs.read_dir("/", &mut buffer).unwrap();
        let h = &buffer[40..60];
        assert_eq!(&h[..2], b"h\0");
        assert_eq!(u32::from_ne_bytes(h[16..20].try_into().unwrap()), 1);
    }

    #[test]
    fn boot_formats_then_reloads() {
        let path = std::env::temp_dir().join(format!("sectorfs-boot-{}.img", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let mut fs = Filesystem::boot(&path).unwrap();
            fs.create_dir("/a").unwrap();
            fs.create_file("/a/f").unwrap();
            let fd = fs.open("/a/f").unwrap();
            fs.write(fd, b"persisted").unwrap();
            fs.close(fd).unwrap();
            fs.sync().unwrap();
        }
        let mut fs = Filesystem::boot(&path).unwrap();
        assert_eq!(fs.dir_size("/a").unwrap(), 20);
        let fd = fs.open("/a/f").unwrap();
        let mut buffer = [0u8; 16];
        assert_eq!(fs.read(fd, &mut buffer).unwrap(), 9);
        assert_eq!(&buffer[..9], b"persisted");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn boot_rejects_a_bad_magic() {
        let path = std::env::temp_dir().join(format!("sectorfs-magic-{}.img", std::process::id()));
        std::fs::write(&path, vec![0u8; crate::structs::DISK_BYTES]).unwrap();
        assert!(Filesystem::boot(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn boot_starts_with_an_empty_open_table() {
        let path = std::env::temp_dir().join(format!("sectorfs-table-{}.img", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let fs = Filesystem::boot(&path).unwrap();
        assert!(fs
            .open_files
            .iter()
            .all(|record: &OpenFile| record.inode == 0));
        assert_eq!(fs.open_files.len(), MAX_OPEN_FILES);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unformatted_disk_fails_verification() {
        let disk = Disk::new();
        assert!(crate::structs::Superblock::verify(&disk).is_err());
    }
}
