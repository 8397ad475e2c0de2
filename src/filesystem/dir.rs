use log::debug;

use super::Filesystem;
use crate::structs::*;
use crate::Error;

impl Filesystem {
    /// Byte count of a directory's entry table, tombstones included
    pub fn dir_size(&self, path: &str) -> Result<usize, Error> {
        let resolution = self.resolve(path).map_err(|_| Error::NoSuchDir)?;
        let child = resolution.child.ok_or(Error::NoSuchDir)?;
        let inode = Inode::load(&self.disk, child)?;
        if !inode.is_directory() {
            return Err(Error::NoSuchDir);
        }
        Ok(inode.size as usize * DIRENT_SIZE)
    }

    /// Copy all counted entries into `buffer` and return the entry count.
    /// Callers size the buffer with [`dir_size`](Self::dir_size) first.
    pub fn read_dir(&self, path: &str, buffer: &mut [u8]) -> Result<usize, Error> {
        let resolution = self.resolve(path).map_err(|_| Error::NoSuchDir)?;
        let child = resolution.child.ok_or(Error::NoSuchDir)?;
        let inode = Inode::load(&self.disk, child)?;
        if !inode.is_directory() {
            return Err(Error::NoSuchDir);
        }
        let count = (inode.size as usize).min(MAX_DIRENTS);
        if buffer.len() < count * DIRENT_SIZE {
            return Err(Error::BufferTooSmall);
        }
        let full_groups = count / DIRENTS_PER_SECTOR;
        let mut position = 0;
        for group in 0..full_groups {
            let sector = self.disk.read_sector(inode.data[group])?;
            let span = DIRENTS_PER_SECTOR * DIRENT_SIZE;
            buffer[position..position + span].copy_from_slice(&sector[..span]);
            position += span;
        }
        let tail = count % DIRENTS_PER_SECTOR;
        if tail > 0 {
            let sector = self.disk.read_sector(inode.data[full_groups])?;
            let span = tail * DIRENT_SIZE;
            buffer[position..position + span].copy_from_slice(&sector[..span]);
        }
        Ok(count)
    }

    /// Append one entry at the parent's tail slot, spilling into a freshly
    /// allocated sector when the current group is full. The entry sector is
    /// persisted before the parent inode that references it.
    pub(crate) fn dir_append(&mut self, parent: u32, name: &str, child: u32) -> Result<(), Error> {
        let mut inode = Inode::load(&self.disk, parent)?;
        if !inode.is_directory() {
            return Err(Error::General);
        }
        let size = inode.size as usize;
        if size == MAX_DIRENTS {
            debug!("Directory inode {parent} is full");
            return Err(Error::NoSpace);
        }
        let group = size / DIRENTS_PER_SECTOR;
        let slot = size % DIRENTS_PER_SECTOR;
        let mut buffer;
        if slot == 0 {
            let sector = self.acquire_sector()?;
            debug!("New sector {sector} for dirent group {group} of inode {parent}");
            inode.data[group] = sector;
            buffer = [0u8; SECTOR_SIZE];
        } else {
            buffer = self.disk.read_sector(inode.data[group])?;
        }
        DirEntry::new(name, child).encode(&mut buffer, slot);
        self.disk.write_sector(inode.data[group], &buffer)?;
        inode.size += 1;
        inode.store(&mut self.disk, parent)
    }

    /// Tombstone the entry referencing `child`: its bytes are zeroed but
    /// the parent's size is not decremented and no sector is reclaimed
    pub(crate) fn dir_remove_entry(&mut self, parent: u32, child: u32) -> Result<(), Error> {
        let inode = Inode::load(&self.disk, parent)?;
        if !inode.is_directory() {
            return Err(Error::General);
        }
        // size never exceeds MAX_DIRENTS on a well-formed image
        let mut remaining = (inode.size as usize).min(MAX_DIRENTS);
        let mut group = 0;
        while remaining > 0 {
            let sector = inode.data[group];
            let mut buffer = self.disk.read_sector(sector)?;
            for slot in 0..remaining.min(DIRENTS_PER_SECTOR) {
                let entry = DirEntry::decode(&buffer, slot);
                if entry.inode == child && !entry.is_tombstone() {
                    debug!("Tombstone entry '{}' in inode {parent}", entry.name());
                    let offset = slot * DIRENT_SIZE;
                    buffer[offset..offset + DIRENT_SIZE].fill(0);
                    return self.disk.write_sector(sector, &buffer);
                }
            }
            remaining = remaining.saturating_sub(DIRENTS_PER_SECTOR);
            group += 1;
        }
        debug!("Inode {child} has no entry in inode {parent}");
        Err(Error::General)
    }
}

#[cfg(test)]
mod tests {
    use super::Filesystem;
    use crate::structs::{DirEntry, Inode, DIRENTS_PER_SECTOR, DIRENT_SIZE, ROOT_INODE};
    use crate::Error;

    fn entries(fs: &Filesystem, path: &str) -> Vec<DirEntry> {
        let bytes = fs.dir_size(path).unwrap();
        let mut buffer = vec![0u8; bytes];
        let count = fs.read_dir(path, &mut buffer).unwrap();
        (0..count)
            .map(|i| bytemuck::pod_read_unaligned(&buffer[i * DIRENT_SIZE..(i + 1) * DIRENT_SIZE]))
            .collect()
    }

    #[test]
    fn append_keeps_insertion_order() {
        let mut fs = Filesystem::formatted();
        fs.create_file("/one").unwrap();
        fs.create_file("/two").unwrap();
        fs.create_dir("/three").unwrap();
        let listed = entries(&fs, "/");
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].name(), "one");
        assert_eq!(listed[1].name(), "two");
        assert_eq!(listed[2].name(), "three");
        assert_eq!(listed[1].inode, 2);
    }

    #[test]
    fn entries_spill_into_a_second_sector() {
        let mut fs = Filesystem::formatted();
        for index in 0..DIRENTS_PER_SECTOR + 1 {
            fs.create_file(&format!("/f{index}")).unwrap();
        }
        let root = Inode::load(&fs.disk, ROOT_INODE).unwrap();
        assert_eq!(root.size as usize, DIRENTS_PER_SECTOR + 1);
        assert_eq!(root.dirent_sectors(), 2);
        assert_ne!(root.data[0], root.data[1]);
        let listed = entries(&fs, "/");
        assert_eq!(listed[DIRENTS_PER_SECTOR].name(), "f25");
        // the fresh sector was zeroed past the single live entry
        let tail = fs.disk.read_sector(root.data[1]).unwrap();
        assert!(tail[DIRENT_SIZE..].iter().all(|b| *b == 0));
    }

    #[test]
    fn remove_leaves_a_tombstone() {
        let mut fs = Filesystem::formatted();
        fs.create_file("/one").unwrap();
        fs.create_file("/two").unwrap();
        let before = Inode::load(&fs.disk, ROOT_INODE).unwrap();
        fs.unlink_file("/one").unwrap();
        let after = Inode::load(&fs.disk, ROOT_INODE).unwrap();
        assert_eq!(after.size, before.size);
        assert_eq!(after.data[0], before.data[0]);
        let listed = entries(&fs, "/");
        assert!(listed[0].is_tombstone());
        assert_eq!(listed[0].inode, 0);
        assert_eq!(listed[1].name(), "two");
    }

    #[test]
    fn read_dir_needs_a_large_enough_buffer() {
        let mut fs = Filesystem::formatted();
        fs.create_file("/one").unwrap();
        fs.create_file("/two").unwrap();
        let mut small = [0u8; DIRENT_SIZE];
        assert!(matches!(
            fs.read_dir("/", &mut small),
            Err(Error::BufferTooSmall)
        ));
        let mut exact = [0u8; 2 * DIRENT_SIZE];
        assert_eq!(fs.read_dir("/", &mut exact).unwrap(), 2);
        assert!(matches!(
            fs.read_dir("/missing", &mut exact),
            Err(Error::NoSuchDir)
        ));
    }

    #[test]
    fn remove_of_an_unlisted_inode_fails() {
        let mut fs = Filesystem::formatted();
        fs.create_file("/one").unwrap();
        assert!(fs.dir_remove_entry(ROOT_INODE, 99).is_err());
    }
}
