use log::debug;

use super::{Filesystem, OpenFile};
use crate::structs::*;
use crate::Error;

impl Filesystem {
    /// Open a file and return the lowest free descriptor
    pub fn open(&mut self, path: &str) -> Result<usize, Error> {
        let resolution = self.resolve(path)?;
        let child = resolution.child.ok_or(Error::NoSuchFile)?;
        let inode = Inode::load(&self.disk, child)?;
        if !inode.is_file() {
            return Err(Error::General);
        }
        let fd = self
            .open_files
            .iter()
            .position(|record| record.inode == 0)
            .ok_or(Error::TooManyOpen)?;
        self.open_files[fd] = OpenFile {
            inode: child,
            size: inode.size.min(MAX_FILE_BYTES as u32),
            pos: 0,
        };
        debug!("Opened '{path}' (inode {child}) as fd {fd}");
        Ok(fd)
    }

    pub fn close(&mut self, fd: usize) -> Result<(), Error> {
        let record = self.open_files.get_mut(fd).ok_or(Error::BadDescriptor)?;
        if record.inode == 0 {
            return Err(Error::BadDescriptor);
        }
        debug!("Closed fd {fd}");
        record.inode = 0;
        Ok(())
    }

    /// Whether any descriptor currently refers to `inode`
    pub fn is_open(&self, inode: u32) -> bool {
        self.open_files.iter().any(|record| record.inode == inode)
    }

    /// Read up to `buffer.len()` bytes at the cursor. Returns the bytes
    /// copied, 0 once the cursor sits at end of file.
    pub fn read(&mut self, fd: usize, buffer: &mut [u8]) -> Result<usize, Error> {
        let record = self.record(fd)?;
        let inode = Inode::load(&self.disk, record.inode)?;
        let size = record.size as usize;
        let mut pos = record.pos as usize;
        let mut copied = 0;
        while copied < buffer.len() && pos < size {
            let offset = pos % SECTOR_SIZE;
            let chunk = (SECTOR_SIZE - offset)
                .min(buffer.len() - copied)
                .min(size - pos);
            let sector = self.disk.read_sector(inode.data[pos / SECTOR_SIZE])?;
            buffer[copied..copied + chunk].copy_from_slice(&sector[offset..offset + chunk]);
            copied += chunk;
            pos += chunk;
        }
        self.open_files[fd].pos = pos as u32;
        Ok(copied)
    }

    /// Write the whole buffer at the cursor, extending the file with
    /// freshly allocated sectors as needed. Sectors allocated by a write
    /// that runs out of space are rolled back before the error surfaces.
    pub fn write(&mut self, fd: usize, buffer: &[u8]) -> Result<usize, Error> {
        let record = self.record(fd)?;
        let pos = record.pos as usize;
        if pos + buffer.len() > MAX_FILE_BYTES {
            return Err(Error::FileTooBig);
        }
        let mut inode = Inode::load(&self.disk, record.inode)?;
        let allocated = (record.size as usize + SECTOR_SIZE - 1) / SECTOR_SIZE;
        let needed = (pos + buffer.len() + SECTOR_SIZE - 1) / SECTOR_SIZE;
        let mut fresh = Vec::new();
        for index in allocated..needed {
            match self.acquire_sector() {
                Ok(sector) => {
                    inode.data[index] = sector;
                    fresh.push(sector);
                }
                Err(_) => {
                    debug!("Disk full mid-write, rolling back {} sectors", fresh.len());
                    for sector in fresh {
                        let _ = self.release_sector(sector);
                    }
                    return Err(Error::NoSpace);
                }
            }
        }
        inode.size = (pos + buffer.len()) as u32;
        inode.store(&mut self.disk, record.inode)?;
        let mut written = 0;
        let mut cursor = pos;
        while written < buffer.len() {
            let offset = cursor % SECTOR_SIZE;
            let chunk = (SECTOR_SIZE - offset).min(buffer.len() - written);
            let id = inode.data[cursor / SECTOR_SIZE];
            let mut sector = self.disk.read_sector(id)?;
            sector[offset..offset + chunk].copy_from_slice(&buffer[written..written + chunk]);
            self.disk.write_sector(id, &sector)?;
            written += chunk;
            cursor += chunk;
        }
        self.open_files[fd].size = inode.size;
        self.open_files[fd].pos = cursor as u32;
        Ok(buffer.len())
    }

    /// Move the cursor to an absolute offset within `[0, size]`
    pub fn seek(&mut self, fd: usize, offset: i64) -> Result<(), Error> {
        let record = self.record(fd)?;
        if offset < 0 || offset > record.size as i64 {
            return Err(Error::SeekOutOfBounds);
        }
        self.open_files[fd].pos = offset as u32;
        Ok(())
    }

    fn record(&self, fd: usize) -> Result<OpenFile, Error> {
        match self.open_files.get(fd) {
            Some(record) if record.inode != 0 => Ok(*record),
            _ => Err(Error::BadDescriptor),
        }
    }
}
