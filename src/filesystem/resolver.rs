use log::debug;

use super::Filesystem;
use crate::structs::*;
use crate::Error;

/// Outcome of following an absolute path: the parent of the final
/// component, the component's inode when it exists, and its name.
/// `/` resolves to parent 0 and child 0: the parent of root is root itself.
#[derive(Debug)]
pub(crate) struct Resolution {
    pub(crate) parent: u32,
    pub(crate) child: Option<u32>,
    pub(crate) name: String,
}

/// Legal names are 1 to `MAX_NAME - 1` bytes of letters, digits, dots,
/// dashes and underscores
pub(crate) fn legal_name(name: &str) -> bool {
    (1..MAX_NAME).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
}

impl Filesystem {
    /// Follow an absolute path component by component. Consecutive
    /// separators collapse; every component must satisfy the name grammar
    /// and every non-terminal component must name a directory.
    pub(crate) fn resolve(&self, path: &str) -> Result<Resolution, Error> {
        if !path.starts_with('/') || path.len() > MAX_PATH - 1 {
            debug!("Rejecting path '{path}'");
            return Err(Error::General);
        }
        let mut cache = InodeCache::new();
        let mut parent = ROOT_INODE;
        let mut child = Some(ROOT_INODE);
        let mut name = String::new();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            if !legal_name(component) {
                debug!("Illegal name '{component}' in '{path}'");
                return Err(Error::General);
            }
            // an absent intermediate component cannot serve as a parent
            parent = child.ok_or(Error::General)?;
            child = self.find_child(&mut cache, parent, component)?;
            name.clear();
            name.push_str(component);
        }
        Ok(Resolution {
            parent,
            child,
            name,
        })
    }

    /// Scan one directory for `name` among its counted entries
    fn find_child(
        &self,
        cache: &mut InodeCache,
        parent: u32,
        name: &str,
    ) -> Result<Option<u32>, Error> {
        let inode = cache.inode(&self.disk, parent)?;
        if !inode.is_directory() {
            debug!("Inode {parent} is not a directory");
            return Err(Error::General);
        }
        let mut remaining = (inode.size as usize).min(MAX_DIRENTS);
        let mut group = 0;
        while remaining > 0 {
            let buffer = self.disk.read_sector(inode.data[group])?;
            for slot in 0..remaining.min(DIRENTS_PER_SECTOR) {
                let entry = DirEntry::decode(&buffer, slot);
                if !entry.is_tombstone() && entry.matches(name) {
                    // keep the table cache focused on the found child for
                    // the next descent
                    cache.inode(&self.disk, entry.inode)?;
                    return Ok(Some(entry.inode));
                }
            }
            remaining = remaining.saturating_sub(DIRENTS_PER_SECTOR);
            group += 1;
        }
        Ok(None)
    }
}
