use super::*;

impl DirEntry {
    pub fn new(name: &str, inode: u32) -> Self {
        let mut entry = Self {
            name: [0; MAX_NAME],
            inode,
        };
        let bytes = name.as_bytes();
        entry.name[..bytes.len()].copy_from_slice(bytes);
        entry
    }

    /// Name up to the terminating NUL
    pub fn name(&self) -> &str {
        let end = self
            .name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(MAX_NAME);
        std::str::from_utf8(&self.name[..end]).unwrap_or_default()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name() == name
    }

    /// A removed entry: bytes zeroed but still counted by the parent's size
    pub fn is_tombstone(&self) -> bool {
        self.name[0] == 0
    }

    /// Decode slot `slot` of a raw directory sector
    pub fn decode(buffer: &[u8; SECTOR_SIZE], slot: usize) -> Self {
        let offset = slot * DIRENT_SIZE;
        bytemuck::pod_read_unaligned(&buffer[offset..offset + DIRENT_SIZE])
    }

    /// Encode this entry into slot `slot` of a raw directory sector
    pub fn encode(&self, buffer: &mut [u8; SECTOR_SIZE], slot: usize) {
        let offset = slot * DIRENT_SIZE;
        buffer[offset..offset + DIRENT_SIZE].copy_from_slice(bytemuck::bytes_of(self));
    }
}

#[cfg(test)]
mod tests {
    use super::{DirEntry, DIRENT_SIZE, SECTOR_SIZE};

    #[test]
    fn size() {
        assert_eq!(DIRENT_SIZE, 20);
    }

    #[test]
    fn name_round_trip() {
        let entry = DirEntry::new("notes.txt", 42);
        assert_eq!(entry.name(), "notes.txt");
        assert_eq!(entry.inode, 42);
        assert!(entry.matches("notes.txt"));
        assert!(!entry.matches("notes.tx"));
        assert!(!entry.matches("notes.txt2"));
        assert!(!entry.is_tombstone());
    }

    #[test]
    fn longest_legal_name() {
        let entry = DirEntry::new("fifteen-chars.x", 1);
        assert_eq!(entry.name().len(), 15);
        assert_eq!(entry.name[15], 0);
    }

    #[test]
    fn sector_slots() {
        let mut buffer = [0u8; SECTOR_SIZE];
        DirEntry::new("a", 1).encode(&mut buffer, 0);
        DirEntry::new("b", 2).encode(&mut buffer, 24);
        assert_eq!(DirEntry::decode(&buffer, 0).name(), "a");
        assert_eq!(DirEntry::decode(&buffer, 24).inode, 2);
        let tombstone = DirEntry::decode(&buffer, 1);
        assert!(tombstone.is_tombstone());
        assert_eq!(tombstone.inode, 0);
    }
}
