use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// The identity a scan runs as: effective uid/gid plus supplementary groups.
///
/// Captured once per scan run so every worker applies the same permission
/// policy regardless of which thread it lands on.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
    pub groups: Vec<u32>,
}

impl Identity {
    /// Capture the invoking user's identity from the operating system.
    pub fn current() -> Self {
        let uid = unsafe { libc::geteuid() } as u32;
        let gid = unsafe { libc::getegid() } as u32;
        Self {
            uid,
            gid,
            groups: supplementary_groups(),
        }
    }

    /// Whether this identity may read and search the directory at `path`.
    ///
    /// Owner, group-membership and other bits are checked independently:
    /// whichever class the identity falls into decides, as the kernel does.
    pub fn can_enter(&self, path: &Path) -> bool {
        match fs::metadata(path) {
            Ok(meta) => self.allows_entry(meta.mode(), meta.uid(), meta.gid()),
            Err(_) => false,
        }
    }

    fn allows_entry(&self, mode: u32, owner_uid: u32, owner_gid: u32) -> bool {
        if self.uid == 0 {
            return true;
        }
        if owner_uid == self.uid {
            return mode & 0o500 == 0o500;
        }
        if owner_gid == self.gid || self.groups.contains(&owner_gid) {
            return mode & 0o050 == 0o050;
        }
        mode & 0o005 == 0o005
    }
}

fn supplementary_groups() -> Vec<u32> {
    let count = unsafe { libc::getgroups(0, std::ptr::null_mut()) };
    if count <= 0 {
        return Vec::new();
    }
    let mut buf = vec![0 as libc::gid_t; count as usize];
    let written = unsafe { libc::getgroups(count, buf.as_mut_ptr()) };
    if written < 0 {
        return Vec::new();
    }
    buf.truncate(written as usize);
    buf.into_iter().map(|g| g as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(uid: u32, gid: u32, groups: &[u32]) -> Identity {
        Identity {
            uid,
            gid,
            groups: groups.to_vec(),
        }
    }

    #[test]
    fn test_current_identity_is_consistent() {
        let id = Identity::current();
        assert_eq!(id, Identity::current());
    }

    #[test]
    fn test_owner_needs_read_and_search_bits() {
        let id = identity(1000, 1000, &[]);
        assert!(id.allows_entry(0o700, 1000, 1000));
        assert!(id.allows_entry(0o500, 1000, 1000));
        // Read without search, and search without read, both refuse entry
        assert!(!id.allows_entry(0o400, 1000, 1000));
        assert!(!id.allows_entry(0o100, 1000, 1000));
    }

    #[test]
    fn test_owner_bits_decide_even_when_other_bits_are_open() {
        // The owner class is checked first, as the kernel does
        let id = identity(1000, 1000, &[]);
        assert!(!id.allows_entry(0o055, 1000, 2000));
    }

    #[test]
    fn test_group_membership_uses_group_bits() {
        let primary = identity(1000, 2000, &[]);
        assert!(primary.allows_entry(0o050, 1001, 2000));
        assert!(!primary.allows_entry(0o040, 1001, 2000));

        let supplementary = identity(1000, 1000, &[2000, 3000]);
        assert!(supplementary.allows_entry(0o050, 1001, 3000));
        assert!(!supplementary.allows_entry(0o005, 1001, 3000));
    }

    #[test]
    fn test_other_bits_for_unrelated_identity() {
        let id = identity(1000, 1000, &[]);
        assert!(id.allows_entry(0o005, 1001, 2000));
        assert!(!id.allows_entry(0o004, 1001, 2000));
        assert!(!id.allows_entry(0o000, 1001, 2000));
    }

    #[test]
    fn test_root_enters_anything() {
        let id = identity(0, 0, &[]);
        assert!(id.allows_entry(0o000, 1000, 1000));
    }

    #[test]
    fn test_can_enter_missing_path_is_false() {
        let id = Identity::current();
        assert!(!id.can_enter(Path::new("/definitely/not/a/real/path")));
    }
}
