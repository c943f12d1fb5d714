//! On-disk state: the transport identity, path table and packet hashlist.
//!
//! Files live in one directory and are plain text so other implementations
//! can read them:
//!
//! ```text
//! destination_table  destHex|nextHopHex|hops|expiresMs|interfaceHex|announceHashHex|state|failures
//! packet_hashlist    one packet hash in hex per line
//! ```
//!
//! Writes go to a `.tmp` sibling first and are renamed into place.
//! Unreadable and expired lines are skipped on load.

use std::path::{Path, PathBuf};

use tokio::fs;

use rns_core::{DestinationHash, Identity, PacketHash, TruncatedHash};

use crate::error::PersistError;
use crate::interface::InterfaceId;
use crate::path::{PathEntry, PathState};

pub const IDENTITY_FILE: &str = "transport_identity";
pub const PATH_TABLE_FILE: &str = "destination_table";
pub const HASHLIST_FILE: &str = "packet_hashlist";

pub fn encode_path_line(dest: &DestinationHash, entry: &PathEntry) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}",
        dest,
        entry.next_hop,
        entry.hops,
        entry.expires,
        entry.receiving_interface,
        entry.announce_packet_hash,
        entry.state.ordinal(),
        entry.failure_count,
    )
}

/// `None` for malformed lines. Stale entries are never persisted, so a
/// stale ordinal counts as malformed.
pub fn decode_path_line(line: &str, now: u64) -> Option<(DestinationHash, PathEntry)> {
    let fields: Vec<&str> = line.trim().split('|').collect();
    let [dest, next_hop, hops, expires, iface, announce, state, failures] = fields.as_slice() else {
        return None;
    };
    let state = PathState::from_ordinal(state.parse().ok()?)?;
    if state == PathState::Stale {
        return None;
    }
    let mut entry = PathEntry::new(
        now,
        next_hop.parse::<TruncatedHash>().ok()?,
        hops.parse().ok()?,
        expires.parse().ok()?,
        iface.parse::<InterfaceId>().ok()?,
        announce.parse::<PacketHash>().ok()?,
    );
    entry.state = state;
    entry.failure_count = failures.parse().ok()?;
    Some((dest.parse().ok()?, entry))
}

pub fn encode_path_table(entries: &[(DestinationHash, PathEntry)]) -> String {
    let mut out = String::new();
    for (dest, entry) in entries {
        if entry.state == PathState::Stale {
            continue;
        }
        out.push_str(&encode_path_line(dest, entry));
        out.push('\n');
    }
    out
}

pub fn decode_path_table(text: &str, now: u64) -> Vec<(DestinationHash, PathEntry)> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| {
            let decoded = decode_path_line(l, now);
            if decoded.is_none() {
                tracing::trace!(line = l, "skipping malformed path table line");
            }
            decoded
        })
        .filter(|(_, e)| !e.is_expired(now))
        .collect()
}

pub fn encode_hashlist<'a>(hashes: impl IntoIterator<Item = &'a PacketHash>) -> String {
    let mut out = String::new();
    for hash in hashes {
        out.push_str(&hash.to_hex());
        out.push('\n');
    }
    out
}

pub fn decode_hashlist(text: &str) -> Vec<PacketHash> {
    text.lines().filter_map(|l| l.trim().parse().ok()).collect()
}

/// A state directory.
pub struct Storage {
    base_dir: PathBuf,
}

impl Storage {
    /// Creates the directory if needed.
    pub async fn open(base_dir: &Path) -> Result<Self, PersistError> {
        fs::create_dir_all(base_dir).await?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub async fn save_identity(&self, identity: &Identity) -> Result<(), PersistError> {
        let bytes = identity.private_key_bytes().ok_or(PersistError::NoPrivateKey)?;
        let path = self.base_dir.join(IDENTITY_FILE);
        atomic_write(&path, &bytes).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        Ok(())
    }

    /// `Ok(None)` if no identity has been saved.
    pub async fn load_identity(&self) -> Result<Option<Identity>, PersistError> {
        match fs::read(self.base_dir.join(IDENTITY_FILE)).await {
            Ok(bytes) => {
                let len = bytes.len();
                let key: [u8; 64] = bytes
                    .try_into()
                    .map_err(|_| PersistError::InvalidIdentityLength(len))?;
                Ok(Some(Identity::from_private_bytes(&key)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save_path_table(&self, entries: &[(DestinationHash, PathEntry)]) -> Result<(), PersistError> {
        atomic_write(
            &self.base_dir.join(PATH_TABLE_FILE),
            encode_path_table(entries).as_bytes(),
        )
        .await
    }

    /// Empty if the file does not exist.
    pub async fn load_path_table(&self, now: u64) -> Result<Vec<(DestinationHash, PathEntry)>, PersistError> {
        Ok(read_optional(&self.base_dir.join(PATH_TABLE_FILE))
            .await?
            .map(|text| decode_path_table(&text, now))
            .unwrap_or_default())
    }

    pub async fn save_hashlist(&self, hashes: &[PacketHash]) -> Result<(), PersistError> {
        atomic_write(
            &self.base_dir.join(HASHLIST_FILE),
            encode_hashlist(hashes).as_bytes(),
        )
        .await
    }

    pub async fn load_hashlist(&self) -> Result<Vec<PacketHash>, PersistError> {
        Ok(read_optional(&self.base_dir.join(HASHLIST_FILE))
            .await?
            .map(|text| decode_hashlist(&text))
            .unwrap_or_default())
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, PersistError> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn atomic_write(path: &Path, data: &[u8]) -> Result<(), PersistError> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}
