//! Persisted per-supplicant records: node role, pairwise key material and
//! replay counters, one file per EUI-64 under the storage prefix.
//!
//! Files are written to a temporary name and atomically renamed into
//! place; records are read back on demand (the `Nodes` property) and
//! deleted on revocation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::warn;

use wisunparse::fmt_eui64;

use crate::error::{Error, Result};
use crate::wire::{WireReader, WireWriter};
use crate::ws::neigh::Eui64;

const RECORD_MAGIC: u32 = 0x77_73_6b_73; // "wsks"
const RECORD_VERSION: u8 = 1;

/// One stored supplicant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SupplicantRecord {
    pub eui64: Eui64,
    /// Node role advertised during authentication, when known.
    pub node_role: Option<u8>,
    /// Pairwise master key.
    pub pmk: Option<[u8; 32]>,
    /// Pairwise transient key.
    pub ptk: Option<[u8; 48]>,
    /// EAPOL replay counter.
    pub replay_counter: u64,
    /// Remaining key lifetime in seconds at the time of the write.
    pub lifetime_s: u32,
}

impl SupplicantRecord {
    pub fn new(eui64: Eui64) -> SupplicantRecord {
        SupplicantRecord {
            eui64,
            node_role: None,
            pmk: None,
            ptk: None,
            replay_counter: 0,
            lifetime_s: 0,
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut writer = WireWriter::new();
        writer.push_le32(RECORD_MAGIC);
        writer.push_u8(RECORD_VERSION);
        writer.push_data(&self.eui64);
        match self.node_role {
            Some(role) => {
                writer.push_bool(true);
                writer.push_u8(role);
            }
            None => writer.push_bool(false),
        }
        match &self.pmk {
            Some(pmk) => {
                writer.push_bool(true);
                writer.push_data(pmk);
            }
            None => writer.push_bool(false),
        }
        match &self.ptk {
            Some(ptk) => {
                writer.push_bool(true);
                writer.push_data(ptk);
            }
            None => writer.push_bool(false),
        }
        writer.push_le64(self.replay_counter);
        writer.push_le32(self.lifetime_s);
        writer.into_vec()
    }

    fn decode(payload: &[u8]) -> Result<SupplicantRecord> {
        let mut reader = WireReader::new(payload);
        if reader.pop_le32()? != RECORD_MAGIC {
            return Err(Error::Malformed("bad key storage magic".into()));
        }
        if reader.pop_u8()? != RECORD_VERSION {
            return Err(Error::Unsupported("unknown key storage version".into()));
        }
        let eui64 = reader.pop_fixed::<8>()?;
        let node_role = if reader.pop_bool()? {
            Some(reader.pop_u8()?)
        } else {
            None
        };
        let pmk = if reader.pop_bool()? {
            Some(reader.pop_fixed::<32>()?)
        } else {
            None
        };
        let ptk = if reader.pop_bool()? {
            Some(reader.pop_fixed::<48>()?)
        } else {
            None
        };
        Ok(SupplicantRecord {
            eui64,
            node_role,
            pmk,
            ptk,
            replay_counter: reader.pop_le64()?,
            lifetime_s: reader.pop_le32()?,
        })
    }
}

/// The key-storage directory.
#[derive(Clone, Debug)]
pub struct KeyStorage {
    dir: PathBuf,
}

impl KeyStorage {
    pub fn new(dir: &Path) -> KeyStorage {
        KeyStorage {
            dir: dir.to_path_buf(),
        }
    }

    fn record_path(&self, eui64: &Eui64) -> PathBuf {
        let mut name = String::from("keys-");
        for byte in eui64 {
            name.push_str(&format!("{:02x}", byte));
        }
        self.dir.join(name)
    }

    /// True when a record exists for the supplicant.
    pub fn exists(&self, eui64: &Eui64) -> bool {
        self.record_path(eui64).exists()
    }

    /// Writes a record atomically (temp file + rename).
    pub fn write(&self, record: &SupplicantRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|err| Error::Fatal(format!("create {}: {}", self.dir.display(), err)))?;
        let path = self.record_path(&record.eui64);
        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)
            .map_err(|err| Error::Fatal(format!("create {}: {}", tmp.display(), err)))?;
        file.write_all(&record.encode())
            .and_then(|_| file.sync_data())
            .map_err(|err| Error::Fatal(format!("write {}: {}", tmp.display(), err)))?;
        fs::rename(&tmp, &path)
            .map_err(|err| Error::Fatal(format!("rename {}: {}", path.display(), err)))?;
        Ok(())
    }

    /// Reads a record back, `NotFound` when the supplicant is unknown.
    pub fn read(&self, eui64: &Eui64) -> Result<SupplicantRecord> {
        let path = self.record_path(eui64);
        let payload = fs::read(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("no stored supplicant {}", fmt_eui64(eui64)))
            } else {
                Error::Fatal(format!("read {}: {}", path.display(), err))
            }
        })?;
        SupplicantRecord::decode(&payload)
    }

    /// Drops a record (revocation).
    pub fn delete(&self, eui64: &Eui64) -> Result<()> {
        let path = self.record_path(eui64);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(
                format!("no stored supplicant {}", fmt_eui64(eui64)),
            )),
            Err(err) => Err(Error::Fatal(format!("unlink {}: {}", path.display(), err))),
        }
    }

    /// Enumerates the stored supplicants.
    pub fn list(&self) -> Vec<Eui64> {
        let mut out = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return out,
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(hex) = name.to_str().and_then(|name| name.strip_prefix("keys-")) else {
                continue;
            };
            if hex.len() != 16 {
                continue;
            }
            let mut eui64 = [0u8; 8];
            let mut valid = true;
            for (i, byte) in eui64.iter_mut().enumerate() {
                match u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16) {
                    Ok(value) => *byte = value,
                    Err(_) => {
                        valid = false;
                        break;
                    }
                }
            }
            if !valid {
                warn!("key storage: ignoring {}", entry.path().display());
                continue;
            }
            out.push(eui64);
        }
        out.sort();
        out
    }
}
