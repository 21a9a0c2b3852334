#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use neo_loader::catalog::NeoDatabase;

/// Temporary directory holding the input files of one test
pub struct Workspace {
    _tmp: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap().to_path_buf();
        Workspace { _tmp: tmp, root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Write a UTF-8 file
    pub fn write(&self, name: &str, content: &str) -> Utf8PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a UTF-16 little-endian file with its BOM
    pub fn write_utf16(&self, name: &str, content: &str) -> Utf8PathBuf {
        let bytes: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain(content.encode_utf16().flat_map(|unit| unit.to_le_bytes()))
            .collect();
        let path = self.path(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Open (or create) the catalogue file of this workspace
    pub fn database(&self) -> NeoDatabase {
        let db = NeoDatabase::open(&self.path("neos.db")).unwrap();
        db.ensure_reference_data().unwrap();
        db
    }
}

/// Eros as exported by the merged NEO + MPCORB extraction, split over two rows
pub const EROS_TWO_ROWS: &str = "\
id,spkid,full_name,pdes,name,neo,pha,h,diameter,orbit_id,epoch,e,a,i,om,w,ma,n,rms,class,class_description
a0000433,2000433,433 Eros (A898 PA),433,Eros,Y,N,10.4,,JPL 659,2460600.5,0.2228,1.458,10.83,304.3,178.9,310.6,0.5597,0.29,AMO,Amor
a0000433,2000433,433 Eros (A898 PA),433,Eros,Y,N,10.4,16.84,JPL 659,,,,,,,,,,AMO,Amor
";
