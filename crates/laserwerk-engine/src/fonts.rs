// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pre-run font accumulation.
//
// Hosts supply font bytes before the first work chunk; the engine never
// touches system fonts, so text in the markup lays out identically on every
// platform (including ones without a font directory at all).

use tracing::debug;
use usvg::fontdb;

use laserwerk_core::error::{LaserwerkError, Result};

/// sfnt container magics accepted by the text shaper.
const SFNT_MAGICS: [[u8; 4]; 4] = [
    [0x00, 0x01, 0x00, 0x00], // TrueType
    *b"OTTO",                 // CFF OpenType
    *b"ttcf",                 // TrueType collection
    *b"true",                 // legacy Apple TrueType
];

/// Caller-supplied fonts for one generation job.
#[derive(Debug, Default)]
pub struct FontStore {
    faces: Vec<Vec<u8>>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one font file's bytes.
    ///
    /// Rejects anything that is not an sfnt container without touching the
    /// already-registered faces, so a failed call leaves the store usable.
    pub fn add(&mut self, data: &[u8]) -> Result<()> {
        if data.len() < 4 {
            return Err(LaserwerkError::Font(format!(
                "font data too short ({} bytes)",
                data.len()
            )));
        }
        let magic: [u8; 4] = data[..4].try_into().unwrap_or_default();
        if magic == *b"wOFF" || magic == *b"wOF2" {
            return Err(LaserwerkError::Font(
                "WOFF-compressed fonts are not accepted; supply the decompressed sfnt".into(),
            ));
        }
        if !SFNT_MAGICS.contains(&magic) {
            return Err(LaserwerkError::Font(format!(
                "unrecognized font container magic {magic:02x?}"
            )));
        }
        debug!(bytes = data.len(), faces = self.faces.len() + 1, "font registered");
        self.faces.push(data.to_vec());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Load every registered face into a fresh font database for layout.
    pub fn build_database(&self) -> fontdb::Database {
        let mut db = fontdb::Database::new();
        for face in &self.faces {
            db.load_font_data(face.clone());
        }
        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal byte prefixes are enough for container validation.
    fn with_magic(magic: &[u8; 4]) -> Vec<u8> {
        let mut data = magic.to_vec();
        data.extend_from_slice(&[0u8; 12]);
        data
    }

    #[test]
    fn accepts_sfnt_containers() {
        let mut store = FontStore::new();
        store.add(&with_magic(&[0x00, 0x01, 0x00, 0x00])).unwrap();
        store.add(&with_magic(b"OTTO")).unwrap();
        store.add(&with_magic(b"ttcf")).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn rejects_woff_with_a_useful_message() {
        let mut store = FontStore::new();
        let err = store.add(&with_magic(b"wOFF")).unwrap_err();
        assert!(err.to_string().contains("WOFF"));
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_garbage_and_stays_usable() {
        let mut store = FontStore::new();
        assert!(store.add(b"not a font at all").is_err());
        assert!(store.add(&[1, 2]).is_err());
        // The store must remain usable after rejections.
        store.add(&with_magic(b"OTTO")).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn database_reflects_only_valid_faces() {
        let mut store = FontStore::new();
        let _ = store.add(b"bogus data here!");
        // Truncated sfnt passes the magic check but fontdb will not index a
        // face from it; building must not panic either way.
        let _ = store.add(&with_magic(b"OTTO"));
        let db = store.build_database();
        let _ = db.len();
    }
}
