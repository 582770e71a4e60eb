//! Base64 zip bundles of project files

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use base64::{Engine, engine::general_purpose::STANDARD};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{Error, Result};

/// Zip `entries` (project-relative name to bytes) and base64-encode the archive.
pub fn pack(entries: &BTreeMap<String, Vec<u8>>) -> Result<String> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(content)?;
    }

    let archive = writer.finish()?.into_inner();
    Ok(STANDARD.encode(archive))
}

/// Decode a bundle produced by [`pack`].
pub fn unpack(encoded: &str) -> Result<BTreeMap<String, Vec<u8>>> {
    let bytes = STANDARD.decode(encoded).map_err(|e| Error::Bundle {
        message: format!("invalid base64: {e}"),
    })?;
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut entries = BTreeMap::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        entries.insert(file.name().to_string(), content);
    }
    Ok(entries)
}
