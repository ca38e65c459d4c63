use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, ensure};
use walkdir::WalkDir;

use crate::resource_type::{ResourceKey, ResourceType};

/// Resolves an external patch file name to the resource it overrides.
///
/// Accepts SCI1.1+ names (`4.pat`, `100.V56`) and SCI0 names
/// (`patch.004`, `view.100`).
pub fn patch_key_from_file_name(name: &str) -> Option<ResourceKey> {
    let (stem, ext) = name.rsplit_once('.')?;
    if let (Ok(number), Some(kind)) = (stem.parse::<u16>(), ResourceType::from_patch_extension(ext))
    {
        return Some(ResourceKey::new(kind, number));
    }
    let kind = ResourceType::from_name(stem)?;
    let number = ext.parse::<u16>().ok()?;
    Some(ResourceKey::new(kind, number))
}

/// Lists patch files directly inside `dir`, sorted by path.
pub fn scan_patch_dir<P: AsRef<Path>>(dir: P) -> Vec<(ResourceKey, PathBuf)> {
    let mut found: Vec<(ResourceKey, PathBuf)> = WalkDir::new(dir.as_ref())
        .max_depth(1)
        .into_iter()
        .filter_map(|res| res.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let key = entry
                .file_name()
                .to_str()
                .and_then(patch_key_from_file_name)?;
            Some((key, entry.into_path()))
        })
        .collect();
    found.sort_by(|a, b| a.1.cmp(&b.1));
    found
}

/// Parsed patch file: a type byte, a header-extension length, then payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    pub kind: ResourceType,
    pub data_offset: usize,
}

impl PatchFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure!(bytes.len() >= 2, "patch file shorter than its header");
        let kind = ResourceType::from_byte(bytes[0])
            .ok_or_else(|| anyhow!("patch declares unknown type byte {:#04x}", bytes[0]))?;
        let data_offset = 2 + bytes[1] as usize;
        ensure!(
            data_offset <= bytes.len(),
            "patch header extension runs past end of file"
        );
        Ok(Self { kind, data_offset })
    }

    pub fn payload<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[self.data_offset..]
    }
}

pub fn encode_patch_file(kind: ResourceType, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(kind.as_byte() | 0x80);
    out.push(0);
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn recognises_both_naming_schemes() {
        assert_eq!(
            patch_key_from_file_name("4.pat"),
            Some(ResourceKey::new(ResourceType::Patch, 4))
        );
        assert_eq!(
            patch_key_from_file_name("patch.004"),
            Some(ResourceKey::new(ResourceType::Patch, 4))
        );
        assert_eq!(
            patch_key_from_file_name("100.V56"),
            Some(ResourceKey::new(ResourceType::View, 100))
        );
        assert_eq!(patch_key_from_file_name("resource.map"), None);
        assert_eq!(patch_key_from_file_name("readme.txt"), None);
    }

    #[test]
    fn header_extension_is_skipped() {
        let bytes = [0x89, 2, 0xAA, 0xBB, 1, 2, 3];
        let patch = PatchFile::parse(&bytes).unwrap();
        assert_eq!(patch.kind, ResourceType::Patch);
        assert_eq!(patch.payload(&bytes), &[1, 2, 3]);
        assert!(PatchFile::parse(&[0x89, 9, 0]).is_err());
    }

    #[test]
    fn scans_directory_for_patches() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("4.pat"), encode_patch_file(ResourceType::Patch, b"x")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        let found = scan_patch_dir(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, ResourceKey::new(ResourceType::Patch, 4));
    }
}
