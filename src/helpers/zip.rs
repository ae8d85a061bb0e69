//! ZIP archive helper utilities for Office Open XML packages.
//! Provides convenient methods for accessing parts within the container.

use crate::error::ConvertError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_PREALLOCATION: usize = 1 << 20;

/// The declared size comes from the archive header and is not trusted
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared).map_or(MAX_PREALLOCATION, |size| size.min(MAX_PREALLOCATION))
}

/// Helper trait for ZIP archive operations with specialized reader creation
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ConvertError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ConvertError>;

    /// Reads a whole file from the ZIP archive into memory
    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, ConvertError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ConvertError> {
        let pattern = name.replace('\\', "/");
        let pattern = pattern.trim_start_matches('/');
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(*file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ConvertError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, ConvertError> {
        match self.file(name)? {
            Some(mut file) => {
                let mut bytes = Vec::with_capacity(initial_capacity(file.size()));
                file.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::zip_archive;

    #[test]
    fn lookup_ignores_case_and_separators() -> Result<(), ConvertError> {
        let mut zip = zip_archive(&[("word/media/Image1.PNG", b"png".as_slice())]);
        assert!(zip.file("word\\media\\image1.png")?.is_some());
        assert!(zip.file("/word/media/image1.png")?.is_some());
        assert!(zip.file("word/media/image2.png")?.is_none());
        Ok(())
    }

    #[test]
    fn read_whole_entry() -> Result<(), ConvertError> {
        let mut zip = zip_archive(&[("word/media/image1.png", b"\x89PNG".as_slice())]);
        assert_eq!(zip.read_bytes("word/media/image1.png")?, Some(b"\x89PNG".to_vec()));
        assert_eq!(zip.read_bytes("word/media/missing.png")?, None);
        Ok(())
    }

    #[test]
    fn reservation_is_capped() {
        assert_eq!(initial_capacity(12), 12);
        assert_eq!(initial_capacity(u64::MAX), MAX_PREALLOCATION);
        assert_eq!(initial_capacity(MAX_PREALLOCATION as u64 + 1), MAX_PREALLOCATION);
    }

    #[test]
    fn entry_larger_than_reservation() -> Result<(), ConvertError> {
        let content = vec![7u8; MAX_PREALLOCATION * 2 + 3];
        let mut zip = zip_archive(&[("word/media/big.bin", content.as_slice())]);
        assert_eq!(zip.read_bytes("word/media/big.bin")?.map(|bytes| bytes.len()), Some(content.len()));
        Ok(())
    }
}
