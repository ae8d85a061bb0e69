//! Conversion settings passed explicitly into [`crate::convert`]
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

/// Destination folder used when none is configured
pub const DEFAULT_FOLDER_NAME: &str = "DOCX Image Uploads";

/// Header names that mark the photo column when none are configured
pub const DEFAULT_PHOTO_HEADERS: [&str; 4] = ["Photo", "Image", "Picture", "Photograph"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Storage folder receiving the uploaded images
    pub folder_name: String,
    /// Photo column header names, matched ignoring case and surrounding whitespace
    pub photo_header_candidates: HashSet<String>,
}

impl Config {
    /// Settings with the default folder and candidates, writing next to the input as `.xlsx`
    pub fn new<P: AsRef<Path>>(input_path: P) -> Config {
        let input_path = input_path.as_ref().to_path_buf();
        let output_path = default_output_path(&input_path);
        Config {
            input_path,
            output_path,
            folder_name: DEFAULT_FOLDER_NAME.to_owned(),
            photo_header_candidates: default_photo_headers(),
        }
    }

    pub fn with_output_path<P: AsRef<Path>>(mut self, output_path: P) -> Config {
        self.output_path = output_path.as_ref().to_path_buf();
        self
    }

    pub fn with_folder_name(mut self, folder_name: &str) -> Config {
        self.folder_name = folder_name.to_owned();
        self
    }

    /// Replaces the candidate set. Blank names are ignored and an empty list keeps the defaults.
    pub fn with_photo_headers<I, S>(mut self, names: I) -> Config
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: HashSet<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        if !names.is_empty() {
            self.photo_header_candidates = names;
        }
        self
    }
}

pub fn default_photo_headers() -> HashSet<String> {
    DEFAULT_PHOTO_HEADERS.iter().map(|name| name.to_string()).collect()
}

/// The input path with its extension replaced by `xlsx`
pub fn default_output_path(input_path: &Path) -> PathBuf {
    input_path.with_extension("xlsx")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new("/data/people.docx");
        assert_eq!(config.output_path, PathBuf::from("/data/people.xlsx"));
        assert_eq!(config.folder_name, "DOCX Image Uploads");
        assert_eq!(config.photo_header_candidates, default_photo_headers());
        assert!(config.photo_header_candidates.contains("Photograph"));
    }

    #[test]
    fn overrides() {
        let config = Config::new("people.docx")
            .with_output_path("out/table.xlsx")
            .with_folder_name("Team Photos")
            .with_photo_headers(["Avatar", "  ", " Headshot "]);

        assert_eq!(config.output_path, PathBuf::from("out/table.xlsx"));
        assert_eq!(config.folder_name, "Team Photos");
        let expected: HashSet<String> = ["Avatar", "Headshot"].iter().map(|name| name.to_string()).collect();
        assert_eq!(config.photo_header_candidates, expected);
    }

    #[test]
    fn empty_header_list_keeps_defaults() {
        let config = Config::new("people.docx").with_photo_headers(Vec::<String>::new());
        assert_eq!(config.photo_header_candidates, default_photo_headers());
    }
}
