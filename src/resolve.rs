//! Per-row resolution of the photo column into a public URL
use crate::cell::first_embedded_image;
use crate::cell::first_hyperlink_url;
use crate::cell::CellContent;
use crate::cell::ImageBlob;
use crate::error::ConvertError;
use crate::fetch::Fetcher;
use crate::storage::ImagePublisher;
use crate::storage::StorageProvider;

/// Outcome of resolving one photo cell
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The cell's embedded picture was uploaded
    Embedded(String),
    /// The linked image was downloaded and re-hosted
    Fetched { source: String, url: String },
    /// The link could not be downloaded and is kept as is
    LinkKept(String),
    /// Neither a picture nor a link, the cell text stays
    Passthrough,
}

impl Resolution {
    /// Value written to the photo column, given the cell's original text
    pub fn into_value(self, original: String) -> String {
        match self {
            Resolution::Embedded(url) => url,
            Resolution::Fetched { url, .. } => url,
            Resolution::LinkKept(link) => link,
            Resolution::Passthrough => original,
        }
    }
}

/// File extension for well-known image media types
fn extension(media_type: Option<&str>) -> Option<&'static str> {
    let essence = media_type?.split(';').next()?.trim().to_ascii_lowercase();
    let extension = match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" | "image/x-bmp" => "bmp",
        "image/tiff" => "tif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/x-emf" | "image/emf" => "emf",
        "image/x-wmf" | "image/wmf" => "wmf",
        _ => return None,
    };
    Some(extension)
}

/// Object name for an uploaded image: `row{n}_{suffix}` plus an extension when the media type is known
pub fn name_hint(row_number: usize, suffix: &str, media_type: Option<&str>) -> String {
    match extension(media_type) {
        Some(extension) => format!("row{row_number}_{suffix}.{extension}"),
        None => format!("row{row_number}_{suffix}"),
    }
}

/// Runs the fallback chain for photo cells against one destination folder
pub struct RowResolver<'a, S: StorageProvider, F: Fetcher> {
    publisher: &'a ImagePublisher<S>,
    fetcher: &'a F,
    folder_id: &'a str,
}

impl<'a, S: StorageProvider, F: Fetcher> RowResolver<'a, S, F> {
    pub fn new(publisher: &'a ImagePublisher<S>, fetcher: &'a F, folder_id: &'a str) -> Self {
        RowResolver { publisher, fetcher, folder_id }
    }

    fn publish(&self, row_number: usize, suffix: &str, image: &ImageBlob) -> Result<String, ConvertError> {
        let media_type = image.media_type.as_deref();
        let name = name_hint(row_number, suffix, media_type);
        Ok(self.publisher.publish(self.folder_id, &name, &image.bytes, media_type)?)
    }

    /// Resolves the photo cell of the 1-based data row `row_number`.
    ///
    /// Only storage failures are returned as errors; missing pictures, missing
    /// links and failed downloads select the next strategy.
    pub fn resolve<C: CellContent + ?Sized>(&self, row_number: usize, cell: &C) -> Result<Resolution, ConvertError> {
        if let Some(image) = first_embedded_image(cell) {
            let url = self.publish(row_number, "photo", &image)?;
            tracing::debug!(row = row_number, %url, "embedded picture uploaded");
            return Ok(Resolution::Embedded(url));
        }

        let Some(link) = first_hyperlink_url(cell) else {
            tracing::debug!(row = row_number, "no picture or link, keeping text");
            return Ok(Resolution::Passthrough);
        };

        match self.fetcher.fetch(&link) {
            Some(image) => {
                let url = self.publish(row_number, "photo_from_link", &image)?;
                tracing::debug!(row = row_number, source = %link, %url, "linked image re-hosted");
                Ok(Resolution::Fetched { source: link, url })
            }
            None => {
                tracing::info!(row = row_number, %link, "linked image unavailable, keeping link");
                Ok(Resolution::LinkKept(link))
            }
        }
    }
}
