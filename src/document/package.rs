//! Open Packaging Conventions helpers: relationships and content types
use crate::document::Relationship;
use crate::document::CONTENT_TYPES_PART;
use crate::error::ConvertError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
/// XML tag name for extension based content types
const TAG_DEFAULT: &[u8] = b"Default";
/// XML tag name for part specific content types
const TAG_OVERRIDE: &[u8] = b"Override";

/// Content types declared in `[Content_Types].xml`
#[derive(Debug, Default)]
pub(crate) struct ContentTypes {
    /// Lower-cased file extension to content type
    defaults: HashMap<String, String>,
    /// Lower-cased part path (without leading slash) to content type
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    /// Returns the content type of a part, preferring a part override over the extension default
    pub(crate) fn content_type(&self, part: &str) -> Option<&str> {
        let part = part.trim_start_matches('/').to_ascii_lowercase();
        if let Some(kind) = self.overrides.get(&part) {
            return Some(kind.as_str());
        }
        part.rsplit_once('.')
            .and_then(|(_, extension)| self.defaults.get(extension))
            .map(String::as_str)
    }
}

/// Loads the content type declarations of a package. A package without
/// `[Content_Types].xml` yields an empty table.
pub(crate) fn load_content_types<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<ContentTypes, ConvertError> {
    let mut content_types = ContentTypes::default();
    let mut reader = match zip.xml_reader(CONTENT_TYPES_PART)? {
        Some(reader) => reader,
        None => return Ok(content_types),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_DEFAULT => {
            let extension = event.get_attribute_value("Extension")?;
            let kind = event.get_attribute_value("ContentType")?;
            if let Some((extension, kind)) = extension.zip(kind) {
                content_types.defaults.insert(extension.to_ascii_lowercase(), kind.into_owned());
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_OVERRIDE => {
            let part = event.get_attribute_value("PartName")?;
            let kind = event.get_attribute_value("ContentType")?;
            if let Some((part, kind)) = part.zip(kind) {
                let part = part.trim_start_matches('/').to_ascii_lowercase();
                content_types.overrides.insert(part, kind.into_owned());
            }
        }
    });
    Ok(content_types)
}

/// Loads the relationships of a part. A part without relationships yields an empty map.
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `path` - Path to the relationships XML file within the archive
///
/// # Returns
/// Mapping of relationship ids to relationships
pub(crate) fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, Relationship>, ConvertError> {
    let mut relationships: HashMap<String, Relationship> = HashMap::new();
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let target = event.get_attribute_value("Target")?;
            let external = event.get_attribute_value("TargetMode")?
                .map(|mode| mode.eq_ignore_ascii_case("External"))
                .unwrap_or(false);
            if let Some((id, target)) = id.zip(target) {
                relationships.insert(id.into_owned(), Relationship {
                    target: target.into_owned(),
                    external,
                });
            }
        }
    });
    Ok(relationships)
}

/// Resolves a relationship target against the folder of its source part
///
/// # Arguments
/// * `base` - Folder of the source part, e.g. `word`
/// * `target` - Target as written in the relationship
///
/// # Returns
/// Normalized path suitable for accessing files within the zip archive
pub(crate) fn to_part_path(base: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(segments, absolute);
    }
    segments.extend(base.split('/').filter(|segment| !segment.is_empty()));
    normalize(segments, &target)
}

fn normalize<'a>(mut segments: Vec<&'a str>, path: &'a str) -> String {
    for segment in path.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}
