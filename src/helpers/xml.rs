//! Pull-reader setup and small event helpers shared by the document and workbook parsers

use crate::error::ConvertError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// Event reader over one package part, reusing a single event buffer
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// `<a/>` arrives as a start and an end event. Text is left untrimmed and
    /// mismatched end tags are tolerated.
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// `None` at end of input
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, ConvertError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(ConvertError::XmlError(error)),
        }
    }
}

fn unescaped<'a>(attribute: Attribute<'a>) -> Result<Cow<'a, str>, ConvertError> {
    Ok(attribute.unescape_value()?)
}

/// Attribute lookup on a start tag by its prefixed name as written in the part, e.g. `r:id`
pub(crate) trait XmlNodeHelper<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, ConvertError>;

    /// Like `get_attribute_value`, then `FromStr`. A value that does not parse is an error, not `None`.
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConvertError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, ConvertError> {
        self.try_get_attribute(name)?.map(unescaped).transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConvertError> {
        let Some(attribute) = self.try_get_attribute(name)? else {
            return Ok(None);
        };
        let value = unescaped(attribute)?;
        value
            .parse()
            .map(Some)
            .map_err(|_| XmlError::ParseAttributeValueError(value.into_owned()).into())
    }
}

/// Accumulates element text split across text and reference events
pub(crate) trait XmlTextContextHelper {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), ConvertError>;

    /// Decodes `&#NN;`, `&#xNN;` and the predefined entities. Other names are rejected.
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), ConvertError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), ConvertError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), ConvertError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Loops over the reader's events, ignoring any event no arm matches
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}
