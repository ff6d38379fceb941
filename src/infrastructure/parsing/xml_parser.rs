//! Inventory XML export parser
//!
//! Streaming, event-driven parse of the export feed: a sequence of
//! `<geokret>` elements, each optionally nesting `<owner>`, `<type>`,
//! `<name>`, `<description>`, `<datecreated>`, `<distancetravelled>`,
//! `<image>` and `<waypoint>` children. Single forward pass with O(1)
//! state per element beyond the output list.
//!
//! Entities are appended to the output the moment their opening element is
//! seen, so a stream that fails midway still surrenders every entity
//! completed before the failure point through
//! [`ParsingError::partial_output`].

use std::io::BufRead;
use std::mem;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use super::{ParsingError, ParsingResult};
use crate::domain::geokret::{Geokret, GeokretType};

/// Streaming parser for the inventory XML export feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryXmlParser;

/// Per-invocation parse state: the output list, the text accumulated since
/// the last markup event, and the open-element depth. Never reused across
/// invocations.
#[derive(Default)]
struct Accumulator {
    krety: Vec<Geokret>,
    content: String,
    open_elements: u32,
}

impl Accumulator {
    fn current(&mut self, position: u64) -> ParsingResult<&mut Geokret> {
        match self.krety.last_mut() {
            Some(kret) => Ok(kret),
            None => Err(ParsingError::malformed_stream(
                position,
                "element outside any <geokret>",
                Vec::new(),
            )),
        }
    }

    fn fail(&mut self, position: u64, message: impl std::fmt::Display) -> ParsingError {
        ParsingError::malformed_stream(position, message.to_string(), mem::take(&mut self.krety))
    }
}

impl InventoryXmlParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse one export stream into entities in document order.
    pub fn parse<R: BufRead>(&self, input: R) -> ParsingResult<Vec<Geokret>> {
        let mut reader = Reader::from_reader(input);
        let mut state = Accumulator::default();
        let mut buf = Vec::new();
        loop {
            let position = reader.buffer_position() as u64;
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(start)) => {
                    state.open_elements += 1;
                    Self::enter_element(&start, &mut state, position)?;
                }
                Ok(Event::Empty(start)) => {
                    Self::enter_element(&start, &mut state, position)?;
                    Self::leave_element(start.name().as_ref(), &mut state, position)?;
                }
                Ok(Event::Text(text)) => {
                    let text = match text.unescape() {
                        Ok(text) => text,
                        Err(error) => return Err(state.fail(position, error)),
                    };
                    state.content = text.trim_end_matches(['\n', '\r', ' ']).to_string();
                }
                Ok(Event::CData(data)) => {
                    let bytes = data.into_inner();
                    let text = String::from_utf8_lossy(&bytes);
                    state.content = text.trim_end_matches(['\n', '\r', ' ']).to_string();
                }
                Ok(Event::End(end)) => {
                    state.open_elements = state.open_elements.saturating_sub(1);
                    Self::leave_element(end.name().as_ref(), &mut state, position)?;
                }
                Ok(Event::Eof) => {
                    if state.open_elements > 0 {
                        let message = format!(
                            "stream ended with {} unterminated element(s)",
                            state.open_elements
                        );
                        return Err(state.fail(reader.buffer_position() as u64, message));
                    }
                    break;
                }
                Ok(_) => {}
                Err(error) => return Err(state.fail(reader.buffer_position() as u64, error)),
            }
            buf.clear();
        }
        debug!(count = state.krety.len(), "parsed inventory export stream");
        Ok(state.krety)
    }

    fn enter_element(
        start: &BytesStart<'_>,
        state: &mut Accumulator,
        position: u64,
    ) -> ParsingResult<()> {
        match start.name().as_ref() {
            b"geokret" => {
                state.content.clear();
                state.krety.push(Geokret::new());
                for (key, value) in decoded_attributes(start, state, position)? {
                    match key.as_slice() {
                        b"id" => {
                            let id = numeric(&value, "geokret id attribute", state, position)?;
                            state.current(position)?.set_id(id);
                        }
                        b"dist" => state.current(position)?.set_distance(value),
                        b"nr" => state.current(position)?.set_tracking_number(value),
                        b"type" => {
                            let kret_type = type_from_code(&value, state, position)?;
                            state.current(position)?.set_type(kret_type);
                        }
                        b"waypoint" => state.current(position)?.set_spotted_cache_name(value),
                        b"image" => state.current(position)?.add_image(&value),
                        _ => {}
                    }
                }
            }
            b"owner" => {
                for (key, value) in decoded_attributes(start, state, position)? {
                    if key.as_slice() == b"owner" {
                        state.current(position)?.set_owner(value);
                    }
                }
            }
            b"type" => {
                for (key, value) in decoded_attributes(start, state, position)? {
                    if key.as_slice() == b"type" {
                        let kret_type = type_from_code(&value, state, position)?;
                        state.current(position)?.set_type(kret_type);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn leave_element(name: &[u8], state: &mut Accumulator, position: u64) -> ParsingResult<()> {
        let content = mem::take(&mut state.content);
        match name {
            b"geokret" => {
                // stray text directly inside the element is the name
                if !content.is_empty() {
                    state.current(position)?.set_name(content);
                }
            }
            b"name" => state.current(position)?.set_name(content),
            b"description" => state.current(position)?.set_description(content),
            // owner and waypoint may already be set from attributes; empty
            // element text must not wipe them
            b"owner" => {
                if !content.is_empty() {
                    state.current(position)?.set_owner(content);
                }
            }
            b"datecreated" => state.current(position)?.set_date_created(content),
            b"distancetravelled" => state.current(position)?.set_distance(content),
            b"image" => {
                if !content.is_empty() {
                    state.current(position)?.add_image(&content);
                }
            }
            b"waypoint" => {
                if !content.is_empty() {
                    state.current(position)?.set_spotted_cache_name(content);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn decoded_attributes(
    start: &BytesStart<'_>,
    state: &mut Accumulator,
    position: u64,
) -> ParsingResult<Vec<(Vec<u8>, String)>> {
    let mut decoded = Vec::new();
    for attribute in start.attributes() {
        let attribute = match attribute {
            Ok(attribute) => attribute,
            Err(error) => return Err(state.fail(position, error)),
        };
        let value = match attribute.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(error) => return Err(state.fail(position, error)),
        };
        decoded.push((attribute.key.as_ref().to_vec(), value));
    }
    Ok(decoded)
}

fn numeric(value: &str, what: &str, state: &mut Accumulator, position: u64) -> ParsingResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| state.fail(position, format!("{what} {value:?} is not numeric")))
}

fn type_from_code(
    value: &str,
    state: &mut Accumulator,
    position: u64,
) -> ParsingResult<GeokretType> {
    let code: u8 = value
        .trim()
        .parse()
        .map_err(|_| state.fail(position, format!("type code {value:?} is not numeric")))?;
    Ok(GeokretType::from_code(code)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_element_with_attributes_parses() {
        let parser = InventoryXmlParser::new();
        let xml = r#"<gkxml><geokret id="18" dist="42.5" nr="XJ9H62"><name>Wanderer</name></geokret></gkxml>"#;
        let krety = parser.parse(xml.as_bytes()).unwrap();
        assert_eq!(krety.len(), 1);
        assert_eq!(krety[0].gk_id(), 18);
        assert_eq!(krety[0].distance(), Some("42.5"));
        assert_eq!(krety[0].tracking_number(), Some("XJ9H62"));
        assert_eq!(krety[0].name(), Some("Wanderer"));
    }

    #[test]
    fn non_numeric_id_attribute_fails_the_stream() {
        let parser = InventoryXmlParser::new();
        let xml = r#"<gkxml><geokret id="oops"/></gkxml>"#;
        let error = parser.parse(xml.as_bytes()).unwrap_err();
        assert!(matches!(error, ParsingError::MalformedStream { .. }));
    }
}
