//! Streaming JUnit XML reader.
//!
//! Only `<testcase>` elements and their outcome children matter; suites,
//! properties and captured output are skipped.

use passgate_types::{Outcome, TestKey, TestRecord, DEFAULT_EXCLUSION_MARKER};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

const TESTCASE_TAG: &[u8] = b"testcase";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunitOptions {
    /// A `<skipped>` whose message contains this marks the test as excluded
    /// rather than skipped. Empty disables exclusion detection.
    pub exclusion_marker: String,
}

impl Default for JunitOptions {
    fn default() -> Self {
        Self {
            exclusion_marker: DEFAULT_EXCLUSION_MARKER.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed XML at byte {position}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("malformed attribute on <{element}>")]
    Attribute {
        element: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("<testcase> is missing required attribute `{0}`")]
    MissingAttribute(&'static str),
}

/// Parse one JUnit document into one record per `<testcase>`.
pub fn parse_junit_str(xml: &str, opts: &JunitOptions) -> Result<Vec<TestRecord>, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<PendingCase> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return Err(ParseError::Xml {
                    position: reader.buffer_position(),
                    source,
                });
            }
        };

        match event {
            Event::Start(e) if e.name().as_ref() == TESTCASE_TAG => {
                if let Some(unclosed) = current.take() {
                    records.push(unclosed.finish());
                }
                current = Some(PendingCase::open(&e)?);
            }
            Event::Empty(e) if e.name().as_ref() == TESTCASE_TAG => {
                if let Some(unclosed) = current.take() {
                    records.push(unclosed.finish());
                }
                records.push(PendingCase::open(&e)?.finish());
            }
            Event::Start(e) | Event::Empty(e) => {
                if let Some(case) = current.as_mut() {
                    case.observe(&e, opts)?;
                }
            }
            Event::End(e) if e.name().as_ref() == TESTCASE_TAG => {
                if let Some(case) = current.take() {
                    records.push(case.finish());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = current.take() {
        records.push(unclosed.finish());
    }

    Ok(records)
}

struct PendingCase {
    key: TestKey,
    outcome: Outcome,
    message: Option<String>,
}

impl PendingCase {
    fn open(e: &BytesStart<'_>) -> Result<Self, ParseError> {
        let name = attr_value(e, b"name")?.ok_or(ParseError::MissingAttribute("name"))?;
        let class = attr_value(e, b"classname")?.unwrap_or_default();
        let file = attr_value(e, b"file")?;

        Ok(Self {
            key: TestKey::new(file.as_deref(), &class, &name),
            outcome: Outcome::Passed,
            message: None,
        })
    }

    fn observe(&mut self, e: &BytesStart<'_>, opts: &JunitOptions) -> Result<(), ParseError> {
        let outcome = match e.name().as_ref() {
            b"failure" | b"rerunFailure" => Outcome::Failed,
            b"error" | b"rerunError" => Outcome::Errored,
            b"skipped" => Outcome::Skipped,
            // flakyFailure/flakyError: the test passed on retry.
            _ => return Ok(()),
        };

        let message = attr_value(e, b"message")?;
        let outcome = match (&outcome, &message) {
            (Outcome::Skipped, Some(msg))
                if !opts.exclusion_marker.is_empty() && msg.contains(&opts.exclusion_marker) =>
            {
                Outcome::Excluded
            }
            _ => outcome,
        };

        if severity(outcome) > severity(self.outcome) {
            self.outcome = outcome;
            self.message = message;
        }
        Ok(())
    }

    fn finish(self) -> TestRecord {
        TestRecord {
            key: self.key,
            outcome: self.outcome,
            message: self.message,
        }
    }
}

// Failure and error outrank any kind of skip.
fn severity(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Passed => 0,
        Outcome::Skipped => 1,
        Outcome::Excluded => 2,
        Outcome::Failed | Outcome::Errored => 3,
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ParseError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| attribute_error(e, err.into()))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| attribute_error(e, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn attribute_error(e: &BytesStart<'_>, source: quick_xml::Error) -> ParseError {
    ParseError::Attribute {
        element: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        source,
    }
}
