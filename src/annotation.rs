//! Sleep-stage annotations from Profusion XML files.
//!
//! ```xml
//! <CMPStudyConfig>
//!   <EpochLength>30</EpochLength>
//!   <SleepStages>
//!     <SleepStage>0</SleepStage>
//!     <SleepStage>1</SleepStage>
//!     …
//!   </SleepStages>
//! </CMPStudyConfig>
//! ```
//!
//! Every child of `<SleepStages>` is one 30 s epoch; its text is kept as an
//! opaque label token.
use std::path::Path;

use anyhow::{bail, Context, Result};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Read the sleep stages of a Profusion annotation file.
pub fn read_sleep_stages(path: &Path) -> Result<Vec<String>> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    parse_sleep_stages(&xml).with_context(|| format!("parse {}", path.display()))
}

/// Text of each direct child of the first `<SleepStages>` element, in
/// document order.  Empty children yield empty labels.
pub fn parse_sleep_stages(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    // Depth of the open <SleepStages> element, while inside it.
    let mut stages_depth: Option<usize> = None;
    let mut found = false;
    let mut current: Option<String> = None;
    let mut stages = Vec::new();

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("XML error near byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                match stages_depth {
                    Some(d) if depth == d + 1 => current = Some(String::new()),
                    None if !found && e.name().as_ref() == b"SleepStages" => {
                        stages_depth = Some(depth);
                        found = true;
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match stages_depth {
                Some(d) if depth == d => stages.push(String::new()),
                None if e.name().as_ref() == b"SleepStages" => found = true,
                _ => {}
            },
            Event::Text(t) => {
                if let Some(label) = current.as_mut() {
                    label.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::CData(t) => {
                if let Some(label) = current.as_mut() {
                    label.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::GeneralRef(r) => {
                if let Some(label) = current.as_mut() {
                    if let Some(c) = r.resolve_char_ref()? {
                        label.push(c);
                    } else {
                        let name = r.decode()?;
                        match resolve_predefined_entity(&name) {
                            Some(text) => label.push_str(text),
                            None => bail!("undefined entity &{name};"),
                        }
                    }
                }
            }
            Event::End(_) => {
                match stages_depth {
                    Some(d) if depth == d + 1 => stages.extend(current.take()),
                    Some(d) if depth == d => stages_depth = None,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !found {
        bail!("no <SleepStages> element");
    }
    Ok(stages)
}
