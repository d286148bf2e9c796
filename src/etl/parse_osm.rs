use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use crate::config::UserConfig;
use crate::data::boundary::BoundaryBox;
use crate::data::osm::{Member, MemberType, Node, OsmId, Relation, Tags, Way};
use crate::data::OsmMapData;
use crate::errors::{Error, Result};
use crate::etl::Etl;

pub const ETL_NAME: &str = "parse_osm";
pub const OUTPUT_FILE_NAME: &str = "osm_data.rkyv";

/// Element whose child elements are being read.
enum ParserState {
    Top,
    Node(Node),
    Way(Way),
    Relation(Relation),
}

/// Attributes of one XML element as owned strings.
fn attributes(element: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut result = Vec::new();
    for attribute in element.attributes() {
        let attribute = attribute?;
        let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute.unescape_value()?.into_owned();
        result.push((key, value));
    }
    Ok(result)
}

fn attribute<'a>(attributes: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(attribute_key, _)| attribute_key == key)
        .map(|(_, value)| value.as_str())
}

fn parse_id(attributes: &[(String, String)]) -> Result<OsmId> {
    let id = attribute(attributes, "id").ok_or_else(|| Error::malformed("Element without id"))?;
    Ok(id.trim().parse()?)
}

fn parse_node(attributes: &[(String, String)]) -> Result<Node> {
    let id = parse_id(attributes)?;
    let coordinate = |key: &str| -> Result<f64> {
        let value = attribute(attributes, key)
            .ok_or_else(|| Error::malformed(format!("Node {} has no {}", id, key)))?;
        Ok(value.trim().parse()?)
    };
    Ok(Node {
        id,
        lat: coordinate("lat")?,
        lon: coordinate("lon")?,
        tags: Tags::new(),
    })
}

fn parse_bounds(attributes: &[(String, String)]) -> Result<BoundaryBox> {
    let value = |key: &str| -> Result<f64> {
        let value = attribute(attributes, key)
            .ok_or_else(|| Error::malformed(format!("Bounds without {}", key)))?;
        Ok(value.trim().parse()?)
    };
    BoundaryBox::new(value("minlon")?, value("minlat")?, value("maxlon")?, value("maxlat")?)
}

fn parse_member(attributes: &[(String, String)]) -> Result<Member> {
    let member_type = match attribute(attributes, "type") {
        Some("node") => MemberType::Node,
        Some("way") => MemberType::Way,
        Some("relation") => MemberType::Relation,
        other => return Err(Error::malformed(format!("Unknown member type {:?}", other))),
    };
    let reference = attribute(attributes, "ref")
        .ok_or_else(|| Error::malformed("Member without ref"))?
        .trim()
        .parse()?;
    Ok(Member {
        member_type,
        reference,
        role: attribute(attributes, "role").unwrap_or_default().to_string(),
    })
}

/// Reads OSM XML into memory. Elements that cannot be understood are skipped
/// with a warning; XML that cannot be read at all is an error.
pub fn parse_osm_reader<R: BufRead>(source: R) -> Result<OsmMapData> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut data = OsmMapData::default();
    let mut state = ParserState::Top;
    let mut skipped = 0;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => break,
            Event::Start(ref element) | Event::Empty(ref element) => {
                let is_empty = matches!(event, Event::Empty(_));
                let attributes = attributes(element)?;
                let parsed = match element.name().as_ref() {
                    b"node" => parse_node(&attributes).map(|node| Some(ParserState::Node(node))),
                    b"way" => parse_id(&attributes).map(|id| {
                        Some(ParserState::Way(Way { id, nodes: Vec::new(), tags: Tags::new() }))
                    }),
                    b"relation" => parse_id(&attributes).map(|id| {
                        Some(ParserState::Relation(Relation { id, members: Vec::new(), tags: Tags::new() }))
                    }),
                    b"tag" => {
                        if let (Some(key), Some(value)) = (attribute(&attributes, "k"), attribute(&attributes, "v")) {
                            let tags = match &mut state {
                                ParserState::Node(node) => Some(&mut node.tags),
                                ParserState::Way(way) => Some(&mut way.tags),
                                ParserState::Relation(relation) => Some(&mut relation.tags),
                                ParserState::Top => None,
                            };
                            if let Some(tags) = tags {
                                tags.insert(key.to_string(), value.to_string());
                            }
                        }
                        Ok(None)
                    },
                    b"nd" => match (&mut state, attribute(&attributes, "ref")) {
                        (ParserState::Way(way), Some(reference)) => reference
                            .trim()
                            .parse()
                            .map(|reference| {
                                way.nodes.push(reference);
                                None
                            })
                            .map_err(Error::from),
                        _ => Ok(None),
                    },
                    b"member" => match &mut state {
                        ParserState::Relation(relation) => parse_member(&attributes).map(|member| {
                            relation.members.push(member);
                            None
                        }),
                        _ => Ok(None),
                    },
                    b"bounds" => parse_bounds(&attributes).map(|boundary| {
                        data.boundary = Some(boundary);
                        None
                    }),
                    _ => Ok(None),
                };

                match parsed {
                    Ok(Some(element_state)) => {
                        if is_empty {
                            finish_element(&mut data, element_state);
                        } else {
                            state = element_state;
                        }
                    },
                    Ok(None) => (),
                    Err(err) => {
                        skipped += 1;
                        warn!(position = reader.buffer_position(), err = err.message.as_str(); "Skipping OSM element");
                    },
                }
            },
            Event::End(ref element) => {
                if matches!(element.name().as_ref(), b"node" | b"way" | b"relation") {
                    let finished = std::mem::replace(&mut state, ParserState::Top);
                    finish_element(&mut data, finished);
                }
            },
            _ => (),
        }
        buf.clear();
    }

    info!(
        nodes = data.nodes.len(),
        ways = data.ways.len(),
        relations = data.relations.len(),
        skipped = skipped;
        "Parsed OSM data"
    );
    Ok(data)
}

fn finish_element(data: &mut OsmMapData, state: ParserState) {
    match state {
        ParserState::Node(node) => data.add_node(node),
        ParserState::Way(way) => data.add_way(way),
        ParserState::Relation(relation) => data.add_relation(relation),
        ParserState::Top => (),
    }
}

pub struct ParseOsmEtl<'a> {
    config: &'a UserConfig,
}

impl ParseOsmEtl<'_> {
    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    /// `.xz` files are decompressed on the fly.
    fn create_osm_reader(&self) -> Result<Box<dyn BufRead>> {
        let path = &self.config.data_path;
        let file = File::open(path)
            .map_err(|err| Error::from(format!("Could not open {}: {}", path.display(), err)))?;
        let file_reader = BufReader::new(file);
        if path.extension().is_some_and(|extension| extension == "xz") {
            Ok(Box::new(BufReader::new(XzDecoder::new(file_reader))))
        } else {
            Ok(Box::new(file_reader))
        }
    }

    pub fn new(config: &UserConfig) -> ParseOsmEtl {
        ParseOsmEtl {
            config
        }
    }
}

impl Etl for ParseOsmEtl<'_> {
    type Input = Box<dyn BufRead>;
    type Output = OsmMapData;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).exists())
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        fs::remove_file(Self::output_path(dir))?;
        Ok(())
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        self.create_osm_reader()
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        parse_osm_reader(input)
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let mut output_file = File::create(Self::output_path(dir))?;
        let bytes = rkyv::to_bytes::<_, 256>(&output)
            .map_err(|err| Error::from(format!("Could not serialize OSM data: {:?}", err)))?;
        output_file.write_all(&bytes)?;
        Ok(())
    }
}
