use crate::{
    data::osm::Tags,
    errors::{Error, Result},
};

/// Numbers listed in a `level` or `layer` value such as `-1;0` or `0,5`.
/// `None` when any entry is not a number.
fn numbers(value: &str) -> Option<Vec<f64>> {
    value
        .split(';')
        .map(|part| part.trim().replace(',', ".").parse::<f64>().ok())
        .collect()
}

fn is_below_ground(tags: &Tags, key: &str) -> bool {
    tags.get(key)
        .and_then(|value| numbers(value))
        .is_some_and(|values| values.iter().any(|value| *value < 0.0))
}

/// Which floor of the map is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelFilter {
    Overground,
    Underground,
    All,
    Level(f64),
}

impl LevelFilter {
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim() {
            "overground" => Ok(LevelFilter::Overground),
            "underground" => Ok(LevelFilter::Underground),
            "all" => Ok(LevelFilter::All),
            other => other
                .replace(',', ".")
                .parse()
                .map(LevelFilter::Level)
                .map_err(|_| Error::scheme(format!("Unknown level `{}`", text))),
        }
    }

    /// Negative `level` or `layer` values and underground parkings count as
    /// underground. Unparsable values are ignored.
    pub fn matches(&self, tags: &Tags) -> bool {
        let overground = || {
            !is_below_ground(tags, "level")
                && !is_below_ground(tags, "layer")
                && tags.get("parking").map(String::as_str) != Some("underground")
        };
        match self {
            LevelFilter::All => true,
            LevelFilter::Overground => overground(),
            LevelFilter::Underground => !overground(),
            LevelFilter::Level(level) => tags
                .get("level")
                .and_then(|value| numbers(value))
                .is_some_and(|values| values.contains(level)),
        }
    }
}
