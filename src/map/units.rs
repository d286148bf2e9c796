use regex::Regex;

use crate::errors::{Error, Result};

const METERS_PER_FOOT: f64 = 0.3048;
const METERS_PER_INCH: f64 = 0.0254;

/// Reads OSM length values into meters: bare numbers are meters, `m`, `km`,
/// `ft`, `mi` suffixes are converted, and `12'6"` is feet and inches.
#[derive(Debug, Clone)]
pub struct LengthParser {
    with_unit: Regex,
    feet_inches: Regex,
}

impl LengthParser {
    pub fn new() -> Result<Self> {
        Ok(LengthParser {
            with_unit: Regex::new(r"^(-?\d+(?:[.,]\d+)?)\s*(m|km|ft|feet|mi)?$")?,
            feet_inches: Regex::new(r#"^(\d+(?:\.\d+)?)'(?:\s*(\d+(?:\.\d+)?)")?$"#)?,
        })
    }

    pub fn parse(&self, text: &str) -> Result<f64> {
        let text = text.trim();
        let malformed = || Error::malformed(format!("Invalid length `{}`", text));

        if let Some(captures) = self.feet_inches.captures(text) {
            let feet: f64 = captures[1].parse()?;
            let inches: f64 = match captures.get(2) {
                Some(inches) => inches.as_str().parse()?,
                None => 0.0,
            };
            return Ok(feet * METERS_PER_FOOT + inches * METERS_PER_INCH);
        }

        let captures = self.with_unit.captures(text).ok_or_else(malformed)?;
        let value: f64 = captures[1].replace(',', ".").parse()?;
        let factor = match captures.get(2).map(|unit| unit.as_str()) {
            None | Some("m") => 1.0,
            Some("km") => 1000.0,
            Some("ft") | Some("feet") => METERS_PER_FOOT,
            Some("mi") => 1609.344,
            Some(_) => return Err(malformed()),
        };
        Ok(value * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn parse(text: &str) -> Result<f64> {
        LengthParser::new().unwrap().parse(text)
    }

    #[test]
    fn test_meters() {
        assert_eq!(parse("12").unwrap(), 12.0);
        assert_eq!(parse(" 7.5 m").unwrap(), 7.5);
        assert_eq!(parse("3,5").unwrap(), 3.5);
        assert_eq!(parse("0.2 km").unwrap(), 200.0);
    }

    #[test]
    fn test_imperial() {
        assert!((parse("10 ft").unwrap() - 3.048).abs() < 1e-9);
        assert!((parse("1 mi").unwrap() - 1609.344).abs() < 1e-9);
        assert!((parse("12'6\"").unwrap() - (12.0 * 0.3048 + 6.0 * 0.0254)).abs() < 1e-9);
        assert!((parse("8'").unwrap() - 8.0 * 0.3048).abs() < 1e-9);
    }

    #[test]
    fn test_malformed() {
        assert_eq!(parse("tall").unwrap_err().kind, ErrorKind::MalformedElement);
        assert_eq!(parse("12 furlongs").unwrap_err().kind, ErrorKind::MalformedElement);
        assert!(parse("").is_err());
    }
}
