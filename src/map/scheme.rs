use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use log::warn;
use pathfinder_geometry::vector::{vec2f, Vector2F};
use regex::Regex;

use crate::{
    data::osm::{has_kv_pair, Tags},
    errors::{Error, Result},
    map::{
        color::Color,
        icon::{Icon, IconSet, ShapeSpecification},
        shapes::ShapeProvider,
    },
};

const BUILTIN_SCHEME: &str = include_str!("../../resources/scheme/default.json");

const DEFAULT_COLOR: &str = "default";
const EXTRA_COLOR: &str = "extra";

/// Priority of points whose tags match no main icon rule.
pub const DEFAULT_POINT_PRIORITY: i32 = 0;

/// One test against a tag mapping. A missing key never matches.
#[derive(Debug, Clone)]
pub enum TagPredicate {
    /// `key=value`, where `value` may be one item of a `;` list.
    Exact { key: String, value: String },
    /// Any value for `key`.
    Present { key: String },
    /// Value matches the pattern; its capture groups parameterize shape identifiers.
    Capture { key: String, pattern: Regex },
}

impl TagPredicate {
    /// `*` means presence, a leading `^` a pattern, anything else an exact value.
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        let key = key.to_string();
        if value == "*" {
            Ok(TagPredicate::Present { key })
        } else if value.starts_with('^') {
            Ok(TagPredicate::Capture { key, pattern: Regex::new(value)? })
        } else {
            Ok(TagPredicate::Exact { key, value: value.to_string() })
        }
    }

    pub fn evaluate(&self, tags: &Tags, captures: &mut Vec<String>) -> bool {
        match self {
            TagPredicate::Exact { key, value } => has_kv_pair(tags, key, value),
            TagPredicate::Present { key } => tags.contains_key(key),
            TagPredicate::Capture { key, pattern } => {
                let Some(value) = tags.get(key) else {
                    return false;
                };
                match pattern.captures(value) {
                    Some(groups) => {
                        captures.extend(
                            groups.iter()
                                .skip(1)
                                .map(|group| group.map_or(String::new(), |group| group.as_str().to_string())),
                        );
                        true
                    }
                    None => false,
                }
            }
        }
    }
}

/// Conjunction of predicates.
#[derive(Debug, Clone)]
pub struct Condition {
    predicates: Vec<TagPredicate>,
}

impl Condition {
    fn from_tags(tags: &BTreeMap<String, String>) -> Result<Self> {
        if tags.is_empty() {
            return Err(Error::scheme("Rule without tags would match everything"));
        }
        let predicates = tags
            .iter()
            .map(|(key, value)| TagPredicate::parse(key, value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Condition { predicates })
    }

    /// Captured groups of every pattern predicate, in predicate order, on a match.
    pub fn matches(&self, tags: &Tags) -> Option<Vec<String>> {
        let mut captures = Vec::new();
        self.predicates
            .iter()
            .all(|predicate| predicate.evaluate(tags, &mut captures))
            .then_some(captures)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleId {
    Main(usize),
    Extra(usize),
}

#[derive(Debug, Clone)]
struct ShapeTemplate {
    shape_id: String,
    color: Option<String>,
    offset: Option<Vector2F>,
}

#[derive(Debug, Clone)]
struct IconRule {
    condition: Condition,
    shapes: Vec<ShapeTemplate>,
    color: Option<String>,
    priority: i32,
}

/// Stroke and fill attributes of a way, plus its drawing priority.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub attributes: BTreeMap<String, String>,
    pub priority: f64,
}

impl LineStyle {
    pub fn is_filled(&self) -> bool {
        self.attributes.get("fill").is_some_and(|fill| fill != "none")
    }

    /// The same style with the fill removed, for open ways.
    pub fn without_fill(&self) -> Self {
        let mut style = self.clone();
        style.attributes.insert("fill".to_string(), "none".to_string());
        style
    }
}

#[derive(Debug, Clone)]
struct WayRule {
    condition: Condition,
    style: LineStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadStyle {
    pub color: Color,
    pub border_color: Color,
    /// Meters.
    pub default_width: f64,
    pub priority: f64,
}

#[derive(Debug, Clone)]
struct RoadRule {
    condition: Condition,
    style: RoadStyle,
}

mod raw {
    use std::collections::BTreeMap;

    use serde::Deserialize;

    use crate::map::color::Color;

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub enum ShapeRef {
        Id(String),
        Detailed {
            shape: String,
            #[serde(default)]
            color: Option<String>,
            #[serde(default)]
            offset: Option<[f32; 2]>,
        },
    }

    #[derive(Deserialize)]
    pub struct IconRule {
        pub tags: BTreeMap<String, String>,
        pub shapes: Vec<ShapeRef>,
        #[serde(default)]
        pub color: Option<String>,
        #[serde(default)]
        pub priority: Option<i32>,
    }

    #[derive(Deserialize)]
    pub struct WayRule {
        pub tags: BTreeMap<String, String>,
        pub style: BTreeMap<String, serde_json::Value>,
        #[serde(default)]
        pub priority: f64,
    }

    #[derive(Deserialize)]
    pub struct RoadRule {
        pub tags: BTreeMap<String, String>,
        pub color: String,
        pub border_color: String,
        pub default_width: f64,
        pub priority: f64,
    }

    #[derive(Deserialize)]
    pub struct Scheme {
        pub colors: BTreeMap<String, Color>,
        #[serde(default)]
        pub node_icons: Vec<IconRule>,
        #[serde(default)]
        pub extra_icons: Vec<IconRule>,
        #[serde(default)]
        pub ways: Vec<WayRule>,
        #[serde(default)]
        pub roads: Vec<RoadRule>,
    }
}

/// Declarative mapping from tags to visual style.
///
/// Main icon rules are tried in declaration order and the first match wins.
/// Extra icon rules are all tried, independently of the main pass, and every
/// match adds one extra icon in the order the extra rules are declared.
#[derive(Debug, Clone)]
pub struct Scheme {
    colors: BTreeMap<String, Color>,
    main_rules: Vec<IconRule>,
    extra_rules: Vec<IconRule>,
    way_rules: Vec<WayRule>,
    road_rules: Vec<RoadRule>,
}

impl Scheme {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: raw::Scheme = serde_json::from_str(text)
            .map_err(|err| Error::scheme(format!("Invalid scheme: {}", err)))?;
        Self::compile(raw)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let raw: raw::Scheme = serde_json::from_reader(reader)
            .map_err(|err| Error::scheme(format!("Invalid scheme {}: {}", path.display(), err)))?;
        Self::compile(raw)
    }

    /// Scheme shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_SCHEME)
    }

    fn compile(raw: raw::Scheme) -> Result<Self> {
        for required in [DEFAULT_COLOR, EXTRA_COLOR] {
            if !raw.colors.contains_key(required) {
                return Err(Error::scheme(format!("Scheme has no `{}` color", required)));
            }
        }
        let mut scheme = Scheme {
            colors: raw.colors,
            main_rules: Vec::new(),
            extra_rules: Vec::new(),
            way_rules: Vec::new(),
            road_rules: Vec::new(),
        };

        let main_count = raw.node_icons.len();
        for (index, rule) in raw.node_icons.into_iter().enumerate() {
            let default_priority = (main_count - index) as i32;
            scheme.main_rules.push(Self::compile_icon_rule(rule, default_priority)?);
        }
        for rule in raw.extra_icons {
            scheme.extra_rules.push(Self::compile_icon_rule(rule, DEFAULT_POINT_PRIORITY)?);
        }
        for rule in raw.ways {
            let attributes = rule.style
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(text) => scheme.resolve_color_name(text),
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect();
            scheme.way_rules.push(WayRule {
                condition: Condition::from_tags(&rule.tags)?,
                style: LineStyle { attributes, priority: rule.priority },
            });
        }
        for rule in raw.roads {
            let style = RoadStyle {
                color: scheme.get_color(&rule.color)?,
                border_color: scheme.get_color(&rule.border_color)?,
                default_width: rule.default_width,
                priority: rule.priority,
            };
            scheme.road_rules.push(RoadRule { condition: Condition::from_tags(&rule.tags)?, style });
        }
        Ok(scheme)
    }

    fn compile_icon_rule(rule: raw::IconRule, default_priority: i32) -> Result<IconRule> {
        if rule.shapes.is_empty() {
            return Err(Error::scheme(format!("Icon rule for {:?} has no shapes", rule.tags)));
        }
        let shapes = rule.shapes
            .into_iter()
            .map(|shape| match shape {
                raw::ShapeRef::Id(shape_id) => ShapeTemplate { shape_id, color: None, offset: None },
                raw::ShapeRef::Detailed { shape, color, offset } => ShapeTemplate {
                    shape_id: shape,
                    color,
                    offset: offset.map(|[x, y]| vec2f(x, y)),
                },
            })
            .collect();
        Ok(IconRule {
            condition: Condition::from_tags(&rule.tags)?,
            shapes,
            color: rule.color,
            priority: rule.priority.unwrap_or(default_priority),
        })
    }

    /// Scheme color names in style attributes become hex values.
    fn resolve_color_name(&self, text: String) -> String {
        match self.colors.get(&text) {
            Some(color) => color.hex(),
            None => text,
        }
    }

    /// A scheme color name or a literal color.
    pub fn get_color(&self, name: &str) -> Result<Color> {
        match self.colors.get(name) {
            Some(color) => Ok(*color),
            None => Color::parse(name),
        }
    }

    /// Like `get_color`, but an unknown name falls back to `fallback`.
    pub fn color_or(&self, name: &str, fallback: Color) -> Color {
        self.get_color(name).unwrap_or(fallback)
    }

    pub fn default_color(&self) -> Color {
        self.colors.get(DEFAULT_COLOR).copied().unwrap_or(Color::BLACK)
    }

    pub fn extra_color(&self) -> Color {
        self.colors.get(EXTRA_COLOR).copied().unwrap_or(Color::BLACK)
    }

    fn build_icon(
        &self,
        shapes: &dyn ShapeProvider,
        rule: &IconRule,
        captures: &[String],
        base_color: Color,
    ) -> Icon {
        let rule_color = rule.color
            .as_deref()
            .map(|name| self.color_or(name, base_color))
            .unwrap_or(base_color);

        let specifications = rule.shapes
            .iter()
            .map(|template| {
                let shape_id = substitute_captures(&template.shape_id, captures);
                let shape = match shapes.lookup(&shape_id) {
                    Ok(shape) => shape,
                    Err(err) => {
                        warn!(shape_id = shape_id.as_str(), err = err.message.as_str(); "Using default shape");
                        shapes.default_shape()
                    }
                };
                let color = template.color
                    .as_deref()
                    .map(|name| self.color_or(name, rule_color))
                    .unwrap_or(rule_color);
                let offset = template.offset.unwrap_or(shape.offset);
                ShapeSpecification { shape, color, offset }
            })
            .collect();
        Icon::new(specifications)
    }

    /// Resolves the icons of one tag mapping and reports the rules that fired.
    pub fn resolve(&self, shapes: &dyn ShapeProvider, tags: &Tags) -> (IconSet, Vec<RuleId>) {
        let mut matched = Vec::new();

        let mut main_icon = None;
        for (index, rule) in self.main_rules.iter().enumerate() {
            if let Some(captures) = rule.condition.matches(tags) {
                main_icon = Some(self.build_icon(shapes, rule, &captures, self.default_color()));
                matched.push(RuleId::Main(index));
                break;
            }
        }

        let mut extra_icons = Vec::new();
        for (index, rule) in self.extra_rules.iter().enumerate() {
            if let Some(captures) = rule.condition.matches(tags) {
                extra_icons.push(self.build_icon(shapes, rule, &captures, self.extra_color()));
                matched.push(RuleId::Extra(index));
            }
        }

        let main_icon = main_icon.unwrap_or_else(|| {
            let color = match tags.get("colour") {
                Some(value) => match self.get_color(value) {
                    Ok(color) => color,
                    Err(err) => {
                        warn!(colour = value.as_str(), err = err.message.as_str(); "Ignoring colour tag");
                        self.default_color()
                    }
                },
                None => self.default_color(),
            };
            Icon::default_icon(shapes.default_shape(), color)
        });

        (IconSet { main_icon, extra_icons }, matched)
    }

    /// Priority of the main rule among `matched`, highest for the first declared rule.
    pub fn point_priority(&self, matched: &[RuleId]) -> i32 {
        matched
            .iter()
            .find_map(|rule_id| match rule_id {
                RuleId::Main(index) => self.main_rules.get(*index).map(|rule| rule.priority),
                RuleId::Extra(_) => None,
            })
            .unwrap_or(DEFAULT_POINT_PRIORITY)
    }

    /// Styles of every way rule that matches.
    pub fn get_styles(&self, tags: &Tags) -> Vec<LineStyle> {
        self.way_rules
            .iter()
            .filter(|rule| rule.condition.matches(tags).is_some())
            .map(|rule| rule.style.clone())
            .collect()
    }

    /// First road rule that matches.
    pub fn get_road(&self, tags: &Tags) -> Option<&RoadStyle> {
        self.road_rules
            .iter()
            .find(|rule| rule.condition.matches(tags).is_some())
            .map(|rule| &rule.style)
    }
}

/// Replaces `\1`, `\2`, ... with captured groups.
fn substitute_captures(template: &str, captures: &[String]) -> String {
    let mut result = template.to_string();
    // Highest index first so `\1` does not eat the start of `\12`.
    for (index, capture) in captures.iter().enumerate().rev() {
        result = result.replace(&format!("\\{}", index + 1), capture);
    }
    result
}
