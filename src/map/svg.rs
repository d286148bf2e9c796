use std::fmt::Write as _;

use pathfinder_geometry::vector::Vector2F;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::{errors::Result, map::color::Color};

/// Two decimals is well below a pixel and keeps output stable across runs.
pub fn fmt_num(value: f32) -> String {
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

pub fn fmt_point(point: Vector2F) -> String {
    format!("{},{}", fmt_num(point.x()), fmt_num(point.y()))
}

/// Builder for the `d` attribute of a path.
#[derive(Debug, Clone, Default)]
pub struct PathCommands {
    commands: String,
}

impl PathCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps commands that are already in `d` syntax, like icon paths.
    pub fn from_raw(commands: &str) -> Self {
        PathCommands { commands: commands.trim().to_string() }
    }

    fn push(&mut self, command: char, point: Vector2F) {
        if !self.commands.is_empty() {
            self.commands.push(' ');
        }
        let _ = write!(self.commands, "{} {}", command, fmt_point(point));
    }

    pub fn move_to(mut self, point: Vector2F) -> Self {
        self.push('M', point);
        self
    }

    pub fn line_to(mut self, point: Vector2F) -> Self {
        self.push('L', point);
        self
    }

    pub fn arc_to(mut self, radius: f32, large_arc: bool, sweep: bool, point: Vector2F) -> Self {
        let _ = write!(
            self.commands,
            " A {},{} 0 {} {} {}",
            fmt_num(radius),
            fmt_num(radius),
            large_arc as u8,
            sweep as u8,
            fmt_point(point)
        );
        self
    }

    pub fn close(mut self) -> Self {
        self.commands.push_str(" Z");
        self
    }

    /// `M p0 L p1 ... [Z]`; nothing for an empty ring.
    pub fn polyline(mut self, points: &[Vector2F], closed: bool) -> Self {
        let Some((first, rest)) = points.split_first() else {
            return self;
        };
        self = self.move_to(*first);
        for point in rest {
            self = self.line_to(*point);
        }
        if closed {
            self = self.close();
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.commands
    }
}

/// Vector-graphics scene document. Elements appear in the order they are written,
/// later ones occluding earlier ones.
pub struct SvgDocument {
    writer: Writer<Vec<u8>>,
    open_groups: usize,
    gradient_count: usize,
}

impl SvgDocument {
    pub fn new(size: Vector2F) -> Result<Self> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let width = fmt_num(size.x());
        let height = fmt_num(size.y());
        let view_box = format!("0 0 {} {}", width, height);
        let mut root = BytesStart::new("svg");
        root.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
        root.push_attribute(("width", width.as_str()));
        root.push_attribute(("height", height.as_str()));
        root.push_attribute(("viewBox", view_box.as_str()));
        writer.write_event(Event::Start(root))?;

        Ok(SvgDocument {
            writer,
            open_groups: 0,
            gradient_count: 0,
        })
    }

    fn element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut element = BytesStart::new(name);
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    pub fn path(&mut self, commands: &PathCommands, attributes: &[(&str, &str)]) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        let mut all = vec![("d", commands.as_str())];
        all.extend_from_slice(attributes);
        self.element("path", &all)
    }

    pub fn rect(&mut self, origin: Vector2F, size: Vector2F, fill: Color) -> Result<()> {
        let x = fmt_num(origin.x());
        let y = fmt_num(origin.y());
        let width = fmt_num(size.x());
        let height = fmt_num(size.y());
        let fill = fill.hex();
        self.element(
            "rect",
            &[
                ("x", x.as_str()),
                ("y", y.as_str()),
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("fill", fill.as_str()),
            ],
        )
    }

    pub fn circle(&mut self, center: Vector2F, radius: f32, attributes: &[(&str, &str)]) -> Result<()> {
        let cx = fmt_num(center.x());
        let cy = fmt_num(center.y());
        let r = fmt_num(radius);
        let mut all = vec![("cx", cx.as_str()), ("cy", cy.as_str()), ("r", r.as_str())];
        all.extend_from_slice(attributes);
        self.element("circle", &all)
    }

    pub fn text(&mut self, position: Vector2F, content: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let x = fmt_num(position.x());
        let y = fmt_num(position.y());
        let mut element = BytesStart::new("text");
        element.push_attribute(("x", x.as_str()));
        element.push_attribute(("y", y.as_str()));
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Start(element))?;
        self.writer.write_event(Event::Text(BytesText::new(content)))?;
        self.writer.write_event(Event::End(BytesEnd::new("text")))?;
        Ok(())
    }

    pub fn start_group(&mut self, attributes: &[(&str, &str)]) -> Result<()> {
        let mut element = BytesStart::new("g");
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Start(element))?;
        self.open_groups += 1;
        Ok(())
    }

    pub fn end_group(&mut self) -> Result<()> {
        if self.open_groups == 0 {
            return Err("No open group to close".into());
        }
        self.writer.write_event(Event::End(BytesEnd::new("g")))?;
        self.open_groups -= 1;
        Ok(())
    }

    /// Defines a radial gradient and returns the `url(#...)` to fill with.
    /// Stops are `(offset, color, opacity)`.
    pub fn radial_gradient(
        &mut self,
        center: Vector2F,
        radius: f32,
        stops: &[(f32, Color, f32)],
    ) -> Result<String> {
        self.gradient_count += 1;
        let id = format!("gradient_{}", self.gradient_count);

        self.writer.write_event(Event::Start(BytesStart::new("defs")))?;
        let cx = fmt_num(center.x());
        let cy = fmt_num(center.y());
        let r = fmt_num(radius);
        let mut gradient = BytesStart::new("radialGradient");
        gradient.push_attribute(("id", id.as_str()));
        gradient.push_attribute(("cx", cx.as_str()));
        gradient.push_attribute(("cy", cy.as_str()));
        gradient.push_attribute(("r", r.as_str()));
        gradient.push_attribute(("gradientUnits", "userSpaceOnUse"));
        self.writer.write_event(Event::Start(gradient))?;
        for (offset, color, opacity) in stops {
            let offset = fmt_num(*offset);
            let color = color.hex();
            let opacity = fmt_num(*opacity);
            self.element(
                "stop",
                &[
                    ("offset", offset.as_str()),
                    ("stop-color", color.as_str()),
                    ("stop-opacity", opacity.as_str()),
                ],
            )?;
        }
        self.writer.write_event(Event::End(BytesEnd::new("radialGradient")))?;
        self.writer.write_event(Event::End(BytesEnd::new("defs")))?;

        Ok(format!("url(#{})", id))
    }

    /// Closes open groups and the root element.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        while self.open_groups > 0 {
            self.end_group()?;
        }
        self.writer.write_event(Event::End(BytesEnd::new("svg")))?;
        Ok(self.writer.into_inner())
    }
}
