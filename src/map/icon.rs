use pathfinder_geometry::vector::Vector2F;

use crate::{
    errors::Result,
    map::{
        color::Color,
        shapes::Shape,
        svg::{fmt_num, PathCommands, SvgDocument},
    },
};

/// Side of the square grid icons are drawn on.
pub const ICON_SIZE: f32 = 16.0;

/// One colored layer of an icon.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpecification {
    pub shape: Shape,
    pub color: Color,
    pub offset: Vector2F,
}

impl ShapeSpecification {
    /// The outline pass is a thick stroke in a contrasting color under the shape.
    fn draw(&self, svg: &mut SvgDocument, point: Vector2F, outline_opacity: Option<f32>) -> Result<()> {
        let position = point + self.offset;
        let transform = format!("translate({},{})", fmt_num(position.x()), fmt_num(position.y()));
        let commands = PathCommands::from_raw(&self.shape.path);

        match outline_opacity {
            Some(opacity) => {
                let outline_color = if self.color.is_bright() { Color::BLACK } else { Color::WHITE };
                let color = outline_color.hex();
                let opacity = fmt_num(opacity);
                svg.path(
                    &commands,
                    &[
                        ("transform", transform.as_str()),
                        ("fill", color.as_str()),
                        ("stroke", color.as_str()),
                        ("stroke-width", "2.2"),
                        ("stroke-linejoin", "round"),
                        ("opacity", opacity.as_str()),
                    ],
                )
            }
            None => {
                let color = self.color.hex();
                svg.path(&commands, &[("transform", transform.as_str()), ("fill", color.as_str())])
            }
        }
    }
}

/// Stack of shapes drawn on top of each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pub shape_specifications: Vec<ShapeSpecification>,
    is_default: bool,
}

impl Icon {
    pub fn new(shape_specifications: Vec<ShapeSpecification>) -> Self {
        Icon { shape_specifications, is_default: false }
    }

    /// The neutral shape used when no rule describes the element.
    pub fn default_icon(shape: Shape, color: Color) -> Self {
        let offset = shape.offset;
        Icon {
            shape_specifications: vec![ShapeSpecification { shape, color, offset }],
            is_default: true,
        }
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn draw(&self, svg: &mut SvgDocument, point: Vector2F, outline: bool) -> Result<()> {
        if outline {
            for specification in &self.shape_specifications {
                specification.draw(svg, point, Some(0.5))?;
            }
        }
        for specification in &self.shape_specifications {
            specification.draw(svg, point, None)?;
        }
        Ok(())
    }
}

/// Resolved visual of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct IconSet {
    pub main_icon: Icon,
    pub extra_icons: Vec<Icon>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathfinder_geometry::vector::vec2f;

    fn render(icon: &Icon, outline: bool) -> String {
        let mut svg = SvgDocument::new(vec2f(32.0, 32.0)).unwrap();
        icon.draw(&mut svg, vec2f(16.0, 16.0), outline).unwrap();
        String::from_utf8(svg.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_default_icon() {
        let icon = Icon::default_icon(Shape::fallback(), Color::BLACK);
        assert!(icon.is_default());
        assert!(!Icon::new(icon.shape_specifications.clone()).is_default());
    }

    #[test]
    fn test_outline_contrasts_with_fill() {
        let icon = Icon::default_icon(Shape::fallback(), Color::BLACK);
        let output = render(&icon, true);
        assert_eq!(output.matches("<path").count(), 2);
        assert!(output.contains("stroke=\"#ffffff\""));
        assert!(output.contains("translate(8,8)"));

        assert_eq!(render(&icon, false).matches("<path").count(), 1);
    }
}
