//! Geometry and capture types shared by the engine, the robot and the chain

use crate::element::UIElement;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this point shifted by the given offsets.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A screen-space rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl From<(f64, f64, f64, f64)> for Bounds {
    fn from((x, y, width, height): (f64, f64, f64, f64)) -> Self {
        Self::new(x, y, width, height)
    }
}

/// Anything a screen point can be computed from.
///
/// Windows and scenes are elements in this model, so [`Target::Element`]
/// covers them as well as ordinary nodes.
#[derive(Debug, Clone)]
pub enum Target {
    Point(Point),
    Bounds(Bounds),
    Element(UIElement),
}

impl From<Point> for Target {
    fn from(point: Point) -> Self {
        Target::Point(point)
    }
}

impl From<(f64, f64)> for Target {
    fn from(coords: (f64, f64)) -> Self {
        Target::Point(coords.into())
    }
}

impl From<Bounds> for Target {
    fn from(bounds: Bounds) -> Self {
        Target::Bounds(bounds)
    }
}

impl From<UIElement> for Target {
    fn from(element: UIElement) -> Self {
        Target::Element(element)
    }
}

impl From<&UIElement> for Target {
    fn from(element: &UIElement) -> Self {
        Target::Element(element.clone())
    }
}

/// Holds the screenshot data
#[derive(Debug, Clone)]
pub struct ScreenshotResult {
    /// Raw image data (RGBA)
    pub image_data: Vec<u8>,
    /// Width of the image
    pub width: u32,
    /// Height of the image
    pub height: u32,
}

impl ScreenshotResult {
    /// Converts the raw RGBA buffer into an [`image::RgbaImage`].
    ///
    /// Returns `None` when the buffer length does not match `width * height * 4`.
    pub fn to_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.image_data.clone())
    }
}
