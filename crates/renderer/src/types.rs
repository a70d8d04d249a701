use std::fmt;
use std::sync::Arc;

use crate::simulation::SlotId;

/// Shape of a uniform as seen by GLSL header synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniformKind {
    Scalar,
    Vector2,
    Vector3,
    Vector4,
    Texture,
    /// A value tag the header writer has no GLSL type for.
    Unmapped(String),
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformKind::Scalar => f.write_str("scalar"),
            UniformKind::Vector2 => f.write_str("vec2"),
            UniformKind::Vector3 => f.write_str("vec3"),
            UniformKind::Vector4 => f.write_str("vec4"),
            UniformKind::Texture => f.write_str("texture"),
            UniformKind::Unmapped(tag) => write!(f, "unmapped '{tag}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Vector4([f32; 4]),
    Texture(TextureSource),
    Other { tag: String, components: Vec<f32> },
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Scalar(_) => UniformKind::Scalar,
            UniformValue::Vector2(_) => UniformKind::Vector2,
            UniformValue::Vector3(_) => UniformKind::Vector3,
            UniformValue::Vector4(_) => UniformKind::Vector4,
            UniformValue::Texture(_) => UniformKind::Texture,
            UniformValue::Other { tag, .. } => UniformKind::Unmapped(tag.clone()),
        }
    }
}

/// A named, typed shader input. Identity is the name.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDescriptor {
    pub name: String,
    pub value: UniformValue,
}

impl UniformDescriptor {
    pub fn new(name: impl Into<String>, value: UniformValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn scalar(name: impl Into<String>, value: f32) -> Self {
        Self::new(name, UniformValue::Scalar(value))
    }

    pub fn vector2(name: impl Into<String>, value: [f32; 2]) -> Self {
        Self::new(name, UniformValue::Vector2(value))
    }

    pub fn vector3(name: impl Into<String>, value: [f32; 3]) -> Self {
        Self::new(name, UniformValue::Vector3(value))
    }

    pub fn vector4(name: impl Into<String>, value: [f32; 4]) -> Self {
        Self::new(name, UniformValue::Vector4(value))
    }

    pub fn texture(name: impl Into<String>, source: TextureSource) -> Self {
        Self::new(name, UniformValue::Texture(source))
    }

    pub fn kind(&self) -> UniformKind {
        self.value.kind()
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self.value {
            UniformValue::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

/// Where a texture uniform's texels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// CPU-side pixels uploaded by the consumer.
    Pixels(Arc<PixelBuffer>),
    /// A simulation surface that already lives on the GPU.
    Surface(SlotId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Rgba32Float,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgba32Float => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Returns `None` when `data` does not hold exactly `width * height` pixels.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        (data.len() == expected).then_some(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
