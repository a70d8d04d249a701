/// Vertices per bird in the point-cloud mesh.
pub const POINT_VERTICES: u32 = 9;

/// Texel lookup for one point: `reference` addresses the point's texel in
/// `texturePosition`, `vertex` is its index within the bird.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointReference {
    pub reference: [f32; 2],
    pub vertex: u32,
}

pub fn point_references(width: u32) -> Vec<PointReference> {
    let count = width * width;
    let scale = width as f32;
    (0..count)
        .map(|v| PointReference {
            reference: [(v % width) as f32 / scale, (v / width) as f32 / scale],
            vertex: v % POINT_VERTICES,
        })
        .collect()
}
