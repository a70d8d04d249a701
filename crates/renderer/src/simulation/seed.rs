use rand::Rng;

use super::Channel;

/// Initial RGBA32F contents for one channel, row-major, four floats per texel.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedTexture {
    pub width: u32,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedTextures {
    pub position: SeedTexture,
    pub velocity: SeedTexture,
}

impl SeedTextures {
    pub fn get(&self, channel: Channel) -> &SeedTexture {
        match channel {
            Channel::Position => &self.position,
            Channel::Velocity => &self.velocity,
        }
    }
}

/// Positions uniform in a cube of edge `cube_size` centred on the origin,
/// velocities uniform in a ball of diameter 1, fourth channel in `[0, 1)`.
pub fn seed_textures(width: u32, cube_size: f32, rng: &mut impl Rng) -> SeedTextures {
    let texels = width as usize * width as usize;
    let half = cube_size / 2.0;

    let mut position = Vec::with_capacity(texels * 4);
    let mut velocity = Vec::with_capacity(texels * 4);
    for _ in 0..texels {
        position.extend_from_slice(&[
            rng.gen::<f32>() * cube_size - half,
            rng.gen::<f32>() * cube_size - half,
            rng.gen::<f32>() * cube_size - half,
            rng.gen::<f32>(),
        ]);

        let [x, y, z] = loop {
            let candidate = [
                rng.gen::<f32>() - 0.5,
                rng.gen::<f32>() - 0.5,
                rng.gen::<f32>() - 0.5,
            ];
            if candidate.iter().map(|c| c * c).sum::<f32>() <= 0.25 {
                break candidate;
            }
        };
        velocity.extend_from_slice(&[x, y, z, rng.gen::<f32>()]);
    }

    SeedTextures {
        position: SeedTexture {
            width,
            data: position,
        },
        velocity: SeedTexture {
            width,
            data: velocity,
        },
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn seeds_stay_in_their_volumes() {
        let mut rng = StdRng::seed_from_u64(11);
        let seeds = seed_textures(16, 128.0, &mut rng);
        assert_eq!(seeds.position.data.len(), 16 * 16 * 4);

        for texel in seeds.position.data.chunks_exact(4) {
            assert!(texel[..3].iter().all(|c| (-64.0..64.0).contains(c)));
            assert!((0.0..1.0).contains(&texel[3]));
        }
        for texel in seeds.velocity.data.chunks_exact(4) {
            let radius = texel[..3].iter().map(|c| c * c).sum::<f32>().sqrt();
            assert!(radius <= 0.5 + 1e-6);
            assert!((0.0..1.0).contains(&texel[3]));
        }
    }

    #[test]
    fn same_seed_same_textures() {
        let a = seed_textures(4, 128.0, &mut StdRng::seed_from_u64(3));
        let b = seed_textures(4, 128.0, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
