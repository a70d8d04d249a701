use std::borrow::Cow;

use anyhow::{bail, Result};
use wgpu::naga::ShaderStage;

/// Uniform names supplied by the `FlockingParams` block or the texture
/// bindings; program declarations of these are dropped during wrapping.
const KNOWN_UNIFORMS: &[&str] = &[
    "resolution",
    "time",
    "delta",
    "eqs",
    "loudness",
    "accumulatedLoudness",
    "beat",
    "separationDistance",
    "alignmentDistance",
    "cohesionDistance",
    "roamingDistance",
    "speed",
    "freedomFactor",
    "texturePosition",
    "textureVelocity",
    "sourceTexture",
];

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("simulation vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Wraps a simulation program and compiles it, surfacing naga validation
/// errors instead of letting them reach the device error handler.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    let wrapped = wrap_simulation_fragment(source);
    tracing::trace!(label, wrapped = %wrapped, "wrapped simulation fragment");

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        bail!("failed to compile {label}: {error}");
    }
    Ok(module)
}

/// Produces a self-contained Vulkan GLSL fragment shader from a WebGL-style
/// simulation program.
///
/// 1. Strip `#version`, `precision` statements, the `vUv` varying and
///    declarations of [`KNOWN_UNIFORMS`].
/// 2. Prepend [`HEADER`], which declares the parameter block and texture
///    bindings and maps the WebGL names onto them with macros.
pub fn wrap_simulation_fragment(source: &str) -> String {
    let mut sanitized = String::with_capacity(source.len());
    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#version") || trimmed.starts_with("precision ") {
            continue;
        }
        if trimmed.starts_with("varying ") && declared_name(trimmed) == Some("vUv") {
            continue;
        }
        if trimmed.starts_with("uniform ")
            && declared_name(trimmed).is_some_and(|name| KNOWN_UNIFORMS.contains(&name))
        {
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }

    format!("{HEADER}\n#line 1\n{sanitized}")
}

/// Name declared by a single-variable `uniform`/`varying` statement.
fn declared_name(statement: &str) -> Option<&str> {
    let statement = statement.split("//").next()?.trim().strip_suffix(';')?;
    let name = statement.split_whitespace().last()?;
    Some(name.split('[').next().unwrap_or(name))
}

/// GLSL prologue injected ahead of every simulation program.
///
/// The block layout must match `FlockingUniforms`.
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 vUv;
layout(location = 0) out vec4 glvis_outColor;

layout(std140, set = 0, binding = 0) uniform FlockingParams {
    vec2 _resolution;
    float _time;
    float _delta;
    vec3 _eqs;
    float _loudness;
    float _accumulatedLoudness;
    float _beat;
    float _separationDistance;
    float _alignmentDistance;
    float _cohesionDistance;
    float _roamingDistance;
    float _speed;
    float _freedomFactor;
} params;

#define resolution params._resolution
#define time params._time
#define delta params._delta
#define eqs params._eqs
#define loudness params._loudness
#define accumulatedLoudness params._accumulatedLoudness
#define beat params._beat
#define separationDistance params._separationDistance
#define alignmentDistance params._alignmentDistance
#define cohesionDistance params._cohesionDistance
#define roamingDistance params._roamingDistance
#define speed params._speed
#define freedomFactor params._freedomFactor

layout(set = 1, binding = 0) uniform texture2D glvis_position_texture;
layout(set = 1, binding = 1) uniform texture2D glvis_velocity_texture;
layout(set = 1, binding = 2) uniform sampler glvis_sampler;

#define texturePosition sampler2D(glvis_position_texture, glvis_sampler)
#define textureVelocity sampler2D(glvis_velocity_texture, glvis_sampler)
#define sourceTexture texturePosition

#define texture2D texture
#define gl_FragColor glvis_outColor
";

/// Full-screen triangle exposing `vUv` with the origin at the bottom left.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 vUv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    vUv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";
