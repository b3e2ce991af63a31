//! perch-shaders: WGSL shader sources for the overlay renderer.

/// Instanced sprite pipeline: a unit quad replicated per instance, each
/// instance carrying a model matrix and an atlas scale/offset rectangle.
/// The atlas texture holds premultiplied alpha, so the fragment stage
/// samples and returns it untouched.
pub const SPRITE_WGSL: &str = r#"
struct CameraUniform {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;

@group(1) @binding(0) var atlas_texture: texture_2d<f32>;
@group(1) @binding(1) var atlas_sampler: sampler;

struct VsIn {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    // Per-instance model matrix, one column per attribute slot.
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    // Atlas region as (scale.xy, offset.xy) in normalized texture space.
    @location(6) tex_st: vec4<f32>,
};

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(inp: VsIn) -> VsOut {
    let model = mat4x4<f32>(inp.model_0, inp.model_1, inp.model_2, inp.model_3);
    var out: VsOut;
    out.pos = camera.proj * camera.view * model * vec4<f32>(inp.position, 1.0);
    out.uv = inp.uv * inp.tex_st.xy + inp.tex_st.zw;
    return out;
}

@fragment
fn fs_main(inp: VsOut) -> @location(0) vec4<f32> {
    return textureSample(atlas_texture, atlas_sampler, inp.uv);
}
"#;

/// Debug line pipeline: position + color, line-list topology, no texturing.
pub const LINE_WGSL: &str = r#"
struct CameraUniform {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VsOut {
    var out: VsOut;
    out.pos = camera.proj * camera.view * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(inp: VsOut) -> @location(0) vec4<f32> {
    return inp.color;
}
"#;
