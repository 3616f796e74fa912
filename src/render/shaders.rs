//! WGSL sources for the pyramid and the light markers.
//!
//! Uniform struct layouts must stay in sync with `pyramid_layout` and
//! `lamp_layout` in `uniforms.rs`.

pub(crate) const PYRAMID_VERTEX: &str = r#"
struct PyramidUniforms {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    lightColor1: vec3<f32>,
    lightIntensity1: f32,
    lightPos1: vec3<f32>,
    lightColor2: vec3<f32>,
    lightIntensity2: f32,
    lightPos2: vec3<f32>,
    viewPosition: vec3<f32>,
    uvScale: vec2<f32>,
}

@group(0) @binding(0)
var<uniform> u: PyramidUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) world_pos: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = u.model * vec4<f32>(input.position, 1.0);
    out.clip_position = u.projection * u.view * world;
    out.world_pos = world.xyz;
    // Uniform scale only, so the upper 3x3 is a valid normal matrix.
    let normal_matrix = mat3x3<f32>(u.model[0].xyz, u.model[1].xyz, u.model[2].xyz);
    out.normal = normal_matrix * input.normal;
    out.uv = input.uv;
    return out;
}
"#;

pub(crate) const PYRAMID_FRAGMENT: &str = r#"
struct PyramidUniforms {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    lightColor1: vec3<f32>,
    lightIntensity1: f32,
    lightPos1: vec3<f32>,
    lightColor2: vec3<f32>,
    lightIntensity2: f32,
    lightPos2: vec3<f32>,
    viewPosition: vec3<f32>,
    uvScale: vec2<f32>,
}

@group(0) @binding(0)
var<uniform> u: PyramidUniforms;

@group(0) @binding(1)
var uTexture: texture_2d<f32>;

@group(0) @binding(2)
var uSampler: sampler;

const DIFFUSE_FLOOR: f32 = 0.2;
const SPECULAR_STRENGTH: f32 = 0.0;
const HIGHLIGHT_SIZE: f32 = 0.0;

struct FragmentInput {
    @location(0) normal: vec3<f32>,
    @location(1) world_pos: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

fn point_light(
    light_pos: vec3<f32>,
    light_color: vec3<f32>,
    intensity: f32,
    normal: vec3<f32>,
    frag_pos: vec3<f32>,
) -> vec3<f32> {
    let ambient = intensity * light_color;

    let light_dir = normalize(light_pos - frag_pos);
    let impact = max(dot(normal, light_dir), DIFFUSE_FLOOR);
    let diffuse = impact * light_color;

    var specular = vec3<f32>(0.0);
    if (SPECULAR_STRENGTH > 0.0) {
        let view_dir = normalize(u.viewPosition - frag_pos);
        let reflect_dir = reflect(-light_dir, normal);
        let component = pow(max(dot(view_dir, reflect_dir), 0.0), HIGHLIGHT_SIZE);
        specular = SPECULAR_STRENGTH * component * light_color;
    }

    return ambient + diffuse + specular;
}

@fragment
fn fs_main(input: FragmentInput) -> @location(0) vec4<f32> {
    let normal = normalize(input.normal);
    let texel = textureSample(uTexture, uSampler, input.uv * u.uvScale).rgb;

    var result = vec3<f32>(0.0);
    result += point_light(u.lightPos1, u.lightColor1, u.lightIntensity1, normal, input.world_pos) * texel;
    result += point_light(u.lightPos2, u.lightColor2, u.lightIntensity2, normal, input.world_pos) * texel;
    return vec4<f32>(result, 1.0);
}
"#;

pub(crate) const LAMP_VERTEX: &str = r#"
struct LampUniforms {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> u: LampUniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u.projection * u.view * u.model * vec4<f32>(position, 1.0);
}
"#;

pub(crate) const LAMP_FRAGMENT: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::PhongParams;

    fn validate(label: &str, source: &str) {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|err| panic!("{label} failed to parse: {}", err.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .unwrap_or_else(|err| panic!("{label} failed validation: {err:?}"));
    }

    #[test]
    fn pyramid_shaders_are_valid() {
        validate("pyramid vertex", PYRAMID_VERTEX);
        validate("pyramid fragment", PYRAMID_FRAGMENT);
    }

    #[test]
    fn lamp_shaders_are_valid() {
        validate("lamp vertex", LAMP_VERTEX);
        validate("lamp fragment", LAMP_FRAGMENT);
    }

    #[test]
    fn fragment_constants_match_cpu_lighting() {
        let params = PhongParams::DEFAULT;
        for (name, value) in [
            ("DIFFUSE_FLOOR", params.diffuse_floor),
            ("SPECULAR_STRENGTH", params.specular_strength),
            ("HIGHLIGHT_SIZE", params.highlight_size),
        ] {
            let line = format!("const {name}: f32 = {value:?};");
            assert!(PYRAMID_FRAGMENT.contains(&line), "missing `{line}`");
        }
    }
}
