// ============================
// === SHADER SOURCES ===
// ============================
// All uniform blocks are built from vec4 and mat4 members, so the WGSL structs
// below line up with the Pod structs in `entity` without explicit padding.

use crate::config::SHADOW_TOLERANCE;
use crate::volume::{CEILING_AMPLITUDE, CEILING_DRIFT, CEILING_FRACTION, CEILING_NOISE_SCALE, EDGE_FRACTION};

/// Simplex noise and its fractal sum, shared by both fog programs.
pub const NOISE_WGSL: &str = r#"
    const F3: f32 = 0.3333333;
    const G3: f32 = 0.1666667;

    const ROT1: mat3x3<f32> = mat3x3<f32>(-0.37, 0.36, 0.85, -0.14, -0.93, 0.34, 0.92, 0.01, 0.4);
    const ROT2: mat3x3<f32> = mat3x3<f32>(-0.55, -0.39, 0.74, 0.33, -0.91, -0.24, 0.77, 0.12, 0.63);
    const ROT3: mat3x3<f32> = mat3x3<f32>(-0.71, 0.52, -0.47, -0.08, -0.72, -0.68, -0.7, -0.45, 0.56);

    fn random3(c: vec3<f32>) -> vec3<f32> {
        var j = 4096.0 * sin(dot(c, vec3<f32>(17.0, 59.4, 15.0)));
        var r: vec3<f32>;
        r.z = fract(512.0 * j);
        j *= 0.125;
        r.x = fract(512.0 * j);
        j *= 0.125;
        r.y = fract(512.0 * j);
        return r - 0.5;
    }

    fn simplex3d(p: vec3<f32>) -> f32 {
        let s = floor(p + dot(p, vec3<f32>(F3)));
        let x = p - s + dot(s, vec3<f32>(G3));

        let e = step(vec3<f32>(0.0), x - x.yzx);
        let i1 = e * (1.0 - e.zxy);
        let i2 = 1.0 - e.zxy * (1.0 - e);

        let x1 = x - i1 + G3;
        let x2 = x - i2 + 2.0 * G3;
        let x3 = x - 1.0 + 3.0 * G3;

        var w = vec4<f32>(dot(x, x), dot(x1, x1), dot(x2, x2), dot(x3, x3));
        w = max(0.6 - w, vec4<f32>(0.0));

        var d = vec4<f32>(
            dot(random3(s), x),
            dot(random3(s + i1), x1),
            dot(random3(s + i2), x2),
            dot(random3(s + 1.0), x3),
        );

        w *= w;
        w *= w;
        d *= w;
        return dot(d, vec4<f32>(52.0));
    }

    fn simplex3d_fractal(m: vec3<f32>) -> f32 {
        return 0.5333333 * simplex3d(m * ROT1)
             + 0.2666667 * simplex3d(2.0 * m * ROT2)
             + 0.1333333 * simplex3d(4.0 * m * ROT3)
             + 0.0666667 * simplex3d(8.0 * m);
    }

    fn simplex3d_fractal01(m: vec3<f32>) -> f32 {
        return 0.5 + 0.5 * simplex3d_fractal(m);
    }

    fn reveal_fade(p: vec3<f32>, point: vec3<f32>, radius: f32) -> f32 {
        if (radius <= 0.0) {
            return 1.0;
        }
        let d = distance(p, point);
        if (d < radius) {
            return smoothstep(0.8 * radius, radius, d);
        }
        return 1.0;
    }
"#;

const VERTEX_INPUT_WGSL: &str = r#"
    struct VertexInput {
        @location(0) position: vec3<f32>,
        @location(1) normal: vec3<f32>,
        @location(2) uv: vec2<f32>,
    }
"#;

/// Light-view depth written into the red channel of the shadow map.
pub fn generate_depth_shader() -> String {
    format!(r#"
    {VERTEX_INPUT_WGSL}

    struct DepthUniforms {{
        model: mat4x4<f32>,
        view_proj: mat4x4<f32>,
    }}

    struct VertexOutput {{
        @builtin(position) clip_position: vec4<f32>,
    }}

    @group(0) @binding(0) var<uniform> u: DepthUniforms;

    @vertex
    fn vs_main(in: VertexInput) -> VertexOutput {{
        var out: VertexOutput;
        out.clip_position = u.view_proj * u.model * vec4<f32>(in.position, 1.0);
        return out;
    }}

    @fragment
    fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
        return vec4<f32>(in.clip_position.z, 0.0, 0.0, 1.0);
    }}
"#)
}

/// Lambert-shaded quads. Also draws raw meshes, which set ambient to 1 and diffuse to 0.
pub fn generate_surface_shader() -> String {
    generate_surface_shader_with(SHADOW_TOLERANCE)
}

pub fn generate_surface_shader_with(shadow_tolerance: f32) -> String {
    format!(r#"
    const SHADOW_TOLERANCE: f32 = {shadow_tolerance:?};

    {VERTEX_INPUT_WGSL}

    struct QuadUniforms {{
        model: mat4x4<f32>,
        view_proj: mat4x4<f32>,
        depth_bias: mat4x4<f32>,
        light: vec4<f32>,
        color: vec4<f32>,
        // ambient, diffuse scale, shadows enabled, textured
        params: vec4<f32>,
    }}

    struct VertexOutput {{
        @builtin(position) clip_position: vec4<f32>,
        @location(0) normal: vec3<f32>,
        @location(1) uv: vec2<f32>,
        @location(2) shadow_coord: vec4<f32>,
    }}

    @group(0) @binding(0) var<uniform> u: QuadUniforms;
    @group(1) @binding(0) var shadow_map: texture_2d<f32>;
    @group(1) @binding(1) var image_texture: texture_2d<f32>;
    @group(1) @binding(2) var image_sampler: sampler;

    @vertex
    fn vs_main(in: VertexInput) -> VertexOutput {{
        var out: VertexOutput;
        let world = u.model * vec4<f32>(in.position, 1.0);
        out.clip_position = u.view_proj * world;
        out.normal = (u.model * vec4<f32>(in.normal, 0.0)).xyz;
        out.uv = in.uv;
        out.shadow_coord = u.depth_bias * world;
        return out;
    }}

    // Nearest texel, no filtering: the map is a 32-bit float target.
    fn shadow_visibility(shadow_coord: vec4<f32>) -> f32 {{
        let coord = shadow_coord.xyz / shadow_coord.w;
        if (any(coord.xy < vec2<f32>(0.0)) || any(coord.xy > vec2<f32>(1.0))) {{
            return 1.0;
        }}
        let dims = vec2<f32>(textureDimensions(shadow_map));
        let texel = vec2<i32>(clamp(coord.xy * dims, vec2<f32>(0.0), dims - 1.0));
        let stored = textureLoad(shadow_map, texel, 0).r;
        if (coord.z - stored > SHADOW_TOLERANCE) {{
            return 0.0;
        }}
        return 1.0;
    }}

    @fragment
    fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
        let texel = textureSample(image_texture, image_sampler, in.uv);
        let albedo = mix(u.color.rgb, u.color.rgb * texel.rgb, u.params.w);

        var visibility = 1.0;
        if (u.params.z > 0.5) {{
            visibility = shadow_visibility(in.shadow_coord);
        }}

        let ambient = u.params.x;
        let l = normalize(u.light.xyz);
        let diffuse = max(dot(normalize(in.normal), l), 0.0) * u.params.y;
        return vec4<f32>((ambient + diffuse * visibility) * albedo, u.color.a);
    }}
"#)
}

/// Box-shaped fog, rasterized by its back faces and marched towards the eye.
pub fn generate_fog_volume_shader() -> String {
    format!(r#"
    const CEILING_FRACTION: f32 = {CEILING_FRACTION:?};
    const CEILING_AMPLITUDE: f32 = {CEILING_AMPLITUDE:?};
    const CEILING_NOISE_SCALE: f32 = {CEILING_NOISE_SCALE:?};
    const CEILING_DRIFT: f32 = {CEILING_DRIFT:?};
    const EDGE_FRACTION: f32 = {EDGE_FRACTION:?};

    {NOISE_WGSL}

    {VERTEX_INPUT_WGSL}

    struct FogUniforms {{
        model: mat4x4<f32>,
        view_proj: mat4x4<f32>,
        light: vec4<f32>,
        camera_time: vec4<f32>,
        reveal: vec4<f32>,
        // w: step size
        bounds_min: vec4<f32>,
        // w: step count
        bounds_max: vec4<f32>,
        // extinction scale, noise scale, alpha cutoff, early exit
        march: vec4<f32>,
        drift: vec4<f32>,
    }}

    struct VertexOutput {{
        @builtin(position) clip_position: vec4<f32>,
        @location(0) world: vec3<f32>,
    }}

    @group(0) @binding(0) var<uniform> u: FogUniforms;

    @vertex
    fn vs_main(in: VertexInput) -> VertexOutput {{
        var out: VertexOutput;
        let world = u.model * vec4<f32>(in.position, 1.0);
        out.clip_position = u.view_proj * world;
        out.world = world.xyz;
        return out;
    }}

    fn inside_bounds(p: vec3<f32>) -> bool {{
        return all(p >= u.bounds_min.xyz) && all(p <= u.bounds_max.xyz);
    }}

    fn nearest_violation(offsets: vec3<f32>) -> f32 {{
        var m = 3.4e38;
        if (offsets.x > 0.0) {{ m = min(m, offsets.x); }}
        if (offsets.y > 0.0) {{ m = min(m, offsets.y); }}
        if (offsets.z > 0.0) {{ m = min(m, offsets.z); }}
        return m;
    }}

    fn fog_ceiling(p: vec3<f32>, t: f32) -> f32 {{
        let bmin = u.bounds_min.xyz;
        let bmax = u.bounds_max.xyz;
        let extent = bmax - bmin;
        let base = bmin.y + CEILING_FRACTION * extent.y;

        let drift = vec3<f32>(1.0, 0.0, 1.0) * (CEILING_DRIFT * t);
        let coord = vec3<f32>(p.x, base, p.z) * CEILING_NOISE_SCALE + drift;
        let undulating = base + CEILING_AMPLITUDE * (simplex3d_fractal01(coord) - 0.5);

        let margin = EDGE_FRACTION * min(extent.x, extent.z);
        let edge = min(min(p.x - bmin.x, bmax.x - p.x), min(p.z - bmin.z, bmax.z - p.z));
        var blend = 1.0;
        if (margin > 0.0) {{
            blend = smoothstep(0.0, margin, edge);
        }}
        return mix(bmin.y, undulating, blend);
    }}

    fn fog_sdf(p: vec3<f32>, t: f32) -> f32 {{
        let bmin = u.bounds_min.xyz;
        let bmax = u.bounds_max.xyz;
        if (p.y < bmin.y || p.x < bmin.x || p.z < bmin.z) {{
            return nearest_violation(bmin - p);
        }}
        if (p.x > bmax.x || p.z > bmax.z) {{
            let over = p - bmax;
            return nearest_violation(vec3<f32>(over.x, -1.0, over.z));
        }}
        return p.y - fog_ceiling(p, t);
    }}

    @fragment
    fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
        let origin = u.camera_time.xyz;
        let t = u.camera_time.w;
        let step_size = u.bounds_min.w;
        let step_count = u32(u.bounds_max.w);

        let to_eye = origin - in.world;
        var dir = vec3<f32>(0.0);
        if (length(to_eye) > 0.0) {{
            dir = normalize(to_eye);
        }}
        let advance = dir * step_size;

        var p = in.world;
        var alpha = 1.0;
        var color = vec3<f32>(0.0);

        for (var i = 0u; i < step_count; i++) {{
            if (inside_bounds(p)) {{
                let d = fog_sdf(p, t);
                if (d < 0.0) {{
                    let luminance = simplex3d_fractal01(p * u.march.y + u.drift.xyz * t);
                    let extinction = max(-d, 0.0) * u.march.x * luminance;
                    let transmittance = exp(-extinction * step_size);
                    color += vec3<f32>(luminance * (1.0 - transmittance) * alpha);
                    alpha *= transmittance;
                }}
            }}
            if (u.march.w > 0.5 && alpha < u.march.z) {{
                alpha = 0.0;
                break;
            }}
            p += advance;
        }}

        let fade = reveal_fade(in.world, u.reveal.xyz, u.reveal.w);
        return vec4<f32>(color, 1.0 - alpha) * fade;
    }}
"#)
}

/// Flat fog sheet lit through a noise height field.
pub fn generate_fog_layer_shader() -> String {
    format!(r#"
    {NOISE_WGSL}

    {VERTEX_INPUT_WGSL}

    struct FogLayerUniforms {{
        model: mat4x4<f32>,
        view_proj: mat4x4<f32>,
        light: vec4<f32>,
        reveal: vec4<f32>,
        // time, normal epsilon
        params: vec4<f32>,
    }}

    struct VertexOutput {{
        @builtin(position) clip_position: vec4<f32>,
        @location(0) local: vec3<f32>,
    }}

    @group(0) @binding(0) var<uniform> u: FogLayerUniforms;

    @vertex
    fn vs_main(in: VertexInput) -> VertexOutput {{
        var out: VertexOutput;
        out.clip_position = u.view_proj * u.model * vec4<f32>(in.position, 1.0);
        out.local = in.position;
        return out;
    }}

    fn layer_noise(local: vec3<f32>, t: f32) -> f32 {{
        let uv = local.xz / 10.0 + 0.5 + 0.02 * t;
        let st = uv * 8.0;
        return clamp(simplex3d_fractal01(vec3<f32>(st, t)), 0.0, 1.0);
    }}

    fn layer_height(local: vec3<f32>, t: f32) -> f32 {{
        return pow(layer_noise(local, t), 0.01);
    }}

    @fragment
    fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
        let t = u.params.x;
        let eps = u.params.y;

        let n = layer_noise(in.local, t);
        let h = layer_height(in.local, t);
        let hx = layer_height(in.local + vec3<f32>(eps, 0.0, 0.0), t);
        let hz = layer_height(in.local + vec3<f32>(0.0, 0.0, eps), t);
        let tangent_x = vec3<f32>(eps, hx - h, 0.0);
        let tangent_z = vec3<f32>(0.0, hz - h, eps);
        let normal = normalize(cross(tangent_z, tangent_x));

        let lambert = max(dot(normalize(u.light.xyz), normal), 0.0);
        let color = vec3<f32>(1.0) * lambert * pow(n, 0.5) * 1.5;
        let alpha = reveal_fade(in.local, u.reveal.xyz, u.reveal.w);
        return vec4<f32>(color, alpha);
    }}
"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_entry_points(source: &str) {
        assert!(source.contains("fn vs_main("), "missing vertex entry point");
        assert!(source.contains("fn fs_main("), "missing fragment entry point");
    }

    #[test]
    fn every_program_has_both_entry_points() {
        for source in [
            generate_depth_shader(),
            generate_surface_shader(),
            generate_fog_volume_shader(),
            generate_fog_layer_shader(),
        ] {
            assert_entry_points(&source);
        }
    }

    #[test]
    fn surface_shader_injects_tolerance() {
        let source = generate_surface_shader_with(0.0125);
        assert!(source.contains("const SHADOW_TOLERANCE: f32 = 0.0125;"));
        assert!(source.contains("textureLoad(shadow_map"));
    }

    #[test]
    fn fog_programs_share_the_noise_source() {
        let volume = generate_fog_volume_shader();
        let layer = generate_fog_layer_shader();
        assert!(volume.contains(NOISE_WGSL));
        assert!(layer.contains(NOISE_WGSL));
        assert!(volume.contains("const CEILING_FRACTION: f32 = 0.8;"));
    }

    #[test]
    fn generated_braces_balance() {
        for source in [
            generate_depth_shader(),
            generate_surface_shader(),
            generate_fog_volume_shader(),
            generate_fog_layer_shader(),
        ] {
            let open = source.matches('{').count();
            let close = source.matches('}').count();
            assert_eq!(open, close);
        }
    }
}
