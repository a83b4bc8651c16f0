use std::collections::BTreeSet;
use std::io::Write;

use anyhow::{Context, Result};

use crate::config::DemoSettings;
use crate::mesh::Topology;
use crate::scene::scene_for;
use crate::shader::BuiltinShader;

/// Prints what a demo would upload and load, without opening a window.
///
/// Shader files are parsed so a broken `--shader-dir` fails here as well.
pub fn write_summary(settings: &DemoSettings, out: &mut impl Write) -> Result<()> {
    let scene = scene_for(settings);
    writeln!(
        out,
        "Demo: {} ({})",
        settings.demo,
        settings.demo.window_title()
    )?;

    writeln!(out, "Meshes:")?;
    for (kind, mesh) in scene.meshes() {
        let topology = match mesh.topology {
            Topology::TriangleList => "triangle list",
            Topology::TriangleStrip => "triangle strip",
        };
        writeln!(
            out,
            " - {}: {} vertices, {} indices, {} wireframe indices ({topology})",
            kind.name(),
            mesh.vertex_count(),
            mesh.indices.len(),
            mesh.wireframe_indices().len(),
        )?;
    }

    let shaders: BTreeSet<BuiltinShader> = scene
        .draw_list()
        .iter()
        .map(|item| item.material.shader())
        .collect();
    writeln!(out, "Shaders:")?;
    for shader in shaders {
        let origin = match settings.shader_dir.as_deref() {
            Some(dir) => dir.join(shader.file_name()).display().to_string(),
            None => "built-in".to_string(),
        };
        let source = shader
            .load(settings.shader_dir.as_deref())
            .with_context(|| format!("failed to load {}", shader.file_name()))?;
        writeln!(
            out,
            " - {} [{origin}]: {} vertex lines, {} fragment lines",
            shader.file_name(),
            source.vertex.lines().count(),
            source.fragment.lines().count(),
        )?;
    }

    let textures = scene.textures();
    if !textures.is_empty() {
        writeln!(out, "Textures:")?;
        for kind in textures {
            let path = settings.texture_dir.join(kind.file_name());
            let status = if path.is_file() { "found" } else { "fallback" };
            writeln!(out, " - {}: {} ({status})", kind.file_name(), path.display())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Demo;

    fn summary(settings: &DemoSettings) -> String {
        let mut out = Vec::new();
        write_summary(settings, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn solar_lists_sphere_and_textures() {
        let text = summary(&DemoSettings::for_demo(Demo::Solar));
        assert!(text.contains("Demo: solar (Solar system)"));
        assert!(text.contains("sphere: 2601 vertices, 14700 indices"));
        assert!(text.contains("earth.shader [built-in]"));
        assert!(text.contains("sun.shader [built-in]"));
        assert!(text.contains("DarkSun.jpg"));
        assert!(!text.contains("flat.shader"));
    }

    #[test]
    fn shapes_list_every_mesh() {
        let text = summary(&DemoSettings::for_demo(Demo::Shapes));
        assert!(text.contains("cube: 8 vertices, 36 indices, 48 wireframe indices"));
        assert!(text.contains("torus: 1680 vertices, 1719 indices"));
        assert!(text.contains("surface: 80802 vertices"));
        assert!(text.contains("flat.shader [built-in]"));
        assert!(!text.contains("Textures:"));
    }

    #[test]
    fn strip_sphere_is_reported_as_strips() {
        let mut settings = DemoSettings::for_demo(Demo::Solar);
        settings.solar.strip_sphere = true;
        let text = summary(&settings);
        assert!(text.contains("(triangle strip)"));
    }
}
