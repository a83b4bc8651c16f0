//! Loading and compiling the tagged shader files used by the demos.
//!
//! A shader file holds both stages of a program. A line containing
//! `#shader vertex` or `#shader fragment` starts the matching section; every
//! other line is appended to the current section. Lines before the first tag
//! form a prelude shared by both stages, which is where the uniform and
//! interface declarations live.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Entry point every stage of a shader file must define.
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Vertex => "vs_main",
            Self::Fragment => "fs_main",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("cannot open shader source {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("shader source has no `#shader {0}` section")]
    MissingStage(ShaderStage),
    #[error("failed to compile {stage} shader {label}: {message}")]
    Compile {
        label: String,
        stage: ShaderStage,
        message: String,
    },
    #[error("failed to link {label}: {message}")]
    Link { label: String, message: String },
}

/// The two stages of a shader file, each with the shared prelude prepended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    pub fn parse(text: &str) -> Result<Self, ShaderError> {
        let mut prelude = String::new();
        let mut vertex: Option<String> = None;
        let mut fragment: Option<String> = None;
        let mut current = None;

        for line in text.lines() {
            if line.contains("#shader") {
                if line.contains("vertex") {
                    current = Some(ShaderStage::Vertex);
                    vertex.get_or_insert_with(String::new);
                } else if line.contains("fragment") {
                    current = Some(ShaderStage::Fragment);
                    fragment.get_or_insert_with(String::new);
                }
                continue;
            }
            let section = match current {
                None => &mut prelude,
                Some(ShaderStage::Vertex) => vertex.get_or_insert_with(String::new),
                Some(ShaderStage::Fragment) => fragment.get_or_insert_with(String::new),
            };
            section.push_str(line);
            section.push('\n');
        }

        let vertex = vertex.ok_or(ShaderError::MissingStage(ShaderStage::Vertex))?;
        let fragment = fragment.ok_or(ShaderError::MissingStage(ShaderStage::Fragment))?;
        Ok(Self {
            vertex: format!("{prelude}{vertex}"),
            fragment: format!("{prelude}{fragment}"),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn stage(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

/// Shader files shipped in `res/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuiltinShader {
    /// Solid colour, used for fills and wireframes.
    Flat,
    /// Textured, lit by a point light.
    Earth,
    /// Textured and tinted by the light colour.
    Sun,
}

impl BuiltinShader {
    pub const ALL: [Self; 3] = [Self::Flat, Self::Earth, Self::Sun];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Flat => "flat.shader",
            Self::Earth => "earth.shader",
            Self::Sun => "sun.shader",
        }
    }

    pub fn is_textured(self) -> bool {
        !matches!(self, Self::Flat)
    }

    fn embedded(self) -> &'static str {
        match self {
            Self::Flat => include_str!("../res/flat.shader"),
            Self::Earth => include_str!("../res/earth.shader"),
            Self::Sun => include_str!("../res/sun.shader"),
        }
    }

    /// Reads the shader from `dir` when given, otherwise uses the built-in copy.
    pub fn load(self, dir: Option<&Path>) -> Result<ShaderSource, ShaderError> {
        match dir {
            Some(dir) => ShaderSource::from_file(dir.join(self.file_name())),
            None => ShaderSource::parse(self.embedded()),
        }
    }
}

/// Compiled vertex and fragment modules of one shader file.
pub struct ShaderProgram {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
}

impl ShaderProgram {
    pub fn compile(
        device: &wgpu::Device,
        label: &str,
        source: &ShaderSource,
    ) -> Result<Self, ShaderError> {
        let vertex = compile_stage(device, label, ShaderStage::Vertex, source)?;
        let fragment = compile_stage(device, label, ShaderStage::Fragment, source)?;
        Ok(Self {
            label: label.to_string(),
            vertex,
            fragment,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Builds a pipeline from both modules and reports validation failures.
    pub fn link<F>(&self, device: &wgpu::Device, build: F) -> Result<wgpu::RenderPipeline, ShaderError>
    where
        F: FnOnce(&wgpu::ShaderModule, &wgpu::ShaderModule) -> wgpu::RenderPipeline,
    {
        let (pipeline, failure) = validated(device, || build(&self.vertex, &self.fragment));
        match failure {
            Some(message) => {
                error!("failed to link program {}:\n{message}", self.label);
                Err(ShaderError::Link {
                    label: self.label.clone(),
                    message,
                })
            }
            None => {
                info!("program {} link status: ok", self.label);
                Ok(pipeline)
            }
        }
    }
}

fn compile_stage(
    device: &wgpu::Device,
    label: &str,
    stage: ShaderStage,
    source: &ShaderSource,
) -> Result<wgpu::ShaderModule, ShaderError> {
    let text = source.stage(stage);
    debug!("{stage} shader {label}:\n{text}");
    let module_label = format!("{label}-{stage}");
    let (module, failure) = validated(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&module_label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(text)),
        })
    });
    if let Some(message) = failure {
        error!("failed to compile {stage} shader {label}:\n{message}");
        return Err(ShaderError::Compile {
            label: label.to_string(),
            stage,
            message,
        });
    }
    info!("{stage} shader {label} compile status: ok");
    Ok(module)
}

/// Runs `create` inside a validation error scope and returns the captured message.
fn validated<T>(device: &wgpu::Device, create: impl FnOnce() -> T) -> (T, Option<String>) {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let failure = pollster::block_on(device.pop_error_scope()).map(|err| err.to_string());
    (value, failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
struct Globals { x: f32 }
#shader vertex
fn vs_main() {}
#shader fragment
fn fs_main() {}
";

    #[test]
    fn splits_sections_and_shares_prelude() {
        let source = ShaderSource::parse(SAMPLE).unwrap();
        assert_eq!(source.vertex, "struct Globals { x: f32 }\nfn vs_main() {}\n");
        assert_eq!(source.fragment, "struct Globals { x: f32 }\nfn fs_main() {}\n");
    }

    #[test]
    fn sections_may_repeat() {
        let text = "#shader fragment\na\n#shader vertex\nb\n#shader fragment\nc\n";
        let source = ShaderSource::parse(text).unwrap();
        assert_eq!(source.vertex, "b\n");
        assert_eq!(source.fragment, "a\nc\n");
    }

    #[test]
    fn unknown_tags_keep_the_current_section() {
        let text = "#shader vertex\na\n#shader geometry\nb\n#shader fragment\nc\n";
        let source = ShaderSource::parse(text).unwrap();
        assert_eq!(source.vertex, "a\nb\n");
    }

    #[test]
    fn missing_stage_is_reported() {
        let err = ShaderSource::parse("#shader vertex\nfn vs_main() {}\n").unwrap_err();
        assert!(matches!(err, ShaderError::MissingStage(ShaderStage::Fragment)));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = ShaderSource::from_file("does/not/exist.shader").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.shader"));
    }

    #[test]
    fn builtin_shaders_parse() {
        for shader in BuiltinShader::ALL {
            let source = shader.load(None).unwrap();
            assert!(source.vertex.contains("fn vs_main"), "{shader:?}");
            assert!(source.fragment.contains("fn fs_main"), "{shader:?}");
        }
    }
}
