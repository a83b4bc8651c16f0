use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraMode, Projection};

/// Which demo program to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Demo {
    /// Cube, torus and height-field surface with wireframe overlays.
    Shapes,
    /// Textured Earth orbiting the Sun.
    Solar,
}

impl Demo {
    pub fn name(self) -> &'static str {
        match self {
            Self::Shapes => "shapes",
            Self::Solar => "solar",
        }
    }

    pub fn window_title(self) -> &'static str {
        match self {
            Self::Shapes => "3D",
            Self::Solar => "Solar system",
        }
    }
}

impl fmt::Display for Demo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Demo {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "shapes" => Ok(Self::Shapes),
            "solar" => Ok(Self::Solar),
            other => Err(anyhow!("unknown demo {other:?}; expected shapes or solar")),
        }
    }
}

/// Camera start state and control speeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub mode: CameraMode,
    pub projection: Projection,
    /// Free camera start position.
    pub position: Vec3,
    /// Orbit polar angle in degrees, measured from +Y.
    pub theta: f32,
    /// Orbit azimuth in degrees.
    pub phi: f32,
    pub fov: f32,
    pub min_fov: f32,
    pub max_fov: f32,
    pub near: f32,
    pub far: f32,
    /// Half depth of the orthographic volume.
    pub ortho_depth: f32,
    pub orbit_distance: f32,
    /// Free camera speed in units per second.
    pub move_speed: f32,
    /// Orbit speed in degrees per second.
    pub orbit_speed: f32,
    /// Degrees of yaw/pitch per pixel of mouse motion.
    pub mouse_sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            mode: CameraMode::Free,
            projection: Projection::Perspective,
            position: Vec3::new(0.0, 0.0, 20.0),
            theta: 89.0,
            phi: 0.0,
            fov: 45.0,
            min_fov: 1.0,
            max_fov: 45.0,
            near: 0.1,
            far: 100.0,
            ortho_depth: 100.0,
            orbit_distance: 20.0,
            move_speed: 5.0,
            orbit_speed: 100.0,
            mouse_sensitivity: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapesSettings {
    pub cube_half_extent: f32,
    pub torus_major_radius: f32,
    pub torus_minor_radius: f32,
    pub torus_major_segments: u32,
    pub torus_minor_segments: u32,
    pub surface_step: f32,
    pub surface_min: f32,
    pub surface_max: f32,
}

impl Default for ShapesSettings {
    fn default() -> Self {
        Self {
            cube_half_extent: 5.0,
            torus_major_radius: 5.0,
            torus_minor_radius: 3.0,
            torus_major_segments: 40,
            torus_minor_segments: 20,
            surface_step: 0.1,
            surface_min: -10.0,
            surface_max: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarSettings {
    pub sphere_stacks: u32,
    pub sphere_slices: u32,
    /// Use the strip tessellation instead of the indexed sphere.
    pub strip_sphere: bool,
    /// Seconds between day/night swaps; `None` keeps the current state until
    /// toggled by hand.
    pub day_night_period: Option<f32>,
    pub sun_scale: f32,
    pub earth_scale: f32,
    /// Orbit radius before the Earth's scale is applied.
    pub orbit_radius: f32,
    /// Earth spin in degrees per second.
    pub earth_spin_speed: f32,
    /// Axial tilt in degrees.
    pub earth_tilt: f32,
}

impl Default for SolarSettings {
    fn default() -> Self {
        Self {
            sphere_stacks: 50,
            sphere_slices: 50,
            strip_sphere: false,
            day_night_period: Some(2.0),
            sun_scale: 5.0,
            earth_scale: 2.0,
            orbit_radius: 10.0,
            earth_spin_speed: 300.0,
            earth_tilt: 23.5,
        }
    }
}

/// Everything a demo run can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoSettings {
    pub demo: Demo,
    pub window_width: u32,
    pub window_height: u32,
    pub camera: CameraSettings,
    pub shapes: ShapesSettings,
    pub solar: SolarSettings,
    /// Load shader files from this directory instead of the built-in copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shader_dir: Option<PathBuf>,
    pub texture_dir: PathBuf,
}

impl DemoSettings {
    /// Defaults of the given demo.
    pub fn for_demo(demo: Demo) -> Self {
        let camera = match demo {
            Demo::Shapes => CameraSettings {
                mode: CameraMode::Orbit,
                theta: 45.0,
                phi: 45.0,
                fov: 89.0,
                ..CameraSettings::default()
            },
            Demo::Solar => CameraSettings::default(),
        };
        Self {
            demo,
            window_width: 1920,
            window_height: 1080,
            camera,
            shapes: ShapesSettings::default(),
            solar: SolarSettings::default(),
            shader_dir: None,
            texture_dir: PathBuf::from("res"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_demo_names() {
        assert_eq!("shapes".parse::<Demo>().unwrap(), Demo::Shapes);
        assert_eq!("Solar".parse::<Demo>().unwrap(), Demo::Solar);
        assert!("cube".parse::<Demo>().is_err());
    }

    #[test]
    fn demos_start_with_their_own_camera() {
        let shapes = DemoSettings::for_demo(Demo::Shapes);
        assert_eq!(shapes.camera.mode, CameraMode::Orbit);
        assert_eq!(shapes.camera.fov, 89.0);

        let solar = DemoSettings::for_demo(Demo::Solar);
        assert_eq!(solar.camera.mode, CameraMode::Free);
        assert_eq!(solar.camera.position, Vec3::new(0.0, 0.0, 20.0));
        assert_eq!(solar.solar.day_night_period, Some(2.0));
    }
}
