use glam::{Mat4, Vec3};
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{Demo, DemoSettings, ShapesSettings, SolarSettings};
use crate::input::{InputState, KeyCode};
use crate::mesh::{self, Mesh};
use crate::shader::BuiltinShader;

/// Meshes a scene uploads once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshKind {
    Cube,
    Torus,
    Surface,
    Sphere,
}

impl MeshKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Torus => "torus",
            Self::Surface => "surface",
            Self::Sphere => "sphere",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureKind {
    Earth,
    Sun,
    DarkSun,
}

impl TextureKind {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Earth => "Earth.bmp",
            Self::Sun => "Sun.jpg",
            Self::DarkSun => "DarkSun.jpg",
        }
    }

    /// Colour used when the image cannot be loaded.
    pub fn fallback_color(self) -> [u8; 4] {
        match self {
            Self::Earth => [40, 90, 200, 255],
            Self::Sun => [255, 200, 60, 255],
            Self::DarkSun => [90, 40, 20, 255],
        }
    }
}

/// How a draw item is shaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    Flat { color: Vec3 },
    /// Line-list outline of the mesh.
    Wireframe { color: Vec3 },
    Earth { texture: TextureKind },
    Sun { texture: TextureKind },
}

impl Material {
    pub fn shader(&self) -> BuiltinShader {
        match self {
            Self::Flat { .. } | Self::Wireframe { .. } => BuiltinShader::Flat,
            Self::Earth { .. } => BuiltinShader::Earth,
            Self::Sun { .. } => BuiltinShader::Sun,
        }
    }

    pub fn texture(&self) -> Option<TextureKind> {
        match self {
            Self::Earth { texture } | Self::Sun { texture } => Some(*texture),
            Self::Flat { .. } | Self::Wireframe { .. } => None,
        }
    }

    pub fn color(&self) -> Vec3 {
        match self {
            Self::Flat { color } | Self::Wireframe { color } => *color,
            Self::Earth { .. } | Self::Sun { .. } => Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshKind,
    pub model: Mat4,
    pub material: Material,
}

/// Point light consumed by the renderer's uniform buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParams {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub color: Vec3,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            ambient: Vec3::ONE,
            diffuse: Vec3::ZERO,
            color: Vec3::ONE,
        }
    }
}

/// Animation state and draw list of one demo.
pub trait Scene {
    /// Geometry to upload, generated once.
    fn meshes(&self) -> Vec<(MeshKind, Mesh)>;

    fn textures(&self) -> Vec<TextureKind> {
        Vec::new()
    }

    /// Reacts to demo-specific keys.
    fn handle_input(&mut self, _input: &InputState) {}

    /// Advances animations by `dt` seconds.
    fn update(&mut self, _dt: f32) {}

    fn draw_list(&self) -> Vec<DrawItem>;

    fn light(&self) -> LightParams {
        LightParams::default()
    }

    fn clear_color(&self) -> Vec3;
}

pub fn scene_for(settings: &DemoSettings) -> Box<dyn Scene> {
    match settings.demo {
        Demo::Shapes => Box::new(ShapesScene::new(settings.shapes.clone())),
        Demo::Solar => Box::new(SolarScene::new(settings.solar.clone())),
    }
}

/// Cube, torus and height field, each filled and outlined.
#[derive(Debug, Clone)]
pub struct ShapesScene {
    settings: ShapesSettings,
}

impl ShapesScene {
    const OUTLINE: Vec3 = Vec3::ZERO;

    pub fn new(settings: ShapesSettings) -> Self {
        Self { settings }
    }
}

impl Scene for ShapesScene {
    fn meshes(&self) -> Vec<(MeshKind, Mesh)> {
        let s = &self.settings;
        vec![
            (MeshKind::Cube, mesh::cube(s.cube_half_extent)),
            (
                MeshKind::Torus,
                mesh::torus(
                    s.torus_major_radius,
                    s.torus_minor_radius,
                    s.torus_major_segments,
                    s.torus_minor_segments,
                ),
            ),
            (
                MeshKind::Surface,
                mesh::surface(
                    s.surface_step,
                    s.surface_min,
                    s.surface_max,
                    mesh::surface_height,
                ),
            ),
        ]
    }

    fn draw_list(&self) -> Vec<DrawItem> {
        let shapes = [
            (MeshKind::Cube, Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.5, 0.0, 0.0)),
            (MeshKind::Torus, Vec3::new(0.0, -10.0, 0.0), Vec3::new(0.0, 0.5, 0.0)),
            (MeshKind::Surface, Vec3::ZERO, Vec3::new(0.0, 0.0, 0.5)),
        ];
        shapes
            .into_iter()
            .flat_map(|(mesh, position, color)| {
                let model = Mat4::from_translation(position);
                [
                    DrawItem {
                        mesh,
                        model,
                        material: Material::Flat { color },
                    },
                    DrawItem {
                        mesh,
                        model,
                        material: Material::Wireframe {
                            color: Self::OUTLINE,
                        },
                    },
                ]
            })
            .collect()
    }

    fn clear_color(&self) -> Vec3 {
        Vec3::new(0.2, 0.3, 0.3)
    }
}

/// Day/night state of the solar demo.
///
/// With a period set the state flips every `period` seconds. A manual toggle
/// flips immediately and restarts the countdown.
#[derive(Debug, Clone, PartialEq)]
pub struct DayNightCycle {
    period: Option<f32>,
    remaining: f32,
    dark: bool,
}

impl DayNightCycle {
    pub fn new(period: Option<f32>) -> Self {
        Self {
            period,
            remaining: period.unwrap_or_default(),
            dark: false,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    pub fn advance(&mut self, dt: f32) {
        let Some(period) = self.period else {
            return;
        };
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.dark = !self.dark;
            self.remaining = period;
        }
    }

    pub fn toggle(&mut self) {
        self.dark = !self.dark;
        self.remaining = self.period.unwrap_or_default();
    }
}

/// Textured Sun at the origin with the Earth orbiting and spinning around it.
#[derive(Debug, Clone)]
pub struct SolarScene {
    settings: SolarSettings,
    cycle: DayNightCycle,
    /// Seconds since start; the orbit angle in radians.
    elapsed: f32,
    /// Earth spin in degrees.
    spin: f32,
}

impl SolarScene {
    pub fn new(settings: SolarSettings) -> Self {
        Self {
            cycle: DayNightCycle::new(settings.day_night_period),
            settings,
            elapsed: 0.0,
            spin: 0.0,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.cycle.is_dark()
    }

    pub fn sun_model(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.settings.sun_scale))
            * Mat4::from_rotation_x((-90.0f32).to_radians())
    }

    pub fn earth_model(&self) -> Mat4 {
        let s = &self.settings;
        let orbit = s.orbit_radius * Vec3::new(self.elapsed.sin(), 0.0, self.elapsed.cos());
        Mat4::from_scale(Vec3::splat(s.earth_scale))
            * Mat4::from_translation(orbit)
            * Mat4::from_rotation_z((-s.earth_tilt).to_radians())
            * Mat4::from_rotation_y((-self.spin).to_radians())
            * Mat4::from_rotation_x((-90.0f32).to_radians())
    }
}

impl Scene for SolarScene {
    fn meshes(&self) -> Vec<(MeshKind, Mesh)> {
        let s = &self.settings;
        let sphere = if s.strip_sphere {
            mesh::sphere_strip(1.0, s.sphere_slices, s.sphere_stacks)
        } else {
            mesh::uv_sphere(1.0, s.sphere_stacks, s.sphere_slices)
        };
        vec![(MeshKind::Sphere, sphere)]
    }

    fn textures(&self) -> Vec<TextureKind> {
        vec![TextureKind::Earth, TextureKind::Sun, TextureKind::DarkSun]
    }

    fn handle_input(&mut self, input: &InputState) {
        if input.was_pressed(KeyCode::letter('N')) {
            self.cycle.toggle();
            info!("switched to {}", if self.is_dark() { "night" } else { "day" });
        }
    }

    fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        self.spin = (self.spin + self.settings.earth_spin_speed * dt).rem_euclid(360.0);
        self.cycle.advance(dt);
    }

    fn draw_list(&self) -> Vec<DrawItem> {
        let sun_texture = if self.is_dark() {
            TextureKind::DarkSun
        } else {
            TextureKind::Sun
        };
        vec![
            DrawItem {
                mesh: MeshKind::Sphere,
                model: self.sun_model(),
                material: Material::Sun {
                    texture: sun_texture,
                },
            },
            DrawItem {
                mesh: MeshKind::Sphere,
                model: self.earth_model(),
                material: Material::Earth {
                    texture: TextureKind::Earth,
                },
            },
        ]
    }

    fn light(&self) -> LightParams {
        LightParams {
            position: Vec3::ZERO,
            ambient: Vec3::splat(0.2),
            diffuse: if self.is_dark() {
                Vec3::ZERO
            } else {
                Vec3::splat(0.8)
            },
            color: Vec3::splat(0.8),
        }
    }

    fn clear_color(&self) -> Vec3 {
        Vec3::new(0.12, 0.08, 0.11)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_flips_day_and_night() {
        let mut cycle = DayNightCycle::new(Some(2.0));
        cycle.advance(1.5);
        assert!(!cycle.is_dark());
        cycle.advance(0.5);
        assert!(cycle.is_dark());
        cycle.advance(1.75);
        assert!(cycle.is_dark());
        cycle.advance(0.25);
        assert!(!cycle.is_dark());
    }

    #[test]
    fn manual_toggle_restarts_the_timer() {
        let mut cycle = DayNightCycle::new(Some(2.0));
        cycle.advance(1.9);
        cycle.toggle();
        assert!(cycle.is_dark());
        cycle.advance(1.9);
        assert!(cycle.is_dark());
    }

    #[test]
    fn disabled_cycle_only_changes_by_hand() {
        let mut cycle = DayNightCycle::new(None);
        cycle.advance(100.0);
        assert!(!cycle.is_dark());
        cycle.toggle();
        assert!(cycle.is_dark());
    }

    #[test]
    fn earth_orbits_at_scaled_radius() {
        let mut scene = SolarScene::new(SolarSettings::default());
        for _ in 0..7 {
            scene.update(0.37);
            let centre = scene.earth_model().transform_point3(Vec3::ZERO);
            assert!((centre.length() - 20.0).abs() < 1e-3, "{centre:?}");
            assert!(centre.y.abs() < 1e-4);
        }
    }

    #[test]
    fn night_dims_the_sun_and_kills_diffuse() {
        let mut scene = SolarScene::new(SolarSettings::default());
        let mut input = InputState::new();
        input.set_key_down(KeyCode::letter('N'));
        scene.handle_input(&input);

        assert_eq!(scene.light().diffuse, Vec3::ZERO);
        let sun = &scene.draw_list()[0];
        assert_eq!(
            sun.material,
            Material::Sun {
                texture: TextureKind::DarkSun
            }
        );
    }

    #[test]
    fn shapes_are_filled_then_outlined() {
        let scene = ShapesScene::new(ShapesSettings::default());
        let items = scene.draw_list();
        assert_eq!(items.len(), 6);
        assert!(matches!(items[0].material, Material::Flat { .. }));
        assert!(matches!(items[1].material, Material::Wireframe { .. }));
        assert_eq!(items[0].model, items[1].model);
        let cube = items[0].model.transform_point3(Vec3::ZERO);
        assert_eq!(cube, Vec3::new(0.0, 10.0, 0.0));
    }
}
