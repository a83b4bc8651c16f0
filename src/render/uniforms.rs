use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use crate::camera::CameraParams;
use crate::scene::{DrawItem, LightParams};

/// Per-frame camera and light state, bound at group 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light_position: [f32; 4],
    pub light_ambient: [f32; 4],
    pub light_diffuse: [f32; 4],
    pub light_color: [f32; 4],
}

impl GlobalUniform {
    pub fn new(camera: &CameraParams, light: &LightParams) -> Self {
        Self {
            view_proj: camera.view_proj.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            light_position: light.position.extend(1.0).into(),
            light_ambient: light.ambient.extend(0.0).into(),
            light_diffuse: light.diffuse.extend(0.0).into(),
            light_color: light.color.extend(1.0).into(),
        }
    }
}

/// Per-draw transform and colour, bound at group 1.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ObjectConstants {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub color: [f32; 4],
}

impl ObjectConstants {
    pub fn for_item(item: &DrawItem) -> Self {
        Self {
            model: item.model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal_matrix(item.model)),
            color: item.material.color().extend(1.0).into(),
        }
    }
}

/// Inverse transpose of the upper 3x3, for transforming normals.
pub fn normal_matrix(model: Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(model);
    if linear.determinant().abs() <= f32::EPSILON {
        return Mat3::IDENTITY;
    }
    linear.inverse().transpose()
}

// WGSL mat3x4 columns are padded to vec4.
fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::{Material, MeshKind};

    #[test]
    fn layouts_match_wgsl_sizes() {
        assert_eq!(std::mem::size_of::<GlobalUniform>(), 144);
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 128);
    }

    #[test]
    fn uniform_scale_keeps_normals_parallel() {
        let model = Mat4::from_scale(Vec3::splat(5.0)) * Mat4::from_rotation_x(1.0);
        let normal = normal_matrix(model) * Vec3::Y;
        let expected = Mat3::from_mat4(model) * Vec3::Y;
        assert!(normal.normalize().abs_diff_eq(expected.normalize(), 1e-5));
    }

    #[test]
    fn object_constants_carry_colour_and_padding() {
        let item = DrawItem {
            mesh: MeshKind::Cube,
            model: Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0)),
            material: Material::Flat {
                color: Vec3::new(0.5, 0.0, 0.0),
            },
        };
        let constants = ObjectConstants::for_item(&item);
        assert_eq!(constants.color, [0.5, 0.0, 0.0, 1.0]);
        assert_eq!(constants.model[3], [0.0, 10.0, 0.0, 1.0]);
        assert_eq!(constants.normal[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
