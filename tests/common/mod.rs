#![allow(dead_code)]

use std::io::Cursor;

use glam::{Vec2, Vec3};
use glb_studio::animation::{AnimationClip, Channel, Interpolation, Keyframes};
use glb_studio::asset_pipeline::materials::{Material, Texture};
use glb_studio::model::{Geometry, Vertex, VertexAttributes};
use glb_studio::scene_graph::{MaterialSlots, Object3D, Transform};
use glb_studio::DecodedScene;

pub fn png_bytes() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 40, 40, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("png encoding");
    bytes
}

fn quad() -> Geometry {
    let corners = [
        (Vec3::new(-0.5, 0.0, -0.5), Vec2::new(0.0, 0.0)),
        (Vec3::new(0.5, 0.0, -0.5), Vec2::new(1.0, 0.0)),
        (Vec3::new(0.5, 0.0, 0.5), Vec2::new(1.0, 1.0)),
        (Vec3::new(-0.5, 0.0, 0.5), Vec2::new(0.0, 1.0)),
    ];
    let vertices = corners
        .iter()
        .map(|&(position, tex_coords)| Vertex {
            position,
            normal: Vec3::Y,
            tex_coords,
        })
        .collect();

    Geometry::new(
        "quad",
        vertices,
        Some(vec![0, 1, 2, 0, 2, 3]),
        VertexAttributes {
            normals: true,
            tex_coords: true,
        },
    )
}

/// Group with two textured quads sharing one geometry, a non-indexed
/// triangle beside it and a clip bobbing the group.
pub fn textured_scene() -> DecodedScene {
    let mut scene = DecodedScene::new("fixture");

    let quad = scene.resources.geometries.alloc(quad());
    let triangle = scene.resources.geometries.alloc(Geometry::from_positions(
        "triangle",
        [Vec3::new(3.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0), Vec3::new(3.0, 1.5, 0.0)],
        None,
    ));

    let texture = scene.resources.textures.alloc(Texture {
        name: "paint".into(),
        mime_type: "image/png".into(),
        encoded: png_bytes(),
    });
    let mut painted = Material::new("painted");
    painted.pbr.base_color_texture = Some(texture);
    painted.pbr.roughness_factor = 0.4;
    let painted = scene.resources.materials.alloc(painted);
    let plain = scene.resources.materials.alloc(Material::new("plain"));

    let root = scene.graph.root();
    let rig = scene.graph.add_child(
        root,
        Object3D::group("rig").with_transform(Transform::from_translation(Vec3::new(0.0, 1.0, 0.0))),
    );
    scene
        .graph
        .add_child(rig, Object3D::mesh("quad_a", quad, MaterialSlots::single(painted)));
    scene.graph.add_child(
        rig,
        Object3D::mesh("quad_b", quad, MaterialSlots::single(painted))
            .with_transform(Transform::from_translation(Vec3::new(2.0, 0.0, 0.0))),
    );
    scene
        .graph
        .add_child(root, Object3D::mesh("triangle", triangle, MaterialSlots::single(plain)));

    scene.clips.push(AnimationClip::new(
        "bob",
        vec![Channel {
            target: rig,
            interpolation: Interpolation::Linear,
            timestamps: vec![0.0, 0.5, 1.0],
            keyframes: Keyframes::Translation(vec![
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 1.5, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ]),
        }],
    ));

    scene
}

/// Meshes with the given vertex and index counts, all sharing one material.
pub fn counted_scene(meshes: &[(usize, usize)], clips: usize) -> DecodedScene {
    let mut scene = DecodedScene::new("counted");
    let material = scene.resources.materials.alloc(Material::new("shared"));
    let root = scene.graph.root();

    for (mesh_index, &(vertex_count, index_count)) in meshes.iter().enumerate() {
        let positions = (0..vertex_count).map(|i| Vec3::new(i as f32 * 0.01, mesh_index as f32, 0.0));
        let indices = (0..index_count).map(|i| (i % vertex_count) as u32).collect();
        let geometry = scene.resources.geometries.alloc(Geometry::from_positions(
            format!("mesh {}", mesh_index),
            positions,
            Some(indices),
        ));
        let object = scene.graph.add_child(
            root,
            Object3D::mesh(format!("mesh {}", mesh_index), geometry, MaterialSlots::single(material)),
        );

        if mesh_index == 0 {
            for clip in 0..clips {
                scene.clips.push(AnimationClip::new(
                    format!("clip {}", clip),
                    vec![Channel {
                        target: object,
                        interpolation: Interpolation::Step,
                        timestamps: vec![0.0, 2.0],
                        keyframes: Keyframes::Scale(vec![Vec3::ONE, Vec3::splat(2.0)]),
                    }],
                ));
            }
        }
    }

    scene
}
