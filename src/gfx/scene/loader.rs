//! OBJ model loading
//!
//! Geometry and material references are read from disk first ([`read_obj`]),
//! then the textures are uploaded through a per-model [`TextureCache`] so that
//! meshes sharing an image share one GPU texture.

use std::path::{Path, PathBuf};

use crate::{
    error::AssetError,
    gfx::resources::{
        material::{MeshTextures, TextureKind},
        texture_cache::TextureCache,
        texture_resource::TextureResource,
    },
};

use super::{
    model::{calculate_smooth_normals, Mesh, Model},
    vertex::Vertex3D,
};

/// CPU-side mesh read from an OBJ file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
    /// Texture files referenced by the mesh material, resolved against the
    /// model's directory.
    pub textures: Vec<(TextureKind, PathBuf)>,
}

impl MeshData {
    /// The referenced maps the shaded program samples. Only these are read
    /// and uploaded; the rest stay as paths.
    pub fn sampled_textures(&self) -> impl Iterator<Item = &(TextureKind, PathBuf)> {
        self.textures.iter().filter(|(kind, _)| kind.is_sampled())
    }
}

/// Reads every mesh of an OBJ file. With `flip_uvs` the V coordinate is
/// mirrored (`v = 1 - v`).
pub fn read_obj(path: &Path, flip_uvs: bool) -> Result<Vec<MeshData>, AssetError> {
    let model_error = |message: String| AssetError::Model {
        path: path.to_path_buf(),
        message,
    };

    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|err| model_error(err.to_string()))?;

    let materials = materials.unwrap_or_else(|err| {
        log::debug!("No materials for '{}': {err}", path.display());
        Vec::new()
    });

    if models.is_empty() {
        return Err(model_error("file contains no meshes".into()));
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let meshes = models
        .into_iter()
        .map(|model| {
            let mesh = model.mesh;
            let positions: Vec<[f32; 3]> = mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect();

            let normals: Vec<[f32; 3]> = if mesh.normals.len() == mesh.positions.len() {
                mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
            } else {
                calculate_smooth_normals(&positions, &mesh.indices)
            };

            let vertices = positions
                .iter()
                .zip(&normals)
                .enumerate()
                .map(|(i, (position, normal))| {
                    let tex_coords = match mesh.texcoords.get(2 * i..2 * i + 2) {
                        Some(uv) if flip_uvs => [uv[0], 1.0 - uv[1]],
                        Some(uv) => [uv[0], uv[1]],
                        None => [0.0, 0.0],
                    };
                    Vertex3D {
                        position: *position,
                        tex_coords,
                        normal: *normal,
                    }
                })
                .collect();

            let textures = mesh
                .material_id
                .and_then(|id| materials.get(id))
                .map(|material| material_textures(material, base_dir))
                .unwrap_or_default();

            MeshData {
                name: model.name,
                vertices,
                indices: mesh.indices,
                textures,
            }
        })
        .collect();

    Ok(meshes)
}

fn material_textures(material: &tobj::Material, base_dir: &Path) -> Vec<(TextureKind, PathBuf)> {
    let height = ["map_disp", "disp", "map_Disp"]
        .iter()
        .find_map(|key| material.unknown_param.get(*key));

    [
        (TextureKind::Diffuse, material.diffuse_texture.as_ref()),
        (TextureKind::Specular, material.specular_texture.as_ref()),
        (TextureKind::Normal, material.normal_texture.as_ref()),
        (TextureKind::Height, height),
    ]
    .into_iter()
    .filter_map(|(kind, file)| file.map(|file| (kind, base_dir.join(file.trim()))))
    .collect()
}

/// Loads an OBJ model and uploads its textures. Call [`Model::upload`]
/// afterwards to create the GPU buffers.
pub fn load_model(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
    flip_uvs: bool,
) -> Result<Model, AssetError> {
    let mesh_data = read_obj(path, flip_uvs)?;
    let mut cache = TextureCache::new();

    let meshes = mesh_data
        .into_iter()
        .map(|data| {
            let mut textures = MeshTextures::default();
            for (kind, texture_path) in data.sampled_textures() {
                let texture = cache.get_or_load(texture_path, |resolved| {
                    TextureResource::load(device, queue, resolved, kind.options())
                })?;
                textures.set(*kind, texture);
            }
            Ok(Mesh::new(data.vertices, data.indices).with_textures(textures))
        })
        .collect::<Result<Vec<_>, AssetError>>()?;

    log::info!(
        "Loaded model '{}': {} meshes, {} textures ({} shared)",
        path.display(),
        meshes.len(),
        cache.len(),
        cache.hits()
    );

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Model::new(name, meshes).with_flipped_uvs(flip_uvs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
o quad
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 0.0 -1.0
v 0.0 0.0 -1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 0.25
vt 0.0 1.0
usemtl crate
f 1/1 2/2 3/3 4/4
";

    const QUAD_MTL: &str = "\
newmtl crate
map_Kd textures/diffuse.png
map_Ks textures/specular.png
";

    fn write_model(dir: &Path) -> PathBuf {
        let path = dir.join("quad.obj");
        fs::write(&path, QUAD_OBJ).unwrap();
        fs::write(dir.join("quad.mtl"), QUAD_MTL).unwrap();
        path
    }

    #[test]
    fn test_quad_is_triangulated() {
        let dir = tempfile::tempdir().unwrap();
        let meshes = read_obj(&write_model(dir.path()), false).unwrap();

        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].vertices.len(), 4);
        assert_eq!(meshes[0].indices.len(), 6);
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let dir = tempfile::tempdir().unwrap();
        let meshes = read_obj(&write_model(dir.path()), false).unwrap();
        for vertex in &meshes[0].vertices {
            assert!((vertex.normal[1] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_flip_uvs_mirrors_v() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path());

        let plain = read_obj(&path, false).unwrap();
        let flipped = read_obj(&path, true).unwrap();
        let find = |mesh: &MeshData, position: [f32; 3]| {
            mesh.vertices
                .iter()
                .find(|v| v.position == position)
                .map(|v| v.tex_coords)
                .unwrap()
        };

        assert_eq!(find(&plain[0], [1.0, 0.0, -1.0]), [1.0, 0.25]);
        assert_eq!(find(&flipped[0], [1.0, 0.0, -1.0]), [1.0, 0.75]);
    }

    #[test]
    fn test_material_textures_resolve_next_to_model() {
        let dir = tempfile::tempdir().unwrap();
        let meshes = read_obj(&write_model(dir.path()), false).unwrap();

        assert_eq!(
            meshes[0].textures,
            vec![
                (TextureKind::Diffuse, dir.path().join("textures/diffuse.png")),
                (TextureKind::Specular, dir.path().join("textures/specular.png")),
            ]
        );
    }

    #[test]
    fn test_normal_and_height_maps_are_not_uploaded() {
        let data = MeshData {
            name: "wall".into(),
            vertices: Vec::new(),
            indices: Vec::new(),
            textures: vec![
                (TextureKind::Diffuse, PathBuf::from("wall_diffuse.png")),
                (TextureKind::Normal, PathBuf::from("wall_normal.png")),
                (TextureKind::Specular, PathBuf::from("wall_specular.png")),
                (TextureKind::Height, PathBuf::from("wall_height.png")),
            ],
        };
        let kinds: Vec<TextureKind> = data.sampled_textures().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![TextureKind::Diffuse, TextureKind::Specular]);
        assert_eq!(data.textures.len(), 4);
    }

    #[test]
    fn test_missing_file_is_model_error() {
        let err = read_obj(Path::new("does/not/exist.obj"), false).unwrap_err();
        assert!(matches!(err, AssetError::Model { .. }));
        assert!(err.to_string().contains("exist.obj"));
    }
}
