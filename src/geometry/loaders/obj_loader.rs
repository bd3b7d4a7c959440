/// OBJ 文件加载器
///
/// 使用 tobj crate 加载 Wavefront OBJ 格式的模型：
///
/// - 自动三角化，单一索引（位置/法线/UV 共用一套索引）
/// - 缺失的法线和纹理坐标补零
/// - 顶点颜色为白色
/// - 多个对象合并为一个网格，索引按顶点偏移重定位
use std::path::Path;

use super::MeshLoader;
use crate::core::error::{MeshLoadError, Result};
use crate::engine_warn;
use crate::geometry::mesh::MeshData;
use crate::geometry::vertex::Vertex;

/// OBJ 格式加载器
pub struct ObjLoader;

impl ObjLoader {
    fn load_options() -> tobj::LoadOptions {
        tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        }
    }

    /// 把 tobj 的模型列表合并成一个网格
    fn collect(models: &[tobj::Model], name: &str) -> Result<MeshData> {
        if models.is_empty() {
            return Err(MeshLoadError::InvalidGeometry("OBJ file contains no model".to_string()).into());
        }

        let mut mesh_data = MeshData::with_name(name);

        for model in models {
            let mesh = &model.mesh;
            let positions = &mesh.positions;
            let normals = &mesh.normals;
            let texcoords = &mesh.texcoords;

            if positions.len() % 3 != 0 {
                return Err(MeshLoadError::InvalidGeometry(format!(
                    "incomplete position data: {} floats",
                    positions.len()
                ))
                .into());
            }

            let vertex_start = mesh_data.vertices.len() as u32;
            let vertex_count = positions.len() / 3;

            for i in 0..vertex_count {
                let pos = [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]];

                let normal = if normals.len() >= (i + 1) * 3 {
                    [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]]
                } else {
                    [0.0, 0.0, 0.0]
                };

                let tex = if texcoords.len() >= (i + 1) * 2 {
                    [texcoords[i * 2], texcoords[i * 2 + 1]]
                } else {
                    [0.0, 0.0]
                };

                mesh_data.vertices.push(Vertex::new(pos, normal, tex));
            }

            mesh_data.indices.extend(mesh.indices.iter().map(|&index| vertex_start + index));
        }

        mesh_data.validate()?;
        Ok(mesh_data)
    }

    /// 从内存中的 OBJ 文本加载（忽略材质）
    pub fn load_from_str(source: &str) -> Result<MeshData> {
        let mut reader = std::io::BufReader::new(source.as_bytes());
        let (models, _materials) = tobj::load_obj_buf(&mut reader, &Self::load_options(), |_| {
            Ok((Vec::new(), Default::default()))
        })
        .map_err(|e| MeshLoadError::ParseError(format!("tobj: {}", e)))?;

        Self::collect(&models, "memory")
    }
}

impl MeshLoader for ObjLoader {
    fn load_from_file(path: &Path) -> Result<MeshData> {
        if !path.exists() {
            return Err(MeshLoadError::FileNotFound(path.to_path_buf()).into());
        }

        let (models, materials) = tobj::load_obj(path, &Self::load_options())
            .map_err(|e| MeshLoadError::ParseError(format!("tobj: {}", e)))?;

        if let Err(e) = materials {
            engine_warn!(path = %path.display(), "material library not loaded: {}", e);
        }

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed");
        Self::collect(&models, name)
    }

    fn load_from_memory(data: &[u8]) -> Result<MeshData> {
        let source = std::str::from_utf8(data)
            .map_err(|e| MeshLoadError::ParseError(format!("OBJ data is not UTF-8: {}", e)))?;
        Self::load_from_str(source)
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["obj"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MiniGlError;

    const QUAD: &str = "\
o quad
v -1.0 -1.0 0.0
v  1.0 -1.0 0.0
v  1.0  1.0 0.0
v -1.0  1.0 0.0
vn 0.0 0.0 1.0
f 1//1 2//1 3//1 4//1
";

    #[test]
    fn test_supported_extensions() {
        assert_eq!(ObjLoader::supported_extensions(), &["obj"]);
    }

    #[test]
    fn test_quad_is_triangulated() {
        let mesh = ObjLoader::load_from_str(QUAD).unwrap();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        // 缺失的纹理坐标补零，颜色为白色
        assert!(mesh.vertices.iter().all(|v| v.tex == [0.0, 0.0] && v.color == [1.0; 4]));
    }

    #[test]
    fn test_load_from_memory() {
        let mesh = ObjLoader::load_from_memory(QUAD.as_bytes()).unwrap();
        assert_eq!(mesh.index_count(), 6);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = ObjLoader::load_from_file(Path::new("nonexistent.obj")).unwrap_err();
        assert!(matches!(err, MiniGlError::MeshLoading(MeshLoadError::FileNotFound(_))));
    }
}
