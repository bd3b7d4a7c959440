/// 模型加载器模块
///
/// 提供统一的加载接口；目前只有 Wavefront OBJ 一种格式（tobj crate）。
///
/// ```rust,no_run
/// use minigl::geometry::loaders::{MeshLoader, ObjLoader};
/// use std::path::Path;
///
/// let mesh = ObjLoader::load_from_file(Path::new("demos/res/suzanne.obj"))?;
/// println!("{} triangles", mesh.triangle_count());
/// # Ok::<(), minigl::core::MiniGlError>(())
/// ```
use crate::core::error::{MeshLoadError, Result};
use crate::geometry::mesh::MeshData;
use std::path::Path;

pub mod obj_loader;

pub use obj_loader::ObjLoader;

/// 网格加载器 trait
///
/// 加载器是无状态的，只产生 CPU 侧的 `MeshData`，不接触 GPU。
pub trait MeshLoader {
    /// 从文件路径加载网格
    fn load_from_file(path: &Path) -> Result<MeshData>;

    /// 从文件内容加载网格
    fn load_from_memory(data: &[u8]) -> Result<MeshData>;

    /// 支持的扩展名（小写，不含点号）
    fn supported_extensions() -> &'static [&'static str];
}

/// 根据扩展名选择加载器
pub fn load_mesh(path: &Path) -> Result<MeshData> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if ObjLoader::supported_extensions().contains(&extension.as_str()) {
        ObjLoader::load_from_file(path)
    } else {
        Err(MeshLoadError::ParseError(format!("unsupported mesh format: '{}'", path.display())).into())
    }
}
