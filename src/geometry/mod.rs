/// 几何体模块
///
/// 顶点定义、CPU/GPU 网格以及模型加载器。
///
/// # 模块结构
///
/// - `vertex`: 顶点结构及其缓冲区布局
/// - `mesh`: `MeshData`（CPU 侧）与 `Mesh`（GPU 侧）
/// - `loaders`: OBJ 加载器
///
/// ```text
/// 文件 (OBJ)
///     ↓
/// ObjLoader
///     ↓
/// MeshData (CPU侧数据)
///     ↓
/// Mesh (VertexArray)
/// ```

pub mod loaders;
pub mod mesh;
pub mod vertex;

pub use mesh::{Mesh, MeshData};
pub use vertex::Vertex;
