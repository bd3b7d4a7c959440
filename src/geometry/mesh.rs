/// 网格模块
///
/// `MeshData` 是 CPU 侧的原始几何数据（顶点 + 索引），由加载器产生；
/// `Mesh` 把它上传到 GPU，持有对应的顶点数组，同时保留 CPU 侧的副本。
///
/// ```text
/// 文件 (OBJ) → ObjLoader → MeshData → Mesh (VertexArray)
/// ```

use std::path::Path;

use crate::core::error::{MeshLoadError, Result};
use crate::engine_info;
use crate::gfx::{DataUsage, Gpu};
use crate::renderer::{IndexBuffer, VertexArray, VertexBuffer};

use super::loaders::{MeshLoader, ObjLoader};
use super::vertex::Vertex;

/// CPU 侧网格数据
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,

    /// 三角形顶点索引，每 3 个一组
    pub indices: Vec<u32>,

    /// 网格名称（通常取自文件名）
    pub name: Option<String>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices, name: None }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 检查索引数量是 3 的倍数且全部落在顶点范围内
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshLoadError::InvalidGeometry(format!(
                "index count must be a multiple of 3, got {}",
                self.indices.len()
            ))
            .into());
        }

        let vertex_count = self.vertices.len() as u32;
        if let Some((i, &index)) = self.indices.iter().enumerate().find(|(_, &idx)| idx >= vertex_count) {
            return Err(MeshLoadError::InvalidGeometry(format!(
                "index {} at position {} is out of range ({} vertices)",
                index, i, vertex_count
            ))
            .into());
        }

        Ok(())
    }
}

/// 上传到 GPU 的网格
pub struct Mesh {
    pub vertex_array: VertexArray,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// 由顶点和索引创建（不绑定）
    pub fn new(gpu: &Gpu, vertices: Vec<Vertex>, indices: Vec<u32>, usage: DataUsage) -> Result<Self> {
        let vertex_buffer = VertexBuffer::new(gpu, &vertices, Vertex::layout(), usage)?;
        let index_buffer = IndexBuffer::with_usage(gpu, &indices, usage)?;
        let vertex_array = VertexArray::with_buffers(gpu, vertex_buffer, index_buffer)?;

        Ok(Self { vertex_array, vertices, indices })
    }

    /// 从 `MeshData` 创建
    pub fn from_data(gpu: &Gpu, data: MeshData, usage: DataUsage) -> Result<Self> {
        data.validate()?;
        Self::new(gpu, data.vertices, data.indices, usage)
    }

    /// 从 OBJ 文件加载
    pub fn from_file(gpu: &Gpu, path: impl AsRef<Path>, usage: DataUsage) -> Result<Self> {
        let path = path.as_ref();
        let data = ObjLoader::load_from_file(path)?;
        let mesh = Self::from_data(gpu, data, usage)?;

        engine_info!(
            path = %path.display(),
            vertices = mesh.vertices.len(),
            indices = mesh.indices.len(),
            "mesh imported"
        );
        Ok(mesh)
    }

    pub fn bind(&self) {
        self.vertex_array.bind();
    }

    pub fn index_count(&self) -> u32 {
        self.vertex_array.index_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MiniGlError;
    use crate::gfx::HeadlessDevice;
    use std::rc::Rc;

    fn quad() -> (Vec<Vertex>, Vec<u32>) {
        let n = [0.0, 1.0, 0.0];
        let vertices = vec![
            Vertex::new([-10.0, -1.5, -10.0], n, [0.0, 0.0]),
            Vertex::new([10.0, -1.5, -10.0], n, [1.0, 0.0]),
            Vertex::new([10.0, -1.5, 10.0], n, [1.0, 1.0]),
            Vertex::new([-10.0, -1.5, 10.0], n, [0.0, 1.0]),
        ];
        (vertices, vec![0, 1, 2, 2, 3, 0])
    }

    #[test]
    fn test_mesh_uploads_vertex_array() {
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Gpu = device.clone();
        let (vertices, indices) = quad();

        let mesh = Mesh::new(&gpu, vertices, indices, DataUsage::Static).unwrap();
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.vertex_array.next_location(), 4);

        let vb = &mesh.vertex_array.vertex_buffers()[0];
        assert_eq!(device.buffer_data(vb.handle()).map(|b| b.len()), Some(4 * 48));
    }

    #[test]
    fn test_ground_and_imported_cube_keep_their_indices() {
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Gpu = device.clone();
        let (vertices, indices) = quad();

        let ground = Mesh::new(&gpu, vertices, indices, DataUsage::Static).unwrap();
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/res/cube.obj");
        let cube = Mesh::from_file(&gpu, &path, DataUsage::Static).unwrap();
        assert!(cube.index_count() > 0);

        let element = |mesh: &Mesh| {
            let ib = mesh.vertex_array.index_buffer().unwrap().handle().raw();
            (device.element_buffer(mesh.vertex_array.handle()), ib)
        };
        let (ground_bound, ground_ib) = element(&ground);
        let (cube_bound, cube_ib) = element(&cube);
        assert_eq!(ground_bound, Some(ground_ib));
        assert_eq!(cube_bound, Some(cube_ib));
        assert_eq!(device.bound_vertex_array(), None);
    }

    #[test]
    fn test_mesh_data_validation() {
        let (vertices, _) = quad();
        assert!(MeshData::new(vertices.clone(), vec![0, 1, 2]).validate().is_ok());
        assert!(MeshData::new(vertices.clone(), vec![0, 1]).validate().is_err());

        let err = MeshData::new(vertices, vec![0, 1, 9]).validate().unwrap_err();
        assert!(matches!(err, MiniGlError::MeshLoading(MeshLoadError::InvalidGeometry(_))));
    }

    #[test]
    fn test_mesh_data_counts() {
        let (vertices, indices) = quad();
        let data = MeshData::new(vertices, indices);

        assert_eq!(data.vertex_count(), 4);
        assert_eq!(data.index_count(), 6);
        assert_eq!(data.triangle_count(), 2);
        assert!(MeshData::with_name("ground").name.is_some());
    }
}
