/// 网格顶点定义模块
///
/// `Vertex` 的字节布局与 `Vertex::layout()` 返回的 `BufferLayout` 一一对应，
/// 着色器中按属性位置 0..3 读取 `a_pos`、`a_normal`、`a_tex`、`a_color`。

use bytemuck::{Pod, Zeroable};

use crate::math::Color;
use crate::renderer::{BufferElement, BufferLayout, DataType};

/// 网格顶点
///
/// # 内存布局
///
/// - pos: 12 bytes (3 * f32)
/// - normal: 12 bytes (3 * f32)
/// - tex: 8 bytes (2 * f32)
/// - color: 16 bytes (4 * f32)
/// - **总计**: 48 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 顶点位置 (x, y, z)
    pub pos: [f32; 3],

    /// 法线向量
    pub normal: [f32; 3],

    /// 纹理坐标 (u, v)
    pub tex: [f32; 2],

    /// 顶点颜色 (r, g, b, a)
    pub color: [f32; 4],
}

impl Vertex {
    /// 创建白色顶点
    #[inline]
    pub fn new(pos: [f32; 3], normal: [f32; 3], tex: [f32; 2]) -> Self {
        Self::with_color(pos, normal, tex, Color::WHITE)
    }

    #[inline]
    pub fn with_color(pos: [f32; 3], normal: [f32; 3], tex: [f32; 2], color: Color) -> Self {
        Self { pos, normal, tex, color: color.to_array() }
    }

    /// 与字段顺序一致的顶点布局
    pub fn layout() -> BufferLayout {
        BufferLayout::new([
            BufferElement::new(DataType::Float3, "a_pos"),
            BufferElement::new(DataType::Float3, "a_normal"),
            BufferElement::new(DataType::Float2, "a_tex"),
            BufferElement::new(DataType::Float4, "a_color"),
        ])
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new([0.0; 3], [0.0; 3], [0.0; 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_vertex_size_matches_layout() {
        assert_eq!(size_of::<Vertex>(), 48);
        assert_eq!(Vertex::layout().stride() as usize, size_of::<Vertex>());
    }

    #[test]
    fn test_field_offsets_match_layout() {
        let layout = Vertex::layout();
        let offsets: Vec<usize> = layout.iter().map(|e| e.offset as usize).collect();
        assert_eq!(
            offsets,
            vec![
                offset_of!(Vertex, pos),
                offset_of!(Vertex, normal),
                offset_of!(Vertex, tex),
                offset_of!(Vertex, color),
            ]
        );
    }

    #[test]
    fn test_vertex_default_is_white() {
        let vertex = Vertex::default();

        assert_eq!(vertex.pos, [0.0, 0.0, 0.0]);
        assert_eq!(vertex.color, [1.0, 1.0, 1.0, 1.0]);
    }
}
