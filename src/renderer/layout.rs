//! 顶点缓冲区布局
//!
//! `BufferLayout` 以一组具名的 `BufferElement` 描述顶点缓冲区中一个顶点的字节结构。
//! 构造时按声明顺序计算每个元素的偏移：
//!
//! - `offset(i)` 等于前 `i` 个元素大小之和
//! - `stride` 等于所有元素大小之和
//!
//! 矩阵类型按列占用多个属性位置（`Mat2` → 2，`Mat3` → 3，`Mat4` → 4）。

/// 顶点属性的数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float,
    Float2,
    Float3,
    Float4,
    Int,
    Int2,
    Int3,
    Int4,
    Mat2,
    Mat3,
    Mat4,
}

impl DataType {
    /// 字节大小
    pub fn size(&self) -> u32 {
        4 * self.component_count() * self.location_count()
    }

    /// 每个属性位置的分量数
    pub fn component_count(&self) -> u32 {
        match self {
            DataType::Float | DataType::Int => 1,
            DataType::Float2 | DataType::Int2 | DataType::Mat2 => 2,
            DataType::Float3 | DataType::Int3 | DataType::Mat3 => 3,
            DataType::Float4 | DataType::Int4 | DataType::Mat4 => 4,
        }
    }

    /// 占用的属性位置数（矩阵每列一个）
    pub fn location_count(&self) -> u32 {
        match self {
            DataType::Mat2 => 2,
            DataType::Mat3 => 3,
            DataType::Mat4 => 4,
            _ => 1,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int | DataType::Int2 | DataType::Int3 | DataType::Int4)
    }
}

/// 布局中的一组同类型数据（例如位置 `vec3` 或颜色 `vec4`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferElement {
    pub name: String,
    pub data_type: DataType,
    pub size: u32,
    pub offset: u32,
    pub normalized: bool,
    /// 实例化除数：0 表示逐顶点，N 表示每 N 个实例前进一次
    pub divisor: u32,
}

impl BufferElement {
    pub fn new(data_type: DataType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type,
            size: data_type.size(),
            offset: 0,
            normalized: false,
            divisor: 0,
        }
    }

    /// 定点数据归一化到 [0, 1] / [-1, 1]
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// 设为逐实例属性
    pub fn per_instance(mut self, divisor: u32) -> Self {
        self.divisor = divisor;
        self
    }

    pub fn location_count(&self) -> u32 {
        self.data_type.location_count()
    }
}

/// 顶点缓冲区布局
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferLayout {
    elements: Vec<BufferElement>,
    stride: u32,
}

impl BufferLayout {
    /// 按声明顺序计算偏移和步长
    pub fn new(elements: impl IntoIterator<Item = BufferElement>) -> Self {
        let mut elements: Vec<BufferElement> = elements.into_iter().collect();

        let mut offset = 0;
        for element in &mut elements {
            element.offset = offset;
            offset += element.size;
        }

        Self { elements, stride: offset }
    }

    pub fn elements(&self) -> &[BufferElement] {
        &self.elements
    }

    /// 相邻两个顶点同一属性之间的字节距离
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// 占用的属性位置总数
    pub fn attribute_count(&self) -> u32 {
        self.elements.iter().map(BufferElement::location_count).sum()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BufferElement> {
        self.elements.iter()
    }
}

impl<'a> IntoIterator for &'a BufferLayout {
    type Item = &'a BufferElement;
    type IntoIter = std::slice::Iter<'a, BufferElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl FromIterator<BufferElement> for BufferLayout {
    fn from_iter<I: IntoIterator<Item = BufferElement>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_and_stride() {
        let layout = BufferLayout::new([
            BufferElement::new(DataType::Float3, "a_pos"),
            BufferElement::new(DataType::Float3, "a_normal"),
            BufferElement::new(DataType::Float2, "a_tex"),
            BufferElement::new(DataType::Float4, "a_color"),
        ]);

        let offsets: Vec<u32> = layout.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 32]);
        assert_eq!(layout.stride(), 48);
        assert_eq!(layout.attribute_count(), 4);
    }

    #[test]
    fn test_offsets_are_prefix_sums() {
        let types = [
            DataType::Int,
            DataType::Mat4,
            DataType::Float2,
            DataType::Int3,
            DataType::Mat2,
            DataType::Float,
            DataType::Mat3,
        ];
        let layout: BufferLayout = types
            .iter()
            .enumerate()
            .map(|(i, t)| BufferElement::new(*t, format!("e{}", i)))
            .collect();

        let mut expected = 0;
        for element in &layout {
            assert_eq!(element.offset, expected);
            expected += element.data_type.size();
        }
        assert_eq!(layout.stride(), expected);
    }

    #[test]
    fn test_matrix_sizes_and_locations() {
        assert_eq!(DataType::Mat2.size(), 16);
        assert_eq!(DataType::Mat3.size(), 36);
        assert_eq!(DataType::Mat4.size(), 64);

        let layout = BufferLayout::new([
            BufferElement::new(DataType::Mat4, "a_model").per_instance(1),
            BufferElement::new(DataType::Float4, "a_tint"),
        ]);
        assert_eq!(layout.attribute_count(), 5);
        assert_eq!(layout.elements()[0].divisor, 1);
    }

    #[test]
    fn test_empty_layout() {
        let layout = BufferLayout::default();
        assert!(layout.is_empty());
        assert_eq!(layout.stride(), 0);
        assert_eq!(layout.attribute_count(), 0);
    }
}
