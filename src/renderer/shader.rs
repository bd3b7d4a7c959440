//! 着色器程序
//!
//! 一个文件可以包含多个阶段，两种写法任选其一：
//!
//! ```glsl
//! #type vertex
//! #version 450 core
//! void main() { ... }
//!
//! #type fragment
//! #version 450 core
//! void main() { ... }
//! ```
//!
//! 或者整个文件只有一份源码，用 `#ifdef VERTEX` / `#ifdef FRAGMENT` 等块区分阶段。
//! 这种写法下每个出现的阶段都会拿到完整源码，并在 `#version` 行之后插入
//! 对应的 `#define`。
//!
//! 一个程序有 1 到 3 个互不重复的阶段，计算着色器不能与图形阶段混用。

use std::path::Path;

use crate::core::error::{GraphicsError, Result};
use crate::gfx::{Gpu, ProgramHandle, ShaderStage, UniformValue};
use crate::{engine_error, engine_info};

use super::texture::Texture;

const TYPE_TOKEN: &str = "#type";
const MAX_STAGES: usize = 3;

/// 把一份源码拆成各个阶段
pub fn split_stages(source: &str) -> Result<Vec<(ShaderStage, String)>> {
    let has_type_marker = source.lines().any(|l| l.trim_start().starts_with(TYPE_TOKEN));

    let stages = if has_type_marker {
        split_type_markers(source)?
    } else {
        split_ifdef_blocks(source)
    };

    validate_stages(&stages)?;
    Ok(stages)
}

fn split_type_markers(source: &str) -> Result<Vec<(ShaderStage, String)>> {
    let mut stages: Vec<(ShaderStage, String)> = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(TYPE_TOKEN) {
            let name = rest.trim();
            let stage = ShaderStage::from_marker(name)
                .ok_or_else(|| GraphicsError::ShaderSource(format!("unknown shader stage '{}'", name)))?;
            stages.push((stage, String::new()));
        } else if let Some((_, body)) = stages.last_mut() {
            body.push_str(line);
            body.push('\n');
        }
        // 第一个 #type 之前的内容被忽略
    }

    Ok(stages)
}

fn split_ifdef_blocks(source: &str) -> Vec<(ShaderStage, String)> {
    let mut found: Vec<ShaderStage> = Vec::new();

    for line in source.lines() {
        let Some(name) = line.trim_start().strip_prefix("#ifdef") else {
            continue;
        };
        let name = name.trim();
        let stage = [ShaderStage::Vertex, ShaderStage::Geometry, ShaderStage::Fragment, ShaderStage::Compute]
            .into_iter()
            .find(|s| s.define() == name);
        if let Some(stage) = stage {
            if !found.contains(&stage) {
                found.push(stage);
            }
        }
    }

    found
        .into_iter()
        .map(|stage| (stage, insert_define(source, stage.define())))
        .collect()
}

/// 在 `#version` 行之后插入 `#define <name>`；没有 `#version` 时放在最前面
fn insert_define(source: &str, name: &str) -> String {
    let define = format!("#define {}\n", name);
    let mut out = String::with_capacity(source.len() + define.len());
    let mut inserted = false;

    for line in source.lines() {
        out.push_str(line);
        out.push('\n');
        if !inserted && line.trim_start().starts_with("#version") {
            out.push_str(&define);
            inserted = true;
        }
    }

    if !inserted {
        out.insert_str(0, &define);
    }
    out
}

fn validate_stages(stages: &[(ShaderStage, String)]) -> Result<()> {
    if stages.is_empty() {
        return Err(GraphicsError::ShaderSource("no shader stage found".to_string()).into());
    }
    if stages.len() > MAX_STAGES {
        return Err(GraphicsError::ShaderSource(format!(
            "too many shader stages: {} (at most {})",
            stages.len(),
            MAX_STAGES
        ))
        .into());
    }

    for (i, (stage, _)) in stages.iter().enumerate() {
        if stages[..i].iter().any(|(s, _)| s == stage) {
            return Err(GraphicsError::ShaderSource(format!("duplicated {} stage", stage.name())).into());
        }
    }

    let has_compute = stages.iter().any(|(s, _)| *s == ShaderStage::Compute);
    if has_compute && stages.len() > 1 {
        return Err(GraphicsError::ShaderSource(
            "compute shader cannot be combined with graphics stages".to_string(),
        )
        .into());
    }

    Ok(())
}

/// 链接好的着色器程序
pub struct ShaderProgram {
    gpu: Gpu,
    handle: ProgramHandle,
    stages: Vec<ShaderStage>,
}

impl ShaderProgram {
    /// 读取并编译一个着色器文件
    pub fn from_file(gpu: &Gpu, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;

        let program = Self::from_source(gpu, &source).map_err(|e| {
            engine_error!(path = %path.display(), "failed to build shader: {}", e);
            e
        })?;

        engine_info!(path = %path.display(), stages = program.stages.len(), "shader loaded");
        Ok(program)
    }

    /// 从包含阶段标记的源码编译
    pub fn from_source(gpu: &Gpu, source: &str) -> Result<Self> {
        let stages = split_stages(source)?;
        Self::compile(gpu, stages)
    }

    /// 从独立的顶点/片元源码编译
    pub fn from_stages(gpu: &Gpu, vertex: &str, fragment: &str) -> Result<Self> {
        Self::compile(
            gpu,
            vec![
                (ShaderStage::Vertex, vertex.to_string()),
                (ShaderStage::Fragment, fragment.to_string()),
            ],
        )
    }

    fn compile(gpu: &Gpu, stages: Vec<(ShaderStage, String)>) -> Result<Self> {
        let handle = gpu.create_program(&stages).map_err(|e| {
            engine_error!("shader compilation failed: {}", e);
            e
        })?;

        Ok(Self {
            gpu: gpu.clone(),
            handle,
            stages: stages.into_iter().map(|(s, _)| s).collect(),
        })
    }

    pub fn bind(&self) {
        self.gpu.use_program(Some(self.handle));
    }

    pub fn unbind(&self) {
        self.gpu.use_program(None);
    }

    /// 按名字上传 uniform；程序中不存在的名字被忽略
    pub fn upload(&self, name: &str, value: impl Into<UniformValue>) {
        self.gpu.set_uniform(self.handle, name, value.into());
    }

    /// 把纹理绑定到 `slot`，并把采样器 `name` 指向该槽位
    pub fn texture(&self, name: &str, texture: &Texture, slot: u32) {
        texture.bind(slot);
        self.upload(name, slot as i32);
    }

    pub fn stages(&self) -> &[ShaderStage] {
        &self.stages
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.gpu.delete_program(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MiniGlError;
    use crate::gfx::{DeviceCall, HeadlessDevice, TextureFormat};
    use crate::math::Matrix4;
    use std::rc::Rc;

    const TWO_STAGES: &str = "\
#type vertex
#version 450 core
layout(location = 0) in vec3 a_pos;
uniform mat4 u_viewProj;
void main() { gl_Position = u_viewProj * vec4(a_pos, 1.0); }

#type fragment
#version 450 core
out vec4 o_color;
uniform vec4 u_color;
uniform sampler2D u_tex;
void main() { o_color = u_color; }
";

    fn setup() -> (Rc<HeadlessDevice>, Gpu) {
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Gpu = device.clone();
        (device, gpu)
    }

    fn assert_source_error(result: Result<Vec<(ShaderStage, String)>>) {
        assert!(matches!(result, Err(MiniGlError::Graphics(GraphicsError::ShaderSource(_)))));
    }

    #[test]
    fn test_two_type_blocks() {
        let stages = split_stages(TWO_STAGES).unwrap();
        let kinds: Vec<ShaderStage> = stages.iter().map(|(s, _)| *s).collect();
        assert_eq!(kinds, vec![ShaderStage::Vertex, ShaderStage::Fragment]);
        assert!(stages[0].1.starts_with("#version 450 core"));
        assert!(!stages[0].1.contains("o_color"));
    }

    #[test]
    fn test_four_type_blocks_fail() {
        let source = "#type vertex\nvoid main(){}\n#type geometry\nvoid main(){}\n\
                      #type fragment\nvoid main(){}\n#type pixel\nvoid main(){}\n";
        assert_source_error(split_stages(source));
    }

    #[test]
    fn test_invalid_stage_sets() {
        assert_source_error(split_stages("#type tessellation\nvoid main(){}\n"));
        assert_source_error(split_stages("#type vertex\nvoid main(){}\n#type vertex\nvoid main(){}\n"));
        assert_source_error(split_stages("#type compute\nvoid main(){}\n#type vertex\nvoid main(){}\n"));
        assert_source_error(split_stages("#version 450 core\nvoid main(){}\n"));
    }

    #[test]
    fn test_ifdef_blocks_get_define_after_version() {
        let source = "\
#version 450 core
#ifdef COMPUTE
layout(local_size_x = 16, local_size_y = 16) in;
void main() {}
#endif
";
        let stages = split_stages(source).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].0, ShaderStage::Compute);
        assert!(stages[0].1.starts_with("#version 450 core\n#define COMPUTE\n"));
    }

    #[test]
    fn test_ifdef_vertex_and_fragment() {
        let source = "#version 450 core\n#ifdef VERTEX\nvoid main(){}\n#endif\n#ifdef FRAGMENT\nvoid main(){}\n#endif\n";
        let stages = split_stages(source).unwrap();

        assert_eq!(stages.len(), 2);
        assert!(stages[0].1.contains("#define VERTEX"));
        assert!(!stages[0].1.contains("#define FRAGMENT"));
        assert!(stages[1].1.contains("#define FRAGMENT"));
    }

    #[test]
    fn test_compile_and_upload() {
        let (device, gpu) = setup();
        let shader = ShaderProgram::from_source(&gpu, TWO_STAGES).unwrap();
        assert_eq!(shader.stages(), &[ShaderStage::Vertex, ShaderStage::Fragment]);
        device.take_calls();

        shader.bind();
        shader.upload("u_viewProj", Matrix4::identity());
        // 不存在的 uniform 不产生任何调用
        shader.upload("u_missing", 1.0f32);

        assert_eq!(
            device.take_calls(),
            vec![
                DeviceCall::UseProgram(Some(shader.handle().raw())),
                DeviceCall::Uniform {
                    program: shader.handle().raw(),
                    name: "u_viewProj".to_string(),
                    value: UniformValue::Mat4(Matrix4::identity()),
                },
            ]
        );
    }

    #[test]
    fn test_texture_sampler() {
        let (device, gpu) = setup();
        let shader = ShaderProgram::from_source(&gpu, TWO_STAGES).unwrap();
        let texture = Texture::new(&gpu, 4, 4, TextureFormat::Rgba8).unwrap();
        device.take_calls();

        shader.texture("u_tex", &texture, 2);
        let calls = device.take_calls();
        assert_eq!(calls[0], DeviceCall::BindTextureUnit { unit: 2, id: texture.handle().raw() });
        assert!(matches!(&calls[1], DeviceCall::Uniform { value: UniformValue::Int(2), .. }));
    }

    #[test]
    fn test_compile_failure_leaves_nothing() {
        let (device, gpu) = setup();
        let err = ShaderProgram::from_stages(&gpu, "void main() {}", "void nothing() {}").err().unwrap();

        assert!(matches!(err, MiniGlError::Graphics(GraphicsError::ShaderCompilation(_))));
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn test_missing_file() {
        let (_device, gpu) = setup();
        let err = ShaderProgram::from_file(&gpu, "no/such/shader.glsl").err().unwrap();
        assert!(matches!(err, MiniGlError::Io(_)));
    }
}
