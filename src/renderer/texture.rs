//! 二维纹理
//!
//! 图像文件由 `image` crate 解码，上传前先垂直翻转（图像原点在左上角，
//! OpenGL 纹理原点在左下角）。3 通道图像存为 `Rgb8`，4 通道存为 `Rgba8`，
//! 其他通道数一律拒绝。

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::core::error::{GraphicsError, Result, TextureError};
use crate::engine_info;
use crate::gfx::{Gpu, ImageAccess, PixelFormat, TextureFormat, TextureHandle};

pub struct Texture {
    gpu: Gpu,
    handle: TextureHandle,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl Texture {
    /// 分配一张空白纹理（线性过滤，边缘截断）
    pub fn new(gpu: &Gpu, width: u32, height: u32, format: TextureFormat) -> Result<Self> {
        let handle = gpu.create_texture(width, height, format)?;
        Ok(Self { gpu: gpu.clone(), handle, width, height, format })
    }

    /// 从图像文件加载
    pub fn from_file(gpu: &Gpu, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| TextureError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let texture = Self::upload(gpu, image, path)?;
        engine_info!(
            path = %path.display(),
            width = texture.width,
            height = texture.height,
            format = ?texture.format,
            "texture loaded"
        );
        Ok(texture)
    }

    /// 从已解码的图像创建
    pub fn from_image(gpu: &Gpu, image: &DynamicImage) -> Result<Self> {
        Self::upload(gpu, image.clone(), Path::new("<memory>"))
    }

    fn upload(gpu: &Gpu, image: DynamicImage, path: &Path) -> Result<Self> {
        let image = image.flipv();
        let (width, height) = (image.width(), image.height());

        let (format, pixel_format, pixels) = match image.color().channel_count() {
            3 => (TextureFormat::Rgb8, PixelFormat::Rgb, image.into_rgb8().into_raw()),
            4 => (TextureFormat::Rgba8, PixelFormat::Rgba, image.into_rgba8().into_raw()),
            channels => {
                return Err(TextureError::UnsupportedChannels { path: PathBuf::from(path), channels }.into())
            }
        };

        let texture = Self::new(gpu, width, height, format)?;
        gpu.texture_sub_image(texture.handle, width, height, pixel_format, &pixels);
        Ok(texture)
    }

    /// 绑定到采样单元 `unit`
    pub fn bind(&self, unit: u32) {
        self.gpu.bind_texture_unit(unit, self.handle);
    }

    /// 作为 image 绑定到 `unit`，供计算着色器读写
    pub fn bind_image(&self, unit: u32, access: ImageAccess) -> Result<()> {
        if self.format.is_depth() {
            return Err(GraphicsError::InvalidUsage(format!(
                "depth texture {} cannot be bound as an image",
                self.handle.raw()
            ))
            .into());
        }
        self.gpu.bind_image_texture(unit, self.handle, access, self.format);
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.gpu.delete_texture(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MiniGlError;
    use crate::gfx::{DeviceCall, HeadlessDevice};
    use image::{GrayImage, RgbImage, RgbaImage};
    use std::rc::Rc;

    fn setup() -> (Rc<HeadlessDevice>, Gpu) {
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Gpu = device.clone();
        (device, gpu)
    }

    #[test]
    fn test_channel_count_selects_format() {
        let (device, gpu) = setup();

        let rgb = DynamicImage::ImageRgb8(RgbImage::new(4, 2));
        let texture = Texture::from_image(&gpu, &rgb).unwrap();
        assert_eq!(texture.format(), TextureFormat::Rgb8);
        assert_eq!(texture.size(), (4, 2));
        assert_eq!(device.texture_size(texture.handle()), Some((4, 2)));

        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(3, 3));
        assert_eq!(Texture::from_image(&gpu, &rgba).unwrap().format(), TextureFormat::Rgba8);

        assert!(device.calls().contains(&DeviceCall::TextureSubImage {
            id: texture.handle().raw(),
            width: 4,
            height: 2,
            format: PixelFormat::Rgb,
        }));
    }

    #[test]
    fn test_unsupported_channels() {
        let (_device, gpu) = setup();
        let gray = DynamicImage::ImageLuma8(GrayImage::new(2, 2));

        let err = Texture::from_image(&gpu, &gray).err().unwrap();
        assert!(matches!(
            err,
            MiniGlError::Texture(TextureError::UnsupportedChannels { channels: 1, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let (_device, gpu) = setup();
        let err = Texture::from_file(&gpu, "does/not/exist.png").err().unwrap();
        assert!(matches!(err, MiniGlError::Texture(TextureError::Decode { .. })));
    }

    #[test]
    fn test_depth_cannot_be_image() {
        let (device, gpu) = setup();
        let depth = Texture::new(&gpu, 64, 64, TextureFormat::Depth).unwrap();
        assert!(depth.bind_image(0, ImageAccess::ReadOnly).is_err());

        let color = Texture::new(&gpu, 64, 64, TextureFormat::Rgba32F).unwrap();
        color.bind_image(1, ImageAccess::WriteOnly).unwrap();
        assert!(device.calls().contains(&DeviceCall::BindImageTexture {
            unit: 1,
            id: color.handle().raw(),
            access: ImageAccess::WriteOnly,
        }));
    }
}
