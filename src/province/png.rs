// src/province/png.rs
//! Отладочный превью мешей провинций
//!
//! Треугольники рисуются в нормализованной плоскости: x ∈ [-1, 1] растягивается на ширину
//! изображения, y ∈ [-1, 1] на высоту (север сверху). Высота выводится из ширины и
//! [`Normalization`], так что пропорции градусной сетки сохраняются.
//!
//! Цвет провинции детерминированно выводится из её `id` (FNV-1a), рёбра треугольников
//! рисуются затемнённым цветом той же провинции.
//!
//! ## Пример использования
//! ```no_run
//! use geomap::config::Normalization;
//! use geomap::province::png::MeshPreview;
//! # fn run(map: &geomap::Map) -> Result<(), Box<dyn std::error::Error>> {
//! let results = map.triangulate_all(&Default::default());
//! let mut preview = MeshPreview::new(2048, Normalization::default());
//! preview.draw_all(&results);
//! preview.save_as_png("output/meshes.png")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

use crate::config::Normalization;
use crate::map::ProvinceMeshResult;
use crate::province::mesh::ProvinceMesh;

const BACKGROUND: Rgba<u8> = Rgba([24, 24, 32, 255]);

/// Растровое изображение с нарисованными мешами
#[derive(Debug, Clone)]
pub struct MeshPreview {
    image: RgbaImage,
    wireframe: bool,
}

impl MeshPreview {
    /// Создаёт пустой холст шириной `width` пикселей
    #[must_use]
    pub fn new(width: u32, normalization: Normalization) -> Self {
        let width = width.max(2);
        let ratio = normalization.lat_divisor / normalization.lon_divisor;
        let height = ((f64::from(width) * ratio).round() as u32).max(2);
        Self {
            image: RgbaImage::from_pixel(width, height, BACKGROUND),
            wireframe: true,
        }
    }

    /// Рисовать ли рёбра треугольников поверх заливки
    #[must_use]
    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Рисует меш одной провинции
    pub fn draw_mesh(&mut self, id: &str, mesh: &ProvinceMesh) {
        let fill = province_color(id);
        let edge = darken(fill);

        for triangle in mesh.triangles() {
            let corners = triangle.map(|(x, y)| self.to_pixel(x, y));

            let mut polygon: Vec<Point<i32>> = Vec::with_capacity(3);
            for (px, py) in corners {
                let point = Point::new(px.round() as i32, py.round() as i32);
                if polygon.last() != Some(&point) {
                    polygon.push(point);
                }
            }
            // draw_polygon_mut паникует, если первая точка совпадает с последней
            if polygon.len() == 3 && polygon[0] != polygon[2] {
                draw_polygon_mut(&mut self.image, &polygon, fill);
            }

            if self.wireframe {
                for i in 0..3 {
                    draw_line_segment_mut(&mut self.image, corners[i], corners[(i + 1) % 3], edge);
                }
            }
        }
    }

    /// Рисует результаты пакетной триангуляции; провинции с ошибкой пропускаются
    pub fn draw_all(&mut self, results: &[ProvinceMeshResult]) {
        for (id, mesh) in results {
            if let Ok(mesh) = mesh {
                self.draw_mesh(id, mesh);
            }
        }
    }

    /// Сохраняет превью в PNG-файл
    pub fn save_as_png(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        self.image.save(path)?;
        Ok(())
    }

    fn to_pixel(&self, x: f32, y: f32) -> (f32, f32) {
        let max_x = (self.image.width() - 1) as f32;
        let max_y = (self.image.height() - 1) as f32;
        ((x + 1.0) * 0.5 * max_x, (1.0 - y) * 0.5 * max_y)
    }
}

/// Цвет провинции по её идентификатору
///
/// # Пример
/// ```
/// use geomap::province::png::province_color;
/// assert_eq!(province_color("alpha"), province_color("alpha"));
/// assert_eq!(province_color("alpha").0[3], 255);
/// ```
#[must_use]
pub fn province_color(id: &str) -> Rgba<u8> {
    let hash = fnv1a(id.as_bytes());
    let [r, g, b, _] = hash.to_le_bytes();
    // слишком тёмные цвета сливаются с фоном
    Rgba([r | 0x40, g | 0x40, b | 0x40, 255])
}

/// Цвет провинции в формате `"#rrggbb"`
#[must_use]
pub fn province_color_hex(id: &str) -> String {
    let Rgba([r, g, b, _]) = province_color(id);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn darken(Rgba([r, g, b, a]): Rgba<u8>) -> Rgba<u8> {
    Rgba([r / 2, g / 2, b / 2, a])
}

fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5_u32, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    })
}
