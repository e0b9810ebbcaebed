// src/geometry.rs
//! Базовые геометрические типы: координата и замкнутый контур

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Точка в градусах: долгота и широта
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

/// Замкнутый контур границы провинции
///
/// Последняя точка неявно соединяется с первой, дублирующая замыкающая точка не хранится.
///
/// # Гарантии
/// - Содержит не меньше 3 точек
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ring {
    points: Vec<Coordinate>,
}

impl Ring {
    /// Создаёт контур, проверяя число точек
    ///
    /// # Пример
    /// ```
    /// use geomap::geometry::{Coordinate, Ring};
    /// let ring = Ring::new(vec![
    ///     Coordinate::new(0.0, 0.0),
    ///     Coordinate::new(1.0, 0.0),
    ///     Coordinate::new(0.0, 1.0),
    /// ]).unwrap();
    /// assert_eq!(ring.len(), 3);
    /// assert!(Ring::new(vec![Coordinate::new(0.0, 0.0)]).is_err());
    /// ```
    pub fn new(points: Vec<Coordinate>) -> Result<Self, GeometryError> {
        if points.len() < 3 {
            return Err(GeometryError::TooFewPoints {
                found: points.len(),
            });
        }
        Ok(Self { points })
    }

    #[must_use]
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Всегда `false`: пустой контур создать нельзя
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Рёбра контура, включая замыкающее (последняя точка → первая)
    pub fn edges(&self) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Ориентированная площадь по формуле шнурования (положительная для обхода против часовой)
    ///
    /// Координаты считаются относительно первой точки, так что погрешность зависит
    /// от размера контура, а не от его удалённости от начала координат.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        let origin = self.points[0];
        self.edges()
            .map(|(a, b)| {
                let (ax, ay) = (a.lon - origin.lon, a.lat - origin.lat);
                let (bx, by) = (b.lon - origin.lon, b.lat - origin.lat);
                ax * by - bx * ay
            })
            .sum::<f64>()
            * 0.5
    }

    /// Размеры ограничивающего прямоугольника `(ширина, высота)`
    #[must_use]
    pub fn extent(&self) -> (f64, f64) {
        let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
        for point in &self.points {
            min_lon = min_lon.min(point.lon);
            max_lon = max_lon.max(point.lon);
            min_lat = min_lat.min(point.lat);
            max_lat = max_lat.max(point.lat);
        }
        (max_lon - min_lon, max_lat - min_lat)
    }

    /// Контур вырожден, если все точки лежат на одной прямой или совпадают
    ///
    /// Допуск на площадь пропорционален размеру контура и шагу сетки `f64` на его
    /// координатах: маленький, но настоящий треугольник вырожденным не считается.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let (width, height) = self.extent();
        let size = width.max(height);
        if size == 0.0 {
            return true;
        }
        let magnitude = self
            .points
            .iter()
            .map(|point| point.lon.abs().max(point.lat.abs()))
            .fold(0.0_f64, f64::max);
        let tolerance = f64::EPSILON * self.points.len() as f64 * (magnitude + size) * size;
        self.signed_area().abs() <= tolerance
    }
}

impl<'de> Deserialize<'de> for Ring {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let points = Vec::<Coordinate>::deserialize(deserializer)?;
        Ring::new(points).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Ring {
        Ring::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(2.0, 0.0),
            Coordinate::new(2.0, 2.0),
            Coordinate::new(0.0, 2.0),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_short_rings() {
        let err = Ring::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)]);
        assert!(matches!(err, Err(GeometryError::TooFewPoints { found: 2 })));
    }

    #[test]
    fn edges_close_the_loop() {
        let ring = square();
        let edges: Vec<_> = ring.edges().collect();
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[3], (Coordinate::new(0.0, 2.0), Coordinate::new(0.0, 0.0)));
    }

    #[test]
    fn signed_area_follows_orientation() {
        let ring = square();
        assert!((ring.signed_area() - 4.0).abs() < 1e-12);

        let mut points = ring.points().to_vec();
        points.reverse();
        let reversed = Ring::new(points).unwrap();
        assert!((reversed.signed_area() + 4.0).abs() < 1e-12);
    }

    #[test]
    fn collinear_ring_is_degenerate() {
        let ring = Ring::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
        ])
        .unwrap();
        assert!(ring.is_degenerate());
        assert!(!square().is_degenerate());
    }

    #[test]
    fn tiny_triangle_is_not_degenerate() {
        let ring = Ring::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1e-9, 0.0),
            Coordinate::new(0.0, 1e-9),
        ])
        .unwrap();
        assert!(ring.signed_area() > 0.0);
        assert!(!ring.is_degenerate());
    }

    #[test]
    fn degeneracy_does_not_depend_on_offset() {
        let far_collinear = Ring::new(vec![
            Coordinate::new(170.1, 80.1),
            Coordinate::new(170.2, 80.2),
            Coordinate::new(170.3, 80.3),
        ])
        .unwrap();
        assert!(far_collinear.is_degenerate());

        let far_small = Ring::new(vec![
            Coordinate::new(170.0, 80.0),
            Coordinate::new(170.000_001, 80.0),
            Coordinate::new(170.0, 80.000_001),
        ])
        .unwrap();
        assert!(!far_small.is_degenerate());
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let ring = Ring::new(vec![Coordinate::new(3.0, 4.0); 3]).unwrap();
        assert_eq!(ring.extent(), (0.0, 0.0));
        assert!(ring.is_degenerate());
    }

    #[test]
    fn deserialize_validates_length() {
        let ring: Result<Ring, _> = serde_json::from_str(r#"[{"lon":0,"lat":0}]"#);
        assert!(ring.is_err());
    }
}
