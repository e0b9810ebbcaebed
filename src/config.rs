// src/config.rs
//! Конфигурация загрузки карты и построения мешей провинций
//!
//! Этот модуль определяет параметры, которые раньше были зашиты константами:
//! - Радиус карты, присваиваемый при загрузке
//! - Критерии качества Delaunay refinement
//! - Число итераций релаксации Ллойда
//! - Делители нормализации координат
//! - Правило определения "внутренних" треугольников
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Радиус Земли в метрах (WGS84), используется по умолчанию.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Верхняя граница минимального угла, при которой refinement ещё гарантированно завершается.
pub const MAX_ANGLE_LIMIT_DEG: f64 = 34.0;

/// Правило, по которому треугольник считается лежащим внутри провинции
///
/// Контуры одной провинции не размечены как "внешний"/"дыра", поэтому правило задаётся явно.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum DomainRule {
    /// Треугольник внутри, если из внешней области до него нельзя дойти, не пересекая контур.
    /// Вложенный контур не вырезает дыру.
    #[default]
    Enclosed,
    /// Треугольник внутри при нечётном числе пересечений контуров (вложенные контуры — дыры).
    EvenOdd,
}

impl DomainRule {
    /// Решает, лежит ли грань внутри, по минимальному числу пересечённых контуров.
    ///
    /// # Примеры
    /// ```
    /// use geomap::config::DomainRule;
    /// assert!(DomainRule::Enclosed.is_in_domain(2));
    /// assert!(!DomainRule::EvenOdd.is_in_domain(2));
    /// assert!(!DomainRule::Enclosed.is_in_domain(0));
    /// ```
    #[must_use]
    pub fn is_in_domain(self, crossings: usize) -> bool {
        match self {
            DomainRule::Enclosed => crossings > 0,
            DomainRule::EvenOdd => crossings % 2 == 1,
        }
    }
}

/// Критерии качества Delaunay refinement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefinementCriteria {
    /// Минимальный допустимый угол треугольника в градусах.
    /// По умолчанию ≈20.7° (граница sin²θ = 0.125).
    #[serde(default = "default_min_angle_deg")]
    pub min_angle_deg: f64,

    /// Максимальная площадь треугольника в квадратных градусах (`None` = без ограничения)
    #[serde(default)]
    pub max_area: Option<f64>,

    /// Треугольники меньше этой площади не дробятся (`None` = без ограничения)
    #[serde(default)]
    pub min_area: Option<f64>,

    /// Сколько точек Штейнера можно добавить (`None` = 10× число исходных точек)
    #[serde(default)]
    pub max_additional_vertices: Option<usize>,
}

fn default_min_angle_deg() -> f64 {
    0.125_f64.sqrt().asin().to_degrees()
}

impl Default for RefinementCriteria {
    fn default() -> Self {
        Self {
            min_angle_deg: default_min_angle_deg(),
            max_area: None,
            min_area: None,
            max_additional_vertices: None,
        }
    }
}

/// Делители, переводящие градусы в нормализованную плоскость
///
/// Долгота [-180, 180] и широта [-85, 85] отображаются в [-1, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Normalization {
    #[serde(default = "default_lon_divisor")]
    pub lon_divisor: f64,

    #[serde(default = "default_lat_divisor")]
    pub lat_divisor: f64,
}

fn default_lon_divisor() -> f64 {
    180.0
}
fn default_lat_divisor() -> f64 {
    85.0
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            lon_divisor: 180.0,
            lat_divisor: 85.0,
        }
    }
}

/// Параметры построения меша провинции
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshSettings {
    #[serde(default)]
    pub refinement: RefinementCriteria,

    /// Число итераций релаксации Ллойда (0 = без релаксации)
    #[serde(default = "default_relaxation_iterations")]
    pub relaxation_iterations: usize,

    #[serde(default)]
    pub normalization: Normalization,

    #[serde(default)]
    pub domain_rule: DomainRule,
}

fn default_relaxation_iterations() -> usize {
    10
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            refinement: RefinementCriteria::default(),
            relaxation_iterations: 10,
            normalization: Normalization::default(),
            domain_rule: DomainRule::Enclosed,
        }
    }
}

impl MeshSettings {
    /// Проверяет, что параметры допустимы для триангуляции.
    ///
    /// # Ошибки
    /// - угол вне (0, 34]: при больших значениях refinement может не завершиться
    /// - нулевые, отрицательные или нечисловые делители нормализации
    /// - неположительные ограничения площади
    pub fn validate(&self) -> Result<(), ConfigError> {
        let angle = self.refinement.min_angle_deg;
        if !(angle > 0.0 && angle <= MAX_ANGLE_LIMIT_DEG) {
            return Err(ConfigError::Invalid(format!(
                "min_angle_deg = {angle}, допустимо (0, {MAX_ANGLE_LIMIT_DEG}]"
            )));
        }

        let Normalization {
            lon_divisor,
            lat_divisor,
        } = self.normalization;
        if !(lon_divisor.is_finite() && lon_divisor > 0.0)
            || !(lat_divisor.is_finite() && lat_divisor > 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "делители нормализации должны быть положительными: {lon_divisor}, {lat_divisor}"
            )));
        }

        for (name, area) in [
            ("max_area", self.refinement.max_area),
            ("min_area", self.refinement.min_area),
        ] {
            if let Some(area) = area
                && !(area.is_finite() && area > 0.0)
            {
                return Err(ConfigError::Invalid(format!("{name} = {area}")));
            }
        }

        Ok(())
    }
}

/// Параметры загрузки карты
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoaderSettings {
    /// Радиус планеты; формат документа его не содержит
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_radius() -> f64 {
    EARTH_RADIUS
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            radius: EARTH_RADIUS,
        }
    }
}

/// Полная конфигурация: загрузка + построение мешей
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MapConfig {
    #[serde(default)]
    pub loader: LoaderSettings,

    #[serde(default)]
    pub mesh: MeshSettings,
}

impl MapConfig {
    /// Загружает конфигурацию из TOML-файла и проверяет её
    ///
    /// # Пример
    /// ```toml
    /// # geomap.toml
    /// [loader]
    /// radius = 6378137.0
    ///
    /// [mesh]
    /// relaxation_iterations = 5
    /// domain_rule = "EvenOdd"
    ///
    /// [mesh.refinement]
    /// min_angle_deg = 25.0
    /// max_area = 4.0
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.mesh.validate()?;
        Ok(config)
    }
}
