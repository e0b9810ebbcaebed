// src/error.rs
//! Типы ошибок
//!
//! Ошибки разделены по области действия:
//! - [`LoadError`] — структурная ошибка документа, прерывает загрузку целиком
//! - [`FeatureError`] — проблема отдельного объекта коллекции, объект пропускается
//! - [`GeometryError`] — вырожденная или некорректная геометрия провинции
//! - [`MapError`] — нарушение инвариантов карты
//! - [`ConfigError`] — ошибки чтения конфигурации

use std::path::PathBuf;

use thiserror::Error;

/// Структурная ошибка документа карты. Частично собранная карта не возвращается.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("корень документа должен быть объектом")]
    RootNotObject,

    #[error("тип корня документа должен быть \"FeatureCollection\"")]
    NotFeatureCollection,

    #[error("в документе нет поля \"features\"")]
    MissingFeatures,

    #[error("поле \"features\" должно быть массивом")]
    FeaturesNotArray,

    #[error(transparent)]
    Map(#[from] MapError),
}

/// Причина, по которой объект коллекции был пропущен при загрузке.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("тип объекта не \"Feature\"")]
    NotAFeature,

    #[error("нет объекта \"properties\"")]
    MissingProperties,

    #[error("нет строкового поля \"name\"")]
    MissingName,

    #[error("пустое имя провинции")]
    EmptyName,

    #[error("провинция \"{0}\" уже загружена")]
    DuplicateName(String),

    #[error("нет объекта \"geometry\"")]
    MissingGeometry,

    #[error("ожидалась геометрия {expected}, получено {found}")]
    GeometryTypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("нет массива \"coordinates\"")]
    MissingCoordinates,

    #[error("ни одного пригодного контура")]
    NoUsableRings,
}

/// Ошибки геометрии провинции и триангуляции.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("контур содержит {found} точек, нужно не меньше 3")]
    TooFewPoints { found: usize },

    #[error("у провинции нет ни одного контура")]
    NoRings,

    #[error("контур {ring} вырожден (нулевая площадь)")]
    DegenerateRing { ring: usize },

    #[error("ребро {edge} контура {ring} пересекает другой контур")]
    CrossingConstraint { ring: usize, edge: usize },

    #[error("не удалось восстановить ограничивающее ребро {start:?} - {end:?}")]
    ConstraintLost { start: [f64; 2], end: [f64; 2] },

    #[error("недопустимая координата: {0}")]
    InvalidCoordinate(#[from] spade::InsertionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("провинция \"{0}\" уже есть на карте")]
    DuplicateProvince(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("некорректный TOML в {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("недопустимые параметры: {0}")]
    Invalid(String),
}
