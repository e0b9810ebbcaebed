// src/bin/cli.rs
use clap::Parser;
use geomap::province::png::MeshPreview;
use geomap::{MapConfig, load_map_with};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Загрузка карты провинций и построение их мешей
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к GeoJSON-файлу с провинциями (FeatureCollection)
    #[arg(short, long)]
    map: PathBuf,

    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Куда сохранить вершины мешей в JSON: { "id": [x, y, z, ...] }
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Куда сохранить PNG-превью мешей
    #[arg(short, long)]
    preview: Option<PathBuf>,

    /// Ширина превью в пикселях
    #[arg(short, long, default_value_t = 2048)]
    width: u32,

    /// Подробный лог
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("загрузка конфигурации из {}", path.display());
            MapConfig::from_toml_file(path)?
        }
        None => MapConfig::default(),
    };

    tracing::info!("чтение карты из {}", cli.map.display());
    let text = std::fs::read_to_string(&cli.map)
        .map_err(|err| format!("не удалось прочитать {}: {err}", cli.map.display()))?;
    let document: serde_json::Value = serde_json::from_str(&text)
        .map_err(|err| format!("некорректный JSON в {}: {err}", cli.map.display()))?;

    let (map, report) = load_map_with(&document, &config.loader)?;
    for skipped in &report.skipped {
        tracing::debug!(
            index = skipped.index,
            name = skipped.name.as_deref(),
            "пропущен: {}",
            skipped.reason
        );
    }

    let results = map.triangulate_all(&config.mesh);
    let failed = results.iter().filter(|(_, mesh)| mesh.is_err()).count();
    let triangles: usize = results
        .iter()
        .filter_map(|(_, mesh)| mesh.as_ref().ok())
        .map(|mesh| mesh.triangle_count())
        .sum();
    tracing::info!(
        provinces = results.len(),
        failed,
        triangles,
        "триангуляция завершена"
    );

    if let Some(path) = &cli.output {
        let dump: BTreeMap<&str, &[f32]> = results
            .iter()
            .filter_map(|(id, mesh)| Some((id.as_str(), mesh.as_ref().ok()?.vertices.as_slice())))
            .collect();
        let json = serde_json::to_string(&dump)?;
        std::fs::write(path, json)
            .map_err(|err| format!("не удалось записать {}: {err}", path.display()))?;
        tracing::info!("вершины сохранены в {}", path.display());
    }

    if let Some(path) = &cli.preview {
        let mut preview = MeshPreview::new(cli.width, config.mesh.normalization);
        preview.draw_all(&results);
        preview.save_as_png(path)?;
        tracing::info!(
            "превью {}×{} сохранено в {}",
            preview.width(),
            preview.height(),
            path.display()
        );
    }

    Ok(())
}
