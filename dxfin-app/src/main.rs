use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dxfin_config::{AppConfig, ConfigError};
use dxfin_core::drawing::{Drawing, ImportSummary};
use dxfin_engine::diagnostics::Diagnostic;
use dxfin_engine::{ImportOutcome, import_file};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod cli;

use cli::Cli;

#[derive(Serialize)]
struct JsonReport<'a> {
    drawing: &'a Drawing,
    summary: ImportSummary,
    diagnostics: &'a [Diagnostic],
}

fn main() {
    let cli = Cli::parse();
    let config = load_configuration(cli.config.clone());
    init_logging(&config);

    if let Err(err) = run(&cli, &config) {
        error!(error = %err, "导入失败");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let settings = cli.settings(&config.import);
    info!(
        path = %settings.file_path.display(),
        drawing = %settings.drawing_name,
        "开始导入"
    );
    let outcome = import_file(&settings)?;

    if cli.json {
        let report = JsonReport {
            drawing: &outcome.drawing,
            summary: outcome.summary(),
            diagnostics: &outcome.diagnostics,
        };
        let json = serde_json::to_string_pretty(&report).context("无法序列化导入结果")?;
        println!("{json}");
    } else {
        print_report(&outcome);
    }
    Ok(())
}

fn print_report(outcome: &ImportOutcome) {
    let drawing = &outcome.drawing;
    let unit = drawing.unit();
    println!("Drawing:\t{}", drawing.name());
    println!(
        "Unit:\t\t{} (x{} to {})",
        unit.source.unit(),
        unit.factor,
        unit.host_unit
    );
    println!("{}", outcome.summary());
    for layer in drawing.layers() {
        println!("  {} ({} entities)", layer.name, layer.entities.len());
    }
    if !outcome.diagnostics.is_empty() {
        println!("Diagnostics:");
        for diagnostic in &outcome.diagnostics {
            println!("  - {diagnostic}");
        }
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
