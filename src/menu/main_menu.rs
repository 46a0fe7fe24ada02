use crate::component::chunked_resize::Experiment;
use crate::config::types::{Config, PipelineSettings};
use crate::config::{SETTINGS_FILENAME, save_settings};
use crate::menu::handlers::run_experiment;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

const EXPERIMENTS: [Experiment; 6] = [
    Experiment::WholeFile,
    Experiment::ParallelChunks,
    Experiment::SequentialEstimate,
    Experiment::Resume,
    Experiment::SeekSplit,
    Experiment::ParallelSeekSplit,
];

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style("=== 分塊縮放實驗 ===").cyan().bold());
    println!("{}", style("按 ESC 離開").dim());

    let mut options: Vec<String> = EXPERIMENTS.iter().map(ToString::to_string).collect();
    options.push("設定".to_string());
    options.push("離開".to_string());

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("請選擇功能")
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(i) if i < EXPERIMENTS.len() => {
            run_experiment(term, shutdown_signal, config, EXPERIMENTS[i])?;
            Ok(true)
        }
        Some(i) if i == EXPERIMENTS.len() => {
            show_settings_menu(term, config)?;
            Ok(true)
        }
        _ => Ok(false), // 離開或 ESC
    }
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style("=== 設定 ===").cyan().bold());
    print_settings(&config.settings);
    println!();

    let current = &config.settings;
    let target_height: u32 = Input::new()
        .with_prompt("目標高度")
        .default(current.target_height)
        .interact_text()?;
    let aspect_ratio: f64 = Input::new()
        .with_prompt("寬高比")
        .default(current.aspect_ratio)
        .interact_text()?;
    let num_chunks: usize = Input::new()
        .with_prompt("區塊數量")
        .default(current.num_chunks)
        .interact_text()?;
    let concurrency: usize = Input::new()
        .with_prompt("平行數量")
        .default(current.concurrency)
        .interact_text()?;
    let ffmpeg_path: String = Input::new()
        .with_prompt("ffmpeg 路徑")
        .default(current.ffmpeg_path.to_string_lossy().to_string())
        .interact_text()?;
    let ffprobe_path: String = Input::new()
        .with_prompt("ffprobe 路徑")
        .default(current.ffprobe_path.to_string_lossy().to_string())
        .interact_text()?;

    let updated = PipelineSettings {
        target_height,
        aspect_ratio,
        num_chunks,
        concurrency,
        ffmpeg_path: PathBuf::from(ffmpeg_path.trim()),
        ffprobe_path: PathBuf::from(ffprobe_path.trim()),
    };

    if let Err(e) = updated.validate() {
        println!("\n{} {}", style("設定無效，未儲存:").red(), e);
        std::thread::sleep(std::time::Duration::from_secs(2));
        return Ok(());
    }

    if updated != config.settings {
        save_settings(&updated, Path::new(SETTINGS_FILENAME))?;
        config.settings = updated;
        println!("\n{}", style("設定已儲存").green());
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

fn print_settings(settings: &PipelineSettings) {
    println!("  目標高度: {}", settings.target_height);
    println!("  寬高比: {:.4}", settings.aspect_ratio);
    println!("  區塊數量: {}", settings.num_chunks);
    println!("  平行數量: {}", settings.concurrency);
    println!("  ffmpeg: {}", settings.ffmpeg_path.display());
    println!("  ffprobe: {}", settings.ffprobe_path.display());
}
