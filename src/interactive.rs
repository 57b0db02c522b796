use crate::config::Config;
use crate::pipeline::PipelineConfig;
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::fs;
use std::path::{Path, PathBuf};

const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "m4v"];

pub fn run_interactive_wizard(config: &Config) -> anyhow::Result<PipelineConfig> {
    print_header();

    // Step 1: Select source video
    let input = select_source_file()?;

    // Step 2: Number of parts
    let parts: i64 = Input::new()
        .with_prompt("Number of parts")
        .default(2)
        .validate_with(|n: &i64| {
            if *n >= 1 {
                Ok(())
            } else {
                Err("Enter a positive whole number")
            }
        })
        .interact_text()?;

    // Step 3: Loudness threshold
    let threshold_db: f64 = Input::new()
        .with_prompt("Quiet threshold in dB")
        .default(config.threshold_db)
        .validate_with(|t: &f64| {
            if t.is_finite() {
                Ok(())
            } else {
                Err("Enter a number such as -35")
            }
        })
        .interact_text()?;

    // Step 4: File name prefix
    let prefix: String = Input::new()
        .with_prompt("Output file name prefix")
        .default(default_prefix(&input))
        .validate_with(|p: &String| {
            if p.trim().is_empty() {
                Err("Prefix must not be empty")
            } else if p.contains(['/', '\\']) {
                Err("Prefix must not contain path separators")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    let prefix = prefix.trim().to_string();

    // Step 5: Output folder
    let output_folder: String = Input::new()
        .with_prompt("Output folder")
        .default(default_output_folder(&input).display().to_string())
        .interact_text()?;
    let output_folder = PathBuf::from(output_folder.trim());

    print_summary(&input, &output_folder, parts, threshold_db, &prefix);

    if !Confirm::new()
        .with_prompt("Proceed with these settings?")
        .default(true)
        .interact()?
    {
        anyhow::bail!("Cancelled by user");
    }

    if threshold_db != config.threshold_db
        && Confirm::new()
            .with_prompt("Save this threshold as the default?")
            .default(false)
            .interact()?
    {
        let updated = Config {
            threshold_db,
            ..config.clone()
        };
        let path = updated.save()?;
        println!("{} Saved to {}\n", style("✓").green(), path.display());
    }

    println!();

    Ok(PipelineConfig {
        input,
        output_folder,
        parts,
        threshold_db,
        prefix,
        window: config.window(),
        concurrency: config.concurrency,
        shortfall: config.shortfall,
        dry_run: false,
        show_progress: true,
    })
}

fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║       silencesplit - split video at silences      ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

fn select_source_file() -> anyhow::Result<PathBuf> {
    println!("{}", style("Select source video:").bold());

    let files = scan_media_files(Path::new("."))?;

    if files.is_empty() {
        println!("  No video files found in current directory.\n");
        return prompt_path();
    }

    let mut items: Vec<String> = files
        .iter()
        .map(|f| {
            let size = fs::metadata(f)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "?".to_string());
            format!("{} ({})", f.display(), size)
        })
        .collect();
    items.push("Enter custom path...".to_string());

    let selection = Select::new()
        .with_prompt("Choose a file")
        .items(&items)
        .default(0)
        .interact()?;

    if selection == files.len() {
        prompt_path()
    } else {
        Ok(files[selection].clone())
    }
}

fn prompt_path() -> anyhow::Result<PathBuf> {
    let path: String = Input::new()
        .with_prompt("Enter file path")
        .interact_text()?;
    let path = PathBuf::from(path.trim());
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(path)
}

fn scan_media_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn default_prefix(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "part".to_string())
}

fn default_output_folder(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn print_summary(input: &Path, output_folder: &Path, parts: i64, threshold_db: f64, prefix: &str) {
    println!("\n{}", style("═══ Summary ═══").bold());
    println!("  Input:     {}", style(input.display()).cyan());
    println!("  Output:    {}", style(output_folder.display()).cyan());
    println!("  Parts:     {}", parts);
    println!("  Threshold: {} dB", threshold_db);
    println!(
        "  Files:     {} … {}",
        crate::split::output_name(prefix, 1),
        crate::split::output_name(prefix, parts.max(1) as usize)
    );
    println!();
}
