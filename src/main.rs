mod cli;

use reelforge::{
    assembly::{self, AssemblyService},
    config,
    state::{AssemblyEvent, StatusRegistry},
};
use reelforge_av::{FfmpegToolchain, MediaToolchain};
use reelforge_common::{AssemblyJob, JobId, JobStatus, ProjectId};
use reelforge_db::pool::{get_conn, init_pool, DbPool};
use reelforge_db::queries::assembly_jobs;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{AssembleOptions, Cli, Commands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelforge=trace,reelforge_av=trace,reelforge_db=debug,reelforge_common=debug".to_string()
        } else {
            "reelforge=info,reelforge_av=info,reelforge_db=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Assemble {
            project,
            segments,
            captions,
            options,
            json,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(assemble(
                cli.config.as_deref(),
                ProjectId::new(project),
                segments,
                captions,
                &options,
                json,
            ))
        }
        Commands::Segments { project } => list_segments(cli.config.as_deref(), &project),
        Commands::Status { job_id, json } => show_status(cli.config.as_deref(), &job_id, json),
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(cli.config.as_deref(), &file, json))
        }
        Commands::Prune { days } => prune(cli.config.as_deref(), days),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_db(config: &config::Config) -> Result<DbPool> {
    let db_path = config.storage.database_path.to_string_lossy();
    tracing::debug!("Opening database at {}", db_path);
    init_pool(&db_path).with_context(|| format!("Failed to open database {}", db_path))
}

async fn assemble(
    config_path: Option<&Path>,
    project: ProjectId,
    segments: Vec<PathBuf>,
    captions: Vec<String>,
    options: &AssembleOptions,
    json: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let segments = if segments.is_empty() {
        assembly::discover_segments(&config.storage.upload_dir, &project)?
    } else {
        segments
    };
    if segments.is_empty() {
        anyhow::bail!(
            "No segments found for project {} in {:?}",
            project,
            config.storage.upload_dir
        );
    }

    let captions: Vec<Option<String>> = captions
        .into_iter()
        .map(|c| if c.trim().is_empty() { None } else { Some(c) })
        .collect();

    let db = open_db(&config)?;
    let service = AssemblyService::from_config(&config, db)?;

    let mut events = service.subscribe();
    let follower = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let AssemblyEvent::JobProgress { progress, step, .. } = event {
                eprintln!("[{:>3}%] {}", progress, step);
            }
        }
    });

    println!("Assembling {} segment(s) for project {}", segments.len(), project);
    let id = service.start(project, segments, captions, options.to_request())?;
    let job = service.wait_for(id).await?;
    follower.abort();

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        print_job(&job);
    }

    if job.status == JobStatus::Failed {
        anyhow::bail!(
            "Assembly failed: {}",
            job.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn list_segments(config_path: Option<&Path>, project: &str) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let segments = assembly::discover_segments(&config.storage.upload_dir, &ProjectId::new(project))?;

    if segments.is_empty() {
        println!("No segments found for project {}", project);
        return Ok(());
    }
    for (i, path) in segments.iter().enumerate() {
        println!("  {}. {}", i + 1, path.display());
    }
    Ok(())
}

fn show_status(config_path: Option<&Path>, job_id: &str, json: bool) -> Result<()> {
    let id: JobId = job_id
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid job ID {}: {}", job_id, e))?;
    let config = config::load_config_or_default(config_path)?;
    let db = open_db(&config)?;
    let conn = get_conn(&db)?;
    let job = assembly_jobs::get_job(&conn, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        print_job(&job);
    }
    Ok(())
}

fn print_job(job: &AssemblyJob) {
    println!("Job: {}", job.id);
    println!("Project: {}", job.project_id);
    println!("Status: {} ({}%)", job.status, job.progress);
    println!("Segments: {}", job.input_segments.len());
    if let Some(ref path) = job.output_path {
        println!("Output: {}", path.display());
    }
    if let Some(ref meta) = job.metadata {
        println!(
            "Video: {}x{} {}, {:.1}s",
            meta.width,
            meta.height,
            meta.video_codec.as_deref().unwrap_or("unknown"),
            meta.duration_seconds
        );
    }
    if let Some(ref error) = job.error {
        println!("Error: {}", error);
    }
}

async fn probe_file(config_path: Option<&Path>, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    let config = config::load_config_or_default(config_path)?;
    let toolchain = FfmpegToolchain::discover(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    )?
    .with_timeout(config.tools.timeout());

    let meta = toolchain.probe_metadata(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        println!("File: {}", file.display());
        println!("Format: {}", meta.format_name);
        println!("Size: {} bytes", meta.size_bytes);
        let secs = meta.duration_seconds as u64;
        println!(
            "Duration: {:02}:{:02}:{:02} ({:.2}s)",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            meta.duration_seconds
        );
        print!(
            "Video: {} {}x{}",
            meta.video_codec.as_deref().unwrap_or("unknown"),
            meta.width,
            meta.height
        );
        if let Some(fps) = meta.frame_rate {
            print!(" @ {:.3} fps", fps);
        }
        println!();
        match meta.audio_codec {
            Some(ref codec) => println!("Audio: {}", codec),
            None => println!("Audio: none"),
        }
        if let Some(bit_rate) = meta.bit_rate {
            println!("Bit rate: {} kb/s", bit_rate / 1000);
        }
    }

    Ok(())
}

fn prune(config_path: Option<&Path>, days: Option<u32>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let days = days.unwrap_or(config.storage.retention_days);
    let registry = StatusRegistry::new(open_db(&config)?);
    let removed = registry.prune(days)?;
    println!("Removed {} finished job(s) older than {} days", removed, days);
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let tools = reelforge_av::check_tools(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    );
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable assembly.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            print_config_summary(&config);
        }
    }

    Ok(())
}

fn print_config_summary(config: &config::Config) {
    let defaults = config.defaults.resolve();
    println!("  Upload dir: {}", config.storage.upload_dir.display());
    println!("  Artifact dir: {}", config.storage.artifact_dir.display());
    println!("  Database: {}", config.storage.database_path.display());
    println!("  Retention: {} days", config.storage.retention_days);
    match config.tools.timeout_secs {
        Some(secs) => println!("  Tool timeout: {}s", secs),
        None => println!("  Tool timeout: none"),
    }
    println!(
        "  Transitions: {} ({}, {}s)",
        defaults.add_transitions, defaults.transition_type, defaults.transition_duration
    );
    println!(
        "  Captions: {} ({}, size {})",
        defaults.add_captions, defaults.caption_position, defaults.caption_font_size
    );
    println!("  Platform: {}", defaults.optimize_platform);
}
