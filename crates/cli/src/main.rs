//! apkforge command-line frontend.
//!
//! Loads `apkforge.toml` from the working directory, applies per-command
//! flag overrides, and drives a single pipeline run while rendering the
//! engine's event stream. Ctrl-C cancels the active run (kill-tree)
//! instead of leaving orphaned tool processes behind.

mod render;

use std::path::{Path, PathBuf};

use af_core::config::load_config;
use af_core::parser::icon::{resolve_icon, PlayStoreWebSource};
use af_core::{MetadataReader, RunManager, Toolchain};
use af_protocol::ipc::Event;
use af_protocol::run_models::{Operation, RunStatus};
use af_protocol::RunConfig;
use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "apkforge", version, about = "APK decode/build pipeline frontend")]
struct Cli {
    /// Directory containing apkforge.toml (defaults to the working dir).
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode an APK into an editable project directory.
    Decode {
        apk: PathBuf,
        /// Overwrite an existing project directory.
        #[arg(short, long)]
        force: bool,
        /// Run the post-decode fix-up pass.
        #[arg(long)]
        fix_errors: bool,
        /// Clear the framework resource cache first.
        #[arg(long)]
        clear_framework: bool,
        /// Decode with APKEditor instead of apktool.
        #[arg(long)]
        apkeditor: bool,
        /// Destination project directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a project directory back into an APK.
    Build {
        project: PathBuf,
        /// Zipalign the result.
        #[arg(long)]
        align: bool,
        /// Sign the result.
        #[arg(long)]
        sign: bool,
        /// Keep an unsigned convenience copy as well.
        #[arg(long)]
        unsigned: bool,
        /// Install to the configured device after signing.
        #[arg(long)]
        install: bool,
        /// Destination directory for the compiled APK.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge a split bundle (.apks/.xapk/.apkm) into a single APK.
    Merge { bundle: PathBuf },

    /// Merge a split bundle, then decode the merged APK.
    MergeDecode { bundle: PathBuf },

    /// Align an APK (or verify alignment with --check).
    Align {
        apk: PathBuf,
        /// Verify only, do not rewrite.
        #[arg(long)]
        check: bool,
        /// Write `<name>_aligned.apk` instead of replacing the input.
        #[arg(long)]
        keep_input: bool,
    },

    /// Sign an APK with the configured keystore.
    Sign {
        apk: PathBuf,
        /// Install to the configured device afterwards.
        #[arg(long)]
        install: bool,
        /// Write `<name>_signed.apk` instead of replacing the input.
        #[arg(long)]
        keep_input: bool,
    },

    /// Install an APK to a device.
    Install {
        apk: PathBuf,
        /// Target device serial (overrides the configured one).
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Show an APK's badging metadata.
    Info {
        apk: PathBuf,
        /// Emit the full record as JSON.
        #[arg(long)]
        json: bool,
        /// Also extract the launcher icon to this path.
        #[arg(long)]
        icon: Option<PathBuf>,
    },

    /// Clear the decoder's framework resource cache.
    ClearFramework,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app_config = load_config(&cli.config_dir)?;
    let toolchain = Toolchain::resolve(&app_config.toolchain);
    let mut run_config = app_config.run;

    let (operation, input) = match cli.command {
        Command::Decode {
            apk,
            force,
            fix_errors,
            clear_framework,
            apkeditor,
            output,
        } => {
            run_config.decode.force_overwrite |= force;
            run_config.decode.fix_errors |= fix_errors;
            run_config.decode.clear_framework_first |= clear_framework;
            run_config.use_apkeditor |= apkeditor;
            if output.is_some() {
                run_config.decode.output_dir = output;
            }
            (Operation::Decode, apk)
        }
        Command::Build {
            project,
            align,
            sign,
            unsigned,
            install,
            output,
        } => {
            run_config.build.zipalign_after_build |= align;
            run_config.build.sign_after_build |= sign;
            run_config.build.create_unsigned_apk |= unsigned;
            run_config.sign.install_after_sign |= install;
            if output.is_some() {
                run_config.build.output_dir = output;
            }
            (Operation::Build, project)
        }
        Command::Merge { bundle } => (Operation::Merge, bundle),
        Command::MergeDecode { bundle } => (Operation::MergeAndDecode, bundle),
        Command::Align {
            apk,
            check,
            keep_input,
        } => {
            run_config.zipalign.check_only |= check;
            if keep_input {
                run_config.zipalign.overwrite_output = false;
            }
            (Operation::Zipalign, apk)
        }
        Command::Sign {
            apk,
            install,
            keep_input,
        } => {
            run_config.sign.install_after_sign |= install;
            if keep_input {
                run_config.sign.overwrite_input = false;
            }
            (Operation::Sign, apk)
        }
        Command::Install { apk, device } => {
            if device.is_some() {
                run_config.adb.device_serial = device;
            }
            (Operation::Install, apk)
        }
        Command::Info { apk, json, icon } => {
            return show_info(&toolchain, &apk, json, icon.as_deref()).await;
        }
        Command::ClearFramework => (Operation::ClearFramework, PathBuf::new()),
    };

    drive_run(toolchain, operation, input, run_config).await
}

/// Start one run, render its events, and map the terminal status to the
/// process exit.
async fn drive_run(
    toolchain: Toolchain,
    operation: Operation,
    input: PathBuf,
    config: RunConfig,
) -> color_eyre::Result<()> {
    let (events_tx, mut events_rx) = mpsc::channel(1024);
    let manager = RunManager::new(toolchain, events_tx);
    let run_id = manager.start_run(operation, input, config).await;

    let final_status = loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Some(event) => {
                        render::print_event(&event);
                        if let Event::RunFinished { run_id: id, status, .. } = event {
                            if id == run_id {
                                break status;
                            }
                        }
                    }
                    None => break RunStatus::Failed,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                tracing::info!("cancelling run");
                manager.cancel(run_id).await;
            }
        }
    };
    manager.shutdown().await;

    match final_status {
        RunStatus::Succeeded => Ok(()),
        RunStatus::Cancelled => Err(eyre!("run cancelled")),
        _ => Err(eyre!("run failed")),
    }
}

/// Extract and print badging metadata, optionally with the icon.
async fn show_info(
    toolchain: &Toolchain,
    apk: &Path,
    json: bool,
    icon_dest: Option<&Path>,
) -> color_eyre::Result<()> {
    let reader = MetadataReader::new(toolchain);
    let metadata = reader.read(apk).await?;

    if let Some(dest) = icon_dest {
        let web = PlayStoreWebSource::default();
        match resolve_icon(apk, &metadata, dest, &web).await {
            Some(path) => println!("icon written to {}", path.display()),
            None => eprintln!("no launcher icon could be extracted"),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        render::print_metadata(&metadata);
    }
    Ok(())
}
