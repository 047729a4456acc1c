//! Colored terminal rendering of engine events and metadata records.

use af_protocol::ipc::Event;
use af_protocol::metadata_models::ApkMetadata;
use af_protocol::run_models::RunStatus;
use af_protocol::tool_models::StreamSource;
use colored::Colorize;

/// Render one engine event to stdout/stderr.
pub fn print_event(event: &Event) {
    match event {
        Event::RunStarted { operation, .. } => {
            println!("{} {}", "==>".bold().blue(), operation.bold());
        }
        Event::RunStatusUpdate { .. } => {}
        Event::StageStarted { stage, .. } => {
            println!("{} {}", "-->".cyan(), stage.name().cyan());
        }
        Event::StageFinished { result, .. } => {
            if !result.succeeded() {
                println!(
                    "{} {} exited with code {}",
                    "!!".red().bold(),
                    result.stage.name(),
                    result.exit_code
                );
            }
        }
        Event::ToolOutput { source, line, .. } => match source {
            StreamSource::Stdout => println!("{line}"),
            StreamSource::Stderr => eprintln!("{}", line.yellow()),
        },
        Event::RunLog { message, .. } => {
            println!("{}", message.dimmed());
        }
        Event::RunFinished {
            status, message, ..
        } => match status {
            RunStatus::Succeeded => println!("{}", "done".green().bold()),
            RunStatus::Cancelled => println!("{}", "cancelled".yellow().bold()),
            _ => {
                if !message.is_empty() {
                    eprintln!("{}", message.red());
                }
                println!("{}", "failed".red().bold());
            }
        },
    }
}

/// Human-readable metadata listing, one field per line.
pub fn print_metadata(metadata: &ApkMetadata) {
    let field = |label: &str, value: &str| {
        if !value.is_empty() {
            println!("{:<18} {}", label.bold(), value);
        }
    };
    field("App name:", &metadata.app_name);
    field("Package:", &metadata.package_name);
    field("Version:", &metadata.version_name);
    field("Version code:", &metadata.version_code);
    field("Min SDK:", &metadata.min_sdk_version_detailed);
    field("Target SDK:", &metadata.target_sdk_version_detailed);
    field("Main activity:", &metadata.launchable_activity);
    field("Screens:", &metadata.screens);
    field("Densities:", &metadata.densities);
    field("Locales:", &metadata.locales);
    field("Native code:", &metadata.native_code);

    if !metadata.permissions.is_empty() {
        println!("{}", "Permissions:".bold());
        for permission in &metadata.permissions {
            println!("  {permission}");
        }
    }

    if !metadata.package_name.is_empty() {
        println!("{}", "Store links:".bold());
        println!("  {}", metadata.links.play_store);
        println!("  {}", metadata.links.apk_combo);
        println!("  {}", metadata.links.apk_pure);
        println!("  {}", metadata.links.apk_mirror);
    }
}
