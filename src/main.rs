use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use focus_guardian_lib::{
    default_data_dir,
    monitor::{MonitorEvent, MonitorSnapshot, StartOutcome},
    settings::{debug_enabled, AudioSettings, SettingsStore},
    utils::init_logging,
    AppState,
};

#[derive(Parser)]
#[command(name = "focus-guardian")]
#[command(about = "Camera-based homework focus monitor", long_about = None)]
struct Cli {
    #[arg(long, global = true, help = "Directory for settings and the state database")]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Keep quota and activation in memory only")]
    ephemeral: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor until Ctrl-C or the daily limit
    Run,

    /// Show today's usage and activation state
    Status {
        #[arg(long, help = "Print the snapshot as JSON")]
        json: bool,
    },

    Activate {
        #[arg(help = "Activation code")]
        code: String,
    },

    Audio {
        #[command(subcommand)]
        action: AudioAction,
    },
}

#[derive(Subcommand)]
enum AudioAction {
    Show,
    Enable,
    Disable,
    /// Play a recorded clip instead of speech for distracted/absent results
    Clip {
        path: Option<PathBuf>,
        #[arg(long, help = "Go back to speech")]
        off: bool,
    },
    Speech {
        #[arg(
            required_unless_present = "clear",
            help = "Text-to-speech program, e.g. espeak-ng"
        )]
        command: Option<String>,
        #[arg(long, conflicts_with = "command", help = "Log speech instead of running a program")]
        clear: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose || debug_enabled());

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let app = AppState::open(data_dir, cli.ephemeral).await?;

    match cli.command {
        Commands::Run => run(&app).await?,
        Commands::Status { json } => {
            let snapshot = app.monitor.snapshot().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_status(&snapshot);
            }
        }
        Commands::Activate { code } => {
            if app.monitor.activate(&code).await? {
                println!("Full version activated.");
            } else {
                println!("Invalid activation code.");
            }
        }
        Commands::Audio { action } => {
            let audio = audio(&app.settings, action)?;
            println!("{}", serde_json::to_string_pretty(&audio)?);
        }
    }

    Ok(())
}

async fn run(app: &AppState) -> Result<()> {
    let mut events = app.monitor.subscribe();

    if let StartOutcome::LimitReached(notice) = app.monitor.start().await? {
        println!("{}", notice.message);
        return Ok(());
    }
    println!("Monitoring started. Press Ctrl-C to stop.");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                app.monitor.shutdown().await;
                break;
            }
            event = events.recv() => match event {
                Ok(MonitorEvent::LimitReached { notice }) => {
                    println!("{}", notice.message);
                    break;
                }
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => log::warn!("dropped {skipped} monitor events"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    print_status(&app.monitor.snapshot().await);
    Ok(())
}

fn print_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::Classified { result, .. } => {
            println!("[{}] {}", result.status.as_str(), result.message);
        }
        MonitorEvent::AchievementUnlocked { achievement } => {
            println!("Badge unlocked: {} ({})", achievement.name, achievement.description);
        }
        MonitorEvent::UsageTick {
            remaining_seconds: Some(remaining),
            ..
        } if remaining % 60 == 0 => {
            println!("{} free minutes left today", remaining / 60);
        }
        _ => {}
    }
}

fn print_status(snapshot: &MonitorSnapshot) {
    let stats = &snapshot.stats;
    println!("Day:              {}", snapshot.quota.date_key);
    println!("Used today:       {}s", snapshot.quota.used_seconds);
    match snapshot.remaining_seconds {
        Some(remaining) => println!("Remaining:        {remaining}s"),
        None => println!("Remaining:        unlimited (activated)"),
    }
    println!("Total focus:      {}s", stats.total_focus_seconds);
    println!("Longest streak:   {}s", stats.longest_streak_seconds);
    println!("Distractions:     {}", stats.distraction_count);
    if !stats.unlocked_achievements.is_empty() {
        let names: Vec<_> = stats
            .unlocked_achievements
            .iter()
            .map(|id| id.details().name)
            .collect();
        println!("Badges:           {}", names.join(", "));
    }
}

/// `show` only reads; every other action writes the updated group back.
fn audio(settings: &SettingsStore, action: AudioAction) -> Result<AudioSettings> {
    let mut audio = settings.audio();
    if apply_audio_action(&mut audio, action) {
        settings.update_audio(audio.clone())?;
    }
    Ok(audio)
}

/// Returns whether the action modifies the settings.
fn apply_audio_action(audio: &mut AudioSettings, action: AudioAction) -> bool {
    match action {
        AudioAction::Show => return false,
        AudioAction::Enable => audio.enabled = true,
        AudioAction::Disable => audio.enabled = false,
        AudioAction::Clip { off: true, .. } => audio.use_custom_clip = false,
        AudioAction::Clip { path, off: false } => {
            if let Some(path) = path {
                audio.custom_clip_path = Some(path);
            }
            audio.use_custom_clip = audio.custom_clip_path.is_some();
        }
        AudioAction::Speech { clear: true, .. } => audio.speech_command = None,
        AudioAction::Speech { command, clear: false } => audio.speech_command = command,
    }
    true
}
