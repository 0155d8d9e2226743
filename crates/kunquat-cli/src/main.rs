//! `kunquat-player`: the command-line player, grounded in
//! `sonido-cli::main`'s `clap::Parser` + `tracing-subscriber` shape, but a
//! single flat arg set rather than a subcommand tree — the player has one
//! flag surface, not a command family.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use kunquat_cli::demo;
use kunquat_cli::Engine;
use kunquat_event::Bind;

const MIN_BUFFER_SIZE: u32 = 64;
const MAX_BUFFER_SIZE: u32 = 262_144;
const MIN_FREQUENCY: u32 = 1_000;
const MAX_FREQUENCY: u32 = 384_000;
const CHANNEL_COUNT: u32 = 16;

/// Command-line flags for the player.
#[derive(Parser)]
#[command(name = "kunquat-player")]
#[command(author, version, about = "Kunquat command-line player", long_about = None)]
struct Args {
    /// Project directory to load (composition/connections/bind JSON).
    path: Option<PathBuf>,

    /// Audio driver selection. Real backends (PulseAudio, JACK, ...) are an
    /// external collaborator this workspace doesn't implement; this
    /// validates the name and reports it on the status line without
    /// opening a device.
    #[arg(short = 'd', long = "driver", default_value = "null")]
    driver: String,

    /// Mixing buffer size in frames, `[64, 262144]`.
    #[arg(long = "buffer-size", default_value_t = 2048)]
    buffer_size: u32,

    /// Output sample rate in Hz, `[1000, 384000]`.
    #[arg(long = "frequency", default_value_t = 48_000)]
    frequency: u32,

    /// Subsong to play: an index, or `all` for every subsong in sequence.
    #[arg(short = 's', long = "subsong", default_value = "all")]
    subsong: String,

    /// Suppress the status line.
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Render the status line with ASCII only.
    #[arg(long = "disable-unicode")]
    disable_unicode: bool,
}

fn main() -> ExitCode {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("kunquat-player: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    validate_range("--buffer-size", args.buffer_size, MIN_BUFFER_SIZE, MAX_BUFFER_SIZE)?;
    validate_range("--frequency", args.frequency, MIN_FREQUENCY, MAX_FREQUENCY)?;
    let subsong = parse_subsong(&args.subsong)?;

    tracing::debug!(driver = %args.driver, buffer_size = args.buffer_size, frequency = args.frequency, "starting playback");

    let bind = match &args.path {
        Some(path) => kunquat_config::Project::load(path)?.bind,
        None => Bind::new(Vec::new())?,
    };

    let mut engine = Engine::new(
        CHANNEL_COUNT,
        f64::from(args.frequency),
        120.0,
        bind,
        demo::demo_sample(),
    )?;
    engine.set_sections(demo::demo_sections(CHANNEL_COUNT as usize));
    engine.set_position(subsong.unwrap_or(0), 0)?;

    let mut frame = 0u64;
    while engine.is_playing() {
        let produced = engine.mix(args.buffer_size as usize);
        if produced == 0 {
            break;
        }
        frame += produced as u64;
        if !args.quiet {
            print_status_line(frame, args.frequency, args.disable_unicode);
        }
    }
    if !args.quiet {
        println!();
    }

    Ok(())
}

fn validate_range(flag: &str, value: u32, min: u32, max: u32) -> anyhow::Result<()> {
    if value < min || value > max {
        anyhow::bail!("{flag} must be in [{min}, {max}], got {value}");
    }
    Ok(())
}

/// Parses `-s`: an index, or the literal `all` meaning "play every
/// subsong", represented here as `None` (the demo sequence has exactly
/// one song, so "all" and subsong 0 are equivalent for this binary).
fn parse_subsong(spec: &str) -> anyhow::Result<Option<i16>> {
    if spec == "all" {
        return Ok(None);
    }
    spec.parse::<i16>()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("-s/--subsong must be an index or \"all\", got {spec:?}"))
}

fn print_status_line(frame: u64, rate: u32, ascii_only: bool) {
    let seconds = frame as f64 / f64::from(rate);
    let sep = if ascii_only { "|" } else { "\u{2502}" };
    print!("\r{seconds:7.2}s {sep} frame {frame}");
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_subsong_accepts_all() {
        assert_eq!(parse_subsong("all").unwrap(), None);
    }

    #[test]
    fn parse_subsong_accepts_index() {
        assert_eq!(parse_subsong("2").unwrap(), Some(2));
    }

    #[test]
    fn parse_subsong_rejects_garbage() {
        assert!(parse_subsong("nope").is_err());
    }

    #[test]
    fn validate_range_rejects_out_of_range_buffer_size() {
        assert!(validate_range("--buffer-size", 10, MIN_BUFFER_SIZE, MAX_BUFFER_SIZE).is_err());
        assert!(validate_range("--buffer-size", 2048, MIN_BUFFER_SIZE, MAX_BUFFER_SIZE).is_ok());
    }
}
