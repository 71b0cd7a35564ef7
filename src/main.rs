//! sound-effect CLI: play note text as square waves or turn it into firmware code.

use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sound_effect::render::{render_wav, write_wav};
use sound_effect::scheduler::schedule_playback_with;
use sound_effect::speaker::Speaker;
use sound_effect::{
    format_notes_with, parse, plan, presets, CollectingSink, Config, ManualTimer, Note,
    SoundError, Synthesizer,
};

/// Extra wait after the last note so the output device can flush.
#[cfg(feature = "audio-out")]
const PLAYBACK_TAIL: std::time::Duration = std::time::Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "sound-effect")]
#[command(about = "Play note text as square waves or convert it to speaker::enqueue_note calls", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log scheduling and parsing details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Note text file (`-` or omitted reads stdin)
    file: Option<PathBuf>,

    /// Use a built-in sound effect instead of a file (hit, tulip)
    #[arg(short, long, conflicts_with = "file")]
    preset: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the notes through the default output device
    Play {
        #[command(flatten)]
        input: Input,

        /// Print the schedule and synthesize on a virtual clock instead of playing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print speaker::enqueue_note statements for the notes
    Convert {
        #[command(flatten)]
        input: Input,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the parsed notes as JSON
    Parse {
        #[command(flatten)]
        input: Input,
    },
    /// Render the notes to a WAV file
    Render {
        #[command(flatten)]
        input: Input,

        /// Output WAV file path
        #[arg(short, long)]
        output: PathBuf,

        /// Sample rate in Hz (overrides the config)
        #[arg(short, long)]
        sample_rate: Option<u32>,
    },
    /// Render the notes as the firmware speaker driver would play them
    Speaker {
        #[command(flatten)]
        input: Input,

        /// Output WAV file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), SoundError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Play { input, dry_run } => {
            let notes = read_notes(&input)?;
            let synth = Synthesizer::new(config.synth.clone());
            if dry_run {
                dry_run_playback(&notes, &synth);
                Ok(())
            } else {
                play_on_device(&notes, &synth)
            }
        }
        Commands::Convert { input, output } => {
            let notes = read_notes(&input)?;
            if notes.len() > config.speaker.queue_capacity {
                warn!(
                    notes = notes.len(),
                    capacity = config.speaker.queue_capacity,
                    "more notes than the speaker queue holds; enqueue_note will drop the rest"
                );
            }
            let code = format_notes_with(&notes, &config.format);
            match output {
                Some(path) => {
                    std::fs::write(&path, &code)?;
                    eprintln!("Wrote {} statements to {}", notes.len(), path.display());
                }
                None => print!("{}", code),
            }
            Ok(())
        }
        Commands::Parse { input } => {
            let notes = read_notes(&input)?;
            println!("{}", serde_json::to_string_pretty(&notes)?);
            Ok(())
        }
        Commands::Render {
            input,
            output,
            sample_rate,
        } => {
            let notes = read_notes(&input)?;
            let synth = Synthesizer::new(config.synth.clone());
            let rate = sample_rate.unwrap_or(config.render.sample_rate);
            if rate == 0 {
                return Err(SoundError::Config("sample rate must be positive".to_string()));
            }
            render_wav(&notes, &synth, rate, &output)?;
            eprintln!("Wrote {}", output.display());
            Ok(())
        }
        Commands::Speaker { input, output } => {
            let notes = read_notes(&input)?;
            let mut speaker = Speaker::new(config.speaker.queue_capacity);
            let accepted = speaker.enqueue_notes(&notes);
            let trace = speaker.drain();
            let samples = trace.render(config.speaker.sample_rate, config.speaker.amplitude)?;
            write_wav(&output, &samples, config.speaker.sample_rate)?;
            info!(accepted, toggles = trace.toggles.len(), end_us = trace.end_us, "speaker trace");
            eprintln!("Wrote {}", output.display());
            Ok(())
        }
    }
}

fn read_notes(input: &Input) -> Result<Vec<Note>, SoundError> {
    let text = match (&input.preset, &input.file) {
        (Some(name), _) => presets::preset(name)?.to_string(),
        (None, Some(path)) if path != Path::new("-") => std::fs::read_to_string(path)?,
        (None, _) => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    Ok(parse(&text)?)
}

fn dry_run_playback(notes: &[Note], synth: &Synthesizer) {
    let timer = ManualTimer::new();
    let sink = CollectingSink::new();
    let playback = schedule_playback_with(notes, &timer, synth, Arc::new(sink.clone()));

    for entry in plan(notes) {
        println!(
            "{:>9.3}s  {:<4} {}s",
            entry.offset, entry.tone, entry.duration
        );
    }

    timer.run_all();
    let samples: usize = sink.buffers().iter().map(|b| b.samples.len()).sum();
    info!(tasks = playback.len(), buffers = sink.len(), samples, "dry run complete");
    println!("total {:.3}s", playback.length().as_secs_f64());
}

#[cfg(feature = "audio-out")]
fn play_on_device(notes: &[Note], synth: &Synthesizer) -> Result<(), SoundError> {
    use sound_effect::audio::DeviceOutput;
    use sound_effect::TokioTimer;

    let output = DeviceOutput::open_default()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let playback = schedule_playback_with(
            notes,
            &TokioTimer::current(),
            synth,
            Arc::new(output.mixer()),
        );
        info!(tasks = playback.len(), length = ?playback.length(), "playing");
        tokio::time::sleep(playback.length().saturating_add(PLAYBACK_TAIL)).await;
    });

    Ok(())
}

#[cfg(not(feature = "audio-out"))]
fn play_on_device(_notes: &[Note], _synth: &Synthesizer) -> Result<(), SoundError> {
    Err(SoundError::Audio(
        "built without the `audio-out` feature; use `play --dry-run` or `render`".to_string(),
    ))
}
