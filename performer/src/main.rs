use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use promptdj::prelude::*;

mod client;
mod commands;

use client::EchoClient;
use commands::{Command, CommandError};

const CLIENT_NAME: &str = "PromptDJ MIDI";
const REFRESH_INTERVAL: Duration = Duration::from_secs(2);
const CANVAS_SIZE: (f32, f32) = (640.0, 360.0);

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Steer weighted music prompts from a MIDI controller"
)]
struct Args {
    /// MIDI input port to select on startup
    #[arg(long)]
    midi_device: Option<String>,

    /// Audio input to visualize
    #[arg(long)]
    audio_device: Option<String>,

    #[arg(long)]
    fps: Option<f32>,

    /// YAML preset with 16 prompt slots
    #[arg(long)]
    preset: Option<PathBuf>,

    /// Prompt text the local client reports as filtered (repeatable)
    #[arg(long = "reject")]
    rejected: Vec<String>,

    /// Print MIDI and audio inputs and exit
    #[arg(long)]
    list_devices: bool,

    /// Persist the effective settings to the config directory
    #[arg(long)]
    save: bool,
}

/// `midir` when available, otherwise a backend that reports why not.
enum Midi {
    Midir(MidirAccess),
    Unavailable(MidiError),
}

impl Midi {
    fn connect() -> Self {
        match MidirAccess::new(CLIENT_NAME) {
            Ok(access) => Self::Midir(access),
            Err(err) => Self::Unavailable(err),
        }
    }
}

impl MidiAccess for Midi {
    fn devices(&mut self) -> Result<Vec<DeviceInfo>, MidiError> {
        match self {
            Self::Midir(access) => access.devices(),
            Self::Unavailable(err) => Err(err.clone()),
        }
    }

    fn listen(
        &mut self,
        device: &DeviceId,
        sink: RawSink,
    ) -> Result<(), MidiError> {
        match self {
            Self::Midir(access) => access.listen(device, sink),
            Self::Unavailable(err) => Err(err.clone()),
        }
    }

    fn unlisten(&mut self) {
        if let Self::Midir(access) = self {
            access.unlisten();
        }
    }
}

fn main() {
    init_logger();
    let args = Args::parse();

    if args.list_devices {
        list_devices();
        return;
    }

    let settings = resolve_settings(&args);
    let prompts = settings.load_prompts().unwrap_or_else(|err| {
        eprintln!("Unable to load preset: {}", err);
        std::process::exit(1);
    });

    let (input_tx, input_rx) = input_channel();
    let client = EchoClient::new(input_tx.clone(), args.rejected.clone());
    let mut app = App::with_inputs(
        AppConfig::from(&settings),
        (input_tx.clone(), input_rx),
        Midi::connect(),
        client,
        InputSampler::new(settings.audio_device()),
        prompts,
    );

    spawn_ui_log(app.subscribe());
    spawn_device_refresh(input_tx.clone());
    spawn_console(input_tx);

    let mut clock = FrameClock::new(settings.fps);
    let mut canvas = DrawList::new(CANVAS_SIZE.0, CANVAS_SIZE.1);
    app.run(&mut clock, &mut canvas, |output| {
        debug_throttled!(
            2_000,
            "level {:.2}, bar color {}, play scale {:.2}",
            output.audio.level,
            output.bar_color,
            output.play_button_scale
        );
    });
}

fn resolve_settings(args: &Args) -> Settings {
    let dir = storage::config_dir();

    let loaded = dir.as_deref().map(storage::load_settings_if_exists);
    let mut settings = match loaded {
        Some(Ok(Some(settings))) => settings,
        Some(Ok(None)) | None => Settings::default(),
        Some(Err(err)) => {
            warn!("Ignoring unreadable settings: {}", err);
            Settings::default()
        }
    };

    if let Some(name) = &args.midi_device {
        settings.midi_device_name = name.clone();
    }
    if let Some(name) = &args.audio_device {
        settings.audio_device_name = name.clone();
    }
    if let Some(fps) = args.fps {
        settings.fps = fps;
    }
    if let Some(path) = &args.preset {
        settings.preset_path = Some(path.clone());
    }

    if args.save {
        match dir.map(|dir| storage::save_settings(&dir, &settings)) {
            Some(Ok(path)) => info!("Saved settings to {}", path.display()),
            Some(Err(err)) => error!("Unable to save settings: {}", err),
            None => error!("No config directory available"),
        }
    }

    settings
}

fn list_devices() {
    match MidirAccess::new(CLIENT_NAME).and_then(|mut access| access.devices())
    {
        Ok(devices) => {
            println!("MIDI inputs:");
            for device in devices {
                println!(
                    "  {} ({})",
                    device.name.as_deref().unwrap_or("Unnamed device"),
                    device.id
                );
            }
        }
        Err(err) => println!("MIDI unavailable: {}", err),
    }

    match list_audio_devices() {
        Ok(names) => {
            println!("Audio inputs:");
            for name in names {
                println!("  {}", name);
            }
        }
        Err(err) => println!("Audio unavailable: {}", err),
    }
}

fn spawn_console(inputs: InputSender) {
    thread::spawn(move || {
        eprintln!("{}", commands::HELP);
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match commands::parse(&line) {
                Ok(Command::Input(input)) => {
                    let quit = input == Input::Quit;
                    if inputs.send(input).is_err() || quit {
                        return;
                    }
                }
                Ok(Command::Help) => eprintln!("{}", commands::HELP),
                Err(CommandError::Empty) => {}
                Err(err) => eprintln!("{}", err),
            }
        }
        let _ = inputs.send(Input::Quit);
    });
}

/// Hot-plug detection: poll the device list.
fn spawn_device_refresh(inputs: InputSender) {
    thread::spawn(move || {
        loop {
            thread::sleep(REFRESH_INTERVAL);
            if inputs.send(Input::RefreshMidiDevices).is_err() {
                break;
            }
        }
    });
}

fn spawn_ui_log(events: UiEventReceiver) {
    thread::spawn(move || {
        for event in events {
            match event {
                UiEvent::PromptsChanged(snapshot) => {
                    let active = snapshot.weighted_prompts();
                    debug!("{} active prompt(s)", active.len());
                }
                UiEvent::PromptChanged(prompt) => info!(
                    "{} '{}' weight {:.2} (CC {} ch {})",
                    prompt.id,
                    prompt.text,
                    prompt.weight,
                    prompt.cc,
                    prompt.channel
                ),
                UiEvent::LearnState(id, BindingState::Learning) => {
                    info!("{} waiting for a CC", id)
                }
                UiEvent::LearnState(id, BindingState::Idle) => {
                    info!("{} done learning", id)
                }
                UiEvent::PlaybackState(state) => info!("Playback {}", state),
                UiEvent::MidiDevices(devices) => {
                    for (id, name) in devices {
                        info!("MIDI input {}: {}", id, name);
                    }
                }
                UiEvent::ActiveMidiDevice(Some(id)) => {
                    info!("Listening to {}", id)
                }
                UiEvent::ActiveMidiDevice(None) => info!("No MIDI input"),
                UiEvent::Toast(notice) => warn!("{}", notice),
            }
        }
    });
}
