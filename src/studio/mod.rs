//! Client side of Dreamscapes: a parameter form that paints canvases and
//! hands finished pieces to the art server.

pub mod client;
pub mod debounce;
pub mod events;
pub mod palette;
pub mod render;

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::error::StudioError;
use crate::utils::config::Settings;
use client::{ArtSink, GraphqlClient, SaveRequest, SavedArt};
use debounce::Debouncer;
use events::{ArtEvent, EventBus};
use palette::{Palette, Shape};
use render::{render, ArtParams, Canvas};

pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 600;

/// Form state plus the most recently painted canvas.
pub struct Studio {
    params: ArtParams,
    canvas: Arc<Mutex<Option<Canvas>>>,
    redraw: Debouncer<ArtParams>,
    sink: Arc<dyn ArtSink>,
    events: EventBus,
    error_message: Option<String>,
}

impl Studio {
    pub fn new(
        sink: Arc<dyn ArtSink>,
        events: EventBus,
        debounce: Duration,
        (width, height): (u32, u32),
    ) -> Self {
        let canvas: Arc<Mutex<Option<Canvas>>> = Arc::new(Mutex::new(None));
        let target = Arc::clone(&canvas);
        let redraw = Debouncer::new(debounce, move |params: ArtParams| {
            let painted = render(&params, width, height);
            match target.lock() {
                Ok(mut slot) => *slot = Some(painted),
                Err(_) => error!("Canvas lock poisoned; redraw discarded"),
            }
            info!(
                palette = %params.palette,
                shape = %params.shape,
                complexity = params.complexity,
                randomness = params.randomness,
                "Canvas redrawn"
            );
        });

        Self {
            params: ArtParams::default(),
            canvas,
            redraw,
            sink,
            events,
            error_message: None,
        }
    }

    pub fn params(&self) -> ArtParams {
        self.params
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn has_artwork(&self) -> bool {
        self.canvas.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.params.palette = palette;
        self.schedule_redraw();
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.params.shape = shape;
        self.schedule_redraw();
    }

    pub fn set_complexity(&mut self, complexity: u32) {
        self.params = ArtParams { complexity, ..self.params }.clamped();
        self.schedule_redraw();
    }

    pub fn set_randomness(&mut self, randomness: u32) {
        self.params = ArtParams { randomness, ..self.params }.clamped();
        self.schedule_redraw();
    }

    /// New seed, same parameters.
    pub fn regenerate(&mut self) {
        self.params.seed = rand::random();
        self.schedule_redraw();
    }

    /// Throws away the current canvas, e.g. when the drawing surface is torn
    /// down.
    pub fn clear_canvas(&mut self) {
        if let Ok(mut slot) = self.canvas.lock() {
            slot.take();
        }
    }

    fn schedule_redraw(&self) {
        self.redraw.trigger(self.params);
    }

    /// Serializes the current canvas and stores it on the server.
    ///
    /// The outcome is mirrored into [`error_message`](Studio::error_message).
    pub fn save(&mut self, title: Option<String>) -> Result<SavedArt, StudioError> {
        let result = self.try_save(title);
        self.error_message = result.as_ref().err().map(ToString::to_string);
        result
    }

    fn try_save(&self, title: Option<String>) -> Result<SavedArt, StudioError> {
        // Save what is on screen, which may lag behind a pending redraw.
        let (data, drawn) = {
            let slot = self.canvas.lock().map_err(|_| {
                error!("Canvas lock poisoned; cannot save");
                StudioError::CanvasUnavailable
            })?;
            let canvas = slot.as_ref().ok_or(StudioError::NoArtwork)?;
            (canvas.to_data_url()?, *canvas.params())
        };

        let saved = self.sink.save_art(&SaveRequest {
            data,
            title: title.filter(|t| !t.trim().is_empty()),
            palette: Some(drawn.palette.name().to_string()),
            complexity: i32::try_from(drawn.complexity).ok(),
        })?;

        info!(id = %saved.id, "Artwork saved");
        self.events.emit(ArtEvent::Saved { id: saved.id.clone() });
        Ok(saved)
    }
}

/// One line of input to the interactive studio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Palette(Palette),
    Shape(Shape),
    Complexity(u32),
    Randomness(u32),
    Regenerate,
    Save(Option<String>),
    Gallery,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = StudioError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let number = |what: &str| {
            rest.parse::<u32>()
                .map_err(|_| StudioError::InvalidCommand(format!("{what} needs a number, got '{rest}'")))
        };

        match word.to_ascii_lowercase().as_str() {
            "palette" => Ok(Command::Palette(rest.parse()?)),
            "shape" => Ok(Command::Shape(rest.parse()?)),
            "complexity" => Ok(Command::Complexity(number("complexity")?)),
            "randomness" => Ok(Command::Randomness(number("randomness")?)),
            "regenerate" | "new" => Ok(Command::Regenerate),
            "save" => Ok(Command::Save((!rest.is_empty()).then(|| rest.to_string()))),
            "gallery" | "list" => Ok(Command::Gallery),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(StudioError::InvalidCommand(format!("unknown command '{other}'"))),
        }
    }
}

const HELP: &str = "commands:
  palette <name>     Ocean Breeze | Sunset Glow | Forest Whisper | Neon Nights | Monochrome
  shape <name>       Circle | Square | Triangle | Mixed
  complexity <n>     number of shapes (1-100)
  randomness <n>     variation in size and rotation (0-100)
  regenerate         redraw with a new seed
  save [title]       store the current canvas on the server
  gallery            list saved artworks
  status             show current parameters
  quit";

/// Runs the interactive studio on stdin/stdout against `settings.endpoint`.
pub fn run(settings: &Settings) -> Result<()> {
    let client: Arc<dyn ArtSink> =
        Arc::new(GraphqlClient::new(settings.endpoint.clone()).context("Failed to build HTTP client")?);
    let events = EventBus::new();

    // Refresh the gallery whenever a piece is saved.
    let saved_rx = events.subscribe();
    let gallery_client = Arc::clone(&client);
    let gallery = thread::spawn(move || {
        for event in saved_rx {
            let ArtEvent::Saved { id } = event;
            match gallery_client.list_arts() {
                Ok(arts) => println!("saved #{id}; gallery now holds {} artworks", arts.len()),
                Err(e) => warn!("Could not refresh gallery: {e}"),
            }
        }
    });

    let mut studio = Studio::new(
        client.clone(),
        events,
        settings.debounce,
        (CANVAS_WIDTH, CANVAS_HEIGHT),
    );
    studio.regenerate();

    info!(endpoint = %settings.endpoint, "Studio ready");
    println!("Digital Dreamscapes studio. Type 'help' for commands.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Palette(p) => studio.set_palette(p),
            Command::Shape(s) => studio.set_shape(s),
            Command::Complexity(n) => studio.set_complexity(n),
            Command::Randomness(n) => studio.set_randomness(n),
            Command::Regenerate => studio.regenerate(),
            Command::Save(title) => {
                if let Err(e) = studio.save(title) {
                    println!("{e}");
                }
            }
            Command::Gallery => match client.list_arts() {
                Ok(arts) => {
                    for art in arts {
                        println!(
                            "#{:<4} {:<32} {:<16} {}",
                            art.id,
                            art.title.unwrap_or_default(),
                            art.palette.unwrap_or_default(),
                            art.created_at.unwrap_or_default()
                        );
                    }
                }
                Err(e) => println!("{e}"),
            },
            Command::Status => {
                let p = studio.params();
                println!(
                    "palette={} shape={} complexity={} randomness={} seed={} canvas={}",
                    p.palette,
                    p.shape,
                    p.complexity,
                    p.randomness,
                    p.seed,
                    if studio.has_artwork() { "ready" } else { "empty" }
                );
                if let Some(msg) = studio.error_message() {
                    println!("last error: {msg}");
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
        stdout.flush().ok();
    }

    // Dropping the studio closes the event bus, which ends the gallery thread.
    drop(studio);
    if gallery.join().is_err() {
        error!("Gallery listener panicked");
    }
    Ok(())
}

/// Renders once and optionally stores the result; backs the `generate`
/// command.
pub fn generate_once(
    params: &ArtParams,
    (width, height): (u32, u32),
    output: Option<&std::path::Path>,
    save: Option<(&dyn ArtSink, Option<String>)>,
) -> Result<Option<SavedArt>> {
    let canvas = render(params, width, height);

    if let Some(path) = output {
        canvas
            .save_png(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }

    let Some((sink, title)) = save else {
        return Ok(None);
    };
    let drawn = canvas.params();
    let saved = sink
        .save_art(&SaveRequest {
            data: canvas.to_data_url()?,
            title,
            palette: Some(drawn.palette.name().to_string()),
            complexity: i32::try_from(drawn.complexity).ok(),
        })
        .context("Failed to save artwork")?;
    info!(id = %saved.id, "Artwork saved");
    Ok(Some(saved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// Records requests instead of talking to a server.
    #[derive(Default)]
    struct RecordingSink {
        requests: Mutex<Vec<SaveRequest>>,
        reject_with: Option<String>,
    }

    impl ArtSink for RecordingSink {
        fn save_art(&self, request: &SaveRequest) -> Result<SavedArt, StudioError> {
            if let Some(msg) = &self.reject_with {
                return Err(StudioError::Api(msg.clone()));
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            Ok(SavedArt {
                id: requests.len().to_string(),
                title: request.title.clone(),
                palette: request.palette.clone(),
                complexity: request.complexity,
                created_at: None,
            })
        }

        fn list_arts(&self) -> Result<Vec<SavedArt>, StudioError> {
            Ok(Vec::new())
        }
    }

    fn studio(sink: Arc<RecordingSink>, events: EventBus) -> Studio {
        Studio::new(sink, events, Duration::from_millis(10), (32, 24))
    }

    fn wait_for_artwork(studio: &Studio) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !studio.has_artwork() {
            assert!(Instant::now() < deadline, "redraw never happened");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_defaults_match_form() {
        let studio = studio(Arc::default(), EventBus::new());
        let p = studio.params();
        assert_eq!(p.palette, Palette::OceanBreeze);
        assert_eq!(p.shape, Shape::Mixed);
        assert_eq!(p.complexity, 15);
        assert_eq!(p.randomness, 60);
        assert!(!studio.has_artwork());
    }

    #[test]
    fn test_save_without_canvas_reports_local_error() {
        let sink = Arc::new(RecordingSink::default());
        let mut studio = studio(sink.clone(), EventBus::new());

        let err = studio.save(None).unwrap_err();
        assert!(matches!(err, StudioError::NoArtwork));
        assert!(studio.error_message().unwrap().contains("No artwork to save"));
        assert!(sink.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_save_with_poisoned_canvas_is_not_reported_as_missing_art() {
        let sink = Arc::new(RecordingSink::default());
        let mut studio = studio(sink.clone(), EventBus::new());

        let canvas = Arc::clone(&studio.canvas);
        let _ = thread::spawn(move || {
            let _slot = canvas.lock().unwrap();
            panic!("redraw failed");
        })
        .join();

        let err = studio.save(None).unwrap_err();
        assert!(matches!(err, StudioError::CanvasUnavailable));
        assert!(studio.error_message().unwrap().contains("Canvas is unavailable"));
        assert!(sink.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_save_sends_canvas_and_emits_event() {
        let sink = Arc::new(RecordingSink::default());
        let events = EventBus::new();
        let saved_rx = events.subscribe();
        let mut studio = studio(sink.clone(), events);

        studio.set_palette(Palette::SunsetGlow);
        studio.set_complexity(20);
        wait_for_artwork(&studio);

        let saved = studio.save(Some("Dusk".into())).unwrap();
        assert_eq!(saved.id, "1");
        assert_eq!(studio.error_message(), None);

        let requests = sink.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].data.starts_with("data:image/png;base64,"));
        assert_eq!(requests[0].title.as_deref(), Some("Dusk"));
        assert_eq!(requests[0].palette.as_deref(), Some("Sunset Glow"));
        assert_eq!(requests[0].complexity, Some(20));

        assert_eq!(
            saved_rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            ArtEvent::Saved { id: "1".into() }
        );
    }

    #[test]
    fn test_server_error_is_surfaced() {
        let sink = Arc::new(RecordingSink {
            reject_with: Some("Failed to save artwork".into()),
            ..RecordingSink::default()
        });
        let events = EventBus::new();
        let saved_rx = events.subscribe();
        let mut studio = studio(sink, events);
        studio.regenerate();
        wait_for_artwork(&studio);

        assert!(studio.save(None).is_err());
        assert_eq!(studio.error_message(), Some("Failed to save artwork"));
        assert!(saved_rx.try_recv().is_err());
    }

    #[test]
    fn test_cleared_canvas_cannot_be_saved() {
        let mut studio = studio(Arc::default(), EventBus::new());
        studio.regenerate();
        wait_for_artwork(&studio);

        studio.clear_canvas();
        assert!(matches!(studio.save(None), Err(StudioError::NoArtwork)));
    }

    #[test]
    fn test_setters_clamp() {
        let mut studio = studio(Arc::default(), EventBus::new());
        studio.set_complexity(1_000);
        studio.set_randomness(1_000);
        assert_eq!(studio.params().complexity, render::MAX_COMPLEXITY);
        assert_eq!(studio.params().randomness, render::MAX_RANDOMNESS);
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!("palette Sunset Glow".parse::<Command>().unwrap(), Command::Palette(Palette::SunsetGlow));
        assert_eq!("shape circle".parse::<Command>().unwrap(), Command::Shape(Shape::Circle));
        assert_eq!("complexity 30".parse::<Command>().unwrap(), Command::Complexity(30));
        assert_eq!("save".parse::<Command>().unwrap(), Command::Save(None));
        assert_eq!(
            "save  My piece ".parse::<Command>().unwrap(),
            Command::Save(Some("My piece".into()))
        );
        assert_eq!("QUIT".parse::<Command>().unwrap(), Command::Quit);
        assert!(matches!("complexity lots".parse::<Command>(), Err(StudioError::InvalidCommand(_))));
        assert!(matches!("palette Plaid".parse::<Command>(), Err(StudioError::UnknownPalette(_))));
        assert!(matches!("dance".parse::<Command>(), Err(StudioError::InvalidCommand(_))));
    }

    #[test]
    fn test_generate_once_writes_png_and_saves() {
        let sink = RecordingSink::default();
        let sink_ref: &dyn ArtSink = &sink;
        let path = std::env::temp_dir().join(format!("dreamscapes-{}-gen.png", std::process::id()));

        let saved = generate_once(
            &ArtParams { seed: 3, ..ArtParams::default() },
            (24, 24),
            Some(&path),
            Some((sink_ref, Some("Offline".into()))),
        )
        .unwrap();

        assert_eq!(saved.map(|s| s.title), Some(Some("Offline".to_string())));
        let written = std::fs::read(&path).unwrap();
        assert_eq!(&written[..8], b"\x89PNG\r\n\x1a\n");
        std::fs::remove_file(path).unwrap();
    }
}
