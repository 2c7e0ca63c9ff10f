use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use evodrive::simulation::activation::Activation;
use evodrive::simulation::evolution::GenerationManager;
use evodrive::simulation::genome::Genome;
use evodrive::simulation::pacing::FramePacer;
use evodrive::simulation::params::{Params, TopologyConfig, TopologyRequest};
use evodrive::simulation::persistence::NetworkFile;
use evodrive::simulation::track::{Track, parse_control_points};

const CONTROLS: &str = "controls (type a letter and press enter):
  n    start the next generation now
  s    save the best networks
  q    quit";

/// Headless trainer: evolves networks that drive around a track.
#[derive(Parser, Debug)]
#[command(version, about, after_help = CONTROLS)]
struct Args {
    /// Track control point file (one `x y cx cy` point per line)
    #[arg(short, long)]
    track: PathBuf,

    /// Neural network file to load from and save to
    #[arg(short = 'n', long = "neural-network")]
    neural_network: PathBuf,

    /// Sensor angles in degrees relative to the heading
    #[arg(short = 's', long, value_delimiter = ',', allow_hyphen_values = true)]
    sensor_angles: Option<Vec<f32>>,

    /// Hidden layer sizes
    #[arg(short = 'L', long, value_delimiter = ',')]
    hidden_layers: Option<Vec<usize>>,

    /// Activation function: sigmoid, relu, leaky_relu or softmax
    #[arg(short = 'f', long)]
    activation: Option<Activation>,

    /// Number of best networks written per save
    #[arg(short = 'q', long)]
    save_quota: Option<usize>,

    /// Number of cars per generation
    #[arg(short, long)]
    ai_count: Option<usize>,

    /// Number of elites kept per generation
    #[arg(short = 'c', long)]
    select_count: Option<usize>,

    /// Noise applied to networks seeded beyond those in the file
    #[arg(short, long)]
    init_mutate_noise: Option<f32>,

    /// Noise applied to every child
    #[arg(short, long)]
    mutate_noise: Option<f32>,

    /// Strength of the push away from the population mean
    #[arg(short = 'r', long)]
    mutate_learn_rate: Option<f32>,

    /// Extra simulation ticks per frame
    #[arg(short = 'k', long)]
    frame_skip: Option<u32>,

    /// Hold 60 frames per second
    #[arg(short, long)]
    limit_fps: bool,

    /// Tick cap per generation
    #[arg(long)]
    max_ticks: Option<u32>,

    /// Stop after this many generations
    #[arg(short, long)]
    generations: Option<u32>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// TOML parameter file; command line values take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start from random networks if the network file does not fit
    #[arg(long)]
    fresh_on_mismatch: bool,
}

impl Args {
    fn params(&self) -> anyhow::Result<Params> {
        let mut params = match &self.config {
            Some(path) => Params::load_from_file(path)
                .with_context(|| format!("reading parameters from {}", path.display()))?,
            None => Params::default(),
        };

        if let Some(v) = self.save_quota {
            params.save_quota = v;
        }
        if let Some(v) = self.ai_count {
            params.ai_count = v;
        }
        if let Some(v) = self.select_count {
            params.select_count = v;
        }
        if let Some(v) = self.init_mutate_noise {
            params.init_mutate_noise = v;
        }
        if let Some(v) = self.mutate_noise {
            params.mutate_noise = v;
        }
        if let Some(v) = self.mutate_learn_rate {
            params.mutate_learn_rate = v;
        }
        if let Some(v) = self.frame_skip {
            params.frame_skip = v;
        }
        if self.max_ticks.is_some() {
            params.max_ticks = self.max_ticks;
        }
        if self.seed.is_some() {
            params.seed = self.seed;
        }
        params.limit_fps |= self.limit_fps;

        params.validate()?;
        Ok(params)
    }

    fn topology_request(&self) -> TopologyRequest {
        TopologyRequest {
            sensor_angles: self.sensor_angles.clone(),
            hidden_sizes: self.hidden_layers.clone(),
            activation: self.activation,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    NextGeneration,
    Save,
    Quit,
}

fn spawn_command_reader() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            let command = match line.trim() {
                "n" => Command::NextGeneration,
                "s" => Command::Save,
                "q" => Command::Quit,
                other => {
                    warn!(input = other, "unknown command");
                    continue;
                }
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });
    rx
}

/// Resolves the topology and seed genomes from the command line and the
/// network file, if one exists.
fn load_networks(args: &Args) -> anyhow::Result<(TopologyConfig, Vec<Genome>)> {
    let request = args.topology_request();
    if !args.neural_network.exists() {
        info!(path = %args.neural_network.display(), "network file not found, starting fresh");
        return Ok((request.resolve(None)?, Vec::new()));
    }

    let file = NetworkFile::load_from_file(&args.neural_network)
        .with_context(|| format!("loading {}", args.neural_network.display()))?;
    let loaded = request
        .resolve(Some(&file.topology))
        .and_then(|topology| file.into_genomes(&topology).map(|genomes| (topology, genomes)));

    match loaded {
        Ok(networks) => Ok(networks),
        Err(e) if e.is_shape_mismatch() && args.fresh_on_mismatch => {
            warn!(error = %e, "network file does not fit, starting from random networks");
            Ok((request.resolve(None)?, Vec::new()))
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", args.neural_network.display())),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let params = args.params()?;

    let track_text = std::fs::read_to_string(&args.track)
        .with_context(|| format!("reading track {}", args.track.display()))?;
    let track = Track::from_control_points(&parse_control_points(&track_text)?, &params.track)
        .with_context(|| format!("building track {}", args.track.display()))?;

    let (topology, seeds) = load_networks(&args)?;

    let dt = params.dt;
    let mut pacer = FramePacer::from_params(&params);
    let mut manager = GenerationManager::new(params, topology, track, seeds)?
        .with_network_file(&args.neural_network);

    println!("{CONTROLS}");
    let commands = spawn_command_reader();

    'training: loop {
        loop {
            match commands.try_recv() {
                Ok(Command::NextGeneration) => manager.request_next_generation(),
                Ok(Command::Save) => manager.request_save(),
                Ok(Command::Quit) => break 'training,
                // stdin closed or nothing pending
                Err(_) => break,
            }
        }

        pacer.advance(&mut manager, dt)?;
        pacer.wait();

        if args.generations.is_some_and(|limit| manager.generation() >= limit) {
            break;
        }
    }

    if let Some((_, fitness)) = manager.best() {
        info!(fitness, generations = manager.generation(), "training stopped");
    }
    Ok(())
}
