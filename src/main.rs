use std::env;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, ensure, Context, Result};
use log::info;

use hexa_bloom::app::print_final_state;
use hexa_bloom::{EffectConfig, SceneContext};

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

const USAGE: &str =
    "Usage: hexa-bloom [effect.xml] [--seed <n>] [--frame-ms <ms>] [--until <ms>] [--trace]";

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;

    let mut config = match &options.path {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("failed to read effect config {path}"))?;
            EffectConfig::from_xml(&xml).with_context(|| format!("failed to parse {path}"))?
        }
        None => EffectConfig::default(),
    };
    if let Some(seed) = options.seed {
        config.seed = Some(seed);
    }
    if let Some(frame_ms) = options.frame_ms {
        config.frame_ms = frame_ms;
    }
    if let Some(until) = options.until_ms {
        config.duration_ms = until;
    }
    config.validate().context("invalid effect settings")?;

    let seed = config.seed.unwrap_or_else(seed_from_clock);
    let frame_ms = config.frame_ms;
    let until_ms = config.duration_ms;
    let mut context = SceneContext::init(config, seed);

    let field = context.field();
    println!(
        "Generated {} hexagon clusters ({} elements)",
        field.len(),
        field.element_count()
    );
    println!(
        "Simulating {until_ms:.0}ms at {frame_ms:.3}ms per frame (seed {seed})"
    );

    let mut field_attached = true;
    let mut flash_finished = false;
    while context.now() < until_ms {
        let next = (context.now() + frame_ms).min(until_ms);
        ensure!(
            next > context.now(),
            "--frame-ms {frame_ms} is too small to advance the clock past {:.3}ms",
            context.now()
        );
        context.tick_to(next);

        let summary = context.summary();
        if options.trace {
            println!("{summary}");
        }
        if !flash_finished && context.flash().is_finished() {
            flash_finished = true;
            println!("Horizon flash finished at {:.0}ms", summary.time_ms);
        }
        if field_attached && !summary.field_attached {
            field_attached = false;
            println!("Hexagon field detached at {:.0}ms", summary.time_ms);
        }
    }
    info!("simulation stopped after {} frame(s)", context.frames());

    print_final_state(&context);
    Ok(())
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Default)]
struct CliOptions {
    path: Option<String>,
    seed: Option<u64>,
    frame_ms: Option<f64>,
    until_ms: Option<f64>,
    trace: bool,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--seed" => options.seed = Some(parse_value(&mut args, "--seed")?),
                "--frame-ms" => options.frame_ms = Some(parse_value(&mut args, "--frame-ms")?),
                "--until" => options.until_ms = Some(parse_value(&mut args, "--until")?),
                "--trace" => options.trace = true,
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
                path => {
                    if options.path.is_some() {
                        return Err(anyhow!("Unexpected extra argument: {path}. {USAGE}"));
                    }
                    options.path = Some(path.to_string());
                }
            }
        }
        Ok(options)
    }
}

fn parse_value<T>(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = args
        .next()
        .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))?;
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid value for {flag}: {value:?} ({err})"))
}
