use argh::FromArgs;
use std::path::PathBuf;

use freefall::{
    io::colmap,
    scale::{estimate_scale, PhaseIsolationKind, ScaleConfig, ScaleMethod},
};

#[derive(FromArgs)]
/// Recover the metric scale of a COLMAP reconstruction from a recorded throw
struct Args {
    /// path to the COLMAP sparse model (holding images.bin or images.txt)
    #[argh(option)]
    model_path: PathBuf,

    /// path to a JSON run configuration
    #[argh(option)]
    config: Option<PathBuf>,

    /// path to write the JSON result to, printed to stdout otherwise
    #[argh(option)]
    output: Option<PathBuf>,

    /// estimation method: mean_ratio or least_squares
    #[argh(option)]
    method: Option<ScaleMethod>,

    /// isolate the free-fall phase with sign_mask or longest_run
    #[argh(option)]
    isolate: Option<PhaseIsolationKind>,

    /// frames per second of the recording
    #[argh(option)]
    fps: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => serde_json::from_str::<ScaleConfig>(&std::fs::read_to_string(path)?)?,
        None => ScaleConfig::default(),
    };
    if let Some(method) = args.method {
        config.scale_method = method;
    }
    if let Some(kind) = args.isolate {
        config.enable_phase_isolation = true;
        config.phase_isolation = kind;
    }
    if let Some(fps) = args.fps {
        config.frame_interval_seconds = 1.0 / fps;
    }

    let poses = colmap::read_poses(&args.model_path)?;
    log::info!("loaded {} poses", poses.len());

    let output = estimate_scale(&poses, &config)?;

    eprintln!("scale factor: {:.6}", output.estimate.scale_factor);
    if let Some(raw_scale) = output.estimate.raw_scale_factor {
        eprintln!("scale factor (raw acceleration): {:.6}", raw_scale);
    }
    if let Some(params) = &output.estimate.fit_params {
        eprintln!("initial velocity: {:.6} m/s", params.u_scaled);
        eprintln!("gravity: {:.6} m/s^2", params.g_scaled);
    }
    if let Some(stats) = &output.estimate.residual_stats {
        eprintln!("mae: {:.6e} rmse: {:.6e}", stats.mae, stats.rmse);
    }

    let json = serde_json::to_string_pretty(&output)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
