// FastSLAM 1.0 demo
// author: Atsushi Sakai (@Atsushi_twi)
//         Ryohei Sasaki (@rsasaki0109)

use std::path::Path;

use clap::Parser;
use log::{error, info};

use fastslam::simulation::{Room, Vehicle, VehicleNoise};
use fastslam::slam::motion_model;
use fastslam::utils::{colors, PathStyle, Visualizer};
use fastslam::{
    ControlInput, ControlSource, Execution, FastSlam, FastSlamConfig, ObservationSource, Pose2D,
    SlamResult,
};

/// Run FastSLAM 1.0 on a simulated room and report the estimation error
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of particles
    #[arg(short = 'n', long, default_value_t = 50)]
    particles: usize,

    /// Seed for both the simulation and the filter
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Simulation time [s]
    #[arg(long, default_value_t = 50.0)]
    sim_time: f64,

    /// Time step [s]
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Run particle updates on the rayon thread pool
    #[arg(long)]
    parallel: bool,

    /// Save the final plot to this SVG file (errors go to `<stem>_error.svg`)
    #[arg(short, long)]
    output: Option<String>,

    /// Open an interactive gnuplot window at the end
    #[arg(long)]
    show: bool,
}

fn room() -> Room {
    Room::from_landmarks(&[
        (10.0, -2.0),
        (15.0, 10.0),
        (15.0, 15.0),
        (10.0, 20.0),
        (3.0, 15.0),
        (-5.0, 20.0),
        (-5.0, 5.0),
        (-10.0, 15.0),
    ])
}

fn run(args: &Args) -> SlamResult<()> {
    let room = room();
    let landmarks = room.landmarks().to_vec();

    let execution = if args.parallel { Execution::Parallel } else { Execution::Serial };
    let config = FastSlamConfig::default()
        .with_num_particles(args.particles)
        .with_landmark_capacity(landmarks.len())
        .with_seed(args.seed)
        .with_execution(execution);
    let mut slam = FastSlam::new(config)?;
    let mut vehicle = Vehicle::new(room, Pose2D::origin(), VehicleNoise::default(), args.seed.wrapping_add(1))?;

    let command = ControlInput::new(1.0, 5.0_f64.to_radians());

    let mut h_true = vec![Pose2D::origin()];
    let mut h_est = vec![Pose2D::origin()];
    let mut h_dr = vec![Pose2D::origin()];
    let mut h_time = Vec::new();
    let mut h_error_x = Vec::new();
    let mut h_error_y = Vec::new();
    let mut h_error_dist = Vec::new();

    let mut time = 0.0;
    let mut last_report = 0.0;
    while time < args.sim_time {
        time += args.dt;

        vehicle.move_step(&command, args.dt)?;
        let u = vehicle.control();
        let z = vehicle.observe();

        slam.predict(&u, args.dt)?;
        let est = slam.update(&z)?;

        let x_true = vehicle.pose();
        let x_dr = Pose2D::from(motion_model(&h_dr[h_dr.len() - 1].to_vector(), &u.to_vector(), args.dt));
        let error_x = (est.x - x_true.x).abs();
        let error_y = (est.y - x_true.y).abs();
        h_time.push(time);
        h_error_x.push(error_x);
        h_error_y.push(error_y);
        h_error_dist.push((error_x * error_x + error_y * error_y).sqrt());

        if time - last_report >= 5.0 {
            last_report = time;
            info!(
                "t = {:.1} s, est = ({:.2}, {:.2}), true = ({:.2}, {:.2}), N_eff = {:.1}",
                time, est.x, est.y, x_true.x, x_true.y, slam.effective_sample_size()
            );
        }

        h_true.push(x_true);
        h_est.push(est);
        h_dr.push(x_dr);
    }

    let n_steps = h_error_dist.len().max(1) as f64;
    let rmse = (h_error_dist.iter().map(|e| e * e).sum::<f64>() / n_steps).sqrt();
    info!("Position RMSE over {} steps: {:.3} m", h_error_dist.len(), rmse);

    let best = slam.best_particle();
    for (id, lm) in best.landmarks().iter_tracked() {
        info!(
            "Landmark {}: est = ({:.2}, {:.2}), true = ({:.2}, {:.2})",
            id, lm.mean[0], lm.mean[1], landmarks[id].x, landmarks[id].y
        );
    }

    if args.output.is_some() || args.show {
        let mut vis = Visualizer::new();
        vis.set_title("FastSLAM 1.0");
        vis.plot_landmarks(&landmarks)
            .plot_particles(slam.particles())
            .plot_landmark_estimates(best.landmarks())
            .plot_trajectory(&h_true, &PathStyle::new(colors::GROUND_TRUTH, "True"))
            .plot_trajectory(&h_dr, &PathStyle::new(colors::DEAD_RECKONING, "Dead Reckoning"))
            .plot_trajectory(&h_est, &PathStyle::new(colors::ESTIMATED, "FastSLAM"))
            .plot_robot(&slam.estimate(), 1.0);

        let mut error_vis = Visualizer::new();
        error_vis
            .set_title("Position error")
            .set_labels("time [s]", "error [m]")
            .set_aspect_ratio(None);
        error_vis
            .plot_series(&h_time, &h_error_x, &PathStyle::new(colors::RED, "error x"))
            .plot_series(&h_time, &h_error_y, &PathStyle::new(colors::BLUE, "error y"))
            .plot_series(&h_time, &h_error_dist, &PathStyle::new(colors::BLACK, "error dist"));

        if let Some(path) = &args.output {
            vis.save_svg(path)?;
            let error_path = error_plot_path(path);
            error_vis.save_svg(&error_path)?;
            info!("Plots saved to {} and {}", path, error_path);
        }
        if args.show {
            vis.show()?;
            error_vis.show()?;
        }
    }

    Ok(())
}

/// `out/run.svg` -> `out/run_error.svg`
fn error_plot_path(path: &str) -> String {
    let path = Path::new(path);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("fastslam");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("svg");
    path.with_file_name(format!("{}_error.{}", stem, ext))
        .to_string_lossy()
        .into_owned()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("FastSLAM 1.0 start!");

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Done!");
}
