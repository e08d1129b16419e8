use std::path::PathBuf;
use std::time::Instant;

use mtrack_core::exporters::{export_results, ExportLayout};
use mtrack_core::{FilterJob, JobEvent, PipelineRequest};

use super::resolve_config;
use crate::types::Overrides;

/// Arguments of `mtrack filter`.
#[derive(Debug, Clone, Default)]
pub struct FilterCommand {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub overrides: Overrides,
    pub out: Option<PathBuf>,
    pub no_visualization: bool,
    pub threads: Option<usize>,
    pub silent: bool,
}

/// Run the full pipeline on a background job and export everything it produced.
pub fn cmd_filter(cmd: FilterCommand) -> Result<(), String> {
    let start = Instant::now();

    if !cmd.input.is_dir() {
        return Err(format!("Not a directory: {}", cmd.input.display()));
    }

    let config = resolve_config(cmd.config.as_deref(), &cmd.overrides)?;

    if let Some(num_threads) = cmd.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
        if !cmd.silent {
            println!("Using {} threads for parallel processing", num_threads);
        }
    }

    let request = PipelineRequest {
        input_dir: cmd.input.clone(),
        input: config.input.clone(),
        params: config.acquisition,
        filters: config.filters.clone(),
        render: config.render.clone(),
        visualize: !cmd.no_visualization,
    };
    let dataset = request.dataset_name();

    let handle = FilterJob::spawn(request).map_err(|e| format!("Failed to start job: {}", e))?;

    let mut last_percent = None;
    for event in handle.events().iter() {
        if cmd.silent {
            continue;
        }
        match event {
            JobEvent::Progress(p) => {
                // Only print each tenth so the terminal stays readable.
                let bucket = p / 10;
                if last_percent != Some(bucket) {
                    last_percent = Some(bucket);
                    eprintln!("[{:>3}%]", p);
                }
            }
            JobEvent::Status(message) => eprintln!("{}", message),
            JobEvent::Preview { index, total, .. } => {
                log::debug!("preview frame {}/{}", index + 1, total);
            }
            JobEvent::Stats {
                total_objects,
                passed_objects,
            } => log::info!("{} of {} objects usable", passed_objects, total_objects),
            JobEvent::Finished { success, message } => {
                if success {
                    eprintln!("{}", message);
                }
            }
        }
    }

    let output = handle.join().map_err(|e| e.to_string())?;

    let layout = ExportLayout::new(cmd.out.unwrap_or_else(|| PathBuf::from(".")), dataset);
    let visualization = (!cmd.no_visualization).then_some(output.visualization.as_slice());
    let exported = export_results(
        &layout,
        &output.extracted,
        &config.filters,
        &output.result,
        visualization,
    )
    .map_err(|e| format!("Export failed: {}", e))?;

    if !cmd.silent {
        println!();
        println!("Exported to {}", layout.root.display());
        println!("  Trajectories:   {}", exported.trajectories);
        println!("  Mask frames:    {}", exported.mask_frames);
        if !cmd.no_visualization {
            println!("  Visualizations: {}", exported.visualization_frames);
        }
        println!("  Report:         {}", exported.report.display());
        println!("Done in {:.2}s", start.elapsed().as_secs_f64());
    }

    Ok(())
}
