use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tomolog::config::{self, Overrides, TomologConfig};
use tomolog::slides::{HttpSlidesService, RetryPolicy};
use tomolog::{auth, drive, logging, output, report};
use tracing::{info, warn};

/// Options mirrored from the config file. Each one, when given, overrides
/// the file value.
#[derive(clap::Args)]
struct ConfigArgs {
    /// Log file directory
    #[arg(long, global = true, value_name = "DIR")]
    logs_home: Option<PathBuf>,

    /// Directory holding google_token.json
    #[arg(long, global = true, value_name = "DIR")]
    token_home: Option<PathBuf>,

    /// Verbose output
    #[arg(long, global = true)]
    verbose: bool,

    /// Write the merged values back to the config file after `run`
    #[arg(long, global = true)]
    config_update: bool,

    /// Set for 0-360 data sets
    #[arg(long, global = true)]
    double_fov: bool,

    /// Name of the hdf file
    #[arg(long, global = true, value_name = "PATH")]
    file_name: Option<PathBuf>,

    /// Id of x slice for reconstruction visualization
    #[arg(long, global = true, allow_negative_numbers = true)]
    idx: Option<i64>,

    /// Id of y slice for reconstruction visualization
    #[arg(long, global = true, allow_negative_numbers = true)]
    idy: Option<i64>,

    /// Id of z slice for reconstruction visualization
    #[arg(long, global = true, allow_negative_numbers = true)]
    idz: Option<i64>,

    /// Maximum threshold value for reconstruction visualization
    #[arg(long, global = true, allow_negative_numbers = true)]
    max: Option<f64>,

    /// Minimum threshold value for reconstruction visualization
    #[arg(long, global = true, allow_negative_numbers = true)]
    min: Option<f64>,

    /// Beamline the slide is customized for
    #[arg(long, global = true, value_parser = ["None", "2-bm", "7-bm", "32-id"])]
    beamline: Option<String>,

    /// Prefix of the recon folder
    #[arg(long, global = true, value_parser = ["recgpu", "rec"])]
    rec_type: Option<String>,

    /// PV prefix for camera
    #[arg(long, global = true)]
    pv_prefix: Option<String>,

    /// Google presentation url (or bare presentation id)
    #[arg(long, global = true, value_name = "URL")]
    presentation_url: Option<String>,
}

impl ConfigArgs {
    fn overrides(&self) -> Overrides {
        let mut o = Overrides::new();
        o.set_path("general", "logs-home", self.logs_home.as_deref());
        o.set_path("general", "token-home", self.token_home.as_deref());
        o.set_flag("general", "verbose", self.verbose);
        o.set_flag("general", "config-update", self.config_update);
        o.set_flag("general", "double-fov", self.double_fov);
        o.set_path("file-reading", "file-name", self.file_name.as_deref());
        o.set_opt("parameters", "idx", self.idx);
        o.set_opt("parameters", "idy", self.idy);
        o.set_opt("parameters", "idz", self.idz);
        o.set_opt("parameters", "max", self.max);
        o.set_opt("parameters", "min", self.min);
        o.set_opt("parameters", "beamline", self.beamline.clone());
        o.set_opt("parameters", "rec-type", self.rec_type.clone());
        o.set_opt("parameters", "pv-prefix", self.pv_prefix.clone());
        o.set_opt("parameters", "presentation-url", self.presentation_url.clone());
        o
    }
}

#[derive(clap::Args)]
struct RunArgs {
    /// Image URL to place on the slide (repeatable)
    #[arg(long = "image-url", value_name = "URL")]
    image_urls: Vec<String>,

    /// Local image to publish through Google Drive and place (repeatable)
    #[arg(long = "image-file", value_name = "PATH")]
    image_files: Vec<PathBuf>,

    /// Insert all images in one batch, without retries
    #[arg(long)]
    single_batch: bool,
}

#[derive(Parser)]
#[command(name = "tomolog")]
#[command(about = "Publish tomography reconstruction runs to Google Slides")]
#[command(long_about = "\
Publish tomography reconstruction runs to Google Slides

Each `run` appends one slide: a title with the data set name, a bulleted
list of the run parameters, and the given images.

Settings are resolved from, in increasing precedence:
  built-in defaults
  the config file (default ~/logs/tomolog.conf)
  command-line flags

The Google service-account key is read from <token-home>/google_token.json.

Run 'tomolog init' to write a documented config file.")]
#[command(version)]
struct Cli {
    /// File name of configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    options: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a documented config file with all defaults
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Show the merged configuration
    Status,
    /// Create the slide for one reconstruction run
    Run(RunArgs),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    match cli.command {
        Command::Init { force } => init_config(&config_path, force)?,
        Command::Status => {
            let config = config::load_config(&config_path, cli.options.overrides())?;
            output::print_status(&config);
        }
        Command::Run(ref args) => {
            let config = config::load_config(&config_path, cli.options.overrides())?;
            if let Some(log_path) = logging::init(&config.general) {
                info!(path = %log_path.display(), "logging to file");
            }
            run(&config, &config_path, args)?;
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        )
        .into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config::stock_config())?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Publish local files through Drive. Files that cannot be published are
/// logged and skipped.
fn publish_files(key_file: &Path, files: &[PathBuf]) -> Vec<String> {
    let Some(session) = auth::get_drive_session(key_file) else {
        warn!(count = files.len(), "no drive session, skipping local images");
        return Vec::new();
    };
    let publisher = drive::DrivePublisher::new(&session);
    files
        .iter()
        .filter_map(|file| match publisher.publish_image(file) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(path = %file.display(), error = %e, "cannot publish image");
                None
            }
        })
        .collect()
}

fn run(
    config: &TomologConfig,
    config_path: &Path,
    args: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let presentation_id = config
        .presentation_id()
        .ok_or("no presentation configured: pass --presentation-url or set it in the config file")?;

    let key_file = config.token_file();
    let session = auth::get_presentation_session(&key_file)?;

    let mut image_urls = args.image_urls.clone();
    if !args.image_files.is_empty() {
        image_urls.extend(publish_files(&key_file, &args.image_files));
    }

    let service = HttpSlidesService::new(&session, presentation_id);
    let policy = RetryPolicy::from_config(&config.slides);
    let report = report::publish_run(&service, config, &image_urls, &policy, args.single_batch)?;
    output::print_run_summary(&report);

    if config.general.config_update {
        config::write_config(config_path, config)?;
        info!(path = %config_path.display(), "updated config file");
    }
    Ok(())
}
