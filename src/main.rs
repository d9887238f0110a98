use std::error::Error;

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use tracing::{error, info};

use pv_calibration::config::Config;
use pv_calibration::error::SourceError;
use pv_calibration::models::IrradianceSeries;
use pv_calibration::report;
use pv_calibration::services::calibrator::Calibrator;
use pv_calibration::services::enedis::EnedisClient;
use pv_calibration::services::odre::OdreClient;
use pv_calibration::services::open_meteo::OpenMeteoClient;
use pv_calibration::services::pipeline::{run_ratio, run_trajectory};
use pv_calibration::services::solar_algorithm::OfflineIrradiance;
use pv_calibration::services::sources::IrradianceSource;
use pv_calibration::services::http_client;
use pv_calibration::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Calibrate local PV production against public data", long_about = None)]
struct Cli {
    #[clap(long, default_value = "config.json")]
    config: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-year K from the local register trajectory and irradiance.
    Trajectory {
        #[clap(long)]
        start_year: Option<i32>,
        #[clap(long)]
        end_year: Option<i32>,
    },
    /// Single K from the capacity ratio against regional production.
    Ratio {
        #[clap(long)]
        year: Option<i32>,
    },
    /// Annual irradiance H per year.
    Irradiance {
        #[clap(long)]
        year: Option<i32>,
    },
    /// Most recent published register snapshot.
    LatestSnapshot,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = %e, "calibration failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load(&cli.config)?;
    info!(
        location = %config.location.name,
        commune = %config.location.commune_code,
        offline = config.offline_mode,
        "configuration loaded"
    );

    let client = http_client(config.sources.timeout_s)?;
    let odre = OdreClient::new(client.clone(), config.sources.odre_base_url.clone());
    let open_meteo = OpenMeteoClient::new(client.clone(), config.sources.open_meteo_archive_url.clone());
    let irradiance: &dyn IrradianceSource = if config.offline_mode {
        &OfflineIrradiance
    } else {
        &open_meteo
    };
    let site = config.site();
    let name = &config.location.name;

    match cli.command {
        Command::Trajectory { start_year, end_year } => {
            let start_year = start_year.unwrap_or(config.trajectory.start_year);
            let end_year = end_year.unwrap_or(config.trajectory.end_year);
            if end_year <= start_year {
                return Err(format!("end year {end_year} must be after start year {start_year}").into());
            }
            let calibrator = Calibrator::new(config.trajectory.laws.clone(), config.trajectory.time_axis);
            let result = run_trajectory(
                &odre,
                irradiance,
                &calibrator,
                &config.location.commune_code,
                &site,
                start_year,
                end_year,
            )
            .await?;
            print!("{}", report::trajectory(name, calibrator.laws(), &result));
        }
        Command::Ratio { year } => {
            let year = year.unwrap_or(config.ratio.reference_year);
            let enedis = EnedisClient::new(client, config.sources.enedis_base_url.clone());
            let result = run_ratio(&odre, &enedis, &config.commune(), &config.region(), year).await?;
            let region = format!("region {}", config.location.region_code);
            print!("{}", report::ratio(name, &region, &result));
        }
        Command::Irradiance { year } => {
            let years: Vec<i32> = match year {
                Some(y) => vec![y],
                None => ((config.trajectory.start_year + 1)..=config.trajectory.end_year).collect(),
            };
            let requests = years.iter().map(|&y| {
                let site = &site;
                async move {
                    match irradiance.hourly_irradiance(y, site).await {
                        Err(SourceError::EmptyIrradiance { .. }) => Ok(IrradianceSeries::hourly(y, Vec::new())),
                        other => other,
                    }
                }
            });
            let series = join_all(requests)
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            print!("{}", report::irradiance(&series));
        }
        Command::LatestSnapshot => {
            match odre.latest_snapshot_year(config.trajectory.start_year).await? {
                Some(y) => println!("Latest register snapshot: {y}"),
                None => println!("No register snapshot from {} onward", config.trajectory.start_year),
            }
        }
    }
    Ok(())
}
