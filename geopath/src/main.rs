mod mask;
mod options;

use anyhow::Error as AnyError;
use clap::Parser;
use coverage::{verify_many, Overlay, DEFAULT_ALPHA_THRESHOLD};
use dem::{DemCache, OpenTopography};
use itertools::izip;
use options::{Cli, Command as CliCmd, LatLonAlt, ProfileFormat};
use repeater::{SearchRequest, SiteSearch};
use std::{io::Write, path::PathBuf, sync::Arc, time::Duration};
use terrain::{
    math::{distance_m, validate_point},
    DiskStore, OpenTopoData, Profile, ProfileCache, DEFAULT_STEPS,
};
use textplots::{Chart, Plot, Shape};

fn main() -> Result<(), AnyError> {
    let Cli {
        cache_dir,
        elevation_url,
        dataset,
        interpolation,
        opentopography_key,
        timeout_secs,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let timeout = Duration::from_secs(timeout_secs);
    let elevation = || -> Result<_, AnyError> {
        Ok(OpenTopoData::new(&elevation_url, &dataset, timeout)?.interpolation(interpolation.into()))
    };
    let profiles = || -> Result<_, AnyError> {
        let store = DiskStore::new(cache_dir.join("los"))?;
        Ok(ProfileCache::new(store, elevation()?))
    };

    match cmd {
        CliCmd::Profile {
            start,
            dest,
            steps,
            format,
        } => {
            let profile = if steps == DEFAULT_STEPS {
                profiles()?.get_or_compute(start.0, dest.0, start.1, dest.1)?
            } else {
                build_uncached(start, dest, steps, &elevation()?)?
            };
            match format {
                ProfileFormat::Csv => print_csv(&profile)?,
                ProfileFormat::Json => print_json(&profile)?,
                ProfileFormat::Plot => plot_ascii(&profile),
            }
        }

        CliCmd::Verify { overlay, target } => {
            let overlays = load_overlays(&overlay)?;
            let verified = verify_many(target, &overlays, DEFAULT_ALPHA_THRESHOLD);
            println!("{}", serde_json::to_string(&verified)?);
        }

        CliCmd::Sites {
            target,
            antenna_height,
            receiver_height,
            overlay,
            exclude,
        } => {
            let request = SearchRequest {
                target: validate_point(target.point())?,
                antenna_height_m: antenna_height,
                receiver_height_m: receiver_height,
                overlays: load_overlays(&overlay)?,
                excluded: mask::open(exclude.as_deref())?,
            };
            let source = OpenTopography::new(opentopography_key, timeout)?;
            let search = SiteSearch::new(
                DemCache::new(cache_dir.join("dem"), source),
                Arc::new(profiles()?),
            );
            // Blocking HTTP clients must not be dropped inside the
            // runtime, so `search` outlives it.
            let sites = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(search.find_candidate_sites(&request))?;
            println!("{}", serde_json::to_string(&sites)?);
        }
    };

    Ok(())
}

fn build_uncached(
    start: LatLonAlt,
    dest: LatLonAlt,
    steps: usize,
    elevation: &OpenTopoData,
) -> Result<Profile, AnyError> {
    let profile = Profile::builder()
        .start(validate_point(start.0)?)
        .start_alt(start.1)
        .end(validate_point(dest.0)?)
        .end_alt(dest.1)
        .steps(steps)
        .build(elevation)?;
    Ok(profile)
}

fn load_overlays(paths: &[PathBuf]) -> Result<Vec<Overlay>, AnyError> {
    let overlays = paths
        .iter()
        .map(Overlay::from_companion)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(overlays)
}

/// # Example with gnuplot
///
/// ```sh
/// geopath profile --start=-9.5,-49.5,30 --dest=-9.51,-49.49,3 csv | tr ',' ' ' > ~/.tmp/plot && gnuplot -p -e "plot for [col=4:5] '~/.tmp/plot' using 1:col with lines"
/// ```
fn print_csv(profile: &Profile) -> Result<(), AnyError> {
    let total_m = match (profile.samples.first(), profile.samples.last()) {
        (Some(first), Some(last)) => distance_m(first.point(), last.point()),
        _ => 0.0,
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Distance,Longitude,Latitude,LOS,Elevation")?;
    for (sample, los) in izip!(&profile.samples, profile.sight_line_m()) {
        let distance = sample.fraction * total_m;
        let longitude = sample.lon;
        let latitude = sample.lat;
        let elevation = sample.elevation_m;
        writeln!(
            stdout,
            "{distance},{longitude},{latitude},{los},{elevation}",
        )?;
    }
    Ok(())
}

fn print_json(profile: &Profile) -> Result<(), AnyError> {
    let json = serde_json::to_string(profile)?;
    println!("{json}");
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn plot_ascii(profile: &Profile) {
    let terrain: Vec<(f32, f32)> = profile
        .samples
        .iter()
        .enumerate()
        .map(|(idx, sample)| (idx as f32, sample.elevation_m as f32))
        .collect();
    let sight_line: Vec<(f32, f32)> = profile
        .sight_line_m()
        .into_iter()
        .enumerate()
        .map(|(idx, elev)| (idx as f32, elev as f32))
        .collect();
    Chart::new(300, 150, 0.0, terrain.len().saturating_sub(1) as f32)
        .lineplot(&Shape::Lines(&terrain))
        .lineplot(&Shape::Lines(&sight_line))
        .display();
    match profile.blockage {
        None => println!("clear line of sight"),
        Some(blockage) => println!(
            "blocked at ({}, {}) by {:.1} m, raise by {:.1} m",
            blockage.lat,
            blockage.lon,
            blockage.deficit_m,
            blockage.additional_height_m()
        ),
    }
}
