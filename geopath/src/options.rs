use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand, ValueEnum};
use geo::geometry::Point;
use serde::Serialize;
use std::{path::PathBuf, str::FromStr};
use terrain::{Interpolation, DEFAULT_STEPS};

/// Line-of-sight profiles, coverage checks, and repeater site search.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Directory for cached LOS profiles and DEM tiles.
    #[arg(long, env = "GEOPATH_CACHE_DIR", default_value = ".geopath")]
    pub cache_dir: PathBuf,

    /// Base URL of an OpenTopoData compatible elevation service.
    #[arg(long, env = "GEOPATH_ELEVATION_URL", default_value = terrain::DEFAULT_BASE_URL)]
    pub elevation_url: String,

    /// Elevation service dataset.
    #[arg(long, env = "GEOPATH_DATASET", default_value = terrain::DEFAULT_DATASET)]
    pub dataset: String,

    /// How the elevation service interpolates between raster cells.
    /// Profiles already in the cache are served as they were computed.
    #[arg(long, env = "GEOPATH_INTERPOLATION", value_enum, default_value_t = InterpolationArg::Cubic)]
    pub interpolation: InterpolationArg,

    /// OpenTopography API key, needed to download DEM tiles.
    #[arg(long, env = "OPENTOPOGRAPHY_API_KEY", hide_env_values = true)]
    pub opentopography_key: Option<String>,

    /// Timeout for every outbound HTTP request, in seconds.
    #[arg(long, env = "GEOPATH_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Terrain profile and line of sight between two points.
    Profile {
        /// Start "lat,lon,alt", where 'alt' is meters above ground.
        #[arg(long)]
        start: LatLonAlt,

        /// Destination "lat,lon,alt", where 'alt' is meters above ground.
        #[arg(long)]
        dest: LatLonAlt,

        /// Number of steps between start and destination. Only the
        /// default is cached.
        #[arg(long, default_value_t = DEFAULT_STEPS)]
        steps: usize,

        #[command(subcommand)]
        format: ProfileFormat,
    },

    /// Check targets against coverage overlays.
    Verify {
        /// Coverage PNG, with its bounds in a sibling `<stem>.json`.
        #[arg(long, required = true)]
        overlay: Vec<PathBuf>,

        /// Target "lat,lon".
        #[arg(long, required = true)]
        target: Vec<LatLon>,
    },

    /// Search for repeater sites that can see an uncovered target.
    Sites {
        /// Target "lat,lon".
        #[arg(long)]
        target: LatLon,

        /// Repeater antenna height above ground, in meters.
        #[arg(long)]
        antenna_height: f64,

        /// Target receiver height above ground, in meters.
        #[arg(long)]
        receiver_height: f64,

        /// Coverage PNG, with its bounds in a sibling `<stem>.json`.
        #[arg(long)]
        overlay: Vec<PathBuf>,

        /// GeoJSON polygons where a repeater may not go.
        #[arg(long)]
        exclude: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand, Clone, Copy)]
pub enum ProfileFormat {
    /// Print samples as CSV to stdout.
    Csv,

    /// Print the profile as JSON to stdout.
    Json,

    /// Plot terrain and sight line to terminal.
    Plot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InterpolationArg {
    Nearest,
    Bilinear,
    Cubic,
}

impl From<InterpolationArg> for Interpolation {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Nearest => Interpolation::Nearest,
            InterpolationArg::Bilinear => Interpolation::Bilinear,
            InterpolationArg::Cubic => Interpolation::Cubic,
        }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

impl coverage::Located for LatLon {
    fn location(&self) -> Point<f64> {
        self.point()
    }
}

impl FromStr for LatLon {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (lat_str, lon_str) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid lat,lon"))?;
        let lat = f64::from_str(lat_str.trim())?;
        let lon = f64::from_str(lon_str.trim())?;
        Ok(Self { lat, lon })
    }
}

#[derive(Clone, Debug, Copy, PartialEq)]
pub struct LatLonAlt(pub Point<f64>, pub f64);

impl FromStr for LatLonAlt {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (lat_lon, alt_str) = s
            .rsplit_once(',')
            .ok_or_else(|| anyhow!("not a valid lat,lon,alt"))?;
        let LatLon { lat, lon } = lat_lon
            .parse()
            .map_err(|_| anyhow!("not a valid lat,lon,alt"))?;
        let alt = f64::from_str(alt_str.trim())?;
        Ok(Self(Point::new(lon, lat), alt))
    }
}
