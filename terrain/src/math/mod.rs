mod linspace;
mod path;

pub use {
    linspace::linspace,
    path::{distance_m, interpolate, validate_height, validate_point},
};
