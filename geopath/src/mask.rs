use anyhow::Result;
use geo::{Geometry, GeometryCollection, Polygon};
use geojson::{quick_collection, GeoJson};
use std::{fs::File, io::BufReader, path::Path};

/// Reads the polygons of a GeoJSON file.
///
/// Multipolygons are split into their parts and any other geometry is
/// ignored.
pub fn open(maybe_path: Option<&Path>) -> Result<Vec<Polygon<f64>>> {
    match maybe_path {
        None => Ok(Vec::new()),
        Some(path) => {
            let mask_file = BufReader::new(File::open(path)?);
            let mask_json = GeoJson::from_reader(mask_file)?;
            let mask: GeometryCollection<f64> = quick_collection(&mask_json)?;
            Ok(polygons(mask))
        }
    }
}

fn polygons(collection: GeometryCollection<f64>) -> Vec<Polygon<f64>> {
    collection
        .into_iter()
        .flat_map(|geometry| match geometry {
            Geometry::Polygon(polygon) => vec![polygon],
            Geometry::MultiPolygon(multi) => multi.0,
            Geometry::GeometryCollection(inner) => polygons(inner),
            _ => Vec::new(),
        })
        .collect()
}
