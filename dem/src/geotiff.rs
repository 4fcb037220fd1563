//! Single-band GeoTIFF reading and writing.

use crate::{Crs, DemError, DemTile, GeoTransform};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Seek, Write},
    path::Path,
};
use tiff::{
    decoder::{Decoder, DecodingResult, Limits},
    encoder::{colortype::Gray32Float, DirectoryEncoder, TiffEncoder, TiffKind},
    tags::Tag,
};

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const MODEL_TRANSFORMATION: Tag = Tag::ModelTransformationTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

impl DemTile {
    /// Reads the first band of the GeoTIFF at `path`.
    pub fn from_geotiff<P: AsRef<Path>>(path: P) -> Result<Self, DemError> {
        let path = path.as_ref();
        let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?.with_limits(limits());

        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);
        let transform = read_transform(&mut decoder)
            .ok_or(DemError::InvalidGeoTiff(path.to_owned(), "no georeferencing"))?;
        let crs = read_crs(&mut decoder)?;
        let nodata = decoder
            .get_tag_ascii_string(GDAL_NODATA)
            .ok()
            .and_then(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').parse().ok());
        let data = decode_samples(decoder.read_image()?);

        if data.len() != width * height {
            return Err(DemError::InvalidGeoTiff(
                path.to_owned(),
                "expected a single band",
            ));
        }

        Ok(DemTile::new(width, height, data, transform, crs, nodata))
    }

    /// Writes this tile as a single-band, 32-bit float GeoTIFF.
    pub fn write_geotiff<P: AsRef<Path>>(&self, path: P) -> Result<(), DemError> {
        let path = path.as_ref();
        if !self.transform().is_north_up() {
            return Err(DemError::InvalidGeoTiff(
                path.to_owned(),
                "rotated transforms are not supported",
            ));
        }
        let mut writer = BufWriter::new(File::create(path)?);
        let (width, height) = self.dimensions();
        {
            let mut encoder = TiffEncoder::new(&mut writer)?;
            #[allow(clippy::cast_possible_truncation)]
            let mut image = encoder.new_image::<Gray32Float>(width as u32, height as u32)?;
            write_geo_tags(self, image.encoder())?;
            image.write_data(self.raw())?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn limits() -> Limits {
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    limits
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(MODEL_TRANSFORMATION) {
        if m.len() >= 8 {
            return Some(GeoTransform {
                origin_x: m[3],
                pixel_width: m[0],
                row_rotation: m[1],
                origin_y: m[7],
                col_rotation: m[4],
                pixel_height: m[5],
            });
        }
    }

    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    if tiepoint.len() < 6 || scale.len() < 2 {
        return None;
    }
    // Tiepoint is [i, j, k, x, y, z]: raster (i, j) sits at model (x, y).
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    Some(GeoTransform::north_up(
        x - i * scale[0],
        y + j * scale[1],
        scale[0],
        scale[1],
    ))
}

/// Finds the EPSG code in the GeoKey directory.
///
/// Tiles without a directory are assumed to be WGS84 lat/lon.
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Crs, DemError> {
    let Ok(keys) = decoder.get_tag_u16_vec(GEO_KEY_DIRECTORY) else {
        return Ok(Crs::default());
    };
    let mut geographic = None;
    let mut projected = None;
    // Header is [version, revision, minor, count], followed by `count`
    // entries of [key, location, count, value]. Location 0 means the
    // value is inline.
    for entry in keys.get(4..).unwrap_or_default().chunks_exact(4) {
        match (entry[0], entry[1]) {
            (GEOGRAPHIC_TYPE_GEO_KEY, 0) => geographic = Some(entry[3]),
            (PROJECTED_CS_TYPE_GEO_KEY, 0) => projected = Some(entry[3]),
            _ => (),
        }
    }
    match projected.or(geographic) {
        None => Ok(Crs::default()),
        Some(code) => Crs::from_epsg(code).ok_or(DemError::UnsupportedCrs(code)),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn decode_samples(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    }
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    tile: &DemTile,
    dir: &mut DirectoryEncoder<'_, W, K>,
) -> Result<(), DemError> {
    let t = tile.transform();
    let scale = [t.pixel_width, -t.pixel_height, 0.0];
    dir.write_tag(MODEL_PIXEL_SCALE, &scale[..])?;
    let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
    dir.write_tag(MODEL_TIEPOINT, &tiepoint[..])?;

    let crs = tile.crs();
    let (model_type, cs_key) = if crs.is_geographic() {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE_GEO_KEY)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_GEO_KEY)
    };
    #[rustfmt::skip]
    let keys = [
        1, 1, 0, 3,
        GT_MODEL_TYPE_GEO_KEY, 0, 1, model_type,
        GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA,
        cs_key, 0, 1, crs.epsg(),
    ];
    dir.write_tag(GEO_KEY_DIRECTORY, &keys[..])?;

    if let Some(nodata) = tile.nodata() {
        dir.write_tag(GDAL_NODATA, nodata.to_string().as_str())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Crs, DemTile, GeoTransform};

    #[test]
    fn test_geotiff_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.tif");
        let mut data: Vec<f32> = (0..12).map(|v| v as f32 * 10.0).collect();
        data[5] = -9999.0;
        let tile = DemTile::new(
            4,
            3,
            data,
            GeoTransform::north_up(-49.6, -9.4, 0.001, 0.001),
            Crs::default(),
            Some(-9999.0),
        );
        tile.write_geotiff(&path).unwrap();

        let read = DemTile::from_geotiff(&path).unwrap();
        assert_eq!(read, tile);
        assert_eq!(read.get(1, 1), None);
        assert_eq!(read.get(3, 2), Some(110.0));
    }

    #[test]
    fn test_web_mercator_crs_survives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merc.tif");
        let tile = DemTile::new(
            2,
            2,
            vec![1.0, 2.0, 3.0, 4.0],
            GeoTransform::north_up(-5_510_000.0, -1_060_000.0, 30.0, 30.0),
            Crs::WebMercator,
            None,
        );
        tile.write_geotiff(&path).unwrap();
        let read = DemTile::from_geotiff(&path).unwrap();
        assert_eq!(read.crs(), Crs::WebMercator);
        assert_eq!(read.nodata(), None);
    }

    #[test]
    fn test_georeferencing_uses_standard_tags() {
        use tiff::{decoder::Decoder, tags::Tag};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.tif");
        let transform = GeoTransform::north_up(-49.6, -9.4, 0.00025, 0.0005);
        DemTile::new(2, 2, vec![0.0; 4], transform, Crs::default(), Some(-32768.0))
            .write_geotiff(&path)
            .unwrap();

        let mut decoder = Decoder::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(
            decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).unwrap(),
            vec![0.00025, 0.0005, 0.0]
        );
        assert_eq!(
            decoder.get_tag_f64_vec(Tag::ModelTiepointTag).unwrap(),
            vec![0.0, 0.0, 0.0, -49.6, -9.4, 0.0]
        );
        assert!(decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).is_ok());
        assert_eq!(
            decoder
                .get_tag_ascii_string(Tag::GdalNodata)
                .unwrap()
                .trim_end_matches('\0'),
            "-32768"
        );

        let read = DemTile::from_geotiff(&path).unwrap();
        assert_eq!(*read.transform(), transform);
        assert_eq!(read.nodata(), Some(-32768.0));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DemTile::from_geotiff(dir.path().join("nope.tif")).is_err());
    }
}
