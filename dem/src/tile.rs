use crate::Crs;
use geo::geometry::Point;

/// Affine grid-to-CRS transform in GDAL order.
///
/// `x = origin_x + col * pixel_width + row * row_rotation`
/// `y = origin_y + col * col_rotation + row * pixel_height`
///
/// `(col, row)` are fractional, `(0.0, 0.0)` being the outer corner of
/// the first cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// A north-up transform whose top-left corner is `(west, north)`.
    pub fn north_up(west: f64, north: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x: west,
            pixel_width,
            row_rotation: 0.0,
            origin_y: north,
            col_rotation: 0.0,
            pixel_height: -pixel_height.abs(),
        }
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }
}

/// A rectangular grid of elevation samples (meters).
#[derive(Debug, Clone, PartialEq)]
pub struct DemTile {
    /// Number of columns.
    width: usize,

    /// Number of rows.
    height: usize,

    /// Samples in row-major order, row 0 first.
    data: Vec<f32>,

    transform: GeoTransform,

    crs: Crs,

    /// Samples equal to this carry no elevation.
    nodata: Option<f32>,
}

impl DemTile {
    /// # Panics
    ///
    /// Panics if `data.len() != width * height`.
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f32>,
        transform: GeoTransform,
        crs: Crs,
        nodata: Option<f32>,
    ) -> Self {
        assert_eq!(data.len(), width * height, "DEM grid size mismatch");
        Self {
            width,
            height,
            data,
            transform,
            crs,
            nodata,
        }
    }

    /// Returns `(columns, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    /// Returns the sample at `(col, row)`, or `None` if it is outside
    /// the grid or holds no data.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let value = self.data[row * self.width + col];
        if self.is_nodata(value) {
            None
        } else {
            Some(value)
        }
    }

    pub fn is_nodata(&self, value: f32) -> bool {
        value.is_nan() || self.nodata.map_or(false, |nodata| value == nodata)
    }

    /// Lat/lon of the center of cell `(col, row)`, whatever the
    /// native CRS.
    pub fn cell_center(&self, col: usize, row: usize) -> Point<f64> {
        #[allow(clippy::cast_precision_loss)]
        let (x, y) = self.transform.apply(col as f64 + 0.5, row as f64 + 0.5);
        let (lon, lat) = self.crs.to_lon_lat(x, y);
        Point::new(lon, lat)
    }

    /// Returns the lowest and highest valid samples.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| !self.is_nodata(*v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{DemTile, GeoTransform};
    use crate::Crs;
    use approx::assert_relative_eq;

    fn tile() -> DemTile {
        #[rustfmt::skip]
        let data = vec![
            1.0, 2.0, 3.0,
            4.0, -9999.0, 6.0,
        ];
        DemTile::new(
            3,
            2,
            data,
            GeoTransform::north_up(-50.0, -9.0, 0.5, 0.5),
            Crs::default(),
            Some(-9999.0),
        )
    }

    #[test]
    fn test_get() {
        let tile = tile();
        assert_eq!(tile.get(2, 0), Some(3.0));
        assert_eq!(tile.get(0, 1), Some(4.0));
        assert_eq!(tile.get(1, 1), None);
        assert_eq!(tile.get(3, 0), None);
        assert_eq!(tile.get(0, 2), None);
    }

    #[test]
    fn test_cell_center() {
        let tile = tile();
        let center = tile.cell_center(0, 0);
        assert_relative_eq!(center.x(), -49.75);
        assert_relative_eq!(center.y(), -9.25);
        let center = tile.cell_center(2, 1);
        assert_relative_eq!(center.x(), -48.75);
        assert_relative_eq!(center.y(), -9.75);
    }

    #[test]
    fn test_min_max_skips_nodata() {
        assert_eq!(tile().min_max(), Some((1.0, 6.0)));
    }
}
