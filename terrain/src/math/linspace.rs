use num_traits::{Float, FromPrimitive};

/// Returns `n` evenly spaced values from `y_start` to `y_end`, both
/// inclusive.
///
/// `n` must be at least 2.
pub fn linspace<T>(y_start: T, y_end: T, n: usize) -> impl Iterator<Item = T>
where
    T: Float + FromPrimitive,
{
    let dy = (y_end - y_start) / T::from(n - 1).unwrap();
    (0..n).map(move |x| {
        // Pin the last value so callers can rely on exact endpoints.
        if x + 1 == n {
            y_end
        } else {
            y_start + T::from(x).unwrap() * dy
        }
    })
}

#[cfg(test)]
mod tests {
    use super::linspace;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints() {
        let values: Vec<f64> = linspace(100.0, 120.0, 5).collect();
        assert_eq!(values.len(), 5);
        assert_relative_eq!(values[0], 100.0);
        assert_relative_eq!(values[2], 110.0);
        assert_relative_eq!(values[4], 120.0);
    }

    #[test]
    fn test_linspace_descending() {
        let values: Vec<f64> = linspace(1.0, -1.0, 3).collect();
        assert_eq!(values, vec![1.0, 0.0, -1.0]);
    }
}
