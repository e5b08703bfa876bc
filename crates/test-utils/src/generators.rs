//! Predictable value generators for synthetic sampling geometries.
//!
//! These generators create verifiable patterns so expanded tables can be
//! checked cell by cell.

/// Creates instance-major test values.
///
/// Each cell value is calculated as: `instance * 1000 + element`
///
/// This makes it easy to verify broadcasting: after expansion, row `k`
/// must hold `(k / elements) * 1000 + k % elements`.
///
/// # Example
///
/// ```
/// use test_utils::create_test_series;
///
/// let data = create_test_series(3, 4);
/// assert_eq!(data.len(), 12);
/// assert_eq!(data[0], 0.0);
/// assert_eq!(data[5], 1001.0); // instance 1, element 1
/// ```
pub fn create_test_series(instances: usize, elements: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(instances * elements);
    for instance in 0..instances {
        for element in 0..elements {
            data.push((instance * 1000 + element) as f64);
        }
    }
    data
}

/// Depth levels `0, step, 2 * step, ...` in meters.
pub fn create_depth_levels(count: usize, step: f64) -> Vec<f64> {
    (0..count).map(|i| i as f64 * step).collect()
}

/// Sea water temperature in degC, cooling with depth and warming slightly
/// from one profile to the next.
pub fn create_temperature_profiles(profiles: usize, depths: &[f64]) -> Vec<f64> {
    let mut data = Vec::with_capacity(profiles * depths.len());
    for p in 0..profiles {
        for depth in depths {
            data.push(20.0 + p as f64 * 0.5 - depth * 0.1);
        }
    }
    data
}

/// Offsets in seconds for `count` hourly samples starting at `start`.
pub fn create_hourly_times(start: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + i as f64 * 3600.0).collect()
}

/// Replace every cell of `instance` with `fill`, for `(instances, elements)`
/// row-major data.
pub fn mask_instance(data: &mut [f64], elements: usize, instance: usize, fill: f64) {
    let start = instance * elements;
    for cell in data.iter_mut().skip(start).take(elements) {
        *cell = fill;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_series() {
        let data = create_test_series(2, 3);
        assert_eq!(data, vec![0.0, 1.0, 2.0, 1000.0, 1001.0, 1002.0]);
    }

    #[test]
    fn test_create_depth_levels() {
        assert_eq!(create_depth_levels(4, 2.5), vec![0.0, 2.5, 5.0, 7.5]);
    }

    #[test]
    fn test_temperature_profiles_cool_with_depth() {
        let depths = create_depth_levels(5, 10.0);
        let data = create_temperature_profiles(2, &depths);
        assert_eq!(data.len(), 10);
        assert!(data[0] > data[4]);
        assert!(data[5] > data[0]);
    }

    #[test]
    fn test_hourly_times() {
        assert_eq!(create_hourly_times(60.0, 3), vec![60.0, 3660.0, 7260.0]);
    }

    #[test]
    fn test_mask_instance() {
        let mut data = create_test_series(3, 2);
        mask_instance(&mut data, 2, 1, -1.0);
        assert_eq!(data, vec![0.0, 1.0, -1.0, -1.0, 2000.0, 2001.0]);
    }
}
