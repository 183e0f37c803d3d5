//! Shared utility functions and traits

/// Extension trait for tracking minimum and maximum values in `Option<T>`.
///
/// Works for any `PartialOrd` value, so reaction times in `f64` can be
/// folded without `map().unwrap_or()` chains. Incomparable values (NaN)
/// never replace an existing bound.
///
/// # Example
///
/// ```
/// use cognitive_battery::utils::MinMaxExt;
///
/// let mut fastest: Option<f64> = None;
/// let mut slowest: Option<f64> = None;
///
/// for rt in [312.0, 287.5, 540.0] {
///     fastest.update_min(rt);
///     slowest.update_max(rt);
/// }
/// assert_eq!(fastest, Some(287.5));
/// assert_eq!(slowest, Some(540.0));
/// ```
pub trait MinMaxExt<T: PartialOrd + Copy> {
    /// Store `value` if it is smaller than the current minimum or none exists
    fn update_min(&mut self, value: T);

    /// Store `value` if it is larger than the current maximum or none exists
    fn update_max(&mut self, value: T);
}

impl<T: PartialOrd + Copy> MinMaxExt<T> for Option<T> {
    fn update_min(&mut self, value: T) {
        if self.map_or(true, |current| value < current) {
            *self = Some(value);
        }
    }

    fn update_max(&mut self, value: T) {
        if self.map_or(true, |current| value > current) {
            *self = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_min_from_none() {
        let mut min: Option<f64> = None;
        min.update_min(100.0);
        assert_eq!(min, Some(100.0));
    }

    #[test]
    fn update_min_keeps_smaller_value() {
        let mut min: Option<f64> = Some(50.0);
        min.update_min(100.0);
        assert_eq!(min, Some(50.0));
        min.update_min(20.0);
        assert_eq!(min, Some(20.0));
    }

    #[test]
    fn update_max_keeps_larger_value() {
        let mut max: Option<f64> = None;
        max.update_max(200.0);
        max.update_max(100.0);
        assert_eq!(max, Some(200.0));
    }

    #[test]
    fn nan_does_not_replace_a_bound() {
        let mut min: Option<f64> = Some(300.0);
        let mut max: Option<f64> = Some(300.0);
        min.update_min(f64::NAN);
        max.update_max(f64::NAN);
        assert_eq!(min, Some(300.0));
        assert_eq!(max, Some(300.0));
    }

    #[test]
    fn integers_still_work() {
        let mut min: Option<i32> = None;
        let mut max: Option<i32> = None;
        for value in [50, 30, 70, 20, 80, 40] {
            min.update_min(value);
            max.update_max(value);
        }
        assert_eq!(min, Some(20));
        assert_eq!(max, Some(80));
    }
}
