use crate::tracking::domain::tracker_config::ConfigError;

/// True when the frame at `frame_index` needs a fresh detector pass.
///
/// Frame 0 always detects. An `interval` of 0 is treated as 1.
pub fn should_detect(frame_index: usize, interval: usize) -> bool {
    frame_index % interval.max(1) == 0
}

/// Runs the detector every `interval` frames; frames in between reuse the
/// previous frame's boxes.
///
/// Detection dominates per-frame cost. Between passes, inter-frame motion
/// is assumed small enough that the last resolved boxes still frame the
/// heads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectionSchedule {
    interval: usize,
}

impl DetectionSchedule {
    pub fn new(interval: usize) -> Result<Self, ConfigError> {
        if interval < 1 {
            return Err(ConfigError::ZeroInterval(interval));
        }
        Ok(Self { interval })
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn should_detect(&self, frame_index: usize) -> bool {
        should_detect(frame_index, self.interval)
    }

    /// Number of detector passes over a sequence of `frames` frames.
    pub fn passes(&self, frames: usize) -> usize {
        frames.div_ceil(self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_interval_1_detects_every_frame() {
        let schedule = DetectionSchedule::new(1).unwrap();
        assert!((0..50).all(|i| schedule.should_detect(i)));
    }

    #[rstest]
    #[case(8)]
    #[case(3)]
    #[case(25)]
    fn test_detects_iff_multiple_of_interval(#[case] interval: usize) {
        let schedule = DetectionSchedule::new(interval).unwrap();
        for i in 0..100 {
            assert_eq!(schedule.should_detect(i), i % interval == 0, "frame {i}");
        }
    }

    #[test]
    fn test_frame_zero_always_detects() {
        for interval in 1..20 {
            assert!(should_detect(0, interval));
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert_eq!(DetectionSchedule::new(0), Err(ConfigError::ZeroInterval(0)));
    }

    #[test]
    fn test_free_function_treats_zero_as_one() {
        assert!(should_detect(7, 0));
    }

    #[rstest]
    #[case(10, 8, 2)]
    #[case(8, 8, 1)]
    #[case(9, 1, 9)]
    #[case(0, 4, 0)]
    fn test_passes(#[case] frames: usize, #[case] interval: usize, #[case] expected: usize) {
        let schedule = DetectionSchedule::new(interval).unwrap();
        assert_eq!(schedule.passes(frames), expected);
    }
}
