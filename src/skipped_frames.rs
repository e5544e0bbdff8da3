use crate::types::FrameIntervals;

// Count intentionally skipped frames based on log sampling rate
pub fn count_intentionally_skipped_frames(
    last_iteration: Option<u64>,
    intervals: &FrameIntervals,
) -> u64 {
    // Nothing to skip before the first main frame
    let Some(last_iteration) = last_iteration else {
        return 0;
    };

    // The sampling pattern repeats every I interval, so a longer gap is impossible
    let limit = intervals.i_interval.max(1) as u64;

    let mut count = 0;
    let mut frame_index = last_iteration.wrapping_add(1);
    while count < limit && !should_have_frame(frame_index, intervals) {
        count += 1;
        frame_index = frame_index.wrapping_add(1);
    }

    count
}

// Determine if a frame should exist based on the log sampling rate
pub fn should_have_frame(frame_index: u64, intervals: &FrameIntervals) -> bool {
    // (frameIndex % I + Pnum - 1) % Pdenom < Pnum
    let i_interval = intervals.i_interval.max(1) as u64;
    let p_num = intervals.p_num as u64;
    let p_denom = intervals.p_denom.max(1) as u64;

    let mod_i = frame_index % i_interval;
    let sum = (mod_i + p_num).wrapping_sub(1);
    sum % p_denom < p_num
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals(i_interval: u32, p_num: u32, p_denom: u32) -> FrameIntervals {
        FrameIntervals {
            i_interval,
            p_num,
            p_denom,
        }
    }

    #[test]
    fn test_every_frame_logged_by_default() {
        let defaults = FrameIntervals::default();
        for i in 0..100 {
            assert!(should_have_frame(i, &defaults));
        }
        assert_eq!(count_intentionally_skipped_frames(Some(10), &defaults), 0);
        assert_eq!(count_intentionally_skipped_frames(None, &defaults), 0);
    }

    #[test]
    fn test_half_rate_skips_every_other() {
        let half = intervals(32, 1, 2);
        assert!(should_have_frame(0, &half));
        assert!(!should_have_frame(1, &half));
        assert!(should_have_frame(2, &half));
        assert_eq!(count_intentionally_skipped_frames(Some(0), &half), 1);
        assert_eq!(count_intentionally_skipped_frames(Some(2), &half), 1);
    }

    #[test]
    fn test_quarter_rate() {
        let quarter = intervals(32, 1, 4);
        assert_eq!(count_intentionally_skipped_frames(Some(0), &quarter), 3);
        // iteration 31 -> 32 wraps to the next I interval
        assert_eq!(count_intentionally_skipped_frames(Some(28), &quarter), 3);
    }
}
