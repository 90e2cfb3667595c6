//! Progress Reporter.

use chrono::{DateTime, Utc};
use folio_core::{Progress, ProgressStage};

/// Computes progress records for a running batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressReporter;

impl ProgressReporter {
    /// Build the progress record for one pipeline phase.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use folio_core::ProgressStage;
    /// use folio_engine::ProgressReporter;
    ///
    /// let progress = ProgressReporter::report(
    ///     1,
    ///     ProgressStage::RenderingImage,
    ///     1,
    ///     3,
    ///     Some("Page 4".to_string()),
    ///     Utc::now(),
    /// );
    /// assert_eq!(progress.percentage, 33);
    /// ```
    pub fn report(
        batch_id: u64,
        label: ProgressStage,
        current: u32,
        total: u32,
        substep: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Progress {
        let elapsed_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        Progress {
            batch_id,
            current,
            total,
            label,
            substep,
            percentage: Self::percentage(current, total),
            started_at,
            elapsed_ms,
        }
    }

    /// Rounded completion percentage, 0 for an empty batch and never above 100.
    pub fn percentage(current: u32, total: u32) -> u8 {
        if total == 0 {
            return 0;
        }
        let (current, total) = (u64::from(current), u64::from(total));
        let rounded = (200 * current + total) / (2 * total);
        rounded.min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(ProgressReporter::percentage(0, 0), 0);
        assert_eq!(ProgressReporter::percentage(0, 2), 0);
        assert_eq!(ProgressReporter::percentage(1, 2), 50);
        assert_eq!(ProgressReporter::percentage(2, 3), 67);
        assert_eq!(ProgressReporter::percentage(1, 8), 13);
        assert_eq!(ProgressReporter::percentage(3, 3), 100);
        assert_eq!(ProgressReporter::percentage(5, 3), 100);
    }

    #[test]
    fn test_elapsed_is_non_negative() {
        let future = Utc::now() + chrono::Duration::seconds(30);
        let progress = ProgressReporter::report(1, ProgressStage::Preparing, 0, 1, None, future);
        assert_eq!(progress.elapsed_ms, 0);
    }
}
