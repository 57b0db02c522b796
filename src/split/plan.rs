use tracing::debug;

use crate::error::{Result, SplitError};

use super::{CutPointSet, Segment};

/// Container extension of every output file.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// File name of the `index`-th (1-based) part, e.g. `clip_01.mp4`.
pub fn output_name(prefix: &str, index: usize) -> String {
    format!("{}_{:02}.{}", prefix, index, OUTPUT_EXTENSION)
}

/// Turn consecutive cut points into numbered segments.
///
/// Each segment ends exactly where the next one starts.
pub fn plan(cuts: &CutPointSet, prefix: &str) -> Result<Vec<Segment>> {
    validate_prefix(prefix)?;

    let segments: Vec<Segment> = cuts
        .points()
        .windows(2)
        .enumerate()
        .map(|(i, pair)| Segment {
            index: i + 1,
            start: pair[0],
            end: pair[1],
            output_name: output_name(prefix, i + 1),
        })
        .collect();

    debug!("Planned {} segments with prefix '{}'", segments.len(), prefix);
    Ok(segments)
}

pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(SplitError::InvalidArgument(
            "Output file prefix must not be empty".to_string(),
        ));
    }
    if prefix.contains(['/', '\\']) {
        return Err(SplitError::InvalidArgument(format!(
            "Output file prefix must not contain path separators: {prefix}"
        )));
    }
    Ok(())
}
