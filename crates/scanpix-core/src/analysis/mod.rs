//! Content analysis: statistics gathered over a buffer, some of which
//! feed a second correction pass.

pub mod blank;
pub mod column_color;
pub mod logical_format;
pub mod rmse;
pub mod white_black;

pub use blank::{BlankReport, detect_blank};
pub use column_color::{
    ColumnCalibration, apply_column_calibration, calibrate_columns, measure_columns,
};
pub use logical_format::{LogicalPixelFormat, logical_format};
pub use rmse::rmse;
pub use white_black::{
    LevelsMode, LevelsOutcome, Peak, WhiteBlackPoints, correct_white_black, find_peaks,
    find_white_black, luma_histogram,
};
