//! 🪨欢迎光临🫐
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::{Bounds, ClipWindow, MaskParams, PlugMask, Volume, VolumeSlice};
pub use crate::{HeteroError, HeteroResult};

pub use crate::bounds::{BoundsDetector, DetectorParams, SliceSelection};
pub use crate::calibrate::{CalibrationParams, ContrastCalibrator, ContrastReference};
pub use crate::config::RunConfig;
pub use crate::entropy::{Bandwidth, EntropyEstimator, EntropyParams, EntropyRecord};
pub use crate::grid::{Feature, FeatureSet, FeatureTable, GridFeatureExtractor};
pub use crate::pipeline::{run_sample, SampleError, SampleReport, SampleRun, Stage};
pub use crate::rank::{PopulationTable, RankAggregator, RankRecord};

pub use crate::dataset::{self, table};
pub use crate::dataset::{
    home_dataset_dir_with, open_volume, sample_name_from_path, CsvReferenceCorpus, ReferenceCorpus,
    VolumeSource,
};
