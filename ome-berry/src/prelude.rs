//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{BinaryMask, Idx2d, Shape5d};

pub use crate::data::{LabelMap, MaskStack, Volume};
pub use crate::error::{PipelineError, PipelineResult};

pub use crate::consts::channel::{BRIGHTFIELD, NUCLEI, VIRUS};
pub use crate::consts::{ElemType, BACKGROUND_LABEL, DEFAULT_SIGMA};

pub use crate::pipeline::{measure_infection, segment, segment_frame, TimeSelection};

#[cfg(feature = "rayon")]
pub use crate::pipeline::par_segment;

pub use crate::measure::{classify_infected, measure_regions, MeasurementTable, RegionRecord};

pub use crate::render::{DisplayWindow, ImgWriteRaw, ImgWriteVis};

pub use crate::store::home_store_dir_with;
pub use crate::store::{self, StoreError};
