//! Prelude for commonly used types and traits in term-profile.

pub use crate::accumulators::{
    AccumulatorState, CovarianceAccumulator, FrequencyCounter, FrequencyEntry, MomentAccumulator,
    P2Quantile, ReservoirSampler,
};
pub use crate::error::{ProfileError, Result};
pub use crate::logging::LogConfig;
pub use crate::profiler::{
    ColumnProfile, DatasetProfile, PairProfile, ParallelProfiler, ProfilerConfig, ProfilerPhase,
    ProgressEvent, StreamingProfiler, Termination,
};
pub use crate::sampling::{AnalysisTask, ChunkPlan, SamplingMethod, SamplingStrategy};
pub use crate::sources::{ArrowBatchSource, RecordSource, VecSource};
pub use crate::value::{ColumnType, ColumnValue, DatasetSchema, Record, RowCountHint};
