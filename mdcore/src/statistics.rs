//! Array statistics.
//!
//! Statistics are computed in a single pass over processing chunks, restricted to the elements that a [`MaskedArray`] marks as valid.
//! Each chunk is read once in the value type of the array and validity is evaluated on the same elements.
//! The standard deviation is the population standard deviation.
//!
//! [`statistics`] caches results in the [sidecar storage](crate::array::MdArray::sidecar) of the array when it has one.

use crate::array::{ArrayError, ArrayRef, MaskedArray, MdArray};
use crate::chunk_grid::{ArrayRegion, ArraySubset, ChunkWalker, chunk_size_for_budget};
use crate::config::global_config;
use crate::data_type::NumericValue;
use crate::options::{MaskOptions, StatisticsOptions};
use crate::progress::Progress;
use crate::storage::{SidecarKey, Statistics};

/// The sidecar context of cached statistics.
const STATISTICS_CONTEXT: &str = "statistics";

/// A running accumulator of count, extrema, mean and sum of squared deviations.
#[derive(Clone, Copy, Debug)]
struct Welford {
    count: u64,
    min: f64,
    max: f64,
    mean: f64,
    m2: f64,
}

impl Default for Welford {
    fn default() -> Self {
        Self {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            m2: 0.0,
        }
    }
}

impl Welford {
    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> Option<Statistics> {
        (self.count > 0).then(|| Statistics {
            min: self.min,
            max: self.max,
            mean: self.mean,
            std_dev: (self.m2 / self.count as f64).sqrt(),
            valid_count: self.count,
        })
    }
}

fn sidecar_key(array: &dyn MdArray) -> SidecarKey {
    SidecarKey::new(array.full_name(), STATISTICS_CONTEXT)
}

/// Compute the statistics of the valid elements of `array`.
///
/// # Errors
/// Returns an [`ArrayError`] if
///  - `array` is not real numeric ([`ArrayError::UnsupportedValueType`]),
///  - a read fails,
///  - there are no valid elements ([`ArrayError::NoValidData`]), or
///  - `progress` aborts the computation ([`ArrayError::Aborted`]).
pub fn compute_statistics(
    array: &ArrayRef,
    options: &StatisticsOptions,
    progress: &mut Progress,
) -> Result<Statistics, ArrayError> {
    array.check_valid()?;
    let Some(kind) = array
        .value_type()
        .numeric_kind()
        .filter(|kind| !kind.is_complex())
    else {
        return Err(ArrayError::UnsupportedValueType(Box::new(
            array.value_type().clone(),
        )));
    };
    let shape = array.shape();
    if shape.contains(&0) {
        return Err(ArrayError::NoValidData);
    }
    let mask = MaskedArray::new(array.clone(), &MaskOptions::default())?;

    let chunk_shape = chunk_size_for_budget(
        &shape,
        &array.block_size(),
        kind.size(),
        options.chunk_memory(),
        global_config().default_block_size(),
    )?;
    log::debug!(
        "computing statistics of {} with chunk shape {chunk_shape:?}",
        array.full_name()
    );

    let value_type = array.value_type().clone();
    let mut bytes: Vec<u8> = Vec::new();
    let mut accumulator = Welford::default();
    let mut walker = ChunkWalker::new(&ArraySubset::new_with_shape(shape), &chunk_shape)?;
    let completed = walker.walk(|visit| -> Result<bool, ArrayError> {
        let region = ArrayRegion::try_from(&visit.subset)?;
        let len = region
            .num_elements()
            .and_then(|num_elements| num_elements.checked_mul(kind.size()))
            .ok_or_else(|| ArrayError::Other("chunk has too many elements".to_string()))?;
        bytes.resize(len, 0);
        array.read(&region, &value_type, &mut bytes)?;
        for element in bytes.chunks_exact(kind.size()) {
            let value = NumericValue::read(kind, element)?;
            if mask.is_valid_value(value) {
                accumulator.push(value.to_f64());
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = (visit.index + 1) as f64 / visit.total as f64;
        Ok(progress.report(fraction, "computing statistics"))
    })?;
    if !completed {
        return Err(ArrayError::Aborted);
    }
    accumulator.finish().ok_or(ArrayError::NoValidData)
}

/// Get the statistics of `array`.
///
/// Cached statistics are returned from the sidecar storage of `array` if present.
/// Otherwise, if [`StatisticsOptions::force`] is set, the statistics are computed with [`compute_statistics`] and cached.
/// Returns [`None`] if there are no cached statistics and `force` is not set.
///
/// # Errors
/// Returns an [`ArrayError`] if the sidecar storage fails or the statistics cannot be computed.
pub fn statistics(
    array: &ArrayRef,
    options: &StatisticsOptions,
    progress: &mut Progress,
) -> Result<Option<Statistics>, ArrayError> {
    array.check_valid()?;
    let sidecar = array.sidecar();
    let key = sidecar_key(array.as_ref());
    if let Some(sidecar) = &sidecar
        && let Some(statistics) = sidecar.get_statistics(&key)?
    {
        log::debug!("using cached statistics {key}");
        return Ok(Some(statistics));
    }
    if !options.force {
        return Ok(None);
    }
    let statistics = compute_statistics(array, options, progress)?;
    if let Some(sidecar) = &sidecar {
        sidecar.set_statistics(&key, Some(statistics))?;
    }
    Ok(Some(statistics))
}

/// Clear the cached statistics of `array`.
///
/// # Errors
/// Returns an [`ArrayError`] if the sidecar storage fails.
pub fn clear_statistics(array: &dyn MdArray) -> Result<(), ArrayError> {
    if let Some(sidecar) = array.sidecar() {
        sidecar.set_statistics(&sidecar_key(array), None)?;
    }
    Ok(())
}
