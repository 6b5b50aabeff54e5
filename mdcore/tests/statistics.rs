#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mdcore::Attributes;
use mdcore::array::{ArrayError, ArrayRef, ArrayViewExt, MdArray, MdArrayExt};
use mdcore::chunk_grid::{ArrayRegion, CheckedRegion};
use mdcore::data_type::{NumericKind, ValueType, copy_value};
use mdcore::dimension::Dimension;
use mdcore::group::MdGroup;
use mdcore::memory::{MemoryGroup, SPATIAL_REF_CONTEXT};
use mdcore::options::StatisticsOptions;
use mdcore::progress::Progress;
use mdcore::statistics::{clear_statistics, compute_statistics, statistics};
use mdcore::storage::store::MemorySidecarStore;
use mdcore::storage::{SidecarKey, SidecarStorageTraits, SpatialRef};
use serde_json::json;

fn array_with_sidecar(sidecar: Arc<MemorySidecarStore>) -> ArrayRef {
    let root = MemoryGroup::new_root_with_sidecar(sidecar);
    let y = root.create_dimension("y", "", "", 3).unwrap();
    let x = root.create_dimension("x", "", "", 4).unwrap();
    let array = root
        .create_array("values", &[y, x], NumericKind::Int32.into())
        .unwrap();
    let elements: Vec<i32> = vec![
        2, 4, 4, 4, //
        5, 5, 7, 9, //
        -1, -1, 100, -1,
    ];
    array
        .write_elements(&ArrayRegion::new(vec![0, 0], vec![3, 4]), &elements)
        .unwrap();
    array.set_nodata_f64(-1.0).unwrap();
    array.set_attribute("valid_max", json!(50)).unwrap();
    array
}

#[test]
fn statistics_compute_chunked() {
    let array = array_with_sidecar(Arc::new(MemorySidecarStore::new()));
    let options = StatisticsOptions {
        force: true,
        // a few elements per chunk
        chunk_memory: Some(27),
    };
    let mut reports = 0;
    let mut callback = |_: f64, _: &str| {
        reports += 1;
        true
    };
    let statistics = compute_statistics(&array, &options, &mut Progress::new(&mut callback)).unwrap();
    assert!(reports > 1);
    assert_eq!(statistics.valid_count, 8);
    assert_eq!(statistics.min, 2.0);
    assert_eq!(statistics.max, 9.0);
    assert!((statistics.mean - 5.0).abs() < 1e-12);
    assert!((statistics.std_dev - 2.0).abs() < 1e-12);
}

#[test]
fn statistics_cached_in_sidecar() {
    let sidecar = Arc::new(MemorySidecarStore::new());
    let array = array_with_sidecar(sidecar.clone());
    let key = SidecarKey::new("/values", "statistics");

    let mut progress = Progress::none();
    assert_eq!(
        statistics(&array, &StatisticsOptions::default(), &mut progress).unwrap(),
        None
    );
    assert!(sidecar.is_empty());

    let options = StatisticsOptions {
        force: true,
        ..Default::default()
    };
    let computed = statistics(&array, &options, &mut progress)
        .unwrap()
        .unwrap();
    assert_eq!(sidecar.get_statistics(&key).unwrap(), Some(computed));

    // cached statistics are returned without reading the array
    let mut cached = computed;
    cached.max = 1000.0;
    sidecar.set_statistics(&key, Some(cached)).unwrap();
    assert_eq!(
        statistics(&array, &StatisticsOptions::default(), &mut progress).unwrap(),
        Some(cached)
    );

    clear_statistics(array.as_ref()).unwrap();
    assert!(sidecar.is_empty());
}

#[test]
fn statistics_of_view() {
    let array = array_with_sidecar(Arc::new(MemorySidecarStore::new()));
    let row = array.view("[1]").unwrap();
    let statistics = compute_statistics(
        &row,
        &StatisticsOptions::default(),
        &mut Progress::none(),
    )
    .unwrap();
    assert_eq!(statistics.valid_count, 4);
    assert_eq!(statistics.min, 5.0);
    assert!((statistics.mean - 6.5).abs() < 1e-12);
}

#[test]
fn statistics_errors() {
    let array = array_with_sidecar(Arc::new(MemorySidecarStore::new()));
    let invalid = array.view("[2]").unwrap();
    assert!(matches!(
        compute_statistics(&invalid, &StatisticsOptions::default(), &mut Progress::none()),
        Err(ArrayError::NoValidData)
    ));

    let mut callback = |_: f64, _: &str| false;
    assert!(matches!(
        compute_statistics(
            &array,
            &StatisticsOptions::default(),
            &mut Progress::new(&mut callback)
        ),
        Err(ArrayError::Aborted)
    ));

    let root = MemoryGroup::new_root();
    let x = root.create_dimension("x", "", "", 2).unwrap();
    let complex = root
        .create_array("c", &[x], NumericKind::ComplexFloat32.into())
        .unwrap();
    assert!(matches!(
        compute_statistics(&complex, &StatisticsOptions::default(), &mut Progress::none()),
        Err(ArrayError::UnsupportedValueType(_))
    ));
}

#[test]
fn spatial_ref_persisted_in_sidecar() {
    let sidecar = Arc::new(MemorySidecarStore::new());
    let array = array_with_sidecar(sidecar.clone());
    let key = SidecarKey::new("/values", SPATIAL_REF_CONTEXT);
    assert!(array.spatial_ref().is_none());

    let srs = SpatialRef::new("EPSG:4326", 2).with_axis_mapping(vec![2, 1]);
    array.set_spatial_ref(Some(srs.clone())).unwrap();
    assert_eq!(sidecar.get_spatial_ref(&key).unwrap(), Some(srs.clone()));
    assert_eq!(array.spatial_ref(), Some(srs));

    // the sidecar is the source of truth
    let utm = SpatialRef::new("EPSG:32631", 2);
    sidecar.set_spatial_ref(&key, Some(utm.clone())).unwrap();
    assert_eq!(array.spatial_ref(), Some(utm));

    array.set_spatial_ref(None).unwrap();
    assert_eq!(sidecar.get_spatial_ref(&key).unwrap(), None);
    assert!(array.spatial_ref().is_none());
    assert!(sidecar.is_empty());
}

/// A float64 array counting the reads of its elements.
#[derive(Debug)]
struct CountingArray {
    dimensions: Vec<Arc<Dimension>>,
    value_type: ValueType,
    values: Vec<f64>,
    reads: AtomicUsize,
}

impl MdArray for CountingArray {
    fn name(&self) -> String {
        "counting".to_string()
    }

    fn full_name(&self) -> String {
        "/counting".to_string()
    }

    fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    fn dimensions(&self) -> Vec<Arc<Dimension>> {
        self.dimensions.clone()
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("missing_value".to_string(), json!(-9.0));
        attributes
    }

    fn read_impl(
        &self,
        region: &CheckedRegion,
        buffer_type: &ValueType,
        buffer: &mut [u8],
    ) -> Result<(), ArrayError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let shape = [self.values.len() as u64];
        for (index, offset) in region.element_offsets(&shape, buffer_type.size()) {
            copy_value(
                &self.values[index].to_ne_bytes(),
                &self.value_type,
                &mut buffer[offset..],
                buffer_type,
            )?;
        }
        Ok(())
    }
}

#[test]
fn statistics_read_each_chunk_once() {
    let values = vec![1.0, -9.0, 3.0, f64::NAN, 5.0, 7.0, -9.0, 9.0, 2.0, 3.0];
    let array = Arc::new(CountingArray {
        dimensions: vec![Dimension::new("/", "x", "", "", values.len() as u64)],
        value_type: NumericKind::Float64.into(),
        values,
        reads: AtomicUsize::new(0),
    });
    let array_ref: ArrayRef = array.clone();
    let options = StatisticsOptions {
        force: true,
        chunk_memory: Some(3 * size_of::<f64>()),
    };
    let mut chunks = 0;
    let mut callback = |_: f64, _: &str| {
        chunks += 1;
        true
    };
    let statistics =
        compute_statistics(&array_ref, &options, &mut Progress::new(&mut callback)).unwrap();
    assert!(chunks > 1);
    assert_eq!(array.reads.load(Ordering::Relaxed), chunks);
    assert_eq!(statistics.valid_count, 7);
    assert_eq!(statistics.min, 1.0);
    assert_eq!(statistics.max, 9.0);
    assert!((statistics.mean - 30.0 / 7.0).abs() < 1e-12);
}
