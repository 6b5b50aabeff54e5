#![allow(missing_docs)]

use std::sync::Arc;

use mdcore::array::{ArrayError, MdArray, MdArrayExt};
use mdcore::chunk_grid::{ArrayRegion, CheckedRegion};
use mdcore::data_type::{NumericKind, ValueType};
use mdcore::dimension::{Dimension, DimensionError};
use mdcore::group::{GroupRef, MdGroup};
use mdcore::memory::MemoryGroup;

/// A read-only array of zeros that cannot be resized.
#[derive(Debug)]
struct FixedArray {
    dimensions: Vec<Arc<Dimension>>,
    value_type: ValueType,
}

impl MdArray for FixedArray {
    fn name(&self) -> String {
        "fixed".to_string()
    }

    fn full_name(&self) -> String {
        "/fixed".to_string()
    }

    fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    fn dimensions(&self) -> Vec<Arc<Dimension>> {
        self.dimensions.clone()
    }

    fn read_impl(
        &self,
        _region: &CheckedRegion,
        _buffer_type: &ValueType,
        buffer: &mut [u8],
    ) -> Result<(), ArrayError> {
        buffer.fill(0);
        Ok(())
    }
}

#[test]
fn dimension_resize_ignores_deleted_arrays() {
    let root: GroupRef = MemoryGroup::new_root();
    let x = root.create_dimension("x", "", "", 2).unwrap();
    let a = root
        .create_array("a", &[x.clone()], NumericKind::Int32.into())
        .unwrap();
    let b = root
        .create_array("b", &[x.clone()], NumericKind::Int32.into())
        .unwrap();
    a.write_elements(&ArrayRegion::new(vec![0], vec![2]), &[1i32, 2])
        .unwrap();
    root.delete_array("b").unwrap();

    x.resize(4).unwrap();
    assert_eq!(x.size(), 4);
    assert_eq!(a.shape(), vec![4]);
    assert_eq!(a.read_all_elements::<i32>().unwrap(), vec![1, 2, 0, 0]);
    assert!(matches!(
        b.read_all_elements::<i32>(),
        Err(ArrayError::InvalidHandle(_))
    ));
}

#[test]
fn dimension_resize_failure_restores_arrays() {
    testing_logger::setup();
    let root: GroupRef = MemoryGroup::new_root();
    let x = root.create_dimension("x", "", "", 2).unwrap();
    let a = root
        .create_array("a", &[x.clone()], NumericKind::Int32.into())
        .unwrap();
    a.write_elements(&ArrayRegion::new(vec![0], vec![2]), &[5i32, 6])
        .unwrap();
    let fixed: Arc<dyn MdArray> = Arc::new(FixedArray {
        dimensions: vec![x.clone()],
        value_type: NumericKind::UInt8.into(),
    });
    x.register_user(Arc::downgrade(&fixed));

    assert!(matches!(
        x.resize(3),
        Err(DimensionError::Resize(err)) if matches!(*err, ArrayError::UnsupportedMethod(_))
    ));
    assert_eq!(x.size(), 2);
    assert_eq!(a.shape(), vec![x.size()]);
    assert_eq!(a.read_all_elements::<i32>().unwrap(), vec![5, 6]);
    testing_logger::validate(|captured_logs| {
        assert!(captured_logs.iter().all(|log| log.level != log::Level::Warn));
    });
}
