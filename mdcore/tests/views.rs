#![allow(missing_docs)]

use mdcore::array::{ArrayError, ArrayRef, ArrayViewExt, MdArrayExt};
use mdcore::chunk_grid::ArrayRegion;
use mdcore::data_type::{CompoundComponent, CompoundType, NumericKind, ValueType};
use mdcore::group::MdGroup;
use mdcore::memory::MemoryGroup;
use mdcore::options::{MaskOptions, UnscaleOptions};
use mdcore::storage::SpatialRef;
use serde_json::json;

fn array_with_elements<T: mdcore::array::Element>(
    shape: &[u64],
    kind: NumericKind,
    elements: &[T],
) -> ArrayRef {
    let root = MemoryGroup::new_root();
    let dimensions = shape
        .iter()
        .enumerate()
        .map(|(axis, &size)| {
            root.create_dimension(&format!("dim{axis}"), "", "", size)
                .unwrap()
        })
        .collect::<Vec<_>>();
    let array = root.create_array("a", &dimensions, kind.into()).unwrap();
    array
        .write_elements(&ArrayRegion::new_with_shape(shape).unwrap(), elements)
        .unwrap();
    array
}

#[test]
fn view_slice_step() {
    let array = array_with_elements(&[8], NumericKind::Int32, &[0i32, 1, 2, 3, 4, 5, 6, 7]);
    let view = array.view("[2:6:2]").unwrap();
    assert_eq!(view.shape(), vec![2]);
    assert_eq!(view.read_all_elements::<i32>().unwrap(), vec![2, 4]);
    assert_eq!(view.full_name(), "/a[2:6:2]");

    let reversed = array.view("[::-1]").unwrap();
    assert_eq!(
        reversed.read_all_elements::<i32>().unwrap(),
        vec![7, 6, 5, 4, 3, 2, 1, 0]
    );
    // a full range shares the parent dimension
    let full = array.view("[:]").unwrap();
    assert!(std::sync::Arc::ptr_eq(
        &full.dimensions()[0],
        &array.dimensions()[0]
    ));
}

#[test]
fn view_slice_index_and_newaxis() {
    let elements: Vec<i32> = (0..12).collect();
    let array = array_with_elements(&[3, 4], NumericKind::Int32, &elements);

    let row = array.view("[1]").unwrap();
    assert_eq!(row.shape(), vec![4]);
    assert_eq!(row.read_all_elements::<i32>().unwrap(), vec![4, 5, 6, 7]);

    let column = array.view("[..., -1]").unwrap();
    assert_eq!(column.read_all_elements::<i32>().unwrap(), vec![3, 7, 11]);

    let expanded = array.view("[newaxis, 0:2]").unwrap();
    assert_eq!(expanded.shape(), vec![1, 2, 4]);
    assert_eq!(
        expanded.read_all_elements::<i32>().unwrap(),
        (0..8).collect::<Vec<i32>>()
    );

    let scalar = array.view("[2][3]").unwrap();
    assert_eq!(scalar.dimensionality(), 0);
    assert_eq!(scalar.read_all_elements::<i32>().unwrap(), vec![11]);
}

#[test]
fn view_slice_invalid() {
    let array = array_with_elements(&[8], NumericKind::Int32, &[0i32; 8]);
    for expression in ["[5:5]", "[8]", "[0, 0]", "[::0]", "[...,...]", "[", "[\"x\"]"] {
        assert!(array.view(expression).is_err(), "{expression}");
    }
    assert!(matches!(
        array.view("[3:1]"),
        Err(ArrayError::InvalidViewExpression { .. })
    ));
}

#[test]
fn view_slice_write() {
    let array = array_with_elements(&[6], NumericKind::Int16, &[0i16; 6]);
    let view = array.view("[1::2]").unwrap();
    view.write_elements(&ArrayRegion::new(vec![0], vec![3]), &[1i16, 2, 3])
        .unwrap();
    assert_eq!(
        array.read_all_elements::<i16>().unwrap(),
        vec![0, 1, 0, 2, 0, 3]
    );
}

#[test]
fn view_negative_buffer_stride_round_trip() {
    let array = array_with_elements(&[8], NumericKind::Int32, &(0..8).collect::<Vec<i32>>());
    let view = array.view("[1:5]").unwrap();
    // the caller buffer holds the view elements back to front
    let region = ArrayRegion::new(vec![0], vec![4])
        .with_buffer_stride(vec![-1])
        .with_buffer_offset(3 * size_of::<i32>());
    view.write_elements(&region, &[10i32, 20, 30, 40]).unwrap();
    assert_eq!(
        array.read_all_elements::<i32>().unwrap(),
        vec![0, 40, 30, 20, 10, 5, 6, 7]
    );
    assert_eq!(view.read_elements::<i32>(&region).unwrap(), vec![10, 20, 30, 40]);

    let array = array_with_elements(&[2, 3], NumericKind::Int32, &[0i32; 6]);
    let transposed = array.transpose(&[1, 0]).unwrap();
    // rows of the caller buffer in reverse order
    let region = ArrayRegion::new(vec![0, 0], vec![3, 2])
        .with_buffer_stride(vec![-2, 1])
        .with_buffer_offset(4 * size_of::<i32>());
    transposed
        .write_elements(&region, &[1i32, 2, 3, 4, 5, 6])
        .unwrap();
    assert_eq!(
        array.read_all_elements::<i32>().unwrap(),
        vec![5, 3, 1, 6, 4, 2]
    );
    assert_eq!(
        transposed.read_elements::<i32>(&region).unwrap(),
        vec![1, 2, 3, 4, 5, 6]
    );
}

#[test]
fn view_transpose() {
    let array = array_with_elements(&[2, 3], NumericKind::Int32, &[0i32, 1, 2, 4, 5, 6]);
    let transposed = array.transpose(&[1, 0]).unwrap();
    assert_eq!(transposed.shape(), vec![3, 2]);
    assert_eq!(
        transposed.read_all_elements::<i32>().unwrap(),
        vec![0, 4, 1, 5, 2, 6]
    );

    let inserted = array.transpose(&[-1, 1, 0]).unwrap();
    assert_eq!(inserted.shape(), vec![1, 3, 2]);
    assert_eq!(
        inserted.read_all_elements::<i32>().unwrap(),
        vec![0, 4, 1, 5, 2, 6]
    );

    for mapping in [&[0, 0][..], &[0][..], &[0, 2][..], &[1, 0, -2][..]] {
        assert!(matches!(
            array.transpose(mapping),
            Err(ArrayError::InvalidTransposeMapping { .. })
        ));
    }
}

#[test]
fn view_transpose_spatial_ref() {
    let array = array_with_elements(&[2, 3], NumericKind::UInt8, &[0u8; 6]);
    array
        .set_spatial_ref(Some(SpatialRef::new("EPSG:4326", 2).with_axis_mapping(vec![2, 1])))
        .unwrap();
    let transposed = array.transpose(&[-1, 1, 0]).unwrap();
    assert_eq!(
        transposed
            .spatial_ref()
            .unwrap()
            .data_axis_to_srs_axis_mapping(),
        &[0, 1, 2]
    );
    let sliced = array.view("[0]").unwrap();
    assert_eq!(
        sliced.spatial_ref().unwrap().data_axis_to_srs_axis_mapping(),
        &[1]
    );
}

#[test]
fn view_composition_matches_parent() {
    let elements: Vec<i32> = (0..4)
        .flat_map(|i| (0..5).map(move |j| i * 10 + j))
        .collect();
    let array = array_with_elements(&[4, 5], NumericKind::Int32, &elements);

    let composed = array
        .view("[1:4, ::2]")
        .unwrap()
        .transpose(&[1, 0])
        .unwrap()
        .view("[1:, ::-1]")
        .unwrap();
    assert_eq!(composed.shape(), vec![2, 3]);

    let mut expected = Vec::new();
    for p in 0..2 {
        for q in 0..3 {
            expected.push((3 - q) * 10 + 2 + 2 * p);
        }
    }
    assert_eq!(composed.read_all_elements::<i32>().unwrap(), expected);

    // the same elements read directly from the parent
    let direct: Vec<i32> = array
        .read_elements(
            &ArrayRegion::new(vec![3, 2], vec![3, 2])
                .with_step(vec![-1, 2])
                .with_buffer_stride(vec![1, 3]),
        )
        .unwrap();
    assert_eq!(direct, expected);

    // and a sub-region of the composed view
    let sub: Vec<i32> = composed
        .read_elements(&ArrayRegion::new(vec![1, 1], vec![1, 2]))
        .unwrap();
    assert_eq!(sub, expected[4..6]);
}

#[test]
fn view_unscaled() {
    let array = array_with_elements(&[3], NumericKind::UInt8, &[10u8, 255, 0]);
    array.set_nodata_f64(255.0).unwrap();
    array.set_scale(Some(2.0)).unwrap();
    array.set_offset(Some(1.0)).unwrap();

    let unscaled = array.unscaled(&UnscaleOptions::default()).unwrap();
    assert_eq!(
        unscaled.value_type(),
        &ValueType::from(NumericKind::Float64)
    );
    let values = unscaled.read_all_elements::<f64>().unwrap();
    assert_eq!(values[0], 21.0);
    assert!(values[1].is_nan());
    assert_eq!(values[2], 1.0);
    assert!(unscaled.nodata_as_f64().unwrap().is_nan());

    unscaled
        .write_elements(&ArrayRegion::new(vec![0], vec![3]), &[41.0f64, 5.0, f64::NAN])
        .unwrap();
    assert_eq!(array.read_all_elements::<u8>().unwrap(), vec![20, 2, 255]);

    // round trip of a physical value
    let physical = unscaled.read_all_elements::<f64>().unwrap();
    unscaled
        .write_elements(&ArrayRegion::new(vec![0], vec![3]), &physical)
        .unwrap();
    assert_eq!(array.read_all_elements::<u8>().unwrap(), vec![20, 2, 255]);
}

#[test]
fn view_unscaled_invalid_scale() {
    let array = array_with_elements(&[2], NumericKind::Int16, &[1i16, 2]);
    for scale in [0.0, -0.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            array.unscaled(&UnscaleOptions {
                scale: Some(scale),
                ..Default::default()
            }),
            Err(ArrayError::InvalidScale(_))
        ));
    }
    array.set_scale(Some(0.0)).unwrap();
    assert!(array.unscaled(&UnscaleOptions::default()).is_err());
}

#[test]
fn view_unscaled_options() {
    let array = array_with_elements(&[2], NumericKind::Int16, &[-1i16, 4]);
    array.set_nodata_f64(-1.0).unwrap();
    let unscaled = array
        .unscaled(&UnscaleOptions {
            scale: Some(0.5),
            offset: None,
            nodata: Some(-999.0),
        })
        .unwrap();
    assert_eq!(
        unscaled.read_all_elements::<f64>().unwrap(),
        vec![-999.0, 2.0]
    );
}

#[test]
fn view_mask_integer_all_ones() {
    let array = array_with_elements(&[2, 3], NumericKind::Int16, &[-5i16, 0, 7, 1000, -32768, 3]);
    let mask = array.mask(&MaskOptions::default()).unwrap();
    assert_eq!(mask.value_type(), &ValueType::from(NumericKind::UInt8));
    assert_eq!(mask.read_all_elements::<u8>().unwrap(), vec![1; 6]);
}

#[test]
fn view_mask_attributes() {
    let array = array_with_elements(
        &[6],
        NumericKind::Float32,
        &[1.0f32, f32::NAN, -9999.0, 50.0, 5.0, -1.0],
    );
    array.set_nodata_f64(-9999.0).unwrap();
    array.set_attribute("valid_max", json!(10)).unwrap();
    array.set_attribute("_FillValue", json!([-1.0])).unwrap();
    let mask = array.mask(&MaskOptions::default()).unwrap();
    assert_eq!(
        mask.read_all_elements::<u8>().unwrap(),
        vec![1, 0, 0, 0, 1, 0]
    );
}

#[test]
fn view_mask_flags() {
    let array = array_with_elements(&[4], NumericKind::UInt8, &[0u8, 1, 2, 3]);
    array
        .set_attribute("flag_meanings", json!("clear cloud shadow snow"))
        .unwrap();
    array.set_attribute("flag_values", json!([0, 1, 2, 3])).unwrap();
    let mask = array
        .mask(&MaskOptions {
            allowed_flags: vec!["clear".to_string(), "snow".to_string()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(mask.read_all_elements::<u8>().unwrap(), vec![1, 0, 0, 1]);

    assert!(matches!(
        array.mask(&MaskOptions {
            allowed_flags: vec!["fog".to_string()],
            ..Default::default()
        }),
        Err(ArrayError::InvalidMask(_))
    ));
}

#[test]
fn view_field() {
    let compound = CompoundType::new(
        "sample",
        8,
        vec![
            CompoundComponent::new("value", 0, NumericKind::Float32.into()),
            CompoundComponent::new("count", 4, NumericKind::Int16.into()),
        ],
    )
    .unwrap();
    let value_type = ValueType::from(compound);
    let root = MemoryGroup::new_root();
    let x = root.create_dimension("x", "", "", 2).unwrap();
    let array = root.create_array("a", &[x], value_type.clone()).unwrap();

    let mut bytes = vec![0u8; 16];
    bytes[0..4].copy_from_slice(&1.5f32.to_ne_bytes());
    bytes[4..6].copy_from_slice(&7i16.to_ne_bytes());
    bytes[8..12].copy_from_slice(&(-2.0f32).to_ne_bytes());
    bytes[12..14].copy_from_slice(&9i16.to_ne_bytes());
    array
        .write(&ArrayRegion::new(vec![0], vec![2]), &value_type, &bytes)
        .unwrap();

    let count = array.field("count").unwrap();
    assert_eq!(count.value_type(), &ValueType::from(NumericKind::Int16));
    assert_eq!(count.read_all_elements::<i16>().unwrap(), vec![7, 9]);
    assert_eq!(count.full_name(), "/a[\"count\"]");

    let value = array.view("[\"value\"][1:]").unwrap();
    assert_eq!(value.read_all_elements::<f64>().unwrap(), vec![-2.0]);

    assert!(matches!(
        array.field("missing"),
        Err(ArrayError::UnknownField { .. })
    ));
    assert!(!count.is_writable());
}
