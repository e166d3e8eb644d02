//! Tests for aligned buffers.

use crate::buffer::{is_aligned, AlignedBuffer, MAX_ALIGNMENT};
use crate::kernels::Complex32;

#[test]
fn test_zeroed_buffer_is_aligned_and_zero() {
    for len in [0, 1, 15, 16, 17, 1000] {
        let buf = AlignedBuffer::<f32>::zeroed(len);
        assert_eq!(buf.len(), len);
        assert_eq!(buf.is_empty(), len == 0);
        assert!(buf.iter().all(|&v| v == 0.0));
        if len > 0 {
            assert!(is_aligned(buf.as_ptr(), MAX_ALIGNMENT), "len {len}");
        }
    }
}

#[test]
fn test_from_slice_copies_values() {
    let values: Vec<f32> = (0..37).map(|i| i as f32 * 0.5).collect();
    let buf = AlignedBuffer::from_slice(&values);
    assert_eq!(buf.as_slice(), values.as_slice());
}

#[test]
fn test_complex_buffer_alignment() {
    let samples: Vec<Complex32> = (0..9).map(|i| Complex32::new(i as f32, -(i as f32))).collect();
    let buf = AlignedBuffer::from_slice(&samples);
    assert!(is_aligned(buf.as_ptr(), MAX_ALIGNMENT));
    assert_eq!(buf[8], Complex32::new(8.0, -8.0));
}

#[test]
fn test_mutation_through_deref() {
    let mut buf = AlignedBuffer::<f32>::zeroed(4);
    buf[2] = 7.0;
    buf.as_mut_slice()[3] = 9.0;
    assert_eq!(&buf[..], &[0.0, 0.0, 7.0, 9.0]);
}

#[test]
fn test_clone_is_independent_and_aligned() {
    let mut original = AlignedBuffer::from_slice(&[1.0_f32, 2.0, 3.0]);
    let copy = original.clone();
    original[0] = 100.0;
    assert_eq!(copy[0], 1.0);
    assert!(is_aligned(copy.as_ptr(), MAX_ALIGNMENT));
}

#[test]
fn test_is_aligned_boundaries() {
    let buf = AlignedBuffer::<f32>::zeroed(32);
    let base = buf.as_ptr();
    assert!(is_aligned(base, 16));
    assert!(is_aligned(base, 32));
    // SAFETY: offsets stay within the 32-element buffer.
    let (plus_one, plus_four) = unsafe { (base.add(1), base.add(4)) };
    assert!(is_aligned(plus_one, 4));
    assert!(!is_aligned(plus_one, 16));
    assert!(is_aligned(plus_four, 16));
    assert!(!is_aligned(plus_four, 32));
}
