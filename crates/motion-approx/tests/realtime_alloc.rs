// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Real-Time Allocation Checks (approximators)
// ─────────────────────────────────────────────────────────────────────
//! Single-sample prediction runs inside control loops and must not touch
//! the heap once the approximator is constructed.

#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use ndarray::{array, Array1, Array2};

use motion_approx::{FunctionApproximatorRbfn, KernelOptions};

struct CountingAlloc;

thread_local! {
    static ALLOCS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCS.with(|n| n.set(n.get() + 1));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOCS.with(|n| n.set(n.get() + 1));
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

fn allocations_during(f: impl FnOnce()) -> usize {
    let before = ALLOCS.with(Cell::get);
    f();
    ALLOCS.with(Cell::get) - before
}

fn rbfn(n_basis: usize) -> FunctionApproximatorRbfn {
    let centers = Array2::from_shape_fn((n_basis, 2), |(b, d)| b as f64 * 0.1 + d as f64);
    let widths = Array2::from_elem((n_basis, 2), 0.3);
    let weights = Array2::from_shape_fn((n_basis, 1), |(b, _)| (b as f64).sin());
    FunctionApproximatorRbfn::new(centers, widths, weights).unwrap()
}

#[test]
fn test_single_sample_predict_does_not_allocate() {
    for (normalized, asymmetric) in [(false, false), (true, false), (false, true), (true, true)] {
        let mut fa = rbfn(25).with_options(KernelOptions {
            normalized,
            asymmetric,
        });
        let input = array![[0.7, 1.2]];
        let mut output = Array1::zeros(1);

        let n = allocations_during(|| {
            for _ in 0..100 {
                fa.predict(input.view(), output.view_mut()).unwrap();
            }
        });
        assert_eq!(n, 0, "normalized={normalized} asymmetric={asymmetric}");
        assert!(output[0].is_finite());
    }
}

#[test]
fn test_batch_predict_reuses_buffer_once_sized() {
    let mut fa = rbfn(10);
    let inputs = Array2::from_shape_fn((50, 2), |(t, d)| t as f64 * 0.02 + d as f64);
    let mut outputs = Array1::zeros(50);
    fa.predict(inputs.view(), outputs.view_mut()).unwrap();

    let n = allocations_during(|| {
        fa.predict(inputs.view(), outputs.view_mut()).unwrap();
    });
    assert_eq!(n, 0);
}
