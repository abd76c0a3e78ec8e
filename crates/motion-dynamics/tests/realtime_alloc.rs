// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Real-Time Allocation Checks (dynamical systems)
// ─────────────────────────────────────────────────────────────────────
//! `differential_equation` and `integrate_step` run inside control loops
//! and must not touch the heap once a system is constructed.

#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use ndarray::Array1;

use motion_dynamics::{
    AnySystem, ExponentialSystem, SigmoidSystem, SpringDamperSystem, TimeSystem,
};
use motion_types::IntegrationMethod;

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

fn systems() -> Vec<AnySystem> {
    vec![
        ExponentialSystem::new(1.0, Array1::ones(3), Array1::zeros(3), 6.0)
            .unwrap()
            .into(),
        SigmoidSystem::new(1.0, Array1::from_elem(3, 0.1), 10.0, 0.5)
            .unwrap()
            .into(),
        SpringDamperSystem::critically_damped(1.0, Array1::ones(3), Array1::zeros(3), 20.0)
            .unwrap()
            .into(),
        TimeSystem::new(1.0, false).unwrap().into(),
    ]
}

#[test]
fn test_steps_do_not_allocate() {
    for method in [IntegrationMethod::Euler, IntegrationMethod::RungeKutta] {
        for mut sys in systems() {
            sys.set_integration_method(method);
            let dim = sys.dim();
            let mut x = Array1::zeros(dim);
            let mut x_next = Array1::zeros(dim);
            let mut xd = Array1::zeros(dim);
            sys.integrate_start(None, x.view_mut(), xd.view_mut()).unwrap();

            let n = allocations_during(|| {
                for _ in 0..100 {
                    sys.integrate_step(0.01, x.view(), x_next.view_mut(), xd.view_mut())
                        .unwrap();
                    std::mem::swap(&mut x, &mut x_next);
                }
            });
            assert_eq!(n, 0, "{:?} {method} allocated", sys.kind());
        }
    }
}

#[test]
fn test_differential_equation_does_not_allocate() {
    for sys in systems() {
        let dim = sys.dim();
        let x = Array1::from_elem(dim, 0.5);
        let mut xd = Array1::zeros(dim);
        let n = allocations_during(|| {
            sys.differential_equation(x.view(), xd.view_mut()).unwrap();
        });
        assert_eq!(n, 0, "{:?} allocated", sys.kind());
    }
}
