//! Reconciliation benchmarks: initial mount and no-op re-render of a flat
//! list, the hot paths of the diff and commit phases.

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};

use filament_core::element::Element;
use filament_core::engine::Engine;
use filament_core::host::MemoryHost;

fn list(rows: usize) -> Element {
    Element::host("ul").children((0..rows).map(|i| {
        Element::host("li")
            .attr("index", i as i64)
            .child(Element::text(format!("row {i}")))
    }))
}

fn bench_mount(c: &mut Criterion) {
    c.bench_function("mount_100_rows", |b| {
        b.iter(|| {
            let host = Rc::new(RefCell::new(MemoryHost::new()));
            let container = host.borrow().container();
            let engine = Engine::new(host, container);
            engine.render(list(100));
            engine.run_to_completion().unwrap();
        })
    });
}

fn bench_identical_rerender(c: &mut Criterion) {
    let host = Rc::new(RefCell::new(MemoryHost::new()));
    let container = host.borrow().container();
    let engine = Engine::new(host, container);
    engine.render(list(100));
    engine.run_to_completion().unwrap();

    c.bench_function("identical_rerender_100_rows", |b| {
        b.iter(|| {
            engine.render(list(100));
            engine.run_to_completion().unwrap();
        })
    });
}

criterion_group!(benches, bench_mount, bench_identical_rerender);
criterion_main!(benches);
