//! Supervisor behavior: concurrency cap, detachment, teardown.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use proc_vm::prelude::*;

fn setup() -> (Arc<ProcStore>, Arc<MemParamSpace>, Arc<Runtime<MemParamSpace>>) {
    let mut config = RuntimeConfig::default();
    config.block_period = Duration::from_millis(10);
    let store = Arc::new(ProcStore::new());
    let params = Arc::new(MemParamSpace::new());
    let runtime = Runtime::new(Arc::clone(&store), Arc::clone(&params), config);
    (store, params, runtime)
}

/// A procedure that blocks until `p_gate` equals `p_want`.
fn gated_proc(store: &ProcStore, params: &MemParamSpace, slot: u8) {
    if params.value("p_gate").is_none() {
        params.define("p_gate", ParamValue::Uint8(0));
        params.define("p_want", ParamValue::Uint8(1));
    }
    let proc: Procedure = vec![Instruction::block("p_gate", ComparisonOp::Eq, "p_want", 0)]
        .into_iter()
        .collect();
    store.insert(proc, slot, true).unwrap();
}

#[test]
fn the_worker_cap_rejects_excess_runs() {
    let (store, params, runtime) = setup();
    gated_proc(&store, &params, 1);

    let cap = proc_vm::consts::MAX_CONCURRENT;
    let _ids: Vec<RunId> = (0..cap).map(|_| runtime.run(1).unwrap()).collect();
    assert_eq!(runtime.live_workers(), cap);

    assert!(matches!(runtime.run(1), Err(RuntimeError::WorkerCapReached)));
    assert!(runtime.live_workers() <= cap);

    runtime.stop_all();
    assert_eq!(runtime.live_workers(), 0);
}

#[test]
fn running_an_empty_slot_fails_fast() {
    let (_store, _params, runtime) = setup();
    assert!(matches!(runtime.run(9), Err(RuntimeError::SlotEmpty(9))));
    assert_eq!(runtime.live_workers(), 0);
}

#[test]
fn deleting_a_slot_leaves_its_running_worker_untouched() {
    let (store, params, runtime) = setup();
    gated_proc(&store, &params, 1);

    let id = runtime.run(1).unwrap();
    thread::sleep(Duration::from_millis(30));

    // The worker operates on its detached copy.
    store.delete(1);
    assert!(store.get(1).is_none());
    assert_eq!(runtime.live_workers(), 1);

    // It still completes normally once the gate opens.
    params.set("p_gate", 0, 0, ParamValue::Uint8(1)).unwrap();
    runtime.wait(id, Duration::from_secs(10)).unwrap().unwrap();
    assert_eq!(runtime.live_workers(), 0);
}

#[test]
fn stop_cancels_a_blocked_worker() {
    let (store, params, runtime) = setup();
    gated_proc(&store, &params, 1);

    let id = runtime.run(1).unwrap();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(runtime.workers(), vec![(id, 1)]);

    runtime.stop(id);
    assert_eq!(runtime.live_workers(), 0);

    // Stopping an unknown id is a no-op.
    runtime.stop(id);
}

#[test]
fn stop_all_reclaims_every_worker() {
    let (store, params, runtime) = setup();
    gated_proc(&store, &params, 1);
    gated_proc(&store, &params, 2);

    for slot in [1, 2, 1, 2] {
        runtime.run(slot).unwrap();
    }
    assert_eq!(runtime.live_workers(), 4);

    runtime.stop_all();
    assert_eq!(runtime.live_workers(), 0);
}

#[test]
fn finished_workers_remove_themselves() {
    let (store, params, runtime) = setup();
    params.define("p", ParamValue::Uint8(0));
    let proc: Procedure = vec![Instruction::set("p", "1", 0)].into_iter().collect();
    store.insert(proc, 3, false).unwrap();

    let id = runtime.run(3).unwrap();
    runtime.wait(id, Duration::from_secs(10)).unwrap().unwrap();
    assert_eq!(runtime.live_workers(), 0);
    assert_eq!(params.value("p").unwrap(), ParamValue::Uint8(1));
}
