//! End-to-end client/server transactions over the in-process network.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use proc_vm::consts::PROC_PORT;
use proc_vm::prelude::*;

const TIMEOUT: Duration = Duration::from_secs(2);

const SERVER_ADDR: u16 = 1;
const CLIENT_ADDR: u16 = 2;

struct Node {
    net: MemNetwork,
    store: Arc<ProcStore>,
    params: Arc<MemParamSpace>,
    runtime: Arc<Runtime<MemParamSpace>>,
}

/// Stand up a server node on the shared network and serve its port from a
/// background thread.
fn spawn_server() -> Node {
    let net = MemNetwork::new();
    let store = Arc::new(ProcStore::new());
    let params = Arc::new(MemParamSpace::new());
    let runtime = Runtime::new(Arc::clone(&store), Arc::clone(&params), RuntimeConfig::default());

    let endpoint = net.endpoint(SERVER_ADDR);
    let listener = endpoint.bind(PROC_PORT);
    let server = ProcServer::new(Arc::clone(&store), Arc::clone(&runtime));
    thread::spawn(move || server.serve(&listener));

    Node {
        net,
        store,
        params,
        runtime,
    }
}

fn client(node: &Node) -> ProcClient<MemEndpoint> {
    ProcClient::new(node.net.endpoint(CLIENT_ADDR))
}

fn sample_proc() -> Procedure {
    let mut builder = ProcBuilder::new();
    builder.set("p_uint8_1", "7", 0).unwrap();
    builder.noop(0).unwrap();
    builder.finish()
}

#[test]
fn push_slots_pull_del_round_trip() {
    let node = spawn_server();
    let client = client(&node);
    let proc = sample_proc();

    client.push(&proc, 5, SERVER_ADDR, TIMEOUT).unwrap();
    assert_eq!(client.slots(SERVER_ADDR, TIMEOUT).unwrap(), vec![5]);

    let fetched = client.pull(5, SERVER_ADDR, TIMEOUT).unwrap();
    assert_eq!(fetched, proc);

    client.del(5, SERVER_ADDR, TIMEOUT).unwrap();
    assert!(client.slots(SERVER_ADDR, TIMEOUT).unwrap().is_empty());
}

#[test]
fn pushing_into_an_occupied_slot_reports_the_error_flag() {
    let node = spawn_server();
    let client = client(&node);
    let proc = sample_proc();

    client.push(&proc, 5, SERVER_ADDR, TIMEOUT).unwrap();
    let second = client.push(&proc, 5, SERVER_ADDR, TIMEOUT);
    assert!(matches!(second, Err(RuntimeError::RequestFailed)));

    // The slot still holds the first procedure.
    assert_eq!(client.pull(5, SERVER_ADDR, TIMEOUT).unwrap(), proc);
}

#[test]
fn pulling_an_empty_slot_reports_the_error_flag() {
    let node = spawn_server();
    let client = client(&node);
    assert!(matches!(
        client.pull(9, SERVER_ADDR, TIMEOUT),
        Err(RuntimeError::RequestFailed)
    ));
}

#[test]
fn run_executes_on_the_server_node() {
    let node = spawn_server();
    node.params.define("p_uint8_1", ParamValue::Uint8(0));
    let client = client(&node);

    client.push(&sample_proc(), 5, SERVER_ADDR, TIMEOUT).unwrap();
    client.run(5, SERVER_ADDR, TIMEOUT).unwrap();

    // The run response is an acknowledgement of the spawn; wait for the
    // worker to land its write.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        if node.params.value("p_uint8_1") == Some(ParamValue::Uint8(7)) {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "worker never wrote the parameter");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn running_an_empty_slot_reports_the_error_flag() {
    let node = spawn_server();
    let client = client(&node);
    assert!(matches!(
        client.run(9, SERVER_ADDR, TIMEOUT),
        Err(RuntimeError::RequestFailed)
    ));
    assert_eq!(node.runtime.live_workers(), 0);
}

#[test]
fn reserved_slots_are_refused_client_side() {
    let node = spawn_server();
    let client = client(&node).with_reserved_slots(8);

    let err = client.push(&sample_proc(), 3, SERVER_ADDR, TIMEOUT);
    assert!(matches!(err, Err(RuntimeError::SlotReserved(3))));

    // The server itself never refuses low slots.
    let unrestricted = ProcClient::new(node.net.endpoint(CLIENT_ADDR));
    unrestricted.push(&sample_proc(), 3, SERVER_ADDR, TIMEOUT).unwrap();
    assert_eq!(node.store.slots(), vec![3]);
}

#[test]
fn randomized_procedures_survive_the_wire() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let node = spawn_server();
    let client = client(&node);
    let rng = &mut StdRng::seed_from_u64(2322);

    for round in 0..32 {
        let slot = rng.gen_range(1..=u8::MAX);
        let mut builder = ProcBuilder::new();
        for _ in 0..rng.gen_range(1..6) {
            match rng.gen_range(0..4) {
                0 => builder.set("p_a", "1", rng.gen()).unwrap(),
                1 => builder
                    .binop("p_a", BinaryOp::Add, "p_b", "p_c", rng.gen())
                    .unwrap(),
                2 => builder.call(rng.gen(), rng.gen()).unwrap(),
                _ => builder.noop(rng.gen()).unwrap(),
            }
        }
        let proc = builder.finish();

        client.del(slot, SERVER_ADDR, TIMEOUT).unwrap();
        client.push(&proc, slot, SERVER_ADDR, TIMEOUT).unwrap();
        let fetched = client.pull(slot, SERVER_ADDR, TIMEOUT).unwrap();
        assert_eq!(fetched, proc, "round {round} mangled the procedure");
    }
}

#[test]
fn connecting_to_a_node_without_a_server_fails() {
    let node = spawn_server();
    let client = client(&node);
    let err = client.slots(42, TIMEOUT);
    assert!(matches!(
        err,
        Err(RuntimeError::Transport(TransportError::ConnectionRefused(42)))
    ));
}

#[test]
fn oversize_procedures_never_leave_the_client() {
    let node = spawn_server();
    let client = client(&node);

    let mut builder = ProcBuilder::new();
    let long = "p".repeat(120);
    builder.set(&long, &long, 0).unwrap();
    builder.set(&long, &long, 0).unwrap();
    let proc = builder.finish();

    let err = client.push(&proc, 5, SERVER_ADDR, TIMEOUT);
    assert!(matches!(
        err,
        Err(RuntimeError::Codec(CodecError::ProcedureTooLarge(_)))
    ));
    assert!(node.store.slots().is_empty());
}
