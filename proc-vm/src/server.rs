//! Request handling for the procedure service port.

use std::sync::Arc;
use std::time::Duration;

use proc_asm::{pack_proc, unpack_proc, Header, MessageKind, PACKET_DATA_SIZE};
use tracing::{debug, warn};

use crate::param::ParamSpace;
use crate::runtime::Runtime;
use crate::store::ProcStore;
use crate::transport::{Connection, Listener, Packet};

// An idle connection is dropped after this long without a request.
const REQUEST_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Answers del/pull/push/slots/run requests against a slot store and a
/// runtime supervisor.
#[derive(Debug)]
pub struct ProcServer<P> {
    store: Arc<ProcStore>,
    runtime: Arc<Runtime<P>>,
}

impl<P: ParamSpace + 'static> ProcServer<P> {
    /// Server over the node's store and runtime.
    pub fn new(store: Arc<ProcStore>, runtime: Arc<Runtime<P>>) -> Self {
        Self { store, runtime }
    }

    /// Accept connections and answer their requests until the listener is
    /// torn down.
    pub fn serve<L: Listener>(&self, listener: &L) {
        while let Ok(mut conn) = listener.accept() {
            self.serve_conn(&mut conn);
        }
        debug!("listener closed, server loop ending");
    }

    fn serve_conn(&self, conn: &mut impl Connection) {
        loop {
            let request = match conn.recv(REQUEST_IDLE_TIMEOUT) {
                Ok(packet) => packet,
                Err(_) => return,
            };
            let Some(response) = self.handle(&request) else {
                continue;
            };
            if conn.send(response).is_err() {
                return;
            }
        }
    }

    /// Handle one request packet.
    ///
    /// Returns `None` for packets that don't parse as a request; those are
    /// dropped without an answer.
    pub fn handle(&self, request: &Packet) -> Option<Packet> {
        let header = match request.data.first().map(|&b| Header::parse(b)) {
            Some(Ok(header)) => header,
            _ => {
                warn!("dropping malformed request packet");
                return None;
            }
        };

        debug!(kind = ?header.kind, "serving request");
        match header.kind {
            MessageKind::DelRequest => Some(self.del(request)),
            MessageKind::PullRequest => Some(self.pull(request)),
            MessageKind::PushRequest => Some(self.push(request)),
            MessageKind::SlotsRequest => Some(self.slots(request)),
            MessageKind::RunRequest => Some(self.run(request)),
            kind => {
                warn!(?kind, "dropping unexpected message");
                None
            }
        }
    }

    fn reply(request: &Packet, kind: MessageKind, ok: bool) -> Packet {
        let header = Header::new(kind);
        let header = if ok { header } else { header.with_error() };
        Packet {
            priority: request.priority,
            data: vec![header.to_byte()],
        }
    }

    fn del(&self, request: &Packet) -> Packet {
        match request.data.get(1) {
            Some(&slot) => {
                self.store.delete(slot);
                Self::reply(request, MessageKind::DelResponse, true)
            }
            None => Self::reply(request, MessageKind::DelResponse, false),
        }
    }

    fn pull(&self, request: &Packet) -> Packet {
        let proc = request.data.get(1).and_then(|&slot| self.store.get(slot).map(|p| (slot, p)));
        let Some((slot, proc)) = proc else {
            return Self::reply(request, MessageKind::PullResponse, false);
        };

        let mut data = vec![Header::new(MessageKind::PullResponse).to_byte(), slot];
        match pack_proc(&proc, &mut data) {
            Ok(()) => Packet {
                priority: request.priority,
                data,
            },
            Err(e) => {
                warn!(slot, error = %e, "failed to pack stored procedure");
                Self::reply(request, MessageKind::PullResponse, false)
            }
        }
    }

    fn push(&self, request: &Packet) -> Packet {
        let decoded = request
            .data
            .get(proc_asm::PROC_BODY_OFFSET..)
            .ok_or(())
            .and_then(|body| unpack_proc(body).map_err(|e| {
                warn!(error = %e, "failed to unpack pushed procedure");
            }));

        let ok = match (request.data.get(1), decoded) {
            (Some(&slot), Ok(proc)) => match self.store.insert(proc, slot, false) {
                Ok(()) => true,
                Err(e) => {
                    warn!(slot, error = %e, "failed to store pushed procedure");
                    false
                }
            },
            _ => false,
        };
        Self::reply(request, MessageKind::PushResponse, ok)
    }

    fn slots(&self, request: &Packet) -> Packet {
        let mut data = vec![Header::new(MessageKind::SlotsResponse).to_byte()];
        // Single-packet response; with a full store the tail wouldn't fit
        // and is cut off.
        data.extend(self.store.slots().into_iter().take(PACKET_DATA_SIZE - 1));
        Packet {
            priority: request.priority,
            data,
        }
    }

    fn run(&self, request: &Packet) -> Packet {
        let ok = match request.data.get(1) {
            Some(&slot) => match self.runtime.run(slot) {
                Ok(id) => {
                    debug!(slot, id, "procedure started");
                    true
                }
                Err(e) => {
                    warn!(slot, error = %e, "failed to run procedure");
                    false
                }
            },
            None => false,
        };
        Self::reply(request, MessageKind::RunResponse, ok)
    }
}
