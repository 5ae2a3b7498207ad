//! Client side of the procedure service.

use std::time::Duration;

use proc_asm::{pack_proc, unpack_proc, CodecError, Header, HeaderFlags, MessageKind, Procedure, PROC_BODY_OFFSET};

use crate::consts::{PROC_PORT, RESERVED_PROC_SLOTS};
use crate::error::RuntimeError;
use crate::transport::{Connection, Packet, Priority, Transport};

/// Drives request/response transactions against a remote procedure server.
#[derive(Debug)]
pub struct ProcClient<T> {
    transport: T,
    reserved_slots: u8,
}

impl<T: Transport> ProcClient<T> {
    /// Client over a transport endpoint.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            reserved_slots: RESERVED_PROC_SLOTS,
        }
    }

    /// Treat slots below `reserved` as read-only on this client.
    pub fn with_reserved_slots(mut self, reserved: u8) -> Self {
        self.reserved_slots = reserved;
        self
    }

    fn check_slot(&self, slot: u8) -> Result<(), RuntimeError> {
        if slot < self.reserved_slots {
            return Err(RuntimeError::SlotReserved(slot));
        }
        Ok(())
    }

    /// Send one request and read responses until the end-of-transmission
    /// flag, invoking `on_response` for every non-error response packet.
    ///
    /// The error flag of the final packet decides the transaction result.
    pub fn transaction<F>(
        &self,
        packet: Packet,
        host: u16,
        timeout: Duration,
        mut on_response: F,
    ) -> Result<(), RuntimeError>
    where
        F: FnMut(&Packet) -> Result<(), RuntimeError>,
    {
        let mut conn = self.transport.connect(host, PROC_PORT, timeout)?;
        conn.send(packet)?;

        loop {
            let response = conn.recv(timeout)?;
            // Both flags are read off the packet up front; nothing is
            // inspected after the packet is released.
            let header = Header::parse(*response.data.first().ok_or(CodecError::UnexpectedEnd)?)?;
            let failed = header.flags.contains(HeaderFlags::ERROR);

            if !failed {
                on_response(&response)?;
            }
            if header.flags.contains(HeaderFlags::END) {
                return if failed { Err(RuntimeError::RequestFailed) } else { Ok(()) };
            }
        }
    }

    fn slot_request(kind: MessageKind, slot: u8) -> Packet {
        Packet::new(vec![Header::new(kind).to_byte(), slot]).with_priority(Priority::High)
    }

    /// Delete the procedure stored in `slot` on `host`.
    pub fn del(&self, slot: u8, host: u16, timeout: Duration) -> Result<(), RuntimeError> {
        self.check_slot(slot)?;
        self.transaction(Self::slot_request(MessageKind::DelRequest, slot), host, timeout, |_| Ok(()))
    }

    /// Fetch the procedure stored in `slot` on `host`.
    pub fn pull(&self, slot: u8, host: u16, timeout: Duration) -> Result<Procedure, RuntimeError> {
        self.check_slot(slot)?;
        let mut fetched = None;
        self.transaction(
            Self::slot_request(MessageKind::PullRequest, slot),
            host,
            timeout,
            |response| {
                let body = response.data.get(PROC_BODY_OFFSET..).ok_or(CodecError::UnexpectedEnd)?;
                fetched = Some(unpack_proc(body)?);
                Ok(())
            },
        )?;
        fetched.ok_or(RuntimeError::RequestFailed)
    }

    /// Store `proc` into `slot` on `host`.
    pub fn push(&self, proc: &Procedure, slot: u8, host: u16, timeout: Duration) -> Result<(), RuntimeError> {
        self.check_slot(slot)?;
        let mut data = vec![Header::new(MessageKind::PushRequest).to_byte(), slot];
        pack_proc(proc, &mut data)?;
        self.transaction(
            Packet::new(data).with_priority(Priority::High),
            host,
            timeout,
            |_| Ok(()),
        )
    }

    /// Enumerate the occupied slots on `host`.
    pub fn slots(&self, host: u16, timeout: Duration) -> Result<Vec<u8>, RuntimeError> {
        let request = Packet::new(vec![Header::new(MessageKind::SlotsRequest).to_byte()]);
        let mut slots = Vec::new();
        self.transaction(request, host, timeout, |response| {
            slots.extend_from_slice(&response.data[1..]);
            Ok(())
        })?;
        Ok(slots)
    }

    /// Execute the procedure stored in `slot` on `host`.
    pub fn run(&self, slot: u8, host: u16, timeout: Duration) -> Result<(), RuntimeError> {
        self.check_slot(slot)?;
        self.transaction(Self::slot_request(MessageKind::RunRequest, slot), host, timeout, |_| Ok(()))
    }
}
