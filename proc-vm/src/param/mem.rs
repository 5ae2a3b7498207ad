//! In-memory parameter space.
//!
//! Backs the test suite: a mutex-guarded parameter table per node, with
//! remote nodes modelled as linked sibling spaces. Downloads, pulls and
//! pushes move descriptors and values between the linked tables the way the
//! real parameter client moves them over the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{ParamError, ParamFlags, ParamMeta, ParamSpace, ParamType, ParamValue};

#[derive(Debug, Clone)]
struct Entry {
    meta: ParamMeta,
    values: Vec<ParamValue>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    remotes: HashMap<u16, Arc<MemParamSpace>>,
}

/// Mutex-guarded in-memory parameter table.
#[derive(Debug, Default)]
pub struct MemParamSpace {
    inner: Mutex<Inner>,
}

impl MemParamSpace {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Define a writable local scalar.
    pub fn define(&self, name: &str, value: ParamValue) {
        self.insert(
            ParamMeta {
                name: name.to_owned(),
                node: 0,
                ty: value.param_type(),
                flags: ParamFlags::empty(),
                array_size: 1,
            },
            vec![value],
        );
    }

    /// Define a read-only local scalar.
    pub fn define_readonly(&self, name: &str, value: ParamValue) {
        self.insert(
            ParamMeta {
                name: name.to_owned(),
                node: 0,
                ty: value.param_type(),
                flags: ParamFlags::READONLY,
                array_size: 1,
            },
            vec![value],
        );
    }

    /// Define a writable local array; `values` must be homogeneous and
    /// non-empty.
    pub fn define_array(&self, name: &str, values: Vec<ParamValue>) {
        if values.is_empty() {
            return;
        }
        let meta = ParamMeta {
            name: name.to_owned(),
            node: 0,
            ty: values[0].param_type(),
            flags: ParamFlags::empty(),
            array_size: values.len(),
        };
        self.insert(meta, values);
    }

    /// Insert or replace an entry.
    pub fn insert(&self, meta: ParamMeta, values: Vec<ParamValue>) {
        let mut inner = self.lock();
        inner.entries.retain(|e| !(e.meta.name == meta.name && e.meta.node == meta.node));
        inner.entries.push(Entry { meta, values });
    }

    /// Model `node` as the linked sibling space.
    pub fn link_remote(&self, node: u16, space: Arc<MemParamSpace>) {
        self.lock().remotes.insert(node, space);
    }

    fn remote(&self, node: u16) -> Result<Arc<MemParamSpace>, ParamError> {
        self.lock()
            .remotes
            .get(&node)
            .cloned()
            .ok_or(ParamError::RemoteTimeout(node))
    }

    /// Element 0 of a local parameter, a test convenience.
    pub fn value(&self, name: &str) -> Option<ParamValue> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.meta.name == name && e.meta.node == 0)
            .and_then(|e| e.values.first().cloned())
    }
}

impl ParamSpace for MemParamSpace {
    fn params(&self) -> Vec<ParamMeta> {
        self.lock().entries.iter().map(|e| e.meta.clone()).collect()
    }

    fn find(&self, name: &str, node: u16) -> Option<ParamMeta> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.meta.name == name && e.meta.node == node)
            .map(|e| e.meta.clone())
    }

    fn get(&self, name: &str, node: u16, index: usize) -> Result<ParamValue, ParamError> {
        let inner = self.lock();
        let entry = inner
            .entries
            .iter()
            .find(|e| e.meta.name == name && e.meta.node == node)
            .ok_or_else(|| ParamError::NotFound(name.to_owned()))?;
        entry
            .values
            .get(index)
            .cloned()
            .ok_or_else(|| ParamError::IndexOutOfBounds(name.to_owned()))
    }

    fn set(&self, name: &str, node: u16, index: usize, value: ParamValue) -> Result<(), ParamError> {
        let mut inner = self.lock();
        let entry = inner
            .entries
            .iter_mut()
            .find(|e| e.meta.name == name && e.meta.node == node)
            .ok_or_else(|| ParamError::NotFound(name.to_owned()))?;
        if value.param_type() != entry.meta.ty {
            return Err(ParamError::WrongType(name.to_owned()));
        }
        let cell = entry
            .values
            .get_mut(index)
            .ok_or_else(|| ParamError::IndexOutOfBounds(name.to_owned()))?;
        *cell = value;
        Ok(())
    }

    fn download_list(&self, node: u16, _timeout: Duration) -> Result<(), ParamError> {
        let remote = self.remote(node)?;
        let descriptors: Vec<ParamMeta> = remote
            .lock()
            .entries
            .iter()
            .filter(|e| e.meta.node == 0)
            .map(|e| e.meta.clone())
            .collect();

        let mut inner = self.lock();
        for mut meta in descriptors {
            meta.node = node;
            if inner.entries.iter().any(|e| e.meta.name == meta.name && e.meta.node == node) {
                continue;
            }
            // Values stay zeroed until pulled.
            let values = (0..meta.array_size).map(|_| meta.ty.zero_value()).collect();
            inner.entries.push(Entry { meta, values });
        }
        Ok(())
    }

    fn pull(&self, name: &str, node: u16, index: Option<usize>, _timeout: Duration) -> Result<(), ParamError> {
        let remote = self.remote(node)?;
        let (meta, values) = {
            let inner = remote.lock();
            let entry = inner
                .entries
                .iter()
                .find(|e| e.meta.name == name && e.meta.node == 0)
                .ok_or_else(|| ParamError::NotFound(name.to_owned()))?;
            (entry.meta.clone(), entry.values.clone())
        };

        let mut inner = self.lock();
        let cached = inner
            .entries
            .iter_mut()
            .find(|e| e.meta.name == name && e.meta.node == node);
        match cached {
            Some(entry) => match index {
                Some(i) => {
                    let value = values
                        .get(i)
                        .cloned()
                        .ok_or_else(|| ParamError::IndexOutOfBounds(name.to_owned()))?;
                    let cell = entry
                        .values
                        .get_mut(i)
                        .ok_or_else(|| ParamError::IndexOutOfBounds(name.to_owned()))?;
                    *cell = value;
                }
                None => entry.values = values,
            },
            None => {
                let mut meta = meta;
                meta.node = node;
                inner.entries.push(Entry { meta, values });
            }
        }
        Ok(())
    }

    fn push(
        &self,
        name: &str,
        node: u16,
        index: Option<usize>,
        value: ParamValue,
        _timeout: Duration,
        ack: bool,
    ) -> Result<(), ParamError> {
        let remote = match self.remote(node) {
            Ok(remote) => remote,
            // Fire-and-forget writes are lost without an error when the node
            // is unreachable.
            Err(_) if !ack => return Ok(()),
            Err(e) => return Err(e),
        };

        let write = |space: &MemParamSpace, node: u16| -> Result<(), ParamError> {
            let mut inner = space.lock();
            let entry = inner
                .entries
                .iter_mut()
                .find(|e| e.meta.name == name && e.meta.node == node)
                .ok_or_else(|| ParamError::NotFound(name.to_owned()))?;
            if value.param_type() != entry.meta.ty {
                return Err(ParamError::WrongType(name.to_owned()));
            }
            match index {
                Some(i) => {
                    let cell = entry
                        .values
                        .get_mut(i)
                        .ok_or_else(|| ParamError::IndexOutOfBounds(name.to_owned()))?;
                    *cell = value.clone();
                }
                None => {
                    for cell in &mut entry.values {
                        *cell = value.clone();
                    }
                }
            }
            Ok(())
        };

        write(&remote, 0)?;
        // Keep the cached copy coherent when one exists.
        let _ = write(self, node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_then_pull_refreshes_the_cache() {
        let ground = Arc::new(MemParamSpace::new());
        let sat = Arc::new(MemParamSpace::new());
        sat.define("p_tx_power", ParamValue::Uint16(42));
        ground.link_remote(5, Arc::clone(&sat));

        let timeout = Duration::from_millis(100);
        ground.download_list(5, timeout).unwrap();
        assert_eq!(ground.get("p_tx_power", 5, 0).unwrap(), ParamValue::Uint16(0));

        ground.pull("p_tx_power", 5, Some(0), timeout).unwrap();
        assert_eq!(ground.get("p_tx_power", 5, 0).unwrap(), ParamValue::Uint16(42));
    }

    #[test]
    fn push_writes_through_to_the_remote_table() {
        let ground = Arc::new(MemParamSpace::new());
        let sat = Arc::new(MemParamSpace::new());
        sat.define("p_mode", ParamValue::Uint8(0));
        ground.link_remote(9, Arc::clone(&sat));

        let timeout = Duration::from_millis(100);
        ground
            .push("p_mode", 9, Some(0), ParamValue::Uint8(3), timeout, true)
            .unwrap();
        assert_eq!(sat.value("p_mode").unwrap(), ParamValue::Uint8(3));
    }

    #[test]
    fn acked_push_to_an_unknown_node_times_out() {
        let ground = MemParamSpace::new();
        let timeout = Duration::from_millis(100);
        let err = ground
            .push("p", 77, None, ParamValue::Uint8(1), timeout, true)
            .unwrap_err();
        assert_eq!(err, ParamError::RemoteTimeout(77));

        // Without an acknowledgement the loss is silent.
        ground
            .push("p", 77, None, ParamValue::Uint8(1), timeout, false)
            .unwrap();
    }
}
