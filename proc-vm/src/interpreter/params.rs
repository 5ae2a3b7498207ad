//! Bridge between instructions and the parameter space.
//!
//! Resolves parameter names (including `name[i]` element references) against
//! the local table or a remote node, and applies the write rules: read-only
//! masks, whole-array writes for un-indexed array targets, and optionally
//! acknowledged remote pushes.

use crate::error::RuntimeError;
use crate::param::{ParamError, ParamFlags, ParamSpace};

use super::operand::Operand;
use super::Interpreter;

/// Split an element reference off a parameter name.
///
/// `"bearing[3]"` yields `("bearing", Some(3))`; a name without brackets, or
/// with brackets that don't parse as an index, is returned whole.
pub(crate) fn scan_offset(name: &str) -> (&str, Option<usize>) {
    let Some(open) = name.find('[') else {
        return (name, None);
    };
    let index = name[open + 1..].trim_end_matches(']');
    match index.parse() {
        Ok(index) => (&name[..open], Some(index)),
        Err(_) => (name, None),
    }
}

/// How a parameter write sources its value.
pub(crate) enum SetSource<'a> {
    /// Literal string, coerced through the parameter's type.
    Literal(&'a str),
    /// Computed operand, truncated to the parameter's width.
    Computed(&'a Operand),
}

impl<'a, P: ParamSpace> Interpreter<'a, P> {
    /// `true` when `node` resolves to the executing node itself.
    pub(crate) fn is_local(&self, node: u16) -> bool {
        node == 0 || self.config.local_addresses.contains(&node)
    }

    /// Fetch a parameter element as an operand.
    ///
    /// Remote parameters are refreshed first: list download, then a single
    /// pull, both bounded by the remote timeout.
    pub(crate) fn fetch_operand(&self, name: &str, node: u16) -> Result<Operand, RuntimeError> {
        let (base, index) = scan_offset(name);
        let lookup_node = if self.is_local(node) { 0 } else { node };

        if lookup_node != 0 {
            self.params.download_list(node, self.config.remote_timeout)?;
            self.params.pull(base, node, index, self.config.remote_timeout)?;
        }

        let value = self.params.get(base, lookup_node, index.unwrap_or(0))?;
        Ok(Operand::from(&value))
    }

    /// Write a parameter element (or a whole array) on `node`.
    pub(crate) fn set_param(&self, name: &str, node: u16, source: SetSource<'_>) -> Result<(), RuntimeError> {
        let (base, index) = scan_offset(name);
        let lookup_node = if self.is_local(node) { 0 } else { node };

        if lookup_node != 0 {
            self.params.download_list(node, self.config.remote_timeout)?;
        }

        let meta = self
            .params
            .find(base, lookup_node)
            .ok_or_else(|| ParamError::NotFound(base.to_owned()))?;
        if meta.flags.contains(ParamFlags::READONLY) {
            return Err(ParamError::ReadOnly(base.to_owned()).into());
        }

        let value = match source {
            SetSource::Literal(s) => meta.ty.parse_value(s)?,
            SetSource::Computed(operand) => operand.to_value(meta.ty)?,
        };

        if lookup_node == 0 {
            match index {
                Some(i) => self.params.set(base, 0, i, value)?,
                // An un-indexed write to an array parameter covers every
                // element.
                None => {
                    for i in 0..meta.array_size.max(1) {
                        self.params.set(base, 0, i, value.clone())?;
                    }
                }
            }
        } else {
            self.params.push(
                base,
                node,
                index,
                value,
                self.config.remote_timeout,
                self.config.ack_on_push,
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::scan_offset;

    #[test]
    fn scan_offset_splits_element_references() {
        assert_eq!(scan_offset("bearing[3]"), ("bearing", Some(3)));
        assert_eq!(scan_offset("bearing"), ("bearing", None));
        assert_eq!(scan_offset("b[0]"), ("b", Some(0)));
    }

    #[test]
    fn scan_offset_leaves_malformed_references_whole() {
        assert_eq!(scan_offset("bearing[]"), ("bearing[]", None));
        assert_eq!(scan_offset("bearing[x]"), ("bearing[x]", None));
        assert_eq!(scan_offset(""), ("", None));
    }
}
