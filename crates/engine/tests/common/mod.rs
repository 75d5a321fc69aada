//! A `request(name, args)` builder matching the one each `ops::*` module
//! already carries in its own `#[cfg(test)]` block, lifted out here so the
//! cross-operation tests don't need to depend on any single module's
//! private copy.

use vulsim_engine::protocol::{OperationArg, OperationRequest};

#[must_use]
pub fn request(name: &str, args: &[(&str, &str)]) -> OperationRequest {
    OperationRequest {
        name: name.to_string(),
        args: args
            .iter()
            .enumerate()
            .map(|(i, (n, v))| OperationArg { index: i as u32, name: (*n).to_string(), value: (*v).to_string() })
            .collect(),
    }
}
