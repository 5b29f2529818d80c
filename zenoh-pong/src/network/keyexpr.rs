//! Key expression types for bus traffic and node presence

use crate::error::{PongError, Result};
use crate::types::NodeId;
use zenoh::key_expr::KeyExpr;

/// Bus keyexpr - frames published by one node, or by any node
///
/// Pattern: `<prefix>/bus/<node_id>` or `<prefix>/bus/*`
///
/// Used for:
/// - Declaring the publisher a node broadcasts its frames on
/// - Subscribing to the frames of every node sharing the prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusKeyexpr {
    prefix: String,
    sender: Option<NodeId>,
}

impl BusKeyexpr {
    /// Keyexpr of a specific sender, or of all senders when `sender` is None
    pub fn new(prefix: &str, sender: Option<NodeId>) -> Self {
        Self {
            prefix: prefix.to_string(),
            sender,
        }
    }

    /// Sending node, `None` for the wildcard
    pub fn sender(&self) -> Option<&NodeId> {
        self.sender.as_ref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Convert into a Zenoh key expression
    pub fn to_keyexpr(&self) -> Result<KeyExpr<'static>> {
        let sender = self.sender.as_ref().map_or("*", |id| id.as_str());
        owned_keyexpr(format!("{}/bus/{}", self.prefix, sender))
    }
}

impl TryFrom<&KeyExpr<'_>> for BusKeyexpr {
    type Error = PongError;

    fn try_from(keyexpr: &KeyExpr<'_>) -> Result<Self> {
        let parts: Vec<&str> = keyexpr.as_str().split('/').collect();

        // Expected pattern: [...prefix]/bus/<node_id or *>
        if parts.len() < 3 || parts[parts.len() - 2] != "bus" {
            return Err(PongError::InvalidKeyexpr(format!(
                "Invalid BusKeyexpr pattern: {}",
                keyexpr.as_str()
            )));
        }

        let sender = match parts[parts.len() - 1] {
            "*" => None,
            name => Some(NodeId::from_name(name.to_string())?),
        };
        let prefix = parts[..parts.len() - 2].join("/");

        Ok(Self { prefix, sender })
    }
}

/// Node presence keyexpr - liveliness token of a running node
///
/// Pattern: `<prefix>/node/<node_id>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeKeyexpr {
    prefix: String,
    node_id: NodeId,
}

impl NodeKeyexpr {
    pub fn new(prefix: &str, node_id: NodeId) -> Self {
        Self {
            prefix: prefix.to_string(),
            node_id,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Convert into a Zenoh key expression
    pub fn to_keyexpr(&self) -> Result<KeyExpr<'static>> {
        owned_keyexpr(format!("{}/node/{}", self.prefix, self.node_id.as_str()))
    }
}

fn owned_keyexpr(keyexpr: String) -> Result<KeyExpr<'static>> {
    KeyExpr::try_from(keyexpr.clone())
        .map_err(|e| PongError::InvalidKeyexpr(format!("'{}': {}", keyexpr, e)))
}
