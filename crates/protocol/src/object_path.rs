//! Object-path node declarations.
//!
//! A legacy request is a flat list of `(id, node)` pairs. Nodes address
//! server objects by navigating from a well-known static property through
//! instance properties, and actions run against an addressed object:
//!
//! ```text
//! 0 StaticProperty { Name: "Current", TypeId: "{3747adcd-...}" }
//! 1 Property       { Name: "Web", ParentId: 0 }
//! 2 Action         { ObjectPathId: 1, Kind: "Query", Select: ["Title"] }
//! 3 Action         { ObjectPathId: 1, Kind: "ObjectPath" }
//! ```
//!
//! Nodes never hold their parent directly, only its id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a declaration within one request.
pub type NodeId = u32;

/// One object-path node. Exactly one variant is active per declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
	/// Well-known root object, addressed by type and property name.
	StaticProperty(StaticPropertyNode),
	/// Named property of a previously declared node.
	Property(PropertyNode),
	/// Method call, field query or identity declaration against a node.
	Action(ActionNode),
}

impl Node {
	/// Returns the id this node references, if any.
	pub fn parent_id(&self) -> Option<NodeId> {
		match self {
			Node::StaticProperty(_) => None,
			Node::Property(p) => Some(p.parent_id),
			Node::Action(a) => Some(a.object_id),
		}
	}

	/// Returns true for action nodes, whose ids show up as response markers.
	pub fn is_action(&self) -> bool {
		matches!(self, Node::Action(_))
	}
}

/// Static property of a server type (the root of every path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StaticPropertyNode {
	/// Property name on the static type (e.g., `"Current"`).
	pub name: String,
	/// Braced GUID of the server type declaring the property.
	pub type_id: String,
}

/// Instance property of a parent node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyNode {
	/// Property name (e.g., `"Web"`).
	pub name: String,
	/// Id of the node this property is read from.
	pub parent_id: NodeId,
}

/// Action performed against an addressed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNode {
	/// Id of the object-path node the action targets.
	#[serde(rename = "ObjectPathId")]
	pub object_id: NodeId,
	/// What the action does.
	#[serde(flatten)]
	pub kind: ActionKind,
}

/// Action variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Kind")]
pub enum ActionKind {
	/// Load the listed fields of the target. An empty list loads default scalars.
	Query {
		#[serde(rename = "Select", default, skip_serializing_if = "Vec::is_empty")]
		select: Vec<String>,
	},
	/// Invoke a method on the target with positional parameters.
	Method {
		#[serde(rename = "Name")]
		name: String,
		#[serde(rename = "Parameters", default, skip_serializing_if = "Vec::is_empty")]
		parameters: Vec<Value>,
	},
	/// Materialize the target path on the server so later actions can reuse it.
	ObjectPath,
}

/// A node paired with the id it is declared under.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
	pub id: NodeId,
	pub node: Node,
}

impl Declaration {
	pub fn new(id: NodeId, node: Node) -> Self {
		Self { id, node }
	}
}
