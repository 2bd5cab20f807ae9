//! Object-path graph construction.
//!
//! An [`OperationDescriptor`] says "start at this static root, follow these
//! properties, then run this action". [`GraphBuilder`] turns it into the
//! ordered declarations the legacy protocol expects:
//!
//! 1. path nodes not yet declared in this batch (root first, then each property)
//! 2. the action node, whose id is the operation's identity path
//! 3. an `ObjectPath` identity declaration for every path node on the chain
//!    that has not been materialized in this batch yet
//!
//! All nodes live in the batch's [`ObjectPathArena`]. Path nodes are keyed by
//! root + ordered property chain, so two operations on the same object share
//! one declaration and one id.


use std::collections::{HashMap, HashSet};

use pathbatch_protocol::{
	ActionKind, ActionNode, Declaration, Node, NodeId, PropertyNode, StaticPropertyNode, WellKnownRoot,
};
use serde_json::Value;

use crate::error::BuildError;
use crate::identity::IdentityAllocator;

/// Static root reference as supplied by the model layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRef {
	pub type_id: String,
	pub name: String,
}

impl From<WellKnownRoot> for RootRef {
	fn from(root: WellKnownRoot) -> Self {
		Self {
			type_id: root.type_id.to_string(),
			name: root.name.to_string(),
		}
	}
}

/// What to do once the target object is reached.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
	/// Load the listed fields.
	Query { select: Vec<String> },
	/// Call a method with positional parameters.
	Method { name: String, parameters: Vec<Value> },
}

/// One typed operation against the legacy protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
	pub root: RootRef,
	pub chain: Vec<String>,
	pub action: ActionRequest,
}

impl OperationDescriptor {
	/// Starts a descriptor at `root`; defaults to an empty query.
	pub fn at(root: impl Into<RootRef>) -> Self {
		Self {
			root: root.into(),
			chain: Vec::new(),
			action: ActionRequest::Query { select: Vec::new() },
		}
	}

	/// Appends a property to the navigation chain.
	pub fn property(mut self, name: impl Into<String>) -> Self {
		self.chain.push(name.into());
		self
	}

	/// Finishes with a field query.
	pub fn query<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.action = ActionRequest::Query {
			select: fields.into_iter().map(Into::into).collect(),
		};
		self
	}

	/// Finishes with a method call.
	pub fn method(mut self, name: impl Into<String>, parameters: Vec<Value>) -> Self {
		self.action = ActionRequest::Method {
			name: name.into(),
			parameters,
		};
		self
	}

	/// Checks the descriptor without touching any arena.
	pub fn validate(&self) -> Result<(), BuildError> {
		if self.root.name.trim().is_empty() {
			return Err(BuildError::EmptyRootName);
		}
		if !is_braced_guid(&self.root.type_id) {
			return Err(BuildError::InvalidTypeId(self.root.type_id.clone()));
		}
		if WellKnownRoot::lookup(&self.root.type_id, &self.root.name).is_none() {
			return Err(BuildError::UnknownRoot {
				type_id: self.root.type_id.clone(),
				name: self.root.name.clone(),
			});
		}
		if let Some(index) = self.chain.iter().position(|p| p.trim().is_empty()) {
			return Err(BuildError::EmptyPropertyName { index });
		}
		match &self.action {
			ActionRequest::Query { select } => {
				if let Some(index) = select.iter().position(|f| f.trim().is_empty()) {
					return Err(BuildError::EmptyFieldName { index });
				}
			}
			ActionRequest::Method { name, .. } => {
				if name.trim().is_empty() {
					return Err(BuildError::EmptyMethodName);
				}
			}
		}
		Ok(())
	}
}

fn is_braced_guid(type_id: &str) -> bool {
	type_id
		.strip_prefix('{')
		.and_then(|s| s.strip_suffix('}'))
		.is_some_and(|inner| uuid::Uuid::parse_str(inner).is_ok())
}

/// Structural identity of a path node: root plus the property chain leading to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey {
	type_id: String,
	root: String,
	chain: Vec<String>,
}

impl PathKey {
	fn root(root: &RootRef) -> Self {
		Self {
			type_id: root.type_id.to_ascii_lowercase(),
			root: root.name.clone(),
			chain: Vec::new(),
		}
	}

	fn child(&self, property: &str) -> Self {
		let mut chain = self.chain.clone();
		chain.push(property.to_string());
		Self {
			type_id: self.type_id.clone(),
			root: self.root.clone(),
			chain,
		}
	}
}

/// Declarations for one operation plus the id its result is reported under.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
	pub declarations: Vec<Declaration>,
	pub identity_path: NodeId,
}

/// Batch-scoped node storage.
///
/// Holds every declaration emitted in the batch, in emission order, and the
/// lookup tables used to reuse path nodes across operations.
#[derive(Debug, Default)]
pub struct ObjectPathArena {
	ids: IdentityAllocator,
	nodes: Vec<Declaration>,
	paths: HashMap<PathKey, NodeId>,
	materialized: HashSet<NodeId>,
}

impl ObjectPathArena {
	pub fn new() -> Self {
		Self::default()
	}

	/// All declarations in emission order.
	pub fn declarations(&self) -> &[Declaration] {
		&self.nodes
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	fn declare(&mut self, node: Node, out: &mut Vec<Declaration>) -> NodeId {
		let id = self.ids.next();
		let declaration = Declaration::new(id, node);
		self.nodes.push(declaration.clone());
		out.push(declaration);
		id
	}
}

/// Builds graphs into an arena.
pub struct GraphBuilder<'a> {
	arena: &'a mut ObjectPathArena,
}

impl<'a> GraphBuilder<'a> {
	pub fn new(arena: &'a mut ObjectPathArena) -> Self {
		Self { arena }
	}

	/// Builds the graph for `descriptor`.
	///
	/// On error nothing is allocated or declared.
	pub fn build(&mut self, descriptor: &OperationDescriptor) -> Result<Graph, BuildError> {
		descriptor.validate()?;

		let mut declarations = Vec::new();
		let mut chain_ids = Vec::with_capacity(descriptor.chain.len() + 1);

		let mut key = PathKey::root(&descriptor.root);
		let mut target = match self.arena.paths.get(&key) {
			Some(&id) => id,
			None => {
				let node = Node::StaticProperty(StaticPropertyNode {
					name: descriptor.root.name.clone(),
					type_id: descriptor.root.type_id.clone(),
				});
				let id = self.arena.declare(node, &mut declarations);
				self.arena.paths.insert(key.clone(), id);
				id
			}
		};
		chain_ids.push(target);

		for property in &descriptor.chain {
			key = key.child(property);
			target = match self.arena.paths.get(&key) {
				Some(&id) => id,
				None => {
					let node = Node::Property(PropertyNode {
						name: property.clone(),
						parent_id: target,
					});
					let id = self.arena.declare(node, &mut declarations);
					self.arena.paths.insert(key.clone(), id);
					id
				}
			};
			chain_ids.push(target);
		}

		let kind = match &descriptor.action {
			ActionRequest::Query { select } => ActionKind::Query { select: select.clone() },
			ActionRequest::Method { name, parameters } => ActionKind::Method {
				name: name.clone(),
				parameters: parameters.clone(),
			},
		};
		let identity_path = self.arena.declare(
			Node::Action(ActionNode {
				object_id: target,
				kind,
			}),
			&mut declarations,
		);

		for path_id in chain_ids {
			if self.arena.materialized.insert(path_id) {
				self.arena.declare(
					Node::Action(ActionNode {
						object_id: path_id,
						kind: ActionKind::ObjectPath,
					}),
					&mut declarations,
				);
			}
		}

		tracing::trace!(
			identity_path,
			declared = declarations.len(),
			chain = ?descriptor.chain,
			"Built object-path graph"
		);

		Ok(Graph {
			declarations,
			identity_path,
		})
	}
}

/// Returns the first declaration that references an id not declared before it.
///
/// `known` holds ids declared by earlier graphs of the same batch.
pub fn first_forward_reference(declarations: &[Declaration], known: &HashSet<NodeId>) -> Option<NodeId> {
	let mut seen = known.clone();
	for declaration in declarations {
		if let Some(parent) = declaration.node.parent_id() {
			if !seen.contains(&parent) {
				return Some(declaration.id);
			}
		}
		seen.insert(declaration.id);
	}
	None
}
