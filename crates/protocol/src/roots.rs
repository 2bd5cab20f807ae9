//! Well-known static roots.

/// A static property every object path starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WellKnownRoot {
	pub name: &'static str,
	pub type_id: &'static str,
}

/// `RequestContext.Current`, parent of `Site` and `Web`.
pub const REQUEST_CONTEXT_CURRENT: WellKnownRoot = WellKnownRoot {
	name: "Current",
	type_id: "{3747adcd-a3c3-41b9-bfab-4a64dd2f1e0a}",
};

/// `Utility` static entry point.
pub const UTILITY: WellKnownRoot = WellKnownRoot {
	name: "Utility",
	type_id: "{16f43e7e-bf35-475d-b677-9dcd51a6b2e4}",
};

/// All roots a descriptor may start from.
pub const WELL_KNOWN_ROOTS: &[WellKnownRoot] = &[REQUEST_CONTEXT_CURRENT, UTILITY];

impl WellKnownRoot {
	/// Finds a registered root by type id (case-insensitive) and name.
	pub fn lookup(type_id: &str, name: &str) -> Option<WellKnownRoot> {
		WELL_KNOWN_ROOTS
			.iter()
			.copied()
			.find(|root| root.name == name && root.type_id.eq_ignore_ascii_case(type_id))
	}
}
